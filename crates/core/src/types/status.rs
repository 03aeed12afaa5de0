//! Status and role enums.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Account role reported by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// No account, or an account without a shopping role.
    #[default]
    Guest,
    /// Customer account; owns a server-side cart.
    Client,
    /// Farm account; manages batches and stock.
    Producer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Guest => "guest",
            Self::Client => "client",
            Self::Producer => "producer",
        })
    }
}

/// Error returned when parsing an unknown role.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown role: {0}. Valid roles: guest, client, producer")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "guest" => Ok(Self::Guest),
            "client" => Ok(Self::Client),
            "producer" => Ok(Self::Producer),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

/// Order status as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Preparing,
    Delivered,
    Cancelled,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Preparing => "preparing",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parses_case_insensitively() {
        assert_eq!("Client".parse::<Role>(), Ok(Role::Client));
        assert_eq!(" producer ".parse::<Role>(), Ok(Role::Producer));
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_display_matches_serde() {
        for role in [Role::Guest, Role::Client, Role::Producer] {
            let json = serde_json::to_string(&role).unwrap_or_default();
            assert_eq!(json, format!("\"{role}\""));
        }
    }
}
