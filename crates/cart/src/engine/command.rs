//! Server-side cart mutations.

use harvest_core::{LineId, Quantity, Session};

use crate::ports::{AddToCart, BackendError, CartBackend};

/// A mutation of the authenticated cart.
///
/// Executed by [`super::CartEngine::execute_remote`], which runs the
/// mutation and then refetches so the returned cart carries backend prices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartCommand {
    /// Add a line (the backend merges matching lines).
    Add(AddToCart),
    /// Remove a line.
    Remove(LineId),
    /// Set a line's quantity.
    Update {
        /// Line to update.
        line_id: LineId,
        /// New quantity.
        quantity: Quantity,
    },
    /// Remove every line.
    Clear,
}

impl CartCommand {
    /// Short name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Add(_) => "add",
            Self::Remove(_) => "remove",
            Self::Update { .. } => "update",
            Self::Clear => "clear",
        }
    }

    /// Whether a successful run leaves the cart empty without needing a
    /// refetch.
    #[must_use]
    pub const fn empties_cart(&self) -> bool {
        matches!(self, Self::Clear)
    }

    /// Send the mutation to the backend.
    pub(crate) async fn send(
        &self,
        backend: &dyn CartBackend,
        session: &Session,
    ) -> Result<(), BackendError> {
        match self {
            Self::Add(item) => backend.add_to_cart(session, item).await,
            Self::Remove(line_id) => backend.remove_from_cart(session, line_id).await,
            Self::Update { line_id, quantity } => {
                backend.update_cart_item(session, line_id, *quantity).await
            }
            Self::Clear => backend.clear_cart(session).await,
        }
    }
}
