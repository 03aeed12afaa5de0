//! HTTP client for the Harvest backend.
//!
//! JSON over HTTP with a bearer token for session-scoped calls. Transport
//! failures map to [`BackendError::Network`], business-rule refusals to
//! [`BackendError::Rejected`] with the backend's message untouched.
//!
//! # Endpoints
//!
//! | Operation            | Request                                |
//! |----------------------|----------------------------------------|
//! | `getCart`            | `GET    cart`                          |
//! | `addToCart`          | `POST   cart/items`                    |
//! | `removeFromCart`     | `DELETE cart/items/{line}`             |
//! | `updateCartItem`     | `PATCH  cart/items/{line}`             |
//! | `clearCart`          | `DELETE cart`                          |
//! | `checkout`           | `POST   orders`                        |
//! | `listProducts`       | `GET    products`                      |
//! | `getProductDetails`  | `GET    products/{id}`                 |
//! | `searchProducts`     | `GET    products/search?q=`            |
//! | `addBatch`           | `POST   products/{id}/batches`         |
//! | `updateBatchStock`   | `PATCH  batches/{id}/stock`            |
//! | `updateDryStock`     | `PATCH  products/{id}/stock`           |

mod cart;
mod catalog;
mod inventory;
pub mod records;

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use harvest_core::Session;

use crate::config::HarvestConfig;
use crate::ports::BackendError;

use records::ErrorBody;

/// Maximum number of response body characters echoed into logs.
const LOG_BODY_LIMIT: usize = 500;

/// Client for the Harvest backend API.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct HttpBackend {
    inner: Arc<HttpBackendInner>,
}

struct HttpBackendInner {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &HarvestConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(HttpBackendInner {
                client,
                base_url: config.api_url.as_str().trim_end_matches('/').to_string(),
            }),
        })
    }

    /// Base URL requests are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.inner.base_url, path.trim_start_matches('/'))
    }

    /// Start a request, authenticated when a session is given.
    fn request(&self, method: Method, path: &str, session: Option<&Session>) -> RequestBuilder {
        let builder = self.inner.client.request(method, self.url(path));
        match session {
            Some(session) => builder.bearer_auth(session.access_token.expose_secret()),
            None => builder,
        }
    }

    /// Send a request and decode a JSON body.
    async fn fetch<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, BackendError> {
        let body = self.send(builder).await?;
        serde_json::from_str(&body).map_err(|e| {
            error!(
                error = %e,
                body = %truncate(&body),
                "Failed to parse backend response"
            );
            BackendError::Decode(e.to_string())
        })
    }

    /// Send a request whose response body is ignored.
    async fn execute(&self, builder: RequestBuilder) -> Result<(), BackendError> {
        self.send(builder).await.map(drop)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<String, BackendError> {
        let response = builder.send().await?;
        let status = response.status();

        // Get response body as text first for better error diagnostics
        let body = response.text().await?;

        if status.is_success() {
            debug!(status = %status, "Backend request succeeded");
            return Ok(body);
        }

        Err(status_error(status, &body))
    }
}

/// Map a non-success response to a backend error.
fn status_error(status: StatusCode, body: &str) -> BackendError {
    let message = error_message(body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .map_or_else(|| format!("HTTP {status}"), ToString::to_string)
    });

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::Unauthorized,
        StatusCode::NOT_FOUND => BackendError::NotFound(message),
        s if s.is_server_error() => {
            error!(
                status = %s,
                body = %truncate(body),
                "Backend returned server error"
            );
            BackendError::Rejected(message)
        }
        _ => BackendError::Rejected(message),
    }
}

/// Extract the human-readable message from an error body, if any.
fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<ErrorBody>(trimmed) {
        Ok(parsed) => parsed.into_message(),
        Err(_) => Some(truncate(trimmed)),
    }
}

fn truncate(body: &str) -> String {
    body.chars().take(LOG_BODY_LIMIT).collect()
}
