use async_trait::async_trait;

use crate::models::{Account, Product};
use crate::utils::DeadlineExceeded;

mod http;

pub use http::{HttpAccountClient, HttpCatalogClient};

// ============================================================================
// Ports - Abstract Capabilities of the Account and Catalog Services
// ============================================================================
//
// The orchestrator depends on these traits, never on a concrete transport.
// Production wires the reqwest-backed clients below; tests inject in-memory
// fakes. Both lookups are read-only from this service's point of view.
//
// ============================================================================

/// Failure of a remote port call. Transport problems and deadline expiry are
/// transient; the caller decides whether to retry the whole operation.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response status {0}")]
    UnexpectedStatus(reqwest::StatusCode),

    #[error(transparent)]
    DeadlineExceeded(#[from] DeadlineExceeded),
}

/// Lookup of a single account by id.
#[async_trait]
pub trait AccountPort: Send + Sync {
    /// Returns the account, or `None` when the Account service reports it
    /// does not exist.
    async fn get_account(&self, id: &str) -> Result<Option<Account>, PortError>;
}

/// Batched lookup of products by id list.
#[async_trait]
pub trait CatalogPort: Send + Sync {
    /// Returns only the products that exist; unmatched ids are simply absent
    /// from the result, never an error.
    async fn get_products(&self, ids: &[String]) -> Result<Vec<Product>, PortError>;
}
