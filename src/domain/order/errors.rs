use crate::ports::PortError;
use crate::store::StoreError;

// ============================================================================
// Order Error Taxonomy
// ============================================================================
//
// Four failure kinds, one per failure domain:
//
// - AccountNotFound: terminal, the request itself is invalid. Covers both a
//   not-found answer and a failed account lookup - an order for an account
//   we cannot confirm is never persisted.
// - CatalogUnavailable: the catalog call failed at transport level.
//   Transient; the caller may retry the whole place_order.
// - PersistenceFailed: the store call failed. For writes the transaction did
//   not commit, no partial data exists, and a retry is safe.
// - ReconstructionInconsistency: the flat row stream violated its ordering
//   contract. A programming/contract violation, surfaced rather than
//   swallowed.
//
// Dropping zero-quantity or catalog-missing requested items is expected
// data shaping, not an error, and has no variant here.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("account not found: {0}")]
    AccountNotFound(String),

    #[error("catalog unavailable: {0}")]
    CatalogUnavailable(#[source] PortError),

    #[error("order persistence failed: {0}")]
    PersistenceFailed(#[source] StoreError),

    #[error("order reconstruction inconsistency: {0}")]
    ReconstructionInconsistency(String),
}

impl OrderError {
    /// Stable label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            OrderError::AccountNotFound(_) => "account_not_found",
            OrderError::CatalogUnavailable(_) => "catalog_unavailable",
            OrderError::PersistenceFailed(_) => "persistence_failed",
            OrderError::ReconstructionInconsistency(_) => "reconstruction_inconsistency",
        }
    }
}
