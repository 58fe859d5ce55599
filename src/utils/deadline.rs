use std::future::Future;
use std::time::Duration;

// ============================================================================
// Deadline Bounding for Outbound Calls
// ============================================================================
//
// Every remote call and every store call in this service must be bounded:
// no operation may block a request indefinitely. Callers own retry policy,
// so there is no retry logic here - a call either completes within its
// deadline or fails with DeadlineExceeded.
//
// ============================================================================

/// Error returned when a bounded operation did not complete in time.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("operation exceeded deadline of {0:?}")]
pub struct DeadlineExceeded(pub Duration);

/// Run a future under a deadline.
///
/// On expiry the inner future is dropped. For database transactions that
/// means the connection is released and the transaction rolls back; a
/// half-written order is never left visible.
pub async fn bounded<F>(limit: Duration, fut: F) -> Result<F::Output, DeadlineExceeded>
where
    F: Future,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| DeadlineExceeded(limit))
}
