//! Orchestration error types.

use thiserror::Error;

/// Errors that can occur while driving the checkout flow.
///
/// Gateway and rate-provider failures never appear here: they are absorbed
/// into the stored [`checkout::CheckoutMessage`] slots so a remote outage
/// degrades the experience instead of aborting the flow.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Cart storage failed underneath the flow.
    #[error("Cart error: {0}")]
    Cart(#[from] cart::CartError),
}

/// Convenience type alias for orchestration results.
pub type Result<T> = std::result::Result<T, OrchestratorError>;
