//! Shared utilities for use cases.

use crate::use_cases::orchestrate::OrchestratorError;
use tokio_util::sync::CancellationToken;

/// Check if cancellation has been requested.
///
/// Returns `Err(OrchestratorError::Cancelled)` if the token exists and is cancelled.
pub(crate) fn check_cancelled(token: Option<&CancellationToken>) -> Result<(), OrchestratorError> {
    if let Some(token) = token
        && token.is_cancelled()
    {
        return Err(OrchestratorError::Cancelled);
    }
    Ok(())
}
