//! Shared utilities for use cases.

use conductor_domain::DomainError;
use tokio_util::sync::CancellationToken;

/// Check if cancellation has been requested.
///
/// Returns `Err(DomainError::Cancelled)` if the token exists and is cancelled.
pub(crate) fn check_cancelled(token: &Option<CancellationToken>) -> Result<(), DomainError> {
    if let Some(token) = token
        && token.is_cancelled()
    {
        return Err(DomainError::Cancelled);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_cancelled() {
        assert!(check_cancelled(&None).is_ok());

        let token = CancellationToken::new();
        let some = Some(token.clone());
        assert!(check_cancelled(&some).is_ok());

        token.cancel();
        assert!(check_cancelled(&some).unwrap_err().is_cancelled());
    }
}
