use async_trait::async_trait;

use crate::error::Error;

/// A source of breach data that can tell whether a password has been exposed.
///
/// Implementations must reject an empty password with [`Error::Validation`].
/// Dropping the returned future cancels the check, including any in-flight request.
#[async_trait]
pub trait BreachProvider: Send + Sync {
    /// Human-readable name used to attribute failures.
    fn name(&self) -> &str;

    /// Returns `Ok(true)` if the password appears in this provider's breach data.
    async fn is_breached(&self, password: &str) -> Result<bool, Error>;
}
