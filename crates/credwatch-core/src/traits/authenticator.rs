//! Login flow trait.

use async_trait::async_trait;

use crate::AccessToken;
use crate::error::AuthenticationError;

/// Something that can log in to the dashboard and hand back a token.
///
/// Implementations are slow (seconds) and must not run concurrently; the
/// session manager guarantees it never calls `login` twice at once.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Run the login flow.
    async fn login(&self) -> std::result::Result<AccessToken, AuthenticationError>;
}
