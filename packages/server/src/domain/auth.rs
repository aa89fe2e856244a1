//! Token authentication collaborator.

use async_trait::async_trait;

use super::{error::AuthError, value_object::UserId};

/// Resolves a handshake token to the user it identifies.
///
/// Called once per connection, outside any Room.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenAuthenticator: Send + Sync {
    async fn authenticate(&self, token: &str) -> Result<UserId, AuthError>;
}
