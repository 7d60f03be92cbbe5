//! Authenticated-command gate.
//!
//! Every command that needs a user waits here for session hydration to
//! settle, then either proceeds with the resolved user or fails with a
//! login hint. The check runs per command rather than once globally, so
//! no command can observe a pre-hydration session.

use crate::error::ApiError;
use crate::session::{Session, SessionState};
use crate::models::User;

/// Block until the session settles, then require an authenticated user.
pub async fn require_user(session: &Session) -> Result<User, ApiError> {
    match session.await_settled().await {
        SessionState::Authenticated(user) => Ok(user),
        _ => Err(ApiError::NotLoggedIn),
    }
}
