//! Session store: the single source of truth for "who is logged in".
//!
//! Built at bootstrap and passed explicitly (by `Arc`) to everything that
//! needs it; there is no ambient global. State transitions are published
//! through a `watch` channel so concurrent observers all wait for the same
//! settled answer instead of reading a half-hydrated session.
//!
//! ```text
//! Uninitialized ──hydrate()──▶ Hydrating ──me ok──▶ Authenticated
//!                                  │
//!                                  └──me fails / no creds──▶ Anonymous
//! ```
//!
//! Failure semantics: a rejected login surfaces the backend's reason and
//! leaves the session anonymous. A login whose follow-up profile fetch
//! fails still authenticates, with an email-only profile. Logout always
//! lands in Anonymous; the backend call is best effort and its failure
//! is the one error this crate deliberately ignores.

use std::sync::Arc;
use tokio::sync::watch;

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::models::User;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Process start; hydration not yet attempted.
    Uninitialized,
    /// Cached credentials are being validated against the backend.
    Hydrating,
    /// No user; login and register are the available actions.
    Anonymous,
    /// User resolved; protected commands may proceed.
    Authenticated(User),
}

impl SessionState {
    pub fn is_settled(&self) -> bool {
        matches!(self, SessionState::Anonymous | SessionState::Authenticated(_))
    }
}

/// Outcome of [`Session::register`]. The API key is issued exactly once
/// at registration, so it is returned even when the automatic login that
/// follows registration fails.
#[derive(Debug, Clone)]
pub struct Registration {
    pub api_key: String,
    /// The logged-in user, when the automatic login succeeded.
    pub user: Option<User>,
}

pub struct Session {
    client: Arc<ApiClient>,
    state: watch::Sender<SessionState>,
}

impl Session {
    pub fn new(client: Arc<ApiClient>) -> Self {
        let (state, _) = watch::channel(SessionState::Uninitialized);
        Self { client, state }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Wait until hydration has settled into Anonymous or Authenticated.
    /// Safe to call from any number of tasks; all observe the same result.
    pub async fn await_settled(&self) -> SessionState {
        let mut rx = self.state.subscribe();
        loop {
            let current = rx.borrow_and_update().clone();
            if current.is_settled() {
                return current;
            }
            if rx.changed().await.is_err() {
                return self.state.borrow().clone();
            }
        }
    }

    /// Validate cached credentials against the backend. Any failure
    /// (revoked refresh credential, network down) clears the cache and
    /// settles Anonymous; the next action is a fresh login.
    pub async fn hydrate(&self) -> SessionState {
        self.state.send_replace(SessionState::Hydrating);

        if !self.client.credentials().has_credentials() {
            return self.settle(SessionState::Anonymous);
        }

        match self.client.current_user().await {
            Ok(user) => self.settle(SessionState::Authenticated(user)),
            Err(_) => {
                self.client.credentials().clear();
                self.settle(SessionState::Anonymous)
            }
        }
    }

    /// Log in and populate the profile.
    ///
    /// A failure from the login endpoint itself (bad credentials) is
    /// surfaced and the session stays anonymous. A failure fetching the
    /// profile afterwards does not undo the login: the token pair is
    /// cached and the session authenticates with an email-only profile.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, ApiError> {
        validate_email(email)?;
        validate_password(password)?;
        self.await_settled().await;

        let pair = self.client.login(email, password).await?;
        self.client.credentials().store(pair);

        let user = match self.client.current_user().await {
            Ok(user) => user,
            Err(_) => User::partial(email),
        };
        self.state.send_replace(SessionState::Authenticated(user.clone()));
        Ok(user)
    }

    /// Register an account, then log in automatically.
    ///
    /// The one-time API key from registration is attached to the cached
    /// profile for display. If the automatic login fails the session
    /// remains anonymous, but the key is still returned because the
    /// backend will not show it again.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Registration, ApiError> {
        if name.trim().is_empty() {
            return Err(ApiError::Validation("name must not be empty".to_string()));
        }
        validate_email(email)?;
        validate_password(password)?;

        let created = self.client.register(name, email, password).await?;
        let api_key = created.api_key.clone().unwrap_or_default();

        match self.login(email, password).await {
            Ok(mut user) => {
                user.api_key = created.api_key;
                self.state.send_replace(SessionState::Authenticated(user.clone()));
                Ok(Registration {
                    api_key,
                    user: Some(user),
                })
            }
            Err(_) => Ok(Registration { api_key, user: None }),
        }
    }

    /// Log out. The backend call is best effort; local credentials and
    /// state are cleared unconditionally.
    pub async fn logout(&self) {
        self.await_settled().await;
        let _ = self.client.logout().await;
        self.client.credentials().clear();
        self.state.send_replace(SessionState::Anonymous);
    }

    /// Rotate the API key and refresh the cached profile with the new
    /// one-time key.
    pub async fn rotate_key(&self) -> Result<User, ApiError> {
        let user = self.client.rotate_api_key().await?;
        self.state.send_replace(SessionState::Authenticated(user.clone()));
        Ok(user)
    }

    fn settle(&self, state: SessionState) -> SessionState {
        self.state.send_replace(state.clone());
        state
    }
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::Validation(format!(
            "'{}' is not a valid email address",
            email
        )));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < 8 {
        return Err(ApiError::Validation(
            "password must be at least 8 characters".to_string(),
        ));
    }
    Ok(())
}
