use tokio::sync::watch;
use tracing::{info, warn};

use crate::api::{ApiClient, ApiError};
use crate::models::UserIdentity;

/// Authentication state of the running process.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Startup verification has not finished yet
    Loading,
    Unauthenticated,
    Authenticated(UserIdentity),
}

impl SessionState {
    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Loading)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }

    pub fn user(&self) -> Option<&UserIdentity> {
        match self {
            SessionState::Authenticated(user) => Some(user),
            _ => None,
        }
    }
}

/// Point-in-time view of the session for consumers.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub user: Option<UserIdentity>,
}

impl From<&SessionState> for Session {
    fn from(state: &SessionState) -> Self {
        Self {
            is_authenticated: state.is_authenticated(),
            is_loading: state.is_loading(),
            user: state.user().cloned(),
        }
    }
}

/// Owns the session state and the only code paths that change it.
///
/// Readers get snapshots via [`session`](Self::session) or a live
/// receiver via [`subscribe`](Self::subscribe).
pub struct SessionController {
    api: ApiClient,
    state: watch::Sender<SessionState>,
}

impl SessionController {
    pub fn new(api: ApiClient) -> Self {
        let (state, _) = watch::channel(SessionState::Loading);
        Self { api, state }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn session(&self) -> Session {
        Session::from(&*self.state.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Wait until startup verification has finished
    pub async fn wait_until_ready(&self) -> Session {
        let mut rx = self.state.subscribe();
        // The sender lives in `self`, so this cannot observe a closed channel
        let _ = rx.wait_for(|s| !s.is_loading()).await;
        self.session()
    }

    /// Resolve the startup state from the stored token.
    ///
    /// Any failure is treated as "not logged in": the token is dropped and
    /// nothing is returned to the caller as an error.
    pub async fn initialize(&self) -> Session {
        let next = match self.api.credentials().get() {
            Ok(Some(_)) => match self.api.verify().await {
                Ok(response) => {
                    info!(user_id = %response.user.id, "Stored session verified");
                    SessionState::Authenticated(response.user)
                }
                Err(e) => {
                    warn!(error = %e, "Stored token failed verification");
                    self.clear_token();
                    SessionState::Unauthenticated
                }
            },
            Ok(None) => SessionState::Unauthenticated,
            Err(e) => {
                warn!(error = %e, "Failed to read stored token");
                self.clear_token();
                SessionState::Unauthenticated
            }
        };
        self.state.send_replace(next);
        self.session()
    }

    /// Log in and persist the issued token.
    ///
    /// A success response without a token or user is rejected with
    /// `InvalidResponse`; the store and state are left untouched.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserIdentity, ApiError> {
        let response = self.api.login(email, password).await.map_err(|e| {
            warn!(error = %e, "Login request failed");
            ApiError::InvalidCredentials
        })?;

        let token = response
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::InvalidResponse("login response did not include a token".to_string()))?;
        let user = response
            .user
            .ok_or_else(|| ApiError::InvalidResponse("login response did not include a user".to_string()))?;

        self.api.credentials().set(&token)?;
        info!(user_id = %user.id, "Logged in");
        self.state.send_replace(SessionState::Authenticated(user.clone()));
        Ok(user)
    }

    /// Forget the token locally. Never contacts the server and never fails.
    pub fn logout(&self) {
        self.clear_token();
        self.state.send_replace(SessionState::Unauthenticated);
        info!("Logged out");
    }

    /// Resync after a failed API call. Returns true when the error meant
    /// the session is gone and the state was reset.
    pub fn handle_error(&self, error: &ApiError) -> bool {
        if error.is_auth_required() {
            self.logout();
            true
        } else {
            false
        }
    }

    fn clear_token(&self) {
        if let Err(e) = self.api.credentials().delete() {
            warn!(error = %e, "Failed to delete stored token");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::auth::{CredentialStore, MemoryStore};

    // Nothing listens here; tests below must not reach the network
    const UNREACHABLE: &str = "http://127.0.0.1:9";

    fn controller(store: Arc<MemoryStore>) -> SessionController {
        SessionController::new(ApiClient::new(UNREACHABLE, store).unwrap())
    }

    fn user() -> UserIdentity {
        UserIdentity {
            id: "u1".to_string(),
            email: "a@b.com".to_string(),
            first_name: None,
            last_name: None,
            role: "staff".to_string(),
            company_id: 1,
        }
    }

    #[test]
    fn test_starts_loading() {
        let controller = controller(Arc::new(MemoryStore::new()));
        let session = controller.session();
        assert!(session.is_loading);
        assert!(!session.is_authenticated);
        assert!(session.user.is_none());
    }

    #[test]
    fn test_session_snapshot_from_state() {
        let session = Session::from(&SessionState::Authenticated(user()));
        assert!(session.is_authenticated);
        assert!(!session.is_loading);
        assert_eq!(session.user, Some(user()));

        let session = Session::from(&SessionState::Unauthenticated);
        assert!(!session.is_authenticated && !session.is_loading);
    }

    #[tokio::test]
    async fn test_initialize_without_token_skips_network() {
        let controller = controller(Arc::new(MemoryStore::new()));
        let session = controller.initialize().await;
        assert!(!session.is_loading);
        assert!(!session.is_authenticated);
        assert_eq!(controller.state(), SessionState::Unauthenticated);
    }

    #[test]
    fn test_logout_clears_token_and_state() {
        let store = Arc::new(MemoryStore::with_token("T"));
        let controller = controller(store.clone());

        controller.logout();
        assert_eq!(controller.state(), SessionState::Unauthenticated);
        assert_eq!(store.get().unwrap(), None);

        // Logging out with nothing stored is fine too
        controller.logout();
        assert_eq!(controller.state(), SessionState::Unauthenticated);
    }

    #[test]
    fn test_handle_error_only_resets_on_auth_failure() {
        let store = Arc::new(MemoryStore::with_token("T"));
        let controller = controller(store.clone());

        assert!(!controller.handle_error(&ApiError::InvalidResponse("x".to_string())));
        assert_eq!(store.get().unwrap().as_deref(), Some("T"));
        assert!(controller.state().is_loading());

        assert!(controller.handle_error(&ApiError::AuthenticationRequired));
        assert_eq!(store.get().unwrap(), None);
        assert_eq!(controller.state(), SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_wait_until_ready_returns_after_initialize() {
        let controller = Arc::new(controller(Arc::new(MemoryStore::new())));

        let waiter = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.wait_until_ready().await })
        };
        controller.initialize().await;

        let session = waiter.await.unwrap();
        assert!(!session.is_loading);
    }
}
