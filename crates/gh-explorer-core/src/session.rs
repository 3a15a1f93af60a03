//! Session lifecycle
//!
//! Owns the authenticated user profile and the flags that decide whether the
//! backend is worth asking about it. The key property is storm prevention:
//! once the backend rejected the session with a 401, or the user logged out,
//! no further profile request is made until login is explicitly initiated
//! again.
//!
//! The manager is meant to be shared behind an `Arc`. Plain state lives in a
//! `std::sync::Mutex` that is never held across an await; concurrent `init`
//! calls are coalesced through an async lock so that a single profile request
//! serves all of them.

use crate::executor::{ExecuteOptions, RequestExecutor};
use gh_explorer_client::{
    ApiError, AuthResponse, Navigator, RemoteClient, TokenStorage, UserProfile,
};
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

/// Coarse lifecycle position of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Uninitialized,
    Initializing,
    Authenticated,
    /// Initialized without a user and without a rejection
    Unauthenticated,
    /// The backend rejected the session, or the user logged out
    Failed,
}

/// Answer to "is the user signed in?"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    /// Initialization has not completed yet
    Pending,
    Authenticated,
    Unauthenticated,
}

#[derive(Debug, Default)]
struct SessionState {
    user: Option<UserProfile>,
    initialized: bool,
    initializing: bool,
    authentication_failed: bool,
    recently_logged_out: bool,
    csrf_token: String,
    loading: bool,
    error: Option<String>,
}

pub struct SessionManager {
    client: Arc<dyn RemoteClient>,
    tokens: TokenStorage,
    navigator: Arc<dyn Navigator>,
    executor: RequestExecutor,
    state: Mutex<SessionState>,
    init_lock: tokio::sync::Mutex<()>,
    initialized_tx: watch::Sender<bool>,
}

/// Marks the session initialized when `init` leaves its critical section
struct InitCompletion<'a> {
    session: &'a SessionManager,
}

impl Drop for InitCompletion<'_> {
    fn drop(&mut self) {
        self.session.finish_init();
    }
}

/// Clears the session's `loading` flag on every exit path
struct LoadingGuard<'a> {
    session: &'a SessionManager,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.session.lock().loading = false;
    }
}

impl SessionManager {
    pub fn new(
        client: Arc<dyn RemoteClient>,
        tokens: TokenStorage,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let (initialized_tx, _) = watch::channel(false);
        Self {
            client,
            tokens,
            navigator,
            executor: RequestExecutor::new(),
            state: Mutex::new(SessionState::default()),
            init_lock: tokio::sync::Mutex::new(()),
            initialized_tx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finish_init(&self) {
        {
            let mut state = self.lock();
            state.initialized = true;
            state.initializing = false;
        }
        self.initialized_tx.send_replace(true);
    }

    /// Establish the session once
    ///
    /// Returns whether a user is authenticated afterwards. Without a stored
    /// credential token no network call is made. Concurrent callers share
    /// the outcome of a single profile request.
    pub async fn init(&self) -> bool {
        {
            let state = self.lock();
            if state.initialized && state.authentication_failed {
                debug!("Session init skipped: authentication previously failed");
                return false;
            }
        }

        let _init = self.init_lock.lock().await;
        {
            let mut state = self.lock();
            if state.initialized {
                return state.user.is_some();
            }
            if self.tokens.credential_token().is_none() {
                drop(state);
                info!("No credential token stored, session starts unauthenticated");
                self.finish_init();
                return false;
            }
            state.initializing = true;
        }

        let _completion = InitCompletion { session: self };
        self.load_user().await
    }

    /// Fetch the current user's profile
    ///
    /// Short-circuits to `false` without a network call once authentication
    /// has failed. A 401 marks authentication as failed, clears the user and
    /// drops the local credential token.
    pub async fn load_user(&self) -> bool {
        {
            let mut state = self.lock();
            if state.authentication_failed {
                debug!("Profile fetch suppressed after failed authentication");
                return false;
            }
            state.loading = true;
            state.error = None;
        }
        let _loading = LoadingGuard { session: self };

        let client = self.client.as_ref();
        let profile = self
            .executor
            .execute(
                move || async move { client.get_profile().await.map(Some) },
                ExecuteOptions::new("Failed to load user profile", None),
            )
            .await;

        if let Some(user) = profile {
            info!("Authenticated as {}", user.login);
            let mut state = self.lock();
            state.user = Some(user);
            state.authentication_failed = false;
            state.recently_logged_out = false;
            return true;
        }

        let Some(error) = self.executor.error() else {
            return false;
        };
        if error.status == Some(401) {
            warn!("Session rejected by backend, suppressing further profile requests");
            self.tokens.clear_credential_token();
            let mut state = self.lock();
            state.user = None;
            state.authentication_failed = true;
            state.error = Some(error.message);
        } else {
            self.lock().error = Some(error.message);
        }
        false
    }

    /// Re-enable authentication and hand the login URL to the host
    pub fn initiate_login(&self) {
        self.lock().authentication_failed = false;
        let url = self.client.login_url();
        info!("Initiating login via {}", url);
        self.navigator.navigate(&url);
    }

    /// Finish a login callback by verifying its one-time code
    ///
    /// Tokens returned by the backend are stored, all suppression flags are
    /// reset and the session is initialized anew.
    pub async fn complete_login(&self, code: &str) -> Result<bool, ApiError> {
        let response = self.client.verify_code(code).await?;
        Ok(self.establish(response).await)
    }

    /// Like [`complete_login`](Self::complete_login), but trades the code at
    /// the token exchange endpoint instead of verifying it
    pub async fn complete_login_with_exchange(&self, code: &str) -> Result<bool, ApiError> {
        let response = self.client.exchange_token(code).await?;
        Ok(self.establish(response).await)
    }

    async fn establish(&self, response: AuthResponse) -> bool {
        if let Some(token) = response.token.as_deref().filter(|t| !t.is_empty()) {
            self.tokens.set_credential_token(token);
        }
        if let Some(csrf) = response.csrf_token.as_deref() {
            self.set_csrf_token(csrf);
        }

        {
            let mut state = self.lock();
            state.initialized = false;
            state.authentication_failed = false;
            state.recently_logged_out = false;
            state.user = None;
        }
        self.initialized_tx.send_replace(false);
        self.init().await
    }

    /// End the session locally and, when authenticated, remotely
    ///
    /// A failing remote call is logged and otherwise ignored; local state is
    /// always cleaned up and the session marked as failed so that no profile
    /// request follows.
    pub async fn logout(&self) {
        let authenticated = self.lock().user.is_some();
        if authenticated {
            let csrf = self.csrf_token();
            if let Err(e) = self.client.logout(csrf.as_deref()).await {
                warn!("Remote logout failed: {}", e);
            }
        }

        {
            let mut state = self.lock();
            state.user = None;
            state.initialized = false;
            state.initializing = false;
            state.csrf_token.clear();
            state.recently_logged_out = true;
            state.authentication_failed = true;
        }
        self.tokens.clear();
        self.initialized_tx.send_replace(false);
        info!("Logged out");
    }

    /// Refresh the credential token and persist the new pair
    pub async fn refresh_token(&self) -> Result<(), ApiError> {
        let response = self.client.refresh_token().await?;
        self.tokens.set_credential_token(&response.token);
        if let Some(csrf) = response.csrf_token.as_deref() {
            self.set_csrf_token(csrf);
        }
        debug!("Credential token refreshed");
        Ok(())
    }

    /// Store the CSRF token in memory and in session storage
    ///
    /// An empty token clears both.
    pub fn set_csrf_token(&self, token: &str) {
        self.lock().csrf_token = token.to_string();
        if token.is_empty() {
            self.tokens.clear_csrf_token();
        } else {
            self.tokens.set_csrf_token(token);
        }
    }

    /// In-memory CSRF token, falling back to session storage
    pub fn csrf_token(&self) -> Option<String> {
        let in_memory = self.lock().csrf_token.clone();
        if in_memory.is_empty() {
            self.tokens.csrf_token()
        } else {
            Some(in_memory)
        }
    }

    /// Resolve once the current initialization has completed
    pub async fn wait_initialized(&self) {
        let mut rx = self.initialized_tx.subscribe();
        // The sender lives as long as `self`
        let _ = rx.wait_for(|initialized| *initialized).await;
    }

    /// Authentication status once initialization has completed
    pub async fn resolve(&self) -> AuthStatus {
        self.wait_initialized().await;
        self.auth_status()
    }

    /// Return every flag to its initial value, leaving stored tokens alone
    pub fn reset(&self) {
        *self.lock() = SessionState::default();
        self.initialized_tx.send_replace(false);
    }

    pub fn auth_status(&self) -> AuthStatus {
        let state = self.lock();
        if !state.initialized {
            AuthStatus::Pending
        } else if state.user.is_some() {
            AuthStatus::Authenticated
        } else {
            AuthStatus::Unauthenticated
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock().user.is_some()
    }

    pub fn phase(&self) -> SessionPhase {
        let state = self.lock();
        match (state.initialized, state.initializing) {
            (false, true) => SessionPhase::Initializing,
            (false, false) => SessionPhase::Uninitialized,
            _ if state.user.is_some() => SessionPhase::Authenticated,
            _ if state.authentication_failed => SessionPhase::Failed,
            _ => SessionPhase::Unauthenticated,
        }
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.lock().user.clone()
    }

    pub fn username(&self) -> Option<String> {
        self.lock().user.as_ref().map(|user| user.login.clone())
    }

    pub fn avatar(&self) -> Option<String> {
        self.lock()
            .user
            .as_ref()
            .map(|user| user.avatar_url.clone())
            .filter(|url| !url.is_empty())
    }

    pub fn is_initialized(&self) -> bool {
        self.lock().initialized
    }

    pub fn is_initializing(&self) -> bool {
        self.lock().initializing
    }

    pub fn authentication_failed(&self) -> bool {
        self.lock().authentication_failed
    }

    pub fn recently_logged_out(&self) -> bool {
        self.lock().recently_logged_out
    }

    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    pub fn tokens(&self) -> &TokenStorage {
        &self.tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{shared, user, MockClient, RecordingNavigator};
    use std::time::Duration;

    fn session_with(mock: MockClient) -> (Arc<MockClient>, Arc<RecordingNavigator>, SessionManager) {
        let (mock, client) = shared(mock);
        let navigator = Arc::new(RecordingNavigator::default());
        let session = SessionManager::new(client, TokenStorage::in_memory(), navigator.clone());
        (mock, navigator, session)
    }

    fn unauthorized() -> ApiError {
        ApiError::from_status(401, Some("token expired".to_string()))
    }

    #[tokio::test]
    async fn test_init_without_token_makes_no_call() {
        let (mock, _, session) = session_with(MockClient::new());

        assert_eq!(session.auth_status(), AuthStatus::Pending);
        assert!(!session.init().await);

        assert_eq!(mock.total_calls(), 0);
        assert!(session.is_initialized());
        assert_eq!(session.auth_status(), AuthStatus::Unauthenticated);
        assert_eq!(session.phase(), SessionPhase::Unauthenticated);
    }

    #[tokio::test]
    async fn test_init_with_token_loads_user() {
        let (mock, _, session) = session_with(MockClient::new());
        session.tokens().set_credential_token("tok");

        assert!(session.init().await);
        assert_eq!(session.username().as_deref(), Some("octocat"));
        assert_eq!(session.avatar().as_deref(), Some("https://avatars/octocat"));
        assert_eq!(session.phase(), SessionPhase::Authenticated);
        assert!(!session.is_loading());

        // A second init is answered from state
        assert!(session.init().await);
        assert_eq!(mock.calls("get_profile"), 1);
    }

    #[tokio::test]
    async fn test_unauthorized_suppresses_further_profile_requests() {
        let mock = MockClient::new();
        *mock.profile.lock().unwrap() = Err(unauthorized());
        let (mock, _, session) = session_with(mock);
        session.tokens().set_credential_token("stale");

        assert!(!session.init().await);
        assert!(session.user().is_none());
        assert!(session.authentication_failed());
        assert_eq!(session.error().as_deref(), Some("token expired"));
        assert!(session.tokens().credential_token().is_none());
        assert_eq!(session.phase(), SessionPhase::Failed);

        assert!(!session.load_user().await);
        assert!(!session.init().await);
        assert_eq!(mock.calls("get_profile"), 1);
    }

    #[tokio::test]
    async fn test_server_error_keeps_authentication_enabled() {
        let mock = MockClient::new();
        *mock.profile.lock().unwrap() = Err(ApiError::from_status(500, None));
        let (mock, _, session) = session_with(mock);
        session.tokens().set_credential_token("tok");

        assert!(!session.init().await);
        assert!(!session.authentication_failed());
        assert_eq!(session.error().as_deref(), Some("Failed to load user profile"));

        *mock.profile.lock().unwrap() = Ok(user("octocat"));
        assert!(session.load_user().await);
        assert_eq!(mock.calls("get_profile"), 2);
    }

    #[tokio::test]
    async fn test_logout_sends_csrf_and_cleans_up() {
        let (mock, _, session) = session_with(MockClient::new());
        session.tokens().set_credential_token("tok");
        session.set_csrf_token("csrf-1");
        assert!(session.init().await);

        session.logout().await;

        assert_eq!(
            *mock.logout_csrf.lock().unwrap(),
            vec![Some("csrf-1".to_string())]
        );
        assert!(session.user().is_none());
        assert!(!session.is_initialized());
        assert!(session.csrf_token().is_none());
        assert!(session.tokens().credential_token().is_none());
        assert!(session.recently_logged_out());
        assert!(session.authentication_failed());

        assert!(!session.load_user().await);
        assert_eq!(mock.calls("get_profile"), 1);
    }

    #[tokio::test]
    async fn test_logout_cleans_up_when_remote_call_fails() {
        let mock = MockClient::new();
        *mock.logout_result.lock().unwrap() = Err(ApiError::Transport("offline".into()));
        let (mock, _, session) = session_with(mock);
        session.tokens().set_credential_token("tok");
        assert!(session.init().await);

        session.logout().await;

        assert_eq!(mock.calls("logout"), 1);
        assert!(session.user().is_none());
        assert!(session.authentication_failed());
        assert!(session.recently_logged_out());
    }

    #[tokio::test]
    async fn test_logout_when_unauthenticated_skips_remote_call() {
        let (mock, _, session) = session_with(MockClient::new());
        session.logout().await;
        assert_eq!(mock.calls("logout"), 0);
        assert!(session.authentication_failed());
    }

    #[tokio::test]
    async fn test_initiate_login_reenables_and_navigates() {
        let (mock, navigator, session) = session_with(MockClient::new());
        session.logout().await;

        session.initiate_login();

        assert!(!session.authentication_failed());
        assert_eq!(
            *navigator.visited.lock().unwrap(),
            vec!["http://backend/auth/github".to_string()]
        );
        session.tokens().set_credential_token("tok");
        assert!(session.load_user().await);
        assert_eq!(mock.calls("get_profile"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_init_shares_one_request() {
        let mock = MockClient::new();
        *mock.profile_delay.lock().unwrap() = Duration::from_millis(100);
        let (mock, _, session) = session_with(mock);
        session.tokens().set_credential_token("tok");

        let (a, b, status) = tokio::join!(session.init(), session.init(), session.resolve());

        assert!(a && b);
        assert_eq!(status, AuthStatus::Authenticated);
        assert_eq!(mock.calls("get_profile"), 1);
    }

    #[tokio::test]
    async fn test_complete_login_stores_tokens_and_initializes() {
        let mock = MockClient::new();
        *mock.verify.lock().unwrap() = Ok(AuthResponse {
            success: true,
            message: None,
            token: Some("fresh".to_string()),
            csrf_token: Some("csrf-9".to_string()),
        });
        let (mock, _, session) = session_with(mock);
        session.logout().await;

        assert!(session.complete_login("one-time").await.unwrap());

        assert_eq!(session.tokens().credential_token().as_deref(), Some("fresh"));
        assert_eq!(session.csrf_token().as_deref(), Some("csrf-9"));
        assert!(!session.recently_logged_out());
        assert_eq!(mock.calls("get_profile"), 1);
    }

    #[tokio::test]
    async fn test_exchange_login_uses_exchange_endpoint() {
        let mock = MockClient::new();
        *mock.verify.lock().unwrap() = Ok(AuthResponse {
            success: true,
            message: None,
            token: Some("exchanged".to_string()),
            csrf_token: None,
        });
        let (mock, _, session) = session_with(mock);

        assert!(session.complete_login_with_exchange("one-time").await.unwrap());

        assert_eq!(mock.calls("exchange_token"), 1);
        assert_eq!(mock.calls("verify_code"), 0);
        assert_eq!(session.tokens().credential_token().as_deref(), Some("exchanged"));
        assert_eq!(session.auth_status(), AuthStatus::Authenticated);
    }

    #[tokio::test]
    async fn test_failed_exchange_leaves_session_untouched() {
        let mock = MockClient::new();
        *mock.verify.lock().unwrap() = Err(ApiError::from_status(400, Some("bad code".to_string())));
        let (mock, _, session) = session_with(mock);

        let err = session.complete_login_with_exchange("stale").await.unwrap_err();

        assert_eq!(err.server_message(), Some("bad code"));
        assert_eq!(mock.calls("get_profile"), 0);
    }

    #[tokio::test]
    async fn test_refresh_token_persists_pair() {
        let (_, _, session) = session_with(MockClient::new());
        session.refresh_token().await.unwrap();
        assert_eq!(session.tokens().credential_token().as_deref(), Some("refreshed"));
        assert_eq!(session.csrf_token().as_deref(), Some("csrf-2"));
    }

    #[test]
    fn test_csrf_falls_back_to_storage_and_empty_clears() {
        let (_, _, session) = session_with(MockClient::new());
        session.tokens().set_csrf_token("stored");
        assert_eq!(session.csrf_token().as_deref(), Some("stored"));

        session.set_csrf_token("");
        assert!(session.csrf_token().is_none());
    }

    #[tokio::test]
    async fn test_reset_returns_to_pending() {
        let (_, _, session) = session_with(MockClient::new());
        session.init().await;
        session.reset();
        assert_eq!(session.auth_status(), AuthStatus::Pending);
        assert_eq!(session.phase(), SessionPhase::Uninitialized);
    }
}
