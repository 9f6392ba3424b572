//! Session continuity controller.
//!
//! Drives the "shorten while signed out" flow: an anonymous submission is
//! parked in the `IntentStore` and the user is sent to login; after a
//! successful login the parked URL is taken back out and the user lands on
//! the link form with it pre-filled. The controller never re-submits the URL
//! on the user's behalf.
//!
//! It also owns the reaction to `SessionEvent::Invalidated`: whatever view
//! the user is on, a purged session sends them back to login.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::auth::{IntentStore, Session, SessionEvent, TeardownReason};
use crate::models::{CreateUrlRequest, RegisterRequest, ShortUrl};
use crate::storage::StorageError;
use crate::utils::{redirect_target, short_link, validate_url, ValidationError};

/// Notice shown on the login view after a forced sign-out
pub const SESSION_EXPIRED_NOTICE: &str = "Your session has expired. Please log in again.";

/// Views the controller can send the user to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    Register,
    Dashboard,
    /// Link management, optionally with the create form pre-filled
    Links { prefill: Option<String> },
    /// Hand off to the server-side redirect for a short code
    Redirect(String),
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Login => "/login".to_string(),
            Route::Register => "/register".to_string(),
            Route::Dashboard => "/dashboard".to_string(),
            Route::Links { .. } => "/urls".to_string(),
            Route::Redirect(code) => format!("/r/{}", code),
        }
    }
}

/// Imperative navigation supplied by the front end.
pub trait Router {
    fn navigate(&mut self, route: Route);
}

/// Where the user is in the shorten/login flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    AnonymousIdle,
    AnonymousIntentCaptured,
    Authenticating,
    AuthenticatedResuming,
    AuthenticatedIdle,
}

impl FlowState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, FlowState::AuthenticatedResuming | FlowState::AuthenticatedIdle)
    }
}

/// Result of a shorten request that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The link was created right away
    Created(ShortUrl),
    /// The user is signed out; the URL was parked and login requested
    Deferred,
}

#[derive(Error, Debug)]
pub enum FlowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Failed to update local storage: {0}")]
    Storage(#[from] StorageError),
}

impl FlowError {
    /// Message for inline display next to the form that failed
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            FlowError::Api(e) => e.user_message(fallback),
            other => other.to_string(),
        }
    }
}

pub struct SessionController<R: Router> {
    session: Arc<Session>,
    intents: IntentStore,
    api: ApiClient,
    router: R,
    events: broadcast::Receiver<SessionEvent>,
    state: FlowState,
    public_base_url: String,
    notice: Option<String>,
    /// URL handed back to the link form after a resumed login. Dropped with
    /// the session so it never outlives the identity that parked it.
    restored: Option<String>,
}

impl<R: Router> SessionController<R> {
    /// Wire up the controller. The starting state reflects whatever
    /// credential the session restored from persistent storage.
    pub fn new(session: Arc<Session>, intents: IntentStore, api: ApiClient, router: R, public_base_url: &str) -> Self {
        let events = session.subscribe();
        let state = if session.is_authenticated() {
            FlowState::AuthenticatedIdle
        } else {
            FlowState::AnonymousIdle
        };
        debug!(?state, "Session controller initialized");

        Self {
            session,
            intents,
            api,
            router,
            events,
            state,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            notice: None,
            restored: None,
        }
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn router(&self) -> &R {
        &self.router
    }

    pub fn router_mut(&mut self) -> &mut R {
        &mut self.router
    }

    /// URL the link form should be pre-filled with, if a login resumed one
    pub fn restored_input(&self) -> Option<&str> {
        self.restored.as_deref()
    }

    /// One-shot message for the next view (e.g. "session expired")
    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }

    // =========================================================================
    // Shortening
    // =========================================================================

    /// Shorten `input` with default options.
    pub async fn submit(&mut self, input: &str) -> Result<SubmitOutcome, FlowError> {
        self.confirm_link(CreateUrlRequest::new(input)).await
    }

    /// Create a link from the full form. Signed-out users have the URL parked
    /// and are sent to login instead; nothing goes over the network.
    pub async fn confirm_link(&mut self, mut request: CreateUrlRequest) -> Result<SubmitOutcome, FlowError> {
        request.original_url = validate_url(&request.original_url)?;

        if !self.session.is_authenticated() {
            self.intents.save(&request.original_url)?;
            self.state = FlowState::AnonymousIntentCaptured;
            info!("Sign-in required, pending URL saved");
            self.router.navigate(Route::Login);
            return Ok(SubmitOutcome::Deferred);
        }

        let api = self.api.clone();
        let result = api.create_url(&request).await;
        let link = self.settle(result)?;
        self.state = FlowState::AuthenticatedIdle;
        self.restored = None;
        Ok(SubmitOutcome::Created(link))
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Go to login without a pending action.
    pub fn begin_login(&mut self) {
        self.router.navigate(Route::Login);
    }

    pub fn begin_register(&mut self) {
        self.router.navigate(Route::Register);
    }

    /// Sign in and route onward: to the pre-filled link form when a URL was
    /// parked, otherwise to the dashboard. On failure the parked URL stays
    /// where it is and the state returns to what it was.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<Route, FlowError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(ValidationError::MissingCredentials.into());
        }

        let previous = self.state;
        self.state = FlowState::Authenticating;

        let api = self.api.clone();
        let response = match api.login(username, password).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Login failed");
                self.state = previous;
                return Err(match e {
                    ApiError::Unauthorized(_) => FlowError::InvalidCredentials,
                    ApiError::SessionExpired => {
                        // The request carried an old token, which is now gone
                        self.drain_events();
                        self.restored = None;
                        if previous.is_authenticated() {
                            self.state = FlowState::AnonymousIdle;
                        }
                        FlowError::InvalidCredentials
                    }
                    other => FlowError::Api(other),
                });
            }
        };

        if let Err(e) = self.session.establish(&response.token, &response.user) {
            self.state = previous;
            return Err(e.into());
        }
        // Our own SignedIn event needs no reaction
        self.drain_events();

        let route = match self.intents.take_if_present() {
            Some(url) => {
                self.state = FlowState::AuthenticatedResuming;
                info!("Resuming pending link after login");
                self.restored = Some(url.clone());
                Route::Links { prefill: Some(url) }
            }
            None => {
                self.state = FlowState::AuthenticatedIdle;
                self.restored = None;
                Route::Dashboard
            }
        };

        self.router.navigate(route.clone());
        Ok(route)
    }

    /// Create an account, then send the user to login. A parked URL is kept
    /// for the login that follows.
    pub async fn register(&mut self, request: &RegisterRequest) -> Result<(), FlowError> {
        let required = [
            ("Username", &request.username),
            ("Email", &request.email),
            ("Password", &request.password),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(ValidationError::MissingField(*field).into());
        }

        let api = self.api.clone();
        let result = api.register(request).await;
        self.settle(result)?;
        info!(username = %request.username, "Registration successful");
        self.router.navigate(Route::Login);
        Ok(())
    }

    /// Sign out from any state. Any parked URL is dropped with the session
    /// so it cannot be resumed under a different identity.
    pub fn logout(&mut self) {
        self.session.teardown(TeardownReason::Logout);
        self.intents.discard();
        self.restored = None;
        self.drain_events();
        self.state = FlowState::AnonymousIdle;
        self.router.navigate(Route::Login);
    }

    /// Apply session events raised elsewhere (by the request pipeline).
    ///
    /// Returns true if the session was invalidated and the user redirected.
    pub fn process_session_events(&mut self) -> bool {
        let mut invalidated = false;
        loop {
            match self.events.try_recv() {
                Ok(SessionEvent::Invalidated) => invalidated = true,
                Ok(event) => debug!(?event, "Session event"),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Session events lagged");
                    // Missed events may have included a teardown
                    invalidated |= !self.session.is_authenticated() && self.state.is_authenticated();
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }

        if invalidated {
            self.state = FlowState::AnonymousIdle;
            self.restored = None;
            self.notice = Some(SESSION_EXPIRED_NOTICE.to_string());
            self.router.navigate(Route::Login);
        }
        invalidated
    }

    // =========================================================================
    // Links
    // =========================================================================

    /// Public URL for a short code
    pub fn short_link(&self, short_code: &str) -> String {
        short_link(&self.public_base_url, short_code)
    }

    /// Follow a short link through the server's redirect endpoint.
    pub fn open_short_link(&mut self, short_code: &str) -> String {
        self.router.navigate(Route::Redirect(short_code.to_string()));
        redirect_target(self.api.base_url(), short_code)
    }

    /// Mark a resumed intent as dealt with (the user dismissed the form)
    pub fn finish_resume(&mut self) {
        self.restored = None;
        if self.state == FlowState::AuthenticatedResuming {
            self.state = FlowState::AuthenticatedIdle;
        }
    }

    /// Pass an API result through, reacting to a session teardown first.
    fn settle<T>(&mut self, result: Result<T, ApiError>) -> Result<T, FlowError> {
        if let Err(ref e) = result {
            if e.is_session_expired() {
                self.process_session_events();
            }
        }
        result.map_err(FlowError::from)
    }

    fn drain_events(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(event) => debug!(?event, "Session event"),
                Err(TryRecvError::Lagged(skipped)) => debug!(skipped, "Skipped session events"),
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{KeyValueStore, MemoryStore};
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct RecordingRouter {
        history: Vec<Route>,
    }

    impl Router for RecordingRouter {
        fn navigate(&mut self, route: Route) {
            self.history.push(route);
        }
    }

    struct Harness {
        controller: SessionController<RecordingRouter>,
        ephemeral: Arc<MemoryStore>,
    }

    impl Harness {
        fn history(&self) -> &[Route] {
            &self.controller.router().history
        }

        fn pending(&self) -> Option<String> {
            self.ephemeral.get("pendingUrl").unwrap()
        }
    }

    fn harness(server: &MockServer) -> Harness {
        harness_with_store(server, Arc::new(MemoryStore::new()))
    }

    fn harness_with_store(server: &MockServer, persistent: Arc<MemoryStore>) -> Harness {
        let session = Arc::new(Session::init(persistent));
        let ephemeral = Arc::new(MemoryStore::new());
        let intents = IntentStore::new(ephemeral.clone());
        let api = ApiClient::new(&server.uri(), Duration::from_secs(5), session.clone()).unwrap();
        let controller = SessionController::new(
            session,
            intents,
            api,
            RecordingRouter::default(),
            "http://sho.rt/",
        );
        Harness { controller, ephemeral }
    }

    async fn mount_login_ok(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/user/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token": "jwt-1",
                "user": {"id": 1, "username": "alice", "role": "user"}
            })))
            .mount(server)
            .await;
    }

    async fn sign_in(h: &mut Harness, server: &MockServer) {
        mount_login_ok(server).await;
        h.controller.login("alice", "secret").await.unwrap();
        h.controller.router_mut().history.clear();
    }

    #[tokio::test]
    async fn test_anonymous_submit_defers_and_resumes_after_login() {
        let server = MockServer::start().await;
        mount_login_ok(&server).await;
        // Creating a link must not happen during this flow
        Mock::given(method("POST"))
            .and(path("/url"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let mut h = harness(&server);
        assert_eq!(h.controller.state(), FlowState::AnonymousIdle);

        let outcome = h.controller.submit("https://example.com/a").await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Deferred);
        assert_eq!(h.controller.state(), FlowState::AnonymousIntentCaptured);
        assert_eq!(h.pending().as_deref(), Some("https://example.com/a"));
        assert_eq!(h.history(), &[Route::Login]);

        let route = h.controller.login("alice", "secret").await.unwrap();
        assert_eq!(
            route,
            Route::Links {
                prefill: Some("https://example.com/a".to_string())
            }
        );
        assert_eq!(h.controller.state(), FlowState::AuthenticatedResuming);
        assert_eq!(h.controller.restored_input(), Some("https://example.com/a"));
        assert_eq!(h.pending(), None);
        assert_eq!(h.history().last(), Some(&route));
        assert!(h.controller.session().is_authenticated());
    }

    #[tokio::test]
    async fn test_direct_login_goes_to_dashboard() {
        let server = MockServer::start().await;
        mount_login_ok(&server).await;

        let mut h = harness(&server);
        h.controller.begin_login();
        assert_eq!(h.pending(), None);

        let route = h.controller.login("alice", "secret").await.unwrap();
        assert_eq!(route, Route::Dashboard);
        assert_eq!(h.controller.state(), FlowState::AuthenticatedIdle);
        assert_eq!(h.pending(), None);
        assert_eq!(h.history(), &[Route::Login, Route::Dashboard]);
    }

    #[tokio::test]
    async fn test_invalid_url_saves_nothing_and_stays_put() {
        let server = MockServer::start().await;
        let mut h = harness(&server);

        let err = h.controller.submit("ftp://bad").await.unwrap_err();
        assert!(matches!(err, FlowError::Validation(ValidationError::InvalidUrl)));
        assert_eq!(err.to_string(), "Please enter a valid URL");
        assert_eq!(h.pending(), None);
        assert!(h.history().is_empty());
        assert_eq!(h.controller.state(), FlowState::AnonymousIdle);

        let err = h.controller.submit("   ").await.unwrap_err();
        assert!(matches!(err, FlowError::Validation(ValidationError::EmptyUrl)));
        assert!(h.history().is_empty());
    }

    #[tokio::test]
    async fn test_failed_login_keeps_intent_for_next_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/user/login"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(serde_json::json!({"message": "Invalid credentials"})),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        mount_login_ok(&server).await;

        let mut h = harness(&server);
        h.controller.submit("https://example.com/keep").await.unwrap();

        let err = h.controller.login("alice", "wrong").await.unwrap_err();
        assert!(matches!(err, FlowError::InvalidCredentials));
        assert_eq!(h.controller.state(), FlowState::AnonymousIntentCaptured);
        assert_eq!(h.pending().as_deref(), Some("https://example.com/keep"));
        assert!(!h.controller.process_session_events());

        let route = h.controller.login("alice", "secret").await.unwrap();
        assert_eq!(
            route,
            Route::Links {
                prefill: Some("https://example.com/keep".to_string())
            }
        );
    }

    #[tokio::test]
    async fn test_login_requires_both_fields() {
        let server = MockServer::start().await;
        let mut h = harness(&server);
        let err = h.controller.login("", "secret").await.unwrap_err();
        assert!(matches!(err, FlowError::Validation(ValidationError::MissingCredentials)));
        assert_eq!(h.controller.state(), FlowState::AnonymousIdle);
    }

    #[tokio::test]
    async fn test_authenticated_submit_creates_link() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/url"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "url": {"id": 3, "short_code": "xYz12", "original_url": "https://example.com/b"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut h = harness(&server);
        sign_in(&mut h, &server).await;

        let outcome = h.controller.submit("https://example.com/b").await.unwrap();
        match outcome {
            SubmitOutcome::Created(link) => {
                assert_eq!(link.short_code, "xYz12");
                assert_eq!(h.controller.short_link(&link.short_code), "http://sho.rt/r/xYz12");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(h.controller.state(), FlowState::AuthenticatedIdle);
        assert_eq!(h.pending(), None);
        assert!(h.history().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_credential_on_create_forces_login() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/url"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let mut h = harness(&server);
        sign_in(&mut h, &server).await;

        let err = h.controller.submit("https://example.com/c").await.unwrap_err();
        assert!(matches!(err, FlowError::Api(ApiError::SessionExpired)));
        assert!(!h.controller.session().is_authenticated());
        assert_eq!(h.controller.state(), FlowState::AnonymousIdle);
        assert_eq!(h.history(), &[Route::Login]);
        assert_eq!(h.controller.take_notice().as_deref(), Some(SESSION_EXPIRED_NOTICE));

        // A later call goes out without a credential and gets no data
        let api = h.controller.api().clone();
        assert!(api.list_urls().await.is_err());
    }

    #[tokio::test]
    async fn test_late_rejection_from_other_caller_redirects() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/analytics/dashboard"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let mut h = harness(&server);
        sign_in(&mut h, &server).await;

        // A call made outside the controller still tears the session down
        let api = h.controller.api().clone();
        assert!(matches!(api.dashboard().await, Err(ApiError::SessionExpired)));

        assert!(h.controller.process_session_events());
        assert_eq!(h.controller.state(), FlowState::AnonymousIdle);
        assert_eq!(h.history(), &[Route::Login]);

        // Nothing left to react to
        assert!(!h.controller.process_session_events());
    }

    #[tokio::test]
    async fn test_logout_clears_credential_and_pending_intent() {
        let server = MockServer::start().await;
        let mut h = harness(&server);
        sign_in(&mut h, &server).await;
        h.ephemeral.set("pendingUrl", "https://example.com/stale").unwrap();

        h.controller.logout();

        assert!(!h.controller.session().is_authenticated());
        assert_eq!(h.pending(), None);
        assert_eq!(h.controller.state(), FlowState::AnonymousIdle);
        assert_eq!(h.history(), &[Route::Login]);
        assert!(!h.controller.process_session_events());
    }

    #[tokio::test]
    async fn test_restored_session_starts_authenticated() {
        let server = MockServer::start().await;
        let persistent = Arc::new(MemoryStore::new());
        {
            let h = harness_with_store(&server, persistent.clone());
            h.controller
                .session()
                .establish("saved", &crate::models::UserProfile {
                    id: 1,
                    username: "alice".to_string(),
                    full_name: None,
                    email: None,
                    role: Default::default(),
                })
                .unwrap();
        }

        let h = harness_with_store(&server, persistent);
        assert_eq!(h.controller.state(), FlowState::AuthenticatedIdle);
    }

    #[tokio::test]
    async fn test_register_routes_to_login_and_keeps_intent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/user/register"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"message": "created"})))
            .expect(1)
            .mount(&server)
            .await;

        let mut h = harness(&server);
        h.controller.submit("https://example.com/new").await.unwrap();

        let request = RegisterRequest {
            username: "bob".to_string(),
            email: "bob@example.com".to_string(),
            password: "hunter22".to_string(),
            full_name: "Bob".to_string(),
        };
        h.controller.register(&request).await.unwrap();

        assert_eq!(h.history().last(), Some(&Route::Login));
        assert_eq!(h.pending().as_deref(), Some("https://example.com/new"));
    }

    #[tokio::test]
    async fn test_register_validates_required_fields() {
        let server = MockServer::start().await;
        let mut h = harness(&server);
        let request = RegisterRequest {
            username: "bob".to_string(),
            ..Default::default()
        };
        let err = h.controller.register(&request).await.unwrap_err();
        assert_eq!(err.to_string(), "Email is required");
    }

    #[tokio::test]
    async fn test_server_validation_error_passes_through() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/url"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(serde_json::json!({"message": "Alias already in use"})),
            )
            .mount(&server)
            .await;

        let mut h = harness(&server);
        sign_in(&mut h, &server).await;

        let request = CreateUrlRequest::new("https://example.com/d").with_alias("taken");
        let err = h.controller.confirm_link(request).await.unwrap_err();
        assert_eq!(err.user_message("Failed to create link"), "Alias already in use");
        assert!(h.controller.session().is_authenticated());
        assert!(h.history().is_empty());
    }

    #[tokio::test]
    async fn test_open_short_link() {
        let server = MockServer::start().await;
        let mut h = harness(&server);
        let target = h.controller.open_short_link("abc");
        assert_eq!(target, format!("{}/r/abc", server.uri()));
        assert_eq!(h.history(), &[Route::Redirect("abc".to_string())]);
        assert_eq!(Route::Redirect("abc".to_string()).path(), "/r/abc");
    }

    fn profile(username: &str) -> crate::models::UserProfile {
        crate::models::UserProfile {
            id: 9,
            username: username.to_string(),
            full_name: None,
            email: None,
            role: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_forced_teardown_drops_restored_url() {
        let server = MockServer::start().await;
        mount_login_ok(&server).await;
        Mock::given(method("GET"))
            .and(path("/url"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let mut h = harness(&server);
        h.controller.submit("https://alice.example/private").await.unwrap();
        h.controller.login("alice", "secret").await.unwrap();
        assert_eq!(h.controller.restored_input(), Some("https://alice.example/private"));

        let api = h.controller.api().clone();
        assert!(api.list_urls().await.is_err());
        assert!(h.controller.process_session_events());
        assert_eq!(h.controller.restored_input(), None);

        // The next identity starts from a clean form
        let route = h.controller.login("bob", "secret").await.unwrap();
        assert_eq!(route, Route::Dashboard);
        assert_eq!(h.controller.restored_input(), None);
    }

    #[tokio::test]
    async fn test_logout_and_create_drop_restored_url() {
        let server = MockServer::start().await;
        mount_login_ok(&server).await;
        Mock::given(method("POST"))
            .and(path("/url"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "url": {"id": 4, "short_code": "k9", "original_url": "https://example.com/e"}
            })))
            .mount(&server)
            .await;

        let mut h = harness(&server);
        h.controller.submit("https://example.com/e").await.unwrap();
        h.controller.login("alice", "secret").await.unwrap();
        h.controller.submit("https://example.com/e").await.unwrap();
        assert_eq!(h.controller.restored_input(), None);

        h.controller.logout();
        h.controller.submit("https://example.com/f").await.unwrap();
        h.controller.login("alice", "secret").await.unwrap();
        h.controller.logout();
        assert_eq!(h.controller.restored_input(), None);
    }

    #[tokio::test]
    async fn test_wrong_password_with_stale_token_reports_invalid_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/user/login"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(serde_json::json!({"message": "Invalid credentials"})),
            )
            .mount(&server)
            .await;

        let mut h = harness(&server);
        h.controller.session().establish("old", &profile("alice")).unwrap();

        let err = h.controller.login("alice", "wrong").await.unwrap_err();
        assert!(matches!(err, FlowError::InvalidCredentials));
        assert_eq!(err.user_message("Login failed"), "Invalid username or password");
        assert!(!h.controller.session().is_authenticated());
        assert_eq!(h.controller.state(), FlowState::AnonymousIdle);
        assert!(!h.controller.process_session_events());
    }

    #[tokio::test]
    async fn test_login_after_lagged_events_is_not_undone() {
        let server = MockServer::start().await;
        mount_login_ok(&server).await;

        let mut h = harness(&server);
        let session = h.controller.session().clone();
        for _ in 0..20 {
            session.establish("old", &profile("alice")).unwrap();
        }
        session.teardown(TeardownReason::Rejected);

        let route = h.controller.login("alice", "secret").await.unwrap();
        assert_eq!(route, Route::Dashboard);
        assert!(!h.controller.process_session_events());
        assert_eq!(h.controller.state(), FlowState::AuthenticatedIdle);
        assert!(h.controller.session().is_authenticated());
    }
}
