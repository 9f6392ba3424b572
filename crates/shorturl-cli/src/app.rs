//! Interactive application state and command handling.
//!
//! The `App` owns the session controller and renders whatever view the
//! controller last navigated to. Session events raised by the request
//! pipeline are applied after every command so a rejected credential sends
//! the user back to login no matter which command triggered it.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Result;
use chrono::{TimeDelta, Utc};
use tracing::{debug, warn};

use shorturl_core::config::{ENV_PASSWORD, ENV_USERNAME};
use shorturl_core::models::{ClicksQuery, CreateUrlRequest, RegisterRequest, Role, UpdateUrlRequest};
use shorturl_core::utils::validate_url;
use shorturl_core::{ApiError, Config, FlowError, Route, Router, SessionController, SubmitOutcome};

use crate::commands::{parse_line, Command};
use crate::views;

/// Fallback when an error carries no message of its own
const GENERIC_ERROR: &str = "Something went wrong. Please try again.";

// ============================================================================
// Router
// ============================================================================

/// Router for the terminal: remembers the current view and whether it still
/// needs to be drawn.
#[derive(Debug)]
pub struct TerminalRouter {
    current: Route,
    pending: Option<Route>,
}

impl TerminalRouter {
    pub fn new(start: Route) -> Self {
        Self {
            current: start.clone(),
            pending: Some(start),
        }
    }

    pub fn current(&self) -> &Route {
        &self.current
    }

    /// Take the view waiting to be drawn, if any
    pub fn take_pending(&mut self) -> Option<Route> {
        self.pending.take()
    }
}

impl Router for TerminalRouter {
    fn navigate(&mut self, route: Route) {
        debug!(path = %route.path(), "Navigate");
        self.current = route.clone();
        self.pending = Some(route);
    }
}

// ============================================================================
// App
// ============================================================================

pub struct App {
    controller: SessionController<TerminalRouter>,
    config: Config,
    /// Where to save `config`; `None` uses the default location
    config_path: Option<PathBuf>,
}

impl App {
    pub fn new(controller: SessionController<TerminalRouter>, config: Config, config_path: Option<PathBuf>) -> Self {
        Self {
            controller,
            config,
            config_path,
        }
    }

    pub fn controller(&self) -> &SessionController<TerminalRouter> {
        &self.controller
    }

    /// Read commands from stdin until `quit` or end of input.
    pub async fn run(&mut self) -> Result<()> {
        self.render_pending().await;

        let stdin = io::stdin();
        let mut line = String::new();
        loop {
            print!("{} > ", self.controller.router().current().path());
            io::stdout().flush()?;

            line.clear();
            if stdin.lock().read_line(&mut line)? == 0 {
                break;
            }

            let command = match parse_line(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(e) => {
                    eprintln!("{}", e.trim_end());
                    continue;
                }
            };

            if !self.handle(command).await {
                break;
            }
        }
        Ok(())
    }

    /// Run one command, apply session events and draw the resulting view.
    /// Returns false when the user asked to quit.
    pub async fn handle(&mut self, command: Command) -> bool {
        if command == Command::Quit {
            return false;
        }

        self.dispatch(command).await;
        self.controller.process_session_events();
        self.render_pending().await;
        true
    }

    async fn dispatch(&mut self, command: Command) {
        match command {
            Command::Shorten { url } => self.create(CreateUrlRequest::new(url)).await,
            Command::Create {
                url,
                alias,
                title,
                expires,
            } => {
                let Some(url) = url.or_else(|| self.controller.restored_input().map(str::to_string)) else {
                    eprintln!("Give a URL to shorten, e.g. `create https://example.com`");
                    return;
                };
                let request = CreateUrlRequest {
                    original_url: url,
                    custom_alias: alias,
                    title,
                    expires_at: expires,
                };
                self.create(request).await;
            }
            Command::Login { username } => self.login(username).await,
            Command::Register => self.register().await,
            Command::Logout => {
                self.controller.logout();
                println!("Logged out.");
            }
            Command::Stats => {
                if self.require_login() {
                    self.controller.router_mut().navigate(Route::Dashboard);
                }
            }
            Command::Links => {
                if self.require_login() {
                    self.controller.router_mut().navigate(Route::Links { prefill: None });
                }
            }
            Command::Show { id } => {
                if !self.require_login() {
                    return;
                }
                match self.controller.api().get_url(id).await {
                    Ok(link) => views::print_link(&link, &self.controller.short_link(&link.short_code)),
                    Err(e) => report_api(&e),
                }
            }
            Command::Edit {
                id,
                url,
                alias,
                title,
                expires,
            } => self.edit(id, url, alias, title, expires).await,
            Command::Delete { id } => {
                if !self.require_login() {
                    return;
                }
                match self.controller.api().delete_url(id).await {
                    Ok(()) => println!("Deleted link {}.", id),
                    Err(e) => report_api(&e),
                }
            }
            Command::Analytics { id, limit, days } => self.analytics(id, limit, days).await,
            Command::Open { code } => {
                let target = self.controller.open_short_link(&code);
                println!("Open {} in your browser.", target);
            }
            Command::Whoami => {
                if !self.require_login() {
                    return;
                }
                match self.controller.api().user_info().await {
                    Ok(user) => views::print_profile(&user),
                    Err(e) => report_api(&e),
                }
            }
            Command::Users => {
                if !self.require_admin() {
                    return;
                }
                match self.controller.api().users().await {
                    Ok(users) => views::print_users(&users),
                    Err(e) => report_api(&e),
                }
            }
            Command::Role { user_id, role } => {
                if !self.require_admin() {
                    return;
                }
                match self.controller.api().change_role(user_id, Role::from(role)).await {
                    Ok(()) => println!("Role updated."),
                    Err(e) => report_api(&e),
                }
            }
            Command::Toggle { user_id } => {
                if !self.require_admin() {
                    return;
                }
                match self.controller.api().toggle_active(user_id).await {
                    Ok(()) => println!("Account status updated."),
                    Err(e) => report_api(&e),
                }
            }
            Command::Help => views::print_help(),
            Command::Quit => {}
        }
    }

    async fn create(&mut self, request: CreateUrlRequest) {
        match self.controller.confirm_link(request).await {
            Ok(SubmitOutcome::Created(link)) => {
                println!("Short link: {}", self.controller.short_link(&link.short_code));
                self.controller.finish_resume();
            }
            Ok(SubmitOutcome::Deferred) => {
                println!("Log in to finish shortening this link.");
            }
            Err(e) => report_flow(&e),
        }
    }

    async fn login(&mut self, username: Option<String>) {
        let username = match pick_username(
            username,
            std::env::var(ENV_USERNAME).ok(),
            self.config.last_username.clone(),
        ) {
            Some(name) => name,
            None => match prompt("Username: ") {
                Ok(name) => name,
                Err(e) => {
                    eprintln!("Failed to read username: {}", e);
                    return;
                }
            },
        };

        let password = match std::env::var(ENV_PASSWORD).ok().filter(|p| !p.is_empty()) {
            Some(password) => password,
            None => match rpassword::prompt_password("Password: ") {
                Ok(password) => password,
                Err(e) => {
                    eprintln!("Failed to read password: {}", e);
                    return;
                }
            },
        };

        match self.controller.login(&username, &password).await {
            Ok(route) => {
                if let Some(user) = self.controller.session().user() {
                    println!("Signed in as {}.", user.display_name());
                }
                if let Route::Links { .. } = route {
                    println!("Picking up where you left off.");
                }
                self.remember_username(&username);
            }
            Err(e) => report_flow(&e),
        }
    }

    async fn register(&mut self) {
        self.controller.begin_register();
        self.render_pending().await;

        let request = match read_registration() {
            Ok(request) => request,
            Err(e) => {
                eprintln!("Failed to read input: {}", e);
                return;
            }
        };

        match self.controller.register(&request).await {
            Ok(()) => println!("Account created. Log in to continue."),
            Err(e) => report_flow(&e),
        }
    }

    async fn edit(
        &mut self,
        id: i64,
        url: Option<String>,
        alias: Option<String>,
        title: Option<String>,
        expires: Option<String>,
    ) {
        if !self.require_login() {
            return;
        }
        let original_url = match url.as_deref().map(validate_url).transpose() {
            Ok(url) => url,
            Err(e) => {
                eprintln!("{}", e);
                return;
            }
        };
        let request = UpdateUrlRequest {
            original_url,
            custom_alias: alias,
            title,
            expires_at: expires,
        };
        if request == UpdateUrlRequest::default() {
            eprintln!("Nothing to change. Use --url, --alias, --title or --expires.");
            return;
        }

        match self.controller.api().update_url(id, &request).await {
            Ok(link) => views::print_link(&link, &self.controller.short_link(&link.short_code)),
            Err(e) => report_api(&e),
        }
    }

    async fn analytics(&mut self, id: i64, limit: u32, days: Option<i64>) {
        if !self.require_login() {
            return;
        }
        let start_date = match days.map(since_date) {
            Some(None) => {
                eprintln!("--days is out of range");
                return;
            }
            Some(date) => date,
            None => None,
        };
        let query = ClicksQuery {
            limit: Some(limit),
            start_date,
            ..Default::default()
        };

        let api = self.controller.api().clone();
        let (analytics, summary, clicks) =
            tokio::join!(api.url_analytics(id), api.summary(id), api.clicks(id, &query));
        match (analytics, summary, clicks) {
            (Ok(analytics), Ok(summary), Ok(clicks)) => {
                views::print_analytics(&analytics, &summary, &clicks.clicks)
            }
            (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => report_api(&e),
        }
    }

    /// Send signed-out users to login instead of making a doomed request.
    fn require_login(&mut self) -> bool {
        if self.controller.session().is_authenticated() {
            return true;
        }
        println!("Please log in first.");
        self.controller.begin_login();
        false
    }

    /// Admin commands need an admin profile; the server enforces it too.
    fn require_admin(&mut self) -> bool {
        if !self.require_login() {
            return false;
        }
        let is_admin = self.controller.session().user().map(|u| u.is_admin()).unwrap_or(false);
        if !is_admin {
            eprintln!("Admin access required.");
        }
        is_admin
    }

    fn remember_username(&mut self, username: &str) {
        if self.config.last_username.as_deref() == Some(username) {
            return;
        }
        self.config.last_username = Some(username.to_string());
        let saved = match self.config_path {
            Some(ref path) => self.config.save_to(path),
            None => self.config.save(),
        };
        if let Err(e) = saved {
            warn!(error = %e, "Failed to save config");
        }
    }

    /// Draw views until the router has nothing pending. Loading a view can
    /// itself trigger a redirect (a rejected credential), hence the loop.
    async fn render_pending(&mut self) {
        while let Some(route) = self.controller.router_mut().take_pending() {
            self.render(route).await;
            self.controller.process_session_events();
        }
    }

    async fn render(&mut self, route: Route) {
        match route {
            Route::Home => views::print_home(),
            Route::Login => {
                let notice = self.controller.take_notice();
                views::print_login(notice.as_deref(), self.config.last_username.as_deref());
            }
            Route::Register => views::print_register(),
            Route::Dashboard => match self.controller.api().dashboard().await {
                Ok(stats) => {
                    let user = self.controller.session().user();
                    views::print_dashboard(user.as_ref(), &stats);
                }
                Err(e) => report_api(&e),
            },
            Route::Links { .. } => {
                match self.controller.api().list_urls().await {
                    Ok(links) => views::print_links(&links, |code| self.controller.short_link(code)),
                    Err(e) => {
                        report_api(&e);
                        return;
                    }
                }
                if let Some(url) = self.controller.restored_input() {
                    views::print_prefilled_form(url);
                }
            }
            Route::Redirect(_) => {}
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Explicit argument, then environment, then the last name used.
fn pick_username(arg: Option<String>, env: Option<String>, last: Option<String>) -> Option<String> {
    [arg, env, last]
        .into_iter()
        .flatten()
        .map(|name| name.trim().to_string())
        .find(|name| !name.is_empty())
}

/// `YYYY-MM-DD` for `days` days ago, or `None` when that date is not representable
fn since_date(days: i64) -> Option<String> {
    let delta = TimeDelta::try_days(days.max(0))?;
    Utc::now()
        .checked_sub_signed(delta)
        .map(|date| date.format("%Y-%m-%d").to_string())
}

fn prompt(label: &str) -> io::Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut value = String::new();
    io::stdin().lock().read_line(&mut value)?;
    Ok(value.trim().to_string())
}

fn read_registration() -> io::Result<RegisterRequest> {
    Ok(RegisterRequest {
        username: prompt("Username: ")?,
        email: prompt("Email: ")?,
        full_name: prompt("Full name: ")?,
        password: rpassword::prompt_password("Password: ")?,
    })
}

fn report_flow(e: &FlowError) {
    eprintln!("Error: {}", e.user_message(GENERIC_ERROR));
}

fn report_api(e: &ApiError) {
    eprintln!("Error: {}", e.user_message(GENERIC_ERROR));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use shorturl_core::storage::{KeyValueStore, MemoryStore};
    use shorturl_core::{ApiClient, FlowState, IntentStore, Session};
    use tempfile::TempDir;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn app(server: &MockServer, dir: &TempDir) -> App {
        let persistent: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let session = Arc::new(Session::init(persistent));
        let intents = IntentStore::new(Arc::new(MemoryStore::new()));
        let api = ApiClient::new(&server.uri(), Duration::from_secs(5), session.clone()).unwrap();
        let controller = SessionController::new(
            session,
            intents,
            api,
            TerminalRouter::new(Route::Home),
            "https://sho.rt",
        );
        App::new(controller, Config::default(), Some(dir.path().join("config.json")))
    }

    async fn mount_links(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/url"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"urls": []})))
            .mount(server)
            .await;
    }

    #[test]
    fn test_router_records_pending_view() {
        let mut router = TerminalRouter::new(Route::Home);
        assert_eq!(router.take_pending(), Some(Route::Home));
        assert_eq!(router.take_pending(), None);

        router.navigate(Route::Login);
        assert_eq!(router.current(), &Route::Login);
        assert_eq!(router.take_pending(), Some(Route::Login));
        assert_eq!(router.current(), &Route::Login);
    }

    #[test]
    fn test_pick_username_precedence() {
        assert_eq!(
            pick_username(Some("arg".into()), Some("env".into()), Some("last".into())),
            Some("arg".to_string())
        );
        assert_eq!(
            pick_username(None, Some("env".into()), Some("last".into())),
            Some("env".to_string())
        );
        assert_eq!(
            pick_username(Some("  ".into()), None, Some("last".into())),
            Some("last".to_string())
        );
        assert_eq!(pick_username(None, None, None), None);
    }

    #[test]
    fn test_since_date_out_of_range() {
        assert_eq!(since_date(i64::MAX), None);
        assert_eq!(since_date(99_999_999_999_999), None);
        assert!(since_date(-3).is_some());
    }

    #[test]
    fn test_since_date_format() {
        let date = since_date(7).unwrap();
        assert_eq!(date.len(), 10);
        assert!(chrono::NaiveDate::parse_from_str(&date, "%Y-%m-%d").is_ok());
    }

    #[tokio::test]
    async fn test_shorten_while_signed_out_then_resume() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        mount_links(&server).await;
        Mock::given(method("POST"))
            .and(path("/user/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token": "t1",
                "user": {"id": 1, "username": "alice", "role": "user"}
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/url"))
            .and(header("authorization", "Bearer t1"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "url": {"id": 3, "short_code": "abc", "original_url": "https://example.com/long"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut app = app(&server, &dir);
        assert!(app
            .handle(Command::Shorten {
                url: "https://example.com/long".to_string()
            })
            .await);
        assert_eq!(app.controller().router().current(), &Route::Login);
        assert_eq!(app.controller().state(), FlowState::AnonymousIntentCaptured);

        app.controller.login("alice", "pw").await.unwrap();
        app.render_pending().await;
        assert_eq!(app.controller().restored_input(), Some("https://example.com/long"));

        app.handle(Command::Create {
            url: None,
            alias: None,
            title: None,
            expires: None,
        })
        .await;
        assert_eq!(app.controller().restored_input(), None);
        assert_eq!(app.controller().state(), FlowState::AuthenticatedIdle);
    }

    #[tokio::test]
    async fn test_rejected_session_while_listing_returns_to_login() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        Mock::given(method("GET"))
            .and(path("/url"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({"message": "expired"})))
            .mount(&server)
            .await;

        let mut app = app(&server, &dir);
        let profile = serde_json::from_value(serde_json::json!({"id": 1, "username": "alice", "role": "user"})).unwrap();
        app.controller().session().establish("stale", &profile).unwrap();

        app.handle(Command::Links).await;
        assert_eq!(app.controller().router().current(), &Route::Login);
        assert!(!app.controller().session().is_authenticated());
    }

    #[tokio::test]
    async fn test_signed_out_commands_ask_for_login() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let mut app = app(&server, &dir);

        app.handle(Command::Stats).await;
        assert_eq!(app.controller().router().current(), &Route::Login);
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn test_quit_stops_loop() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let mut app = app(&server, &dir);
        assert!(!app.handle(Command::Quit).await);
    }

    #[tokio::test]
    async fn test_remember_username_writes_config() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let mut app = app(&server, &dir);

        app.remember_username("alice");
        let saved = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(saved.last_username.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_forced_logout_clears_form_for_next_user() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        Mock::given(method("POST"))
            .and(path("/user/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token": "t-alice",
                "user": {"id": 1, "username": "alice", "role": "user"}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/url"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/analytics/dashboard"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/url"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let mut app = app(&server, &dir);
        app.handle(Command::Shorten {
            url: "https://alice.example/private".to_string(),
        })
        .await;
        app.controller.login("alice", "pw").await.unwrap();
        app.render_pending().await;
        assert_eq!(app.controller().router().current(), &Route::Login);
        assert_eq!(app.controller().restored_input(), None);

        let route = app.controller.login("bob", "pw").await.unwrap();
        assert_eq!(route, Route::Dashboard);
        app.handle(Command::Create {
            url: None,
            alias: None,
            title: None,
            expires: None,
        })
        .await;
        assert_eq!(app.controller().restored_input(), None);
    }

    #[tokio::test]
    async fn test_admin_commands_need_admin_role() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        Mock::given(method("GET"))
            .and(path("/user/users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"users": []})))
            .expect(1)
            .mount(&server)
            .await;

        let mut app = app(&server, &dir);
        let user = serde_json::from_value(serde_json::json!({"id": 1, "username": "alice", "role": "user"})).unwrap();
        app.controller().session().establish("t1", &user).unwrap();
        app.handle(Command::Users).await;

        let admin = serde_json::from_value(serde_json::json!({"id": 2, "username": "root", "role": "admin"})).unwrap();
        app.controller().session().establish("t2", &admin).unwrap();
        app.handle(Command::Users).await;
    }
}
