use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::rc::Rc;

use crate::api::ApiClient;
use crate::auth::credential_store::CredentialStore;
use crate::domain::account::UserProfile;
use crate::outcome::ActionResult;

/// Read-only view of the session.
///
/// `authenticated` is true exactly when `user` and `credential` are both
/// present and the last login or profile fetch succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    pub authenticated: bool,
    pub user: Option<UserProfile>,
    pub credential: Option<String>,
    /// Bootstrap or login still in flight.
    pub loading: bool,
}

#[derive(Debug, Serialize)]
struct SessionExchange<'a> {
    session_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct SessionGrant {
    session_token: String,
    user: UserProfile,
}

/// Owns the session and the persisted credential.
pub struct SessionManager {
    api: Rc<ApiClient>,
    credentials: Box<dyn CredentialStore>,
    state: Session,
}

impl SessionManager {
    pub fn new(api: Rc<ApiClient>, credentials: Box<dyn CredentialStore>) -> Self {
        Self {
            api,
            credentials,
            state: Session {
                loading: true,
                ..Session::default()
            },
        }
    }

    pub fn session(&self) -> &Session {
        &self.state
    }

    pub fn snapshot(&self) -> Session {
        self.state.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.authenticated
    }

    pub fn is_loading(&self) -> bool {
        self.state.loading
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.state.user.as_ref()
    }

    /// Startup: resume a persisted credential if there is one.
    pub fn bootstrap(&mut self) {
        let stored = match self.credentials.load() {
            Ok(t) => t,
            Err(e) => {
                warn!("Could not read stored credential: {e:#}");
                None
            }
        };

        match stored {
            Some(token) => {
                self.api.set_credential(&token);
                self.state.credential = Some(token);
                self.refresh_profile();
            }
            None => self.state.loading = false,
        }
    }

    /// Re-reads the profile. Any failure tears the session down completely.
    pub fn refresh_profile(&mut self) {
        if self.api.credential().is_none() {
            warn!("Profile refresh without a credential; signing out");
            self.logout();
            self.state.loading = false;
            return;
        }
        match self.api.get::<UserProfile>("/api/user/profile", &[]) {
            Ok(user) => {
                self.state.user = Some(user);
                self.state.credential = self.api.credential();
                self.state.authenticated = true;
            }
            Err(e) => {
                error!("Failed to fetch user profile: {e}");
                self.logout();
            }
        }
        self.state.loading = false;
    }

    /// Trades an exchange identifier from the identity redirect for a session.
    /// On failure the previous session is left exactly as it was.
    pub fn login(&mut self, exchange_id: &str) -> ActionResult {
        self.state.loading = true;
        let result = self.exchange(exchange_id);
        self.state.loading = false;
        result
    }

    fn exchange(&mut self, exchange_id: &str) -> ActionResult {
        let grant: SessionGrant = match self.api.post(
            "/api/auth/session",
            &[],
            &SessionExchange {
                session_id: exchange_id,
            },
        ) {
            Ok(g) => g,
            Err(e) => {
                error!("Login failed: {e}");
                return ActionResult::failed(e.user_message("Login failed"));
            }
        };

        if grant.session_token.is_empty() {
            error!("Login failed: backend returned an empty session token");
            return ActionResult::failed("Login failed");
        }

        if let Err(e) = self.credentials.save(&grant.session_token) {
            error!("Login failed: could not persist credential: {e:#}");
            return ActionResult::failed("Login failed");
        }

        self.api.set_credential(&grant.session_token);
        info!("Signed in as {}", grant.user.display_name());
        self.state.credential = Some(grant.session_token);
        self.state.user = Some(grant.user);
        self.state.authenticated = true;
        ActionResult::done()
    }

    /// Clears everything. Never fails; calling it twice is the same as once.
    pub fn logout(&mut self) {
        if let Err(e) = self.credentials.clear() {
            warn!("Could not remove stored credential: {e:#}");
        }
        self.api.clear_credential();
        self.state.user = None;
        self.state.credential = None;
        self.state.authenticated = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::transport::{HttpResponse, Method, MockTransport};
    use crate::auth::credential_store::{MemoryCredentialStore, MockCredentialStore};
    use pretty_assertions::assert_eq;
    use url::Url;

    fn manager(mock: MockTransport, store: MemoryCredentialStore) -> (SessionManager, Rc<ApiClient>) {
        let api = Rc::new(ApiClient::new(
            Url::parse("http://localhost:8001").unwrap(),
            Box::new(mock),
        ));
        (SessionManager::new(api.clone(), Box::new(store)), api)
    }

    fn cleared() -> Session {
        Session::default()
    }

    #[test]
    fn bootstrap_without_credential_finishes_unauthenticated() {
        let mut mock = MockTransport::new();
        mock.expect_execute().never();
        let (mut sm, _) = manager(mock, MemoryCredentialStore::default());

        assert!(sm.is_loading());
        sm.bootstrap();
        assert_eq!(sm.session(), &cleared());
    }

    #[test]
    fn bootstrap_resumes_persisted_credential() {
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .withf(|r| {
                r.url.path() == "/api/user/profile" && r.header("Authorization") == Some("Bearer saved")
            })
            .times(1)
            .returning(|_| Ok(HttpResponse::new(200, r#"{"email":"me@startup.io","full_name":"Me"}"#)));
        let (mut sm, _) = manager(mock, MemoryCredentialStore::with_token("saved"));

        sm.bootstrap();
        let s = sm.session();
        assert!(s.authenticated);
        assert!(!s.loading);
        assert_eq!(s.credential.as_deref(), Some("saved"));
        assert_eq!(s.user.as_ref().map(|u| u.display_name()), Some("Me"));
    }

    #[test]
    fn bootstrap_with_expired_credential_tears_down() {
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .times(1)
            .returning(|_| Ok(HttpResponse::new(401, r#"{"detail":"Could not validate credentials"}"#)));
        let store = MemoryCredentialStore::with_token("stale");
        let (mut sm, api) = manager(mock, store.clone());

        sm.bootstrap();
        assert_eq!(sm.session(), &cleared());
        assert_eq!(store.current(), None);
        assert_eq!(api.credential(), None);
    }

    #[test]
    fn login_attaches_credential_to_later_requests() {
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .withf(|r| {
                r.method == Method::Post
                    && r.url.path() == "/api/auth/session"
                    && r.body == Some(serde_json::json!({"session_id": "abc"}))
            })
            .times(1)
            .returning(|_| Ok(HttpResponse::new(200, r#"{"session_token":"t1","user":{"id":"u1"}}"#)));
        mock.expect_execute()
            .withf(|r| r.method == Method::Get && r.header("Authorization") == Some("Bearer t1"))
            .times(1)
            .returning(|_| Ok(HttpResponse::new(200, r#"{"templates":[]}"#)));
        let store = MemoryCredentialStore::default();
        let (mut sm, api) = manager(mock, store.clone());
        sm.bootstrap();

        let result = sm.login("abc");
        assert_eq!(result, ActionResult::done());
        assert!(sm.is_authenticated());
        assert!(!sm.is_loading());
        assert_eq!(store.current().as_deref(), Some("t1"));
        assert_eq!(
            sm.user().and_then(|u| u.id.as_ref()).map(|id| id.as_str()),
            Some("u1")
        );

        let _: serde_json::Value = api.get("/api/templates", &[]).unwrap();
    }

    #[test]
    fn failed_login_reports_detail_and_keeps_prior_state() {
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .times(1)
            .returning(|_| Ok(HttpResponse::new(400, r#"{"detail":"Invalid session"}"#)));
        let store = MemoryCredentialStore::default();
        let (mut sm, api) = manager(mock, store.clone());
        sm.bootstrap();
        let before = sm.session().clone();

        let result = sm.login("bogus");
        assert_eq!(result, ActionResult::failed("Invalid session"));
        assert_eq!(sm.session(), &before);
        assert_eq!(store.current(), None);
        assert_eq!(api.credential(), None);
    }

    #[test]
    fn failed_login_without_detail_uses_generic_message() {
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("connection refused")));
        let (mut sm, _) = manager(mock, MemoryCredentialStore::default());
        sm.bootstrap();

        assert_eq!(sm.login("abc"), ActionResult::failed("Login failed"));
        assert!(!sm.is_loading());
    }

    #[test]
    fn malformed_grant_is_a_failure() {
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .times(1)
            .returning(|_| Ok(HttpResponse::new(200, r#"{"token":"t1"}"#)));
        let store = MemoryCredentialStore::default();
        let (mut sm, _) = manager(mock, store.clone());
        sm.bootstrap();

        assert!(!sm.login("abc").is_success());
        assert!(!sm.is_authenticated());
        assert_eq!(store.current(), None);
    }

    #[test]
    fn login_then_profile_failure_is_full_teardown() {
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .withf(|r| r.url.path() == "/api/auth/session")
            .times(1)
            .returning(|_| Ok(HttpResponse::new(200, r#"{"session_token":"t1","user":{"id":"u1"}}"#)));
        mock.expect_execute()
            .withf(|r| r.url.path() == "/api/user/profile")
            .times(1)
            .returning(|_| Ok(HttpResponse::new(500, "")));
        let store = MemoryCredentialStore::default();
        let (mut sm, api) = manager(mock, store.clone());
        sm.bootstrap();

        assert!(sm.login("abc").is_success());
        sm.refresh_profile();

        assert_eq!(sm.session(), &cleared());
        assert_eq!(store.current(), None);
        assert_eq!(api.credential(), None);
    }

    #[test]
    fn logout_twice_equals_logout_once() {
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .times(1)
            .returning(|_| Ok(HttpResponse::new(200, r#"{"session_token":"t1","user":{}}"#)));
        let (mut sm, _) = manager(mock, MemoryCredentialStore::default());
        sm.bootstrap();
        sm.login("abc");

        sm.logout();
        let once = sm.snapshot();
        sm.logout();
        assert_eq!(sm.session(), &once);
        assert_eq!(once, cleared());
    }

    fn manager_with(mock: MockTransport, store: MockCredentialStore) -> (SessionManager, Rc<ApiClient>) {
        let api = Rc::new(ApiClient::new(
            Url::parse("http://localhost:8001").unwrap(),
            Box::new(mock),
        ));
        (SessionManager::new(api.clone(), Box::new(store)), api)
    }

    #[test]
    fn unreadable_credential_store_counts_as_signed_out() {
        let mut mock = MockTransport::new();
        mock.expect_execute().never();
        let mut store = MockCredentialStore::new();
        store
            .expect_load()
            .times(1)
            .returning(|| Err(anyhow::anyhow!("keyring locked")));
        let (mut sm, api) = manager_with(mock, store);

        sm.bootstrap();
        assert_eq!(sm.session(), &cleared());
        assert!(!sm.is_loading());
        assert_eq!(api.credential(), None);
    }

    #[test]
    fn login_fails_cleanly_when_credential_cannot_be_saved() {
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .withf(|r| r.url.path() == "/api/auth/session")
            .times(1)
            .returning(|_| Ok(HttpResponse::new(200, r#"{"session_token":"t1","user":{"id":"u1"}}"#)));
        let mut store = MockCredentialStore::new();
        store.expect_load().returning(|| Ok(None));
        store
            .expect_save()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("disk full")));
        store.expect_clear().never();
        let (mut sm, api) = manager_with(mock, store);
        sm.bootstrap();
        let before = sm.snapshot();

        assert_eq!(sm.login("abc"), ActionResult::failed("Login failed"));
        assert_eq!(sm.session(), &before);
        assert_eq!(api.credential(), None);
    }

    #[test]
    fn refresh_without_credential_signs_out_without_a_request() {
        let mut mock = MockTransport::new();
        mock.expect_execute().never();
        let (mut sm, _) = manager(mock, MemoryCredentialStore::default());

        sm.refresh_profile();
        assert_eq!(sm.session(), &cleared());
        assert!(sm.user().is_none());
    }
}
