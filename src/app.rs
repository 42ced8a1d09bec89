use anyhow::Result;
use std::rc::Rc;
use url::Url;

use crate::api::{ApiClient, ReqwestTransport, Transport};
use crate::auth::credential_store::{self, CredentialStore};
use crate::auth::{Session, SessionManager};
use crate::config::{self, Config};
use crate::notify::Notifier;
use crate::outcome::ActionResult;
use crate::routes::{self, GuardState, Navigation, Route};
use crate::store::{EmailState, EmailStore};

/// Application root: one HTTP client shared by one session manager and one
/// email store. Nothing else holds state.
pub struct App {
    api: Rc<ApiClient>,
    pub session: SessionManager,
    pub store: EmailStore,
}

impl App {
    pub fn new(
        base_url: Url,
        transport: Box<dyn Transport>,
        credentials: Box<dyn CredentialStore>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        let api = Rc::new(ApiClient::new(base_url, transport));
        Self {
            session: SessionManager::new(api.clone(), credentials),
            store: EmailStore::new(api.clone(), notifier),
            api,
        }
    }

    pub fn from_config(cfg: &Config, notifier: Box<dyn Notifier>) -> Result<Self> {
        let base_url = config::resolve_base_url(cfg)?;
        let transport = ReqwestTransport::new()?;
        let credentials = credential_store::from_config(cfg)?;
        Ok(Self::new(base_url, Box::new(transport), credentials, notifier))
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn session_state(&self) -> &Session {
        self.session.session()
    }

    pub fn email_state(&self) -> &EmailState {
        self.store.state()
    }

    pub fn guard_state(&self) -> GuardState {
        GuardState::from(self.session.session())
    }

    pub fn navigate(&self, route: Route) -> Navigation {
        routes::settle(self.guard_state(), route)
    }

    pub fn bootstrap(&mut self) {
        self.session.bootstrap();
    }

    pub fn login(&mut self, exchange_id: &str) -> ActionResult {
        self.session.login(exchange_id)
    }

    /// Ends the session and forgets everything the store had loaded.
    pub fn logout(&mut self) {
        self.session.logout();
        self.store.reset();
    }

    /// Dashboard load: accounts once a user is known, then the inbox of the
    /// selected account once there is at least one account.
    pub fn load_dashboard(&mut self) {
        if self.session.user().is_none() {
            return;
        }
        self.store.fetch_email_accounts();
        self.reload_inbox();
    }

    pub fn reload_inbox(&mut self) {
        if self.store.state().accounts.is_empty() {
            return;
        }
        let selected = self.store.selected_account_id();
        self.store.fetch_emails(selected.as_ref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::transport::{HttpResponse, MockTransport};
    use crate::auth::credential_store::MemoryCredentialStore;
    use crate::notify::ToastQueue;

    fn app(mock: MockTransport, store: MemoryCredentialStore) -> App {
        App::new(
            Url::parse("http://localhost:8001").unwrap(),
            Box::new(mock),
            Box::new(store),
            Box::new(ToastQueue::new()),
        )
    }

    #[test]
    fn guard_is_pending_until_bootstrap_resolves() {
        let mut mock = MockTransport::new();
        mock.expect_execute().never();
        let mut a = app(mock, MemoryCredentialStore::default());

        assert_eq!(a.navigate(Route::Dashboard), Navigation::Loading);
        a.bootstrap();
        assert_eq!(a.navigate(Route::Dashboard), Navigation::Render(Route::Auth));
    }

    #[test]
    fn dashboard_load_fetches_accounts_then_selected_inbox() {
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .withf(|r| r.url.path() == "/api/user/profile")
            .times(1)
            .returning(|_| Ok(HttpResponse::new(200, r#"{"email":"me@x.io"}"#)));
        mock.expect_execute()
            .withf(|r| r.url.path() == "/api/email-accounts")
            .times(1)
            .returning(|_| {
                Ok(HttpResponse::new(
                    200,
                    r#"{"accounts":[{"id":"a1","provider":"gmail","email":"me@x.io","is_primary":true}]}"#,
                ))
            });
        mock.expect_execute()
            .withf(|r| r.url.path() == "/api/emails/inbox" && r.query_param("account_id").as_deref() == Some("a1"))
            .times(1)
            .returning(|_| Ok(HttpResponse::new(200, r#"{"emails":[{"id":"e1"}]}"#)));
        let mut a = app(mock, MemoryCredentialStore::with_token("t1"));

        a.bootstrap();
        assert_eq!(a.navigate(Route::Root), Navigation::Render(Route::Dashboard));
        a.load_dashboard();
        assert_eq!(a.email_state().emails.len(), 1);
    }

    #[test]
    fn dashboard_without_accounts_skips_inbox() {
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .withf(|r| r.url.path() == "/api/user/profile")
            .times(1)
            .returning(|_| Ok(HttpResponse::new(200, "{}")));
        mock.expect_execute()
            .withf(|r| r.url.path() == "/api/email-accounts")
            .times(1)
            .returning(|_| Ok(HttpResponse::new(200, r#"{"accounts":[]}"#)));
        let mut a = app(mock, MemoryCredentialStore::with_token("t1"));

        a.bootstrap();
        a.load_dashboard();
        assert!(a.email_state().accounts.is_empty());
    }

    #[test]
    fn logout_resets_store_and_guard() {
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .withf(|r| r.url.path() == "/api/user/profile")
            .times(1)
            .returning(|_| Ok(HttpResponse::new(200, "{}")));
        mock.expect_execute()
            .withf(|r| r.url.path() == "/api/email-accounts")
            .times(1)
            .returning(|_| {
                Ok(HttpResponse::new(
                    200,
                    r#"{"accounts":[{"id":"a1","provider":"gmail","email":"me@x.io"}]}"#,
                ))
            });
        mock.expect_execute()
            .withf(|r| r.url.path() == "/api/emails/inbox")
            .times(1)
            .returning(|_| Ok(HttpResponse::new(200, r#"{"emails":[]}"#)));
        let store = MemoryCredentialStore::with_token("t1");
        let mut a = app(mock, store.clone());
        a.bootstrap();
        a.load_dashboard();

        a.logout();
        assert_eq!(a.email_state(), &EmailState::default());
        assert_eq!(a.guard_state(), GuardState::Unauthenticated);
        assert_eq!(a.api().credential(), None);
        assert_eq!(store.current(), None);
    }
}
