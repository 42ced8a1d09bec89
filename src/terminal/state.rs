use ratatui::widgets::ListState;

use crate::app::App;
use crate::domain::RecordId;
use crate::domain::account::Provider;
use crate::domain::email::{DraftInput, EmailMessage, Folder, OutgoingEmail};
use crate::notify::Notice;
use crate::routes::{Navigation, Route};
use crate::store::derive;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    List,
    Body,
}

/// Which widget receives typed characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Normal,
    Search,
    Compose,
    Connect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComposeField {
    #[default]
    To,
    Subject,
    Body,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComposeForm {
    /// Comma separated.
    pub to: String,
    pub subject: String,
    pub body: String,
    pub field: ComposeField,
    /// Set when the form was loaded from a saved draft.
    pub draft_id: Option<RecordId>,
    next_template: usize,
    next_draft: usize,
}

impl ComposeForm {
    pub fn recipients(&self) -> Vec<String> {
        self.to
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn outgoing(&self) -> OutgoingEmail {
        OutgoingEmail {
            to: self.recipients(),
            subject: self.subject.clone(),
            body: self.body.clone(),
            ..OutgoingEmail::default()
        }
    }

    pub fn draft(&self) -> DraftInput {
        DraftInput {
            to: self.recipients(),
            subject: self.subject.clone(),
            body: self.body.clone(),
            ..DraftInput::default()
        }
    }

    pub fn active_mut(&mut self) -> &mut String {
        match self.field {
            ComposeField::To => &mut self.to,
            ComposeField::Subject => &mut self.subject,
            ComposeField::Body => &mut self.body,
        }
    }

    pub fn next_field(&mut self) {
        self.field = match self.field {
            ComposeField::To => ComposeField::Subject,
            ComposeField::Subject => ComposeField::Body,
            ComposeField::Body => ComposeField::To,
        };
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectForm {
    pub provider: Provider,
    pub auth_code: String,
}

impl Default for ConnectForm {
    fn default() -> Self {
        Self {
            provider: Provider::Gmail,
            auth_code: String::new(),
        }
    }
}

impl ConnectForm {
    pub fn toggle_provider(&mut self) {
        self.provider = match self.provider {
            Provider::Gmail => Provider::Outlook,
            _ => Provider::Gmail,
        };
    }
}

pub struct ViewState {
    /// Last requested route; the guard decides what actually renders.
    pub route: Route,
    pub mode: InputMode,
    pub focus: Focus,

    pub search: String,
    pub list_state: ListState,
    pub body_scroll: u16,

    pub compose: ComposeForm,
    pub connect: ConnectForm,

    /// Latest toast, shown in the footer until the next one.
    pub status: Option<Notice>,
}

impl ViewState {
    pub fn new() -> Self {
        let mut s = Self {
            route: Route::Dashboard,
            mode: InputMode::Normal,
            focus: Focus::List,
            search: String::new(),
            list_state: ListState::default(),
            body_scroll: 0,
            compose: ComposeForm::default(),
            connect: ConnectForm::default(),
            status: None,
        };
        s.list_state.select(Some(0));
        s
    }

    /// Resolves `route` against the guard and loads what the landing view needs.
    pub fn go(&mut self, app: &mut App, route: Route) {
        self.route = route.clone();
        self.mode = InputMode::Normal;
        match app.navigate(route) {
            Navigation::Render(landed) => {
                self.route = landed.clone();
                self.load(app, &landed);
            }
            Navigation::Redirect(next) => self.route = next,
            // no data requests until the session settles
            Navigation::Loading => {}
        }
    }

    /// Re-issues the fetches behind the current view.
    pub fn refresh(&mut self, app: &mut App) {
        let route = self.route.clone();
        self.go(app, route);
    }

    fn load(&mut self, app: &mut App, route: &Route) {
        match route {
            Route::Dashboard => {
                app.load_dashboard();
                self.clamp_selection(app);
            }
            Route::Compose => {
                self.mode = InputMode::Compose;
                app.store.fetch_templates();
                app.store.fetch_drafts();
            }
            Route::Templates => app.store.fetch_templates(),
            Route::Campaigns => app.store.fetch_campaigns(),
            Route::Analytics => {
                app.store.fetch_campaigns();
                app.reload_inbox();
            }
            Route::Settings => app.store.fetch_email_accounts(),
            Route::Root | Route::Auth | Route::Email(_) => {}
        }
    }

    pub fn visible_emails<'a>(&self, app: &'a App) -> Vec<&'a EmailMessage> {
        let st = app.email_state();
        derive::filter_emails(derive::emails_in_folder(&st.emails, &st.current_folder), &self.search)
    }

    pub fn selected_email<'a>(&self, app: &'a App) -> Option<&'a EmailMessage> {
        let idx = self.list_state.selected()?;
        self.visible_emails(app).get(idx).copied()
    }

    /// The message behind an `/email/{id}` route, looked up in the store.
    pub fn opened_email<'a>(&self, app: &'a App) -> Option<&'a EmailMessage> {
        let Route::Email(id) = &self.route else {
            return None;
        };
        app.email_state().emails.iter().find(|e| e.id.as_str() == id)
    }

    pub fn clamp_selection(&mut self, app: &App) {
        let len = self.visible_emails(app).len();
        if len == 0 {
            self.list_state.select(None);
        } else {
            let cur = self.list_state.selected().unwrap_or(0).min(len - 1);
            self.list_state.select(Some(cur));
        }
    }

    pub fn move_selection(&mut self, app: &App, delta: i32) {
        let len = self.visible_emails(app).len() as i32;
        if len == 0 {
            self.list_state.select(None);
            return;
        }
        let cur = self.list_state.selected().unwrap_or(0) as i32;
        let next = (cur + delta).clamp(0, len - 1) as usize;
        self.list_state.select(Some(next));
    }

    pub fn open_selected(&mut self, app: &mut App) {
        let Some(id) = self.selected_email(app).map(|e| e.id.to_string()) else {
            return;
        };
        self.body_scroll = 0;
        self.focus = Focus::Body;
        self.go(app, Route::Email(id));
    }

    pub fn close_email(&mut self, app: &mut App) {
        self.focus = Focus::List;
        self.body_scroll = 0;
        self.route = Route::Dashboard;
        self.clamp_selection(app);
    }

    pub fn scroll_body(&mut self, delta: i32) {
        if delta < 0 {
            self.body_scroll = self.body_scroll.saturating_sub((-delta) as u16);
        } else {
            self.body_scroll = self.body_scroll.saturating_add(delta as u16);
        }
    }

    pub fn cycle_folder(&mut self, app: &mut App) {
        let current = app.email_state().current_folder.clone();
        let pos = Folder::KNOWN.iter().position(|f| *f == current);
        let next = match pos {
            Some(i) => Folder::KNOWN[(i + 1) % Folder::KNOWN.len()].clone(),
            None => Folder::Inbox,
        };
        app.store.set_current_folder(next);
        self.list_state.select(Some(0));
        self.clamp_selection(app);
    }

    /// Selects the next connected account and reloads its inbox.
    pub fn cycle_account(&mut self, app: &mut App) {
        let st = app.email_state();
        if st.accounts.is_empty() {
            return;
        }
        let pos = st
            .selected_account
            .as_ref()
            .and_then(|sel| st.accounts.iter().position(|a| a.id == sel.id));
        let next = match pos {
            Some(i) => (i + 1) % st.accounts.len(),
            None => 0,
        };
        let id = st.accounts[next].id.clone();
        if app.store.select_account(&id) {
            app.reload_inbox();
        }
        self.list_state.select(Some(0));
        self.clamp_selection(app);
    }

    pub fn begin_search(&mut self) {
        self.mode = InputMode::Search;
    }

    pub fn end_search(&mut self, app: &App, keep: bool) {
        if !keep {
            self.search.clear();
        }
        self.mode = InputMode::Normal;
        self.list_state.select(Some(0));
        self.clamp_selection(app);
    }

    pub fn begin_connect(&mut self) {
        self.connect = ConnectForm::default();
        self.mode = InputMode::Connect;
    }

    pub fn submit_connect(&mut self, app: &mut App) {
        let code = self.connect.auth_code.trim().to_string();
        if code.is_empty() {
            return;
        }
        let result = app.store.connect_email_account(&self.connect.provider, &code);
        if result.is_success() {
            self.mode = InputMode::Normal;
            self.connect = ConnectForm::default();
            if self.route == Route::Dashboard {
                app.reload_inbox();
                self.clamp_selection(app);
            }
        }
    }

    pub fn send_compose(&mut self, app: &mut App) {
        if self.compose.recipients().is_empty() {
            return;
        }
        let result = app.store.send_email(&self.compose.outgoing());
        if result.is_success() {
            self.compose.clear();
            self.go(app, Route::Dashboard);
        }
    }

    pub fn save_compose_draft(&mut self, app: &mut App) {
        let draft = self.compose.draft();
        let id = self.compose.draft_id.clone();
        app.store.save_draft(&draft, id.as_ref());
    }

    /// Fills subject and body from the next template, wrapping around.
    pub fn apply_next_template(&mut self, app: &App) {
        let templates = &app.email_state().templates;
        if templates.is_empty() {
            return;
        }
        let t = &templates[self.compose.next_template % templates.len()];
        self.compose.subject = t.subject.clone();
        self.compose.body = t.body.clone();
        self.compose.next_template += 1;
    }

    /// Loads the next saved draft into the form, wrapping around.
    pub fn load_next_draft(&mut self, app: &App) {
        let drafts = &app.email_state().drafts;
        if drafts.is_empty() {
            return;
        }
        let d = &drafts[self.compose.next_draft % drafts.len()];
        self.compose.to = d.to.join(", ");
        self.compose.subject = d.subject.clone();
        self.compose.body = d.body.clone();
        self.compose.draft_id = Some(d.id.clone());
        self.compose.next_draft += 1;
    }

    pub fn delete_loaded_draft(&mut self, app: &mut App) {
        let Some(id) = self.compose.draft_id.clone() else {
            return;
        };
        if app.store.delete_draft(&id).is_success() {
            self.compose.clear();
        }
    }

    pub fn logout(&mut self, app: &mut App) {
        app.logout();
        *self = Self::new();
        self.go(app, Route::Dashboard);
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::transport::{HttpResponse, MockTransport};
    use crate::auth::credential_store::MemoryCredentialStore;
    use crate::notify::ToastQueue;
    use pretty_assertions::assert_eq;
    use url::Url;

    fn signed_in_app(mut mock: MockTransport) -> App {
        mock.expect_execute()
            .withf(|r| r.url.path() == "/api/user/profile")
            .returning(|_| Ok(HttpResponse::new(200, r#"{"email":"me@x.io"}"#)));
        let mut app = App::new(
            Url::parse("http://localhost:8001").unwrap(),
            Box::new(mock),
            Box::new(MemoryCredentialStore::with_token("t1")),
            Box::new(ToastQueue::new()),
        );
        app.bootstrap();
        app
    }

    fn mailbox(mock: &mut MockTransport) {
        mock.expect_execute()
            .withf(|r| r.url.path() == "/api/email-accounts")
            .returning(|_| {
                Ok(HttpResponse::new(
                    200,
                    r#"{"accounts":[{"id":"a1","provider":"gmail","email":"a@x.io","is_primary":true},{"id":"a2","provider":"outlook","email":"b@x.io"}]}"#,
                ))
            });
        mock.expect_execute()
            .withf(|r| r.url.path() == "/api/emails/inbox")
            .returning(|_| {
                Ok(HttpResponse::new(
                    200,
                    r#"{"emails":[
                        {"id":"e1","subject":"Seed round","from":"vc@fund.io","body":"hi"},
                        {"id":"e2","subject":"Lunch","from":"bob@x.io","body":"pizza","folder":"sent"},
                        {"id":"e3","subject":"Hiring","from":"hr@x.io","body":"Seed interviews","folder":"inbox"}
                    ]}"#,
                ))
            });
    }

    #[test]
    fn compose_splits_recipients() {
        let form = ComposeForm {
            to: "a@x.io, ,b@x.io ".into(),
            subject: "s".into(),
            ..ComposeForm::default()
        };
        assert_eq!(form.recipients(), vec!["a@x.io", "b@x.io"]);
        assert_eq!(form.draft().to, form.outgoing().to);
    }

    #[test]
    fn compose_fields_cycle() {
        let mut form = ComposeForm::default();
        form.active_mut().push_str("a@x.io");
        form.next_field();
        form.active_mut().push_str("Hello");
        form.next_field();
        form.next_field();
        assert_eq!(form.field, ComposeField::To);
        assert_eq!((form.to.as_str(), form.subject.as_str()), ("a@x.io", "Hello"));
    }

    #[test]
    fn dashboard_lists_inbox_and_filters_by_search() {
        let mut mock = MockTransport::new();
        mailbox(&mut mock);
        let mut app = signed_in_app(mock);
        let mut view = ViewState::new();

        view.go(&mut app, Route::Root);
        assert_eq!(view.route, Route::Dashboard);
        let ids: Vec<_> = view.visible_emails(&app).iter().map(|e| e.id.to_string()).collect();
        assert_eq!(ids, vec!["e1", "e3"]);

        view.search = "seed".into();
        assert_eq!(view.visible_emails(&app).len(), 2);
        view.search = "HIRING".into();
        view.end_search(&app, true);
        assert_eq!(view.selected_email(&app).map(|e| e.id.as_str()), Some("e3"));
    }

    #[test]
    fn folder_cycle_moves_through_known_folders() {
        let mut mock = MockTransport::new();
        mailbox(&mut mock);
        let mut app = signed_in_app(mock);
        let mut view = ViewState::new();
        view.go(&mut app, Route::Dashboard);

        view.cycle_folder(&mut app);
        assert_eq!(app.email_state().current_folder, Folder::Sent);
        assert_eq!(view.visible_emails(&app).len(), 1);
        view.cycle_folder(&mut app);
        view.cycle_folder(&mut app);
        assert_eq!(app.email_state().current_folder, Folder::Inbox);
    }

    #[test]
    fn account_cycle_reloads_for_the_next_account() {
        let mut mock = MockTransport::new();
        mailbox(&mut mock);
        let mut app = signed_in_app(mock);
        let mut view = ViewState::new();
        view.go(&mut app, Route::Dashboard);
        assert_eq!(app.store.selected_account_id(), Some(RecordId::new("a1")));

        view.cycle_account(&mut app);
        assert_eq!(app.store.selected_account_id(), Some(RecordId::new("a2")));
        view.cycle_account(&mut app);
        assert_eq!(app.store.selected_account_id(), Some(RecordId::new("a1")));
    }

    #[test]
    fn opening_a_message_routes_to_it() {
        let mut mock = MockTransport::new();
        mailbox(&mut mock);
        let mut app = signed_in_app(mock);
        let mut view = ViewState::new();
        view.go(&mut app, Route::Dashboard);

        view.move_selection(&app, 5);
        view.open_selected(&mut app);
        assert_eq!(view.route, Route::Email("e3".into()));
        assert_eq!(view.opened_email(&app).map(|e| e.subject.as_str()), Some("Hiring"));

        view.close_email(&mut app);
        assert_eq!(view.route, Route::Dashboard);
        assert_eq!(view.focus, Focus::List);
    }

    #[test]
    fn signed_out_views_land_on_auth_without_requests() {
        let mut mock = MockTransport::new();
        mock.expect_execute().never();
        let mut app = App::new(
            Url::parse("http://localhost:8001").unwrap(),
            Box::new(mock),
            Box::new(MemoryCredentialStore::default()),
            Box::new(ToastQueue::new()),
        );
        let mut view = ViewState::new();

        view.go(&mut app, Route::Templates);
        assert_eq!(view.route, Route::Templates);
        app.bootstrap();
        view.refresh(&mut app);
        assert_eq!(view.route, Route::Auth);
    }
}
