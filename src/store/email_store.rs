use log::error;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::rc::Rc;

use crate::api::{ApiClient, ApiError};
use crate::domain::RecordId;
use crate::domain::account::{EmailAccount, Provider};
use crate::domain::campaign::{Campaign, NewCampaign, NewTemplate, Template};
use crate::domain::email::{Draft, DraftInput, EmailMessage, Folder, OutgoingEmail};
use crate::notify::Notifier;
use crate::outcome::ActionResult;

/// Everything the store holds. Each collection is replaced wholesale by a
/// successful fetch and never touched by a failed one.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EmailState {
    pub emails: Vec<EmailMessage>,
    pub drafts: Vec<Draft>,
    pub templates: Vec<Template>,
    pub campaigns: Vec<Campaign>,
    pub accounts: Vec<EmailAccount>,
    pub selected_account: Option<EmailAccount>,
    pub current_folder: Folder,
    /// An inbox fetch is in flight.
    pub loading: bool,
}

#[derive(Debug, Serialize)]
struct ConnectRequest<'a> {
    provider: &'a str,
    auth_code: &'a str,
}

pub struct EmailStore {
    api: Rc<ApiClient>,
    notifier: Box<dyn Notifier>,
    state: EmailState,
}

impl EmailStore {
    pub fn new(api: Rc<ApiClient>, notifier: Box<dyn Notifier>) -> Self {
        Self {
            api,
            notifier,
            state: EmailState::default(),
        }
    }

    pub fn state(&self) -> &EmailState {
        &self.state
    }

    pub fn selected_account_id(&self) -> Option<RecordId> {
        self.state.selected_account.as_ref().map(|a| a.id.clone())
    }

    pub fn set_current_folder(&mut self, folder: Folder) {
        self.state.current_folder = folder;
    }

    /// Selects one of the fetched accounts. Returns false for an unknown id.
    pub fn select_account(&mut self, id: &RecordId) -> bool {
        match self.state.accounts.iter().find(|a| &a.id == id) {
            Some(account) => {
                self.state.selected_account = Some(account.clone());
                true
            }
            None => false,
        }
    }

    /// Drops all collections and cursors, e.g. after logout.
    pub fn reset(&mut self) {
        self.state = EmailState::default();
    }

    // ----- Fetch -----

    pub fn fetch_emails(&mut self, account_id: Option<&RecordId>) {
        self.state.loading = true;
        let query: Vec<(&str, &str)> = account_id
            .map(|id| vec![("account_id", id.as_str())])
            .unwrap_or_default();
        if let Some(emails) = self.fetch_collection("/api/emails/inbox", &query, "emails", "emails") {
            self.state.emails = emails;
        }
        self.state.loading = false;
    }

    pub fn fetch_drafts(&mut self) {
        if let Some(drafts) = self.fetch_collection("/api/emails/drafts", &[], "drafts", "drafts") {
            self.state.drafts = drafts;
        }
    }

    pub fn fetch_templates(&mut self) {
        if let Some(templates) = self.fetch_collection("/api/templates", &[], "templates", "templates") {
            self.state.templates = templates;
        }
    }

    pub fn fetch_campaigns(&mut self) {
        if let Some(campaigns) = self.fetch_collection("/api/campaigns", &[], "campaigns", "campaigns") {
            self.state.campaigns = campaigns;
        }
    }

    /// Also picks a default account when none is selected yet: the primary
    /// one, else the first. An existing selection is kept.
    pub fn fetch_email_accounts(&mut self) {
        let Some(accounts) =
            self.fetch_collection::<EmailAccount>("/api/email-accounts", &[], "accounts", "email accounts")
        else {
            return;
        };

        if self.state.selected_account.is_none() {
            self.state.selected_account = accounts
                .iter()
                .find(|a| a.is_primary)
                .or_else(|| accounts.first())
                .cloned();
        }
        self.state.accounts = accounts;
    }

    // ----- Mutate, then refetch -----

    pub fn send_email(&mut self, email: &OutgoingEmail) -> ActionResult<Value> {
        let account_id = self.selected_account_id();
        let query: Vec<(&str, &str)> = account_id
            .as_ref()
            .map(|id| vec![("account_id", id.as_str())])
            .unwrap_or_default();
        let outcome = self.api.post("/api/emails/send", &query, email);
        self.finish(
            outcome,
            "Email sent successfully!".to_string(),
            "Failed to send email",
            |s| s.fetch_emails(account_id.as_ref()),
        )
    }

    /// Creates a draft, or updates `draft_id` when given.
    pub fn save_draft(&mut self, draft: &DraftInput, draft_id: Option<&RecordId>) -> ActionResult<Value> {
        let query: Vec<(&str, &str)> = draft_id
            .map(|id| vec![("draft_id", id.as_str())])
            .unwrap_or_default();
        let outcome = self.api.post("/api/emails/drafts", &query, draft);
        self.finish(
            outcome,
            "Draft saved successfully!".to_string(),
            "Failed to save draft",
            Self::fetch_drafts,
        )
    }

    pub fn delete_draft(&mut self, draft_id: &RecordId) -> ActionResult<Value> {
        let outcome = self.api.delete("/api/emails/drafts", &[draft_id.as_str()]);
        self.finish(
            outcome,
            "Draft deleted successfully!".to_string(),
            "Failed to delete draft",
            Self::fetch_drafts,
        )
    }

    pub fn connect_email_account(&mut self, provider: &Provider, auth_code: &str) -> ActionResult<Value> {
        let outcome = self.api.post(
            "/api/email-accounts/connect",
            &[],
            &ConnectRequest {
                provider: provider.as_str(),
                auth_code,
            },
        );
        self.finish(
            outcome,
            format!("{} account connected successfully!", provider.display_name()),
            "Failed to connect email account",
            Self::fetch_email_accounts,
        )
    }

    pub fn create_template(&mut self, template: &NewTemplate) -> ActionResult<Value> {
        let outcome = self.api.post("/api/templates", &[], template);
        self.finish(
            outcome,
            "Template created successfully!".to_string(),
            "Failed to create template",
            Self::fetch_templates,
        )
    }

    pub fn create_campaign(&mut self, campaign: &NewCampaign) -> ActionResult<Value> {
        let outcome = self.api.post("/api/campaigns", &[], campaign);
        self.finish(
            outcome,
            "Campaign created successfully!".to_string(),
            "Failed to create campaign",
            Self::fetch_campaigns,
        )
    }

    // ----- Helpers -----

    fn fetch_collection<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        field: &str,
        label: &str,
    ) -> Option<Vec<T>> {
        match self.api.get::<Value>(path, query).and_then(|body| list_field(body, field)) {
            Ok(items) => Some(items),
            Err(e) => {
                error!("Failed to fetch {label}: {e}");
                self.notifier.error(format!("Failed to fetch {label}"));
                None
            }
        }
    }

    fn finish(
        &mut self,
        outcome: Result<Value, ApiError>,
        success_message: String,
        failure_message: &str,
        refresh: impl FnOnce(&mut Self),
    ) -> ActionResult<Value> {
        match outcome {
            Ok(data) => {
                self.notifier.success(success_message);
                refresh(self);
                ActionResult::ok(data)
            }
            Err(e) => {
                error!("{failure_message}: {e}");
                self.notifier.error(failure_message.to_string());
                ActionResult::failed(e.user_message(failure_message))
            }
        }
    }
}

/// The named list in a response payload; missing or null means empty.
fn list_field<T: DeserializeOwned>(mut body: Value, field: &str) -> Result<Vec<T>, ApiError> {
    match body.get_mut(field).map(Value::take) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(items) => serde_json::from_value(items).map_err(|e| ApiError::Malformed(e.to_string())),
    }
}
