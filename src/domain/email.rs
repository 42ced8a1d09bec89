use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{RecordId, null_as_default};

/// Mailbox folder. Anything the client does not know by name is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Folder {
    #[default]
    Inbox,
    Sent,
    Drafts,
    Other(String),
}

impl Folder {
    /// Folders the dashboard lists and counts by name.
    pub const KNOWN: [Folder; 3] = [Folder::Inbox, Folder::Sent, Folder::Drafts];

    pub fn as_str(&self) -> &str {
        match self {
            Folder::Inbox => "inbox",
            Folder::Sent => "sent",
            Folder::Drafts => "drafts",
            Folder::Other(name) => name,
        }
    }
}

impl From<String> for Folder {
    fn from(s: String) -> Self {
        match s.as_str() {
            "inbox" => Folder::Inbox,
            "sent" => Folder::Sent,
            "drafts" => Folder::Drafts,
            _ => Folder::Other(s),
        }
    }
}

impl From<Folder> for String {
    fn from(f: Folder) -> Self {
        f.as_str().to_string()
    }
}

impl fmt::Display for Folder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EmailMessage {
    #[serde(default)]
    pub id: RecordId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subject: String,
    #[serde(default, alias = "from_email", deserialize_with = "null_as_default")]
    pub from: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub body: String,
    /// `None` means inbox.
    #[serde(default)]
    pub folder: Option<Folder>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_read: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_important: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub to: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cc: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub bcc: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_html: bool,
    #[serde(default)]
    pub sent_at: Option<String>,
}

impl EmailMessage {
    pub fn effective_folder(&self) -> &Folder {
        self.folder.as_ref().unwrap_or(&Folder::Inbox)
    }

    pub fn in_folder(&self, folder: &Folder) -> bool {
        self.effective_folder() == folder
    }
}

/// Message handed to `POST /api/emails/send`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OutgoingEmail {
    pub to: Vec<String>,
    #[serde(default)]
    pub cc: Vec<String>,
    #[serde(default)]
    pub bcc: Vec<String>,
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub is_html: bool,
}

/// Draft contents as sent to `POST /api/emails/drafts`; every field may be empty.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DraftInput {
    #[serde(default)]
    pub to: Vec<String>,
    #[serde(default)]
    pub cc: Vec<String>,
    #[serde(default)]
    pub bcc: Vec<String>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub is_html: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Draft {
    #[serde(default)]
    pub id: RecordId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub to: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cc: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub bcc: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subject: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub body: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_html: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}
