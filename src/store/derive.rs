//! Presentation-only state computed from the store's email list.

use crate::domain::email::{EmailMessage, Folder};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FolderCounts {
    /// Includes messages without a folder.
    pub inbox: usize,
    pub sent: usize,
    pub drafts: usize,
    pub unread: usize,
    pub important: usize,
}

impl FolderCounts {
    pub fn for_folder(&self, folder: &Folder) -> Option<usize> {
        match folder {
            Folder::Inbox => Some(self.inbox),
            Folder::Sent => Some(self.sent),
            Folder::Drafts => Some(self.drafts),
            Folder::Other(_) => None,
        }
    }
}

pub fn folder_counts(emails: &[EmailMessage]) -> FolderCounts {
    emails.iter().fold(FolderCounts::default(), |mut c, e| {
        match e.effective_folder() {
            Folder::Inbox => c.inbox += 1,
            Folder::Sent => c.sent += 1,
            Folder::Drafts => c.drafts += 1,
            Folder::Other(_) => {}
        }
        if !e.is_read {
            c.unread += 1;
        }
        if e.is_important {
            c.important += 1;
        }
        c
    })
}

/// Case-insensitive substring match on subject, sender and body.
/// An empty term keeps everything.
pub fn filter_emails<'a, I>(emails: I, term: &str) -> Vec<&'a EmailMessage>
where
    I: IntoIterator<Item = &'a EmailMessage>,
{
    let needle = term.to_lowercase();
    emails
        .into_iter()
        .filter(|e| {
            needle.is_empty()
                || e.subject.to_lowercase().contains(&needle)
                || e.from.to_lowercase().contains(&needle)
                || e.body.to_lowercase().contains(&needle)
        })
        .collect()
}

pub fn emails_in_folder<'a>(
    emails: &'a [EmailMessage],
    folder: &'a Folder,
) -> impl Iterator<Item = &'a EmailMessage> + 'a {
    emails.iter().filter(move |e| e.in_folder(folder))
}

/// Heading for a folder: "Inbox", "Sent", "Drafts", or the name capitalised.
pub fn folder_title(folder: &Folder) -> String {
    match folder {
        Folder::Inbox => "Inbox".to_string(),
        Folder::Sent => "Sent".to_string(),
        Folder::Drafts => "Drafts".to_string(),
        Folder::Other(name) => {
            let mut chars = name.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }
    }
}
