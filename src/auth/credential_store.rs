use anyhow::{Result, anyhow};
use keyring::{Entry, Error as KeyringError};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::config::{self, Config, CredentialBackend};

/// Fixed key the session credential is stored under.
pub const CREDENTIAL_KEY: &str = "session_token";

const SERVICE: &str = "startupmail";

/// Client-local persistence for the session credential.
#[cfg_attr(test, mockall::automock)]
pub trait CredentialStore {
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, token: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

pub fn from_config(cfg: &Config) -> Result<Box<dyn CredentialStore>> {
    Ok(match cfg.credential_backend {
        CredentialBackend::File => Box::new(FileCredentialStore::in_config_dir()?),
        CredentialBackend::Keyring => Box::new(KeyringCredentialStore::new(SERVICE)),
        CredentialBackend::Memory => Box::new(MemoryCredentialStore::default()),
    })
}

/// Stored in ~/.config/startupmail/session.json
#[derive(Debug, Serialize, Deserialize)]
struct SessionFile {
    session_token: Option<String>,
}

pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_config_dir() -> Result<Self> {
        let mut p = config::config_dir()?;
        fs::create_dir_all(&p)?;
        p.push("session.json");
        Ok(Self::new(p))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let s = fs::read_to_string(&self.path)?;
        let sf: SessionFile = serde_json::from_str(&s)?;
        Ok(sf.session_token.filter(|t| !t.is_empty()))
    }

    fn save(&self, token: &str) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let sf = SessionFile {
            session_token: Some(token.to_string()),
        };
        fs::write(&self.path, serde_json::to_string_pretty(&sf)?)?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

pub struct KeyringCredentialStore {
    service: String,
}

impl KeyringCredentialStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(&self.service, CREDENTIAL_KEY).map_err(|e| anyhow!(e.to_string()))
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn load(&self) -> Result<Option<String>> {
        match self.entry()?.get_password() {
            Ok(v) => Ok(Some(v)),
            Err(KeyringError::NoEntry) => Ok(None),
            Err(e) => Err(anyhow!(e.to_string())),
        }
    }

    fn save(&self, token: &str) -> Result<()> {
        self.entry()?
            .set_password(token)
            .map_err(|e| anyhow!(e.to_string()))
    }

    fn clear(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(KeyringError::NoEntry) => Ok(()),
            Err(e) => Err(anyhow!(e.to_string())),
        }
    }
}

/// Process-local store. Clones share the same slot, which lets a caller keep
/// a handle and observe what the session persisted.
#[derive(Clone, Default)]
pub struct MemoryCredentialStore {
    token: Rc<RefCell<Option<String>>>,
}

impl MemoryCredentialStore {
    pub fn with_token(token: &str) -> Self {
        let s = Self::default();
        *s.token.borrow_mut() = Some(token.to_string());
        s
    }

    pub fn current(&self) -> Option<String> {
        self.token.borrow().clone()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.current())
    }

    fn save(&self, token: &str) -> Result<()> {
        *self.token.borrow_mut() = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.token.borrow_mut().take();
        Ok(())
    }
}
