pub mod credential_store;
pub mod redirect;
pub mod session;

pub use credential_store::CredentialStore;
pub use session::{Session, SessionManager};
