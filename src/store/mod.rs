pub mod derive;
pub mod email_store;

pub use email_store::{EmailState, EmailStore};
