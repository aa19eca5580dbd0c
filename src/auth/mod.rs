pub mod google;
pub mod oauth;
pub mod session;
pub mod token_store;
pub mod tokens_file;

pub use google::GoogleAuth;
pub use session::{AuthProvider, AuthSession};

/// Read-only Gmail access; the only scope the picker needs.
pub const GMAIL_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.readonly";
