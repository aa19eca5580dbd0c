pub mod decoders;
pub mod gmail;
pub mod provider;

pub use gmail::GmailClient;
pub use provider::MailProvider;
