use anyhow::Result;

use crate::domain::email::{FetchedEmail, ListQuery, MessageId, MessageList};

/// Source of mail for the table. Implementations do their own HTTP and decoding.
pub trait MailProvider: Send + Sync {
    fn list_messages(&self, token: &str, query: &ListQuery) -> Result<MessageList>;

    /// Full decoded records for `ids`, in the same order. Fails as a whole.
    fn fetch_full(&self, token: &str, ids: &[MessageId]) -> Result<Vec<FetchedEmail>>;
}
