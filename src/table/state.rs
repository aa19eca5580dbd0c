use anyhow::Result;
use chrono::{DateTime, Local};
use log::{error, info};

use crate::auth::AuthSession;
use crate::domain::email::{FetchedEmail, ListQuery};
use crate::mail::MailProvider;
use crate::table::format::format_date_time;
use crate::table::view::{RowView, TableView};

/// The workflow that owns the table and consumes what the user picks.
pub trait TableHost {
    /// Body of the selected email, or `""` when the list was replaced.
    fn set_email_full(&mut self, body: &str);
    fn handle_verify_email_clicked(&mut self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Replaced(usize),
    NoMessages,
    /// Session not ready; nothing was requested.
    Skipped,
    Failed(String),
}

#[derive(Debug, Default)]
pub struct MailTable {
    emails: Vec<FetchedEmail>,
    selected: Option<usize>,
    // readiness and token seen at the last `observe_session`
    last_ready_token: Option<String>,
}

impl MailTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emails(&self) -> &[FetchedEmail] {
        &self.emails
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_email(&self) -> Option<&FetchedEmail> {
        self.selected.and_then(|i| self.emails.get(i))
    }

    /// Feed every auth change through here. Returns `true` when the session
    /// just became usable (or its token changed) and a fetch should start.
    pub fn observe_session(&mut self, session: &AuthSession) -> bool {
        let token = session.ready_token().map(str::to_string);
        let changed = token.is_some() && token != self.last_ready_token;
        self.last_ready_token = token;
        changed
    }

    /// List matching messages and fetch them in full. `Ok(None)` when nothing
    /// matched. Touches no table state, so it can run off the UI thread.
    pub fn fetch(
        provider: &dyn MailProvider,
        token: &str,
        query: &ListQuery,
    ) -> Result<Option<Vec<FetchedEmail>>> {
        let list = provider.list_messages(token, query)?;
        if list.is_empty() {
            return Ok(None);
        }
        let emails = provider.fetch_full(token, &list.ids())?;
        Ok(Some(emails))
    }

    pub fn apply_fetch(
        &mut self,
        result: Result<Option<Vec<FetchedEmail>>>,
        host: &mut dyn TableHost,
    ) -> FetchOutcome {
        match result {
            Ok(Some(emails)) => {
                let n = emails.len();
                info!("fetched {n} emails");
                self.replace_emails(emails, host);
                FetchOutcome::Replaced(n)
            }
            Ok(None) => {
                info!("no matching emails");
                FetchOutcome::NoMessages
            }
            Err(e) => {
                error!("error fetching emails: {e:#}");
                FetchOutcome::Failed(format!("{e:#}"))
            }
        }
    }

    /// Fetch and apply on the calling thread.
    pub fn refresh(
        &mut self,
        provider: &dyn MailProvider,
        session: &AuthSession,
        query: &ListQuery,
        host: &mut dyn TableHost,
    ) -> FetchOutcome {
        let Some(token) = session.ready_token() else {
            return FetchOutcome::Skipped;
        };
        let result = Self::fetch(provider, token, query);
        self.apply_fetch(result, host)
    }

    pub fn replace_emails(&mut self, emails: Vec<FetchedEmail>, host: &mut dyn TableHost) {
        self.emails = emails;
        self.selected = None;
        host.set_email_full("");
    }

    /// Returns `false` (and changes nothing) for an index past the end.
    pub fn select(&mut self, index: usize, host: &mut dyn TableHost) -> bool {
        let Some(email) = self.emails.get(index) else {
            return false;
        };
        self.selected = Some(index);
        host.set_email_full(&email.decoded_contents);
        true
    }

    pub fn select_next(&mut self, host: &mut dyn TableHost) -> bool {
        let next = match self.selected {
            None => 0,
            Some(i) => (i + 1).min(self.emails.len().saturating_sub(1)),
        };
        self.select(next, host)
    }

    pub fn select_previous(&mut self, host: &mut dyn TableHost) -> bool {
        let prev = self.selected.map_or(0, |i| i.saturating_sub(1));
        self.select(prev, host)
    }

    /// Calls the host once if a row is selected.
    pub fn verify(&self, host: &mut dyn TableHost) -> bool {
        if self.selected.is_none() {
            return false;
        }
        host.handle_verify_email_clicked();
        true
    }

    pub fn view(&self, session: &AuthSession, now: &DateTime<Local>) -> TableView {
        if !session.is_authed || self.emails.is_empty() {
            return TableView::Placeholder {
                signed_in: session.is_authed,
            };
        }

        let rows = self
            .emails
            .iter()
            .enumerate()
            .map(|(i, e)| RowView {
                subject: e.subject.clone(),
                date_label: e
                    .timestamp_ms()
                    .map(|ts| format_date_time(ts, now))
                    .unwrap_or_default(),
                selected: self.selected == Some(i),
            })
            .collect();

        TableView::Populated {
            account: session.account.clone(),
            rows,
            verify_enabled: self.selected.is_some(),
        }
    }
}
