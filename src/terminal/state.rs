use anyhow::Result;
use log::debug;
use ratatui::layout::{Position, Rect};
use ratatui::widgets::ListState;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use crate::auth::AuthSession;
use crate::domain::email::{FetchedEmail, ListQuery};
use crate::mail::MailProvider;
use crate::table::{FetchOutcome, MailTable, TableHost};

/// The verification workflow the picker feeds: it holds the body of the
/// selected email and, once the user verifies, the body that was confirmed.
#[derive(Debug, Default)]
pub struct VerifyFlow {
    pub email_full: String,
    pub verified: Option<String>,
}

impl TableHost for VerifyFlow {
    fn set_email_full(&mut self, body: &str) {
        self.email_full = body.to_string();
    }

    fn handle_verify_email_clicked(&mut self) {
        self.verified = Some(self.email_full.clone());
    }
}

/// A fetch result coming back from a worker thread.
pub struct FetchDone {
    pub generation: u64,
    pub result: Result<Option<Vec<FetchedEmail>>>,
}

pub struct App {
    pub table: MailTable,
    pub flow: VerifyFlow,
    pub session: AuthSession,
    pub list_state: ListState,
    pub status: Option<String>,

    /// Where the list and the verify button were last drawn, for mouse hits.
    pub list_area: Rect,
    pub verify_area: Rect,

    mail: Arc<dyn MailProvider>,
    query: ListQuery,
    tx: Sender<FetchDone>,
    rx: Receiver<FetchDone>,
    issued: u64,
    applied: u64,
    in_flight: usize,
}

impl App {
    pub fn new(mail: Arc<dyn MailProvider>, query: ListQuery, session: AuthSession) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            table: MailTable::new(),
            flow: VerifyFlow::default(),
            session,
            list_state: ListState::default(),
            status: None,
            list_area: Rect::default(),
            verify_area: Rect::default(),
            mail,
            query,
            tx,
            rx,
            issued: 0,
            applied: 0,
            in_flight: 0,
        }
    }

    /// Start signed out and observe `session` once, so a ready session
    /// triggers the first fetch.
    pub fn start(mail: Arc<dyn MailProvider>, query: ListQuery, session: AuthSession) -> Self {
        let mut app = Self::new(mail, query, AuthSession::signed_out(session.account.clone()));
        app.set_session(session);
        app
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight > 0
    }

    /// Adopt a new auth snapshot; starts a fetch when it just became ready.
    pub fn set_session(&mut self, session: AuthSession) -> bool {
        self.session = session;
        if self.table.observe_session(&self.session) {
            self.spawn_fetch();
            return true;
        }
        false
    }

    /// Start a background fetch. Overlapping fetches are allowed; only the
    /// newest one to come back is applied.
    pub fn spawn_fetch(&mut self) -> bool {
        let Some(token) = self.session.ready_token().map(str::to_string) else {
            self.status = Some("Sign in to load emails".to_string());
            return false;
        };

        self.issued += 1;
        self.in_flight += 1;
        let generation = self.issued;
        let mail = Arc::clone(&self.mail);
        let query = self.query.clone();
        let tx = self.tx.clone();

        debug!("starting fetch #{generation}");
        thread::spawn(move || {
            let result = MailTable::fetch(mail.as_ref(), &token, &query);
            let _ = tx.send(FetchDone { generation, result });
        });
        true
    }

    /// Apply whatever finished since the last call.
    pub fn drain_fetches(&mut self) {
        while let Ok(done) = self.rx.try_recv() {
            self.apply_fetch_done(done);
        }
    }

    pub fn apply_fetch_done(&mut self, done: FetchDone) -> Option<FetchOutcome> {
        self.in_flight = self.in_flight.saturating_sub(1);
        if done.generation <= self.applied {
            debug!(
                "dropping fetch #{} (already showing #{})",
                done.generation, self.applied
            );
            return None;
        }
        self.applied = done.generation;

        let outcome = self.table.apply_fetch(done.result, &mut self.flow);
        self.status = match &outcome {
            FetchOutcome::Replaced(_) | FetchOutcome::Skipped => None,
            FetchOutcome::NoMessages => Some("No Venmo emails found".to_string()),
            FetchOutcome::Failed(_) => Some("Could not load emails".to_string()),
        };
        self.sync_list_state();
        Some(outcome)
    }

    pub fn select(&mut self, index: usize) {
        self.table.select(index, &mut self.flow);
        self.sync_list_state();
    }

    pub fn select_next(&mut self) {
        self.table.select_next(&mut self.flow);
        self.sync_list_state();
    }

    pub fn select_previous(&mut self) {
        self.table.select_previous(&mut self.flow);
        self.sync_list_state();
    }

    pub fn verify(&mut self) -> bool {
        self.table.verify(&mut self.flow)
    }

    /// Map a left click to a row or to the verify button.
    pub fn click(&mut self, column: u16, row: u16) {
        let pos = Position::new(column, row);
        if self.verify_area.contains(pos) {
            self.verify();
            return;
        }
        if self.list_area.contains(pos) {
            let index = self.list_state.offset() + (row - self.list_area.y) as usize;
            self.select(index);
        }
    }

    fn sync_list_state(&mut self) {
        self.list_state.select(self.table.selected());
        if self.table.selected().is_none() {
            *self.list_state.offset_mut() = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::email::{MessageId, MessageList};
    use anyhow::anyhow;

    struct NoMail;

    impl MailProvider for NoMail {
        fn list_messages(&self, _token: &str, _query: &ListQuery) -> Result<MessageList> {
            Ok(MessageList::default())
        }
        fn fetch_full(&self, _token: &str, _ids: &[MessageId]) -> Result<Vec<FetchedEmail>> {
            Ok(vec![])
        }
    }

    fn app() -> App {
        App::new(
            Arc::new(NoMail),
            ListQuery::default(),
            AuthSession::signed_in("me@example.com", "tok", true),
        )
    }

    fn emails(tag: &str, n: usize) -> Vec<FetchedEmail> {
        (0..n)
            .map(|i| FetchedEmail {
                id: format!("{tag}{i}"),
                subject: format!("{tag} {i}"),
                internal_date: "1700000000000".into(),
                decoded_contents: format!("{tag} body {i}"),
            })
            .collect()
    }

    fn done(generation: u64, result: Result<Option<Vec<FetchedEmail>>>) -> FetchDone {
        FetchDone { generation, result }
    }

    #[test]
    fn older_response_never_overwrites_newer_one() {
        let mut app = app();
        app.spawn_fetch();
        app.spawn_fetch();

        assert!(app.apply_fetch_done(done(2, Ok(Some(emails("new", 2))))).is_some());
        assert!(app.apply_fetch_done(done(1, Ok(Some(emails("old", 5))))).is_none());

        assert_eq!(app.table.emails().len(), 2);
        assert_eq!(app.table.emails()[0].id, "new0");
    }

    #[test]
    fn selection_feeds_the_flow_and_resets_on_new_list() {
        let mut app = app();
        app.apply_fetch_done(done(1, Ok(Some(emails("m", 3)))));
        app.select(2);
        assert_eq!(app.flow.email_full, "m body 2");
        assert_eq!(app.list_state.selected(), Some(2));

        app.apply_fetch_done(done(2, Ok(Some(emails("n", 1)))));
        assert_eq!(app.flow.email_full, "");
        assert_eq!(app.list_state.selected(), None);
    }

    #[test]
    fn failed_fetch_sets_status_only() {
        let mut app = app();
        app.apply_fetch_done(done(1, Ok(Some(emails("m", 1)))));
        let outcome = app.apply_fetch_done(done(2, Err(anyhow!("timeout"))));
        assert!(matches!(outcome, Some(FetchOutcome::Failed(_))));
        assert_eq!(app.table.emails().len(), 1);
        assert_eq!(app.status.as_deref(), Some("Could not load emails"));
    }

    #[test]
    fn verify_records_selected_body() {
        let mut app = app();
        app.apply_fetch_done(done(1, Ok(Some(emails("m", 2)))));
        assert!(!app.verify());
        assert_eq!(app.flow.verified, None);

        app.select(1);
        assert!(app.verify());
        assert_eq!(app.flow.verified.as_deref(), Some("m body 1"));
    }

    #[test]
    fn clicks_hit_rows_and_verify_button() {
        let mut app = app();
        app.apply_fetch_done(done(1, Ok(Some(emails("m", 3)))));
        app.list_area = Rect::new(2, 4, 40, 10);
        app.verify_area = Rect::new(2, 15, 40, 3);

        app.click(10, 6);
        assert_eq!(app.table.selected(), Some(2));

        // below the last row: ignored
        app.click(10, 9);
        assert_eq!(app.table.selected(), Some(2));

        app.click(10, 16);
        assert_eq!(app.flow.verified.as_deref(), Some("m body 2"));
    }

    #[test]
    fn becoming_ready_starts_a_fetch_once() {
        let mut app = App::new(
            Arc::new(NoMail),
            ListQuery::default(),
            AuthSession::signed_out("me@example.com"),
        );
        assert!(!app.spawn_fetch());

        assert!(app.set_session(AuthSession::signed_in("me@example.com", "tok", true)));
        assert!(app.is_loading());
        assert!(!app.set_session(AuthSession::signed_in("me@example.com", "tok", true)));
    }

    #[test]
    fn start_fetches_only_for_a_ready_session() {
        let app = App::start(
            Arc::new(NoMail),
            ListQuery::default(),
            AuthSession::signed_in("me@example.com", "tok", true),
        );
        assert!(app.is_loading());
        assert!(app.session.is_ready());

        let app = App::start(
            Arc::new(NoMail),
            ListQuery::default(),
            AuthSession::signed_in("me@example.com", "tok", false),
        );
        assert!(!app.is_loading());
        assert!(app.session.is_authed);
    }
}
