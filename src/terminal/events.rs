use ratatui::crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind,
};

use crate::terminal::state::App;

/// Things the event handler cannot do on its own: they need the auth
/// provider or the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    Quit,
    SignIn,
    SignOut,
    Refresh,
}

pub fn handle_event(event: Event, app: &mut App) -> Action {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => handle_key(key, app),
        Event::Mouse(mouse) => {
            handle_mouse(mouse, app);
            Action::None
        }
        _ => Action::None,
    }
}

pub fn handle_key(key: KeyEvent, app: &mut App) -> Action {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('s') => Action::SignIn,
        KeyCode::Char('o') => Action::SignOut,
        KeyCode::Char('r') => Action::Refresh,
        _ if showing_placeholder(app) => Action::None,

        KeyCode::Down | KeyCode::Char('j') => {
            app.select_next();
            Action::None
        }
        KeyCode::Up | KeyCode::Char('k') => {
            app.select_previous();
            Action::None
        }
        KeyCode::Home => {
            app.select(0);
            Action::None
        }
        KeyCode::End => {
            let last = app.table.emails().len().saturating_sub(1);
            app.select(last);
            Action::None
        }
        KeyCode::Enter | KeyCode::Char('v') => {
            if !app.verify() {
                app.status = Some("Select an email first".to_string());
            }
            Action::None
        }
        _ => Action::None,
    }
}

fn handle_mouse(mouse: MouseEvent, app: &mut App) {
    if showing_placeholder(app) {
        return;
    }
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => app.click(mouse.column, mouse.row),
        MouseEventKind::ScrollDown => app.select_next(),
        MouseEventKind::ScrollUp => app.select_previous(),
        _ => {}
    }
}

// rows and the verify button only exist in the populated view
fn showing_placeholder(app: &App) -> bool {
    !app.session.is_authed || app.table.emails().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthSession;
    use crate::domain::email::{FetchedEmail, ListQuery, MessageId, MessageList};
    use crate::mail::MailProvider;
    use crate::terminal::state::FetchDone;
    use ratatui::crossterm::event::KeyModifiers;
    use std::sync::Arc;

    struct NoMail;

    impl MailProvider for NoMail {
        fn list_messages(&self, _: &str, _: &ListQuery) -> anyhow::Result<MessageList> {
            Ok(MessageList::default())
        }
        fn fetch_full(&self, _: &str, _: &[MessageId]) -> anyhow::Result<Vec<FetchedEmail>> {
            Ok(vec![])
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn populated(session: AuthSession) -> App {
        let mut app = App::new(Arc::new(NoMail), ListQuery::default(), session);
        let emails = (0..2)
            .map(|i| FetchedEmail {
                id: i.to_string(),
                subject: format!("s{i}"),
                internal_date: "0".into(),
                decoded_contents: format!("b{i}"),
            })
            .collect();
        app.apply_fetch_done(FetchDone {
            generation: 1,
            result: Ok(Some(emails)),
        });
        app
    }

    #[test]
    fn enter_without_selection_does_not_verify() {
        let mut app = populated(AuthSession::signed_in("me@example.com", "tok", true));
        assert_eq!(handle_key(key(KeyCode::Enter), &mut app), Action::None);
        assert_eq!(app.flow.verified, None);
        assert!(app.status.is_some());

        handle_key(key(KeyCode::Char('j')), &mut app);
        handle_key(key(KeyCode::Char('j')), &mut app);
        handle_key(key(KeyCode::Enter), &mut app);
        assert_eq!(app.flow.verified.as_deref(), Some("b1"));
    }

    #[test]
    fn rows_are_inert_while_signed_out() {
        let mut app = populated(AuthSession::signed_out("me@example.com"));
        handle_key(key(KeyCode::Char('j')), &mut app);
        assert_eq!(app.table.selected(), None);
        assert_eq!(handle_key(key(KeyCode::Char('s')), &mut app), Action::SignIn);
    }

    #[test]
    fn global_keys_map_to_actions() {
        let mut app = populated(AuthSession::signed_in("me@example.com", "tok", true));
        assert_eq!(handle_key(key(KeyCode::Char('r')), &mut app), Action::Refresh);
        assert_eq!(handle_key(key(KeyCode::Char('o')), &mut app), Action::SignOut);
        assert_eq!(handle_key(key(KeyCode::Esc), &mut app), Action::Quit);
    }
}
