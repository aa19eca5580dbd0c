pub mod events;
pub mod state;
pub mod ui;

use anyhow::{Result, anyhow};
use log::{error, warn};
use ratatui::DefaultTerminal;
use ratatui::crossterm::event::{self, DisableMouseCapture, EnableMouseCapture};
use ratatui::crossterm::execute;
use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::AuthProvider;
use crate::domain::email::ListQuery;
use crate::mail::MailProvider;
use crate::terminal::events::{Action, handle_event};
use crate::terminal::state::App;

const TICK: Duration = Duration::from_millis(100);

fn enter() -> Result<DefaultTerminal> {
    let terminal = ratatui::init();
    execute!(stdout(), EnableMouseCapture)?;
    Ok(terminal)
}

fn leave() {
    let _ = execute!(stdout(), DisableMouseCapture);
    ratatui::restore();
}

/// Run the picker until the user verifies an email (returns its body) or quits.
pub fn run_picker(
    auth: &mut dyn AuthProvider,
    mail: Arc<dyn MailProvider>,
    query: ListQuery,
) -> Result<Option<String>> {
    color_eyre::install().map_err(|e| anyhow!("{e}"))?;

    let mut app = App::start(mail, query, auth.session());

    let mut terminal = enter()?;
    let result = run(&mut terminal, &mut app, auth);
    leave();

    result?;
    Ok(app.flow.verified.take())
}

fn run(terminal: &mut DefaultTerminal, app: &mut App, auth: &mut dyn AuthProvider) -> Result<()> {
    loop {
        app.drain_fetches();
        terminal.draw(|f| ui::render(f, app))?;

        if app.flow.verified.is_some() {
            return Ok(());
        }
        if !event::poll(TICK)? {
            continue;
        }

        match handle_event(event::read()?, app) {
            Action::None => {}
            Action::Quit => return Ok(()),
            Action::SignIn => {
                // the consent flow prints to the normal screen
                leave();
                let signed_in = auth.sign_in();
                *terminal = enter()?;
                terminal.clear()?;
                match signed_in {
                    Ok(session) => {
                        if !session.scopes_approved {
                            app.status = Some("Gmail read access was not granted".to_string());
                        }
                        app.set_session(session);
                    }
                    Err(e) => {
                        error!("sign-in failed: {e:#}");
                        app.status = Some("Sign-in failed".to_string());
                    }
                }
            }
            Action::SignOut => {
                if let Err(e) = auth.sign_out() {
                    warn!("sign-out incomplete: {e:#}");
                }
                app.set_session(auth.session());
            }
            Action::Refresh => {
                if let Err(e) = auth.refresh_if_expired() {
                    warn!("token refresh failed: {e:#}");
                }
                if !app.set_session(auth.session()) {
                    app.spawn_fetch();
                }
            }
        }
    }
}
