use anyhow::{Result, anyhow};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;

use venmo_mail::auth::{AuthProvider, GoogleAuth, token_store};
use venmo_mail::config::{Config, config_dir, load_config};
use venmo_mail::mail::GmailClient;
use venmo_mail::table::{FetchOutcome, MailTable, TableHost, TableView};
use venmo_mail::terminal::run_picker;

#[derive(Parser)]
#[command(name = "venmo_mail")]
#[command(about = "Pick a Venmo email from Gmail for verification", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the picker; prints the verified email body
    Pick {
        /// Write the body here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Fetch once and print the emails
    List,

    /// Forget stored tokens
    SignOut,

    /// Store the OAuth client secret in keyring
    SetClientSecret {
        #[arg(long)]
        client_id: String,
    },
}

/// Logs go to a file while the TUI owns the terminal.
fn init_logging(to_file: bool) -> Result<()> {
    let mut builder = env_logger::Builder::from_default_env();
    if to_file {
        let dir = config_dir()?;
        std::fs::create_dir_all(&dir)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("venmo_mail.log"))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

fn signed_in_auth(cfg: &Config, interactive: bool) -> Result<GoogleAuth> {
    let mut auth = GoogleAuth::from_config(cfg)?;
    let session = auth.restore()?;
    if !session.is_authed && interactive {
        auth.sign_in()?;
    }
    Ok(auth)
}

/// `list` has no one to hand a body to.
struct PrintOnly;

impl TableHost for PrintOnly {
    fn set_email_full(&mut self, _body: &str) {}
    fn handle_verify_email_clicked(&mut self) {}
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(matches!(cli.cmd, Command::Pick { .. }))?;

    match cli.cmd {
        Command::SetClientSecret { client_id } => {
            eprintln!("Paste client secret (end with Ctrl-D):");
            let mut secret = String::new();
            std::io::Read::read_to_string(&mut std::io::stdin(), &mut secret)?;
            token_store::save_client_secret(&client_id, secret.trim())?;
            println!("Saved client secret for client_id {}", client_id);
            Ok(())
        }

        Command::SignOut => {
            let cfg = load_config().map_err(|e| anyhow!("Configuration error: {e}"))?;
            GoogleAuth::from_config(&cfg)?.sign_out()?;
            println!("Signed out");
            Ok(())
        }

        Command::List => {
            let cfg = load_config().map_err(|e| anyhow!("Configuration error: {e}"))?;
            let auth = signed_in_auth(&cfg, true)?;
            let gmail = GmailClient::new(cfg.gmail_api_base())?;

            let session = auth.session();
            let mut table = MailTable::new();
            match table.refresh(&gmail, &session, &cfg.list_query(), &mut PrintOnly) {
                FetchOutcome::Failed(e) => return Err(anyhow!("fetch failed: {e}")),
                FetchOutcome::Skipped => {
                    return Err(anyhow!("Gmail read access was not granted"));
                }
                FetchOutcome::NoMessages | FetchOutcome::Replaced(_) => {}
            }

            match table.view(&session, &Local::now()) {
                TableView::Placeholder { .. } => println!("No Venmo emails found."),
                TableView::Populated { rows, .. } => {
                    for r in rows {
                        println!("{:>8}  {}", r.date_label, r.subject);
                    }
                }
            }
            Ok(())
        }

        Command::Pick { out } => {
            let cfg = load_config().map_err(|e| anyhow!("Configuration error: {e}"))?;
            // sign-in is offered inside the picker
            let mut auth = signed_in_auth(&cfg, false)?;
            let gmail = Arc::new(GmailClient::new(cfg.gmail_api_base())?);

            let Some(body) = run_picker(&mut auth, gmail, cfg.list_query())? else {
                return Ok(());
            };
            match out {
                Some(path) => {
                    std::fs::write(&path, &body)?;
                    eprintln!("Wrote verified email to {}", path.display());
                }
                None => println!("{body}"),
            }
            Ok(())
        }
    }
}
