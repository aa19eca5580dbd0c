use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::email::{DEFAULT_SENDER, ListQuery};

pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8080/callback";
pub const DEFAULT_GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub client_id: String,
    pub user_email: Option<String>,
    pub redirect_uri: Option<String>,
    pub sender: Option<String>,
    pub max_results: Option<u32>,
    pub gmail_api_base: Option<String>,
}

impl Config {
    pub fn redirect_uri(&self) -> String {
        self.redirect_uri
            .clone()
            .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string())
    }

    pub fn gmail_api_base(&self) -> String {
        self.gmail_api_base
            .clone()
            .unwrap_or_else(|| DEFAULT_GMAIL_API_BASE.to_string())
    }

    pub fn user_email(&self) -> Result<String> {
        self.user_email
            .clone()
            .ok_or_else(|| anyhow::anyhow!("user_email not set in config"))
    }

    pub fn list_query(&self) -> ListQuery {
        ListQuery {
            from: self
                .sender
                .clone()
                .unwrap_or_else(|| DEFAULT_SENDER.to_string()),
            max_results: self.max_results,
        }
    }
}

pub fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("no config dir available"))?
        .join("venmo_mail"))
}

pub fn config_path() -> Result<PathBuf> {
    let mut p = config_dir()?;
    fs::create_dir_all(&p)?;
    p.push("config.toml");
    Ok(p)
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        // create a template config for users to edit
        let sample = Config {
            client_id: "YOUR_CLIENT_ID.apps.googleusercontent.com".to_string(),
            user_email: Some("you@example.com".to_string()),
            redirect_uri: Some(DEFAULT_REDIRECT_URI.to_string()),
            sender: Some(DEFAULT_SENDER.to_string()),
            max_results: None,
            gmail_api_base: None,
        };
        let tom = toml::to_string_pretty(&sample)?;
        fs::write(path, tom)?;
        return Err(anyhow::anyhow!(
            "Created template config at {}; edit it and run again",
            path.display()
        ));
    }
    let s = fs::read_to_string(path)?;
    let cfg: Config = toml::from_str(&s)?;
    Ok(cfg)
}
