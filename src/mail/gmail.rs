use anyhow::{Result, anyhow};
use log::debug;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::domain::email::{FetchedEmail, ListQuery, MessageId, MessageList};
use crate::mail::decoders::{decode_base64url, subject_and_body};
use crate::mail::provider::MailProvider;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// `users.messages.get` with `format=raw`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMessage {
    id: String,
    internal_date: Option<String>,
    raw: Option<String>,
}

pub struct GmailClient {
    http: Client,
    base_url: String,
}

impl GmailClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        token: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}/users/me/{}", self.base_url, path);
        debug!("GET {url}");
        let resp = self.http.get(&url).bearer_auth(token).query(query).send()?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(anyhow!("Gmail request {path} failed ({status}): {body}"));
        }
        Ok(resp.json()?)
    }

    fn fetch_one(&self, token: &str, id: &str) -> Result<FetchedEmail> {
        validate_message_id(id)?;
        let msg: RawMessage = self.get_json(
            token,
            &format!("messages/{id}"),
            &[("format", "raw".to_string())],
        )?;

        let raw = msg
            .raw
            .ok_or_else(|| anyhow!("message {id} has no raw payload"))?;
        let bytes = decode_base64url(&raw)?;
        let (subject, decoded_contents) = subject_and_body(&bytes);

        Ok(FetchedEmail {
            id: msg.id,
            subject,
            internal_date: msg.internal_date.unwrap_or_default(),
            decoded_contents,
        })
    }
}

fn validate_message_id(id: &str) -> Result<()> {
    if id.is_empty() || id.contains('/') || id.contains('\\') || id.contains("..") {
        return Err(anyhow!("invalid message ID: {id:?}"));
    }
    Ok(())
}

impl MailProvider for GmailClient {
    fn list_messages(&self, token: &str, query: &ListQuery) -> Result<MessageList> {
        let mut params = vec![("q", query.search())];
        if let Some(n) = query.max_results {
            params.push(("maxResults", n.to_string()));
        }
        self.get_json(token, "messages", &params)
    }

    fn fetch_full(&self, token: &str, ids: &[MessageId]) -> Result<Vec<FetchedEmail>> {
        ids.iter().map(|id| self.fetch_one(token, id)).collect()
    }
}
