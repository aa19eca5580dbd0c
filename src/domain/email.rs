use serde::Deserialize;

pub type MessageId = String;

pub const DEFAULT_SENDER: &str = "venmo@venmo.com";

/// One entry of a `users.messages.list` response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    pub id: MessageId,
    pub thread_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageList {
    // Gmail omits the field entirely when nothing matches
    #[serde(default)]
    pub messages: Vec<MessageRef>,
    pub result_size_estimate: Option<u32>,
}

impl MessageList {
    pub fn ids(&self) -> Vec<MessageId> {
        self.messages.iter().map(|m| m.id.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Search parameters for listing messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub from: String,
    pub max_results: Option<u32>,
}

impl ListQuery {
    pub fn from_sender(sender: impl Into<String>) -> Self {
        Self {
            from: sender.into(),
            max_results: None,
        }
    }

    /// Gmail search expression (`q` parameter).
    pub fn search(&self) -> String {
        format!("from:{}", self.from)
    }
}

impl Default for ListQuery {
    fn default() -> Self {
        Self::from_sender(DEFAULT_SENDER)
    }
}

/// A fully fetched and decoded message, as shown in the mail table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedEmail {
    pub id: MessageId,
    pub subject: String,
    /// Epoch milliseconds, kept as text the way Gmail reports it.
    pub internal_date: String,
    pub decoded_contents: String,
}

impl FetchedEmail {
    pub fn timestamp_ms(&self) -> Option<i64> {
        self.internal_date.trim().parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_without_messages_field_is_empty() {
        let list: MessageList = serde_json::from_str(r#"{"resultSizeEstimate":0}"#).unwrap();
        assert!(list.is_empty());
        assert_eq!(list.result_size_estimate, Some(0));
    }

    #[test]
    fn list_keeps_response_order() {
        let list: MessageList = serde_json::from_str(
            r#"{"messages":[{"id":"b","threadId":"t1"},{"id":"a","threadId":"t2"}]}"#,
        )
        .unwrap();
        assert_eq!(list.ids(), vec!["b".to_string(), "a".to_string()]);
        assert_eq!(list.messages[0].thread_id.as_deref(), Some("t1"));
    }

    #[test]
    fn default_query_targets_venmo() {
        assert_eq!(ListQuery::default().search(), "from:venmo@venmo.com");
    }

    #[test]
    fn timestamp_parses_numeric_text_only() {
        let mut e = FetchedEmail {
            id: "1".into(),
            subject: "s".into(),
            internal_date: "1700000000000".into(),
            decoded_contents: String::new(),
        };
        assert_eq!(e.timestamp_ms(), Some(1_700_000_000_000));
        e.internal_date = "yesterday".into();
        assert_eq!(e.timestamp_ms(), None);
    }
}
