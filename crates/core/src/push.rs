//! Push payload decoding.
//!
//! Turns an inbound push message into the notification to display. Every
//! field is optional; absent or empty fields take fixed defaults.

use serde::{Deserialize, Serialize};

use crate::Error;

pub const DEFAULT_TITLE: &str = "KNOWER LIFE";
pub const DEFAULT_BODY: &str = "You have a new update";
pub const DEFAULT_URL: &str = "/";
pub const DEFAULT_ICON: &str = "/icon-192.png";
pub const DEFAULT_TAG: &str = "offcache-push";

pub const ACTION_OPEN: &str = "open";
pub const ACTION_CLOSE: &str = "close";

/// Wire shape of a push message.
#[derive(Debug, Clone, Default, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PushPayload {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    /// Extra action identifiers shown after `open` and `close`.
    #[serde(default)]
    pub actions: Vec<String>,
}

/// A button on a displayed notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

/// A notification ready to be shown. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PendingNotification {
    pub title: String,
    pub body: String,
    pub url: String,
    pub icon: String,
    pub badge: String,
    pub tag: String,
    pub actions: Vec<NotificationAction>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn action_title(action: &str) -> String {
    match action {
        ACTION_OPEN => "Open".to_string(),
        ACTION_CLOSE => "Close".to_string(),
        other => {
            let mut chars = other.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }
    }
}

impl PendingNotification {
    /// Apply defaults to a decoded payload.
    pub fn from_payload(payload: PushPayload) -> Self {
        let mut actions = vec![
            NotificationAction { action: ACTION_OPEN.into(), title: action_title(ACTION_OPEN) },
            NotificationAction { action: ACTION_CLOSE.into(), title: action_title(ACTION_CLOSE) },
        ];
        for extra in payload.actions {
            let extra = extra.trim().to_string();
            if extra.is_empty() || actions.iter().any(|a| a.action == extra) {
                continue;
            }
            actions.push(NotificationAction { title: action_title(&extra), action: extra });
        }

        let icon = non_empty(payload.icon).unwrap_or_else(|| DEFAULT_ICON.into());
        Self {
            title: non_empty(payload.title).unwrap_or_else(|| DEFAULT_TITLE.into()),
            body: non_empty(payload.body).unwrap_or_else(|| DEFAULT_BODY.into()),
            url: non_empty(payload.url).unwrap_or_else(|| DEFAULT_URL.into()),
            badge: icon.clone(),
            icon,
            tag: non_empty(payload.tag).unwrap_or_else(|| DEFAULT_TAG.into()),
            actions,
        }
    }
}

/// Decode raw push bytes.
///
/// An empty message is treated as `{}`.
pub fn decode_payload(data: &[u8]) -> Result<PushPayload, Error> {
    if data.iter().all(u8::is_ascii_whitespace) {
        return Ok(PushPayload::default());
    }
    serde_json::from_slice(data).map_err(|e| Error::MalformedPushPayload(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_payload() {
        let payload = decode_payload(br#"{ "title": "Hi", "body": "Test", "url": "/x" }"#).unwrap();
        let notification = PendingNotification::from_payload(payload);
        assert_eq!(notification.title, "Hi");
        assert_eq!(notification.body, "Test");
        assert_eq!(notification.url, "/x");
        assert_eq!(notification.icon, DEFAULT_ICON);
    }

    #[test]
    fn test_empty_object_uses_defaults() {
        let notification = PendingNotification::from_payload(decode_payload(b"{}").unwrap());
        assert_eq!(notification.title, DEFAULT_TITLE);
        assert_eq!(notification.body, DEFAULT_BODY);
        assert_eq!(notification.url, DEFAULT_URL);
        let actions: Vec<&str> = notification.actions.iter().map(|a| a.action.as_str()).collect();
        assert_eq!(actions, vec![ACTION_OPEN, ACTION_CLOSE]);
    }

    #[test]
    fn test_empty_data_uses_defaults() {
        let payload = decode_payload(b"").unwrap();
        assert!(payload.title.is_none());
    }

    #[test]
    fn test_blank_fields_fall_back() {
        let payload = decode_payload(br#"{ "title": "  ", "url": "" }"#).unwrap();
        let notification = PendingNotification::from_payload(payload);
        assert_eq!(notification.title, DEFAULT_TITLE);
        assert_eq!(notification.url, DEFAULT_URL);
    }

    #[test]
    fn test_extra_actions_deduplicated() {
        let payload = decode_payload(br#"{ "actions": ["reply", "open", "reply", ""] }"#).unwrap();
        let notification = PendingNotification::from_payload(payload);
        let actions: Vec<&str> = notification.actions.iter().map(|a| a.action.as_str()).collect();
        assert_eq!(actions, vec!["open", "close", "reply"]);
        assert_eq!(notification.actions[2].title, "Reply");
    }

    #[test]
    fn test_malformed_payload() {
        assert!(matches!(decode_payload(b"not json"), Err(Error::MalformedPushPayload(_))));
        assert!(matches!(decode_payload(br#"{"title": 5}"#), Err(Error::MalformedPushPayload(_))));
    }
}
