//! push_dispatch and notification_action tool implementations.

use offcache_client::Worker;
use offcache_core::Error;
use offcache_core::push::PendingNotification;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the push_dispatch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PushDispatchParams {
    /// Raw push message, normally JSON like `{"title":"Hi","body":"Test","url":"/x"}`.
    #[serde(default)]
    pub payload: String,
}

/// Output from the push_dispatch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PushDispatchOutput {
    /// False when the payload could not be decoded.
    pub shown: bool,
    pub notification: Option<PendingNotification>,
}

/// Parameters for the notification_action tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NotificationActionParams {
    /// Action identifier; empty means the notification body was clicked.
    #[serde(default)]
    pub action: String,

    /// The notification as returned by push_dispatch.
    pub notification: PendingNotification,
}

/// Output from the notification_action tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NotificationActionOutput {
    pub navigated_to: Option<String>,
}

fn to_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// Implementation of the push_dispatch tool.
pub async fn push_impl(worker: &Worker, params: PushDispatchParams) -> Result<CallToolResult, McpError> {
    let notification = worker.push(params.payload.as_bytes()).await;
    to_result(&PushDispatchOutput { shown: notification.is_some(), notification })
}

/// Implementation of the notification_action tool.
pub async fn action_impl(worker: &Worker, params: NotificationActionParams) -> Result<CallToolResult, McpError> {
    let target = worker.notification_action(&params.action, &params.notification).await;
    to_result(&NotificationActionOutput { navigated_to: target.map(|url| url.to_string()) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{output, worker};

    #[tokio::test]
    async fn test_push_then_open() {
        let (worker, _network) = worker().await;
        let params = PushDispatchParams { payload: r#"{ "title": "Hi", "body": "Test", "url": "/x" }"#.into() };
        let out: PushDispatchOutput = output(&push_impl(&worker, params).await.unwrap());
        assert!(out.shown);
        let notification = out.notification.unwrap();
        assert_eq!(notification.title, "Hi");

        let params = NotificationActionParams { action: "open".into(), notification };
        let out: NotificationActionOutput = output(&action_impl(&worker, params).await.unwrap());
        assert_eq!(out.navigated_to.as_deref(), Some("https://app.example/x"));
    }

    #[tokio::test]
    async fn test_push_malformed() {
        let (worker, _network) = worker().await;
        let params = PushDispatchParams { payload: "{ not json".into() };
        let out: PushDispatchOutput = output(&push_impl(&worker, params).await.unwrap());
        assert!(!out.shown);
        assert!(out.notification.is_none());
    }

    #[tokio::test]
    async fn test_close_action() {
        let (worker, _network) = worker().await;
        let params = PushDispatchParams { payload: "{}".into() };
        let out: PushDispatchOutput = output(&push_impl(&worker, params).await.unwrap());

        let params = NotificationActionParams { action: "close".into(), notification: out.notification.unwrap() };
        let out: NotificationActionOutput = output(&action_impl(&worker, params).await.unwrap());
        assert!(out.navigated_to.is_none());
    }
}
