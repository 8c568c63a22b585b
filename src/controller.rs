// ABOUTME: ChatController seam that sessions delegate to, plus its argument and event types.
// ABOUTME: SubscriptionRegistry gives controllers ordered fan-out of event callbacks.

use crate::client::ChatClient;
use crate::details::ChatDetails;
use crate::transport::TransportManager;
use crate::types::{LogMetaData, SessionType};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Well-known content types
pub mod content_type {
    pub const TEXT_PLAIN: &str = "text/plain";
    pub const TEXT_MARKDOWN: &str = "text/markdown";
    pub const TYPING: &str = "application/vnd.amazonaws.connect.event.typing";
    pub const CONNECTION_ACKNOWLEDGED: &str =
        "application/vnd.amazonaws.connect.event.connection.acknowledged";
    pub const READ_RECEIPT: &str = "application/vnd.amazonaws.connect.event.message.read";
    pub const DELIVERED_RECEIPT: &str = "application/vnd.amazonaws.connect.event.message.delivered";
}

// =============================================================================
// Events
// =============================================================================

/// Event topics a session can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChatEvent {
    IncomingMessage,
    IncomingTyping,
    ConnectionBroken,
    ConnectionEstablished,
    ChatEnded,
}

impl ChatEvent {
    pub fn topic(&self) -> &'static str {
        match self {
            Self::IncomingMessage => "INCOMING_MESSAGE",
            Self::IncomingTyping => "INCOMING_TYPING",
            Self::ConnectionBroken => "CONNECTION_BROKEN",
            Self::ConnectionEstablished => "CONNECTION_ESTABLISHED",
            Self::ChatEnded => "CHAT_ENDED",
        }
    }
}

/// Payload delivered to event callbacks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatEventData {
    pub event: ChatEvent,
    #[serde(default)]
    pub data: Value,
}

impl ChatEventData {
    pub fn new(event: ChatEvent, data: Value) -> Self {
        Self { event, data }
    }
}

pub type EventCallback = Arc<dyn Fn(&ChatEventData) + Send + Sync>;

/// Per-topic callback lists, invoked in registration order
#[derive(Default)]
pub struct SubscriptionRegistry {
    callbacks: RwLock<HashMap<ChatEvent, Vec<EventCallback>>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, event: ChatEvent, callback: EventCallback) {
        self.callbacks
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(event)
            .or_default()
            .push(callback);
    }

    /// Invoke every callback for `data.event`; returns how many ran.
    ///
    /// Callbacks run outside the lock so they may subscribe further.
    pub fn emit(&self, data: &ChatEventData) -> usize {
        let callbacks = self
            .callbacks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&data.event)
            .cloned()
            .unwrap_or_default();

        for callback in &callbacks {
            callback(data);
        }
        callbacks.len()
    }

    pub fn subscriber_count(&self, event: ChatEvent) -> usize {
        self.callbacks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&event)
            .map_or(0, Vec::len)
    }
}

// =============================================================================
// Operation arguments
// =============================================================================

fn default_content_type() -> String {
    content_type::TEXT_PLAIN.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageArgs {
    pub message: String,
    #[serde(default = "default_content_type")]
    pub content_type: String,
}

impl SendMessageArgs {
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            content_type: default_content_type(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SendAttachmentArgs {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadAttachmentArgs {
    pub attachment_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectArgs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEventArgs {
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl SendEventArgs {
    pub fn typing() -> Self {
        Self {
            content_type: content_type::TYPING.to_string(),
            content: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanDirection {
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTranscriptArgs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_direction: Option<ScanDirection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<SortOrder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_position: Option<Value>,
}

/// Response envelope returned by controller operations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl ChatResponse {
    pub fn new(data: Value) -> Self {
        Self {
            data,
            metadata: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DownloadedAttachment {
    pub attachment_id: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

// =============================================================================
// Controller
// =============================================================================

/// Implements messaging, attachments, transcripts and event dispatch for one
/// chat. Sessions forward every call here unchanged.
#[async_trait]
pub trait ChatController: Send + Sync {
    fn subscribe(&self, event: ChatEvent, callback: EventCallback);

    async fn send_message(&self, args: SendMessageArgs) -> Result<ChatResponse>;

    async fn send_attachment(&self, args: SendAttachmentArgs) -> Result<ChatResponse>;

    async fn download_attachment(&self, args: DownloadAttachmentArgs)
        -> Result<DownloadedAttachment>;

    async fn connect(&self, args: ConnectArgs) -> Result<ChatResponse>;

    async fn send_event(&self, args: SendEventArgs) -> Result<ChatResponse>;

    async fn get_transcript(&self, args: GetTranscriptArgs) -> Result<ChatResponse>;

    fn chat_details(&self) -> ChatDetails;

    /// Agent side: release resources after the other participant left
    async fn clean_up_on_participant_disconnect(&self) -> Result<()>;

    /// Customer side: end the chat from the customer's end
    async fn disconnect_participant(&self) -> Result<ChatResponse>;
}

/// Everything a controller is built from
#[derive(Clone)]
pub struct ControllerArgs {
    pub session_type: SessionType,
    pub chat_details: ChatDetails,
    pub chat_client: Arc<dyn ChatClient>,
    pub transport_manager: Option<Arc<dyn TransportManager>>,
    pub log_meta_data: LogMetaData,
}

/// Builds controllers for the session factory
pub trait ControllerFactory: Send + Sync {
    fn create_controller(&self, args: ControllerArgs) -> Result<Arc<dyn ChatController>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[test]
    fn test_emit_runs_callbacks_in_registration_order() {
        let registry = SubscriptionRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for label in ["first", "second", "third"] {
            let seen = Arc::clone(&seen);
            registry.subscribe(
                ChatEvent::IncomingMessage,
                Arc::new(move |_| seen.lock().unwrap().push(label)),
            );
        }

        let ran = registry.emit(&ChatEventData::new(ChatEvent::IncomingMessage, json!({})));
        assert_eq!(ran, 3);
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_emit_only_reaches_matching_topic() {
        let registry = SubscriptionRegistry::new();
        let hits = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&hits);
        registry.subscribe(
            ChatEvent::ChatEnded,
            Arc::new(move |_| *counter.lock().unwrap() += 1),
        );

        registry.emit(&ChatEventData::new(ChatEvent::IncomingTyping, Value::Null));
        assert_eq!(*hits.lock().unwrap(), 0);
        assert_eq!(registry.subscriber_count(ChatEvent::ChatEnded), 1);
        assert_eq!(registry.subscriber_count(ChatEvent::IncomingTyping), 0);
    }

    #[test]
    fn test_send_message_args_default_content_type() {
        let args: SendMessageArgs = serde_json::from_value(json!({"message": "hi"})).unwrap();
        assert_eq!(args.content_type, content_type::TEXT_PLAIN);
    }
}
