// ABOUTME: Recording ChatController and its factory.
// ABOUTME: Every operation is logged as a ControllerCall; failures can be scripted.

use crate::controller::{
    ChatController, ChatEvent, ChatEventData, ChatResponse, ConnectArgs, ControllerArgs,
    ControllerFactory, DownloadAttachmentArgs, DownloadedAttachment, EventCallback,
    GetTranscriptArgs, SendAttachmentArgs, SendEventArgs, SendMessageArgs, SubscriptionRegistry,
};
use crate::details::{ChatDetails, ParticipantCredentials};
use crate::types::SessionType;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex, MutexGuard};

/// One recorded controller invocation
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerCall {
    Subscribe(ChatEvent),
    SendMessage(SendMessageArgs),
    SendAttachment(SendAttachmentArgs),
    DownloadAttachment(DownloadAttachmentArgs),
    Connect(ConnectArgs),
    SendEvent(SendEventArgs),
    GetTranscript(GetTranscriptArgs),
    ChatDetails,
    CleanUpOnParticipantDisconnect,
    DisconnectParticipant,
}

pub struct MockController {
    session_type: SessionType,
    chat_details: ChatDetails,
    args: Option<ControllerArgs>,
    registry: SubscriptionRegistry,
    calls: Mutex<Vec<ControllerCall>>,
    failure: Option<String>,
}

impl MockController {
    pub fn new(session_type: SessionType) -> Self {
        Self {
            session_type,
            chat_details: ChatDetails {
                contact_id: "contact-1".to_string(),
                participant_id: "participant-1".to_string(),
                initial_contact_id: "contact-1".to_string(),
                credentials: ParticipantCredentials::Token("mock-participant-token".to_string()),
            },
            args: None,
            registry: SubscriptionRegistry::new(),
            calls: Mutex::new(Vec::new()),
            failure: None,
        }
    }

    pub fn from_args(args: ControllerArgs) -> Self {
        Self {
            session_type: args.session_type,
            chat_details: args.chat_details.clone(),
            args: Some(args),
            ..Self::new(SessionType::default())
        }
    }

    /// Make every operation fail with `message`
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    pub fn session_type(&self) -> SessionType {
        self.session_type
    }

    /// Arguments this controller was built from, when built by a factory
    pub fn args(&self) -> Option<&ControllerArgs> {
        self.args.as_ref()
    }

    pub fn calls(&self) -> Vec<ControllerCall> {
        self.lock_calls().clone()
    }

    /// Deliver an event to subscribers; returns how many callbacks ran
    pub fn emit(&self, event: ChatEvent, data: Value) -> usize {
        self.registry.emit(&ChatEventData::new(event, data))
    }

    fn lock_calls(&self) -> MutexGuard<'_, Vec<ControllerCall>> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, call: ControllerCall) -> Result<()> {
        self.lock_calls().push(call);
        match &self.failure {
            Some(message) => anyhow::bail!("{}", message),
            None => Ok(()),
        }
    }

    fn respond(&self, call: ControllerCall) -> Result<ChatResponse> {
        let operation = format!("{:?}", call);
        self.record(call)?;
        Ok(ChatResponse::new(json!({ "operation": operation })))
    }
}

#[async_trait]
impl ChatController for MockController {
    fn subscribe(&self, event: ChatEvent, callback: EventCallback) {
        self.lock_calls().push(ControllerCall::Subscribe(event));
        self.registry.subscribe(event, callback);
    }

    async fn send_message(&self, args: SendMessageArgs) -> Result<ChatResponse> {
        self.respond(ControllerCall::SendMessage(args))
    }

    async fn send_attachment(&self, args: SendAttachmentArgs) -> Result<ChatResponse> {
        self.respond(ControllerCall::SendAttachment(args))
    }

    async fn download_attachment(
        &self,
        args: DownloadAttachmentArgs,
    ) -> Result<DownloadedAttachment> {
        let attachment_id = args.attachment_id.clone();
        self.record(ControllerCall::DownloadAttachment(args))?;
        Ok(DownloadedAttachment {
            attachment_id,
            content_type: "application/octet-stream".to_string(),
            data: Vec::new(),
        })
    }

    async fn connect(&self, args: ConnectArgs) -> Result<ChatResponse> {
        self.respond(ControllerCall::Connect(args))
    }

    async fn send_event(&self, args: SendEventArgs) -> Result<ChatResponse> {
        self.respond(ControllerCall::SendEvent(args))
    }

    async fn get_transcript(&self, args: GetTranscriptArgs) -> Result<ChatResponse> {
        self.respond(ControllerCall::GetTranscript(args))
    }

    fn chat_details(&self) -> ChatDetails {
        self.lock_calls().push(ControllerCall::ChatDetails);
        self.chat_details.clone()
    }

    async fn clean_up_on_participant_disconnect(&self) -> Result<()> {
        self.record(ControllerCall::CleanUpOnParticipantDisconnect)
    }

    async fn disconnect_participant(&self) -> Result<ChatResponse> {
        self.respond(ControllerCall::DisconnectParticipant)
    }
}

/// Controller factory that keeps every controller it builds
#[derive(Default)]
pub struct MockControllerFactory {
    created: Mutex<Vec<Arc<MockController>>>,
    failure: Option<String>,
}

impl MockControllerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            created: Mutex::new(Vec::new()),
            failure: Some(message.into()),
        }
    }

    fn lock_created(&self) -> MutexGuard<'_, Vec<Arc<MockController>>> {
        self.created.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn created_count(&self) -> usize {
        self.lock_created().len()
    }

    /// The most recently built controller
    pub fn last(&self) -> Option<Arc<MockController>> {
        self.lock_created().last().cloned()
    }
}

impl ControllerFactory for MockControllerFactory {
    fn create_controller(&self, args: ControllerArgs) -> Result<Arc<dyn ChatController>> {
        if let Some(message) = &self.failure {
            anyhow::bail!("{}", message);
        }
        let controller = Arc::new(MockController::from_args(args));
        self.lock_created().push(Arc::clone(&controller));
        Ok(controller)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recording_survives_poisoned_lock() {
        let controller = MockController::new(SessionType::Agent);
        let _ = std::thread::scope(|scope| {
            scope
                .spawn(|| {
                    let _held = controller.calls.lock().unwrap();
                    panic!("callback panicked while recording");
                })
                .join()
        });
        assert!(controller.calls.is_poisoned());

        controller.connect(ConnectArgs::default()).await.unwrap();
        assert_eq!(controller.calls(), vec![ControllerCall::Connect(ConnectArgs::default())]);
    }
}
