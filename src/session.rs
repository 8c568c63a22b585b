// ABOUTME: Caller-facing chat session facade; every operation is one controller call.
// ABOUTME: AgentSession and CustomerSession add role-specific operations on top of ChatSession.

use crate::controller::{
    ChatController, ChatEvent, ChatEventData, ChatResponse, ConnectArgs, DownloadAttachmentArgs,
    DownloadedAttachment, GetTranscriptArgs, SendAttachmentArgs, SendEventArgs, SendMessageArgs,
};
use crate::details::ChatDetails;
use crate::telemetry::{environment_dimensions, MetricCategory, TelemetryService, START_CHAT_SESSION};
use crate::types::SessionType;
use anyhow::Result;
use std::ops::Deref;
use std::sync::Arc;

/// Operations shared by both roles. Errors come back from the controller
/// exactly as it produced them.
pub struct ChatSession {
    controller: Arc<dyn ChatController>,
    session_type: SessionType,
}

impl ChatSession {
    pub fn new(
        controller: Arc<dyn ChatController>,
        session_type: SessionType,
        telemetry: &TelemetryService,
    ) -> Self {
        telemetry.add_count_metric(
            START_CHAT_SESSION,
            MetricCategory::Ui,
            environment_dimensions(),
        );
        Self {
            controller,
            session_type,
        }
    }

    pub fn session_type(&self) -> SessionType {
        self.session_type
    }

    fn subscribe<F>(&self, event: ChatEvent, callback: F)
    where
        F: Fn(&ChatEventData) + Send + Sync + 'static,
    {
        self.controller.subscribe(event, Arc::new(callback));
    }

    pub fn on_message<F>(&self, callback: F)
    where
        F: Fn(&ChatEventData) + Send + Sync + 'static,
    {
        self.subscribe(ChatEvent::IncomingMessage, callback);
    }

    pub fn on_typing<F>(&self, callback: F)
    where
        F: Fn(&ChatEventData) + Send + Sync + 'static,
    {
        self.subscribe(ChatEvent::IncomingTyping, callback);
    }

    pub fn on_connection_broken<F>(&self, callback: F)
    where
        F: Fn(&ChatEventData) + Send + Sync + 'static,
    {
        self.subscribe(ChatEvent::ConnectionBroken, callback);
    }

    pub fn on_connection_established<F>(&self, callback: F)
    where
        F: Fn(&ChatEventData) + Send + Sync + 'static,
    {
        self.subscribe(ChatEvent::ConnectionEstablished, callback);
    }

    pub fn on_ended<F>(&self, callback: F)
    where
        F: Fn(&ChatEventData) + Send + Sync + 'static,
    {
        self.subscribe(ChatEvent::ChatEnded, callback);
    }

    pub async fn send_message(&self, args: SendMessageArgs) -> Result<ChatResponse> {
        self.controller.send_message(args).await
    }

    pub async fn send_attachment(&self, args: SendAttachmentArgs) -> Result<ChatResponse> {
        self.controller.send_attachment(args).await
    }

    pub async fn download_attachment(
        &self,
        args: DownloadAttachmentArgs,
    ) -> Result<DownloadedAttachment> {
        self.controller.download_attachment(args).await
    }

    pub async fn connect(&self, args: ConnectArgs) -> Result<ChatResponse> {
        self.controller.connect(args).await
    }

    pub async fn send_event(&self, args: SendEventArgs) -> Result<ChatResponse> {
        self.controller.send_event(args).await
    }

    pub async fn get_transcript(&self, args: GetTranscriptArgs) -> Result<ChatResponse> {
        self.controller.get_transcript(args).await
    }

    pub fn chat_details(&self) -> ChatDetails {
        self.controller.chat_details()
    }
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("session_type", &self.session_type)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct AgentSession {
    inner: ChatSession,
}

impl AgentSession {
    pub fn new(controller: Arc<dyn ChatController>, telemetry: &TelemetryService) -> Self {
        Self {
            inner: ChatSession::new(controller, SessionType::Agent, telemetry),
        }
    }

    /// Release agent-side resources once the customer has left
    pub async fn clean_up_on_participant_disconnect(&self) -> Result<()> {
        self.inner.controller.clean_up_on_participant_disconnect().await
    }
}

impl Deref for AgentSession {
    type Target = ChatSession;

    fn deref(&self) -> &ChatSession {
        &self.inner
    }
}

#[derive(Debug)]
pub struct CustomerSession {
    inner: ChatSession,
}

impl CustomerSession {
    pub fn new(controller: Arc<dyn ChatController>, telemetry: &TelemetryService) -> Self {
        Self {
            inner: ChatSession::new(controller, SessionType::Customer, telemetry),
        }
    }

    /// End the chat from the customer's side
    pub async fn disconnect_participant(&self) -> Result<ChatResponse> {
        self.inner.controller.disconnect_participant().await
    }
}

impl Deref for CustomerSession {
    type Target = ChatSession;

    fn deref(&self) -> &ChatSession {
        &self.inner
    }
}

/// A session of either role
#[derive(Debug)]
pub enum Session {
    Agent(AgentSession),
    Customer(CustomerSession),
}

impl Session {
    pub fn session_type(&self) -> SessionType {
        match self {
            Self::Agent(_) => SessionType::Agent,
            Self::Customer(_) => SessionType::Customer,
        }
    }

    pub fn as_agent(&self) -> Option<&AgentSession> {
        match self {
            Self::Agent(session) => Some(session),
            Self::Customer(_) => None,
        }
    }

    pub fn as_customer(&self) -> Option<&CustomerSession> {
        match self {
            Self::Customer(session) => Some(session),
            Self::Agent(_) => None,
        }
    }
}

impl Deref for Session {
    type Target = ChatSession;

    fn deref(&self) -> &ChatSession {
        match self {
            Self::Agent(session) => &session.inner,
            Self::Customer(session) => &session.inner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ControllerCall, MockController};

    #[tokio::test]
    async fn test_session_type_matches_variant() {
        let telemetry = TelemetryService::default();
        let controller = Arc::new(MockController::new(SessionType::Customer));
        let session = Session::Customer(CustomerSession::new(controller.clone(), &telemetry));

        assert_eq!(session.session_type(), SessionType::Customer);
        assert!(session.as_agent().is_none());
        assert!(session.as_customer().is_some());

        session.send_event(SendEventArgs::typing()).await.unwrap();
        assert_eq!(
            controller.calls(),
            vec![ControllerCall::SendEvent(SendEventArgs::typing())]
        );
    }

    #[test]
    fn test_construction_records_start_metric() {
        let telemetry = TelemetryService::default();
        let _session = AgentSession::new(Arc::new(MockController::new(SessionType::Agent)), &telemetry);
        assert_eq!(telemetry.pending_count(), 1);
    }
}
