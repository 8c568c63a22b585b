// ABOUTME: Chat details input validation and normalization into ChatDetails.
// ABOUTME: Accepts camelCase or PascalCase keys; requires ids plus a token or token source.

use crate::error::{ChatSessionError, Result};
use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

/// Supplies participant tokens on demand instead of a fixed token
#[async_trait]
pub trait ParticipantTokenSource: Send + Sync {
    async fn participant_token(&self) -> anyhow::Result<String>;
}

/// Raw chat details as handed over by the caller, typically straight from
/// a start-chat response.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatDetailsInput {
    #[serde(default, alias = "ContactId")]
    pub contact_id: Option<String>,
    #[serde(default, alias = "ParticipantId")]
    pub participant_id: Option<String>,
    #[serde(default, alias = "InitialContactId")]
    pub initial_contact_id: Option<String>,
    #[serde(default, alias = "ParticipantToken")]
    pub participant_token: Option<String>,
    #[serde(skip)]
    pub token_source: Option<Arc<dyn ParticipantTokenSource>>,
}

impl ChatDetailsInput {
    pub fn new(contact_id: impl Into<String>, participant_id: impl Into<String>) -> Self {
        Self {
            contact_id: Some(contact_id.into()),
            participant_id: Some(participant_id.into()),
            ..Self::default()
        }
    }

    pub fn with_participant_token(mut self, token: impl Into<String>) -> Self {
        self.participant_token = Some(token.into());
        self
    }

    pub fn with_initial_contact_id(mut self, initial_contact_id: impl Into<String>) -> Self {
        self.initial_contact_id = Some(initial_contact_id.into());
        self
    }

    pub fn with_token_source(mut self, source: Arc<dyn ParticipantTokenSource>) -> Self {
        self.token_source = Some(source);
        self
    }

    /// Parse from JSON, e.g. a start-chat response body
    pub fn from_json(value: serde_json::Value) -> anyhow::Result<Self> {
        serde_json::from_value(value).context("Failed to parse chat details")
    }
}

// Custom Debug impl to redact the participant token
impl std::fmt::Debug for ChatDetailsInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatDetailsInput")
            .field("contact_id", &self.contact_id)
            .field("participant_id", &self.participant_id)
            .field("initial_contact_id", &self.initial_contact_id)
            .field(
                "participant_token",
                &self.participant_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("token_source", &self.token_source.is_some())
            .finish()
    }
}

/// How the participant authenticates to the chat service
#[derive(Clone)]
pub enum ParticipantCredentials {
    Token(String),
    Source(Arc<dyn ParticipantTokenSource>),
}

impl ParticipantCredentials {
    /// Resolve to a token, asking the source if there is one
    pub async fn participant_token(&self) -> anyhow::Result<String> {
        match self {
            Self::Token(token) => Ok(token.clone()),
            Self::Source(source) => source.participant_token().await,
        }
    }
}

impl std::fmt::Debug for ParticipantCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Token(_) => f.write_str("Token([REDACTED])"),
            Self::Source(_) => f.write_str("Source(..)"),
        }
    }
}

/// Validated chat details, read-only once handed to a controller
#[derive(Debug, Clone)]
pub struct ChatDetails {
    pub contact_id: String,
    pub participant_id: String,
    pub initial_contact_id: String,
    pub credentials: ParticipantCredentials,
}

fn require_non_blank(value: Option<String>, field: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        Some(v) => Err(ChatSessionError::invalid_value(
            format!("{} must be a non-empty string", field),
            v,
        )),
        None => Err(ChatSessionError::invalid_argument(format!(
            "{} is required",
            field
        ))),
    }
}

/// Validate raw input into [`ChatDetails`].
///
/// `initial_contact_id` falls back to `contact_id`. A participant token wins
/// over a token source when both are given.
pub fn normalize_chat_details(input: ChatDetailsInput) -> Result<ChatDetails> {
    let contact_id = require_non_blank(input.contact_id, "chatDetails.contactId")?;
    let participant_id = require_non_blank(input.participant_id, "chatDetails.participantId")?;
    let initial_contact_id = input
        .initial_contact_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| contact_id.clone());

    let credentials = match (input.participant_token, input.token_source) {
        (Some(token), _) => ParticipantCredentials::Token(require_non_blank(
            Some(token),
            "chatDetails.participantToken",
        )?),
        (None, Some(source)) => ParticipantCredentials::Source(source),
        (None, None) => {
            return Err(ChatSessionError::invalid_argument(
                "chatDetails.participantToken or a participant token source must be provided",
            ))
        }
    };

    Ok(ChatDetails {
        contact_id,
        participant_id,
        initial_contact_id,
        credentials,
    })
}
