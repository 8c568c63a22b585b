// ABOUTME: Session role and per-session log metadata.
// ABOUTME: SessionType parsing is where unknown roles are rejected.

use crate::details::ChatDetails;
use crate::error::ChatSessionError;
use serde::{Deserialize, Serialize};
use tracing::Span;

/// Which side of the conversation a session represents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionType {
    #[default]
    Agent,
    Customer,
}

impl SessionType {
    pub const ALL: [SessionType; 2] = [SessionType::Agent, SessionType::Customer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Agent => "AGENT",
            Self::Customer => "CUSTOMER",
        }
    }
}

impl std::fmt::Display for SessionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SessionType {
    type Err = ChatSessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AGENT" => Ok(Self::Agent),
            "CUSTOMER" => Ok(Self::Customer),
            _ => {
                let allowed: Vec<&str> = Self::ALL.iter().map(|t| t.as_str()).collect();
                Err(ChatSessionError::invalid_value(
                    format!(
                        "Unknown value for session type '{}', allowed values are: {}",
                        s,
                        allowed.join(", ")
                    ),
                    s,
                ))
            }
        }
    }
}

/// Identifies a session in every log line emitted on its behalf
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogMetaData {
    pub contact_id: String,
    pub participant_id: String,
    pub session_type: SessionType,
}

impl LogMetaData {
    pub fn new(chat_details: &ChatDetails, session_type: SessionType) -> Self {
        Self {
            contact_id: chat_details.contact_id.clone(),
            participant_id: chat_details.participant_id.clone(),
            session_type,
        }
    }

    /// A span carrying this metadata, for instrumenting a component
    pub fn span(&self, component: &'static str) -> Span {
        tracing::info_span!(
            "chat_session",
            component,
            contact_id = %self.contact_id,
            participant_id = %self.participant_id,
            session_type = %self.session_type,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_session_types() {
        assert_eq!("AGENT".parse::<SessionType>().unwrap(), SessionType::Agent);
        assert_eq!(
            "CUSTOMER".parse::<SessionType>().unwrap(),
            SessionType::Customer
        );
    }

    #[test]
    fn test_unknown_session_type_names_value_and_allowed_set() {
        let err = "SUPERVISOR".parse::<SessionType>().unwrap_err();
        assert!(err.is_invalid_argument());
        let message = err.to_string();
        assert!(message.contains("SUPERVISOR"));
        assert!(message.contains("AGENT, CUSTOMER"));
    }

    #[test]
    fn test_session_type_is_case_sensitive() {
        assert!("agent".parse::<SessionType>().is_err());
    }

    #[test]
    fn test_default_is_agent() {
        assert_eq!(SessionType::default(), SessionType::Agent);
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let json = serde_json::to_string(&SessionType::Customer).unwrap();
        assert_eq!(json, "\"CUSTOMER\"");
    }
}
