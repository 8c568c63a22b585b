// ABOUTME: Chat session facade over a pluggable controller, with a runtime entrypoint
// ABOUTME: Re-exports session types, configuration, and the connection helper crate

pub mod client;
pub mod config;
pub mod controller;
pub mod details;
pub mod error;
pub mod factory;
pub mod logging;
pub mod runtime;
pub mod session;
pub mod telemetry;
pub mod testing;
pub mod transport;
pub mod types;

pub use client::{ChatClient, ChatClientFactory, ClientCache, ClientOptions};
pub use config::{GlobalConfig, SharedConfig};
pub use controller::{
    ChatController, ChatEvent, ChatEventData, ChatResponse, ControllerArgs, ControllerFactory,
    SubscriptionRegistry,
};
pub use details::{ChatDetails, ChatDetailsInput, ParticipantTokenSource};
pub use error::{ChatSessionError, Result};
pub use factory::{PersistentSessionFactory, SessionFactory};
pub use runtime::{ChatRuntime, ChatRuntimeBuilder, CreateSessionArgs};
pub use session::{AgentSession, ChatSession, CustomerSession, Session};
pub use telemetry::TelemetryService;
pub use transport::TransportManager;
pub use types::{LogMetaData, SessionType};

pub use chat_connection;
