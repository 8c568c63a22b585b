// ABOUTME: Session factory: validates input, resolves a cached client, builds the controller.
// ABOUTME: The session type is parsed before anything is constructed.

use crate::client::{ChatClientFactory, ClientCache, ClientOptions};
use crate::config::SharedConfig;
use crate::controller::{ChatController, ControllerArgs, ControllerFactory};
use crate::details::{normalize_chat_details, ChatDetailsInput};
use crate::error::{ChatSessionError, Result};
use crate::logging::log_advanced;
use crate::session::{AgentSession, CustomerSession, Session};
use crate::telemetry::TelemetryService;
use crate::transport::TransportManager;
use crate::types::{LogMetaData, SessionType};
use std::sync::Arc;

/// Builds sessions of either role
pub trait SessionFactory: Send + Sync {
    fn create_chat_session(
        &self,
        session_type: SessionType,
        input: ChatDetailsInput,
        options: &ClientOptions,
        transport_manager: Option<Arc<dyn TransportManager>>,
    ) -> Result<Session>;
}

/// Factory backed by a shared client cache, so sessions with the same
/// client options talk through the same client.
pub struct PersistentSessionFactory {
    clients: ClientCache,
    controllers: Arc<dyn ControllerFactory>,
    telemetry: Arc<TelemetryService>,
    config: SharedConfig,
}

impl PersistentSessionFactory {
    pub fn new(
        client_factory: Arc<dyn ChatClientFactory>,
        controller_factory: Arc<dyn ControllerFactory>,
        telemetry: Arc<TelemetryService>,
        config: SharedConfig,
    ) -> Self {
        Self {
            clients: ClientCache::new(client_factory),
            controllers: controller_factory,
            telemetry,
            config,
        }
    }

    pub fn client_cache(&self) -> &ClientCache {
        &self.clients
    }

    fn create_controller(
        &self,
        session_type: SessionType,
        input: ChatDetailsInput,
        options: &ClientOptions,
        transport_manager: Option<Arc<dyn TransportManager>>,
    ) -> Result<(Arc<dyn ChatController>, LogMetaData)> {
        let chat_details = normalize_chat_details(input)?;
        let log_meta_data = LogMetaData::new(&chat_details, session_type);

        let options = options.resolved(&self.config.current().client);
        let chat_client = self
            .clients
            .get_cached_client(&options, &log_meta_data)
            .map_err(ChatSessionError::Client)?;

        let controller = self
            .controllers
            .create_controller(ControllerArgs {
                session_type,
                chat_details,
                chat_client,
                transport_manager,
                log_meta_data: log_meta_data.clone(),
            })
            .map_err(ChatSessionError::Controller)?;

        Ok((controller, log_meta_data))
    }
}

impl SessionFactory for PersistentSessionFactory {
    fn create_chat_session(
        &self,
        session_type: SessionType,
        input: ChatDetailsInput,
        options: &ClientOptions,
        transport_manager: Option<Arc<dyn TransportManager>>,
    ) -> Result<Session> {
        let (controller, log_meta) =
            self.create_controller(session_type, input, options, transport_manager)?;

        let session = match session_type {
            SessionType::Agent => Session::Agent(AgentSession::new(controller, &self.telemetry)),
            SessionType::Customer => {
                Session::Customer(CustomerSession::new(controller, &self.telemetry))
            }
        };

        let level = self.config.current().logger.advanced_log_writer;
        log_advanced(level, "Created chat session", &log_meta);

        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GlobalConfig;
    use crate::testing::{MockClientFactory, MockControllerFactory};

    fn factory() -> (
        PersistentSessionFactory,
        Arc<MockClientFactory>,
        Arc<MockControllerFactory>,
    ) {
        let clients = Arc::new(MockClientFactory::new());
        let controllers = Arc::new(MockControllerFactory::new());
        let factory = PersistentSessionFactory::new(
            clients.clone(),
            controllers.clone(),
            Arc::new(TelemetryService::default()),
            SharedConfig::new(GlobalConfig::default()),
        );
        (factory, clients, controllers)
    }

    #[test]
    fn test_invalid_details_build_nothing() {
        let (factory, clients, controllers) = factory();
        let result = factory.create_chat_session(
            SessionType::Agent,
            ChatDetailsInput::new("c", "p"),
            &ClientOptions::default(),
            None,
        );

        assert!(result.unwrap_err().is_invalid_argument());
        assert_eq!(clients.created_count(), 0);
        assert_eq!(controllers.created_count(), 0);
    }

    #[test]
    fn test_controller_failure_is_wrapped() {
        let factory = PersistentSessionFactory::new(
            Arc::new(MockClientFactory::new()),
            Arc::new(MockControllerFactory::failing("boom")),
            Arc::new(TelemetryService::default()),
            SharedConfig::default(),
        );
        let err = factory
            .create_chat_session(
                SessionType::Customer,
                ChatDetailsInput::new("c", "p").with_participant_token("t"),
                &ClientOptions::default(),
                None,
            )
            .unwrap_err();

        assert!(matches!(err, ChatSessionError::Controller(_)));
    }
}
