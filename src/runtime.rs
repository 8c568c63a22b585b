// ABOUTME: ChatRuntime is the public entrypoint: creates sessions and applies global config.
// ABOUTME: Owns the shared config, telemetry service, session factory, and installed logger handle.

use crate::client::{ChatClientFactory, ClientOptions};
use crate::config::{GlobalConfig, SharedConfig};
use crate::controller::ControllerFactory;
use crate::details::ChatDetailsInput;
use crate::error::{ChatSessionError, Result};
use crate::factory::{PersistentSessionFactory, SessionFactory};
use crate::logging::{self, LoggerHandle};
use crate::session::Session;
use crate::telemetry::TelemetryService;
use crate::transport::TransportManager;
use crate::types::{LogMetaData, SessionType};
use chat_connection::{ConnectionDetailsProvider, ConnectionLifecycleHelper};
use std::sync::{Arc, Mutex};

/// Arguments for [`ChatRuntime::create_session`]
#[derive(Debug, Default)]
pub struct CreateSessionArgs {
    /// `"AGENT"` or `"CUSTOMER"`; AGENT when absent
    pub session_type: Option<String>,
    pub chat_details: ChatDetailsInput,
    pub options: ClientOptions,
    /// Overrides the runtime's transport manager for this session
    pub transport_manager: Option<Arc<dyn TransportManager>>,
    pub disable_telemetry: bool,
}

impl CreateSessionArgs {
    pub fn new(chat_details: ChatDetailsInput) -> Self {
        Self {
            chat_details,
            ..Self::default()
        }
    }

    pub fn with_type(mut self, session_type: impl Into<String>) -> Self {
        self.session_type = Some(session_type.into());
        self
    }

    pub fn with_options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_transport_manager(mut self, transport_manager: Arc<dyn TransportManager>) -> Self {
        self.transport_manager = Some(transport_manager);
        self
    }

    pub fn without_telemetry(mut self) -> Self {
        self.disable_telemetry = true;
        self
    }
}

pub struct ChatRuntime {
    config: SharedConfig,
    telemetry: Arc<TelemetryService>,
    factory: PersistentSessionFactory,
    transport_manager: Option<Arc<dyn TransportManager>>,
    /// Held for the whole of set_global_config so its steps apply as one
    /// unit. Some once this runtime has installed the default logger.
    logger: Mutex<Option<LoggerHandle>>,
}

impl ChatRuntime {
    pub fn builder() -> ChatRuntimeBuilder {
        ChatRuntimeBuilder::default()
    }

    /// Create a session of the requested role.
    ///
    /// An unknown session type fails before any client or controller is
    /// built. Customer sessions initialize telemetry unless disabled.
    pub fn create_session(&self, args: CreateSessionArgs) -> Result<Session> {
        let session_type = match args.session_type.as_deref() {
            Some(raw) => raw.parse::<SessionType>()?,
            None => SessionType::default(),
        };

        if session_type == SessionType::Customer && !args.disable_telemetry {
            self.telemetry.initialize();
        }

        let transport_manager = args
            .transport_manager
            .or_else(|| self.transport_manager.clone());

        self.factory.create_chat_session(
            session_type,
            args.chat_details,
            &args.options,
            transport_manager,
        )
    }

    /// Validate and apply a new global configuration.
    ///
    /// Logger, telemetry and transport are updated together; on a validation
    /// or logger error nothing is changed. Once the default logger is
    /// installed, later calls reload its level.
    pub fn set_global_config(&self, config: GlobalConfig) -> Result<()> {
        let mut logger = self.logger.lock().unwrap_or_else(|e| e.into_inner());

        config.validate().map_err(ChatSessionError::Config)?;
        match logger.as_ref() {
            Some(handle) => handle
                .set_level(config.logger.level)
                .map_err(ChatSessionError::Config)?,
            None => *logger = logging::init(&config.logger).map_err(ChatSessionError::Config)?,
        }

        self.telemetry.update_config(config.telemetry.clone());
        if let Some(transport) = &self.transport_manager {
            transport.apply_global_config(&config);
        }

        tracing::debug!(
            region = %config.client.region,
            stage = %config.client.stage,
            log_level = config.logger.level.as_str(),
            telemetry_enabled = config.telemetry.enabled,
            "Applied global config"
        );
        self.config.replace(config);
        Ok(())
    }

    pub fn config(&self) -> Arc<GlobalConfig> {
        self.config.current()
    }

    pub fn telemetry(&self) -> &TelemetryService {
        &self.telemetry
    }

    pub fn session_factory(&self) -> &PersistentSessionFactory {
        &self.factory
    }

    /// A token refresh helper using the global polling settings, logging
    /// under the session's metadata
    pub fn connection_helper(
        &self,
        provider: Arc<dyn ConnectionDetailsProvider>,
        log_meta: &LogMetaData,
    ) -> ConnectionLifecycleHelper {
        ConnectionLifecycleHelper::new(provider, self.config.current().polling.clone())
            .with_span(log_meta.span("connection_helper"))
    }
}

impl std::fmt::Debug for ChatRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatRuntime")
            .field("config", &self.config.current())
            .field("telemetry_initialized", &self.telemetry.is_initialized())
            .field("clients", &self.factory.client_cache().len())
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
pub struct ChatRuntimeBuilder {
    client_factory: Option<Arc<dyn ChatClientFactory>>,
    controller_factory: Option<Arc<dyn ControllerFactory>>,
    transport_manager: Option<Arc<dyn TransportManager>>,
    config: Option<GlobalConfig>,
}

impl ChatRuntimeBuilder {
    pub fn client_factory(mut self, factory: Arc<dyn ChatClientFactory>) -> Self {
        self.client_factory = Some(factory);
        self
    }

    pub fn controller_factory(mut self, factory: Arc<dyn ControllerFactory>) -> Self {
        self.controller_factory = Some(factory);
        self
    }

    pub fn transport_manager(mut self, transport_manager: Arc<dyn TransportManager>) -> Self {
        self.transport_manager = Some(transport_manager);
        self
    }

    pub fn config(mut self, config: GlobalConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the runtime and apply its initial configuration
    pub fn build(self) -> Result<ChatRuntime> {
        let client_factory = self
            .client_factory
            .ok_or_else(|| ChatSessionError::invalid_argument("a chat client factory is required"))?;
        let controller_factory = self.controller_factory.ok_or_else(|| {
            ChatSessionError::invalid_argument("a chat controller factory is required")
        })?;
        let config = self.config.unwrap_or_default();

        let shared = SharedConfig::new(config.clone());
        let telemetry = Arc::new(TelemetryService::new(config.telemetry.clone()));
        let factory = PersistentSessionFactory::new(
            client_factory,
            controller_factory,
            Arc::clone(&telemetry),
            shared.clone(),
        );

        let runtime = ChatRuntime {
            config: shared,
            telemetry,
            factory,
            transport_manager: self.transport_manager,
            logger: Mutex::new(None),
        };
        runtime.set_global_config(config)?;
        Ok(runtime)
    }
}
