// ABOUTME: Tests for the persistent session factory
// ABOUTME: Covers role wrapping, controller arguments, client reuse, and input validation

use chat_session::client::ClientOptions;
use chat_session::config::{GlobalConfig, SharedConfig};
use chat_session::testing::{MockClientFactory, MockControllerFactory, MockTransport};
use chat_session::{
    ChatDetailsInput, ChatSessionError, PersistentSessionFactory, SessionFactory, SessionType,
    TelemetryService, TransportManager,
};
use std::sync::Arc;

struct Fixture {
    factory: PersistentSessionFactory,
    clients: Arc<MockClientFactory>,
    controllers: Arc<MockControllerFactory>,
    telemetry: Arc<TelemetryService>,
}

fn fixture() -> Fixture {
    let clients = Arc::new(MockClientFactory::new());
    let controllers = Arc::new(MockControllerFactory::new());
    let telemetry = Arc::new(TelemetryService::default());
    let factory = PersistentSessionFactory::new(
        clients.clone(),
        controllers.clone(),
        telemetry.clone(),
        SharedConfig::new(GlobalConfig::default()),
    );
    Fixture {
        factory,
        clients,
        controllers,
        telemetry,
    }
}

fn details() -> ChatDetailsInput {
    ChatDetailsInput::new("contact-42", "participant-7").with_participant_token("token")
}

#[test]
fn test_agent_type_builds_agent_session() {
    let f = fixture();
    let session = f
        .factory
        .create_chat_session(SessionType::Agent, details(), &ClientOptions::default(), None)
        .unwrap();

    assert_eq!(session.session_type(), SessionType::Agent);
    assert!(session.as_agent().is_some());
    assert!(session.as_customer().is_none());
}

#[test]
fn test_customer_type_builds_customer_session() {
    let f = fixture();
    let session = f
        .factory
        .create_chat_session(SessionType::Customer, details(), &ClientOptions::default(), None)
        .unwrap();

    assert_eq!(session.session_type(), SessionType::Customer);
    assert!(session.as_customer().is_some());
    assert!(session.as_agent().is_none());
}

#[test]
fn test_controller_receives_normalized_args() {
    let f = fixture();
    let transport: Arc<dyn TransportManager> = Arc::new(MockTransport::new());

    f.factory
        .create_chat_session(
            SessionType::Customer,
            details(),
            &ClientOptions::default(),
            Some(transport.clone()),
        )
        .unwrap();

    let controller = f.controllers.last().unwrap();
    let args = controller.args().unwrap();
    assert_eq!(args.session_type, SessionType::Customer);
    assert_eq!(args.chat_details.contact_id, "contact-42");
    assert_eq!(args.chat_details.initial_contact_id, "contact-42");
    assert_eq!(args.log_meta_data.participant_id, "participant-7");
    assert_eq!(args.log_meta_data.session_type, SessionType::Customer);
    assert!(Arc::ptr_eq(args.transport_manager.as_ref().unwrap(), &transport));
    assert_eq!(args.chat_client.options().region.as_deref(), Some("us-west-2"));
}

#[test]
fn test_equal_options_reuse_client_across_sessions() {
    let f = fixture();
    let options = ClientOptions::default().with_region("us-east-1");

    for _ in 0..3 {
        f.factory
            .create_chat_session(SessionType::Agent, details(), &options, None)
            .unwrap();
    }

    assert_eq!(f.clients.created_count(), 1);
    assert_eq!(f.controllers.created_count(), 3);
    assert_eq!(f.factory.client_cache().len(), 1);
}

#[test]
fn test_different_options_get_different_clients() {
    let f = fixture();

    f.factory
        .create_chat_session(
            SessionType::Agent,
            details(),
            &ClientOptions::default().with_region("us-east-1"),
            None,
        )
        .unwrap();
    f.factory
        .create_chat_session(
            SessionType::Agent,
            details(),
            &ClientOptions::default().with_endpoint("https://chat.example.test"),
            None,
        )
        .unwrap();

    assert_eq!(f.clients.created_count(), 2);
}

#[test]
fn test_missing_participant_id_fails_before_construction() {
    let f = fixture();
    let input = ChatDetailsInput {
        contact_id: Some("contact-1".to_string()),
        participant_token: Some("token".to_string()),
        ..ChatDetailsInput::default()
    };

    let err = f
        .factory
        .create_chat_session(SessionType::Agent, input, &ClientOptions::default(), None)
        .unwrap_err();

    assert!(err.is_invalid_argument());
    assert_eq!(f.clients.created_count(), 0);
    assert_eq!(f.controllers.created_count(), 0);
}

#[test]
fn test_client_failure_surfaces_as_client_error() {
    let controllers = Arc::new(MockControllerFactory::new());
    let factory = PersistentSessionFactory::new(
        Arc::new(MockClientFactory::failing("no credentials")),
        controllers.clone(),
        Arc::new(TelemetryService::default()),
        SharedConfig::default(),
    );

    let err = factory
        .create_chat_session(SessionType::Agent, details(), &ClientOptions::default(), None)
        .unwrap_err();

    assert!(matches!(err, ChatSessionError::Client(_)));
    assert!(err.to_string().contains("no credentials"));
    assert_eq!(controllers.created_count(), 0);
}

#[test]
fn test_each_session_records_start_metric() {
    let f = fixture();
    for session_type in SessionType::ALL {
        f.factory
            .create_chat_session(session_type, details(), &ClientOptions::default(), None)
            .unwrap();
    }
    assert_eq!(f.telemetry.pending_count(), 2);
}
