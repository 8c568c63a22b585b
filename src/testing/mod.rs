// ABOUTME: Test doubles for the session layer: recording controllers, clients, and transports.
// ABOUTME: Exported so applications can exercise ChatRuntime without a live chat service.

pub mod mock_client;
pub mod mock_controller;

pub use mock_client::{MockChatClient, MockClientFactory, MockTransport};
pub use mock_controller::{ControllerCall, MockController, MockControllerFactory};
