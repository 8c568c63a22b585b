// ABOUTME: Opaque transport manager handle passed through to controllers.
// ABOUTME: Only the global-config hook is called from here; everything else is the controller's.

use crate::config::GlobalConfig;
use std::fmt::Debug;

/// The websocket/transport manager a controller uses to move messages.
///
/// Sessions never inspect it. The runtime calls `apply_global_config` when
/// global configuration changes so the transport can pick up logger settings.
pub trait TransportManager: Send + Sync + Debug {
    fn apply_global_config(&self, _config: &GlobalConfig) {}
}
