// ABOUTME: Mock protocol clients and transport manager.
// ABOUTME: Count constructions and config applications so tests can assert on reuse.

use crate::client::{ChatClient, ChatClientFactory, ClientOptions};
use crate::config::GlobalConfig;
use crate::transport::TransportManager;
use crate::types::LogMetaData;
use anyhow::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug)]
pub struct MockChatClient {
    pub id: usize,
    options: ClientOptions,
}

impl ChatClient for MockChatClient {
    fn options(&self) -> &ClientOptions {
        &self.options
    }
}

/// Client factory that hands out numbered [`MockChatClient`]s
#[derive(Debug, Default)]
pub struct MockClientFactory {
    created: AtomicUsize,
    failure: Option<String>,
}

impl MockClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory whose every construction fails with `message`
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            created: AtomicUsize::new(0),
            failure: Some(message.into()),
        }
    }

    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl ChatClientFactory for MockClientFactory {
    fn create_client(
        &self,
        options: &ClientOptions,
        _log_meta: &LogMetaData,
    ) -> Result<Arc<dyn ChatClient>> {
        if let Some(message) = &self.failure {
            anyhow::bail!("{}", message);
        }
        let id = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Arc::new(MockChatClient {
            id,
            options: options.clone(),
        }))
    }
}

/// Transport manager that remembers the configs pushed to it
#[derive(Debug, Default)]
pub struct MockTransport {
    applied: Mutex<Vec<GlobalConfig>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_applied(&self) -> MutexGuard<'_, Vec<GlobalConfig>> {
        self.applied.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn applied_count(&self) -> usize {
        self.lock_applied().len()
    }

    pub fn last_applied(&self) -> Option<GlobalConfig> {
        self.lock_applied().last().cloned()
    }
}

impl TransportManager for MockTransport {
    fn apply_global_config(&self, config: &GlobalConfig) {
        self.lock_applied().push(config.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_survives_poisoned_lock() {
        let transport = MockTransport::new();
        let _ = std::thread::scope(|scope| {
            scope
                .spawn(|| {
                    let _held = transport.applied.lock().unwrap();
                    panic!("apply panicked");
                })
                .join()
        });

        transport.apply_global_config(&GlobalConfig::default());
        assert_eq!(transport.applied_count(), 1);
        assert_eq!(transport.last_applied(), Some(GlobalConfig::default()));
    }
}
