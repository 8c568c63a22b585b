// ABOUTME: Protocol client seam plus the cache that shares one client per option set.
// ABOUTME: Sessions created with equal options reuse the same client instance.

use crate::config::ClientConfig;
use crate::types::LogMetaData;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, RwLock};

/// Options selecting which chat service endpoint a client talks to
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl ClientOptions {
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Fill unset fields from the global client defaults
    pub fn resolved(&self, defaults: &ClientConfig) -> Self {
        Self {
            region: self
                .region
                .clone()
                .or_else(|| Some(defaults.region.clone())),
            endpoint: self.endpoint.clone().or_else(|| defaults.endpoint.clone()),
        }
    }
}

/// Chat protocol client. Performs the network I/O on behalf of a controller.
pub trait ChatClient: Send + Sync + Debug {
    fn options(&self) -> &ClientOptions;
}

/// Builds protocol clients; wrapped by [`ClientCache`]
pub trait ChatClientFactory: Send + Sync {
    fn create_client(
        &self,
        options: &ClientOptions,
        log_meta: &LogMetaData,
    ) -> Result<Arc<dyn ChatClient>>;
}

/// Read-mostly cache of clients keyed by their options
pub struct ClientCache {
    factory: Arc<dyn ChatClientFactory>,
    clients: RwLock<HashMap<ClientOptions, Arc<dyn ChatClient>>>,
}

impl ClientCache {
    pub fn new(factory: Arc<dyn ChatClientFactory>) -> Self {
        Self {
            factory,
            clients: RwLock::new(HashMap::new()),
        }
    }

    /// Return the client for `options`, creating it on first use.
    ///
    /// The factory runs without the cache lock held. When two callers race on
    /// the same options both may build a client, but only the first one stored
    /// is kept and returned to everyone.
    pub fn get_cached_client(
        &self,
        options: &ClientOptions,
        log_meta: &LogMetaData,
    ) -> Result<Arc<dyn ChatClient>> {
        if let Some(client) = self
            .clients
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(options)
        {
            return Ok(Arc::clone(client));
        }

        let created = self.factory.create_client(options, log_meta)?;

        let mut clients = self.clients.write().unwrap_or_else(|e| e.into_inner());
        let client = clients.entry(options.clone()).or_insert_with(|| {
            tracing::debug!(
                region = options.region.as_deref().unwrap_or_default(),
                contact_id = %log_meta.contact_id,
                "Created chat client"
            );
            created
        });
        Ok(Arc::clone(client))
    }

    pub fn len(&self) -> usize {
        self.clients.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockClientFactory;
    use crate::types::SessionType;
    use std::sync::{Barrier, Mutex, OnceLock, Weak};

    fn log_meta() -> LogMetaData {
        LogMetaData {
            contact_id: "c".to_string(),
            participant_id: "p".to_string(),
            session_type: SessionType::Agent,
        }
    }

    #[test]
    fn test_same_options_share_client() {
        let factory = Arc::new(MockClientFactory::new());
        let cache = ClientCache::new(factory.clone());
        let options = ClientOptions::default().with_region("us-east-1");

        let first = cache.get_cached_client(&options, &log_meta()).unwrap();
        let second = cache.get_cached_client(&options, &log_meta()).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(factory.created_count(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_different_options_get_distinct_clients() {
        let factory = Arc::new(MockClientFactory::new());
        let cache = ClientCache::new(factory.clone());

        let east = cache
            .get_cached_client(&ClientOptions::default().with_region("us-east-1"), &log_meta())
            .unwrap();
        let west = cache
            .get_cached_client(&ClientOptions::default().with_region("us-west-2"), &log_meta())
            .unwrap();

        assert!(!Arc::ptr_eq(&east, &west));
        assert_eq!(factory.created_count(), 2);
    }

    #[test]
    fn test_factory_failure_is_not_cached() {
        let factory = Arc::new(MockClientFactory::failing("no credentials"));
        let cache = ClientCache::new(factory.clone());

        let result = cache.get_cached_client(&ClientOptions::default(), &log_meta());
        assert!(result.is_err());
        assert!(cache.is_empty());
    }

    /// Looks at the cache it belongs to while building a client
    struct ReentrantFactory {
        cache: OnceLock<Weak<ClientCache>>,
        inner: MockClientFactory,
        seen_len: Mutex<Option<usize>>,
    }

    impl ChatClientFactory for ReentrantFactory {
        fn create_client(
            &self,
            options: &ClientOptions,
            log_meta: &LogMetaData,
        ) -> Result<Arc<dyn ChatClient>> {
            if let Some(cache) = self.cache.get().and_then(Weak::upgrade) {
                *self.seen_len.lock().unwrap() = Some(cache.len());
            }
            self.inner.create_client(options, log_meta)
        }
    }

    #[test]
    fn test_cache_is_readable_while_factory_runs() {
        let factory = Arc::new(ReentrantFactory {
            cache: OnceLock::new(),
            inner: MockClientFactory::new(),
            seen_len: Mutex::new(None),
        });
        let cache = Arc::new(ClientCache::new(factory.clone()));
        factory.cache.set(Arc::downgrade(&cache)).unwrap();

        cache
            .get_cached_client(&ClientOptions::default(), &log_meta())
            .unwrap();

        assert_eq!(*factory.seen_len.lock().unwrap(), Some(0));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_concurrent_callers_converge_on_one_client() {
        let factory = Arc::new(MockClientFactory::new());
        let cache = ClientCache::new(factory.clone());
        let options = ClientOptions::default().with_region("us-east-1");
        let barrier = Barrier::new(8);

        let clients: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        cache.get_cached_client(&options, &log_meta()).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(clients.iter().all(|c| Arc::ptr_eq(c, &clients[0])));
        assert!(factory.created_count() >= 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_resolved_fills_region_from_defaults() {
        let defaults = ClientConfig::default();
        let resolved = ClientOptions::default().resolved(&defaults);
        assert_eq!(resolved.region.as_deref(), Some("us-west-2"));

        let explicit = ClientOptions::default()
            .with_region("eu-west-2")
            .resolved(&defaults);
        assert_eq!(explicit.region.as_deref(), Some("eu-west-2"));
    }
}
