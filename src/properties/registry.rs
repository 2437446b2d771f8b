// Property Configuration Registry
//
// Resolves a property identifier to its PMS configuration.
// Resolved configurations are cached with a 60-second TTL.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::properties::{PmsConfig, PropertyRepository, RegistryError};

/// Time-to-live for cached configurations (60 seconds)
const CACHE_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct CachedConfig {
    config: PmsConfig,
    loaded_at: Instant,
}

/// Property Configuration Registry
#[derive(Clone)]
pub struct PropertyRegistry {
    repository: Arc<dyn PropertyRepository>,
    cache: Arc<RwLock<HashMap<Uuid, CachedConfig>>>,
    cache_ttl: Duration,
}

impl PropertyRegistry {
    pub fn new(repository: Arc<dyn PropertyRepository>) -> Self {
        Self::with_ttl(repository, CACHE_TTL)
    }

    pub fn with_ttl(repository: Arc<dyn PropertyRepository>, cache_ttl: Duration) -> Self {
        Self {
            repository,
            cache: Arc::new(RwLock::new(HashMap::new())),
            cache_ttl,
        }
    }

    /// Resolve a property to its PMS configuration
    ///
    /// Missing properties are never cached.
    pub async fn resolve(&self, property_id: Uuid) -> Result<PmsConfig, RegistryError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.get(&property_id) {
                if cached.loaded_at.elapsed() <= self.cache_ttl {
                    return Ok(cached.config.clone());
                }
            }
        }

        tracing::debug!(%property_id, "Loading property configuration");
        let property = self
            .repository
            .find_by_id(property_id)
            .await?
            .ok_or(RegistryError::NotFound(property_id))?;
        let config = PmsConfig::from(property);

        self.cache.write().await.insert(
            property_id,
            CachedConfig {
                config: config.clone(),
                loaded_at: Instant::now(),
            },
        );

        Ok(config)
    }

    /// Drop a cached configuration so the next lookup reloads it
    pub async fn invalidate(&self, property_id: Uuid) {
        self.cache.write().await.remove(&property_id);
    }
}
