use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::debug;

use crate::configurations::EntityCacheConfig;
use crate::entity_parser::{EntityCache, EntityCacheDump, OccurrenceCache, SharedEntityCache};
use crate::errors::*;
use crate::utils::{BotId, EntityName};

/// Provides the occurrence caches of list entities. Caches are identified by
/// bot, entity name and entity hash, so redefining the values of an entity
/// never serves occurrences found with its former values.
pub trait CacheManager: Send + Sync {
    fn get_or_create_cache(
        &self,
        entity_name: &str,
        entity_hash: &str,
        bot_id: &str,
    ) -> Result<SharedEntityCache>;

    fn is_cache_dump(&self, cache: &EntityCache) -> bool {
        cache.is_dump()
    }

    fn load_cache_from_data(
        &self,
        dump: &EntityCacheDump,
        entity_name: &str,
        entity_hash: &str,
        bot_id: &str,
    ) -> Result<SharedEntityCache>;
}

type CacheKey = (BotId, EntityName, String);

/// Keeps one occurrence cache per bot and list entity version in memory
pub struct InMemoryCacheManager {
    config: EntityCacheConfig,
    caches: Mutex<HashMap<CacheKey, SharedEntityCache>>,
}

impl InMemoryCacheManager {
    pub fn new(config: EntityCacheConfig) -> Self {
        Self {
            config,
            caches: Mutex::new(HashMap::new()),
        }
    }

    pub fn nb_caches(&self) -> Result<usize> {
        Ok(self
            .caches
            .lock()
            .map_err(|e| NluError::PoisonedLock(format!("{}", e)))?
            .len())
    }
}

impl CacheManager for InMemoryCacheManager {
    fn get_or_create_cache(
        &self,
        entity_name: &str,
        entity_hash: &str,
        bot_id: &str,
    ) -> Result<SharedEntityCache> {
        let mut caches = self
            .caches
            .lock()
            .map_err(|e| NluError::PoisonedLock(format!("{}", e)))?;
        let capacity = self.config.capacity;
        let cache = caches
            .entry((bot_id.to_string(), entity_name.to_string(), entity_hash.to_string()))
            .or_insert_with(|| {
                debug!("Creating occurrence cache for entity '{}'", entity_name);
                Arc::new(OccurrenceCache::new(entity_name, bot_id, capacity))
            });
        Ok(cache.clone())
    }

    fn load_cache_from_data(
        &self,
        dump: &EntityCacheDump,
        entity_name: &str,
        entity_hash: &str,
        bot_id: &str,
    ) -> Result<SharedEntityCache> {
        debug!(
            "Rehydrating occurrence cache of entity '{}' with {} entries",
            entity_name,
            dump.entries.len()
        );
        let cache = Arc::new(OccurrenceCache::from_dump(
            dump,
            entity_name,
            bot_id,
            self.config.capacity,
        ));
        self.caches
            .lock()
            .map_err(|e| NluError::PoisonedLock(format!("{}", e)))?
            .insert(
                (bot_id.to_string(), entity_name.to_string(), entity_hash.to_string()),
                cache.clone(),
            );
        Ok(cache)
    }
}
