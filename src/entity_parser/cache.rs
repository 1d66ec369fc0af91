use std::fmt;
use std::hash::Hash;
use std::ops::Range;
use std::sync::{Arc, Mutex};

use lru_cache::LruCache;
use serde::de::Deserializer;
use serde::ser::{self, Serializer};
use serde::{Deserialize, Serialize};

use crate::errors::*;
use crate::utils::{BotId, EntityName};

pub struct Cache<K, V>(LruCache<K, V>)
where
    K: Eq + Hash + Clone,
    V: Clone;

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(capacity: usize) -> Self {
        Cache(LruCache::new(capacity))
    }

    pub fn try_cache<F: Fn(&K) -> Result<V>>(&mut self, key: &K, producer: F) -> Result<V> {
        let cached_value = self.0.get_mut(key).cloned();
        if let Some(value) = cached_value {
            return Ok(value);
        }
        let value = producer(key)?;
        self.0.insert(key.clone(), value.clone());
        Ok(value)
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.0.insert(key, value);
    }

    /// Entries from least to most recently used
    pub fn entries(&self) -> Vec<(K, V)> {
        self.0
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMatch {
    /// Canonical value the match resolves to
    pub value: String,
    /// Text of the sentence that matched
    pub source: String,
    pub char_range: Range<usize>,
    pub confidence: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityCacheDump {
    pub entries: Vec<EntityCacheEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityCacheEntry {
    pub key: String,
    pub matches: Vec<EntityMatch>,
}

/// Occurrence cache of a single list entity for a single bot, memoizing the
/// matches found in previously seen sentences
pub struct OccurrenceCache {
    entity_name: EntityName,
    bot_id: BotId,
    cache: Mutex<Cache<String, Vec<EntityMatch>>>,
}

pub type SharedEntityCache = Arc<OccurrenceCache>;

impl OccurrenceCache {
    pub fn new(entity_name: &str, bot_id: &str, capacity: usize) -> Self {
        Self {
            entity_name: entity_name.to_string(),
            bot_id: bot_id.to_string(),
            cache: Mutex::new(Cache::new(capacity)),
        }
    }

    pub fn from_dump(dump: &EntityCacheDump, entity_name: &str, bot_id: &str, capacity: usize) -> Self {
        let mut cache = Cache::new(capacity);
        for entry in dump.entries.iter() {
            cache.insert(entry.key.clone(), entry.matches.clone());
        }
        Self {
            entity_name: entity_name.to_string(),
            bot_id: bot_id.to_string(),
            cache: Mutex::new(cache),
        }
    }

    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    pub fn bot_id(&self) -> &str {
        &self.bot_id
    }

    pub fn try_cache<F>(&self, key: &str, producer: F) -> Result<Vec<EntityMatch>>
    where
        F: Fn(&String) -> Result<Vec<EntityMatch>>,
    {
        self.cache
            .lock()
            .map_err(|e| NluError::PoisonedLock(format!("{}", e)))?
            .try_cache(&key.to_string(), producer)
    }

    pub fn dump(&self) -> Result<EntityCacheDump> {
        let entries = self
            .cache
            .lock()
            .map_err(|e| NluError::PoisonedLock(format!("{}", e)))?
            .entries()
            .into_iter()
            .map(|(key, matches)| EntityCacheEntry { key, matches })
            .collect();
        Ok(EntityCacheDump { entries })
    }

    pub fn len(&self) -> usize {
        self.cache.lock().map(|cache| cache.len()).unwrap_or(0)
    }
}

/// Cache attached to a list entity model: either live, or in the dumped form
/// it takes once a model has been serialized
#[derive(Clone)]
pub enum EntityCache {
    Dump(EntityCacheDump),
    Live(SharedEntityCache),
}

impl EntityCache {
    pub fn is_dump(&self) -> bool {
        match self {
            EntityCache::Dump(_) => true,
            EntityCache::Live(_) => false,
        }
    }
}

impl fmt::Debug for EntityCache {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EntityCache::Dump(dump) => write!(f, "EntityCache::Dump({} entries)", dump.entries.len()),
            EntityCache::Live(cache) => write!(
                f,
                "EntityCache::Live({}/{}, {} entries)",
                cache.bot_id(),
                cache.entity_name(),
                cache.len()
            ),
        }
    }
}

impl Serialize for EntityCache {
    fn serialize<S>(&self, serializer: S) -> ::std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            EntityCache::Dump(dump) => dump.serialize(serializer),
            EntityCache::Live(cache) => cache
                .dump()
                .map_err(|e| ser::Error::custom(format!("{}", e)))?
                .serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for EntityCache {
    fn deserialize<D>(deserializer: D) -> ::std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        EntityCacheDump::deserialize(deserializer).map(EntityCache::Dump)
    }
}
