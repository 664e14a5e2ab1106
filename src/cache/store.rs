//! In-process LRU implementation of [`ValueCache`].
//!
//! One LRU per cache family, each keyed by `(scope, fingerprint)`. Families
//! never compete for capacity, so a burst of article pages cannot evict
//! ticket forms.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use lru::LruCache;
use metrics::counter;
use tracing::debug;

use crate::application::repos::ValueCache;
use crate::util::locks::{read, write};

use super::config::CacheConfig;
use super::keys::{CacheFamily, CacheKey, CacheScope};

const SOURCE: &str = "cache::store";
const METRIC_CACHE_EVICT: &str = "helpgate_cache_evict_total";

type Entries = LruCache<(CacheScope, String), String>;

pub struct LruValueCache {
    families: HashMap<CacheFamily, RwLock<Entries>>,
}

impl LruValueCache {
    pub fn new(config: &CacheConfig) -> Self {
        let families = CacheFamily::ALL
            .into_iter()
            .map(|family| (family, RwLock::new(LruCache::new(config.limit_for(family)))))
            .collect();
        Self { families }
    }

    fn family(&self, family: CacheFamily) -> Option<&RwLock<Entries>> {
        self.families.get(&family)
    }

    /// Number of entries currently held for `family`.
    pub fn len(&self, family: CacheFamily) -> usize {
        self.family(family)
            .map(|entries| read(entries, SOURCE, "len").len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        CacheFamily::ALL
            .into_iter()
            .all(|family| self.len(family) == 0)
    }
}

#[async_trait]
impl ValueCache for LruValueCache {
    async fn get(&self, key: &CacheKey) -> Option<String> {
        let entries = self.family(key.family)?;
        // `LruCache::get` promotes the entry, so even reads take the write lock.
        write(entries, SOURCE, "get")
            .get(&(key.scope, key.fingerprint.clone()))
            .cloned()
    }

    async fn set(&self, key: CacheKey, payload: String) {
        let Some(entries) = self.family(key.family) else {
            return;
        };
        let CacheKey {
            family,
            scope,
            fingerprint,
        } = key;
        let entry = (scope, fingerprint);
        let displaced = write(entries, SOURCE, "set").push(entry.clone(), payload);
        if let Some((evicted, _)) = displaced
            && evicted != entry
        {
            counter!(METRIC_CACHE_EVICT, "family" => family.as_str()).increment(1);
            debug!(family = %family, scope = %evicted.0, "Evicted least recently used entry");
        }
    }

    async fn invalidate(&self, family: CacheFamily, scope: &CacheScope) -> usize {
        let Some(entries) = self.family(family) else {
            return 0;
        };
        let mut entries = write(entries, SOURCE, "invalidate");
        let stale: Vec<_> = entries
            .iter()
            .filter(|((entry_scope, _), _)| entry_scope == scope)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &stale {
            entries.pop(key);
        }
        stale.len()
    }
}
