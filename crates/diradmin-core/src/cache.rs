// ── Per-entity lazy cache ──
//
// Every account entity keeps one `ObjectCache`. Each category is filled by
// the first read that needs it and stays until the entity is mutated. The
// lock only guards the map itself and is never held across an `.await`.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::debug;

use crate::error::CoreError;

/// Independently cached slices of an entity's server state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum CacheCategory {
    /// `SHOW_USER_CONFIG`
    Config,
    /// `SHOW_USER_USAGE`
    Usage,
    /// `DATABASES`
    Databases,
    /// `ADDITIONAL_DOMAINS`
    Domains,
}

/// Category → decoded response blob.
#[derive(Debug, Default)]
pub struct ObjectCache {
    entries: Mutex<HashMap<CacheCategory, Arc<Value>>>,
}

impl ObjectCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the whole blob for `category`, running `load` on a miss.
    ///
    /// A failed load leaves the category empty so the next call retries.
    pub async fn get_or_load_whole<F, Fut>(
        &self,
        category: CacheCategory,
        load: F,
    ) -> Result<Arc<Value>, CoreError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, CoreError>>,
    {
        if let Some(hit) = self.peek(category) {
            debug!(%category, "cache hit");
            return Ok(hit);
        }

        debug!(%category, "cache miss, loading");
        let value = Arc::new(load().await?);
        self.lock().insert(category, Arc::clone(&value));
        Ok(value)
    }

    /// Return one item of the blob for `category`, loading the blob on a miss.
    ///
    /// `Ok(None)` means the blob loaded but has no such key.
    pub async fn get_or_load<F, Fut>(
        &self,
        category: CacheCategory,
        key: &str,
        load: F,
    ) -> Result<Option<Value>, CoreError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, CoreError>>,
    {
        let whole = self.get_or_load_whole(category, load).await?;
        Ok(whole.get(key).cloned())
    }

    /// Seed a category without a round-trip.
    pub fn store(&self, category: CacheCategory, value: Value) {
        self.lock().insert(category, Arc::new(value));
    }

    /// The cached blob, if present.
    pub fn peek(&self, category: CacheCategory) -> Option<Arc<Value>> {
        self.lock().get(&category).cloned()
    }

    pub fn is_loaded(&self, category: CacheCategory) -> bool {
        self.lock().contains_key(&category)
    }

    /// Drop one category, or everything when `category` is `None`.
    pub fn invalidate(&self, category: Option<CacheCategory>) {
        let mut entries = self.lock();
        match category {
            Some(category) => {
                entries.remove(&category);
            }
            None => entries.clear(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<CacheCategory, Arc<Value>>> {
        self.entries.lock().expect("cache lock poisoned")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn loads_once_per_category() {
        let cache = ObjectCache::new();
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let load = move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(json!({"email": "bob@example.com", "quota": "500"}))
        };

        let email = cache
            .get_or_load(CacheCategory::Config, "email", load)
            .await
            .unwrap();
        let quota = cache
            .get_or_load(CacheCategory::Config, "quota", load)
            .await
            .unwrap();
        let missing = cache
            .get_or_load(CacheCategory::Config, "nope", load)
            .await
            .unwrap();

        assert_eq!(email, Some(json!("bob@example.com")));
        assert_eq!(quota, Some(json!("500")));
        assert_eq!(missing, None);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_load_writes_nothing() {
        let cache = ObjectCache::new();

        let result = cache
            .get_or_load_whole(CacheCategory::Usage, || async {
                Err(CoreError::decode("boom"))
            })
            .await;
        assert!(result.is_err());
        assert!(!cache.is_loaded(CacheCategory::Usage));

        let value = cache
            .get_or_load_whole(CacheCategory::Usage, || async { Ok(json!({"quota": "1"})) })
            .await
            .unwrap();
        assert_eq!(*value, json!({"quota": "1"}));
    }

    #[tokio::test]
    async fn invalidate_single_and_all() {
        let cache = ObjectCache::new();
        cache.store(CacheCategory::Config, json!({}));
        cache.store(CacheCategory::Usage, json!({}));

        cache.invalidate(Some(CacheCategory::Usage));
        assert!(cache.is_loaded(CacheCategory::Config));
        assert!(!cache.is_loaded(CacheCategory::Usage));

        cache.invalidate(None);
        assert!(!cache.is_loaded(CacheCategory::Config));
    }

    #[test]
    fn categories_have_stable_names() {
        assert_eq!(CacheCategory::Config.to_string(), "config");
        assert_eq!(CacheCategory::Databases.as_ref(), "databases");
    }
}
