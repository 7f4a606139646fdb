//! Key/value configuration service.

use serde_json::Value;
use std::time::Duration;

use crate::cache::TtlCache;

/// Explicit configuration store handed to whoever needs it
pub trait ConfigService: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;

    /// Store `value`; with `ttl = None` it lives until overwritten
    fn set(&self, key: &str, value: Value, ttl: Option<Duration>);

    fn remove(&self, key: &str);
}

/// Process-local [`ConfigService`]
pub struct InMemoryConfigService {
    entries: TtlCache<String, Value>,
}

impl InMemoryConfigService {
    pub fn new() -> Self {
        // Every write passes its own TTL, the default is never used.
        Self {
            entries: TtlCache::new(Duration::ZERO),
        }
    }
}

impl Default for InMemoryConfigService {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigService for InMemoryConfigService {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(&key.to_string())
    }

    fn set(&self, key: &str, value: Value, ttl: Option<Duration>) {
        self.entries.insert_with_ttl(key.to_string(), value, ttl);
    }

    fn remove(&self, key: &str) {
        self.entries.remove(&key.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_then_get() {
        let service = InMemoryConfigService::new();
        assert_eq!(service.get("maxSpinsPerDay"), None);

        service.set("maxSpinsPerDay", json!(12), None);
        assert_eq!(service.get("maxSpinsPerDay"), Some(json!(12)));

        service.remove("maxSpinsPerDay");
        assert_eq!(service.get("maxSpinsPerDay"), None);
    }

    #[test]
    fn test_ttl_is_honoured() {
        let service = InMemoryConfigService::new();
        service.set("stale", json!(true), Some(Duration::ZERO));
        assert_eq!(service.get("stale"), None);
    }
}
