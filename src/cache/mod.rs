//! Expiring key/value stores for gateway reads.
//!
//! Each data category gets its own store and TTL; a read is served only
//! while `now - stored_at < ttl`. Stale entries are overwritten by the next
//! insert rather than actively evicted.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::types::{ReserveSnapshot, TokenInfo};

struct Entry<V> {
    value: V,
    stored_at: Instant,
}

/// A single-category TTL store.
pub struct TtlStore<V> {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry<V>>>,
}

impl<V: Clone> TtlStore<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.insert_at(key, value, Instant::now());
    }

    pub fn is_live(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.len_at(Instant::now())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().expect("cache lock poisoned").clear();
    }

    pub(crate) fn get_at(&self, key: &str, now: Instant) -> Option<V> {
        let entries = self.entries.lock().expect("cache lock poisoned");
        entries
            .get(key)
            .filter(|e| now.duration_since(e.stored_at) < self.ttl)
            .map(|e| e.value.clone())
    }

    pub(crate) fn insert_at(&self, key: impl Into<String>, value: V, now: Instant) {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        entries.insert(key.into(), Entry { value, stored_at: now });
    }

    pub(crate) fn len_at(&self, now: Instant) -> usize {
        let entries = self.entries.lock().expect("cache lock poisoned");
        entries
            .values()
            .filter(|e| now.duration_since(e.stored_at) < self.ttl)
            .count()
    }
}

/// TTLs per data category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheTtls {
    pub token_info: Duration,
    pub pair_address: Duration,
    pub reserves: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            token_info: Duration::from_secs(300),
            pair_address: Duration::from_secs(600),
            reserves: Duration::from_secs(30),
        }
    }
}

/// One store per data category: token metadata, pair addresses and reserve
/// snapshots. Absent pairs are never cached; a pool can be created at any
/// time, so the not-found case is always re-verified live.
pub struct AnalyzerCache {
    pub token_info: TtlStore<TokenInfo>,
    pub pair_address: TtlStore<Address>,
    pub reserves: TtlStore<ReserveSnapshot>,
}

impl AnalyzerCache {
    pub fn new(ttls: &CacheTtls) -> Self {
        Self {
            token_info: TtlStore::new(ttls.token_info),
            pair_address: TtlStore::new(ttls.pair_address),
            reserves: TtlStore::new(ttls.reserves),
        }
    }

    /// Empty every category.
    pub fn clear(&self) {
        self.token_info.clear();
        self.pair_address.clear();
        self.reserves.clear();
    }

    /// Live entry counts per category.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            token_info: self.token_info.len(),
            pair_address: self.pair_address.len(),
            reserves: self.reserves.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CacheStats {
    pub token_info: usize,
    pub pair_address: usize,
    pub reserves: usize,
}

/// Token-metadata cache key: the lower-cased hex address.
pub fn token_key(token: Address) -> String {
    token.to_string().to_lowercase()
}

/// Pair-address cache key: the unordered pair, canonicalized by sorting.
pub fn pair_key(token_a: Address, token_b: Address) -> String {
    let (lo, hi) = if token_a <= token_b {
        (token_a, token_b)
    } else {
        (token_b, token_a)
    };
    format!("{}-{}", token_key(lo), token_key(hi))
}

/// Reserve cache key: the pool address itself.
pub fn reserves_key(pair: Address) -> String {
    token_key(pair)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_within_ttl() {
        let store: TtlStore<u32> = TtlStore::new(Duration::from_secs(30));
        let t0 = Instant::now();
        store.insert_at("k", 7, t0);
        assert_eq!(store.get_at("k", t0), Some(7));
        assert_eq!(store.get_at("k", t0 + Duration::from_secs(29)), Some(7));
    }

    #[test]
    fn entry_expires_after_ttl() {
        let store: TtlStore<u32> = TtlStore::new(Duration::from_secs(30));
        let t0 = Instant::now();
        store.insert_at("k", 7, t0);
        assert_eq!(store.get_at("k", t0 + Duration::from_secs(30)), None);
        assert_eq!(store.get_at("k", t0 + Duration::from_secs(300)), None);
    }

    #[test]
    fn stale_entry_is_overwritten_by_next_insert() {
        let store: TtlStore<u32> = TtlStore::new(Duration::from_secs(30));
        let t0 = Instant::now();
        store.insert_at("k", 7, t0);
        let t1 = t0 + Duration::from_secs(60);
        store.insert_at("k", 8, t1);
        assert_eq!(store.get_at("k", t1), Some(8));
    }

    #[test]
    fn len_counts_only_live_entries() {
        let store: TtlStore<u32> = TtlStore::new(Duration::from_secs(30));
        let t0 = Instant::now();
        store.insert_at("a", 1, t0);
        store.insert_at("b", 2, t0 + Duration::from_secs(20));
        assert_eq!(store.len_at(t0 + Duration::from_secs(40)), 1);
    }

    #[test]
    fn clear_empties_every_category() {
        let cache = AnalyzerCache::new(&CacheTtls::default());
        cache.pair_address.insert("p", Address::repeat_byte(1));
        cache.reserves.insert(
            "r",
            ReserveSnapshot {
                pair_address: Address::repeat_byte(1),
                token0: Address::repeat_byte(2),
                token1: Address::repeat_byte(3),
                reserve0: Default::default(),
                reserve1: Default::default(),
                block_timestamp: 0,
            },
        );
        assert_eq!(cache.stats().pair_address, 1);
        cache.clear();
        let stats = cache.stats();
        assert_eq!(stats.token_info, 0);
        assert_eq!(stats.pair_address, 0);
        assert_eq!(stats.reserves, 0);
    }

    #[test]
    fn pair_key_is_order_insensitive() {
        let a = Address::repeat_byte(0xaa);
        let b = Address::repeat_byte(0xbb);
        assert_eq!(pair_key(a, b), pair_key(b, a));
    }
}
