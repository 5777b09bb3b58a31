//! In-memory TTL caches for prepared session JSON and model responses.
//!
//! Entries expire after a fixed TTL; expired entries are dropped on every
//! insert. There is no size bound: the wrapper serves a handful of
//! internal testers and entries live for minutes.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::types::GenerationResponse;

struct CacheEntry<V> {
    value: V,
    inserted_at: DateTime<Utc>,
}

/// A TTL-bounded map safe to share between request handlers.
pub struct TtlCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh value for `key` together with its age.
    pub async fn get(&self, key: &str) -> Option<(V, Duration)> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        let age = Utc::now() - entry.inserted_at;
        if age < self.ttl {
            Some((entry.value.clone(), age))
        } else {
            None
        }
    }

    pub async fn insert(&self, key: String, value: V) {
        let mut entries = self.entries.write().await;
        let now = Utc::now();
        entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: now,
            },
        );
        let ttl = self.ttl;
        entries.retain(|_, e| now - e.inserted_at < ttl);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// JSON prepared through `/prepare-json`, keyed by session id.
#[derive(Debug, Clone)]
pub struct SessionJson {
    pub json: Value,
    /// SHA-256 of the raw JSON text as submitted.
    pub hash: String,
}

pub type SessionCache = TtlCache<SessionJson>;
pub type ResponseCache = TtlCache<GenerationResponse>;

/// Hex SHA-256 digest.
pub fn sha256_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

/// Response cache key for a rendered prompt and its sampling values.
pub fn response_key(model: &str, prompt: &str, temperature: f64, max_length: u32) -> String {
    sha256_hex(&format!("{model}:{prompt}:{temperature}:{max_length}"))
}
