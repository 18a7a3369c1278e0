//! Cache engine configuration.

use serde::Deserialize;

const DEFAULT_TTL_SECONDS: u64 = 300;
const DEFAULT_OP_TIMEOUT_MS: u64 = 50;

/// Knobs for the cache engine, deserializable from the host application's
/// configuration tree.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Master switch; when false every read bypasses the cache and writes
    /// skip invalidation entirely.
    pub enabled: bool,
    /// Safety-net TTL on every cache entry. Bounds the staleness window
    /// when an invalidation is dropped or fails.
    pub ttl_seconds: u64,
    /// Per-call timeout on cache store operations, kept well below typical
    /// request deadlines so a degraded cache never becomes the slow path.
    pub op_timeout_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: DEFAULT_TTL_SECONDS,
            op_timeout_ms: DEFAULT_OP_TIMEOUT_MS,
        }
    }
}

impl CacheConfig {
    pub fn op_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.op_timeout_ms)
    }
}
