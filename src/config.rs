/*!
 * Memory Configuration
 *
 * Tunable sizing for arenas and the segment pool. Defaults come from
 * [`crate::core::limits`]; overrides come from JSON or the environment.
 *
 * Environment variables:
 * - `NATIVE_MEMORY_ARENA_BLOCK_SIZE`: arena block size in bytes
 * - `NATIVE_MEMORY_POOL_SCALE`: core count the pool capacities scale with
 */

use crate::core::errors::{MemoryError, MemoryResult};
use crate::core::limits::{
    DEFAULT_ARENA_BLOCK_SIZE, POOL_BUCKETS, POOL_HUGE_CAPACITY, POOL_LARGE_BUCKET,
    POOL_LARGE_CAPACITY_PER_CORE, POOL_MAX_BUCKET_CAPACITY, POOL_MEDIUM_BUCKET,
    POOL_MEDIUM_CAPACITY_PER_CORE, POOL_SMALL_BUCKET, POOL_SMALL_CAPACITY_PER_CORE,
};
use serde::{Deserialize, Serialize};
use std::thread;
use tracing::warn;

const ARENA_BLOCK_SIZE_ENV: &str = "NATIVE_MEMORY_ARENA_BLOCK_SIZE";
const POOL_SCALE_ENV: &str = "NATIVE_MEMORY_POOL_SCALE";

// =============================================================================
// Arena
// =============================================================================

/// Arena sizing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Size of each regular block in bytes
    pub block_size: u64,
    /// Cap on bytes reserved across all blocks; `None` is unbounded
    pub limit: Option<u64>,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_ARENA_BLOCK_SIZE,
            limit: None,
        }
    }
}

impl ArenaConfig {
    /// Single preallocated block of `arena_size` bytes, nothing more
    pub const fn bounded(arena_size: u64) -> Self {
        Self {
            block_size: arena_size,
            limit: Some(arena_size),
        }
    }

    pub const fn with_block_size(mut self, block_size: u64) -> Self {
        self.block_size = block_size;
        self
    }

    pub const fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn validate(&self) -> MemoryResult<()> {
        if self.block_size == 0 {
            return Err(MemoryError::invalid_argument("arena block size must be positive"));
        }
        if let Some(limit) = self.limit {
            if limit < self.block_size {
                return Err(MemoryError::invalid_argument(format!(
                    "arena limit {} is smaller than its block size {}",
                    limit, self.block_size
                )));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Pool
// =============================================================================

/// Per-bucket queue capacities of the segment pool
///
/// Entry `b` bounds how many `2^b`-byte blocks bucket `b` retains. Missing
/// entries mean the bucket retains nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub capacities: Vec<usize>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::scaled(available_cores())
    }
}

impl PoolConfig {
    /// Default heuristic for a machine with `cores` cores
    ///
    /// Small blocks get many slots per core, large ones few, and multi-MB
    /// blocks a fixed handful.
    pub fn scaled(cores: usize) -> Self {
        let cores = cores.max(1);
        let capacities = (0..POOL_BUCKETS as u32)
            .map(|bucket| {
                let capacity = if bucket <= POOL_SMALL_BUCKET {
                    POOL_SMALL_CAPACITY_PER_CORE * cores
                } else if bucket <= POOL_MEDIUM_BUCKET {
                    POOL_MEDIUM_CAPACITY_PER_CORE * cores
                } else if bucket <= POOL_LARGE_BUCKET {
                    POOL_LARGE_CAPACITY_PER_CORE * cores
                } else {
                    POOL_HUGE_CAPACITY
                };
                capacity.min(POOL_MAX_BUCKET_CAPACITY)
            })
            .collect();
        Self { capacities }
    }

    /// Same capacity for every bucket
    pub fn uniform(capacity: usize) -> Self {
        Self {
            capacities: vec![capacity; POOL_BUCKETS],
        }
    }

    /// Pool that never retains a block
    pub fn disabled() -> Self {
        Self::uniform(0)
    }

    pub fn with_bucket_capacity(mut self, bucket: u32, capacity: usize) -> Self {
        let index = bucket as usize;
        if index < POOL_BUCKETS {
            if self.capacities.len() <= index {
                self.capacities.resize(index + 1, 0);
            }
            self.capacities[index] = capacity;
        }
        self
    }

    /// Capacity of `bucket`
    #[inline]
    pub fn capacity(&self, bucket: u32) -> usize {
        self.capacities.get(bucket as usize).copied().unwrap_or(0)
    }

    pub fn validate(&self) -> MemoryResult<()> {
        if self.capacities.len() > POOL_BUCKETS {
            return Err(MemoryError::invalid_argument(format!(
                "pool has {} buckets, got {} capacities",
                POOL_BUCKETS,
                self.capacities.len()
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Aggregate
// =============================================================================

/// Complete memory configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub arena: ArenaConfig,
    pub pool: PoolConfig,
}

impl MemoryConfig {
    /// Parse from JSON; omitted fields keep their defaults
    pub fn from_json(json: &str) -> MemoryResult<Self> {
        let config: MemoryConfig = serde_json::from_str(json)
            .map_err(|e| MemoryError::invalid_argument(format!("malformed memory config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> MemoryResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| MemoryError::invalid_argument(format!("config not serializable: {}", e)))
    }

    /// Defaults overridden by environment variables
    ///
    /// Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(cores) = env_number::<usize>(POOL_SCALE_ENV) {
            config.pool = PoolConfig::scaled(cores);
        }
        if let Some(block_size) = env_number::<u64>(ARENA_BLOCK_SIZE_ENV).filter(|&size| size > 0) {
            config.arena.block_size = block_size;
        }
        config
    }

    pub fn validate(&self) -> MemoryResult<()> {
        self.arena.validate()?;
        self.pool.validate()
    }
}

fn available_cores() -> usize {
    thread::available_parallelism().map_or(1, |n| n.get())
}

fn env_number<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = name, value = %raw, "ignoring unparseable environment override");
            None
        }
    }
}
