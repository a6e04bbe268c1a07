// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Memory pooling for reducing allocation churn
//!
//! This module provides a thread-safe pool of vectors for reusing scratch
//! storage across integration steps. The tiled integrator draws every block's
//! tile from it, so once the pool is warm a step performs no per-block
//! allocation.

use log::debug;
use std::sync::{Arc, Mutex, MutexGuard};

/// Configuration for buffer pool behavior
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Initial capacity for each newly allocated buffer
    pub initial_capacity: usize,
    /// Maximum number of buffers to keep in the pool
    pub max_pool_size: usize,
}

impl PoolConfig {
    /// Create a new pool configuration
    pub fn new(initial_capacity: usize, max_pool_size: usize) -> Self {
        PoolConfig {
            initial_capacity,
            max_pool_size,
        }
    }
}

/// Statistics for monitoring pool performance
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    /// Number of times a buffer was successfully borrowed from the pool
    pub hits: usize,
    /// Number of times a new buffer had to be allocated
    pub misses: usize,
    /// Current number of buffers in the pool
    pub pool_size: usize,
    /// Peak number of buffers ever held by the pool
    pub peak_size: usize,
}

impl PoolStats {
    /// Calculate the hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// Lock a pool mutex, recovering the data if a holder panicked
///
/// Buffers and counters stay structurally valid across a panic, so a poisoned
/// lock is still safe to use.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A thread-safe pool of `Vec<T>` buffers
pub struct VecPool<T> {
    pool: Arc<Mutex<Vec<Vec<T>>>>,
    config: PoolConfig,
    stats: Arc<Mutex<PoolStats>>,
}

impl<T: Clone + Default> VecPool<T> {
    /// Create a new pool with the given configuration
    pub fn with_config(config: PoolConfig) -> Self {
        VecPool {
            pool: Arc::new(Mutex::new(Vec::new())),
            config,
            stats: Arc::new(Mutex::new(PoolStats::default())),
        }
    }

    /// Acquire a buffer of exactly `len` default-initialized elements
    ///
    /// If the pool is empty, allocates a new buffer. The buffer is
    /// automatically returned to the pool when the guard is dropped.
    pub fn acquire(&self, len: usize) -> VecGuard<T> {
        // LOCK ORDERING: Acquire pool lock, take buffer, release lock, then update stats
        let (mut buffer, was_hit, pool_len) = {
            let mut pool = lock(&self.pool);
            let was_hit = !pool.is_empty();
            let buf = pool
                .pop()
                .unwrap_or_else(|| Vec::with_capacity(self.config.initial_capacity.max(len)));
            let pool_len = pool.len();
            (buf, was_hit, pool_len)
        };

        buffer.clear();
        buffer.resize(len, T::default());

        {
            let mut stats = lock(&self.stats);
            if was_hit {
                stats.hits += 1;
            } else {
                stats.misses += 1;
                debug!("VecPool: allocating buffer of {} (hit rate: {:.1}%)", len, stats.hit_rate());
            }
            stats.pool_size = pool_len;
        }

        VecGuard {
            buffer: Some(buffer),
            pool: Arc::clone(&self.pool),
            stats: Arc::clone(&self.stats),
            max_pool_size: self.config.max_pool_size,
        }
    }

    /// Get current pool statistics
    pub fn stats(&self) -> PoolStats {
        lock(&self.stats).clone()
    }
}

/// RAII guard for a pooled vector
///
/// When dropped, returns the buffer to the pool for reuse.
pub struct VecGuard<T> {
    buffer: Option<Vec<T>>,
    pool: Arc<Mutex<Vec<Vec<T>>>>,
    stats: Arc<Mutex<PoolStats>>,
    max_pool_size: usize,
}

impl<T> std::ops::Deref for VecGuard<T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        self.buffer.as_deref().unwrap_or(&[])
    }
}

impl<T> std::ops::DerefMut for VecGuard<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.buffer.as_deref_mut().unwrap_or(&mut [])
    }
}

impl<T> Drop for VecGuard<T> {
    fn drop(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            let mut pool = lock(&self.pool);
            if pool.len() < self.max_pool_size {
                pool.push(buffer);

                let mut stats = lock(&self.stats);
                stats.pool_size = pool.len();
                if stats.pool_size > stats.peak_size {
                    stats.peak_size = stats.pool_size;
                }
            }
            // If pool is full, buffer is dropped (deallocated)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool<T: Clone + Default>() -> VecPool<T> {
        VecPool::with_config(PoolConfig::new(16, 8))
    }

    #[test]
    fn test_acquire_has_requested_length() {
        let pool: VecPool<f32> = pool();
        let guard = pool.acquire(10);
        assert_eq!(guard.len(), 10);
        assert!(guard.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_acquire_and_return() {
        let pool: VecPool<u32> = pool();
        {
            let mut guard = pool.acquire(4);
            guard[0] = 42;
        }

        let stats = pool.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.pool_size, 1);
    }

    #[test]
    fn test_reused_buffer_is_reset() {
        let pool: VecPool<u32> = pool();
        {
            let mut guard = pool.acquire(4);
            guard.iter_mut().for_each(|v| *v = 7);
        }
        {
            let guard = pool.acquire(6);
            assert_eq!(guard.len(), 6);
            assert!(guard.iter().all(|&v| v == 0));
        }

        let stats = pool.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate(), 50.0);
    }

    #[test]
    fn test_pool_max_size() {
        let pool: VecPool<u8> = VecPool::with_config(PoolConfig::new(8, 2));
        {
            let _g1 = pool.acquire(1);
            let _g2 = pool.acquire(1);
            let _g3 = pool.acquire(1);
        }

        let stats = pool.stats();
        assert_eq!(stats.pool_size, 2);
        assert_eq!(stats.peak_size, 2);
    }

    #[test]
    fn test_concurrent_access() {
        use std::thread;

        let pool: VecPool<usize> = pool();

        thread::scope(|s| {
            for lane in 0..4 {
                let pool = &pool;
                s.spawn(move || {
                    let mut guard = pool.acquire(2);
                    guard[1] = lane;
                });
            }
        });

        let stats = pool.stats();
        assert_eq!(stats.hits + stats.misses, 4);
        assert!(stats.pool_size >= 1);
    }

    #[test]
    fn test_stats_tracking() {
        let pool: VecPool<u8> = pool();
        { let _ = pool.acquire(1); }
        { let _ = pool.acquire(1); }
        { let _ = pool.acquire(1); }

        let stats = pool.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.pool_size, 1);
        assert_eq!(stats.peak_size, 1);
    }
}
