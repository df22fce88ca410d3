//! 进程内存储
//!
//! 所有状态放在一把互斥锁后面，每个仓储方法在持锁期间完成，
//! 因此与 Redis 脚本一样，每个方法都是不可分割的单元。锁从不跨越 await。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::{Clock, SystemClock};
use crate::error::{AppError, Result};
use crate::models::WordCount;
use crate::storage::repository::{
    LeaderboardRepository, RateLimitRepository, SessionRemoval, StoreHealth,
    SubmissionRepository, TallyRepository,
};

const SWEEP_INTERVAL_SECS: i64 = 1;

#[derive(Debug)]
struct Counter {
    hits: u64,
    expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    sessions: HashMap<String, Vec<String>>,
    counts: HashMap<String, i64>,
    counters: HashMap<String, Counter>,
    next_sweep: Option<DateTime<Utc>>,
}

impl MemoryState {
    fn increment(&mut self, word: &str) -> i64 {
        let count = self.counts.entry(word.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    fn decrement(&mut self, word: &str) -> i64 {
        let next = self.counts.get(word).copied().unwrap_or(0) - 1;
        if next <= 0 {
            self.counts.remove(word);
        } else {
            self.counts.insert(word.to_string(), next);
        }
        next
    }

    /// Drops the counter if its window has elapsed.
    fn evict_expired(&mut self, key: &str, now: DateTime<Utc>) {
        let expired = self
            .counters
            .get(key)
            .and_then(|c| c.expires_at)
            .is_some_and(|at| at <= now);
        if expired {
            self.counters.remove(key);
        }
    }

    /// Drops every elapsed counter, at most once per sweep interval.
    fn sweep_expired(&mut self, now: DateTime<Utc>) {
        if self.next_sweep.is_some_and(|at| at > now) {
            return;
        }
        self.counters
            .retain(|_, c| c.expires_at.is_none_or(|at| at > now));
        self.next_sweep = Some(now + chrono::Duration::seconds(SWEEP_INTERVAL_SECS));
    }
}

/// 进程内存储
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            clock,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubmissionRepository for MemoryStore {
    async fn append(&self, session_id: &str, word: &str) -> Result<u64> {
        let mut state = self.state.lock();
        let words = state.sessions.entry(session_id.to_string()).or_default();
        words.push(word.to_string());
        Ok(words.len() as u64)
    }

    async fn words(&self, session_id: &str) -> Result<Vec<String>> {
        Ok(self
            .state
            .lock()
            .sessions
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn len(&self, session_id: &str) -> Result<u64> {
        Ok(self
            .state
            .lock()
            .sessions
            .get(session_id)
            .map_or(0, |w| w.len() as u64))
    }

    async fn take(&self, session_id: &str) -> Result<Vec<String>> {
        Ok(self
            .state
            .lock()
            .sessions
            .remove(session_id)
            .unwrap_or_default())
    }

    async fn session_ids(&self) -> Result<Vec<String>> {
        Ok(self.state.lock().sessions.keys().cloned().collect())
    }
}

#[async_trait]
impl LeaderboardRepository for MemoryStore {
    async fn increment(&self, word: &str) -> Result<i64> {
        Ok(self.state.lock().increment(word))
    }

    async fn decrement(&self, word: &str) -> Result<i64> {
        Ok(self.state.lock().decrement(word))
    }

    async fn count(&self, word: &str) -> Result<Option<i64>> {
        Ok(self.state.lock().counts.get(word).copied())
    }

    async fn top(&self, limit: usize) -> Result<Vec<WordCount>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        Ok(self
            .state
            .lock()
            .counts
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(word, count)| WordCount::new(word.clone(), *count as u64))
            .collect())
    }
}

#[async_trait]
impl TallyRepository for MemoryStore {
    async fn submit(&self, session_id: &str, word: &str) -> Result<(u64, i64)> {
        let mut state = self.state.lock();
        let words = state.sessions.entry(session_id.to_string()).or_default();
        words.push(word.to_string());
        let session_count = words.len() as u64;
        let word_count = state.increment(word);
        Ok((session_count, word_count))
    }

    async fn remove_session(&self, session_id: &str) -> Result<SessionRemoval> {
        let mut state = self.state.lock();
        let words = state.sessions.remove(session_id).unwrap_or_default();

        let mut removal = SessionRemoval::default();
        for word in &words {
            let next = state.decrement(word);
            if next < 0 {
                removal.underflows.push(word.clone());
            } else if next == 0 {
                removal.pruned.push(word.clone());
            }
        }
        removal.words = words;
        Ok(removal)
    }

    async fn clear(&self) -> Result<u64> {
        let mut state = self.state.lock();
        let removed = state.sessions.len() + state.counts.len();
        state.sessions.clear();
        state.counts.clear();
        Ok(removed as u64)
    }
}

#[async_trait]
impl RateLimitRepository for MemoryStore {
    async fn incr(&self, key: &str) -> Result<u64> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        state.sweep_expired(now);
        state.evict_expired(key, now);
        let counter = state.counters.entry(key.to_string()).or_insert(Counter {
            hits: 0,
            expires_at: None,
        });
        counter.hits += 1;
        Ok(counter.hits)
    }

    async fn expire(&self, key: &str, window: Duration) -> Result<bool> {
        let window = chrono::Duration::from_std(window)
            .map_err(|e| AppError::Internal(format!("window out of range: {e}")))?;
        let now = self.clock.now();
        let mut state = self.state.lock();
        state.evict_expired(key, now);
        match state.counters.get_mut(key) {
            Some(counter) => {
                counter.expires_at = Some(now + window);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn hits(&self, key: &str) -> Result<u64> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        state.evict_expired(key, now);
        Ok(state.counters.get(key).map_or(0, |c| c.hits))
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        state.evict_expired(key, now);
        Ok(state
            .counters
            .get(key)
            .and_then(|c| c.expires_at)
            .and_then(|at| (at - now).to_std().ok()))
    }
}

#[async_trait]
impl StoreHealth for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
