//! Redis 存储
//!
//! 单条命令足够的操作直接发命令；多步修改（提交、撤销会话、计数减一并清理）
//! 以 Lua 脚本执行，在服务端是一个不可分割的单元。每条命令都受 `command_timeout_ms` 约束。
//!
//! 撤销会话的脚本会在脚本内部拼出单词计数键，因此不兼容 Redis Cluster 的键声明要求。

use async_trait::async_trait;
use once_cell::sync::Lazy;
use redis::{Client, RedisResult, Script, aio::ConnectionManager};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::config::StoreConfig;
use crate::error::{AppError, Result};
use crate::models::WordCount;
use crate::storage::keys::{ESCAPE, KeySpace};
use crate::storage::repository::{
    LeaderboardRepository, RateLimitRepository, SessionRemoval, StoreHealth,
    SubmissionRepository, TallyRepository,
};

const DELETE_CHUNK: usize = 500;

/// KEYS: session, word count, index. ARGV: word.
static SUBMIT: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r"
local len = redis.call('RPUSH', KEYS[1], ARGV[1])
local count = redis.call('INCR', KEYS[2])
redis.call('ZADD', KEYS[3], count, ARGV[1])
return {len, count}
",
    )
});

/// KEYS: session, index. ARGV: word key prefix, escape marker.
static REMOVE_SESSION: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r"
local function count_key(word)
  if word == 'sorted' or string.sub(word, 1, 1) == ARGV[2] then
    return ARGV[1] .. ARGV[2] .. word
  end
  return ARGV[1] .. word
end

local words = redis.call('LRANGE', KEYS[1], 0, -1)
local pruned = {}
local underflows = {}
for _, word in ipairs(words) do
  local key = count_key(word)
  local count = redis.call('DECR', key)
  if count <= 0 then
    redis.call('DEL', key)
    redis.call('ZREM', KEYS[2], word)
    if count < 0 then
      table.insert(underflows, word)
    else
      table.insert(pruned, word)
    end
  else
    redis.call('ZADD', KEYS[2], count, word)
  end
end
redis.call('DEL', KEYS[1])
return {words, pruned, underflows}
",
    )
});

/// KEYS: word count, index. ARGV: word.
static INCREMENT: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r"
local count = redis.call('INCR', KEYS[1])
redis.call('ZADD', KEYS[2], count, ARGV[1])
return count
",
    )
});

/// KEYS: word count, index. ARGV: word.
static DECREMENT: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r"
local count = redis.call('DECR', KEYS[1])
if count <= 0 then
  redis.call('DEL', KEYS[1])
  redis.call('ZREM', KEYS[2], ARGV[1])
else
  redis.call('ZADD', KEYS[2], count, ARGV[1])
end
return count
",
    )
});

/// KEYS: index. ARGV: limit.
/// Returns the top `limit` members plus every member tied with the last one.
static TOP: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r"
local top = redis.call('ZREVRANGE', KEYS[1], 0, tonumber(ARGV[1]) - 1, 'WITHSCORES')
if #top == 0 then
  return {}
end
return redis.call('ZREVRANGEBYSCORE', KEYS[1], '+inf', top[#top], 'WITHSCORES')
",
    )
});

/// Redis 存储
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    keys: KeySpace,
    command_timeout: Duration,
}

impl RedisStore {
    /// 连接 Redis
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str())?;
        let connect_timeout = Duration::from_millis(config.connect_timeout_ms);

        let conn = tokio::time::timeout(connect_timeout, client.get_connection_manager())
            .await
            .map_err(|_| {
                AppError::StoreUnavailable(format!(
                    "timed out after {}ms connecting to redis",
                    config.connect_timeout_ms
                ))
            })??;

        info!(namespace = %config.namespace, "Redis connection manager initialized");

        Ok(Self {
            conn,
            keys: KeySpace::new(&config.namespace),
            command_timeout: Duration::from_millis(config.command_timeout_ms),
        })
    }

    async fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = RedisResult<T>>,
    {
        match tokio::time::timeout(self.command_timeout, fut).await {
            Ok(result) => result.map_err(AppError::from),
            Err(_) => Err(AppError::StoreUnavailable(format!(
                "redis command timed out after {}ms",
                self.command_timeout.as_millis()
            ))),
        }
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("SCAN");
        cmd.cursor_arg(0).arg("MATCH").arg(pattern).arg("COUNT").arg(200);
        let mut iter: redis::AsyncIter<'_, String> = self.run(cmd.iter_async(&mut conn)).await?;

        let mut keys = Vec::new();
        loop {
            match tokio::time::timeout(self.command_timeout, iter.next_item()).await {
                Ok(Some(key)) => keys.push(key),
                Ok(None) => break,
                Err(_) => {
                    return Err(AppError::StoreUnavailable(format!(
                        "redis scan of {pattern} timed out"
                    )));
                }
            }
        }
        Ok(keys)
    }
}

#[async_trait]
impl SubmissionRepository for RedisStore {
    async fn append(&self, session_id: &str, word: &str) -> Result<u64> {
        let mut conn = self.conn.clone();
        let key = self.keys.session(session_id);
        let mut cmd = redis::cmd("RPUSH");
        cmd.arg(&key).arg(word);
        self.run(cmd.query_async(&mut conn)).await
    }

    async fn words(&self, session_id: &str) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("LRANGE");
        cmd.arg(self.keys.session(session_id)).arg(0).arg(-1);
        self.run(cmd.query_async(&mut conn)).await
    }

    async fn len(&self, session_id: &str) -> Result<u64> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("LLEN");
        cmd.arg(self.keys.session(session_id));
        self.run(cmd.query_async(&mut conn)).await
    }

    async fn take(&self, session_id: &str) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let key = self.keys.session(session_id);
        let mut pipe = redis::pipe();
        pipe.atomic().lrange(&key, 0, -1).del(&key);
        let (words, _deleted): (Vec<String>, u64) = self.run(pipe.query_async(&mut conn)).await?;
        Ok(words)
    }

    async fn session_ids(&self) -> Result<Vec<String>> {
        let prefix = self.keys.session_prefix();
        let keys = self.scan(&format!("{prefix}*")).await?;
        Ok(keys
            .into_iter()
            .filter_map(|key| key.strip_prefix(&prefix).map(str::to_string))
            .collect())
    }
}

#[async_trait]
impl LeaderboardRepository for RedisStore {
    async fn increment(&self, word: &str) -> Result<i64> {
        let mut conn = self.conn.clone();
        let mut invocation = INCREMENT.prepare_invoke();
        invocation
            .key(self.keys.word(word))
            .key(self.keys.sorted())
            .arg(word);
        self.run(invocation.invoke_async(&mut conn)).await
    }

    async fn decrement(&self, word: &str) -> Result<i64> {
        let mut conn = self.conn.clone();
        let mut invocation = DECREMENT.prepare_invoke();
        invocation
            .key(self.keys.word(word))
            .key(self.keys.sorted())
            .arg(word);
        self.run(invocation.invoke_async(&mut conn)).await
    }

    async fn count(&self, word: &str) -> Result<Option<i64>> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("GET");
        cmd.arg(self.keys.word(word));
        self.run(cmd.query_async(&mut conn)).await
    }

    async fn top(&self, limit: usize) -> Result<Vec<WordCount>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.clone();
        let mut invocation = TOP.prepare_invoke();
        // Lua numbers are doubles
        invocation
            .key(self.keys.sorted())
            .arg(limit.min(u32::MAX as usize));
        let rows: Vec<(String, i64)> = self.run(invocation.invoke_async(&mut conn)).await?;

        Ok(rows
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .map(|(word, count)| WordCount::new(word, count as u64))
            .collect())
    }
}

#[async_trait]
impl TallyRepository for RedisStore {
    async fn submit(&self, session_id: &str, word: &str) -> Result<(u64, i64)> {
        let mut conn = self.conn.clone();
        let mut invocation = SUBMIT.prepare_invoke();
        invocation
            .key(self.keys.session(session_id))
            .key(self.keys.word(word))
            .key(self.keys.sorted())
            .arg(word);
        self.run(invocation.invoke_async(&mut conn)).await
    }

    async fn remove_session(&self, session_id: &str) -> Result<SessionRemoval> {
        let mut conn = self.conn.clone();
        let mut invocation = REMOVE_SESSION.prepare_invoke();
        invocation
            .key(self.keys.session(session_id))
            .key(self.keys.sorted())
            .arg(self.keys.word_prefix())
            .arg(ESCAPE);
        let (words, pruned, underflows): (Vec<String>, Vec<String>, Vec<String>) =
            self.run(invocation.invoke_async(&mut conn)).await?;

        Ok(SessionRemoval {
            words,
            pruned,
            underflows,
        })
    }

    async fn clear(&self) -> Result<u64> {
        let mut keys = Vec::new();
        for pattern in self.keys.tally_patterns() {
            keys.extend(self.scan(&pattern).await?);
        }
        debug!(keys = keys.len(), "clearing tally keys");

        let mut removed = 0u64;
        for chunk in keys.chunks(DELETE_CHUNK) {
            let mut conn = self.conn.clone();
            let mut cmd = redis::cmd("DEL");
            cmd.arg(chunk);
            let deleted: u64 = self.run(cmd.query_async(&mut conn)).await?;
            removed += deleted;
        }
        Ok(removed)
    }
}

#[async_trait]
impl RateLimitRepository for RedisStore {
    async fn incr(&self, key: &str) -> Result<u64> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("INCR");
        cmd.arg(self.keys.rate_limit(key));
        self.run(cmd.query_async(&mut conn)).await
    }

    async fn expire(&self, key: &str, window: Duration) -> Result<bool> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("EXPIRE");
        cmd.arg(self.keys.rate_limit(key))
            .arg(window.as_secs());
        self.run(cmd.query_async(&mut conn)).await
    }

    async fn hits(&self, key: &str) -> Result<u64> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("GET");
        cmd.arg(self.keys.rate_limit(key));
        let hits: Option<u64> = self.run(cmd.query_async(&mut conn)).await?;
        Ok(hits.unwrap_or(0))
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("PTTL");
        cmd.arg(self.keys.rate_limit(key));
        // -2: no key, -1: no expiry
        let millis: i64 = self.run(cmd.query_async(&mut conn)).await?;
        Ok(u64::try_from(millis).ok().map(Duration::from_millis))
    }
}

#[async_trait]
impl StoreHealth for RedisStore {
    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let cmd = redis::cmd("PING");
        let _pong: String = self.run(cmd.query_async(&mut conn)).await?;
        Ok(())
    }
}
