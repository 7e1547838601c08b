//! 列表存储模块
//!
//! 设备位置索引和投递账本都依赖一个以"命名列表"为单位的远程存储，
//! 只需要 push / remove / range 三个操作。这里抽象为 `ListStore` trait，
//! 并提供 Redis 实现和内存实现（本地开发与测试使用）。

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use redis::Client;
use redis::aio::MultiplexedConnection;
use tracing::{debug, info, instrument};

use crate::config::RedisConfig;
use crate::error::{Result, StoreError};

/// 命名列表存储
///
/// 语义与 Redis 列表一致：`push` 插入到表头，`remove` 删除前 `count` 个匹配项，
/// `range` 返回完整列表快照。
#[async_trait]
pub trait ListStore: Send + Sync {
    /// 插入单个值
    async fn push(&self, key: &str, value: &str) -> Result<()>;

    /// 删除最多 `count` 个等于 `value` 的元素，`count` 为 0 时删除全部，返回实际删除数量
    async fn remove(&self, key: &str, count: usize, value: &str) -> Result<usize>;

    /// 读取完整列表
    async fn range(&self, key: &str) -> Result<Vec<String>>;
}

// ---------------------------------------------------------------------------
// Redis 实现
// ---------------------------------------------------------------------------

/// 基于 Redis 列表的存储
#[derive(Clone)]
pub struct RedisListStore {
    client: Client,
}

impl RedisListStore {
    /// 创建 Redis 客户端
    pub fn new(config: &RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str())?;
        info!(url = %config.url, "Redis client created");
        Ok(Self { client })
    }

    /// 获取连接
    async fn get_conn(&self) -> Result<MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(StoreError::from)
    }

    /// 健康检查
    pub async fn health_check(&self) -> Result<()> {
        let mut conn = self.get_conn().await?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map(|_| ())
            .map_err(StoreError::from)
    }
}

#[async_trait]
impl ListStore for RedisListStore {
    #[instrument(skip(self))]
    async fn push(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.get_conn().await?;
        let _: i64 = redis::cmd("LPUSH")
            .arg(key)
            .arg(value)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove(&self, key: &str, count: usize, value: &str) -> Result<usize> {
        let mut conn = self.get_conn().await?;
        let removed: i64 = redis::cmd("LREM")
            .arg(key)
            .arg(count)
            .arg(value)
            .query_async(&mut conn)
            .await?;
        Ok(removed.max(0) as usize)
    }

    #[instrument(skip(self))]
    async fn range(&self, key: &str) -> Result<Vec<String>> {
        let mut conn = self.get_conn().await?;
        let values: Vec<String> = redis::cmd("LRANGE")
            .arg(key)
            .arg(0)
            .arg(-1)
            .query_async(&mut conn)
            .await?;
        Ok(values)
    }
}

// ---------------------------------------------------------------------------
// 内存实现
// ---------------------------------------------------------------------------

/// 进程内列表存储
///
/// 与 Redis 实现保持相同的列表语义。`set_offline(true)` 之后所有操作返回
/// `StoreError::Unavailable`，用于模拟存储故障。
#[derive(Clone, Default)]
pub struct InMemoryListStore {
    lists: Arc<Mutex<HashMap<String, VecDeque<String>>>>,
    offline: Arc<AtomicBool>,
}

impl InMemoryListStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 切换存储的可用状态
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store is offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ListStore for InMemoryListStore {
    async fn push(&self, key: &str, value: &str) -> Result<()> {
        self.ensure_online()?;
        self.lists
            .lock()
            .entry(key.to_string())
            .or_default()
            .push_front(value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str, count: usize, value: &str) -> Result<usize> {
        self.ensure_online()?;
        let mut lists = self.lists.lock();
        let Some(list) = lists.get_mut(key) else {
            return Ok(0);
        };

        let limit = if count == 0 { usize::MAX } else { count };
        let mut removed = 0;
        while removed < limit {
            match list.iter().position(|v| v == value) {
                Some(idx) => {
                    list.remove(idx);
                    removed += 1;
                }
                None => break,
            }
        }

        if list.is_empty() {
            lists.remove(key);
        }
        debug!(key, removed, "removed list values");
        Ok(removed)
    }

    async fn range(&self, key: &str) -> Result<Vec<String>> {
        self.ensure_online()?;
        Ok(self
            .lists
            .lock()
            .get(key)
            .map(|list| list.iter().cloned().collect())
            .unwrap_or_default())
    }
}

/// 存储键生成器
pub struct StoreKey;

impl StoreKey {
    /// 某个地理格子内的设备列表
    pub fn location(cell: &str) -> String {
        format!("location:{}", cell)
    }

    /// 某条通知已投递的设备列表
    pub fn delivered(notification_id: &str) -> String {
        format!("notification-{}", notification_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_key_generation() {
        assert_eq!(StoreKey::location("9q8yy"), "location:9q8yy");
        assert_eq!(StoreKey::delivered("42"), "notification-42");
    }

    #[tokio::test]
    async fn test_in_memory_push_and_range() {
        let store = InMemoryListStore::new();
        store.push("k", "a").await.unwrap();
        store.push("k", "b").await.unwrap();

        // LPUSH 语义：后插入的在前
        assert_eq!(store.range("k").await.unwrap(), vec!["b", "a"]);
        assert!(store.range("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_in_memory_remove_respects_count() {
        let store = InMemoryListStore::new();
        for v in ["x", "y", "x", "x"] {
            store.push("k", v).await.unwrap();
        }

        assert_eq!(store.remove("k", 1, "x").await.unwrap(), 1);
        assert_eq!(store.range("k").await.unwrap().iter().filter(|v| *v == "x").count(), 2);

        assert_eq!(store.remove("k", 5, "x").await.unwrap(), 2);
        assert_eq!(store.range("k").await.unwrap(), vec!["y"]);

        // 不存在的值不算错误
        assert_eq!(store.remove("k", 1, "z").await.unwrap(), 0);
        assert_eq!(store.remove("missing", 1, "z").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_in_memory_remove_zero_count_removes_all() {
        let store = InMemoryListStore::new();
        for v in ["x", "y", "x", "x"] {
            store.push("k", v).await.unwrap();
        }

        // 与 LREM key 0 value 一致
        assert_eq!(store.remove("k", 0, "x").await.unwrap(), 3);
        assert_eq!(store.range("k").await.unwrap(), vec!["y"]);
    }

    #[test]
    fn test_in_memory_clones_share_lists() {
        let store = InMemoryListStore::new();
        let clone = store.clone();

        tokio_test::block_on(async {
            store.push("k", "v").await.unwrap();
            assert_eq!(clone.range("k").await.unwrap(), vec!["v"]);

            clone.set_offline(true);
            assert!(store.range("k").await.is_err());
        });
    }

    #[tokio::test]
    async fn test_in_memory_offline() {
        let store = InMemoryListStore::new();
        store.set_offline(true);

        let err = store.range("k").await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(store.push("k", "v").await.is_err());

        store.set_offline(false);
        assert!(store.push("k", "v").await.is_ok());
    }
}
