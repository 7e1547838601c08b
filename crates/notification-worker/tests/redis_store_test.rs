//! Redis 存储集成测试
//!
//! 需要可用的 Redis 实例，默认忽略。运行方式：
//! `TEST_REDIS_URL=redis://localhost:6379/1 cargo test -- --ignored`

use std::sync::Arc;

use chrono::{Duration, Utc};
use geo_notifier::geo_index::GeoDeviceIndex;
use geo_notifier::ledger::DeliveryLedger;
use geo_notifier::models::Notification;
use geo_notifier::resolver::{GeoRecipientResolver, RecipientResolver};
use geo_shared::config::RedisConfig;
use geo_shared::store::{ListStore, RedisListStore};
use uuid::Uuid;

fn test_store() -> Arc<RedisListStore> {
    let config = RedisConfig {
        url: std::env::var("TEST_REDIS_URL")
            .unwrap_or_else(|_| "redis://localhost:6379/1".to_string()),
    };
    Arc::new(RedisListStore::new(&config).expect("创建 Redis 客户端失败"))
}

/// 生成唯一前缀，避免并行测试互相干扰
fn unique(name: &str) -> String {
    format!("{}-{}", name, Uuid::new_v4())
}

#[tokio::test]
#[ignore = "需要 Redis"]
async fn test_redis_list_semantics() {
    let store = test_store();
    store.health_check().await.unwrap();
    let key = unique("list");

    store.push(&key, "a").await.unwrap();
    store.push(&key, "b").await.unwrap();
    store.push(&key, "a").await.unwrap();
    assert_eq!(store.range(&key).await.unwrap(), vec!["a", "b", "a"]);

    assert_eq!(store.remove(&key, 1, "a").await.unwrap(), 1);
    assert_eq!(store.range(&key).await.unwrap().len(), 2);
    assert_eq!(store.remove(&key, 1, "missing").await.unwrap(), 0);
}

#[tokio::test]
#[ignore = "需要 Redis"]
async fn test_redis_resolver_flow() {
    let store = test_store();
    let index = GeoDeviceIndex::new(store.clone());
    let ledger = DeliveryLedger::new(store);
    let resolver = GeoRecipientResolver::new(index.clone(), ledger);

    let cell_a = unique("cell");
    let cell_b = unique("cell");
    index.set_location("d1", "", &cell_a).await.unwrap();
    index.set_location("d2", "", &cell_b).await.unwrap();
    index.set_location("d2", &cell_b, &cell_a).await.unwrap();

    let notification = Notification::new(
        unique("n"),
        "test",
        vec![cell_a.clone(), cell_b.clone()],
        Utc::now(),
        Utc::now() + Duration::hours(1),
    );

    let mut ids = resolver.fetch(&notification).await.unwrap();
    ids.sort();
    assert_eq!(ids, vec!["d1", "d2"]);

    resolver.mark_complete(&notification, &ids).await.unwrap();
    assert!(resolver.fetch(&notification).await.unwrap().is_empty());
}
