//! 投递账本
//!
//! 记录每条通知已经投递过的设备（`notification-<id>`）。只追加，不删除。

use std::sync::Arc;

use geo_shared::error::Result;
use geo_shared::store::{ListStore, StoreKey};
use tracing::instrument;

/// 投递账本，没有垃圾回收，通知过期后记录也不会被清理
#[derive(Clone)]
pub struct DeliveryLedger {
    store: Arc<dyn ListStore>,
}

impl DeliveryLedger {
    pub fn new(store: Arc<dyn ListStore>) -> Self {
        Self { store }
    }

    /// 逐个追加已投递的设备 ID
    ///
    /// 每个 ID 单独一次 push，不合并为批量写入。
    #[instrument(skip(self, device_ids), fields(count = device_ids.len()))]
    pub async fn record_delivered(&self, notification_id: &str, device_ids: &[String]) -> Result<()> {
        let key = StoreKey::delivered(notification_id);
        for id in device_ids {
            self.store.push(&key, id).await?;
        }
        Ok(())
    }

    /// 读取完整的投递历史（可能包含重复项）
    #[instrument(skip(self))]
    pub async fn fetch_delivered(&self, notification_id: &str) -> Result<Vec<String>> {
        self.store.range(&StoreKey::delivered(notification_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_shared::store::InMemoryListStore;
    use tokio_test::assert_err;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[tokio::test]
    async fn test_record_accumulates_history() {
        let ledger = DeliveryLedger::new(Arc::new(InMemoryListStore::new()));

        // (已有记录, 本次投递)
        let cases = [
            (ids(&[]), ids(&["1", "2", "3"])),
            (ids(&["4", "5"]), ids(&["1", "2", "3"])),
            // 重复 ID 只会增加计数，不会出错
            (ids(&["3", "4", "5"]), ids(&["1", "2", "3"])),
        ];

        for (i, (existing, sent)) in cases.iter().enumerate() {
            let notification_id = format!("99-{}", i);
            ledger.record_delivered(&notification_id, existing).await.unwrap();
            let before = ledger.fetch_delivered(&notification_id).await.unwrap().len();

            ledger.record_delivered(&notification_id, sent).await.unwrap();
            let after = ledger.fetch_delivered(&notification_id).await.unwrap().len();

            assert_eq!(before + sent.len(), after);
        }
    }

    #[tokio::test]
    async fn test_ledgers_are_isolated_per_notification() {
        let ledger = DeliveryLedger::new(Arc::new(InMemoryListStore::new()));
        ledger.record_delivered("a", &ids(&["d1"])).await.unwrap();

        assert!(ledger.fetch_delivered("b").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_fails_when_store_offline() {
        let store = InMemoryListStore::new();
        let ledger = DeliveryLedger::new(Arc::new(store.clone()));
        store.set_offline(true);

        assert_err!(ledger.fetch_delivered("a").await);
        assert_err!(ledger.record_delivered("a", &ids(&["d1"])).await);
    }
}
