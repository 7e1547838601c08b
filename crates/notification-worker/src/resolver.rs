//! 接收者解析
//!
//! 将通知的目标格子展开为设备列表，并剔除账本中已投递过的设备。

use std::collections::HashSet;

use async_trait::async_trait;
use geo_shared::error::Result;
use tracing::{debug, info, instrument};

use crate::geo_index::GeoDeviceIndex;
use crate::ledger::DeliveryLedger;
use crate::models::Notification;

/// 接收者解析器接口
///
/// 调度器只依赖该 trait，便于在测试中替换为 mock。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecipientResolver: Send + Sync {
    /// 返回尚未投递的设备 ID，顺序不保证
    async fn fetch(&self, notification: &Notification) -> Result<Vec<String>>;

    /// 将设备标记为已投递
    async fn mark_complete(&self, notification: &Notification, device_ids: &[String])
    -> Result<()>;
}

/// 基于位置索引与投递账本的解析器
#[derive(Clone)]
pub struct GeoRecipientResolver {
    index: GeoDeviceIndex,
    ledger: DeliveryLedger,
}

impl GeoRecipientResolver {
    pub fn new(index: GeoDeviceIndex, ledger: DeliveryLedger) -> Self {
        Self { index, ledger }
    }
}

#[async_trait]
impl RecipientResolver for GeoRecipientResolver {
    #[instrument(skip(self, notification), fields(notification_id = %notification.id))]
    async fn fetch(&self, notification: &Notification) -> Result<Vec<String>> {
        // 任一格子查询失败即放弃本次解析，前面已取到的结果一并丢弃
        let mut candidates = Vec::new();
        for cell in &notification.cells {
            let ids = self.index.devices_in(cell).await?;
            if !ids.is_empty() {
                debug!(cell = %cell, count = ids.len(), "devices found in cell");
            }
            candidates.extend(ids);
        }

        let delivered: HashSet<String> = self
            .ledger
            .fetch_delivered(&notification.id)
            .await?
            .into_iter()
            .collect();

        Ok(candidates
            .into_iter()
            .filter(|id| !delivered.contains(id))
            .collect())
    }

    async fn mark_complete(
        &self,
        notification: &Notification,
        device_ids: &[String],
    ) -> Result<()> {
        self.ledger
            .record_delivered(&notification.id, device_ids)
            .await?;
        info!(
            notification_id = %notification.id,
            count = device_ids.len(),
            "recipients marked complete"
        );
        Ok(())
    }
}
