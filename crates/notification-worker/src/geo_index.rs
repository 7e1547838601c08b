//! 地理格子 -> 设备索引
//!
//! 每个格子对应存储中的一个列表（`location:<cell>`），保存当前位于该格子的设备注册 ID。

use std::sync::Arc;

use geo_shared::error::Result;
use geo_shared::store::{ListStore, StoreKey};
use tracing::{debug, instrument, warn};

/// 设备位置索引
#[derive(Clone)]
pub struct GeoDeviceIndex {
    store: Arc<dyn ListStore>,
}

impl GeoDeviceIndex {
    pub fn new(store: Arc<dyn ListStore>) -> Self {
        Self { store }
    }

    /// 返回格子内当前设备的快照
    #[instrument(skip(self))]
    pub async fn devices_in(&self, cell: &str) -> Result<Vec<String>> {
        self.store.range(&StoreKey::location(cell)).await
    }

    /// 将设备加入格子，不检查是否已存在
    pub async fn add_device(&self, cell: &str, device_id: &str) -> Result<()> {
        self.store.push(&StoreKey::location(cell), device_id).await
    }

    /// 从格子移除第一个匹配的设备，不存在时为空操作
    pub async fn remove_device(&self, cell: &str, device_id: &str) -> Result<()> {
        let removed = self
            .store
            .remove(&StoreKey::location(cell), 1, device_id)
            .await?;
        if removed == 0 {
            debug!(cell, device_id, "device not present in cell");
        }
        Ok(())
    }

    /// 更新设备位置
    ///
    /// 先从旧格子移除（`old_cell` 为空则跳过），再加入新格子。两步之间没有事务，
    /// 并发读取者可能短暂看到设备不在任何格子或同时在两个格子。
    #[instrument(skip(self))]
    pub async fn set_location(&self, device_id: &str, old_cell: &str, new_cell: &str) -> Result<()> {
        if !old_cell.is_empty() {
            self.remove_device(old_cell, device_id).await?;
        }
        self.add_device(new_cell, device_id).await
    }

    /// 诊断用的成员检查，查询失败时返回 false
    pub async fn contains_at(&self, cell: &str, device_id: &str) -> bool {
        match self.devices_in(cell).await {
            Ok(ids) => ids.iter().any(|id| id == device_id),
            Err(e) => {
                warn!(cell, device_id, error = %e, "device lookup failed");
                false
            }
        }
    }
}
