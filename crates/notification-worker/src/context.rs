//! 服务上下文
//!
//! 进程启动时构建一次，持有位置索引、投递账本、分发路由和调度器，
//! 所有依赖显式传入，不使用全局单例。

use std::sync::Arc;

use anyhow::Context as _;
use geo_shared::config::{AppConfig, SchedulerConfig, StoreBackend};
use geo_shared::error::Result as StoreResult;
use geo_shared::store::{InMemoryListStore, ListStore, RedisListStore};
use tracing::{info, warn};

use crate::channels::PushProviderChannel;
use crate::error::SchedulerError;
use crate::events::SchedulerEvents;
use crate::geo_index::GeoDeviceIndex;
use crate::ledger::DeliveryLedger;
use crate::models::Notification;
use crate::resolver::GeoRecipientResolver;
use crate::router::ChannelRouter;
use crate::scheduler::{NotificationScheduler, RunningScheduler, SchedulerHandle};

/// 地理通知服务
pub struct GeoNotifier {
    index: GeoDeviceIndex,
    scheduler: SchedulerHandle,
    running: RunningScheduler,
}

impl GeoNotifier {
    /// 构建各组件并启动调度循环
    pub fn start(
        config: &SchedulerConfig,
        store: Arc<dyn ListStore>,
        router: ChannelRouter,
        notifications: Vec<Notification>,
    ) -> (Self, SchedulerEvents) {
        if router.is_empty() {
            warn!("未注册任何投递渠道，首次发送时调度器将停止");
        }

        let index = GeoDeviceIndex::new(store.clone());
        let resolver = GeoRecipientResolver::new(index.clone(), DeliveryLedger::new(store));

        info!(
            channels = router.len(),
            notifications = notifications.len(),
            "启动地理通知服务"
        );

        let (scheduler, events) = NotificationScheduler::new(
            config,
            notifications,
            Arc::new(resolver),
            Arc::new(router),
        );
        let handle = scheduler.handle();
        let running = scheduler.spawn();

        (
            Self {
                index,
                scheduler: handle,
                running,
            },
            events,
        )
    }

    /// 按应用配置构建：存储后端、推送渠道和初始通知列表
    pub async fn from_config(config: &AppConfig) -> anyhow::Result<(Self, SchedulerEvents)> {
        let store: Arc<dyn ListStore> = match config.store.backend {
            StoreBackend::Redis => {
                let store = RedisListStore::new(&config.redis)?;
                store
                    .health_check()
                    .await
                    .context("Redis 健康检查失败")?;
                Arc::new(store)
            }
            StoreBackend::Memory => {
                warn!("使用内存存储，进程重启后位置和投递记录会丢失");
                Arc::new(InMemoryListStore::new())
            }
        };

        let mut router = ChannelRouter::new();
        if config.push.enabled {
            router.register(Arc::new(PushProviderChannel::new(&config.push)?));
        }

        let notifications = match &config.scheduler.notifications_file {
            Some(path) => Notification::load_all(path)
                .with_context(|| format!("加载通知文件失败: {}", path.display()))?,
            None => Vec::new(),
        };

        Ok(Self::start(&config.scheduler, store, router, notifications))
    }

    pub async fn add_notification(&self, notification: Notification) {
        info!(notification_id = %notification.id, "添加通知");
        self.scheduler.add_item(notification).await;
    }

    pub async fn update_notification(&self, notification: Notification) -> usize {
        self.scheduler.update_item(notification).await
    }

    pub async fn remove_notification(&self, notification_id: &str) -> usize {
        self.scheduler.remove_item(notification_id).await
    }

    /// 上报设备的新位置，`old_cell` 为空表示首次上报
    pub async fn set_device_location(
        &self,
        device_id: &str,
        old_cell: &str,
        new_cell: &str,
    ) -> StoreResult<()> {
        self.index.set_location(device_id, old_cell, new_cell).await
    }

    /// 诊断用：设备当前是否登记在某个格子
    pub async fn device_located_at(&self, cell: &str, device_id: &str) -> bool {
        self.index.contains_at(cell, device_id).await
    }

    pub fn scheduler(&self) -> &SchedulerHandle {
        &self.scheduler
    }

    pub fn is_running(&self) -> bool {
        !self.running.is_finished()
    }

    /// 停止调度循环
    pub async fn stop(self) -> Result<(), SchedulerError> {
        self.running.stop().await
    }
}
