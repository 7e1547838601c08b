//! 通知调度器
//!
//! 持有活跃通知列表，按固定间隔逐条扫描：
//! 1. 已过期的通知从列表移除并发布移除事件
//! 2. 解析尚未投递的设备，经分发路由发送
//! 3. 全部渠道成功后发布发送事件并写入投递账本
//!
//! 任一渠道失败时整批设备都不写入账本，下一轮会重新解析并重发。
//! 这是系统唯一的重试机制，没有退避也没有次数上限。
//!
//! 外部调用方通过 [`SchedulerHandle`] 随时增删改通知，列表由读写锁保护；
//! 扫描先在读锁下复制快照，远程调用期间不持有锁。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use geo_shared::config::SchedulerConfig;
use geo_shared::observability::metrics;
use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::error::SchedulerError;
use crate::events::{EventEmitter, SchedulerEvents, SentBatch};
use crate::models::Notification;
use crate::resolver::RecipientResolver;
use crate::router::DispatchRouter;

/// 活跃通知列表的共享句柄
#[derive(Clone, Default)]
pub struct SchedulerHandle {
    notifications: Arc<RwLock<Vec<Notification>>>,
}

impl SchedulerHandle {
    /// 追加通知
    pub async fn add_item(&self, notification: Notification) {
        debug!(notification_id = %notification.id, "adding notification");
        let mut list = self.notifications.write().await;
        list.push(notification);
        metrics::set_active_notifications(list.len());
    }

    /// 移除所有 ID 匹配的通知，返回移除数量
    pub async fn remove_item(&self, notification_id: &str) -> usize {
        let mut list = self.notifications.write().await;
        let before = list.len();
        list.retain(|n| n.id != notification_id);
        metrics::set_active_notifications(list.len());
        before - list.len()
    }

    /// 原位替换所有 ID 匹配的通知，返回替换数量
    pub async fn update_item(&self, notification: Notification) -> usize {
        let mut list = self.notifications.write().await;
        let mut replaced = 0;
        for slot in list.iter_mut().filter(|n| n.id == notification.id) {
            *slot = notification.clone();
            replaced += 1;
        }
        replaced
    }

    pub async fn len(&self) -> usize {
        self.notifications.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.notifications.read().await.is_empty()
    }

    /// 当前列表的副本
    pub async fn snapshot(&self) -> Vec<Notification> {
        self.notifications.read().await.clone()
    }

    /// 同 ID 的第 `occurrence` 条通知（ID 允许重复，按出现顺序定位）
    async fn current(&self, notification_id: &str, occurrence: usize) -> Option<Notification> {
        self.notifications
            .read()
            .await
            .iter()
            .filter(|n| n.id == notification_id)
            .nth(occurrence)
            .cloned()
    }
}

/// 通知调度器
pub struct NotificationScheduler {
    handle: SchedulerHandle,
    delay: Duration,
    resolver: Arc<dyn RecipientResolver>,
    router: Arc<dyn DispatchRouter>,
    events: EventEmitter,
}

impl NotificationScheduler {
    pub fn new(
        config: &SchedulerConfig,
        notifications: Vec<Notification>,
        resolver: Arc<dyn RecipientResolver>,
        router: Arc<dyn DispatchRouter>,
    ) -> (Self, SchedulerEvents) {
        let (events, receivers) = EventEmitter::channel(config.event_buffer);
        metrics::set_active_notifications(notifications.len());

        let scheduler = Self {
            handle: SchedulerHandle {
                notifications: Arc::new(RwLock::new(notifications)),
            },
            delay: config.delay(),
            resolver,
            router,
            events,
        };
        (scheduler, receivers)
    }

    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    /// 在后台任务中运行，返回可停止的运行句柄
    pub fn spawn(self) -> RunningScheduler {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(shutdown_rx));
        RunningScheduler {
            shutdown: shutdown_tx,
            task,
        }
    }

    /// 扫描循环，直到收到 shutdown 信号
    ///
    /// 信号只在两轮扫描之间检查，正在进行的扫描会完整执行。
    /// shutdown 发送端被 drop 同样视为停止。仅在致命错误时返回 `Err`。
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<(), SchedulerError> {
        info!(delay = ?self.delay, "通知调度器已启动");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let start = Instant::now();
            if let Err(e) = self.tick().await {
                error!(error = %e, "调度器遇到致命错误，停止扫描");
                return Err(e);
            }
            metrics::record_tick(start.elapsed().as_secs_f64());

            tokio::select! {
                // 偏向关闭信号，保证收到关闭时能尽快退出
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }

                _ = tokio::time::sleep(self.delay) => {}
            }
        }

        info!("通知调度器已停止");
        Ok(())
    }

    /// 执行一轮完整扫描
    ///
    /// 单条通知的错误通过事件上报后继续处理下一条；只有致命错误会返回 `Err`。
    #[instrument(skip(self))]
    pub async fn tick(&self) -> Result<(), SchedulerError> {
        let snapshot = self.handle.snapshot().await;
        debug!(count = snapshot.len(), "scanning notifications");

        let mut seen: HashMap<String, usize> = HashMap::new();
        for entry in snapshot {
            let occurrence = seen.entry(entry.id.clone()).or_default();
            let position = *occurrence;
            *occurrence += 1;

            // 扫描期间可能已被外部移除或更新，以最新内容为准
            let Some(notification) = self.handle.current(&entry.id, position).await else {
                debug!(notification_id = %entry.id, "notification removed during scan");
                continue;
            };

            if notification.is_expired() {
                self.handle.remove_item(&notification.id).await;
                metrics::record_expired();
                info!(notification_id = %notification.id, end = %notification.end, "通知已过期，移出列表");
                self.events.removed(notification);
                continue;
            }

            self.process(&notification).await?;
        }

        Ok(())
    }

    async fn process(&self, notification: &Notification) -> Result<(), SchedulerError> {
        let recipients = match self.resolver.fetch(notification).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(
                    notification_id = %notification.id,
                    code = e.code(),
                    error = %e,
                    "解析接收者失败"
                );
                self.events.error(&notification.id, e.into());
                return Ok(());
            }
        };

        if recipients.is_empty() {
            debug!(notification_id = %notification.id, "no pending recipients");
            return Ok(());
        }

        let report = match self.router.send(notification, &recipients).await {
            Ok(report) => report,
            Err(e) => {
                self.events.error(&notification.id, e.clone().into());
                return Err(e.into());
            }
        };

        if !report.is_success() {
            for (channel, source) in report.errors {
                metrics::record_send_failure(&channel);
                self.events.error(
                    &notification.id,
                    SchedulerError::Delivery { channel, source },
                );
            }
            return Ok(());
        }

        metrics::record_delivered(recipients.len());
        self.events.sent(SentBatch {
            notification_id: notification.id.clone(),
            device_ids: recipients.clone(),
        });

        if let Err(e) = self.resolver.mark_complete(notification, &recipients).await {
            error!(notification_id = %notification.id, error = %e, "写入投递账本失败");
            self.events.error(&notification.id, e.into());
        }

        Ok(())
    }
}

/// 后台运行中的调度器
pub struct RunningScheduler {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<Result<(), SchedulerError>>,
}

impl RunningScheduler {
    /// 扫描循环是否已退出（正常停止或致命错误）
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// 发送停止信号并等待当前扫描结束
    pub async fn stop(self) -> Result<(), SchedulerError> {
        let _ = self.shutdown.send(true);
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(SchedulerError::TaskFailed(e.to_string())),
        }
    }
}
