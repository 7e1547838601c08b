//! 调度器事件
//!
//! 调度器通过三个有界通道对外发布事件：错误、过期移除、发送完成。
//!
//! ## 背压策略
//!
//! 调度器从不等待消费者：通道满时丢弃新事件，记录 warn 日志并累加
//! `geo_notifier_events_dropped_total` 指标；接收端已关闭时静默丢弃。

use geo_shared::observability::metrics;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::error::SchedulerError;
use crate::models::Notification;

/// 一次成功的批量投递
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentBatch {
    pub notification_id: String,
    pub device_ids: Vec<String>,
}

/// 某条通知在本轮处理中的失败
#[derive(Debug)]
pub struct DeliveryFailure {
    pub notification_id: String,
    pub error: SchedulerError,
}

/// 事件接收端
pub struct SchedulerEvents {
    pub errors: mpsc::Receiver<DeliveryFailure>,
    pub removed: mpsc::Receiver<Notification>,
    pub sent: mpsc::Receiver<SentBatch>,
}

/// 事件发送端，由调度器独占
pub(crate) struct EventEmitter {
    errors: mpsc::Sender<DeliveryFailure>,
    removed: mpsc::Sender<Notification>,
    sent: mpsc::Sender<SentBatch>,
}

impl EventEmitter {
    /// 创建发送端与接收端，`capacity` 为每个通道的缓冲区大小
    pub(crate) fn channel(capacity: usize) -> (Self, SchedulerEvents) {
        let capacity = capacity.max(1);
        let (errors_tx, errors_rx) = mpsc::channel(capacity);
        let (removed_tx, removed_rx) = mpsc::channel(capacity);
        let (sent_tx, sent_rx) = mpsc::channel(capacity);

        (
            Self {
                errors: errors_tx,
                removed: removed_tx,
                sent: sent_tx,
            },
            SchedulerEvents {
                errors: errors_rx,
                removed: removed_rx,
                sent: sent_rx,
            },
        )
    }

    pub(crate) fn error(&self, notification_id: &str, error: SchedulerError) {
        emit(
            &self.errors,
            DeliveryFailure {
                notification_id: notification_id.to_string(),
                error,
            },
            "error",
        );
    }

    pub(crate) fn removed(&self, notification: Notification) {
        emit(&self.removed, notification, "removed");
    }

    pub(crate) fn sent(&self, batch: SentBatch) {
        emit(&self.sent, batch, "sent");
    }
}

fn emit<T>(tx: &mpsc::Sender<T>, event: T, kind: &'static str) {
    match tx.try_send(event) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => {
            warn!(event = kind, "事件通道已满，丢弃事件");
            metrics::record_event_dropped(kind);
        }
        Err(TrySendError::Closed(_)) => {
            debug!(event = kind, "事件接收端已关闭");
        }
    }
}
