//! 分发路由
//!
//! 把一次发送扇出到所有已注册的渠道，每个渠道独立执行，
//! 单个渠道失败不影响其他渠道，失败按渠道名汇总到 `DispatchReport`。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{error, info, instrument, warn};

use crate::channels::DeliveryChannel;
use crate::error::{ChannelError, DispatchError};
use crate::models::Notification;

/// 一次分发的汇总结果
///
/// 错误表为空即代表全部渠道发送成功。同名渠道的错误只保留最后一个。
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub errors: HashMap<String, ChannelError>,
}

impl DispatchReport {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add(&mut self, channel: impl Into<String>, err: ChannelError) {
        self.errors.insert(channel.into(), err);
    }
}

/// 分发路由接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DispatchRouter: Send + Sync {
    /// 发送到所有渠道；没有注册任何渠道时返回致命错误
    async fn send(
        &self,
        notification: &Notification,
        device_ids: &[String],
    ) -> Result<DispatchReport, DispatchError>;
}

/// 基于渠道注册表的路由
#[derive(Default, Clone)]
pub struct ChannelRouter {
    channels: Vec<Arc<dyn DeliveryChannel>>,
}

impl ChannelRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册渠道，不检查名称是否重复
    pub fn register(&mut self, channel: Arc<dyn DeliveryChannel>) {
        info!(
            channel_name = channel.name(),
            total = self.channels.len() + 1,
            "注册投递渠道"
        );
        self.channels.push(channel);
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

#[async_trait]
impl DispatchRouter for ChannelRouter {
    #[instrument(
        skip(self, notification, device_ids),
        fields(notification_id = %notification.id, count = device_ids.len())
    )]
    async fn send(
        &self,
        notification: &Notification,
        device_ids: &[String],
    ) -> Result<DispatchReport, DispatchError> {
        if self.channels.is_empty() {
            error!("没有注册任何投递渠道");
            return Err(DispatchError::NoChannels);
        }

        // 并行发送到所有渠道，结果按注册顺序返回
        let send_futures: Vec<_> = self
            .channels
            .iter()
            .map(|channel| async move {
                (
                    channel.name().to_string(),
                    channel.send(notification, device_ids).await,
                )
            })
            .collect();

        let mut report = DispatchReport::default();
        for (name, result) in join_all(send_futures).await {
            if let Err(e) = result {
                warn!(channel = %name, error = %e, "渠道发送失败");
                report.add(name, e);
            }
        }

        Ok(report)
    }
}
