//! 投递渠道
//!
//! 定义渠道 trait 并提供具体实现。渠道收到的是完整的设备列表，
//! 不属于自己的设备由渠道内部自行处理。
//!
//! ## 支持的渠道
//!
//! - **PushProvider**: HTTP 推送服务（GCM 协议）

mod push_provider;

pub use push_provider::{PushPayload, PushPayloadData, PushProviderChannel};

use async_trait::async_trait;

use crate::error::ChannelError;
use crate::models::Notification;

/// 投递渠道 trait
///
/// 渠道实现应当是无状态的，便于并发调用。
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    /// 稳定的渠道标识，用作分发结果的聚合键
    fn name(&self) -> &str;

    /// 将通知发送给一组设备
    async fn send(&self, notification: &Notification, device_ids: &[String])
    -> Result<(), ChannelError>;
}
