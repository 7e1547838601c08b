//! 通知服务错误类型
//!
//! 定义存储访问、渠道发送和分发路由等场景的错误分类，
//! 调度器据此决定上报后继续，还是终止扫描循环。

use geo_shared::error::StoreError;
use thiserror::Error;

/// 单个投递渠道的发送错误
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("渠道 {channel} 收到空的接收者列表")]
    EmptyRecipients { channel: String },

    #[error("推送服务返回异常状态: 渠道={channel}, 状态={status}")]
    Provider { channel: String, status: String },

    #[error("推送请求发送失败: 渠道={channel}, 原因={source}")]
    Transport {
        channel: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("推送负载序列化失败: {0}")]
    Encode(#[from] serde_json::Error),
}

/// 分发路由错误
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// 没有注册任何渠道，任何发送都不可能成功
    #[error("未注册任何投递渠道")]
    NoChannels,
}

/// 调度过程中上报的错误
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("渠道发送失败: 渠道={channel}, 原因={source}")]
    Delivery {
        channel: String,
        #[source]
        source: ChannelError,
    },

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("调度任务异常退出: {0}")]
    TaskFailed(String),
}

impl SchedulerError {
    /// 是否为致命错误（调度循环无法继续）
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Dispatch(DispatchError::NoChannels))
    }
}
