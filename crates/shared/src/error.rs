//! 统一错误处理模块
//!
//! 定义存储层共享的错误类型，使用 thiserror 提供良好的错误信息。

use thiserror::Error;

/// 存储层错误类型
///
/// 设备位置索引和投递账本都基于远程列表存储，访问失败统一归入此类型。
#[derive(Debug, Error)]
pub enum StoreError {
    // ==================== 缓存错误 ====================
    #[error("Redis 错误: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("存储不可用: {0}")]
    Unavailable(String),
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::Redis(_) => "REDIS_ERROR",
            Self::Unavailable(_) => "STORE_UNAVAILABLE",
        }
    }
}
