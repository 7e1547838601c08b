//! 统一可观测性模块
//!
//! 提供 metrics、logging 的统一初始化和管理。
//! 进程入口通过单一入口点配置可观测性，确保一致的指标命名。

pub mod metrics;
pub mod tracing;

use ::tracing::info;
use anyhow::Result;

use crate::config::ObservabilityConfig;

/// 可观测性资源守卫
///
/// 持有各种可观测性资源的生命周期，进程退出前 drop。
pub struct ObservabilityGuard {
    _metrics_enabled: bool,
}

impl Drop for ObservabilityGuard {
    fn drop(&mut self) {
        info!("Shutting down observability...");
    }
}

/// 统一初始化可观测性
///
/// 初始化顺序：
/// 1. Tracing（日志）
/// 2. Metrics（Prometheus 指标，按配置启用）
///
/// 必须在 tokio 运行时内调用，Prometheus 导出器会在运行时上启动 HTTP 监听。
pub fn init(service_name: &str, config: &ObservabilityConfig) -> Result<ObservabilityGuard> {
    tracing::init(config)?;

    if config.metrics_enabled {
        metrics::init(service_name, config.metrics_port)?;
    }

    info!(
        service = %service_name,
        metrics_enabled = config.metrics_enabled,
        metrics_port = config.metrics_port,
        "Observability initialized"
    );

    Ok(ObservabilityGuard {
        _metrics_enabled: config.metrics_enabled,
    })
}
