//! 地理通知服务
//!
//! 加载配置、初始化可观测性、启动调度器，收到 Ctrl-C 后优雅停止。

use std::time::Duration;

use geo_notifier::GeoNotifier;
use geo_notifier::events::SchedulerEvents;
use geo_shared::config::AppConfig;
use geo_shared::observability;
use tracing::{error, info, warn};

const SERVICE_NAME: &str = "geo-notifier";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load(SERVICE_NAME)?;
    let _guard = observability::init(SERVICE_NAME, &config.observability)?;

    info!(
        environment = %config.environment,
        backend = ?config.store.backend,
        "Starting geo-notifier..."
    );

    let (notifier, events) = GeoNotifier::from_config(&config).await?;
    let log_task = tokio::spawn(log_events(events));

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("收到关闭信号，停止调度器");
        }
        _ = wait_for_exit(&notifier) => {
            warn!("调度器已自行退出");
        }
    }

    let result = notifier.stop().await;
    log_task.abort();

    if let Err(e) = &result {
        error!(error = %e, "调度器异常退出");
    }
    Ok(result?)
}

/// 调度循环只会因致命错误自行退出，这里轮询其状态
async fn wait_for_exit(notifier: &GeoNotifier) {
    while notifier.is_running() {
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}

/// 消费调度器事件并写入日志，避免事件通道积压
async fn log_events(mut events: SchedulerEvents) {
    loop {
        tokio::select! {
            Some(failure) = events.errors.recv() => {
                warn!(
                    notification_id = %failure.notification_id,
                    error = %failure.error,
                    "通知处理失败"
                );
            }
            Some(notification) = events.removed.recv() => {
                info!(notification_id = %notification.id, "通知已过期移除");
            }
            Some(batch) = events.sent.recv() => {
                info!(
                    notification_id = %batch.notification_id,
                    count = batch.device_ids.len(),
                    "通知已发送"
                );
            }
            else => break,
        }
    }
}
