//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。

use std::net::SocketAddr;

use anyhow::Result;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

/// 初始化 Prometheus 指标导出
///
/// 在指定端口启动 `/metrics` 监听，需在 tokio 运行时内调用。
pub fn init(service_name: &str, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .add_global_label("service", service_name)
        .install()?;

    describe_metrics();

    info!(%addr, "Metrics server started");
    Ok(())
}

/// 注册指标描述，会出现在 /metrics 端点的 HELP 注释中
fn describe_metrics() {
    metrics::describe_counter!(
        "geo_notifier_sent_total",
        "Total number of device ids a notification was delivered to"
    );
    metrics::describe_counter!(
        "geo_notifier_send_failures_total",
        "Total number of failed channel sends"
    );
    metrics::describe_counter!(
        "geo_notifier_expired_total",
        "Total number of notifications removed after expiry"
    );
    metrics::describe_counter!(
        "geo_notifier_events_dropped_total",
        "Total number of scheduler events dropped because the consumer lagged"
    );
    metrics::describe_gauge!(
        "geo_notifier_active_notifications",
        "Number of notifications in the live list"
    );
    metrics::describe_histogram!(
        "geo_notifier_tick_duration_seconds",
        "Duration of one full scheduler scan in seconds"
    );
}

// ============================================================================
// 便捷的指标记录函数
// ============================================================================

/// 记录成功投递的设备数
#[inline]
pub fn record_delivered(count: usize) {
    metrics::counter!("geo_notifier_sent_total").increment(count as u64);
}

/// 记录渠道发送失败
#[inline]
pub fn record_send_failure(channel: &str) {
    metrics::counter!(
        "geo_notifier_send_failures_total",
        "channel" => channel.to_string()
    )
    .increment(1);
}

/// 记录过期移除
#[inline]
pub fn record_expired() {
    metrics::counter!("geo_notifier_expired_total").increment(1);
}

/// 记录被丢弃的事件
#[inline]
pub fn record_event_dropped(event: &'static str) {
    metrics::counter!("geo_notifier_events_dropped_total", "event" => event).increment(1);
}

/// 更新活跃通知数量
#[inline]
pub fn set_active_notifications(count: usize) {
    metrics::gauge!("geo_notifier_active_notifications").set(count as f64);
}

/// 记录单轮扫描耗时
#[inline]
pub fn record_tick(duration_secs: f64) {
    metrics::histogram!("geo_notifier_tick_duration_seconds").record(duration_secs);
}
