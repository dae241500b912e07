//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。

use anyhow::Result;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;

use super::ObservabilityConfig;

/// Metrics 资源守卫
pub struct MetricsHandle {
    pub addr: SocketAddr,
}

/// 初始化 Prometheus 指标导出
///
/// 在指定端口启动内置的 HTTP 监听器暴露 `/metrics`，需要在 tokio 运行时内调用。
pub fn init(config: &ObservabilityConfig) -> Result<MetricsHandle> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .add_global_label("service", config.service_name.clone())
        .install()?;

    describe_metrics();
    info!("Metrics exporter listening on {}", addr);

    Ok(MetricsHandle { addr })
}

/// 注册指标描述，出现在 /metrics 的 HELP 注释中
fn describe_metrics() {
    metrics::describe_counter!("http_requests_total", "Total number of HTTP requests");
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );
    metrics::describe_counter!(
        "sponsorship_transitions_total",
        "Sponsorship lifecycle transitions persisted"
    );
    metrics::describe_counter!(
        "sponsorship_mutations_total",
        "Sponsorship create/update/destroy outcomes"
    );
    metrics::describe_counter!(
        "sponsor_emails_enqueued_total",
        "Sponsor emails accepted by the send queue"
    );
    metrics::describe_counter!(
        "sponsor_emails_sent_total",
        "Sponsor emails handed to the delivery channel"
    );
}

/// 记录 HTTP 请求
#[inline]
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str.clone()
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str
    )
    .record(duration_secs);
}

/// 记录状态流转
#[inline]
pub fn record_transition(to_state: &str) {
    metrics::counter!("sponsorship_transitions_total", "to" => to_state.to_string()).increment(1);
}

/// 记录增删改结果
#[inline]
pub fn record_mutation(operation: &'static str, outcome: &'static str) {
    metrics::counter!(
        "sponsorship_mutations_total",
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
}

/// 记录邮件入队
#[inline]
pub fn record_email_enqueued() {
    metrics::counter!("sponsor_emails_enqueued_total").increment(1);
}

/// 记录邮件发送结果
#[inline]
pub fn record_email_sent(status: &'static str) {
    metrics::counter!("sponsor_emails_sent_total", "status" => status).increment(1);
}
