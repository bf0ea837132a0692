// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics::describe_counter;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{info, warn};

use crate::config::settings::MetricsSettings;

/// 初始化指标导出
///
/// 未启用时什么也不做；计数器宏在没有安装 recorder 时为空操作
pub fn init_metrics(settings: &MetricsSettings) {
    if !settings.enabled {
        return;
    }

    let addr: SocketAddr = match settings.listen_addr.parse() {
        Ok(addr) => addr,
        Err(e) => {
            warn!("Invalid metrics listen address {}: {}", settings.listen_addr, e);
            return;
        }
    };

    // Ignore error if address is already in use (for development/testing)
    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        warn!(
            "Failed to install Prometheus recorder: {}. This might happen if the port is already in use.",
            e
        );
        return;
    }

    describe_counter!("crawler_types_seeded_total", "Built-in crawler types written on first access");
    describe_counter!("crawler_types_created_total", "Crawler types created through the API");
    describe_counter!("crawler_instances_created_total", "Crawler instances created");
    describe_counter!("crawler_instances_deleted_total", "Crawler instances deleted");
    describe_counter!("crawler_transitions_total", "Crawler lifecycle transitions by action");
    describe_counter!("crawler_seeds_added_total", "Seeds appended to crawler instances");
    describe_counter!("service_starts_total", "Service processes spawned");
    describe_counter!("service_start_failures_total", "Service processes that failed to start");
    describe_counter!("service_stops_total", "Service processes stopped");
    describe_counter!("service_kill_escalations_total", "Stops that escalated from SIGTERM to SIGKILL");
    describe_counter!("auth_rejections_total", "Requests rejected by the service token check");

    info!("Metrics exporter listening on {}", addr);
}
