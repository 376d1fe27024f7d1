// Metrics for proxied operations and cluster health
// Metric names are shared with the exporter installed by the server binary

use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};

use hutch_common::{Operation, ResourceType};

pub const CLUSTER_ACCESS_TOTAL: &str = "hutch_cluster_access_total";
pub const USER_ACCESS_TOTAL: &str = "hutch_user_access_total";
pub const OPERATION_DURATION_SECONDS: &str = "hutch_resource_operation_duration_seconds";
pub const OPERATION_ERRORS_TOTAL: &str = "hutch_resource_operation_errors_total";
pub const HEALTH_CHECK_ERRORS_TOTAL: &str = "hutch_health_check_errors_total";
pub const CLUSTERS_HEALTHY: &str = "hutch_clusters_healthy";
pub const CLUSTERS_TOTAL: &str = "hutch_clusters_total";

/// Receiver of operation and health measurements
pub trait MetricsSink: Send + Sync {
    fn record_cluster_access(&self, cluster_id: &str);

    fn record_user_access(&self, username: &str);

    /// Duration of a successful operation
    fn record_operation_duration(
        &self,
        resource_type: ResourceType,
        operation: Operation,
        duration: Duration,
    );

    fn record_operation_error(&self, resource_type: ResourceType, operation: Operation, kind: &str);

    fn record_health_check_error(&self, cluster_id: &str);

    fn set_cluster_health(&self, healthy: usize, total: usize);
}

/// Initialize all metric descriptions
/// Should be called once after the recorder is installed
pub fn describe_metrics() {
    describe_counter!(
        CLUSTER_ACCESS_TOTAL,
        "Total number of proxied operations per cluster"
    );
    describe_counter!(
        USER_ACCESS_TOTAL,
        "Total number of proxied operations per user"
    );
    describe_histogram!(
        OPERATION_DURATION_SECONDS,
        "Duration of successful resource operations in seconds"
    );
    describe_counter!(
        OPERATION_ERRORS_TOTAL,
        "Total number of failed resource operations"
    );
    describe_counter!(
        HEALTH_CHECK_ERRORS_TOTAL,
        "Total number of failed cluster health checks"
    );
    describe_gauge!(CLUSTERS_HEALTHY, "Number of healthy clusters");
    describe_gauge!(CLUSTERS_TOTAL, "Number of checked clusters");

    tracing::info!("Metrics initialized");
}

/// Emits through the global `metrics` recorder
#[derive(Debug, Default, Clone, Copy)]
pub struct RecorderMetricsSink;

impl MetricsSink for RecorderMetricsSink {
    fn record_cluster_access(&self, cluster_id: &str) {
        counter!(CLUSTER_ACCESS_TOTAL, "cluster" => cluster_id.to_string()).increment(1);
    }

    fn record_user_access(&self, username: &str) {
        counter!(USER_ACCESS_TOTAL, "user" => username.to_string()).increment(1);
    }

    fn record_operation_duration(
        &self,
        resource_type: ResourceType,
        operation: Operation,
        duration: Duration,
    ) {
        histogram!(OPERATION_DURATION_SECONDS, "resource" => resource_type.as_str(), "operation" => operation.as_str())
            .record(duration.as_secs_f64());
    }

    fn record_operation_error(&self, resource_type: ResourceType, operation: Operation, kind: &str) {
        counter!(OPERATION_ERRORS_TOTAL, "resource" => resource_type.as_str(), "operation" => operation.as_str(), "kind" => kind.to_string())
            .increment(1);
    }

    fn record_health_check_error(&self, cluster_id: &str) {
        counter!(HEALTH_CHECK_ERRORS_TOTAL, "cluster" => cluster_id.to_string()).increment(1);
    }

    fn set_cluster_health(&self, healthy: usize, total: usize) {
        gauge!(CLUSTERS_HEALTHY).set(healthy as f64);
        gauge!(CLUSTERS_TOTAL).set(total as f64);
    }
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetricsSink;

impl MetricsSink for NoopMetricsSink {
    fn record_cluster_access(&self, _cluster_id: &str) {}

    fn record_user_access(&self, _username: &str) {}

    fn record_operation_duration(
        &self,
        _resource_type: ResourceType,
        _operation: Operation,
        _duration: Duration,
    ) {
    }

    fn record_operation_error(
        &self,
        _resource_type: ResourceType,
        _operation: Operation,
        _kind: &str,
    ) {
    }

    fn record_health_check_error(&self, _cluster_id: &str) {}

    fn set_cluster_health(&self, _healthy: usize, _total: usize) {}
}
