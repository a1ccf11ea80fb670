//! Cold/warm start reporting.
//!
//! The warmer hands a [`StartReport`] to a [`Reporter`] on every invocation.
//! When metrics are enabled the reporter turns it into a `ColdStart` or
//! `WarmStart` metric in the `LambdaWarmer` namespace, dimensioned by function
//! name. Sink failures are logged and dropped.

use std::io::Write;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::error::{Result, WarmerError};

pub const NAMESPACE: &str = "LambdaWarmer";
pub const FUNCTION_DIMENSION: &str = "By Function Name";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartKind {
    Cold,
    Warm,
}

impl StartKind {
    pub fn metric_name(self) -> &'static str {
        match self {
            StartKind::Cold => "ColdStart",
            StartKind::Warm => "WarmStart",
        }
    }
}

/// Inputs a metrics collaborator needs about one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartReport {
    pub is_warmer: bool,
    pub was_warm: bool,
    pub function_name: String,
}

impl StartReport {
    pub fn kind(&self) -> StartKind {
        if self.was_warm {
            StartKind::Warm
        } else {
            StartKind::Cold
        }
    }
}

/// A single count metric, value 1, unit `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartMetric {
    pub namespace: &'static str,
    pub name: &'static str,
    pub function_name: String,
}

impl StartMetric {
    pub fn from_report(report: &StartReport) -> Self {
        Self {
            namespace: NAMESPACE,
            name: report.kind().metric_name(),
            function_name: report.function_name.clone(),
        }
    }

    // CloudWatch Embedded Metric Format
    pub fn to_emf(&self, timestamp_ms: u64) -> Value {
        let mut doc = Map::new();
        doc.insert(
            "_aws".to_string(),
            json!({
                "Timestamp": timestamp_ms,
                "CloudWatchMetrics": [{
                    "Namespace": self.namespace,
                    "Dimensions": [[FUNCTION_DIMENSION]],
                    "Metrics": [{ "Name": self.name, "Unit": "None" }],
                }],
            }),
        );
        doc.insert(FUNCTION_DIMENSION.to_string(), Value::from(self.function_name.as_str()));
        doc.insert(self.name.to_string(), Value::from(1));
        Value::Object(doc)
    }
}

#[async_trait]
pub trait MetricSink: Send + Sync {
    async fn record(&self, metric: &StartMetric) -> Result<()>;
}

#[async_trait]
impl<T: MetricSink + ?Sized> MetricSink for Arc<T> {
    async fn record(&self, metric: &StartMetric) -> Result<()> {
        (**self).record(metric).await
    }
}

/// Writes EMF lines to stdout, where the Lambda log pipeline extracts them.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmfMetricSink;

#[async_trait]
impl MetricSink for EmfMetricSink {
    async fn record(&self, metric: &StartMetric) -> Result<()> {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis().try_into().unwrap_or(u64::MAX))
            .unwrap_or(0);
        let line = serde_json::to_string(&metric.to_emf(timestamp_ms))?;
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{line}").map_err(|e| WarmerError::Metric(e.to_string()))
    }
}

/// Turns start reports into metrics when enabled.
#[derive(Debug)]
pub struct Reporter<M> {
    sink: M,
    enabled: bool,
}

impl<M: MetricSink> Reporter<M> {
    pub fn new(sink: M, enabled: bool) -> Self {
        Self { sink, enabled }
    }

    pub fn sink(&self) -> &M {
        &self.sink
    }

    // Sink errors are logged, never returned
    pub async fn report(&self, report: &StartReport) {
        if !self.enabled {
            return;
        }
        let metric = StartMetric::from_report(report);
        if let Err(e) = self.sink.record(&metric).await {
            tracing::warn!(
                function = %report.function_name,
                metric = metric.name,
                is_warmer = report.is_warmer,
                error = %e,
                "failed to record start metric"
            );
        }
    }
}
