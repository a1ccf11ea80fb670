//! In-memory capabilities that record what the warmer asked of them.
//!
//! Meant for tests of code that wraps handlers with the warmer.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::INVOCATION_KEY;
use crate::error::{Result, WarmerError};
use crate::metrics::{MetricSink, StartMetric};
use crate::transport::{InvocationMode, Invoker};

#[derive(Debug, Clone, PartialEq)]
pub struct InvokeCall {
    pub target: String,
    pub payload: Value,
    pub mode: InvocationMode,
}

/// Records every invoke attempt, optionally failing chosen fan-out indices.
#[derive(Debug, Default)]
pub struct RecordingInvoker {
    calls: Mutex<Vec<InvokeCall>>,
    failing: HashSet<u64>,
}

impl RecordingInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the attempts whose payload carries one of these invocation indices.
    pub fn failing_on(indices: impl IntoIterator<Item = u64>) -> Self {
        Self { calls: Mutex::default(), failing: indices.into_iter().collect() }
    }

    pub fn calls(&self) -> Vec<InvokeCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Invoker for RecordingInvoker {
    async fn invoke(&self, target: &str, payload: &Value, mode: InvocationMode) -> Result<()> {
        self.calls.lock().unwrap().push(InvokeCall {
            target: target.to_string(),
            payload: payload.clone(),
            mode,
        });

        let index = payload.get(INVOCATION_KEY).and_then(Value::as_u64);
        match index {
            Some(i) if self.failing.contains(&i) => Err(WarmerError::Invoke {
                target: target.to_string(),
                source: format!("throttled invocation {i}").into(),
            }),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Default)]
pub struct RecordingMetricSink {
    metrics: Mutex<Vec<StartMetric>>,
}

impl RecordingMetricSink {
    pub fn metrics(&self) -> Vec<StartMetric> {
        self.metrics.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetricSink for RecordingMetricSink {
    async fn record(&self, metric: &StartMetric) -> Result<()> {
        self.metrics.lock().unwrap().push(metric.clone());
        Ok(())
    }
}

/// Rejects every metric.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingMetricSink;

#[async_trait]
impl MetricSink for FailingMetricSink {
    async fn record(&self, _metric: &StartMetric) -> Result<()> {
        Err(WarmerError::Metric("metrics endpoint unavailable".to_string()))
    }
}
