use serde_json::Value;

use crate::config::{WarmerConfig, CONCURRENCY_KEY, CORRELATION_ID_KEY, INVOCATION_KEY, MAX_CONCURRENCY};

/// What an incoming payload says about itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationRequest {
    pub is_warmer: bool,
    pub concurrency: u64,
    pub invocation_index: u64,
    pub invocation_total: u64,
    pub correlation_id: String,
    pub instance_id: String,
}

impl InvocationRequest {
    /// Classifies a raw payload. Malformed or missing values fall back to
    /// their defaults and concurrency is capped at [`MAX_CONCURRENCY`]; this
    /// never fails.
    pub fn classify(payload: &Value, config: &WarmerConfig, request_id: &str) -> Self {
        let is_warmer = payload.get(config.flag()).is_some_and(is_truthy);
        let concurrency = payload.get(config.concurrency()).and_then(as_count).unwrap_or(1);
        let concurrency = capped(concurrency, request_id);
        let invocation_index = payload.get(INVOCATION_KEY).and_then(as_count).unwrap_or(1);
        let invocation_total = payload
            .get(CONCURRENCY_KEY)
            .and_then(as_count)
            .map_or(concurrency, |total| total.min(MAX_CONCURRENCY));
        let correlation_id = payload
            .get(CORRELATION_ID_KEY)
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .unwrap_or(request_id)
            .to_string();

        Self {
            is_warmer,
            concurrency,
            invocation_index,
            invocation_total,
            correlation_id,
            instance_id: request_id.to_string(),
        }
    }

    // Produced by a fan-out rather than an originating ping
    pub fn is_fanned_out(&self) -> bool {
        self.invocation_index > 1
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn capped(concurrency: u64, request_id: &str) -> u64 {
    if concurrency > MAX_CONCURRENCY {
        tracing::warn!(
            instance_id = request_id,
            requested = concurrency,
            max = MAX_CONCURRENCY,
            "requested warmer concurrency exceeds the maximum, capping"
        );
        return MAX_CONCURRENCY;
    }
    concurrency
}

// Positive integer, at least 1
fn as_count(value: &Value) -> Option<u64> {
    let n = match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => i,
            None => n.as_f64().filter(|f| f.is_finite() && f.fract() == 0.0)? as i64,
        },
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    Some(n.max(1) as u64)
}
