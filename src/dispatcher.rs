use std::time::Duration;

use serde_json::{Map, Value};

use crate::classifier::InvocationRequest;
use crate::config::{WarmerConfig, CONCURRENCY_KEY, CORRELATION_ID_KEY, INVOCATION_KEY};
use crate::transport::{InvocationMode, Invoker};

/// One additional invocation of the same function.
#[derive(Debug, Clone, PartialEq)]
pub struct FanOutCall {
    pub index: u64,
    pub mode: InvocationMode,
    pub payload: Value,
}

/// What a warmer ping does before returning.
#[derive(Debug, Clone, PartialEq)]
pub enum FanOutPlan {
    Idle,
    // Hold this environment so the platform spins up another one
    Delay(Duration),
    FanOut(FanOutCalls),
}

/// The calls of one fan-out, built one at a time as they are issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanOutCalls {
    flag: String,
    total: u64,
    correlation_id: String,
}

impl FanOutCalls {
    pub fn len(&self) -> u64 {
        self.total.saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = FanOutCall> + '_ {
        (2..=self.total).map(move |index| FanOutCall {
            index,
            mode: if index < self.total { InvocationMode::FireAndForget } else { InvocationMode::RequestResponse },
            payload: self.payload(index),
        })
    }

    fn payload(&self, index: u64) -> Value {
        let mut payload = Map::new();
        payload.insert(self.flag.clone(), Value::Bool(true));
        payload.insert(CONCURRENCY_KEY.to_string(), Value::from(self.total));
        payload.insert(CORRELATION_ID_KEY.to_string(), Value::from(self.correlation_id.as_str()));
        payload.insert(INVOCATION_KEY.to_string(), Value::from(index));
        Value::Object(payload)
    }
}

impl FanOutPlan {
    pub fn for_request(request: &InvocationRequest, config: &WarmerConfig) -> Self {
        // A call that is itself a fan-out hop never fans out again
        if request.is_fanned_out() {
            if request.concurrency > 1 {
                tracing::debug!(
                    correlation_id = %request.correlation_id,
                    count = request.invocation_index,
                    concurrency = request.concurrency,
                    "ignoring concurrency on a fanned-out invocation"
                );
            }
            return FanOutPlan::Delay(config.delay());
        }
        if request.concurrency <= 1 {
            return FanOutPlan::Idle;
        }

        FanOutPlan::FanOut(FanOutCalls {
            flag: config.flag().to_string(),
            total: request.concurrency,
            correlation_id: request.correlation_id.clone(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub attempted: Vec<u64>,
    pub failed: Vec<u64>,
    pub delayed: Option<Duration>,
}

/// Issues fan-out calls through an [`Invoker`].
#[derive(Debug)]
pub struct Dispatcher<I> {
    invoker: I,
}

impl<I: Invoker> Dispatcher<I> {
    pub fn new(invoker: I) -> Self {
        Self { invoker }
    }

    pub fn invoker(&self) -> &I {
        &self.invoker
    }

    /// Carries out `plan` against `target`. Individual failures are logged and
    /// do not stop the remaining calls.
    pub async fn execute(&self, target: &str, plan: FanOutPlan) -> DispatchReport {
        let mut report = DispatchReport::default();
        match plan {
            FanOutPlan::Idle => {}
            FanOutPlan::Delay(delay) => {
                tokio::time::sleep(delay).await;
                report.delayed = Some(delay);
            }
            FanOutPlan::FanOut(calls) => {
                for call in calls.iter() {
                    report.attempted.push(call.index);
                    if let Err(e) = self.invoker.invoke(target, &call.payload, call.mode).await {
                        tracing::error!(
                            function = target,
                            payload = %call.payload,
                            error = %e,
                            "failed to invoke during warm up fan out"
                        );
                        report.failed.push(call.index);
                    }
                }
            }
        }
        report
    }
}
