use std::future::Future;
use std::sync::Arc;

use lambda_runtime::{Error, LambdaEvent};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::classifier::InvocationRequest;
use crate::config::WarmerConfig;
use crate::dispatcher::{DispatchReport, Dispatcher, FanOutPlan};
use crate::error::WarmerError;
use crate::metrics::{MetricSink, Reporter, StartReport};
use crate::state::ProcessState;
use crate::transport::Invoker;

/// What the warmer decided for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Passthrough,
    Warmed(DispatchReport),
}

/// Classifies invocations and handles warmer pings.
pub struct Warmer<I, M> {
    config: WarmerConfig,
    state: Arc<ProcessState>,
    dispatcher: Dispatcher<I>,
    reporter: Reporter<M>,
}

impl<I: Invoker, M: MetricSink> Warmer<I, M> {
    pub fn new(config: WarmerConfig, state: Arc<ProcessState>, invoker: I, sink: M) -> Self {
        let reporter = Reporter::new(sink, config.send_metric());
        Self { config, state, dispatcher: Dispatcher::new(invoker), reporter }
    }

    pub fn config(&self) -> &WarmerConfig {
        &self.config
    }

    pub fn state(&self) -> &ProcessState {
        &self.state
    }

    /// Runs the warmer for one invocation. Marks the environment warm, reports
    /// the start metric, and fans out or delays when the payload is a ping.
    pub async fn observe(&self, payload: &Value, request_id: &str) -> Outcome {
        let request = InvocationRequest::classify(payload, &self.config, request_id);
        let was_warm = self.state.mark_warm();
        let function = self.state.function();

        self.reporter
            .report(&StartReport {
                is_warmer: request.is_warmer,
                was_warm,
                function_name: function.name().to_string(),
            })
            .await;

        if !request.is_warmer {
            return Outcome::Passthrough;
        }

        tracing::info!(
            action = "warmer",
            function = function.name(),
            function_version = function.version().unwrap_or_default(),
            correlation_id = %request.correlation_id,
            instance_id = %request.instance_id,
            count = request.invocation_index,
            concurrency = request.invocation_total,
            is_warm = was_warm,
            "warmer invocation"
        );

        let plan = FanOutPlan::for_request(&request, &self.config);
        Outcome::Warmed(self.dispatcher.execute(&function.target(), plan).await)
    }
}

/// Decorates `handler` so warmer pings are answered without reaching it.
pub fn wrap<H, I, M>(handler: H, warmer: Warmer<I, M>) -> Warmed<H, I, M> {
    Warmed { handler, warmer }
}

/// A handler wrapped by [`wrap`].
pub struct Warmed<H, I, M> {
    handler: H,
    warmer: Warmer<I, M>,
}

impl<H, I: Invoker, M: MetricSink> Warmed<H, I, M> {
    pub fn warmer(&self) -> &Warmer<I, M> {
        &self.warmer
    }

    /// Returns `None` for warmer pings, otherwise whatever the handler returns.
    pub async fn call<P, T, Fut>(&self, event: LambdaEvent<Value>) -> Result<Option<T>, Error>
    where
        H: Fn(LambdaEvent<P>) -> Fut,
        Fut: Future<Output = Result<T, Error>>,
        P: DeserializeOwned,
    {
        let (payload, context) = event.into_parts();
        match self.warmer.observe(&payload, &context.request_id).await {
            Outcome::Warmed(_) => Ok(None),
            Outcome::Passthrough => {
                let payload: P = serde_json::from_value(payload).map_err(WarmerError::from)?;
                let response = (self.handler)(LambdaEvent::new(payload, context)).await?;
                Ok(Some(response))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{RecordingInvoker, RecordingMetricSink};
    use crate::state::FunctionIdentity;
    use serde_json::json;

    fn warmer(config: WarmerConfig) -> Warmer<Arc<RecordingInvoker>, Arc<RecordingMetricSink>> {
        let state = Arc::new(ProcessState::new(FunctionIdentity::new("myFn", None)));
        Warmer::new(config, state, Arc::default(), Arc::default())
    }

    #[tokio::test]
    async fn real_request_passes_through_and_warms() {
        let warmer = warmer(WarmerConfig::default());
        assert!(!warmer.state().is_warm());
        assert_eq!(warmer.observe(&json!({"name": "x"}), "1").await, Outcome::Passthrough);
        assert!(warmer.state().is_warm());
    }

    #[tokio::test]
    async fn renamed_flag_is_recognised() {
        let config = WarmerConfig::builder().flag("not_w").concurrency("not_c").build().unwrap();
        let warmer = warmer(config);
        let outcome = warmer.observe(&json!({"not_w": true, "not_c": 2}), "1").await;
        assert_eq!(
            outcome,
            Outcome::Warmed(DispatchReport { attempted: vec![2], failed: vec![], delayed: None })
        );
        assert!(warmer.state().is_warm());
    }
}
