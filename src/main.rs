use std::sync::Arc;

use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use lambda_warmer::{wrap, EmfMetricSink, LambdaInvoker, ProcessState, WarmerConfig, Warmer};
use serde_json::Value;
mod handler;
use handler::{function_handler, GreetRequest};

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_runtime::tracing::init_default_subscriber();

    // Built once at cold start, shared by every invocation this container serves
    let state = Arc::new(ProcessState::from_env());
    let config = WarmerConfig::from_env()?;
    let invoker = LambdaInvoker::from_env().await;

    let warmed = Arc::new(wrap(function_handler, Warmer::new(config, state, invoker, EmfMetricSink)));

    run(service_fn(move |event: LambdaEvent<Value>| {
        let warmed = Arc::clone(&warmed);
        async move { warmed.call::<GreetRequest, _, _>(event).await }
    }))
    .await
}
