use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_lambda::primitives::Blob;
use aws_sdk_lambda::types::InvocationType;
use serde_json::Value;

use crate::error::{Result, WarmerError};

/// How a fan-out call waits on its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationMode {
    FireAndForget,
    RequestResponse,
}

impl From<InvocationMode> for InvocationType {
    fn from(mode: InvocationMode) -> Self {
        match mode {
            InvocationMode::FireAndForget => InvocationType::Event,
            InvocationMode::RequestResponse => InvocationType::RequestResponse,
        }
    }
}

#[async_trait]
pub trait Invoker: Send + Sync {
    async fn invoke(&self, target: &str, payload: &Value, mode: InvocationMode) -> Result<()>;
}

/// Invokes functions through the Lambda `Invoke` API.
#[derive(Debug, Clone)]
pub struct LambdaInvoker {
    client: aws_sdk_lambda::Client,
}

impl LambdaInvoker {
    pub fn new(client: aws_sdk_lambda::Client) -> Self {
        Self { client }
    }

    // Credentials and region come from the execution role
    pub async fn from_env() -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(aws_sdk_lambda::Client::new(&config))
    }
}

#[async_trait]
impl Invoker for LambdaInvoker {
    async fn invoke(&self, target: &str, payload: &Value, mode: InvocationMode) -> Result<()> {
        let body = serde_json::to_vec(payload)?;
        let output = self
            .client
            .invoke()
            .function_name(target)
            .invocation_type(mode.into())
            .payload(Blob::new(body))
            .send()
            .await
            .map_err(|e| WarmerError::Invoke { target: target.to_string(), source: Box::new(e) })?;

        if let Some(function_error) = output.function_error() {
            tracing::warn!(function = target, function_error, "warm-up target reported an error");
        }
        Ok(())
    }
}

#[async_trait]
impl<T: Invoker + ?Sized> Invoker for Arc<T> {
    async fn invoke(&self, target: &str, payload: &Value, mode: InvocationMode) -> Result<()> {
        (**self).invoke(target, payload, mode).await
    }
}
