//! Keeps Lambda functions warm.
//!
//! Wrap a handler with [`wrap`] and schedule pings such as
//! `{"warmer": true, "concurrency": 3}`. A ping marks the execution
//! environment warm and, when concurrency is above one, invokes the same
//! function N-1 more times so N environments stay initialized. Pings never
//! reach the wrapped handler; real requests pass through untouched.

pub mod classifier;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod fakes;
pub mod metrics;
pub mod state;
pub mod transport;
pub mod warmer;

pub use classifier::InvocationRequest;
pub use config::{WarmerConfig, WarmerConfigBuilder};
pub use dispatcher::{DispatchReport, Dispatcher, FanOutCall, FanOutCalls, FanOutPlan};
pub use error::{Result, WarmerError};
pub use metrics::{EmfMetricSink, MetricSink, Reporter, StartKind, StartMetric, StartReport};
pub use state::{FunctionIdentity, ProcessState};
pub use transport::{InvocationMode, Invoker, LambdaInvoker};
pub use warmer::{wrap, Outcome, Warmed, Warmer};
