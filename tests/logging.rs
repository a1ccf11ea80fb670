use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use lambda_warmer::fakes::{FailingMetricSink, RecordingInvoker, RecordingMetricSink};
use lambda_warmer::{FunctionIdentity, Outcome, ProcessState, WarmerConfig, Warmer};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tracing::subscriber::DefaultGuard;

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Captured {
    fn records(&self) -> Vec<Value> {
        let bytes = self.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    fn with_message(&self, message: &str) -> Vec<Value> {
        self.records().into_iter().filter(|r| r["fields"]["message"] == message).collect()
    }
}

// JSON log lines for everything emitted on this thread while the guard lives
fn capture() -> (Captured, DefaultGuard) {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .json()
        .with_max_level(tracing::Level::TRACE)
        .with_writer(move || writer.clone())
        .finish();
    (captured, tracing::subscriber::set_default(subscriber))
}

fn warmer_with(
    config: WarmerConfig,
    invoker: RecordingInvoker,
) -> Warmer<RecordingInvoker, Arc<RecordingMetricSink>> {
    let state = Arc::new(ProcessState::new(FunctionIdentity::new("myFn", Some("7".into()))));
    Warmer::new(config, state, invoker, Arc::default())
}

#[tokio::test(start_paused = true)]
async fn each_warmer_ping_logs_one_record() {
    let (logs, _guard) = capture();
    let warmer = warmer_with(WarmerConfig::default(), RecordingInvoker::new());

    warmer.observe(&json!({"warmer": true, "concurrency": 3}), "123").await;
    let hop = json!({
        "warmer": true,
        "__WARMER_CONCURRENCY__": 3,
        "__WARMER_CORRELATION_ID__": "123",
        "__WARMER_INVOCATION__": 2,
    });
    warmer.observe(&hop, "456").await;

    let records = logs.with_message("warmer invocation");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["level"], "INFO");

    let mut first = records[0]["fields"].clone();
    first.as_object_mut().unwrap().remove("message");
    assert_eq!(
        first,
        json!({
            "action": "warmer",
            "function": "myFn",
            "function_version": "7",
            "correlation_id": "123",
            "instance_id": "123",
            "count": 1,
            "concurrency": 3,
            "is_warm": false,
        })
    );

    let second = &records[1]["fields"];
    assert_eq!(second["correlation_id"], "123");
    assert_eq!(second["instance_id"], "456");
    assert_eq!(second["count"], 2);
    assert_eq!(second["concurrency"], 3);
    assert_eq!(second["is_warm"], true);
}

#[tokio::test]
async fn real_requests_are_not_logged() {
    let (logs, _guard) = capture();
    let warmer = warmer_with(WarmerConfig::default(), RecordingInvoker::new());

    assert_eq!(warmer.observe(&json!({}), "1").await, Outcome::Passthrough);
    assert_eq!(warmer.observe(&json!({"warmer": false, "concurrency": 5}), "2").await, Outcome::Passthrough);

    assert!(logs.with_message("warmer invocation").is_empty());
}

#[tokio::test]
async fn failed_dispatch_logs_target_payload_and_error() {
    let (logs, _guard) = capture();
    let warmer = warmer_with(WarmerConfig::default(), RecordingInvoker::failing_on([3]));

    warmer.observe(&json!({"warmer": true, "concurrency": 3}), "123").await;

    let failures = logs.with_message("failed to invoke during warm up fan out");
    assert_eq!(failures.len(), 1);
    let fields = &failures[0]["fields"];
    assert_eq!(failures[0]["level"], "ERROR");
    assert_eq!(fields["function"], "myFn:7");
    let payload: Value = serde_json::from_str(fields["payload"].as_str().unwrap()).unwrap();
    assert_eq!(
        payload,
        json!({
            "warmer": true,
            "__WARMER_CONCURRENCY__": 3,
            "__WARMER_CORRELATION_ID__": "123",
            "__WARMER_INVOCATION__": 3,
        })
    );
    assert!(fields["error"].as_str().unwrap().contains("throttled invocation 3"));
}

#[tokio::test]
async fn oversized_concurrency_is_capped_with_a_warning() {
    let (logs, _guard) = capture();
    let warmer = warmer_with(WarmerConfig::default(), RecordingInvoker::new());

    let outcome = warmer.observe(&json!({"warmer": true, "concurrency": 9.0e18}), "1").await;

    let Outcome::Warmed(report) = outcome else { panic!("expected a warmer outcome") };
    assert_eq!(report.attempted.len(), 999);
    let warnings = logs.with_message("requested warmer concurrency exceeds the maximum, capping");
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0]["fields"]["max"], 1000);
}

#[tokio::test]
async fn metric_failure_is_logged_and_swallowed() {
    let (logs, _guard) = capture();
    let config = WarmerConfig::builder().send_metric(true).build().unwrap();
    let state = Arc::new(ProcessState::new(FunctionIdentity::new("myFn", None)));
    let warmer = Warmer::new(config, state, RecordingInvoker::new(), FailingMetricSink);

    assert_eq!(warmer.observe(&json!({}), "1").await, Outcome::Passthrough);
    assert_eq!(warmer.observe(&json!({}), "2").await, Outcome::Passthrough);

    let warnings = logs.with_message("failed to record start metric");
    assert_eq!(warnings.len(), 2);
    assert_eq!(warnings[0]["level"], "WARN");
    assert_eq!(warnings[0]["fields"]["metric"], "ColdStart");
    assert_eq!(warnings[0]["fields"]["is_warmer"], false);
    assert_eq!(warnings[1]["fields"]["metric"], "WarmStart");
}
