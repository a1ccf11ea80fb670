use std::env;
use std::time::Duration;

use crate::error::{Result, WarmerError};

/// Reserved payload key carrying the 1-based index of a fanned-out call.
pub const INVOCATION_KEY: &str = "__WARMER_INVOCATION__";
/// Reserved payload key carrying the total concurrency of a fan-out tree.
pub const CONCURRENCY_KEY: &str = "__WARMER_CONCURRENCY__";
/// Reserved payload key carrying the correlation id of a fan-out tree.
pub const CORRELATION_ID_KEY: &str = "__WARMER_CORRELATION_ID__";

const RESERVED_KEYS: [&str; 3] = [INVOCATION_KEY, CONCURRENCY_KEY, CORRELATION_ID_KEY];

pub const DEFAULT_FLAG: &str = "warmer";
pub const DEFAULT_CONCURRENCY: &str = "concurrency";
pub const DEFAULT_DELAY_MS: u64 = 75;
/// Upper bound on the concurrency a single ping may request, matching the
/// default per-account Lambda concurrency limit.
pub const MAX_CONCURRENCY: u64 = 1000;

/// Settings fixed when a handler is wrapped.
///
/// The flag and concurrency key names must not collide with keys the wrapped
/// application reads from its own payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarmerConfig {
    flag: String,
    concurrency: String,
    delay: Duration,
    send_metric: bool,
}

impl Default for WarmerConfig {
    fn default() -> Self {
        Self {
            flag: DEFAULT_FLAG.to_string(),
            concurrency: DEFAULT_CONCURRENCY.to_string(),
            delay: Duration::from_millis(DEFAULT_DELAY_MS),
            send_metric: false,
        }
    }
}

impl WarmerConfig {
    pub fn builder() -> WarmerConfigBuilder {
        WarmerConfigBuilder::default()
    }

    /// Reads `WARMER_FLAG`, `WARMER_CONCURRENCY`, `WARMER_DELAY_MS` and
    /// `WARMER_SEND_METRIC`, falling back to defaults for anything unset or
    /// unparseable.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();
        if let Some(flag) = lookup("WARMER_FLAG") {
            builder = builder.flag(flag);
        }
        if let Some(concurrency) = lookup("WARMER_CONCURRENCY") {
            builder = builder.concurrency(concurrency);
        }
        if let Some(delay_ms) = lookup("WARMER_DELAY_MS").and_then(|s| s.trim().parse::<u64>().ok()) {
            builder = builder.delay_ms(delay_ms);
        }
        if let Some(send_metric) = lookup("WARMER_SEND_METRIC").and_then(|s| parse_bool(&s)) {
            builder = builder.send_metric(send_metric);
        }
        builder.build()
    }

    pub fn flag(&self) -> &str {
        &self.flag
    }

    pub fn concurrency(&self) -> &str {
        &self.concurrency
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn send_metric(&self) -> bool {
        self.send_metric
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[derive(Debug, Default)]
pub struct WarmerConfigBuilder {
    flag: Option<String>,
    concurrency: Option<String>,
    delay_ms: Option<u64>,
    send_metric: Option<bool>,
}

impl WarmerConfigBuilder {
    pub fn flag(mut self, key: impl Into<String>) -> Self {
        self.flag = Some(key.into());
        self
    }

    pub fn concurrency(mut self, key: impl Into<String>) -> Self {
        self.concurrency = Some(key.into());
        self
    }

    pub fn delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = Some(delay_ms);
        self
    }

    pub fn send_metric(mut self, send_metric: bool) -> Self {
        self.send_metric = Some(send_metric);
        self
    }

    pub fn build(self) -> Result<WarmerConfig> {
        let flag = self.flag.unwrap_or_else(|| DEFAULT_FLAG.to_string());
        let concurrency = self.concurrency.unwrap_or_else(|| DEFAULT_CONCURRENCY.to_string());

        for (name, key) in [("flag", &flag), ("concurrency", &concurrency)] {
            if key.trim().is_empty() {
                return Err(WarmerError::InvalidConfig(format!("{name} key must not be empty")));
            }
            if RESERVED_KEYS.contains(&key.as_str()) {
                return Err(WarmerError::InvalidConfig(format!(
                    "{name} key `{key}` is reserved for fan-out payloads"
                )));
            }
        }
        if flag == concurrency {
            return Err(WarmerError::InvalidConfig(format!(
                "flag and concurrency keys must differ, both are `{flag}`"
            )));
        }

        Ok(WarmerConfig {
            flag,
            concurrency,
            delay: Duration::from_millis(self.delay_ms.unwrap_or(DEFAULT_DELAY_MS)),
            send_metric: self.send_metric.unwrap_or(false),
        })
    }
}
