use std::env;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// Name and optional version of the running function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionIdentity {
    name: String,
    version: Option<String>,
}

impl FunctionIdentity {
    pub fn new(name: impl Into<String>, version: Option<String>) -> Self {
        Self { name: name.into(), version }
    }

    // Lambda sets both variables in every execution environment
    pub fn from_env() -> Self {
        let name = env::var("AWS_LAMBDA_FUNCTION_NAME").unwrap_or_else(|_| "unknown-function".to_string());
        let version = env::var("AWS_LAMBDA_FUNCTION_VERSION").ok().filter(|v| !v.is_empty());
        Self::new(name, version)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    // Qualified with the version when known
    pub fn target(&self) -> String {
        match &self.version {
            Some(version) => format!("{}:{}", self.name, version),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for FunctionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.target())
    }
}

/// State that lives as long as one execution environment.
///
/// Built once at start-up and shared by reference with every invocation the
/// environment serves.
#[derive(Debug)]
pub struct ProcessState {
    is_warm: AtomicBool,
    function: FunctionIdentity,
}

impl ProcessState {
    pub fn new(function: FunctionIdentity) -> Self {
        Self { is_warm: AtomicBool::new(false), function }
    }

    pub fn from_env() -> Self {
        Self::new(FunctionIdentity::from_env())
    }

    pub fn is_warm(&self) -> bool {
        self.is_warm.load(Ordering::SeqCst)
    }

    /// Marks the environment warm and returns whether it already was.
    pub fn mark_warm(&self) -> bool {
        self.is_warm.swap(true, Ordering::SeqCst)
    }

    pub fn function(&self) -> &FunctionIdentity {
        &self.function
    }
}
