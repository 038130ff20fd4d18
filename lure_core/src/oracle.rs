use crate::executor::ExecutionStatus;
use crate::input::Input;
use serde::Serialize;

/// Severity assigned to every crash `CrashOracle` reports.
const DEFAULT_CRASH_SEVERITY: u8 = 10;

/// A finding worth saving, tied to the input that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct BugReport<I: Input> {
    #[serde(skip)]
    pub input: I,
    pub harness: String,
    pub description: String,
    /// Hex MD5 of the input; crash artifacts are named after it.
    pub input_hash: String,
    pub input_len: usize,
    pub severity: u8,
}

/// Decides whether an execution produced a bug.
pub trait Oracle<I: Input>: Send + Sync {
    fn examine(&self, harness: &str, input: &I, status: &ExecutionStatus) -> Option<BugReport<I>>;
}

/// Reports every crash and nothing else.
#[derive(Debug, Default)]
pub struct CrashOracle;

impl CrashOracle {
    pub fn new() -> Self {
        CrashOracle
    }
}

impl<I: Input> Oracle<I> for CrashOracle {
    fn examine(&self, harness: &str, input: &I, status: &ExecutionStatus) -> Option<BugReport<I>> {
        match status {
            ExecutionStatus::Crash(description) => Some(BugReport {
                input: input.clone(),
                harness: harness.to_string(),
                description: description.clone(),
                input_hash: input.digest(),
                input_len: input.len(),
                severity: DEFAULT_CRASH_SEVERITY,
            }),
            ExecutionStatus::Completed(_) => None,
        }
    }
}
