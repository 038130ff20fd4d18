use crate::staging::{StagedFile, StagingTemplate};
use std::fmt::Display;
use tracing::{debug, trace};

/// Inputs above this size are rejected unless configured otherwise.
pub const DEFAULT_MAX_INPUT_LEN: usize = 1024 * 1024;

/// How a single harness invocation ended.
///
/// None of these are failures. A crash inside the target is not an outcome:
/// it takes the process down and is the fuzzing driver's business.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The input never reached the target (too short, too long, wrong shape).
    Rejected,
    /// The input could not be staged on disk; the invocation is a no-op.
    StagingUnavailable,
    /// The target library was invoked with the input.
    Exercised,
}

/// Per-invocation settings shared by all harnesses.
#[derive(Debug, Clone)]
pub struct HarnessContext {
    pub staging: StagingTemplate,
    pub max_input_len: usize,
}

impl HarnessContext {
    pub fn new(staging: StagingTemplate, max_input_len: usize) -> Self {
        Self {
            staging,
            max_input_len,
        }
    }

    /// Stages `data` as a file, logging why when that is impossible.
    pub fn stage(&self, data: &[u8]) -> Option<StagedFile> {
        match self.staging.stage(data) {
            Ok(staged) => Some(staged),
            Err(e) => {
                debug!(error = %e, "staging unavailable, skipping input");
                None
            }
        }
    }
}

impl Default for HarnessContext {
    fn default() -> Self {
        Self::new(StagingTemplate::default(), DEFAULT_MAX_INPUT_LEN)
    }
}

/// One fuzzing entry point wrapped around one target library.
pub trait Harness: Send + Sync {
    fn name(&self) -> &'static str;

    /// Shortest input worth handing to the target.
    fn min_len(&self) -> usize {
        0
    }

    /// Stages `data` if needed, drives the target and tears everything down.
    /// Errors reported by the target are swallowed.
    fn exercise(&self, data: &[u8], ctx: &HarnessContext) -> Outcome;
}

/// Runs one input through `harness`, applying the size checks first.
pub fn run_one_input(harness: &dyn Harness, ctx: &HarnessContext, data: &[u8]) -> Outcome {
    if data.len() < harness.min_len() || data.len() > ctx.max_input_len {
        trace!(
            harness = harness.name(),
            len = data.len(),
            "input rejected by size"
        );
        return Outcome::Rejected;
    }
    let outcome = harness.exercise(data, ctx);
    trace!(harness = harness.name(), len = data.len(), ?outcome, "input done");
    outcome
}

/// The libFuzzer-style boundary: runs with default settings and always
/// reports success.
pub fn test_one_input(harness: &dyn Harness, data: &[u8]) -> i32 {
    let _ = run_one_input(harness, &HarnessContext::default(), data);
    0
}

/// Turns a target library error into `None`.
///
/// Library-side rejections are expected outcomes for fuzz inputs and must
/// never surface as harness errors.
pub fn discard<T, E: Display>(step: &'static str, result: Result<T, E>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            trace!(step, error = %e, "target returned an error");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHarness {
        calls: AtomicUsize,
    }

    impl Harness for CountingHarness {
        fn name(&self) -> &'static str {
            "counting"
        }
        fn min_len(&self) -> usize {
            2
        }
        fn exercise(&self, _data: &[u8], _ctx: &HarnessContext) -> Outcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Outcome::Exercised
        }
    }

    #[test]
    fn run_one_input_applies_size_limits() {
        let harness = CountingHarness {
            calls: AtomicUsize::new(0),
        };
        let mut ctx = HarnessContext::default();
        ctx.max_input_len = 4;

        assert_eq!(run_one_input(&harness, &ctx, &[1]), Outcome::Rejected);
        assert_eq!(run_one_input(&harness, &ctx, &[1; 5]), Outcome::Rejected);
        assert_eq!(run_one_input(&harness, &ctx, &[1, 2]), Outcome::Exercised);
        assert_eq!(harness.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_one_input_always_returns_zero() {
        let harness = CountingHarness {
            calls: AtomicUsize::new(0),
        };
        assert_eq!(test_one_input(&harness, &[]), 0);
        assert_eq!(test_one_input(&harness, b"abc"), 0);
        assert_eq!(harness.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn discard_keeps_values_and_drops_errors() {
        assert_eq!(discard("ok", Ok::<_, String>(3)), Some(3));
        assert_eq!(discard("err", Err::<u8, _>("bad input")), None);
    }
}
