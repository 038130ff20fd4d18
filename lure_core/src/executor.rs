use crate::harness::Outcome;
use std::panic::{AssertUnwindSafe, catch_unwind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionStatus {
    /// The harness returned normally.
    Completed(Outcome),
    /// The harness panicked; carries the panic message.
    Crash(String),
}

pub trait Executor {
    fn execute_sync(&mut self, data: &[u8]) -> ExecutionStatus;
}

/// Runs a harness function on the current thread, turning panics into
/// [`ExecutionStatus::Crash`].
///
/// Aborts, stack overflows and sanitizer reports still take the process down;
/// only unwinding panics are caught.
pub struct InProcessExecutor<F>
where
    F: Fn(&[u8]) -> Outcome,
{
    harness_fn: F,
}

impl<F> InProcessExecutor<F>
where
    F: Fn(&[u8]) -> Outcome,
{
    pub fn new(harness_fn: F) -> Self {
        Self { harness_fn }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic type".to_string()
    }
}

impl<F> Executor for InProcessExecutor<F>
where
    F: Fn(&[u8]) -> Outcome,
{
    fn execute_sync(&mut self, data: &[u8]) -> ExecutionStatus {
        match catch_unwind(AssertUnwindSafe(|| (self.harness_fn)(data))) {
            Ok(outcome) => ExecutionStatus::Completed(outcome),
            Err(payload) => ExecutionStatus::Crash(panic_message(payload.as_ref())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn picky_harness(data: &[u8]) -> Outcome {
        match data {
            [] => Outcome::Rejected,
            b"BAD" => panic!("BAD input detected by harness!"),
            [b'C', b'R', rest @ ..] => panic!("CRASH with {} trailing bytes", rest.len()),
            _ => Outcome::Exercised,
        }
    }

    #[test]
    fn completed_runs_report_their_outcome() {
        let mut executor = InProcessExecutor::new(picky_harness);
        assert_eq!(
            executor.execute_sync(b"fine"),
            ExecutionStatus::Completed(Outcome::Exercised)
        );
        assert_eq!(
            executor.execute_sync(&[]),
            ExecutionStatus::Completed(Outcome::Rejected)
        );
    }

    #[test]
    fn panics_become_crashes_with_their_message() {
        let mut executor = InProcessExecutor::new(picky_harness);
        assert_eq!(
            executor.execute_sync(b"BAD"),
            ExecutionStatus::Crash("BAD input detected by harness!".to_string())
        );
        assert_eq!(
            executor.execute_sync(b"CRAS"),
            ExecutionStatus::Crash("CRASH with 2 trailing bytes".to_string())
        );
    }

    #[test]
    fn executor_survives_repeated_crashes() {
        let mut executor = InProcessExecutor::new(picky_harness);
        for _ in 0..3 {
            assert!(matches!(
                executor.execute_sync(b"BAD"),
                ExecutionStatus::Crash(_)
            ));
        }
        assert_eq!(
            executor.execute_sync(b"ok"),
            ExecutionStatus::Completed(Outcome::Exercised)
        );
    }
}
