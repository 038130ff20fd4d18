use crate::corpus::Corpus;
use crate::input::Input;
use rand_core::RngCore;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchedulerError {
    /// Nothing to schedule.
    #[error("Corpus is empty, cannot schedule next input")]
    CorpusEmpty,
}

/// Picks the corpus entry the runner mutates next.
pub trait Scheduler<I: Input>: Send + Sync {
    fn next(&mut self, corpus: &dyn Corpus<I>, rng: &mut dyn RngCore)
    -> Result<usize, SchedulerError>;
}

/// Uniform selection with no memory of past outcomes.
#[derive(Default, Debug)]
pub struct RandomScheduler;

impl RandomScheduler {
    pub fn new() -> Self {
        RandomScheduler
    }
}

impl<I: Input> Scheduler<I> for RandomScheduler {
    fn next(
        &mut self,
        corpus: &dyn Corpus<I>,
        rng: &mut dyn RngCore,
    ) -> Result<usize, SchedulerError> {
        corpus
            .random_select(rng)
            .map(|(id, _)| id)
            .ok_or(SchedulerError::CorpusEmpty)
    }
}
