use crate::corpus::{Corpus, EntryOrigin};
use crate::executor::ExecutionStatus;
use crate::harness::Outcome;
use crate::input::Input;
use std::collections::HashSet;

/// Decides which executed inputs join the corpus.
pub trait Feedback<I: Input>: Send + Sync {
    /// Marks the inputs already in `corpus` as known.
    fn init(&mut self, corpus: &dyn Corpus<I>);

    /// Adds `input` to `corpus` if it is worth keeping. Returns the new ID.
    fn observe(
        &mut self,
        input: I,
        parent: usize,
        status: &ExecutionStatus,
        corpus: &mut dyn Corpus<I>,
    ) -> Option<usize>;
}

/// Keeps every input with an MD5 not seen before that reached the target,
/// up to `max_entries` corpus entries.
#[derive(Debug)]
pub struct UniqueInputFeedback {
    known_hashes: HashSet<[u8; 16]>,
    max_entries: usize,
}

impl UniqueInputFeedback {
    pub fn new(max_entries: usize) -> Self {
        Self {
            known_hashes: HashSet::new(),
            max_entries,
        }
    }

    pub fn known(&self) -> usize {
        self.known_hashes.len()
    }
}

impl<I: Input> Feedback<I> for UniqueInputFeedback {
    fn init(&mut self, corpus: &dyn Corpus<I>) {
        for id in 0..corpus.len() {
            if let Some((input, _)) = corpus.get(id) {
                self.known_hashes.insert(md5::compute(input.as_bytes()).0);
            }
        }
    }

    fn observe(
        &mut self,
        input: I,
        parent: usize,
        status: &ExecutionStatus,
        corpus: &mut dyn Corpus<I>,
    ) -> Option<usize> {
        if *status != ExecutionStatus::Completed(Outcome::Exercised)
            || corpus.len() >= self.max_entries
        {
            return None;
        }
        if !self.known_hashes.insert(md5::compute(input.as_bytes()).0) {
            return None;
        }
        Some(corpus.add(input, EntryOrigin::Mutation { parent }))
    }
}
