//! Local driver for running harnesses outside of a fuzzing engine: replaying
//! saved inputs and short mutation loops that catch panics and save crashing
//! inputs.

use crate::corpus::{Corpus, CorpusError, EntryOrigin};
use crate::executor::{ExecutionStatus, Executor, InProcessExecutor};
use crate::feedback::{Feedback, UniqueInputFeedback};
use crate::harness::{Harness, HarnessContext, Outcome, run_one_input};
use crate::mutator::{FlipSingleByteMutator, Mutator};
use crate::oracle::{BugReport, CrashOracle, Oracle};
use crate::scheduler::{RandomScheduler, Scheduler, SchedulerError};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Largest corpus a smoke loop grows to.
pub const MAX_CORPUS_ENTRIES: usize = 4096;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Corpus(#[from] CorpusError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error("Failed to write crash artifact {path:?}: {source}")]
    Artifact {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize crash report: {0}")]
    Report(#[from] serde_json::Error),
}

/// Counters for one session.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SessionStats {
    pub executions: u64,
    pub exercised: u64,
    pub rejected: u64,
    pub staging_unavailable: u64,
    pub crashes: u64,
    pub unique_crashes: u64,
    pub corpus_len: usize,
}

/// Writes `crash-<md5>` holding the input and `crash-<md5>.json` holding
/// the report into `dir`. Returns the path of the input file.
pub fn write_crash_artifacts(
    dir: &Path,
    report: &BugReport<Vec<u8>>,
) -> Result<PathBuf, SessionError> {
    let artifact_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| SessionError::Artifact { path, source }
    };
    fs::create_dir_all(dir).map_err(artifact_err(dir))?;

    let input_path = dir.join(format!("crash-{}", report.input_hash));
    fs::write(&input_path, &report.input).map_err(artifact_err(&input_path))?;

    let report_path = dir.join(format!("crash-{}.json", report.input_hash));
    let json = serde_json::to_string_pretty(report)?;
    fs::write(&report_path, json).map_err(artifact_err(&report_path))?;
    Ok(input_path)
}

/// Runs one harness against inputs and records what happened.
pub struct Session<'h> {
    harness: &'h dyn Harness,
    ctx: HarnessContext,
    crash_dir: Option<PathBuf>,
    oracle: CrashOracle,
    seen_crashes: HashSet<String>,
    stats: SessionStats,
}

impl<'h> Session<'h> {
    pub fn new(harness: &'h dyn Harness, ctx: HarnessContext) -> Self {
        Self {
            harness,
            ctx,
            crash_dir: None,
            oracle: CrashOracle::new(),
            seen_crashes: HashSet::new(),
            stats: SessionStats::default(),
        }
    }

    /// Save crashing inputs under `dir`.
    pub fn with_crash_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.crash_dir = Some(dir.into());
        self
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Runs one input and books the result. New crashes are logged and, with
    /// a crash directory set, saved.
    pub fn execute(&mut self, input: &[u8]) -> Result<ExecutionStatus, SessionError> {
        let status = {
            let harness = self.harness;
            let ctx = &self.ctx;
            InProcessExecutor::new(|data: &[u8]| run_one_input(harness, ctx, data))
                .execute_sync(input)
        };
        self.stats.executions += 1;

        match &status {
            ExecutionStatus::Completed(Outcome::Exercised) => self.stats.exercised += 1,
            ExecutionStatus::Completed(Outcome::Rejected) => self.stats.rejected += 1,
            ExecutionStatus::Completed(Outcome::StagingUnavailable) => {
                self.stats.staging_unavailable += 1
            }
            ExecutionStatus::Crash(_) => self.stats.crashes += 1,
        }

        let report = match &status {
            ExecutionStatus::Crash(_) => {
                self.oracle.examine(self.harness.name(), &input.to_vec(), &status)
            }
            ExecutionStatus::Completed(_) => None,
        };
        if let Some(report) = report {
            self.record_crash(&report)?;
        }
        Ok(status)
    }

    fn record_crash(&mut self, report: &BugReport<Vec<u8>>) -> Result<(), SessionError> {
        if !self.seen_crashes.insert(report.input_hash.clone()) {
            return Ok(());
        }
        self.stats.unique_crashes += 1;
        warn!(
            harness = %report.harness,
            hash = %report.input_hash,
            len = report.input_len,
            description = %report.description,
            "harness crashed"
        );
        if let Some(dir) = &self.crash_dir {
            let saved = write_crash_artifacts(dir, report)?;
            info!(path = %saved.display(), "crashing input saved");
        }
        Ok(())
    }

    /// Runs every input in `corpus` once, in ID order.
    pub fn replay(
        &mut self,
        corpus: &dyn Corpus<Vec<u8>>,
    ) -> Result<SessionStats, SessionError> {
        for id in 0..corpus.len() {
            let (input, _) = corpus.get(id).ok_or(CorpusError::InputNotFound(id))?;
            self.execute(input)?;
        }
        self.stats.corpus_len = corpus.len();
        info!(
            harness = self.harness.name(),
            executions = self.stats.executions,
            crashes = self.stats.crashes,
            "replay finished"
        );
        Ok(self.stats.clone())
    }

    /// Mutation loop seeded from `corpus`: pick an entry, flip a byte, run
    /// it, keep novel inputs. An empty corpus starts from a single empty
    /// input. The same seed and corpus give the same sequence of inputs.
    pub fn smoke(
        &mut self,
        corpus: &mut dyn Corpus<Vec<u8>>,
        iterations: u64,
        seed: u64,
    ) -> Result<SessionStats, SessionError> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut scheduler = RandomScheduler::new();
        let mut mutator = FlipSingleByteMutator;
        let mut feedback = UniqueInputFeedback::new(MAX_CORPUS_ENTRIES);

        if corpus.is_empty() {
            corpus.add(Vec::new(), EntryOrigin::Placeholder);
        }
        feedback.init(&*corpus);

        let progress_every = (iterations / 10).max(1);
        for i in 0..iterations {
            let parent = scheduler.next(&*corpus, &mut rng)?;
            let base = corpus
                .get(parent)
                .map(|(input, _)| input.clone())
                .ok_or(CorpusError::InputNotFound(parent))?;
            let candidate = mutator.mutate(Some(&base), &mut rng);

            let status = self.execute(&candidate)?;
            feedback.observe(candidate, parent, &status, &mut *corpus);

            if (i + 1) % progress_every == 0 {
                info!(
                    harness = self.harness.name(),
                    iteration = i + 1,
                    corpus = corpus.len(),
                    crashes = self.stats.unique_crashes,
                    "smoke progress"
                );
            }
        }
        self.stats.corpus_len = corpus.len();
        Ok(self.stats.clone())
    }
}
