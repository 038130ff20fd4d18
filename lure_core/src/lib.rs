pub mod config;
pub mod corpus;
pub mod executor;
pub mod feedback;
pub mod harness;
pub mod image;
pub mod input;
pub mod mutator;
pub mod oracle;
pub mod scheduler;
pub mod session;
pub mod staging;
pub mod targets;

pub use config::LureConfig;
pub use corpus::{Corpus, CorpusError, EntryOrigin, InMemoryCorpus};
pub use executor::{ExecutionStatus, Executor, InProcessExecutor};
pub use feedback::{Feedback, UniqueInputFeedback};
pub use harness::{Harness, HarnessContext, Outcome, run_one_input, test_one_input};
pub use image::{ImageBackend, ImageError, ImageInfo, ImageReader, MemImage, mem_open};
pub use input::Input;
pub use mutator::{FlipSingleByteMutator, Mutator};
pub use oracle::{BugReport, CrashOracle, Oracle};
pub use scheduler::{RandomScheduler, Scheduler, SchedulerError};
pub use session::{Session, SessionError, SessionStats};
pub use staging::{StagedFile, StagingError, StagingTemplate};
pub use targets::{all_harnesses, harness_by_name};
