use crate::input::Input;
use rand_core::RngCore;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while filling or reading a corpus.
#[derive(Error, Debug)]
pub enum CorpusError {
    /// The requested input ID was not found within the corpus.
    #[error("Input ID {0} not found in corpus")]
    InputNotFound(usize),

    /// A seed path could not be read.
    #[error("Failed to read seed {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Where a corpus entry came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOrigin {
    /// Loaded from a seed file.
    Seed(PathBuf),
    /// Added by the runner when no seeds were available.
    Placeholder,
    /// Mutated from the entry with the given ID.
    Mutation { parent: usize },
}

/// A collection of inputs the runner draws from.
pub trait Corpus<I: Input>: Send + Sync {
    /// Adds `input` and returns the ID assigned to it.
    fn add(&mut self, input: I, origin: EntryOrigin) -> usize;

    fn get(&self, id: usize) -> Option<(&I, &EntryOrigin)>;

    /// Picks an entry uniformly at random. `None` when the corpus is empty.
    fn random_select(&self, rng: &mut dyn RngCore) -> Option<(usize, &I)>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Loads every seed at `seed_paths`. A path may name a file or a
    /// directory; directories are read one level deep, dotfiles skipped, in
    /// name order so that runs are reproducible.
    ///
    /// Returns the number of seeds loaded.
    fn load_initial_seeds(&mut self, seed_paths: &[PathBuf]) -> Result<usize, CorpusError>;
}

/// Keeps every entry in a `Vec`.
#[derive(Debug)]
pub struct InMemoryCorpus<I: Input> {
    entries: Vec<(I, EntryOrigin)>,
}

impl<I: Input> InMemoryCorpus<I> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<I: Input> Default for InMemoryCorpus<I> {
    fn default() -> Self {
        Self::new()
    }
}

fn read_seed(path: &Path) -> Result<Vec<u8>, CorpusError> {
    fs::read(path).map_err(|source| CorpusError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn seed_files_in(dir: &Path) -> Result<Vec<PathBuf>, CorpusError> {
    let io_err = |source| CorpusError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let hidden = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with('.'));
        if path.is_file() && !hidden {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

impl<I: Input + From<Vec<u8>>> Corpus<I> for InMemoryCorpus<I> {
    fn add(&mut self, input: I, origin: EntryOrigin) -> usize {
        let id = self.entries.len();
        self.entries.push((input, origin));
        id
    }

    fn get(&self, id: usize) -> Option<(&I, &EntryOrigin)> {
        self.entries.get(id).map(|(input, origin)| (input, origin))
    }

    fn random_select(&self, rng: &mut dyn RngCore) -> Option<(usize, &I)> {
        if self.is_empty() {
            return None;
        }
        let index = rng.next_u64() as usize % self.entries.len();
        self.entries.get(index).map(|(input, _)| (index, input))
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn load_initial_seeds(&mut self, seed_paths: &[PathBuf]) -> Result<usize, CorpusError> {
        let mut loaded = 0;
        for path in seed_paths {
            let files = if path.is_dir() {
                seed_files_in(path)?
            } else {
                vec![path.clone()]
            };
            for file in files {
                let data = read_seed(&file)?;
                self.add(I::from(data), EntryOrigin::Seed(file));
                loaded += 1;
            }
        }
        Ok(loaded)
    }
}
