use rand::Rng;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Template used when nothing else is configured.
pub const DEFAULT_TEMPLATE: &str = "/dev/shm/fuzz-XXXXXX";
/// Fewest placeholder characters a template may carry.
pub const MIN_PLACEHOLDERS: usize = 6;

/// Fresh names tried before staging gives up on a crowded directory.
pub const MAX_NAME_ATTEMPTS: usize = 64;

const PLACEHOLDER: char = 'X';
const NAME_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

#[derive(Error, Debug)]
pub enum StagingError {
    #[error("Invalid staging template {template:?}: {reason}")]
    InvalidTemplate { template: String, reason: String },

    #[error("Failed to create staging file in {dir:?}: {source}")]
    Create { dir: PathBuf, source: io::Error },

    #[error("Failed to write staging file {path:?}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("Failed to remove staging file {path:?}: {source}")]
    Remove { path: PathBuf, source: io::Error },
}

/// Where and under which name pattern input buffers get staged on disk.
///
/// Parsed from a mkstemp-style template such as `/dev/shm/fuzz-XXXXXX`: the
/// trailing run of `X` characters is replaced by random characters when the
/// file is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingTemplate {
    dir: PathBuf,
    prefix: String,
    placeholders: usize,
}

impl StagingTemplate {
    pub fn parse(template: &str) -> Result<Self, StagingError> {
        let invalid = |reason: &str| StagingError::InvalidTemplate {
            template: template.to_string(),
            reason: reason.to_string(),
        };

        let path = Path::new(template);
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| invalid("template has no file name"))?;

        let (prefix, placeholders) = split_placeholders(file_name);
        if placeholders < MIN_PLACEHOLDERS {
            return Err(invalid(&format!(
                "file name must end in at least {MIN_PLACEHOLDERS} '{PLACEHOLDER}' characters"
            )));
        }

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        Ok(Self {
            dir,
            prefix: prefix.to_string(),
            placeholders,
        })
    }

    /// Same file name pattern, different directory.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Self::default()
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn placeholders(&self) -> usize {
        self.placeholders
    }

    /// Writes `data` to a freshly created, uniquely named file.
    ///
    /// Creation is exclusive and the file is readable only by its owner. A
    /// name that already exists is never reused; another candidate is drawn.
    pub fn stage(&self, data: &[u8]) -> Result<StagedFile, StagingError> {
        let mut rng = rand::rng();
        let create_err = |source| StagingError::Create {
            dir: self.dir.clone(),
            source,
        };

        for _ in 0..MAX_NAME_ATTEMPTS {
            let name = candidate_name(&self.prefix, self.placeholders, &mut rng);
            match tempfile::Builder::new()
                .prefix(&name)
                .rand_bytes(0)
                .tempfile_in(&self.dir)
            {
                Ok(file) => return Self::fill(file, data),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(create_err(e)),
            }
        }
        Err(create_err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no free name after {MAX_NAME_ATTEMPTS} attempts"),
        )))
    }

    fn fill(mut file: NamedTempFile, data: &[u8]) -> Result<StagedFile, StagingError> {
        // write_all resumes after partial writes and EINTR.
        file.write_all(data)
            .and_then(|()| file.flush())
            .map_err(|source| StagingError::Write {
                path: file.path().to_path_buf(),
                source,
            })?;

        Ok(StagedFile { file })
    }
}

/// Splits a file name into its prefix and the length of its trailing
/// placeholder run.
fn split_placeholders(file_name: &str) -> (&str, usize) {
    let prefix = file_name.trim_end_matches(PLACEHOLDER);
    (prefix, file_name.len() - prefix.len())
}

/// [`DEFAULT_TEMPLATE`], moved to the system temp directory when its own
/// directory does not exist.
impl Default for StagingTemplate {
    fn default() -> Self {
        let template = Path::new(DEFAULT_TEMPLATE);
        let dir = template
            .parent()
            .filter(|dir| dir.is_dir())
            .map_or_else(std::env::temp_dir, Path::to_path_buf);
        let (prefix, placeholders) = template
            .file_name()
            .and_then(|name| name.to_str())
            .map_or(("", MIN_PLACEHOLDERS), split_placeholders);
        Self {
            dir,
            prefix: prefix.to_string(),
            placeholders,
        }
    }
}

/// Candidate file name for `prefix` with `placeholders` random characters
/// drawn from `rng`. Uniqueness is not implied; only exclusive creation
/// guarantees it.
pub fn candidate_name<R: Rng + ?Sized>(prefix: &str, placeholders: usize, rng: &mut R) -> String {
    let mut name = String::with_capacity(prefix.len() + placeholders);
    name.push_str(prefix);
    for _ in 0..placeholders {
        let index = rng.random_range(0..NAME_ALPHABET.len());
        name.push(NAME_ALPHABET[index] as char);
    }
    name
}

/// A staged copy of an input buffer. The file is deleted on drop.
#[derive(Debug)]
pub struct StagedFile {
    file: NamedTempFile,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Deletes the file now, reporting failures instead of ignoring them.
    pub fn remove(self) -> Result<(), StagingError> {
        let path = self.file.path().to_path_buf();
        self.file
            .close()
            .map_err(|source| StagingError::Remove { path, source })
    }
}
