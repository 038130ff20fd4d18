use crate::harness::{DEFAULT_MAX_INPUT_LEN, HarnessContext};
use crate::staging::{StagingError, StagingTemplate};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct StagingSettings {
    /// mkstemp-style template such as `/dev/shm/fuzz-XXXXXX`. Unset means
    /// `/dev/shm` when it exists, else the system temp directory.
    #[serde(default)]
    pub template: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct LimitSettings {
    #[serde(default = "default_max_input_len")]
    pub max_input_len: usize,
}

fn default_max_input_len() -> usize {
    DEFAULT_MAX_INPUT_LEN
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            max_input_len: default_max_input_len(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct RunnerSettings {
    #[serde(default = "default_iterations")]
    pub max_iterations: u64,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

pub fn default_iterations() -> u64 {
    10_000
}
pub fn default_seed() -> u64 {
    0x6c75_7265
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            max_iterations: default_iterations(),
            seed: default_seed(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct CorpusConfig {
    #[serde(default)]
    pub initial_seed_paths: Option<Vec<PathBuf>>,
    #[serde(default = "default_crash_dir")]
    pub crash_dir: PathBuf,
}

pub fn default_crash_dir() -> PathBuf {
    PathBuf::from("./.lure_crashes")
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            initial_seed_paths: None,
            crash_dir: default_crash_dir(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct LureConfig {
    #[serde(default)]
    pub staging: StagingSettings,
    #[serde(default)]
    pub limits: LimitSettings,
    #[serde(default)]
    pub runner: RunnerSettings,
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl LureConfig {
    pub fn load_from_file(path: &PathBuf) -> Result<Self, anyhow::Error> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file at {:?}: {}", path, e))?;

        let config: LureConfig = toml::from_str(&content).map_err(|e| {
            anyhow::anyhow!("Failed to parse TOML from config file {:?}: {}", path, e)
        })?;

        Ok(config)
    }

    /// Harness settings described by the `[staging]` and `[limits]` tables.
    pub fn harness_context(&self) -> Result<HarnessContext, StagingError> {
        let staging = match &self.staging.template {
            Some(template) => StagingTemplate::parse(template)?,
            None => StagingTemplate::default(),
        };
        Ok(HarnessContext::new(staging, self.limits.max_input_len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn empty_file_yields_defaults() {
        let config: LureConfig = toml::from_str("").unwrap();
        assert_eq!(config.limits.max_input_len, DEFAULT_MAX_INPUT_LEN);
        assert_eq!(config.runner.max_iterations, default_iterations());
        assert_eq!(config.corpus.crash_dir, default_crash_dir());
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.staging.template.is_none());
    }

    #[test]
    fn parses_every_section() {
        let config: LureConfig = toml::from_str(
            r#"
            [staging]
            template = "/tmp/lure-XXXXXXXX"

            [limits]
            max-input-len = 4096

            [runner]
            max-iterations = 12
            seed = 7

            [corpus]
            initial-seed-paths = ["seeds"]
            crash-dir = "crashes"

            [logging]
            level = "debug"
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.runner.seed, 7);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(
            config.corpus.initial_seed_paths,
            Some(vec![PathBuf::from("seeds")])
        );

        let ctx = config.harness_context().unwrap();
        assert_eq!(ctx.max_input_len, 4096);
        assert_eq!(ctx.staging.dir(), Path::new("/tmp"));
        assert_eq!(ctx.staging.placeholders(), 8);
    }

    #[test]
    fn unknown_keys_and_bad_templates_are_errors() {
        assert!(toml::from_str::<LureConfig>("[runner]\nthreads = 4\n").is_err());

        let config: LureConfig = toml::from_str("[staging]\ntemplate = \"/tmp/no-holes\"\n").unwrap();
        assert!(config.harness_context().is_err());
    }

    #[test]
    fn load_from_file_reports_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("lure.toml");
        let err = LureConfig::load_from_file(&missing).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));

        std::fs::write(&missing, "[limits]\nmax-input-len = 9\n").unwrap();
        let config = LureConfig::load_from_file(&missing).unwrap();
        assert_eq!(config.limits.max_input_len, 9);
    }
}
