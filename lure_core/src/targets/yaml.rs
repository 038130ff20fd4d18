//! Loads every YAML document in the input and dumps it back out.

use crate::harness::{Harness, HarnessContext, Outcome, discard};
use serde::Deserialize;
use serde_yaml::{Deserializer, Value};
use std::io::Write;
use tracing::debug;

/// Stop after this many documents even if the stream has more.
pub const MAX_DOCUMENTS: usize = 256;

/// Emitter settings taken from the first two input bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReformatFlags {
    /// Reload every dumped document and dump it a second time.
    pub canonical: bool,
    /// Hand the loader the raw bytes, which must be well-formed UTF-8.
    /// Otherwise invalid sequences are replaced with U+FFFD first.
    pub unicode: bool,
}

impl ReformatFlags {
    pub fn from_input(data: &[u8]) -> Option<Self> {
        match data {
            [first, second, ..] => Some(Self {
                canonical: first & 1 == 1,
                unicode: second & 1 == 1,
            }),
            _ => None,
        }
    }
}

/// Documents loaded and bytes written by one reformat pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReformatStats {
    pub documents: usize,
    pub emitted_bytes: usize,
}

fn dump(sink: &mut impl Write, value: &Value, stats: &mut ReformatStats) -> Option<String> {
    let text = discard("yaml dump", serde_yaml::to_string(value))?;
    discard("yaml write", sink.write_all(text.as_bytes()))?;
    stats.emitted_bytes += text.len();
    Some(text)
}

/// Loads documents from `data` one at a time and dumps each into `sink`,
/// stopping at the first document that fails either way.
pub fn reformat(data: &[u8], flags: ReformatFlags, sink: &mut impl Write) -> ReformatStats {
    let mut stats = ReformatStats::default();
    let lossy = (!flags.unicode).then(|| String::from_utf8_lossy(data));
    let documents = match &lossy {
        Some(text) => Deserializer::from_str(text),
        None => Deserializer::from_slice(data),
    };

    for document in documents.take(MAX_DOCUMENTS) {
        let Some(value) = discard("yaml load", Value::deserialize(document)) else {
            break;
        };
        stats.documents += 1;
        let Some(text) = dump(sink, &value, &mut stats) else {
            break;
        };
        if flags.canonical {
            let Some(reloaded) = discard("yaml reload", serde_yaml::from_str::<Value>(&text))
            else {
                break;
            };
            if dump(sink, &reloaded, &mut stats).is_none() {
                break;
            }
        }
    }
    stats
}

#[derive(Debug, Default, Clone, Copy)]
pub struct YamlReformatHarness;

impl Harness for YamlReformatHarness {
    fn name(&self) -> &'static str {
        "yaml-reformat"
    }

    fn min_len(&self) -> usize {
        2
    }

    fn exercise(&self, data: &[u8], _ctx: &HarnessContext) -> Outcome {
        let Some(flags) = ReformatFlags::from_input(data) else {
            return Outcome::Rejected;
        };
        let mut sink = match tempfile::tempfile() {
            Ok(file) => file,
            Err(e) => {
                debug!(error = %e, "no scratch file for yaml output");
                return Outcome::StagingUnavailable;
            }
        };
        let _ = reformat(data, flags, &mut sink);
        Outcome::Exercised
    }
}
