use lure_core::executor::ExecutionStatus;
use lure_core::harness::{Harness, HarnessContext, Outcome, run_one_input};
use lure_core::session::Session;
use lure_core::staging::StagingTemplate;
use lure_core::targets::all_harnesses;
use std::fs;
use std::path::Path;

const LARGE_INPUT_LEN: usize = 256 * 1024;

fn entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn inputs() -> Vec<Vec<u8>> {
    vec![
        Vec::new(),
        vec![0x01],
        b"\x01\x00http://example.com/a?b#c".to_vec(),
        b"ply\nformat ascii 1.0\nelement vertex 1\nproperty float x\nend_header\n1\n".to_vec(),
        (0..LARGE_INPUT_LEN).map(|i| (i % 253) as u8).collect(),
    ]
}

#[test]
fn no_staged_file_outlives_an_invocation() {
    let staging = tempfile::tempdir().unwrap();
    fs::write(staging.path().join("keep-me"), b"not ours").unwrap();
    let before = entries(staging.path());
    let ctx = HarnessContext::new(StagingTemplate::in_dir(staging.path()), 1024 * 1024);

    for harness in all_harnesses() {
        for input in inputs() {
            let outcome = run_one_input(harness.as_ref(), &ctx, &input);
            assert_ne!(
                outcome,
                Outcome::StagingUnavailable,
                "{} could not stage into a writable directory",
                harness.name()
            );
            assert_eq!(
                entries(staging.path()),
                before,
                "{} left files behind for a {} byte input",
                harness.name(),
                input.len()
            );
        }
    }
}

#[test]
fn every_harness_terminates_on_edge_inputs() {
    let staging = tempfile::tempdir().unwrap();
    let ctx = HarnessContext::new(StagingTemplate::in_dir(staging.path()), LARGE_INPUT_LEN);

    for harness in all_harnesses() {
        for input in inputs() {
            let outcome = run_one_input(harness.as_ref(), &ctx, &input);
            if input.len() < harness.min_len() {
                assert_eq!(outcome, Outcome::Rejected, "{}", harness.name());
            }
        }
        let oversized = vec![0u8; LARGE_INPUT_LEN + 1];
        assert_eq!(
            run_one_input(harness.as_ref(), &ctx, &oversized),
            Outcome::Rejected,
            "{} should refuse inputs over the limit",
            harness.name()
        );
    }
}

#[test]
fn missing_staging_directory_makes_file_harnesses_no_ops() {
    let ctx = HarnessContext::new(
        StagingTemplate::in_dir("/nonexistent/lure/staging"),
        1024 * 1024,
    );
    for name in ["scene-archive", "image-scanlines"] {
        let harness = lure_core::targets::harness_by_name(name).unwrap();
        assert_eq!(
            run_one_input(harness.as_ref(), &ctx, b"some bytes"),
            Outcome::StagingUnavailable
        );
    }
}

#[test]
fn test_one_input_reports_success() {
    for harness in all_harnesses() {
        assert_eq!(lure_core::harness::test_one_input(harness.as_ref(), b"\x00\x01\x02"), 0);
    }
}

/// Stages its input, then panics while the staged file is still open.
struct PanicsWhileStaged;

impl Harness for PanicsWhileStaged {
    fn name(&self) -> &'static str {
        "panics-while-staged"
    }

    fn exercise(&self, data: &[u8], ctx: &HarnessContext) -> Outcome {
        let Some(staged) = ctx.stage(data) else {
            return Outcome::StagingUnavailable;
        };
        assert!(staged.path().exists());
        panic!("target blew up reading {}", staged.path().display());
    }
}

#[test]
fn staged_file_is_removed_when_the_target_panics() {
    let staging = tempfile::tempdir().unwrap();
    let ctx = HarnessContext::new(StagingTemplate::in_dir(staging.path()), 1024 * 1024);
    let mut session = Session::new(&PanicsWhileStaged, ctx);

    for input in inputs() {
        let status = session.execute(&input).unwrap();
        assert!(
            matches!(status, ExecutionStatus::Crash(_)),
            "Expected a crash for a {} byte input, got {:?}",
            input.len(),
            status
        );
        assert!(
            entries(staging.path()).is_empty(),
            "staged file survived a panic for a {} byte input",
            input.len()
        );
    }
    assert_eq!(session.stats().crashes, inputs().len() as u64);
}
