//! Opens a staged glTF scene archive and walks its node hierarchy.

use crate::harness::{Harness, HarnessContext, Outcome, discard};
use gltf::{Gltf, Node};
use std::collections::HashSet;
use std::path::Path;
use tracing::trace;

/// Nodes nested deeper than this are not visited.
pub const MAX_NODE_DEPTH: usize = 64;

/// Counts gathered while walking an archive.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SceneSummary {
    pub scenes: usize,
    pub nodes: usize,
    pub named_nodes: usize,
    pub primitives: usize,
    pub attributes: usize,
    pub materials: usize,
    pub max_depth: usize,
}

fn walk_node(
    node: Node<'_>,
    depth: usize,
    visited: &mut HashSet<usize>,
    summary: &mut SceneSummary,
) {
    if depth > MAX_NODE_DEPTH || !visited.insert(node.index()) {
        return;
    }
    summary.nodes += 1;
    summary.max_depth = summary.max_depth.max(depth);
    if node.name().is_some() {
        summary.named_nodes += 1;
    }
    let _ = node.transform().decomposed();

    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            summary.primitives += 1;
            for (semantic, accessor) in primitive.attributes() {
                trace!(?semantic, count = accessor.count(), "primitive attribute");
                summary.attributes += 1;
            }
            let _ = primitive.material().name();
        }
    }

    for child in node.children() {
        walk_node(child, depth + 1, visited, summary);
    }
}

/// Opens the archive at `path` and summarizes it. `None` when the archive is
/// not valid.
pub fn summarize(path: &Path) -> Option<SceneSummary> {
    let archive = discard("gltf open", Gltf::open(path))?;
    let mut summary = SceneSummary {
        scenes: archive.scenes().count(),
        materials: archive.materials().count(),
        ..SceneSummary::default()
    };

    let mut visited = HashSet::new();
    for scene in archive.scenes() {
        for root in scene.nodes() {
            walk_node(root, 0, &mut visited, &mut summary);
        }
    }
    Some(summary)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SceneArchiveHarness;

impl Harness for SceneArchiveHarness {
    fn name(&self) -> &'static str {
        "scene-archive"
    }

    fn exercise(&self, data: &[u8], ctx: &HarnessContext) -> Outcome {
        let Some(staged) = ctx.stage(data) else {
            return Outcome::StagingUnavailable;
        };
        let _ = summarize(staged.path());
        drop(staged);
        Outcome::Exercised
    }
}
