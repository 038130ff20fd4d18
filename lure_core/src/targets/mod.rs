//! One harness per target library.

pub mod chem;
pub mod fat;
pub mod image_format;
pub mod mesh;
pub mod scene;
pub mod uri;
pub mod yaml;

use crate::harness::Harness;

pub use chem::ChemIdentifierHarness;
pub use fat::FatWalkHarness;
pub use image_format::ImageScanlinesHarness;
pub use mesh::MeshDecodeHarness;
pub use scene::SceneArchiveHarness;
pub use uri::UriParseHarness;
pub use yaml::YamlReformatHarness;

/// Every harness in the crate, in a stable order.
pub fn all_harnesses() -> Vec<Box<dyn Harness>> {
    vec![
        Box::new(SceneArchiveHarness),
        Box::new(MeshDecodeHarness),
        Box::new(ChemIdentifierHarness),
        Box::new(YamlReformatHarness),
        Box::new(ImageScanlinesHarness),
        Box::new(FatWalkHarness),
        Box::new(UriParseHarness),
    ]
}

pub fn harness_by_name(name: &str) -> Option<Box<dyn Harness>> {
    all_harnesses().into_iter().find(|h| h.name() == name)
}
