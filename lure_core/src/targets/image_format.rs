//! Reads a staged OpenEXR image as one flat layer and as every layer.

use crate::harness::{Harness, HarnessContext, Outcome, discard};
use exr::meta::MetaData;
use exr::prelude::{read_all_flat_layers_from_file, read_first_flat_layer_from_file};
use std::path::Path;

/// Pixel decoding is skipped when all layers together hold more pixels
/// than this.
pub const MAX_PIXELS: usize = 1 << 24;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanlineSummary {
    pub headers: usize,
    /// Channels of the first layer, if it decoded.
    pub first_layer_channels: Option<usize>,
    /// Layers decoded by the all-layers pass, if it succeeded.
    pub layers: Option<usize>,
}

fn fits_pixel_budget(layer_sizes: impl IntoIterator<Item = (usize, usize)>) -> bool {
    layer_sizes
        .into_iter()
        .try_fold(0usize, |total, (width, height)| {
            total.checked_add(width.checked_mul(height)?)
        })
        .is_some_and(|total| total <= MAX_PIXELS)
}

/// Reads metadata leniently, then decodes pixels both ways when the image is
/// small enough. `None` when the metadata does not parse.
pub fn read_scanlines(path: &Path) -> Option<ScanlineSummary> {
    let meta = discard("exr metadata", MetaData::read_from_file(path, false))?;
    let mut summary = ScanlineSummary {
        headers: meta.headers.len(),
        ..ScanlineSummary::default()
    };
    let layer_sizes = meta
        .headers
        .iter()
        .map(|header| (header.layer_size.0, header.layer_size.1));
    if !fits_pixel_budget(layer_sizes) {
        return Some(summary);
    }

    let single = read_first_flat_layer_from_file(path);
    summary.first_layer_channels =
        discard("exr single part", single).map(|image| image.layer_data.channel_data.list.len());
    let multi = read_all_flat_layers_from_file(path);
    summary.layers = discard("exr multi part", multi).map(|image| image.layer_data.len());
    Some(summary)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ImageScanlinesHarness;

impl Harness for ImageScanlinesHarness {
    fn name(&self) -> &'static str {
        "image-scanlines"
    }

    fn exercise(&self, data: &[u8], ctx: &HarnessContext) -> Outcome {
        let Some(staged) = ctx.stage(data) else {
            return Outcome::StagingUnavailable;
        };
        let _ = read_scanlines(staged.path());
        Outcome::Exercised
    }
}
