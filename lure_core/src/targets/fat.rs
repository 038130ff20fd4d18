//! Recursive directory listing of a FAT volume served from memory.

use crate::harness::{Harness, HarnessContext, Outcome, discard};
use crate::image::{ImageBackend, ImageInfo, ImageReader, mem_open};
use fatfs::{Dir, FileSystem, FsOptions, ReadWriteSeek};
use tracing::trace;

const MAX_DIR_DEPTH: usize = 32;
const MAX_ENTRIES: usize = 4096;

/// What a walk got through before it stopped.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FatListing {
    pub directories: usize,
    pub files: usize,
    pub bytes: u64,
    pub names: Vec<String>,
}

impl FatListing {
    fn entries(&self) -> usize {
        self.directories + self.files
    }
}

fn walk_dir<T: ReadWriteSeek>(
    dir: Dir<'_, T>,
    depth: usize,
    prefix: &str,
    listing: &mut FatListing,
) {
    for entry in dir.iter() {
        if listing.entries() >= MAX_ENTRIES {
            return;
        }
        let Some(entry) = discard("fat dir entry", entry) else {
            return;
        };
        let name = entry.file_name();
        if name == "." || name == ".." {
            continue;
        }
        let path = format!("{prefix}/{name}");
        let _ = entry.attributes();
        let _ = entry.modified();

        if entry.is_dir() {
            listing.directories += 1;
            listing.names.push(path.clone());
            if depth < MAX_DIR_DEPTH {
                walk_dir(entry.to_dir(), depth + 1, &path, listing);
            }
        } else {
            listing.files += 1;
            listing.bytes += entry.len();
            listing.names.push(path);
        }
    }
}

/// Mounts `data` as a FAT volume and lists it recursively.
///
/// `None` when the filesystem cannot be opened at all.
pub fn list_volume(data: &[u8]) -> Option<FatListing> {
    let image = mem_open(data);
    let listing = list_image(&image);
    image.close();
    listing
}

fn list_image<B: ImageBackend>(image: &ImageInfo<B>) -> Option<FatListing> {
    let reader = ImageReader::new(image);
    let fs = discard("fat open", FileSystem::new(reader, FsOptions::new()))?;
    trace!(fat_type = ?fs.fat_type(), label = %fs.volume_label(), "fat volume opened");
    let _ = discard("fat stats", fs.stats());

    let mut listing = FatListing::default();
    walk_dir(fs.root_dir(), 0, "", &mut listing);
    Some(listing)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FatWalkHarness;

impl Harness for FatWalkHarness {
    fn name(&self) -> &'static str {
        "fat-walk"
    }

    fn exercise(&self, data: &[u8], _ctx: &HarnessContext) -> Outcome {
        let _ = list_volume(data);
        Outcome::Exercised
    }
}
