use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

/// Sector size reported for every memory-backed image.
pub const SECTOR_SIZE: u32 = 512;
/// Number of slots in an image's block cache.
pub const CACHE_SLOTS: usize = 32;
/// Size of one cached block. Block offsets are aligned to this value.
pub const CACHE_BLOCK_SIZE: usize = 64 * 1024;

/// Errors produced by image backends and the cached read path.
#[derive(Error, Debug)]
pub enum ImageError {
    /// The read started beyond the declared image size. No data was read.
    #[error("offset {offset} is past the end of the image ({size} bytes)")]
    OffsetPastEnd { offset: u64, size: u64 },

    /// The backend failed to produce data for an in-range offset.
    #[error("image backend I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<ImageError> for io::Error {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::Io(inner) => inner,
            past_end @ ImageError::OffsetPastEnd { .. } => {
                io::Error::new(io::ErrorKind::UnexpectedEof, past_end)
            }
        }
    }
}

/// Kind of image behind an [`ImageInfo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageType {
    /// A flat, single-segment image with no container format.
    Raw,
}

/// The fixed callback contract an image source has to satisfy.
///
/// An implementation only has to move bytes; caching, locking and the
/// `std::io` adapter live in [`ImageInfo`] and [`ImageReader`].
pub trait ImageBackend: Send + Sync {
    /// Copies up to `buf.len()` bytes starting at `offset` into `buf`.
    ///
    /// Must fail with [`ImageError::OffsetPastEnd`] when `offset` is beyond the
    /// end of the image, and must clamp the copy so it never extends past the
    /// end. An offset exactly at the end yields `Ok(0)`.
    fn read(&self, offset: u64, buf: &mut [u8]) -> Result<usize, ImageError>;

    /// Releases whatever the backend holds. Called once, by [`ImageInfo::close`].
    fn close(&mut self);

    /// Writes backend-specific details about the image to `out`.
    fn imgstat(&self, out: &mut dyn Write) -> io::Result<()>;
}

/// A read-only image over a borrowed byte buffer.
///
/// The buffer is never copied; reads are served straight from it.
#[derive(Debug, Clone, Copy)]
pub struct MemImage<'a> {
    data: &'a [u8],
}

impl<'a> MemImage<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl ImageBackend for MemImage<'_> {
    fn read(&self, offset: u64, buf: &mut [u8]) -> Result<usize, ImageError> {
        // Real drivers bounds-check; emulate them exactly.
        let size = self.len();
        if offset > size {
            return Err(ImageError::OffsetPastEnd { offset, size });
        }
        let start = offset as usize;
        let read_len = buf.len().min(self.data.len() - start);
        buf[..read_len].copy_from_slice(&self.data[start..start + read_len]);
        Ok(read_len)
    }

    fn close(&mut self) {}

    fn imgstat(&self, _out: &mut dyn Write) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Debug)]
struct CacheSlot {
    offset: u64,
    age: u64,
    data: Vec<u8>,
}

/// Block cache state. A slot with `len[i] == 0` is empty.
#[derive(Debug)]
struct ImageCache {
    len: [usize; CACHE_SLOTS],
    slots: Vec<Option<CacheSlot>>,
    clock: u64,
}

impl ImageCache {
    fn new() -> Self {
        Self {
            len: [0; CACHE_SLOTS],
            slots: (0..CACHE_SLOTS).map(|_| None).collect(),
            clock: 0,
        }
    }

    fn lookup(&mut self, block_offset: u64) -> Option<usize> {
        self.clock += 1;
        let clock = self.clock;
        let index = (0..CACHE_SLOTS).find(|&i| {
            self.len[i] > 0
                && self.slots[i]
                    .as_ref()
                    .is_some_and(|slot| slot.offset == block_offset)
        })?;
        if let Some(slot) = self.slots[index].as_mut() {
            slot.age = clock;
        }
        Some(index)
    }

    /// Picks an empty slot if there is one, else the least recently used.
    fn victim(&self) -> usize {
        if let Some(empty) = (0..CACHE_SLOTS).find(|&i| self.len[i] == 0) {
            return empty;
        }
        (0..CACHE_SLOTS)
            .min_by_key(|&i| self.slots[i].as_ref().map_or(0, |slot| slot.age))
            .unwrap_or(0)
    }
}

/// An image handle: descriptor fields plus the backend that serves reads.
///
/// Mirrors the generic image structure forensic libraries expect: a type tag,
/// the declared size, the sector size, a lockable block cache, and the
/// read/close/stat backend.
#[derive(Debug)]
pub struct ImageInfo<B: ImageBackend> {
    itype: ImageType,
    size: u64,
    sector_size: u32,
    cache: Mutex<ImageCache>,
    backend: B,
}

impl<B: ImageBackend> ImageInfo<B> {
    /// Wraps `backend` as a raw image of `size` bytes.
    pub fn open(backend: B, size: u64) -> Self {
        Self {
            itype: ImageType::Raw,
            size,
            sector_size: SECTOR_SIZE,
            cache: Mutex::new(ImageCache::new()),
            backend,
        }
    }

    pub fn itype(&self) -> ImageType {
        self.itype
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn sector_size(&self) -> u32 {
        self.sector_size
    }

    /// Lengths of the cached blocks, one per slot.
    pub fn cache_len(&self) -> [usize; CACHE_SLOTS] {
        self.lock_cache().len
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn lock_cache(&self) -> MutexGuard<'_, ImageCache> {
        // Cache state is consistent between operations, so a poisoned lock is usable.
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Reads through the block cache.
    ///
    /// Requests that fit inside one cache block are served from the cache,
    /// filling the block on a miss; anything larger or straddling a block
    /// boundary goes straight to the backend.
    pub fn read(&self, offset: u64, buf: &mut [u8]) -> Result<usize, ImageError> {
        if offset > self.size {
            return Err(ImageError::OffsetPastEnd {
                offset,
                size: self.size,
            });
        }
        let block_offset = offset - offset % CACHE_BLOCK_SIZE as u64;
        let within = (offset - block_offset) as usize;
        if buf.is_empty() || within + buf.len() > CACHE_BLOCK_SIZE {
            return self.backend.read(offset, buf);
        }

        let mut cache = self.lock_cache();
        let index = match cache.lookup(block_offset) {
            Some(index) => index,
            None => {
                let index = cache.victim();
                let mut data = vec![0u8; CACHE_BLOCK_SIZE];
                let filled = self.backend.read(block_offset, &mut data)?;
                data.truncate(filled);
                cache.clock += 1;
                let age = cache.clock;
                cache.len[index] = filled;
                cache.slots[index] = Some(CacheSlot {
                    offset: block_offset,
                    age,
                    data,
                });
                index
            }
        };

        let cached = cache.slots[index]
            .as_ref()
            .map_or(&[][..], |slot| slot.data.as_slice());
        let available = cached.len().saturating_sub(within);
        let read_len = buf.len().min(available);
        buf[..read_len].copy_from_slice(&cached[within..within + read_len]);
        Ok(read_len)
    }

    /// Writes backend details to `out`.
    pub fn imgstat(&self, out: &mut dyn Write) -> io::Result<()> {
        self.backend.imgstat(out)
    }

    /// Closes the backend and drops the cache. Consumes the handle, so an
    /// image can only be closed once.
    pub fn close(mut self) {
        self.backend.close();
    }
}

/// Opens a raw image over `data` without copying it.
pub fn mem_open(data: &[u8]) -> ImageInfo<MemImage<'_>> {
    ImageInfo::open(MemImage::new(data), data.len() as u64)
}

/// A `std::io` cursor over an [`ImageInfo`], for libraries that take
/// `Read + Write + Seek` storage. The image is read-only.
#[derive(Debug)]
pub struct ImageReader<'i, B: ImageBackend> {
    image: &'i ImageInfo<B>,
    position: u64,
}

impl<'i, B: ImageBackend> ImageReader<'i, B> {
    pub fn new(image: &'i ImageInfo<B>) -> Self {
        Self { image, position: 0 }
    }

    pub fn position(&self) -> u64 {
        self.position
    }
}

impl<B: ImageBackend> Read for ImageReader<'_, B> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read_len = self.image.read(self.position, buf)?;
        self.position += read_len as u64;
        Ok(read_len)
    }
}

impl<B: ImageBackend> Seek for ImageReader<'_, B> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(delta) => self.image.size().checked_add_signed(delta),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
        };
        match target {
            Some(position) => {
                self.position = position;
                Ok(position)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek to a negative or overflowing image offset",
            )),
        }
    }
}

impl<B: ImageBackend> Write for ImageReader<'_, B> {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "memory image is read-only",
        ))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mem_open_fills_descriptor() {
        let data = [7u8; 10];
        let image = mem_open(&data);
        assert_eq!(image.itype(), ImageType::Raw);
        assert_eq!(image.size(), 10);
        assert_eq!(image.sector_size(), 512);
        assert_eq!(image.cache_len(), [0; CACHE_SLOTS]);
        image.close();
    }

    #[test]
    fn read_is_clamped_to_image_size() {
        let data: Vec<u8> = (0..10).collect();
        let image = mem_open(&data);
        let mut buf = [0u8; 100];

        let n = image.backend().read(5, &mut buf).unwrap();
        assert_eq!(n, 5);
        assert_eq!(&buf[..5], &data[5..10]);

        let n = image.read(5, &mut buf).unwrap();
        assert_eq!(n, 5);
        assert_eq!(&buf[..5], &data[5..10]);
        image.close();
    }

    #[test]
    fn read_at_end_returns_zero_bytes() {
        let image = mem_open(&[]);
        let mut buf = [0u8; 1];
        assert_eq!(image.backend().read(0, &mut buf).unwrap(), 0);
        assert_eq!(image.read(0, &mut buf).unwrap(), 0);

        let data = [1u8, 2, 3];
        let image = mem_open(&data);
        assert_eq!(image.read(3, &mut buf).unwrap(), 0);
    }

    #[test]
    fn read_past_end_is_an_error() {
        let data = [1u8, 2, 3];
        let image = mem_open(&data);
        let mut buf = [0u8; 4];
        match image.backend().read(4, &mut buf) {
            Err(ImageError::OffsetPastEnd { offset, size }) => {
                assert_eq!(offset, 4);
                assert_eq!(size, 3);
            }
            other => panic!("Expected OffsetPastEnd, got {other:?}"),
        }
        assert!(image.read(u64::MAX, &mut buf).is_err());
    }

    #[test]
    fn cached_reads_fill_slots_and_match_source() {
        let data: Vec<u8> = (0..3 * CACHE_BLOCK_SIZE).map(|i| (i % 251) as u8).collect();
        let image = mem_open(&data);
        let mut buf = [0u8; 16];

        image.read(10, &mut buf).unwrap();
        assert_eq!(&buf, &data[10..26]);
        image.read(CACHE_BLOCK_SIZE as u64 + 3, &mut buf).unwrap();
        assert_eq!(&buf, &data[CACHE_BLOCK_SIZE + 3..CACHE_BLOCK_SIZE + 19]);

        let filled = image.cache_len().iter().filter(|&&len| len > 0).count();
        assert_eq!(filled, 2);

        // Second hit on the first block must not allocate another slot.
        image.read(100, &mut buf).unwrap();
        assert_eq!(&buf, &data[100..116]);
        let filled = image.cache_len().iter().filter(|&&len| len > 0).count();
        assert_eq!(filled, 2);
    }

    #[test]
    fn reads_straddling_blocks_bypass_cache() {
        let data: Vec<u8> = (0..2 * CACHE_BLOCK_SIZE).map(|i| (i % 13) as u8).collect();
        let image = mem_open(&data);
        let start = CACHE_BLOCK_SIZE - 4;
        let mut buf = [0u8; 8];
        assert_eq!(image.read(start as u64, &mut buf).unwrap(), 8);
        assert_eq!(&buf, &data[start..start + 8]);
        assert_eq!(image.cache_len(), [0; CACHE_SLOTS]);
    }

    #[test]
    fn cache_evicts_least_recently_used_slot() {
        let blocks = CACHE_SLOTS + 1;
        let data: Vec<u8> = (0..blocks * CACHE_BLOCK_SIZE)
            .map(|i| (i / CACHE_BLOCK_SIZE) as u8)
            .collect();
        let image = mem_open(&data);
        let mut byte = [0u8; 1];
        for block in 0..blocks {
            image
                .read((block * CACHE_BLOCK_SIZE) as u64, &mut byte)
                .unwrap();
            assert_eq!(byte[0], block as u8);
        }
        let filled = image.cache_len().iter().filter(|&&len| len > 0).count();
        assert_eq!(filled, CACHE_SLOTS);
        image.read(0, &mut byte).unwrap();
        assert_eq!(byte[0], 0);
    }

    #[test]
    fn image_reader_reads_seeks_and_refuses_writes() {
        let data: Vec<u8> = (0..32).collect();
        let image = mem_open(&data);
        let mut reader = ImageReader::new(&image);

        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [0, 1, 2, 3]);

        assert_eq!(reader.seek(SeekFrom::End(-2)).unwrap(), 30);
        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, vec![30, 31]);

        assert!(reader.seek(SeekFrom::Current(-100)).is_err());
        reader.seek(SeekFrom::Start(64)).unwrap();
        let err = reader.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);

        let err = reader.write(&[1]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        assert!(reader.flush().is_ok());
    }

    #[test]
    fn imgstat_of_memory_image_writes_nothing() {
        let image = mem_open(b"abc");
        let mut out = Vec::new();
        image.imgstat(&mut out).unwrap();
        assert!(out.is_empty());
    }
}
