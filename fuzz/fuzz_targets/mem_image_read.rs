#![no_main]

use libfuzzer_sys::fuzz_target;
use lure_core::image::{ImageError, mem_open};

// First 8 bytes pick the read offset, the next 2 the read length; the rest
// is the image.
fuzz_target!(|data: &[u8]| {
    let Some((header, image_bytes)) = data.split_first_chunk::<10>() else {
        return;
    };
    let offset = u64::from_le_bytes(header[..8].try_into().unwrap_or_default()) % 0x1_0000_0000;
    let len = usize::from(u16::from_le_bytes([header[8], header[9]]));

    let image = mem_open(image_bytes);
    let mut buf = vec![0u8; len];
    match image.read(offset, &mut buf) {
        Ok(n) => {
            let start = offset as usize;
            assert!(start <= image_bytes.len());
            assert_eq!(n, len.min(image_bytes.len() - start));
            assert_eq!(&buf[..n], &image_bytes[start..start + n]);
        }
        Err(ImageError::OffsetPastEnd { .. }) => assert!(offset > image_bytes.len() as u64),
        Err(e) => panic!("unexpected image error: {e}"),
    }
    image.close();
});
