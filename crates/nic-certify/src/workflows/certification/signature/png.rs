//! Minimal truecolor PNG writer for rendered signatures.

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;

pub(crate) const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

const COLOR_TYPE_RGB: u8 = 2;
const FILTER_NONE: u8 = 0;

/// Encode an opaque 8-bit RGB buffer (row-major, `width * height * 3` bytes).
pub(crate) fn encode_rgb(width: u32, height: u32, rgb: &[u8]) -> std::io::Result<Vec<u8>> {
    let row_len = width as usize * 3;
    if rgb.len() != row_len * height as usize {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!(
                "pixel buffer holds {} bytes, expected {} for {}x{}",
                rgb.len(),
                row_len * height as usize,
                width,
                height
            ),
        ));
    }

    let mut header = Vec::with_capacity(13);
    header.extend_from_slice(&width.to_be_bytes());
    header.extend_from_slice(&height.to_be_bytes());
    header.extend_from_slice(&[8, COLOR_TYPE_RGB, 0, 0, 0]);

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    for row in rgb.chunks_exact(row_len.max(1)) {
        encoder.write_all(&[FILTER_NONE])?;
        encoder.write_all(row)?;
    }
    let compressed = encoder.finish()?;

    let mut out = Vec::with_capacity(compressed.len() + 64);
    out.extend_from_slice(&PNG_MAGIC);
    write_chunk(&mut out, b"IHDR", &header);
    write_chunk(&mut out, b"IDAT", &compressed);
    write_chunk(&mut out, b"IEND", &[]);
    Ok(out)
}

// [length:4][type:4][data:N][crc32(type+data):4]
fn write_chunk(out: &mut Vec<u8>, kind: &[u8; 4], data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(kind);
    out.extend_from_slice(data);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(kind);
    hasher.update(data);
    out.extend_from_slice(&hasher.finalize().to_be_bytes());
}
