//! Transparent payload compression.
//!
//! Payloads are deflated with zlib and the compressed form is kept only when
//! it is strictly smaller than the input. The choice is recorded in the
//! `compressed` column so reads know whether to inflate.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

/// A payload ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Encoded {
    pub bytes: Vec<u8>,
    pub compressed: bool,
}

impl Encoded {
    /// Bytes that will be physically written.
    pub fn stored_size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Encode a payload, keeping whichever of raw/compressed is smaller.
pub(crate) fn encode(data: &[u8]) -> Encoded {
    match compress(data) {
        Ok(compressed) if compressed.len() < data.len() => Encoded {
            bytes: compressed,
            compressed: true,
        },
        _ => Encoded {
            bytes: data.to_vec(),
            compressed: false,
        },
    }
}

/// Decode a stored payload.
pub(crate) fn decode(bytes: Vec<u8>, compressed: bool) -> std::io::Result<Vec<u8>> {
    if !compressed {
        return Ok(bytes);
    }
    let mut decoder = ZlibDecoder::new(bytes.as_slice());
    let mut out = Vec::with_capacity(bytes.len() * 2);
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

fn compress(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}
