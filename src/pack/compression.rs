// Content-section compression for VOPLPACK.
//
// The pack header declares one codec for the whole content section:
//   0 = None (passthrough), 1 = Zlib, 2 = Zstd (pack v2 only).
// Unknown bytes are rejected at parse time.

use crate::error::{Error, Result};
use crate::vopl::encoding::{zlib_compress, zlib_decompress};

// ---------------------------------------------------------------------------
// PackCompression
// ---------------------------------------------------------------------------

/// Compression applied to the pack content section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PackCompression {
    #[default]
    None = 0,
    Zlib = 1,
    Zstd = 2,
}

impl PackCompression {
    /// Wire byte in the pack header.
    #[inline]
    pub fn byte(self) -> u8 {
        self as u8
    }

    /// Dispatch a wire byte.
    pub fn from_byte(b: u8) -> Result<Self> {
        match b {
            0 => Ok(Self::None),
            1 => Ok(Self::Zlib),
            2 => Ok(Self::Zstd),
            b => Err(Error::UnsupportedCompression(b)),
        }
    }

    /// Wrap a content section.
    pub fn compress(self, content: &[u8]) -> Result<Vec<u8>> {
        match self {
            Self::None => Ok(content.to_vec()),
            Self::Zlib => Ok(zlib_compress(content)),
            Self::Zstd => zstd::encode_all(content, 0)
                .map_err(|e| Error::Decompression(format!("zstd encode: {e}"))),
        }
    }

    /// Unwrap a content section.
    pub fn decompress(self, content: &[u8]) -> Result<Vec<u8>> {
        match self {
            Self::None => Ok(content.to_vec()),
            Self::Zlib => zlib_decompress(content),
            Self::Zstd => {
                zstd::decode_all(content).map_err(|e| Error::Decompression(format!("zstd: {e}")))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
