// Crate-wide error type.
//
// Every fallible operation in the codec fails fast and atomically: no
// partial mutation of caller outputs, no internal recovery, no retries.
// Errors are surfaced verbatim to callers as a single tagged enum.

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error kinds surfaced by the codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Container magic bytes did not match.
    BadMagic,
    /// Container version is outside the supported range.
    UnsupportedVersion(u8),
    /// Declared bits-per-voxel is outside 1..=8.
    BadBpp(u8),
    /// Declared size exceeds the available bytes.
    TruncatedPayload,
    /// A bit-level read ran past the end of the stream.
    EndOfStream,
    /// Unknown payload encoding tag.
    UnknownEncoding(u8),
    /// Unknown pack layout byte.
    UnknownLayout(u8),
    /// Unknown pack compression byte.
    UnsupportedCompression(u8),
    /// RLE payload did not cover exactly the chunk volume.
    BadRle,
    /// RLE0 descriptors did not sum to exactly the chunk volume.
    BadRle0,
    /// Index outside the addressable voxel or block range.
    BadIndex(u32),
    /// Varint continuation extended past the permitted width.
    BadVarint,
    /// Entry headers disagree with the common pack header.
    InconsistentPack(String),
    /// Entry name exceeds the u16 length field.
    NameTooLong(usize),
    /// zlib or zstd stream failed to decompress.
    Decompression(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadMagic => write!(f, "bad magic bytes"),
            Self::UnsupportedVersion(v) => write!(f, "unsupported version: {v}"),
            Self::BadBpp(b) => write!(f, "bits per voxel out of range: {b}"),
            Self::TruncatedPayload => write!(f, "truncated payload"),
            Self::EndOfStream => write!(f, "unexpected end of bit stream"),
            Self::UnknownEncoding(tag) => write!(f, "unknown encoding tag: {tag}"),
            Self::UnknownLayout(b) => write!(f, "unknown pack layout: {b}"),
            Self::UnsupportedCompression(b) => write!(f, "unsupported compression: {b}"),
            Self::BadRle => write!(f, "RLE payload does not cover the chunk"),
            Self::BadRle0 => write!(f, "RLE0 descriptors do not cover the chunk"),
            Self::BadIndex(idx) => write!(f, "index out of range: {idx}"),
            Self::BadVarint => write!(f, "varint continuation overrun"),
            Self::InconsistentPack(msg) => write!(f, "inconsistent pack: {msg}"),
            Self::NameTooLong(len) => write!(f, "entry name too long: {len} bytes"),
            Self::Decompression(msg) => write!(f, "decompression failed: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
