// VOPL container encode/decode entry points.
//
// Encoding picks the smallest payload via `best_encoding` and frames it
// with a v3 header; decoding reverses that, inflating zlib-wrapped payloads
// and dispatching on the encoding tag.

use crate::error::{Error, Result};
use crate::grid::VoxelGrid;
use crate::morton;
use crate::vopl::encoding::{self, Encoding};
use crate::vopl::header::{self, COMPRESSED_FLAG, VoplHeader};

/// Bits-per-voxel used when entries must stay pack-compatible: a fixed
/// 64-colour palette gives every chunk an identical common header.
pub const PACK_BPP: u8 = 6;

// ---------------------------------------------------------------------------
// Encode
// ---------------------------------------------------------------------------

/// Encode `grid` as a .vopl file with the fixed pack-compatible bpp of 6.
pub fn encode(grid: &VoxelGrid) -> Vec<u8> {
    encode_with_bpp(grid, PACK_BPP)
}

/// Encode `grid` with an adaptive bpp: the smallest width that holds the
/// largest palette index present, clamped to 1..=8.
pub fn encode_adaptive(grid: &VoxelGrid) -> Vec<u8> {
    let max = grid.max_value();
    let bpp = (8 - max.leading_zeros() as u8).clamp(1, 8);
    encode_with_bpp(grid, bpp)
}

/// Encode `grid` as a .vopl file at the given bits-per-voxel (clamped to
/// 1..=8).  Colours wider than `bpp` are masked by the bit packer; callers
/// own the invariant that values fit.
pub fn encode_with_bpp(grid: &VoxelGrid, bpp: u8) -> Vec<u8> {
    let bpp = bpp.clamp(1, 8);
    let enc = encoding::best_encoding(grid, bpp);
    let hdr = VoplHeader::for_chunk(bpp);
    header::build(&hdr, enc.enc_byte(), &enc.payload)
}

// ---------------------------------------------------------------------------
// Decode
// ---------------------------------------------------------------------------

/// Decode a .vopl file into a grid.
pub fn decode(data: &[u8]) -> Result<VoxelGrid> {
    let (hdr, enc_byte, payload) = header::parse_header(data)?;
    decode_payload(&hdr, enc_byte, payload)
}

/// Decode a payload already split from its header (as pack entries are).
pub fn decode_payload(hdr: &VoplHeader, enc_byte: u8, payload: &[u8]) -> Result<VoxelGrid> {
    if hdr.ver != header::VERSION {
        return Err(Error::UnsupportedVersion(hdr.ver));
    }
    let raw;
    let raw_payload: &[u8] = if enc_byte & COMPRESSED_FLAG != 0 {
        raw = encoding::zlib_decompress(payload)?;
        &raw
    } else {
        payload
    };
    let encoding = Encoding::from_tag(enc_byte & !COMPRESSED_FLAG)?;
    let stream = encoding::decode_payload(encoding, raw_payload, hdr.bpp)?;
    Ok(morton::apply_order(&stream))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
