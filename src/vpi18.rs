// VPI18 sparse update bitstream.
//
// Each entry is exactly 18 bits, LSB-first: the upper 12 bits are a linear
// voxel index (x + y*16 + z*256), the lower 6 bits a colour.  The stream is
// continuous with no per-entry padding; trailing bits left over from byte
// alignment terminate decoding normally.
//
// Contract for colour 0:
//   - `encode_grid` never emits empty voxels;
//   - `encode_entries` preserves zero colours as deletes (diff streams);
//   - `apply` clears the voxel when the colour is 0.

use crate::bitio::{BitReader, BitWriter};
use crate::error::{Error, Result};
use crate::grid::{DEPTH, HEIGHT, VOLUME, VoxelGrid, WIDTH, index_to_xyz, xyz_to_index};

/// Bits per stream entry: 12 index + 6 colour.
pub const ENTRY_BITS: u8 = 18;

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

/// One (index, colour) update.  Colour 0 deletes the voxel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vpi18Entry {
    /// Canonical linear index in 0..4096.
    pub index: u16,
    /// Palette colour in 0..64; 0 clears.
    pub colour: u8,
}

#[inline]
fn pack_entry(e: Vpi18Entry) -> u64 {
    (u64::from(e.index) << 6) | u64::from(e.colour & 0x3F)
}

// ---------------------------------------------------------------------------
// Encode
// ---------------------------------------------------------------------------

/// Encode the non-zero voxels of `grid` in (y, z, x) scan order.
pub fn encode_grid(grid: &VoxelGrid) -> Vec<u8> {
    let mut bw = BitWriter::new();
    for y in 0..HEIGHT {
        for z in 0..DEPTH {
            for x in 0..WIDTH {
                let c = grid.0[y][x][z];
                if c == 0 {
                    continue;
                }
                bw.write_bits(
                    pack_entry(Vpi18Entry {
                        index: xyz_to_index(x, y, z) as u16,
                        colour: c,
                    }),
                    ENTRY_BITS,
                );
            }
        }
    }
    bw.finish()
}

/// Encode an explicit entry list, preserving zero colours as deletes.
///
/// Entries with an index outside the chunk report `BadIndex`.
pub fn encode_entries(entries: &[Vpi18Entry]) -> Result<Vec<u8>> {
    let mut bw = BitWriter::new();
    for &e in entries {
        if usize::from(e.index) >= VOLUME {
            return Err(Error::BadIndex(u32::from(e.index)));
        }
        bw.write_bits(pack_entry(e), ENTRY_BITS);
    }
    Ok(bw.finish())
}

// ---------------------------------------------------------------------------
// Decode / apply
// ---------------------------------------------------------------------------

/// Decode a stream into its entry list.
///
/// Trailing bits too short for a full entry are ignored; an in-range check
/// still applies to every decoded index.
pub fn decode_entries(data: &[u8]) -> Result<Vec<Vpi18Entry>> {
    let mut br = BitReader::new(data);
    let mut entries = Vec::with_capacity(data.len() * 8 / usize::from(ENTRY_BITS));
    loop {
        let bits = match br.read_bits(ENTRY_BITS) {
            Ok(bits) => bits,
            Err(Error::EndOfStream) => break,
            Err(e) => return Err(e),
        };
        let index = (bits >> 6) as u16;
        if usize::from(index) >= VOLUME {
            return Err(Error::BadIndex(u32::from(index)));
        }
        entries.push(Vpi18Entry {
            index,
            colour: (bits & 0x3F) as u8,
        });
    }
    Ok(entries)
}

/// Apply a stream as updates over `grid`.
///
/// Colour 0 clears the addressed voxel.  The grid is only written once the
/// whole stream has validated, so a `BadIndex` failure leaves it untouched.
pub fn apply(grid: &mut VoxelGrid, data: &[u8]) -> Result<()> {
    let entries = decode_entries(data)?;
    for e in entries {
        let (x, y, z) = index_to_xyz(usize::from(e.index));
        grid.0[y][x][z] = e.colour;
    }
    Ok(())
}

/// Decode a full (non-delta) stream into a fresh grid.
pub fn decode_to_grid(data: &[u8]) -> Result<VoxelGrid> {
    let mut grid = VoxelGrid::default();
    apply(&mut grid, data)?;
    Ok(grid)
}

// ---------------------------------------------------------------------------
// VOPL conversions
// ---------------------------------------------------------------------------

/// Build a .vopl file from a VPI18 stream applied over an empty grid.
pub fn to_vopl(data: &[u8]) -> Result<Vec<u8>> {
    let grid = decode_to_grid(data)?;
    Ok(crate::vopl::encode(&grid))
}

/// Re-emit the non-zero voxels of a .vopl file as a VPI18 stream.
pub fn from_vopl(vopl_bytes: &[u8]) -> Result<Vec<u8>> {
    let grid = crate::vopl::decode(vopl_bytes)?;
    Ok(encode_grid(&grid))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
