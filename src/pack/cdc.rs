// Content-defined chunking for LayoutCDC packs.
//
// A gear rolling hash decides block boundaries from payload content, so
// shared byte ranges across entries land in identical blocks and dedup in
// the dictionary.  Everything here is deterministic by construction — the
// gear table, boundary decisions, and block insertion order are part of the
// wire contract: the same inputs must produce the same pack bytes on every
// platform.

use std::collections::HashMap;
use std::sync::OnceLock;

use xxhash_rust::xxh64::xxh64;

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Chunking parameters, stored in the pack so readers can validate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CdcParams {
    /// Average block size the boundary mask aims for.
    pub target: u32,
    /// No boundary before a block reaches this size.
    pub min_size: u32,
    /// Forced boundary at this size.
    pub max_size: u32,
}

impl Default for CdcParams {
    fn default() -> Self {
        Self {
            target: 4096,
            min_size: 2048,
            max_size: 16384,
        }
    }
}

impl CdcParams {
    /// Boundary mask: `pow2(round(log2(target))) - 1`.
    ///
    /// Rounding is half-away-from-zero (`f64::round`); a degenerate target
    /// falls back to the 4096 default.
    pub fn mask(&self) -> u64 {
        let pow = if self.target == 0 {
            4096u64
        } else {
            let exp = f64::from(self.target).log2().round();
            if (0.0..=62.0).contains(&exp) {
                1u64 << exp as u32
            } else {
                4096
            }
        };
        pow - 1
    }
}

// ---------------------------------------------------------------------------
// Gear table
// ---------------------------------------------------------------------------

const GEAR_SEED_KEY: &[u8] = b"vopl-cdc-gear-seed";
const GEAR_FILL: u64 = 0x9E37_79B1_85EB_CA87;
const GEAR_MIX: u64 = 0xC2B2_AE3D_27D4_EB4F;

/// The 256-entry gear table, derived once from a fixed keyed hash so every
/// build of the codec chunks identically.
pub fn gear_table() -> &'static [u64; 256] {
    static GEAR: OnceLock<[u64; 256]> = OnceLock::new();
    GEAR.get_or_init(|| {
        let seed = xxh64(GEAR_SEED_KEY, 0);
        let mut table = [0u64; 256];
        for (i, slot) in table.iter_mut().enumerate() {
            let i = i as u64;
            let mut b = [0u8; 16];
            b[..8].copy_from_slice(&seed.wrapping_add(i.wrapping_mul(GEAR_FILL)).to_le_bytes());
            b[8..].copy_from_slice(&(!seed.wrapping_add(i.wrapping_mul(GEAR_MIX))).to_le_bytes());
            let v = xxh64(&b, 0);
            *slot = if v == 0 { GEAR_FILL } else { v };
        }
        table
    })
}

// ---------------------------------------------------------------------------
// Chunking
// ---------------------------------------------------------------------------

/// Split `data` into content-defined blocks, returned as sub-slices.
///
/// The rolling state resets after each cut; the tail is always emitted as a
/// final block even when shorter than `min_size`.
pub fn split_blocks<'a>(data: &'a [u8], params: &CdcParams) -> Vec<&'a [u8]> {
    let gear = gear_table();
    let mask = params.mask();
    let min = params.min_size as usize;
    let max = params.max_size as usize;

    let mut blocks = Vec::new();
    let mut start = 0usize;
    let mut h: u64 = 0;
    for (pos, &b) in data.iter().enumerate() {
        h = (h << 1).wrapping_add(gear[usize::from(b)]);
        let len = pos - start + 1;
        if len < min {
            continue;
        }
        if (h & mask) == 0 || len >= max {
            blocks.push(&data[start..=pos]);
            start = pos + 1;
            h = 0;
        }
    }
    if start < data.len() {
        blocks.push(&data[start..]);
    }
    blocks
}

// ---------------------------------------------------------------------------
// Block dictionary
// ---------------------------------------------------------------------------

/// Deduplicating block dictionary keyed by xxhash64 with byte-equality
/// verification on hash hits.
#[derive(Debug, Default)]
pub struct BlockDictionary {
    blocks: Vec<Vec<u8>>,
    index: HashMap<u64, usize>,
}

impl BlockDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `block`, returning its index; identical bytes dedup to the
    /// first occurrence.
    pub fn insert(&mut self, block: &[u8]) -> usize {
        let h = xxh64(block, 0);
        if let Some(&idx) = self.index.get(&h)
            && self.blocks[idx] == block
        {
            return idx;
        }
        let idx = self.blocks.len();
        self.blocks.push(block.to_vec());
        self.index.insert(h, idx);
        idx
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn into_blocks(self) -> Vec<Vec<u8>> {
        self.blocks
    }
}

/// Chunk every entry payload and dedup the blocks across all of them.
///
/// Returns the dictionary blocks in insertion order and, per payload, the
/// sequence of block indices that reconstructs it.
pub fn build_index(payloads: &[&[u8]], params: &CdcParams) -> (Vec<Vec<u8>>, Vec<Vec<u32>>) {
    let mut dict = BlockDictionary::new();
    let mut sequences = Vec::with_capacity(payloads.len());
    for &payload in payloads {
        let seq = split_blocks(payload, params)
            .into_iter()
            .map(|blk| dict.insert(blk) as u32)
            .collect();
        sequences.push(seq);
    }
    (dict.into_blocks(), sequences)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_data(len: usize) -> Vec<u8> {
        // Deterministic pseudo-random bytes (xorshift).
        let mut state = 0x2545_F491_4F6C_DD1Du64;
        (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                (state & 0xFF) as u8
            })
            .collect()
    }

    #[test]
    fn gear_table_is_stable_and_nonzero() {
        let t1 = gear_table();
        let t2 = gear_table();
        assert_eq!(t1.as_ptr(), t2.as_ptr());
        assert!(t1.iter().all(|&v| v != 0));
        // 256 distinct values out of a 64-bit hash.
        let mut sorted = t1.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 256);
    }

    #[test]
    fn mask_is_power_of_two_minus_one() {
        assert_eq!(CdcParams::default().mask(), 4095);
        let p = CdcParams {
            target: 6000, // log2 ~ 12.55 -> rounds to 13
            ..Default::default()
        };
        assert_eq!(p.mask(), 8191);
        let p = CdcParams {
            target: 0,
            ..Default::default()
        };
        assert_eq!(p.mask(), 4095);
    }

    #[test]
    fn blocks_reassemble_to_input() {
        let data = sample_data(100_000);
        let params = CdcParams::default();
        let blocks = split_blocks(&data, &params);
        let rejoined: Vec<u8> = blocks.iter().flat_map(|b| b.iter().copied()).collect();
        assert_eq!(rejoined, data);
    }

    #[test]
    fn block_sizes_respect_bounds() {
        let data = sample_data(200_000);
        let params = CdcParams::default();
        let blocks = split_blocks(&data, &params);
        assert!(blocks.len() > 1);
        for (i, blk) in blocks.iter().enumerate() {
            assert!(blk.len() <= params.max_size as usize);
            // Every block except the tail honours min_size.
            if i + 1 < blocks.len() {
                assert!(blk.len() >= params.min_size as usize);
            }
        }
    }

    #[test]
    fn splitting_is_deterministic() {
        let data = sample_data(50_000);
        let params = CdcParams::default();
        let a = split_blocks(&data, &params);
        let b = split_blocks(&data, &params);
        assert_eq!(a, b);
    }

    #[test]
    fn shared_content_dedups() {
        let shared = sample_data(60_000);
        let payloads: Vec<&[u8]> = vec![&shared, &shared];
        let (blocks, seqs) = build_index(&payloads, &CdcParams::default());
        assert_eq!(seqs[0], seqs[1]);
        // Two identical payloads need no more blocks than one.
        assert_eq!(blocks.len(), seqs[0].len());
    }

    #[test]
    fn dictionary_verifies_bytes_on_hash_hit() {
        let mut dict = BlockDictionary::new();
        let a = dict.insert(b"alpha");
        let b = dict.insert(b"beta");
        assert_ne!(a, b);
        assert_eq!(dict.insert(b"alpha"), a);
        assert_eq!(dict.len(), 2);
    }

    #[test]
    fn empty_payload_has_empty_sequence() {
        let payloads: Vec<&[u8]> = vec![&[]];
        let (blocks, seqs) = build_index(&payloads, &CdcParams::default());
        assert!(blocks.is_empty());
        assert!(seqs[0].is_empty());
    }
}
