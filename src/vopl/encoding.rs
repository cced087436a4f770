// VOPL payload encodings.
//
// Five candidate codecs over the Morton-ordered 4096-element colour stream,
// all bit-packing colours at `bpp` bits:
//
//   tag 0  Dense    4096 colours back to back
//   tag 1  Sparse   u16 count, then (12-bit stream index, colour) per voxel
//   tag 2  Rle      (run_len - 1 as u8, colour) pairs covering 4096 voxels
//   tag 3  Sparse2  4096-bit occupancy bitmap (512 bytes) + non-zero colours
//   tag 4  Rle0     zero-run / literal descriptors, then literal colours
//
// `best_encoding` computes every candidate, keeps the shortest, and also
// tries the zlib-compressed form of each, flagging the winner with 0x80 in
// the encoding byte.  Selection is deterministic: ties go to the earlier
// candidate in the order above.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use crate::bitio::{BitReader, BitWriter, read_uvarint, write_uvarint};
use crate::error::{Error, Result};
use crate::grid::{VOLUME, VoxelGrid};
use crate::morton;
use crate::vopl::header::COMPRESSED_FLAG;

// ---------------------------------------------------------------------------
// Encoding tags
// ---------------------------------------------------------------------------

/// Payload encoding, stored in the low 7 bits of the `enc` byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Dense = 0,
    Sparse = 1,
    Rle = 2,
    Sparse2 = 3,
    Rle0 = 4,
}

impl Encoding {
    /// Candidate evaluation order; also the deterministic tie-break order.
    pub const CANDIDATES: [Encoding; 5] = [
        Encoding::Dense,
        Encoding::Sparse,
        Encoding::Rle,
        Encoding::Sparse2,
        Encoding::Rle0,
    ];

    /// Wire tag in the low 7 bits of the `enc` byte.
    #[inline]
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Dispatch a 7-bit wire tag.
    pub fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(Self::Dense),
            1 => Ok(Self::Sparse),
            2 => Ok(Self::Rle),
            3 => Ok(Self::Sparse2),
            4 => Ok(Self::Rle0),
            t => Err(Error::UnknownEncoding(t)),
        }
    }
}

/// A chosen payload: encoding tag, compression flag, and bytes.
#[derive(Debug, Clone)]
pub struct EncodedPayload {
    pub encoding: Encoding,
    pub compressed: bool,
    pub payload: Vec<u8>,
}

impl EncodedPayload {
    /// The `enc` byte as written to the container header.
    #[inline]
    pub fn enc_byte(&self) -> u8 {
        let mut b = self.encoding.tag();
        if self.compressed {
            b |= COMPRESSED_FLAG;
        }
        b
    }
}

// ---------------------------------------------------------------------------
// zlib wrapping
// ---------------------------------------------------------------------------

/// Compress `data` with zlib at best compression.
pub fn zlib_compress(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    // Writing to a Vec cannot fail.
    encoder.write_all(data).expect("write to Vec");
    encoder.finish().expect("finish to Vec")
}

/// Inflate a zlib stream.
pub fn zlib_decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| Error::Decompression(format!("zlib: {e}")))?;
    Ok(out)
}

// ---------------------------------------------------------------------------
// Per-encoding encoders (over the Morton stream)
// ---------------------------------------------------------------------------

fn encode_dense(stream: &[u8], bpp: u8) -> Vec<u8> {
    let mut bw = BitWriter::new();
    for &c in stream {
        bw.write_bits(u64::from(c), bpp);
    }
    bw.finish()
}

fn encode_sparse(stream: &[u8], bpp: u8) -> Vec<u8> {
    let mut bw = BitWriter::new();
    let count = stream.iter().filter(|&&c| c != 0).count();
    bw.write_bits(count as u64, 16);
    for (i, &c) in stream.iter().enumerate() {
        if c == 0 {
            continue;
        }
        bw.write_bits(i as u64, 12);
        bw.write_bits(u64::from(c), bpp);
    }
    bw.finish()
}

fn encode_rle(stream: &[u8], bpp: u8) -> Vec<u8> {
    let mut bw = BitWriter::new();
    let mut cur = stream[0];
    let mut run = 1u32;
    for &c in &stream[1..] {
        if c == cur && run < 256 {
            run += 1;
            continue;
        }
        bw.write_bits(u64::from(run - 1), 8);
        bw.write_bits(u64::from(cur), bpp);
        cur = c;
        run = 1;
    }
    bw.write_bits(u64::from(run - 1), 8);
    bw.write_bits(u64::from(cur), bpp);
    bw.finish()
}

fn encode_sparse2(stream: &[u8], bpp: u8) -> Vec<u8> {
    let mut bitmap = vec![0u8; VOLUME / 8];
    let mut bw = BitWriter::new();
    let mut any = false;
    for (i, &c) in stream.iter().enumerate() {
        if c != 0 {
            bitmap[i >> 3] |= 1 << (i & 7);
            bw.write_bits(u64::from(c), bpp);
            any = true;
        }
    }
    if any {
        bitmap.extend_from_slice(&bw.finish());
    }
    bitmap
}

/// Descriptor flag bytes for Rle0 blocks.
const RLE0_ZERO_RUN: u8 = 0x80;
const RLE0_LITERAL: u8 = 0x00;

fn encode_rle0(stream: &[u8], bpp: u8) -> Vec<u8> {
    let mut out = Vec::new();
    let mut literals = BitWriter::new();
    let mut i = 0usize;
    while i < stream.len() {
        let start = i;
        if stream[i] == 0 {
            while i < stream.len() && stream[i] == 0 {
                i += 1;
            }
            out.push(RLE0_ZERO_RUN);
            write_uvarint(&mut out, (i - start) as u32);
        } else {
            while i < stream.len() && stream[i] != 0 {
                literals.write_bits(u64::from(stream[i]), bpp);
                i += 1;
            }
            out.push(RLE0_LITERAL);
            write_uvarint(&mut out, (i - start) as u32);
        }
    }
    out.extend_from_slice(&literals.finish());
    out
}

// ---------------------------------------------------------------------------
// Per-encoding decoders (back to the Morton stream)
// ---------------------------------------------------------------------------

fn decode_dense(payload: &[u8], bpp: u8) -> Result<Vec<u8>> {
    let mut br = BitReader::new(payload);
    let mut stream = vec![0u8; VOLUME];
    for slot in stream.iter_mut() {
        *slot = br.read_bits(bpp)? as u8;
    }
    Ok(stream)
}

fn decode_sparse(payload: &[u8], bpp: u8) -> Result<Vec<u8>> {
    let mut br = BitReader::new(payload);
    let mut stream = vec![0u8; VOLUME];
    let count = br.read_bits(16)?;
    for _ in 0..count {
        let idx = br.read_bits(12)? as usize;
        let col = br.read_bits(bpp)? as u8;
        stream[idx] = col;
    }
    Ok(stream)
}

fn decode_rle(payload: &[u8], bpp: u8) -> Result<Vec<u8>> {
    let mut br = BitReader::new(payload);
    let mut stream = Vec::with_capacity(VOLUME);
    while stream.len() < VOLUME {
        // A stream that ends before covering the chunk did not close.
        let run = br.read_bits(8).map_err(|_| Error::BadRle)? as usize + 1;
        let col = br.read_bits(bpp).map_err(|_| Error::BadRle)? as u8;
        if stream.len() + run > VOLUME {
            return Err(Error::BadRle);
        }
        stream.resize(stream.len() + run, col);
    }
    Ok(stream)
}

fn decode_sparse2(payload: &[u8], bpp: u8) -> Result<Vec<u8>> {
    if payload.len() < VOLUME / 8 {
        return Err(Error::TruncatedPayload);
    }
    let (bitmap, values) = payload.split_at(VOLUME / 8);
    let mut br = BitReader::new(values);
    let mut stream = vec![0u8; VOLUME];
    for (i, slot) in stream.iter_mut().enumerate() {
        if (bitmap[i >> 3] >> (i & 7)) & 1 != 0 {
            *slot = br.read_bits(bpp)? as u8;
        }
    }
    Ok(stream)
}

fn decode_rle0(payload: &[u8], bpp: u8) -> Result<Vec<u8>> {
    // Walk the descriptor list first; literal colours follow it.
    let mut pos = 0usize;
    let mut covered = 0usize;
    let mut blocks: Vec<(bool, usize)> = Vec::new();
    while covered < VOLUME {
        let Some(&flag) = payload.get(pos) else {
            return Err(Error::BadRle0);
        };
        pos += 1;
        let is_zero_run = match flag {
            RLE0_ZERO_RUN => true,
            RLE0_LITERAL => false,
            _ => return Err(Error::BadRle0),
        };
        let len = read_uvarint(payload, &mut pos).map_err(|_| Error::BadRle0)? as usize;
        covered += len;
        if covered > VOLUME {
            return Err(Error::BadRle0);
        }
        blocks.push((is_zero_run, len));
    }

    let mut br = BitReader::new(&payload[pos..]);
    let mut stream = Vec::with_capacity(VOLUME);
    for (is_zero_run, len) in blocks {
        if is_zero_run {
            stream.resize(stream.len() + len, 0);
        } else {
            for _ in 0..len {
                stream.push(br.read_bits(bpp)? as u8);
            }
        }
    }
    Ok(stream)
}

/// Decode a raw (already inflated) payload with the given tag into the
/// Morton-ordered colour stream.
pub fn decode_payload(encoding: Encoding, payload: &[u8], bpp: u8) -> Result<Vec<u8>> {
    match encoding {
        Encoding::Dense => decode_dense(payload, bpp),
        Encoding::Sparse => decode_sparse(payload, bpp),
        Encoding::Rle => decode_rle(payload, bpp),
        Encoding::Sparse2 => decode_sparse2(payload, bpp),
        Encoding::Rle0 => decode_rle0(payload, bpp),
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

fn encode_candidate(encoding: Encoding, stream: &[u8], bpp: u8) -> Vec<u8> {
    match encoding {
        Encoding::Dense => encode_dense(stream, bpp),
        Encoding::Sparse => encode_sparse(stream, bpp),
        Encoding::Rle => encode_rle(stream, bpp),
        Encoding::Sparse2 => encode_sparse2(stream, bpp),
        Encoding::Rle0 => encode_rle0(stream, bpp),
    }
}

/// Encode `grid` with every candidate and return the smallest payload,
/// considering both raw and zlib-compressed forms.
pub fn best_encoding(grid: &VoxelGrid, bpp: u8) -> EncodedPayload {
    let stream = morton::flatten(grid);

    let candidates: Vec<(Encoding, Vec<u8>)> = Encoding::CANDIDATES
        .iter()
        .map(|&e| (e, encode_candidate(e, &stream, bpp)))
        .collect();

    let mut best = EncodedPayload {
        encoding: candidates[0].0,
        compressed: false,
        payload: candidates[0].1.clone(),
    };
    for (e, payload) in &candidates[1..] {
        if payload.len() < best.payload.len() {
            best = EncodedPayload {
                encoding: *e,
                compressed: false,
                payload: payload.clone(),
            };
        }
    }

    for (e, payload) in &candidates {
        let zb = zlib_compress(payload);
        if zb.len() < best.payload.len() {
            best = EncodedPayload {
                encoding: *e,
                compressed: true,
                payload: zb,
            };
        }
    }

    best
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
