// VOPLPACK multi-chunk archive.
//
// Byte-exact layout:
//
//   magic "VOPLPACK"  8 bytes
//   version           u8  (1 or 2)
//   comp              u8  (0 None, 1 Zlib, 2 Zstd — Zstd needs v2)
//   content           rest of the file, wrapped by `comp`
//
// Content starts with the common header (ver,bpp,w,h,d,pal) factored out of
// the entries, then (v2 only) a layout byte.  LayoutRaw stores each entry's
// payload inline; LayoutCDC stores a deduplicating block dictionary and
// per-entry block index sequences.
//
// v1 is emitted only for LayoutRaw with None/Zlib compression, keeping
// those files readable by v1-only consumers.
//
// # Modules
//
// - `cdc`         — gear-hash chunker and block dictionary
// - `compression` — content-section compression wrapper

pub mod cdc;
pub mod compression;

pub use cdc::CdcParams;
pub use compression::PackCompression;

use crate::error::{Error, Result};
use crate::grid::VoxelGrid;
use crate::vopl::{self, VoplHeader};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Archive magic.
pub const PACK_MAGIC: &[u8; 8] = b"VOPLPACK";
/// Raw-layout-only version, no layout byte.
pub const PACK_VERSION_1: u8 = 1;
/// Layout-byte version, required for CDC and Zstd.
pub const PACK_VERSION_2: u8 = 2;

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// How the content section encodes entry payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PackLayout {
    /// Independent payload blobs per entry (v1 semantics).
    #[default]
    Raw = 0,
    /// Content-defined chunk dictionary plus per-entry block sequences.
    Cdc = 1,
}

impl PackLayout {
    #[inline]
    pub fn byte(self) -> u8 {
        self as u8
    }

    pub fn from_byte(b: u8) -> Result<Self> {
        match b {
            0 => Ok(Self::Raw),
            1 => Ok(Self::Cdc),
            b => Err(Error::UnknownLayout(b)),
        }
    }
}

// ---------------------------------------------------------------------------
// Pack structure
// ---------------------------------------------------------------------------

/// A single chunk payload inside the pack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackEntry {
    pub name: String,
    /// Per-entry encoding byte (tag plus compressed flag).
    pub enc: u8,
    pub payload: Vec<u8>,
}

/// An archive: the common header plus the entries sharing it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Pack {
    pub header: VoplHeader,
    pub entries: Vec<PackEntry>,
}

impl Pack {
    /// Assemble a pack from parsed .vopl files, validating that every file
    /// shares the same common header.
    pub fn from_vopl_files(files: &[(&str, &[u8])]) -> Result<Self> {
        let mut pack = Self::default();
        for &(name, bytes) in files {
            pack.push_vopl_file(name, bytes)?;
        }
        Ok(pack)
    }

    /// Parse one .vopl file and append it as an entry.
    ///
    /// The first file fixes the common header; later files whose header
    /// fields disagree report `InconsistentPack`.
    pub fn push_vopl_file(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        let (hdr, enc, payload) = vopl::parse_header(bytes)?;
        if self.entries.is_empty() {
            self.header = hdr;
        } else if (hdr.ver, hdr.bpp, hdr.w, hdr.h, hdr.d, hdr.pal)
            != (
                self.header.ver,
                self.header.bpp,
                self.header.w,
                self.header.h,
                self.header.d,
                self.header.pal,
            )
        {
            return Err(Error::InconsistentPack(format!(
                "entry '{name}' header disagrees with the pack header"
            )));
        }
        self.entries.push(PackEntry {
            name: name.to_string(),
            enc,
            payload: payload.to_vec(),
        });
        Ok(())
    }

    /// Reassemble every entry into a standalone .vopl file.
    pub fn to_vopl_files(&self) -> Vec<(String, Vec<u8>)> {
        self.entries
            .iter()
            .map(|e| (e.name.clone(), vopl::build(&self.header, e.enc, &e.payload)))
            .collect()
    }

    /// Decode one entry into a grid.
    pub fn decode_entry(&self, index: usize) -> Result<VoxelGrid> {
        let e = &self.entries[index];
        vopl::decode_payload(&self.header, e.enc, &e.payload)
    }

    // -----------------------------------------------------------------------
    // Marshal
    // -----------------------------------------------------------------------

    /// Encode the pack with the given layout and compression.
    pub fn marshal(&self, layout: PackLayout, comp: PackCompression) -> Result<Vec<u8>> {
        if self.header.ver != vopl::VERSION {
            return Err(Error::UnsupportedVersion(self.header.ver));
        }
        let version = if layout == PackLayout::Raw
            && matches!(comp, PackCompression::None | PackCompression::Zlib)
        {
            PACK_VERSION_1
        } else {
            PACK_VERSION_2
        };

        let mut content = Vec::new();
        content.push(self.header.ver);
        content.push(self.header.bpp);
        content.push(self.header.w);
        content.push(self.header.h);
        content.push(self.header.d);
        content.extend_from_slice(&self.header.pal.to_le_bytes());

        match layout {
            PackLayout::Raw => {
                if version >= PACK_VERSION_2 {
                    content.push(PackLayout::Raw.byte());
                }
                content.extend_from_slice(&(self.entries.len() as u32).to_le_bytes());
                for e in &self.entries {
                    write_entry_prefix(&mut content, e)?;
                    content.extend_from_slice(&(e.payload.len() as u32).to_le_bytes());
                    content.extend_from_slice(&e.payload);
                }
            }
            PackLayout::Cdc => {
                let params = CdcParams::default();
                content.push(PackLayout::Cdc.byte());
                content.extend_from_slice(&params.target.to_le_bytes());
                content.extend_from_slice(&params.min_size.to_le_bytes());
                content.extend_from_slice(&params.max_size.to_le_bytes());

                let payloads: Vec<&[u8]> =
                    self.entries.iter().map(|e| e.payload.as_slice()).collect();
                let (blocks, sequences) = cdc::build_index(&payloads, &params);

                content.extend_from_slice(&(blocks.len() as u32).to_le_bytes());
                for blk in &blocks {
                    content.extend_from_slice(&(blk.len() as u32).to_le_bytes());
                    content.extend_from_slice(blk);
                }
                content.extend_from_slice(&(self.entries.len() as u32).to_le_bytes());
                for (e, seq) in self.entries.iter().zip(&sequences) {
                    write_entry_prefix(&mut content, e)?;
                    content.extend_from_slice(&(e.payload.len() as u32).to_le_bytes());
                    content.extend_from_slice(&(seq.len() as u32).to_le_bytes());
                    for &idx in seq {
                        content.extend_from_slice(&idx.to_le_bytes());
                    }
                }
            }
        }

        let wrapped = comp.compress(&content)?;
        let mut out = Vec::with_capacity(PACK_MAGIC.len() + 2 + wrapped.len());
        out.extend_from_slice(PACK_MAGIC);
        out.push(version);
        out.push(comp.byte());
        out.extend_from_slice(&wrapped);
        Ok(out)
    }

    // -----------------------------------------------------------------------
    // Unmarshal
    // -----------------------------------------------------------------------

    /// Parse a .voplpack, returning the pack and the compression it used.
    pub fn unmarshal(data: &[u8]) -> Result<(Self, PackCompression)> {
        if data.len() < PACK_MAGIC.len() + 2 || &data[..8] != PACK_MAGIC {
            return Err(Error::BadMagic);
        }
        let version = data[8];
        if version != PACK_VERSION_1 && version != PACK_VERSION_2 {
            return Err(Error::UnsupportedVersion(version));
        }
        let comp = PackCompression::from_byte(data[9])?;
        let content = comp.decompress(&data[10..])?;

        let mut pos = 0usize;
        let header = VoplHeader {
            ver: read_u8(&content, &mut pos)?,
            bpp: read_u8(&content, &mut pos)?,
            w: read_u8(&content, &mut pos)?,
            h: read_u8(&content, &mut pos)?,
            d: read_u8(&content, &mut pos)?,
            pal: read_u16(&content, &mut pos)?,
            payload_len: 0,
        };

        let layout = if version >= PACK_VERSION_2 {
            PackLayout::from_byte(read_u8(&content, &mut pos)?)?
        } else {
            PackLayout::Raw
        };

        let entries = match layout {
            PackLayout::Raw => read_raw_entries(&content, &mut pos)?,
            PackLayout::Cdc => read_cdc_entries(&content, &mut pos)?,
        };

        Ok((Self { header, entries }, comp))
    }
}

// ---------------------------------------------------------------------------
// Grid-level convenience
// ---------------------------------------------------------------------------

/// Encode each named grid at the pack bpp and assemble the entries.
///
/// With the `parallel` feature the per-chunk candidate evaluation fans out
/// over rayon; entry order (and therefore output bytes) is unaffected.
pub fn pack_from_grids(named_grids: &[(&str, &VoxelGrid)]) -> Pack {
    #[cfg(feature = "parallel")]
    let encoded: Vec<_> = named_grids
        .par_iter()
        .map(|(name, grid)| (name.to_string(), vopl::best_encoding(grid, vopl::PACK_BPP)))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let encoded: Vec<_> = named_grids
        .iter()
        .map(|(name, grid)| (name.to_string(), vopl::best_encoding(grid, vopl::PACK_BPP)))
        .collect();

    Pack {
        header: VoplHeader::for_chunk(vopl::PACK_BPP),
        entries: encoded
            .into_iter()
            .map(|(name, enc)| PackEntry {
                name,
                enc: enc.enc_byte(),
                payload: enc.payload,
            })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Wire helpers
// ---------------------------------------------------------------------------

fn write_entry_prefix(content: &mut Vec<u8>, e: &PackEntry) -> Result<()> {
    let name = e.name.as_bytes();
    if name.len() > usize::from(u16::MAX) {
        return Err(Error::NameTooLong(name.len()));
    }
    content.extend_from_slice(&(name.len() as u16).to_le_bytes());
    content.extend_from_slice(name);
    content.push(e.enc);
    Ok(())
}

fn read_u8(data: &[u8], pos: &mut usize) -> Result<u8> {
    let b = *data.get(*pos).ok_or(Error::TruncatedPayload)?;
    *pos += 1;
    Ok(b)
}

fn read_u16(data: &[u8], pos: &mut usize) -> Result<u16> {
    let bytes = data
        .get(*pos..*pos + 2)
        .ok_or(Error::TruncatedPayload)?
        .try_into()
        .expect("slice length checked");
    *pos += 2;
    Ok(u16::from_le_bytes(bytes))
}

fn read_u32(data: &[u8], pos: &mut usize) -> Result<u32> {
    let bytes = data
        .get(*pos..*pos + 4)
        .ok_or(Error::TruncatedPayload)?
        .try_into()
        .expect("slice length checked");
    *pos += 4;
    Ok(u32::from_le_bytes(bytes))
}

fn read_bytes<'a>(data: &'a [u8], pos: &mut usize, len: usize) -> Result<&'a [u8]> {
    let bytes = data.get(*pos..*pos + len).ok_or(Error::TruncatedPayload)?;
    *pos += len;
    Ok(bytes)
}

fn read_entry_prefix(data: &[u8], pos: &mut usize) -> Result<(String, u8)> {
    let name_len = usize::from(read_u16(data, pos)?);
    let name = String::from_utf8_lossy(read_bytes(data, pos, name_len)?).into_owned();
    let enc = read_u8(data, pos)?;
    Ok((name, enc))
}

fn read_raw_entries(content: &[u8], pos: &mut usize) -> Result<Vec<PackEntry>> {
    let n = read_u32(content, pos)?;
    let mut entries = Vec::with_capacity((n as usize).min(1024));
    for _ in 0..n {
        let (name, enc) = read_entry_prefix(content, pos)?;
        let payload_len = read_u32(content, pos)? as usize;
        let payload = read_bytes(content, pos, payload_len)?.to_vec();
        entries.push(PackEntry { name, enc, payload });
    }
    Ok(entries)
}

fn read_cdc_entries(content: &[u8], pos: &mut usize) -> Result<Vec<PackEntry>> {
    let _target = read_u32(content, pos)?;
    let _min_size = read_u32(content, pos)?;
    let max_size = read_u32(content, pos)?;

    let n_blocks = read_u32(content, pos)?;
    let mut blocks = Vec::with_capacity((n_blocks as usize).min(1024));
    for _ in 0..n_blocks {
        let len = read_u32(content, pos)? as usize;
        blocks.push(read_bytes(content, pos, len)?);
    }

    let n = read_u32(content, pos)?;
    let mut entries = Vec::with_capacity((n as usize).min(1024));
    for _ in 0..n {
        let (name, enc) = read_entry_prefix(content, pos)?;
        let raw_len = read_u32(content, pos)? as usize;
        let seq_len = read_u32(content, pos)?;

        let mut total = 0usize;
        let mut indices = Vec::with_capacity((seq_len as usize).min(1024));
        for _ in 0..seq_len {
            let idx = read_u32(content, pos)?;
            if idx >= n_blocks {
                return Err(Error::BadIndex(idx));
            }
            total += blocks[idx as usize].len();
            // Sanity bound: a well-formed sequence can overshoot raw_len by
            // at most one block.
            if total > raw_len + max_size as usize {
                return Err(Error::InconsistentPack(format!(
                    "entry '{name}' block sequence exceeds its declared length"
                )));
            }
            indices.push(idx);
        }

        let mut payload = Vec::with_capacity(total);
        for idx in indices {
            payload.extend_from_slice(blocks[idx as usize]);
        }
        payload.truncate(raw_len);
        entries.push(PackEntry { name, enc, payload });
    }
    Ok(entries)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{DEPTH, WIDTH};

    fn hill_grid(seed: usize) -> VoxelGrid {
        let mut g = VoxelGrid::default();
        for x in 0..WIDTH {
            for z in 0..DEPTH {
                let top = 2 + (x + z + seed) % 6;
                for y in 0..top {
                    g.set(x, y, z, (1 + (seed + y) % 63) as u8);
                }
            }
        }
        g
    }

    fn sample_pack() -> Pack {
        let a = hill_grid(1);
        let b = hill_grid(2);
        pack_from_grids(&[("chunk_a", &a), ("chunk_b", &b)])
    }

    #[test]
    fn raw_roundtrip_all_compressions() {
        let pack = sample_pack();
        for comp in [
            PackCompression::None,
            PackCompression::Zlib,
            PackCompression::Zstd,
        ] {
            let bytes = pack.marshal(PackLayout::Raw, comp).unwrap();
            let (back, got_comp) = Pack::unmarshal(&bytes).unwrap();
            assert_eq!(got_comp, comp);
            assert_eq!(back, pack);
        }
    }

    #[test]
    fn cdc_roundtrip_all_compressions() {
        let pack = sample_pack();
        for comp in [
            PackCompression::None,
            PackCompression::Zlib,
            PackCompression::Zstd,
        ] {
            let bytes = pack.marshal(PackLayout::Cdc, comp).unwrap();
            let (back, got_comp) = Pack::unmarshal(&bytes).unwrap();
            assert_eq!(got_comp, comp);
            assert_eq!(back, pack);
        }
    }

    #[test]
    fn version_selection() {
        let pack = sample_pack();
        let v1 = pack.marshal(PackLayout::Raw, PackCompression::None).unwrap();
        assert_eq!(v1[8], PACK_VERSION_1);
        let v1 = pack.marshal(PackLayout::Raw, PackCompression::Zlib).unwrap();
        assert_eq!(v1[8], PACK_VERSION_1);
        let v2 = pack.marshal(PackLayout::Raw, PackCompression::Zstd).unwrap();
        assert_eq!(v2[8], PACK_VERSION_2);
        let v2 = pack.marshal(PackLayout::Cdc, PackCompression::None).unwrap();
        assert_eq!(v2[8], PACK_VERSION_2);
    }

    #[test]
    fn marshal_is_deterministic() {
        let pack = sample_pack();
        for layout in [PackLayout::Raw, PackLayout::Cdc] {
            let a = pack.marshal(layout, PackCompression::None).unwrap();
            let b = pack.marshal(layout, PackCompression::None).unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn identical_payloads_dedup_under_cdc() {
        let g = hill_grid(3);
        let pack = pack_from_grids(&[("one", &g), ("two", &g)]);
        let raw = pack.marshal(PackLayout::Raw, PackCompression::None).unwrap();
        let cdc = pack.marshal(PackLayout::Cdc, PackCompression::None).unwrap();
        // Both entries share every block, so the CDC form stores one copy.
        assert!(cdc.len() < raw.len());
        let (back, _) = Pack::unmarshal(&cdc).unwrap();
        assert_eq!(back.entries[0].payload, back.entries[1].payload);
    }

    #[test]
    fn from_vopl_files_roundtrip() {
        let a = vopl::encode(&hill_grid(4));
        let b = vopl::encode(&hill_grid(5));
        let pack =
            Pack::from_vopl_files(&[("a.vopl", a.as_slice()), ("b.vopl", b.as_slice())]).unwrap();
        assert_eq!(pack.entries.len(), 2);

        let files = pack.to_vopl_files();
        assert_eq!(files[0].1, a);
        assert_eq!(files[1].1, b);
        assert_eq!(pack.decode_entry(0).unwrap(), hill_grid(4));
    }

    #[test]
    fn mismatched_bpp_is_inconsistent() {
        let a = vopl::encode(&hill_grid(6)); // bpp 6
        let b = vopl::encode_with_bpp(&hill_grid(7), 8);
        let err = Pack::from_vopl_files(&[("a", a.as_slice()), ("b", b.as_slice())]).unwrap_err();
        assert!(matches!(err, Error::InconsistentPack(_)));
    }

    #[test]
    fn unmarshal_rejects_bad_framing() {
        assert_eq!(Pack::unmarshal(b"VOPLPACK"), Err(Error::BadMagic));
        assert_eq!(Pack::unmarshal(b"NOTAPACK\x01\x00"), Err(Error::BadMagic));

        let pack = sample_pack();
        let mut bytes = pack.marshal(PackLayout::Raw, PackCompression::None).unwrap();
        bytes[8] = 9;
        assert_eq!(Pack::unmarshal(&bytes), Err(Error::UnsupportedVersion(9)));

        let mut bytes = pack.marshal(PackLayout::Raw, PackCompression::None).unwrap();
        bytes[9] = 7;
        assert_eq!(
            Pack::unmarshal(&bytes),
            Err(Error::UnsupportedCompression(7))
        );
    }

    #[test]
    fn unmarshal_rejects_unknown_layout() {
        let pack = sample_pack();
        let mut bytes = pack.marshal(PackLayout::Cdc, PackCompression::None).unwrap();
        // Layout byte sits right after the 7-byte common header.
        bytes[10 + 7] = 9;
        assert_eq!(Pack::unmarshal(&bytes), Err(Error::UnknownLayout(9)));
    }

    #[test]
    fn unmarshal_rejects_out_of_range_block_index() {
        let g = hill_grid(8);
        let pack = pack_from_grids(&[("g", &g)]);
        let mut bytes = pack.marshal(PackLayout::Cdc, PackCompression::None).unwrap();
        // The last u32 of the file is the final (often only) block index.
        let len = bytes.len();
        bytes[len - 4..].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(
            Pack::unmarshal(&bytes),
            Err(Error::BadIndex(_) | Error::TruncatedPayload)
        ));
    }

    #[test]
    fn truncated_content_is_rejected() {
        let pack = sample_pack();
        let bytes = pack.marshal(PackLayout::Raw, PackCompression::None).unwrap();
        assert_eq!(
            Pack::unmarshal(&bytes[..bytes.len() - 5]),
            Err(Error::TruncatedPayload)
        );
    }

    #[test]
    fn long_names_are_rejected() {
        let mut pack = sample_pack();
        pack.entries[0].name = "x".repeat(70_000);
        assert!(matches!(
            pack.marshal(PackLayout::Raw, PackCompression::None),
            Err(Error::NameTooLong(_))
        ));
    }
}
