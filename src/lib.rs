//! Vopl: a voxel chunk codec for 16x16x16 palette grids.
//!
//! The crate provides:
//! - The VOPL container codec (`vopl`): Morton-ordered, bit-packed payloads
//!   with per-chunk selection of the smallest of five encodings
//! - The VOPLPACK archive (`pack`): multi-chunk packing with optional
//!   content-defined-chunking deduplication and zlib/zstd wrapping
//! - The VPI18 sparse update bitstream (`vpi18`): 18-bit (index, colour)
//!   entries with delete semantics
//! - A greedy quad mesher (`mesh`)
//!
//! # Quick Start
//!
//! ```
//! use vopl::grid::VoxelGrid;
//!
//! let mut grid = VoxelGrid::default();
//! grid.set(1, 2, 3, 42);
//!
//! let bytes = vopl::vopl::encode(&grid);
//! let decoded = vopl::vopl::decode(&bytes).unwrap();
//! assert_eq!(decoded, grid);
//!
//! let mesh = vopl::mesh::generate_mesh(&grid);
//! assert_eq!(mesh.vertex_count(), 24);
//! ```

pub mod bitio;
pub mod error;
pub mod grid;
pub mod mesh;
pub mod morton;
pub mod pack;
pub mod vopl;
pub mod vpi18;

pub use error::{Error, Result};
pub use grid::{VoxelGrid, expand_rle};
pub use mesh::{Mesh, Vertex, generate_mesh};
pub use pack::{CdcParams, Pack, PackCompression, PackEntry, PackLayout, pack_from_grids};
pub use vopl::VoplHeader;
