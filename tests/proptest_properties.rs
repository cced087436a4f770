use proptest::prelude::*;

use vopl::bitio::{BitReader, BitWriter, read_uvarint, write_uvarint};
use vopl::grid::{VOLUME, VoxelGrid};
use vopl::vpi18::{self, Vpi18Entry};
use vopl::{Pack, PackCompression, PackLayout, pack_from_grids};

fn grid_strategy(max_colour: u8) -> impl Strategy<Value = VoxelGrid> {
    // Sparse fills converge faster than uniform 4096-element vectors and
    // still exercise every encoding candidate.
    proptest::collection::vec((0..VOLUME, 1..=max_colour), 0..256).prop_map(|cells| {
        let mut grid = VoxelGrid::default();
        for (idx, colour) in cells {
            let (x, y, z) = vopl::grid::index_to_xyz(idx);
            grid.set(x, y, z, colour);
        }
        grid
    })
}

proptest! {
    #[test]
    fn prop_bitio_roundtrip(fields in proptest::collection::vec((any::<u64>(), 1u8..=57), 0..200)) {
        let mut bw = BitWriter::new();
        for &(v, n) in &fields {
            bw.write_bits(v, n);
        }
        let bytes = bw.finish();
        let mut br = BitReader::new(&bytes);
        for &(v, n) in &fields {
            let expect = v & ((1u64 << n) - 1);
            prop_assert_eq!(br.read_bits(n).unwrap(), expect);
        }
    }

    #[test]
    fn prop_uvarint_roundtrip(values in proptest::collection::vec(any::<u32>(), 0..64)) {
        let mut buf = Vec::new();
        for &v in &values {
            write_uvarint(&mut buf, v);
        }
        let mut pos = 0;
        for &v in &values {
            prop_assert_eq!(read_uvarint(&buf, &mut pos).unwrap(), v);
        }
        prop_assert_eq!(pos, buf.len());
    }

    #[test]
    fn prop_vopl_roundtrip(grid in grid_strategy(63)) {
        let file = vopl::vopl::encode(&grid);
        prop_assert_eq!(vopl::vopl::decode(&file).unwrap(), grid);
    }

    #[test]
    fn prop_vopl_adaptive_roundtrip(grid in grid_strategy(255)) {
        let file = vopl::vopl::encode_adaptive(&grid);
        prop_assert_eq!(vopl::vopl::decode(&file).unwrap(), grid);
    }

    #[test]
    fn prop_encoder_is_minimal(grid in grid_strategy(63)) {
        // The chosen payload never exceeds any single raw candidate; dense
        // bounds them all from above.
        let best = vopl::vopl::best_encoding(&grid, 6);
        let dense_bytes = (VOLUME * 6).div_ceil(8);
        prop_assert!(best.payload.len() <= dense_bytes);
    }

    #[test]
    fn prop_vpi18_grid_roundtrip(grid in grid_strategy(63)) {
        let stream = vpi18::encode_grid(&grid);
        let decoded = vpi18::decode_to_grid(&stream).unwrap();
        prop_assert_eq!(&decoded, &grid);
        // Non-delta streams re-encode byte-identically.
        prop_assert_eq!(vpi18::encode_grid(&decoded), stream);
    }

    #[test]
    fn prop_vpi18_entries_roundtrip(
        raw in proptest::collection::vec((0u16..4096, 0u8..64), 0..128)
    ) {
        let entries: Vec<Vpi18Entry> = raw
            .into_iter()
            .map(|(index, colour)| Vpi18Entry { index, colour })
            .collect();
        let stream = vpi18::encode_entries(&entries).unwrap();
        prop_assert_eq!(vpi18::decode_entries(&stream).unwrap(), entries);
    }

    #[test]
    fn prop_pack_roundtrip(
        grids in proptest::collection::vec(grid_strategy(63), 1..4),
        layout_cdc in any::<bool>(),
        comp_sel in 0u8..3
    ) {
        let named: Vec<(String, &VoxelGrid)> = grids
            .iter()
            .enumerate()
            .map(|(i, g)| (format!("g{i}"), g))
            .collect();
        let refs: Vec<(&str, &VoxelGrid)> =
            named.iter().map(|(n, g)| (n.as_str(), *g)).collect();
        let pack = pack_from_grids(&refs);

        let layout = if layout_cdc { PackLayout::Cdc } else { PackLayout::Raw };
        let comp = PackCompression::from_byte(comp_sel).unwrap();
        let bytes = pack.marshal(layout, comp).unwrap();
        let (back, got_comp) = Pack::unmarshal(&bytes).unwrap();
        prop_assert_eq!(got_comp, comp);
        prop_assert_eq!(back, pack);
    }

    #[test]
    fn prop_mesh_counts_are_coherent(grid in grid_strategy(63)) {
        let mesh = vopl::generate_mesh(&grid);
        prop_assert_eq!(mesh.vertex_count() % 4, 0);
        prop_assert_eq!(mesh.indices.len() % 6, 0);
        prop_assert_eq!(mesh.vertex_count() / 4, mesh.indices.len() / 6);
        // Every index refers to a real vertex.
        for &i in &mesh.indices {
            prop_assert!((i as usize) < mesh.vertex_count());
        }
    }

    #[test]
    fn prop_decode_arbitrary_bytes_never_panics(
        data in proptest::collection::vec(any::<u8>(), 0..512)
    ) {
        let _ = vopl::vopl::decode(&data);
        let _ = Pack::unmarshal(&data);
        let _ = vpi18::decode_entries(&data);
    }
}
