use vopl::grid::VoxelGrid;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A little pyramid.
    let mut grid = VoxelGrid::default();
    for y in 0..6 {
        for x in y..16 - y {
            for z in y..16 - y {
                grid.set(x, y, z, (1 + y) as u8);
            }
        }
    }

    let file = vopl::vopl::encode(&grid);
    let restored = vopl::vopl::decode(&file)?;
    assert_eq!(restored, grid);

    let mesh = vopl::generate_mesh(&restored);
    println!(
        "{} voxels -> {} byte .vopl -> {} quads ({} vertices, {} triangles)",
        grid.count_non_zero(),
        file.len(),
        mesh.quad_count(),
        mesh.vertex_count(),
        mesh.triangle_count()
    );

    Ok(())
}
