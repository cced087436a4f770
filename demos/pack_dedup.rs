use vopl::grid::VoxelGrid;
use vopl::{Pack, PackCompression, PackLayout, pack_from_grids};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Sixteen chunks, half of them identical copies: CDC finds the shared
    // payload bytes and stores them once.
    let mut flat = VoxelGrid::default();
    for x in 0..16 {
        for z in 0..16 {
            flat.set(x, 0, z, 7);
        }
    }
    let mut hills = VoxelGrid::default();
    for x in 0..16 {
        for z in 0..16 {
            for y in 0..=(x * z) % 5 {
                hills.set(x, y, z, (1 + y) as u8);
            }
        }
    }

    let names: Vec<String> = (0..16).map(|i| format!("chunk_{i:02}")).collect();
    let named: Vec<(&str, &VoxelGrid)> = names
        .iter()
        .enumerate()
        .map(|(i, n)| (n.as_str(), if i % 2 == 0 { &flat } else { &hills }))
        .collect();
    let pack = pack_from_grids(&named);

    let raw = pack.marshal(PackLayout::Raw, PackCompression::None)?;
    let cdc = pack.marshal(PackLayout::Cdc, PackCompression::None)?;
    let cdc_zstd = pack.marshal(PackLayout::Cdc, PackCompression::Zstd)?;

    println!("raw layout        : {} bytes", raw.len());
    println!("cdc layout        : {} bytes", cdc.len());
    println!("cdc + zstd        : {} bytes", cdc_zstd.len());

    let (restored, comp) = Pack::unmarshal(&cdc_zstd)?;
    assert_eq!(comp, PackCompression::Zstd);
    assert_eq!(restored, pack);
    println!("restored {} entries intact", restored.entries.len());

    Ok(())
}
