#![no_main]
use libfuzzer_sys::fuzz_target;

use vopl::{Pack, PackCompression, PackLayout};

fuzz_target!(|data: &[u8]| {
    // The archive parser must never panic on arbitrary bytes.
    let Ok((pack, comp)) = Pack::unmarshal(data) else {
        return;
    };

    // A parsed v3 pack must marshal and re-parse to the same structure,
    // for both layouts, under the compression the input declared.
    if pack.header.ver != 3 {
        return;
    }
    for layout in [PackLayout::Raw, PackLayout::Cdc] {
        let bytes = pack.marshal(layout, comp).unwrap();
        let (back, back_comp) = Pack::unmarshal(&bytes).unwrap();
        assert_eq!(back_comp, comp);
        assert_eq!(back, pack);
    }
});
