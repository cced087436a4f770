#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Decoders must never panic on arbitrary bytes — only return errors.
    let _ = vopl::vopl::decode(data);
    let _ = vopl::vpi18::decode_to_grid(data);

    // A successful VOPL decode must re-encode losslessly.
    if let Ok(grid) = vopl::vopl::decode(data) {
        let file = vopl::vopl::encode(&grid);
        assert_eq!(vopl::vopl::decode(&file).unwrap(), grid);
    }
});
