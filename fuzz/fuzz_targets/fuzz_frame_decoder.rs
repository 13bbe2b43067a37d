#![no_main]
use jetgrid_core::config::GridGeometry;
use jetgrid_core::{ValveGrid, decode_stream};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(frames) = decode_stream(data) else {
        return;
    };
    let Ok(grid) = ValveGrid::new(&GridGeometry::default()) else {
        return;
    };
    for f in &frames {
        // Encoder and length estimate agree on decoded input
        let mut out = Vec::new();
        if f.encode(&mut out).is_ok() {
            assert_eq!(out.len(), f.encoded_len());
        }
        let _ = f.to_states(&grid);
    }
});
