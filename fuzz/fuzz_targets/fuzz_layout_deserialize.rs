#![no_main]

use libfuzzer_sys::fuzz_target;
use workbench_core::codec;
use workbench_layout::{deserialize_grid, deserialize_layout, serialize_layout};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Raw envelopes and JSON wrapped in envelopes at every known version.
    let _ = deserialize_grid(text);
    if let Ok(layout) = deserialize_layout(text) {
        check_round_trip(&layout);
    }
    for version in 0..=7 {
        let encoded = codec::encode(text, version);
        let _ = deserialize_grid(&encoded);
        if let Ok(layout) = deserialize_layout(&encoded) {
            check_round_trip(&layout);
        }
    }
});

fn check_round_trip(layout: &workbench_layout::Layout) {
    for (_, grid) in layout.grids() {
        grid.validate().expect("deserialized grid is valid");
    }
    let encoded = serialize_layout(layout).expect("valid layout serializes");
    let restored = deserialize_layout(&encoded).expect("own output deserializes");
    assert_eq!(
        serialize_layout(&restored).expect("restored layout serializes"),
        encoded,
        "round trip changed the layout"
    );
}
