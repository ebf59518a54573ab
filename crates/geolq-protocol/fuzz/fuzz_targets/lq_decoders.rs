#![no_main]

use geolq_protocol::{GeoPosition, IpVersion, LiteLq, PudLqPair};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Decoders must never panic, and must consume exactly one fixed-size
    // record or nothing at all.
    let mut cursor = data;
    if let Ok(lq) = LiteLq::decode(&mut cursor) {
        assert_eq!(data.len() - cursor.len(), geolq_protocol::LITE_LQ_PAIR_SIZE);
        let mut out = Vec::new();
        lq.encode(&mut out);
    } else {
        assert_eq!(cursor.len(), data.len());
    }

    let mut cursor = data;
    let _ = GeoPosition::decode(&mut cursor);

    for version in [IpVersion::V4, IpVersion::V6] {
        let mut cursor = data;
        if let Ok(pair) = PudLqPair::decode(version, &mut cursor) {
            let mut out = Vec::new();
            let written = pair.encode(version, &mut out);
            assert_eq!(written, data.len() - cursor.len());
        }
    }
});
