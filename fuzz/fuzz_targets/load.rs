#![no_main]

use libfuzzer_sys::fuzz_target;
use sdrscope::prelude::*;
use strum::IntoEnumIterator;

fuzz_target!(|data: &[u8]| {
    let config = CodecConfig::default().with_max_record_bytes(1 << 20);
    for format in SerializableFormat::iter() {
        let _ = Sdr::load_with_config(&mut &data[..], format, &config);
        let _ = Random::load_with_config(&mut &data[..], format, &config);
    }
});
