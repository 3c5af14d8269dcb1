#![no_main]

use libfuzzer_sys::fuzz_target;
use mbus_fields::Decoder;

fuzz_target!(|data: &[u8]| {
    let decoder = match Decoder::builtin() {
        Ok(decoder) => decoder,
        Err(_) => return,
    };

    if let Ok(decoded) = decoder.decode(data) {
        let _ = decoded.to_json();
    }

    // Force the driver so the field pipeline runs for any header
    if let Ok(decoded) = decoder.decode_with_driver(data, "qheat_55_usr") {
        let _ = decoded.to_json();
    }
});
