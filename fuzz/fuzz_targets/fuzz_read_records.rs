#![no_main]

use libfuzzer_sys::fuzz_target;
use mbus_fields::payload::value::{decode_bits, decode_value};
use mbus_fields::read_records;

fuzz_target!(|data: &[u8]| {
    let chain = read_records(data);

    for record in &chain.records {
        let _ = record.raw_key();
        let _ = record.storage_nr();
        let _ = record.tariff();
        let _ = record.subunit();
        let _ = record.implied_unit();
        let _ = decode_value(record);
        let _ = decode_bits(record);
    }
});
