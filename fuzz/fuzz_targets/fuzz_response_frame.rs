#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use modbus_rtu_master::{decode_response, FunctionCode, RegisterBank, Transaction};

#[derive(Debug, Arbitrary)]
struct Input {
    unit_id: u8,
    function: u8,
    address: u16,
    quantity_or_value: u16,
    local_offset: u8,
    frame: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let Some(function) = FunctionCode::from_u8(input.function) else {
        return;
    };
    let tx = Transaction::new(
        input.unit_id,
        function,
        input.address,
        input.quantity_or_value,
        u16::from(input.local_offset),
    );
    // Windows past the end of the bank must be rejected, not indexed.
    let mut bank = RegisterBank::new(128);
    let before = bank.clone();

    if decode_response(&input.frame, &tx, &mut bank).is_err() {
        assert_eq!(bank, before, "failed decode must leave the bank untouched");
    }
});
