#![no_main]

use libfuzzer_sys::fuzz_target;
use num_bigint::BigInt;
use pickle_assembler::core::pack::{pack, Endian, WordSize};

fuzz_target!(|data: &[u8]| {
    // Any two's-complement byte string is a valid integer to pack
    let value = BigInt::from_signed_bytes_le(data);

    if let Ok(minimal) = pack(&value, Endian::Little, None, true) {
        if !minimal.is_empty() {
            assert_eq!(BigInt::from_signed_bytes_le(&minimal), value);
        }
    }

    for size in [WordSize::W8, WordSize::W16, WordSize::W32, WordSize::W64] {
        for signed in [true, false] {
            if let Ok(bytes) = pack(&value, Endian::Big, Some(size), signed) {
                assert_eq!(bytes.len(), size.bytes());
            }
        }
    }
});
