#![no_main]

use libfuzzer_sys::fuzz_target;
use pickle_assembler::{Assembler, PickleValue};

fuzz_target!(|data: &[u8]| {
    // First byte picks protocol and gate; the rest drives the emitters
    let Some((&head, rest)) = data.split_first() else {
        return;
    };
    let Ok(mut asm) = Assembler::new(head % 6, head & 0x80 != 0) else {
        return;
    };

    for chunk in rest.chunks(3) {
        let arg = i64::from(chunk.get(1).copied().unwrap_or(0)) << (chunk.len() * 8);
        let before = asm.len();
        let result = match chunk[0] % 12 {
            0 => asm.push_binint1(arg),
            1 => asm.push_binint(arg),
            2 => asm.push_long1(-arg),
            3 => asm.push_short_binbytes(chunk),
            4 => asm.push_short_binunicode(&String::from_utf8_lossy(chunk)),
            5 => asm.push_string(&String::from_utf8_lossy(chunk), "latin-1"),
            6 => asm.memo_binput(arg),
            7 => asm.memo_get(arg - 128),
            8 => asm.push_mark(),
            9 => asm.build_tuple(),
            10 => asm.push_unicode(&String::from_utf8_lossy(chunk)),
            _ => asm.encode_push(&PickleValue::Bytes(chunk.to_vec())),
        };
        if result.is_err() {
            assert_eq!(asm.len(), before);
        }
    }

    assert_eq!(asm.assemble().last(), Some(&b'.'));
});
