// test-only module included via protocol/mod.rs
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use crate::core::opcode::Opcode;
use crate::error::AssemblerError;
use crate::protocol::assembler::Assembler;
use crate::protocol::value::PickleValue;
use num_bigint::BigInt;

fn fresh(proto: u8) -> Assembler {
    Assembler::new(proto, true).expect("protocol should be valid")
}

/// Encode `value` and return the assembled bytes
fn encoded(proto: u8, value: impl Into<PickleValue>) -> Vec<u8> {
    let mut asm = fresh(proto);
    asm.encode_push(&value.into()).expect("value should encode");
    asm.assemble().to_vec()
}

/// Opcode byte the encoder chose for `value`, skipping the protocol header
fn chosen_opcode(proto: u8, value: impl Into<PickleValue>) -> u8 {
    let bytes = encoded(proto, value);
    let offset = if proto >= 2 { 2 } else { 0 };
    bytes[offset]
}

#[test]
fn test_none_at_protocol_zero() {
    let mut asm = fresh(0);
    asm.push_none().expect("NONE is a protocol 0 opcode");
    assert_eq!(&asm.assemble()[..], b"N.");
}

#[test]
fn test_marked_tuple_at_protocol_two() {
    let mut asm = fresh(2);
    asm.push_mark().unwrap();
    asm.push_binint1(1).unwrap();
    asm.push_binint1(2).unwrap();
    asm.push_binint1(3).unwrap();
    asm.build_tuple().unwrap();
    assert_eq!(&asm.assemble()[..], b"\x80\x02(K\x01K\x02K\x03t.");
}

#[test]
fn test_short_unicode_at_protocol_four() {
    let text = "bar\n\u{4e2d}\u{6587}";
    let bytes = encoded(4, text);

    let mut expected = vec![0x80, 0x04, 0x8c, 10];
    expected.extend_from_slice(text.as_bytes());
    expected.push(b'.');
    assert_eq!(bytes, expected);
}

#[test]
fn test_integer_selection_table() {
    let cases: [(i64, Opcode); 7] = [
        (0, Opcode::BININT1),
        (255, Opcode::BININT1),
        (256, Opcode::BININT2),
        (65535, Opcode::BININT2),
        (65536, Opcode::BININT),
        ((1 << 31) - 1, Opcode::BININT),
        (1 << 31, Opcode::LONG1),
    ];
    for proto in 2..=5 {
        for (value, expected) in cases {
            assert_eq!(
                chosen_opcode(proto, value),
                expected.code(),
                "value {value} at protocol {proto}"
            );
        }
    }
}

#[test]
fn test_integer_encodings() {
    assert_eq!(encoded(0, 42), b"I42\n.");
    assert_eq!(encoded(0, -5), b"I-5\n.");
    assert_eq!(encoded(1, -5), b"J\xfb\xff\xff\xff.");
    assert_eq!(encoded(1, 1i64 << 31), b"I2147483648\n.");
    assert_eq!(encoded(2, 1i64 << 31), b"\x80\x02\x8a\x05\x00\x00\x00\x80\x00.");
    assert_eq!(encoded(2, -(1i64 << 31)), b"\x80\x02J\x00\x00\x00\x80.");
    assert_eq!(encoded(2, -(1i64 << 31) - 1), b"\x80\x02\x8a\x05\xff\xff\xff\x7f\xff.");
}

#[test]
fn test_huge_integer_uses_long4() {
    let huge = BigInt::from(1) << 2039u32;
    let bytes = encoded(2, huge.clone());
    assert_eq!(bytes[2], Opcode::LONG4.code());
    // 2040 bits of magnitude plus a sign byte
    assert_eq!(&bytes[3..7], &256u32.to_le_bytes());

    let below = encoded(2, huge - 1);
    assert_eq!(below[2], Opcode::LONG1.code());
    assert_eq!(below[3], 255);
}

#[test]
fn test_long_emitters() {
    let mut asm = fresh(2);
    asm.push_long1(0).unwrap();
    asm.push_long1(255).unwrap();
    asm.push_long1(-256).unwrap();
    asm.push_long4(1).unwrap();
    assert_eq!(
        asm.payload(),
        b"\x80\x02\x8a\x00\x8a\x02\xff\x00\x8a\x02\x00\xff\x8b\x01\x00\x00\x00\x01"
    );

    let mut asm = fresh(0);
    asm.push_long(BigInt::from(1) << 64u32).unwrap();
    assert_eq!(asm.payload(), b"L18446744073709551616\n");
}

#[test]
fn test_booleans_by_protocol() {
    assert_eq!(encoded(0, true), b"I01\n.");
    assert_eq!(encoded(1, false), b"I00\n.");
    assert_eq!(encoded(2, true), b"\x80\x02\x88.");
    assert_eq!(encoded(5, false), b"\x80\x05\x89.");
}

#[test]
fn test_floats() {
    assert_eq!(encoded(0, 1.5), b"F1.5\n.");
    assert_eq!(encoded(0, 3.0), b"F3.0\n.");
    assert_eq!(encoded(1, 1.5), b"G\x3f\xf8\x00\x00\x00\x00\x00\x00.");
    assert_eq!(
        encoded(2, -0.0),
        b"\x80\x02G\x80\x00\x00\x00\x00\x00\x00\x00."
    );
}

#[test]
fn test_bytes_selection() {
    assert_eq!(encoded(3, &b"ab"[..]), b"\x80\x03C\x02ab.");

    let long = vec![0u8; 256];
    let bytes = encoded(3, &long[..]);
    assert_eq!(&bytes[..7], b"\x80\x03B\x00\x01\x00\x00");
    assert_eq!(bytes.len(), 2 + 1 + 4 + 256 + 1);

    let short = vec![7u8; 255];
    assert_eq!(chosen_opcode(4, &short[..]), Opcode::SHORT_BINBYTES.code());
}

#[test]
fn test_bytes_below_protocol_three() {
    for proto in 0..3 {
        let mut asm = fresh(proto);
        let err = asm
            .encode_push(&PickleValue::Bytes(b"x".to_vec()))
            .unwrap_err();
        assert_eq!(
            err,
            AssemblerError::ProtocolMismatch {
                opcode: "SHORT_BINBYTES",
                required: 3,
                current: proto,
            }
        );
    }
}

#[test]
fn test_string_selection() {
    assert_eq!(encoded(1, "hi"), b"X\x02\x00\x00\x00hi.");
    assert_eq!(encoded(3, "hi"), b"\x80\x03X\x02\x00\x00\x00hi.");
    assert_eq!(encoded(4, "hi"), b"\x80\x04\x8c\x02hi.");

    let long = "a".repeat(256);
    assert_eq!(chosen_opcode(4, long.as_str()), Opcode::BINUNICODE.code());
    assert_eq!(chosen_opcode(4, &long[..255]), Opcode::SHORT_BINUNICODE.code());
}

#[test]
fn test_unicode_line_escaping() {
    assert_eq!(encoded(0, "abc"), b"Vabc\n.");
    assert_eq!(encoded(0, "a\\b\nc"), b"Va\\u005cb\\u000ac\n.");
    assert_eq!(encoded(0, "\0\r\x1a"), b"V\\u0000\\u000d\\u001a\n.");
    assert_eq!(encoded(0, "\u{e9}\u{4e2d}"), b"V\xe9\\u4e2d\n.");
}

#[test]
fn test_lone_surrogate_needs_raw_append() {
    // U+D800 in surrogate-pass UTF-8; no `&str` can carry it
    let surrogate = b"\xed\xa0\x80";
    assert!(std::str::from_utf8(surrogate).is_err());

    let mut asm = fresh(1);
    asm.push_mark().unwrap();
    asm.append_raw(b"X\x03\x00\x00\x00");
    asm.append_raw(surrogate);
    asm.push_binunicode("ok").unwrap();
    asm.build_list().unwrap();
    assert_eq!(
        &asm.assemble()[..],
        b"(X\x03\x00\x00\x00\xed\xa0\x80X\x02\x00\x00\x00okl."
    );
}

#[test]
fn test_tuple_selection() {
    let empty = PickleValue::Tuple(vec![]);
    assert_eq!(encoded(0, empty.clone()), b"(t.");
    assert_eq!(encoded(1, empty), b").");

    let pair = PickleValue::Tuple(vec![1u8.into(), 2u8.into()]);
    assert_eq!(encoded(1, pair.clone()), b"(K\x01K\x02t.");
    assert_eq!(encoded(2, pair), b"\x80\x02K\x01K\x02\x86.");

    let single = PickleValue::Tuple(vec![PickleValue::None]);
    assert_eq!(encoded(2, single), b"\x80\x02N\x85.");

    let triple = PickleValue::Tuple(vec![PickleValue::None; 3]);
    assert_eq!(encoded(2, triple), b"\x80\x02NNN\x87.");

    let four = PickleValue::Tuple(vec![PickleValue::None; 4]);
    assert_eq!(encoded(2, four), b"\x80\x02(NNNNt.");
}

#[test]
fn test_list_and_dict_selection() {
    assert_eq!(encoded(0, PickleValue::List(vec![])), b"(l.");
    assert_eq!(encoded(1, PickleValue::List(vec![])), b"].");
    assert_eq!(
        encoded(2, PickleValue::List(vec![1u8.into()])),
        b"\x80\x02(K\x01l."
    );

    assert_eq!(encoded(0, PickleValue::Dict(vec![])), b"(d.");
    assert_eq!(encoded(1, PickleValue::Dict(vec![])), b"}.");
    let dict = PickleValue::Dict(vec![
        ("a".into(), 1u8.into()),
        ("b".into(), PickleValue::None),
    ]);
    assert_eq!(
        encoded(4, dict),
        b"\x80\x04(\x8c\x01aK\x01\x8c\x01bNd."
    );
}

#[test]
fn test_nested_containers() {
    let value = PickleValue::List(vec![
        PickleValue::Tuple(vec![true.into(), PickleValue::List(vec![])]),
        PickleValue::Dict(vec![(1u8.into(), "x".into())]),
    ]);
    assert_eq!(
        encoded(2, value),
        b"\x80\x02(\x88]\x86(K\x01X\x01\x00\x00\x00xdl."
    );
}

#[test]
fn test_legacy_strings() {
    let mut asm = fresh(1);
    asm.push_string("it's", "ascii").unwrap();
    asm.push_binstring("ab", "latin-1").unwrap();
    asm.push_short_binstring("\u{e9}", "utf-8").unwrap();
    assert_eq!(
        asm.payload(),
        b"S\"it's\"\nT\x02\x00\x00\x00abU\x02\xc3\xa9"
    );
}

#[test]
fn test_legacy_string_errors() {
    let mut asm = fresh(1);
    assert!(matches!(
        asm.push_string("x", "klingon"),
        Err(AssemblerError::LookupError(_))
    ));
    assert!(matches!(
        asm.push_binstring("\u{e9}", "ascii"),
        Err(AssemblerError::InvalidArgument(_))
    ));
    let long = "a".repeat(256);
    assert!(matches!(
        asm.push_short_binstring(&long, "ascii"),
        Err(AssemblerError::OutOfRange(_))
    ));
    assert!(asm.is_empty());
}

#[test]
fn test_references() {
    let mut asm = fresh(2);
    asm.push_global("builtins", "set").unwrap();
    asm.build_inst("copy_reg", "_reconstructor").unwrap();
    asm.push_persid("id7").unwrap();
    asm.build_binpersid().unwrap();
    asm.push_ext1(1).unwrap();
    asm.push_ext2(0x1234).unwrap();
    asm.push_ext4(-1).unwrap();
    assert_eq!(
        asm.payload(),
        b"\x80\x02cbuiltins\nset\nicopy_reg\n_reconstructor\nPid7\nQ\
          \x82\x01\x83\x34\x12\x84\xff\xff\xff\xff"
    );

    assert!(matches!(
        asm.push_ext1(256),
        Err(AssemblerError::OutOfRange(_))
    ));
    assert!(matches!(
        asm.build_inst("m\u{e9}", "x"),
        Err(AssemblerError::InvalidArgument(_))
    ));
}

#[test]
fn test_builders_and_stack() {
    let mut asm = fresh(5);
    asm.push_empty_set().unwrap();
    asm.push_mark().unwrap();
    asm.build_additems().unwrap();
    asm.push_mark().unwrap();
    asm.build_frozenset().unwrap();
    asm.build_stack_global().unwrap();
    asm.build_newobj().unwrap();
    asm.build_newobj_ex().unwrap();
    asm.build_obj().unwrap();
    asm.build_reduce().unwrap();
    asm.build_build().unwrap();
    asm.build_append().unwrap();
    asm.build_appends().unwrap();
    asm.build_setitem().unwrap();
    asm.build_setitems().unwrap();
    asm.build_dup().unwrap();
    asm.pop().unwrap();
    asm.pop_mark().unwrap();
    asm.push_next_buffer().unwrap();
    asm.build_readonly_buffer().unwrap();
    assert_eq!(
        &asm.payload()[2..],
        b"\x8f(\x90(\x91\x93\x81\x92oRbaesu201\x97\x98"
    );
}

#[test]
fn test_memo_emitters() {
    let mut asm = fresh(4);
    asm.memo_put(12).unwrap();
    asm.memo_get(12).unwrap();
    asm.memo_binput(255).unwrap();
    asm.memo_binget(0).unwrap();
    asm.memo_long_binput(256).unwrap();
    asm.memo_long_binget(u32::MAX).unwrap();
    asm.memo_memoize().unwrap();
    assert_eq!(
        &asm.payload()[2..],
        b"p12\ng12\nq\xffh\x00r\x00\x01\x00\x00j\xff\xff\xff\xff\x94"
    );

    assert!(matches!(asm.memo_get(-1), Err(AssemblerError::OutOfRange(_))));
    assert!(matches!(asm.memo_binput(256), Err(AssemblerError::OutOfRange(_))));
    assert!(matches!(
        asm.memo_long_binget(1u64 << 32),
        Err(AssemblerError::OutOfRange(_))
    ));
}

#[test]
fn test_frame() {
    let mut asm = fresh(4);
    asm.frame(9).unwrap();
    asm.push_none().unwrap();
    assert_eq!(
        &asm.assemble()[..],
        b"\x80\x04\x95\x09\x00\x00\x00\x00\x00\x00\x00N."
    );
}

#[test]
fn test_bytearray8() {
    let mut asm = fresh(5);
    asm.push_bytearray8(b"xy").unwrap();
    asm.push_binbytes8(b"").unwrap();
    assert_eq!(
        &asm.payload()[2..],
        b"\x96\x02\x00\x00\x00\x00\x00\x00\x00xy\x8e\x00\x00\x00\x00\x00\x00\x00\x00"
    );
}

#[test]
fn test_encode_serde_struct() {
    #[derive(serde::Serialize)]
    struct Point {
        x: u8,
        y: u8,
    }

    let mut asm = fresh(4);
    asm.encode(&Point { x: 1, y: 2 }).unwrap();
    assert_eq!(
        &asm.assemble()[..],
        b"\x80\x04(\x8c\x01xK\x01\x8c\x01yK\x02d."
    );
}

#[test]
fn test_encode_unsupported_type() {
    #[derive(serde::Serialize)]
    enum Shape {
        Circle,
    }

    let mut asm = fresh(4);
    let err = asm.encode(&Shape::Circle).unwrap_err();
    assert!(matches!(err, AssemblerError::UnsupportedType(_)));
    assert_eq!(asm.payload(), b"\x80\x04");
}
