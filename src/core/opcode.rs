//! # Opcode Catalog
//!
//! The fixed table of pickle opcodes: symbolic name, one-byte wire code and the
//! lowest protocol version that defines it.
//!
//! ## Protocol Eras
//! - **0**: text mode, newline-terminated decimal and string arguments
//! - **1**: binary integers, counted strings, empty containers
//! - **2**: `PROTO` header, small tuples, `NEWTRUE`/`NEWFALSE`, `LONG1`/`LONG4`
//! - **3**: `bytes` support
//! - **4**: framing, sets, `SHORT_BINUNICODE`, 8-byte lengths, `MEMOIZE`
//! - **5**: `BYTEARRAY8` and out-of-band buffers

use crate::error::{AssemblerError, Result};

/// The canonical `INT` encoding of `True` (not an opcode)
pub const TRUE: &[u8] = b"I01\n";

/// The canonical `INT` encoding of `False` (not an opcode)
pub const FALSE: &[u8] = b"I00\n";

macro_rules! opcodes {
    ($($variant:ident = $code:literal, $proto:literal;)*) => {
        /// A pickle opcode
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        #[allow(non_camel_case_types)]
        pub enum Opcode {
            $($variant = $code,)*
        }

        impl Opcode {
            /// Every opcode, in catalog order
            pub const ALL: &'static [Opcode] = &[$(Opcode::$variant,)*];

            /// Symbolic name as used in disassembly listings
            pub fn name(self) -> &'static str {
                match self {
                    $(Opcode::$variant => stringify!($variant),)*
                }
            }

            /// Lowest protocol version that defines this opcode
            pub fn proto(self) -> u8 {
                match self {
                    $(Opcode::$variant => $proto,)*
                }
            }

            /// Look up an opcode by its wire byte
            pub fn from_code(code: u8) -> Option<Self> {
                match code {
                    $($code => Some(Opcode::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

opcodes! {
    // Protocol 0
    MARK = b'(', 0;
    STOP = b'.', 0;
    POP = b'0', 0;
    DUP = b'2', 0;
    FLOAT = b'F', 0;
    INT = b'I', 0;
    LONG = b'L', 0;
    NONE = b'N', 0;
    PERSID = b'P', 0;
    REDUCE = b'R', 0;
    STRING = b'S', 0;
    UNICODE = b'V', 0;
    APPEND = b'a', 0;
    BUILD = b'b', 0;
    GLOBAL = b'c', 0;
    DICT = b'd', 0;
    GET = b'g', 0;
    INST = b'i', 0;
    LIST = b'l', 0;
    PUT = b'p', 0;
    SETITEM = b's', 0;
    TUPLE = b't', 0;

    // Protocol 1
    POP_MARK = b'1', 1;
    BININT = b'J', 1;
    BININT1 = b'K', 1;
    BININT2 = b'M', 1;
    BINPERSID = b'Q', 1;
    BINSTRING = b'T', 1;
    SHORT_BINSTRING = b'U', 1;
    BINUNICODE = b'X', 1;
    EMPTY_DICT = b'}', 1;
    APPENDS = b'e', 1;
    BINGET = b'h', 1;
    LONG_BINGET = b'j', 1;
    EMPTY_LIST = b']', 1;
    OBJ = b'o', 1;
    BINPUT = b'q', 1;
    LONG_BINPUT = b'r', 1;
    EMPTY_TUPLE = b')', 1;
    SETITEMS = b'u', 1;
    BINFLOAT = b'G', 1;

    // Protocol 2
    PROTO = 0x80, 2;
    NEWOBJ = 0x81, 2;
    EXT1 = 0x82, 2;
    EXT2 = 0x83, 2;
    EXT4 = 0x84, 2;
    TUPLE1 = 0x85, 2;
    TUPLE2 = 0x86, 2;
    TUPLE3 = 0x87, 2;
    NEWTRUE = 0x88, 2;
    NEWFALSE = 0x89, 2;
    LONG1 = 0x8a, 2;
    LONG4 = 0x8b, 2;

    // Protocol 3
    BINBYTES = b'B', 3;
    SHORT_BINBYTES = b'C', 3;

    // Protocol 4
    SHORT_BINUNICODE = 0x8c, 4;
    BINUNICODE8 = 0x8d, 4;
    BINBYTES8 = 0x8e, 4;
    EMPTY_SET = 0x8f, 4;
    ADDITEMS = 0x90, 4;
    FROZENSET = 0x91, 4;
    NEWOBJ_EX = 0x92, 4;
    STACK_GLOBAL = 0x93, 4;
    MEMOIZE = 0x94, 4;
    FRAME = 0x95, 4;

    // Protocol 5
    BYTEARRAY8 = 0x96, 5;
    NEXT_BUFFER = 0x97, 5;
    READONLY_BUFFER = 0x98, 5;
}

impl Opcode {
    /// Wire byte of this opcode
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Resolve an opcode from its symbolic name
    ///
    /// # Errors
    /// Returns `AssemblerError::NotFound` if no opcode has that name
    pub fn from_name(name: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.name() == name)
            .ok_or_else(|| AssemblerError::NotFound(format!("opcode {name}")))
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
