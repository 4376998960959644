//! # Pickle Assembler
//!
//! Stateful, append-only emitter with one method per opcode in the catalog.
//!
//! The assembler never models the decoder's stack or memo; it only writes the
//! bytes that instruct a decoder to manipulate them. It checks two things:
//! - every argument fits the opcode's declared width or length prefix;
//! - with verification enabled, the opcode exists in the active protocol.
//!
//! A failing call leaves the buffer untouched.
//!
//! ## Usage
//! ```rust
//! use pickle_assembler::Assembler;
//!
//! let mut asm = Assembler::new(2, true).unwrap();
//! asm.push_mark().unwrap();
//! asm.push_binint1(1).unwrap();
//! asm.push_binint1(2).unwrap();
//! asm.build_tuple().unwrap();
//! assert_eq!(&asm.assemble()[..], b"\x80\x02(K\x01K\x02t.");
//! ```

use crate::config::AssemblerConfig;
use crate::core::opcode::{self, Opcode};
use crate::core::pack::{self, WordSize};
use crate::core::text::{self, TextEncoding};
use crate::error::{constants, AssemblerError, Result};
use bytes::{BufMut, Bytes, BytesMut};
use num_bigint::BigInt;
use tracing::{debug, trace, warn};

/// The highest protocol version the assembler can generate
pub const HIGHEST_PROTOCOL: u8 = 5;

const LIMIT_U8: u64 = 1 << 8;
const LIMIT_I32: u64 = 1 << 31;
const LIMIT_U32: u64 = 1 << 32;

/// Low-level pickle assembler
#[derive(Debug, Clone)]
pub struct Assembler {
    proto: u8,
    verify: bool,
    payload: BytesMut,
}

impl Assembler {
    /// Create a new assembler.
    ///
    /// A `PROTO` header is written immediately when `proto >= 2`. With
    /// `verify` set, every opcode is checked against `proto` before emission.
    ///
    /// # Errors
    /// Returns `AssemblerError::InvalidArgument` if `proto` is above
    /// [`HIGHEST_PROTOCOL`]
    pub fn new(proto: u8, verify: bool) -> Result<Self> {
        if proto > HIGHEST_PROTOCOL {
            return Err(AssemblerError::InvalidArgument(format!(
                "unsupported pickle protocol {proto}, must be in range [0, {HIGHEST_PROTOCOL}]"
            )));
        }
        let mut payload = BytesMut::with_capacity(64);
        if proto >= 2 {
            payload.put_u8(Opcode::PROTO.code());
            payload.put_u8(proto);
        }
        debug!(proto, verify, "Created pickle assembler");
        Ok(Self {
            proto,
            verify,
            payload,
        })
    }

    /// Create an assembler from a validated configuration
    pub fn from_config(config: &AssemblerConfig) -> Result<Self> {
        config.validate()?;
        Self::new(config.protocol, config.verify)
    }

    /// Active protocol version
    pub fn protocol(&self) -> u8 {
        self.proto
    }

    /// Whether opcodes are checked against the protocol version
    pub fn verify(&self) -> bool {
        self.verify
    }

    /// Bytes emitted so far, without the terminating `STOP`
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Length of the payload emitted so far
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// True if nothing (not even a header) has been emitted
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Assemble the pickle: the payload followed by `STOP`.
    ///
    /// The assembler is left unchanged, so repeated calls return identical bytes.
    pub fn assemble(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(self.payload.len() + 1);
        out.extend_from_slice(&self.payload);
        out.put_u8(Opcode::STOP.code());
        debug!(len = out.len(), "Assembled pickle payload");
        out.freeze()
    }

    /// Append raw bytes without any interpretation
    pub fn append_raw(&mut self, data: &[u8]) {
        trace!(len = data.len(), "Appending raw data");
        self.payload.extend_from_slice(data);
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.payload.truncate(len);
    }

    fn check(&self, op: Opcode) -> Result<()> {
        if self.proto >= op.proto() {
            return Ok(());
        }
        if self.verify {
            return Err(AssemblerError::ProtocolMismatch {
                opcode: op.name(),
                required: op.proto(),
                current: self.proto,
            });
        }
        warn!(
            opcode = op.name(),
            required = op.proto(),
            current = self.proto,
            "Emitting opcode above the active protocol"
        );
        Ok(())
    }

    fn write(&mut self, op: Opcode, args: &[&[u8]]) {
        let arg_len: usize = args.iter().map(|a| a.len()).sum();
        trace!(opcode = op.name(), arg_len, "Emitting opcode");
        self.payload.reserve(1 + arg_len);
        self.payload.put_u8(op.code());
        for arg in args {
            self.payload.extend_from_slice(arg);
        }
    }

    fn emit(&mut self, op: Opcode) -> Result<()> {
        self.check(op)?;
        self.write(op, &[]);
        Ok(())
    }

    fn emit_decimal(&mut self, op: Opcode, value: &BigInt) -> Result<()> {
        self.check(op)?;
        self.write(op, &[value.to_string().as_bytes(), b"\n"]);
        Ok(())
    }

    fn emit_fixed(
        &mut self,
        op: Opcode,
        value: &BigInt,
        size: WordSize,
        signed: bool,
        what: &str,
    ) -> Result<()> {
        self.check(op)?;
        let arg = fixed_arg(value, size, signed, op, what)?;
        self.write(op, &[&arg]);
        Ok(())
    }

    fn emit_counted(
        &mut self,
        op: Opcode,
        data: &[u8],
        size: WordSize,
        signed: bool,
        limit: Option<u64>,
        what: &str,
    ) -> Result<()> {
        let len = data.len() as u64;
        if limit.is_some_and(|limit| len >= limit) {
            return Err(AssemblerError::OutOfRange(format!(
                "{what} too long for opcode {op}"
            )));
        }
        let prefix = pack::pack(&BigInt::from(len), pack::Endian::Little, Some(size), signed)?;
        self.write(op, &[&prefix, data]);
        Ok(())
    }

    fn emit_names(
        &mut self,
        op: Opcode,
        module: &str,
        name: &str,
        encoding: TextEncoding,
    ) -> Result<()> {
        self.check(op)?;
        let module = encoding.encode(module)?;
        let name = encoding.encode(name)?;
        self.write(op, &[&module, b"\n", &name, b"\n"]);
        Ok(())
    }

    // Constants

    pub fn push_none(&mut self) -> Result<()> {
        self.emit(Opcode::NONE)
    }

    pub fn push_false(&mut self) -> Result<()> {
        self.emit(Opcode::NEWFALSE)
    }

    pub fn push_true(&mut self) -> Result<()> {
        self.emit(Opcode::NEWTRUE)
    }

    pub fn push_empty_tuple(&mut self) -> Result<()> {
        self.emit(Opcode::EMPTY_TUPLE)
    }

    pub fn push_empty_list(&mut self) -> Result<()> {
        self.emit(Opcode::EMPTY_LIST)
    }

    pub fn push_empty_dict(&mut self) -> Result<()> {
        self.emit(Opcode::EMPTY_DICT)
    }

    pub fn push_empty_set(&mut self) -> Result<()> {
        self.emit(Opcode::EMPTY_SET)
    }

    pub fn push_mark(&mut self) -> Result<()> {
        self.emit(Opcode::MARK)
    }

    // Integers

    /// `INT` with a decimal argument
    pub fn push_int(&mut self, value: impl Into<BigInt>) -> Result<()> {
        self.emit_decimal(Opcode::INT, &value.into())
    }

    /// `INT` with the `01`/`00` literal a decoder reads back as a boolean
    pub fn push_int_bool(&mut self, value: bool) -> Result<()> {
        self.check(Opcode::INT)?;
        let literal = if value { opcode::TRUE } else { opcode::FALSE };
        self.write(Opcode::INT, &[&literal[1..]]);
        Ok(())
    }

    /// `BININT`: 4-byte signed
    pub fn push_binint(&mut self, value: impl Into<BigInt>) -> Result<()> {
        self.emit_fixed(Opcode::BININT, &value.into(), WordSize::W32, true, "integer")
    }

    /// `BININT1`: 1-byte unsigned
    pub fn push_binint1(&mut self, value: impl Into<BigInt>) -> Result<()> {
        self.emit_fixed(Opcode::BININT1, &value.into(), WordSize::W8, false, "integer")
    }

    /// `BININT2`: 2-byte unsigned
    pub fn push_binint2(&mut self, value: impl Into<BigInt>) -> Result<()> {
        self.emit_fixed(Opcode::BININT2, &value.into(), WordSize::W16, false, "integer")
    }

    /// `LONG` with a decimal argument, no size limit
    pub fn push_long(&mut self, value: impl Into<BigInt>) -> Result<()> {
        self.emit_decimal(Opcode::LONG, &value.into())
    }

    /// `LONG1`: minimal two's-complement bytes with a 1-byte length
    pub fn push_long1(&mut self, value: impl Into<BigInt>) -> Result<()> {
        self.check(Opcode::LONG1)?;
        let bytes = pack::pack(&value.into(), pack::Endian::Little, None, true)?;
        self.emit_counted(Opcode::LONG1, &bytes, WordSize::W8, false, Some(LIMIT_U8), "integer")
    }

    /// `LONG4`: minimal two's-complement bytes with a 4-byte signed length
    pub fn push_long4(&mut self, value: impl Into<BigInt>) -> Result<()> {
        self.check(Opcode::LONG4)?;
        let bytes = pack::pack(&value.into(), pack::Endian::Little, None, true)?;
        self.emit_counted(Opcode::LONG4, &bytes, WordSize::W32, true, Some(LIMIT_I32), "integer")
    }

    // Floats

    /// `FLOAT` with the shortest round-trip decimal text
    pub fn push_float(&mut self, value: f64) -> Result<()> {
        self.check(Opcode::FLOAT)?;
        self.write(Opcode::FLOAT, &[format!("{value:?}").as_bytes(), b"\n"]);
        Ok(())
    }

    /// `BINFLOAT`: big-endian IEEE-754 double
    pub fn push_binfloat(&mut self, value: f64) -> Result<()> {
        self.check(Opcode::BINFLOAT)?;
        self.write(Opcode::BINFLOAT, &[&value.to_be_bytes()]);
        Ok(())
    }

    // Byte strings in a chosen text encoding

    /// `STRING`: quoted, escaped literal (see [`text::ascii_repr`]) encoded in `encoding`
    pub fn push_string(&mut self, value: &str, encoding: &str) -> Result<()> {
        self.check(Opcode::STRING)?;
        let encoding: TextEncoding = encoding.parse()?;
        let literal = encoding.encode(&text::ascii_repr(value))?;
        self.write(Opcode::STRING, &[&literal, b"\n"]);
        Ok(())
    }

    /// `BINSTRING`: 4-byte signed length
    pub fn push_binstring(&mut self, value: &str, encoding: &str) -> Result<()> {
        self.check(Opcode::BINSTRING)?;
        let bytes = encoding.parse::<TextEncoding>()?.encode(value)?;
        self.emit_counted(Opcode::BINSTRING, &bytes, WordSize::W32, true, Some(LIMIT_I32), "string")
    }

    /// `SHORT_BINSTRING`: 1-byte length
    pub fn push_short_binstring(&mut self, value: &str, encoding: &str) -> Result<()> {
        self.check(Opcode::SHORT_BINSTRING)?;
        let bytes = encoding.parse::<TextEncoding>()?.encode(value)?;
        self.emit_counted(
            Opcode::SHORT_BINSTRING,
            &bytes,
            WordSize::W8,
            false,
            Some(LIMIT_U8),
            "string",
        )
    }

    // Raw bytes

    /// `BINBYTES`: 4-byte unsigned length
    pub fn push_binbytes(&mut self, value: &[u8]) -> Result<()> {
        self.check(Opcode::BINBYTES)?;
        self.emit_counted(Opcode::BINBYTES, value, WordSize::W32, false, Some(LIMIT_U32), "bytes")
    }

    /// `BINBYTES8`: 8-byte unsigned length
    pub fn push_binbytes8(&mut self, value: &[u8]) -> Result<()> {
        self.check(Opcode::BINBYTES8)?;
        self.emit_counted(Opcode::BINBYTES8, value, WordSize::W64, false, None, "bytes")
    }

    /// `SHORT_BINBYTES`: 1-byte length
    pub fn push_short_binbytes(&mut self, value: &[u8]) -> Result<()> {
        self.check(Opcode::SHORT_BINBYTES)?;
        self.emit_counted(
            Opcode::SHORT_BINBYTES,
            value,
            WordSize::W8,
            false,
            Some(LIMIT_U8),
            "bytes",
        )
    }

    /// `BYTEARRAY8`: same layout as `BINBYTES8`, decoded as a mutable byte array
    pub fn push_bytearray8(&mut self, value: &[u8]) -> Result<()> {
        self.check(Opcode::BYTEARRAY8)?;
        self.emit_counted(Opcode::BYTEARRAY8, value, WordSize::W64, false, None, "bytes")
    }

    // Unicode text

    /// `UNICODE`: raw-unicode-escaped line. Backslash, NUL, LF, CR and SUB are
    /// replaced by `\u` escapes first so the line survives the decoder.
    pub fn push_unicode(&mut self, value: &str) -> Result<()> {
        self.check(Opcode::UNICODE)?;
        let mut escaped = String::with_capacity(value.len());
        for c in value.chars() {
            match c {
                '\\' => escaped.push_str("\\u005c"),
                '\0' => escaped.push_str("\\u0000"),
                '\n' => escaped.push_str("\\u000a"),
                '\r' => escaped.push_str("\\u000d"),
                '\x1a' => escaped.push_str("\\u001a"),
                c => escaped.push(c),
            }
        }
        let line = text::raw_unicode_escape(&escaped);
        self.write(Opcode::UNICODE, &[&line, b"\n"]);
        Ok(())
    }

    /// `BINUNICODE`: UTF-8 with a 4-byte unsigned length
    ///
    /// The argument is a `&str`, so the encoded text is always well-formed
    /// UTF-8. A lone surrogate (which decoders accept as surrogate-pass
    /// UTF-8) cannot be expressed here; write the opcode, length and
    /// `0xED 0xA0..=0xBF ..` bytes with [`append_raw`](Self::append_raw).
    pub fn push_binunicode(&mut self, value: &str) -> Result<()> {
        self.check(Opcode::BINUNICODE)?;
        let bytes = text::utf8_surrogatepass(value);
        self.emit_counted(
            Opcode::BINUNICODE,
            bytes,
            WordSize::W32,
            false,
            Some(LIMIT_U32),
            "string",
        )
    }

    /// `BINUNICODE8`: UTF-8 with an 8-byte unsigned length
    ///
    /// Lone surrogates need [`append_raw`](Self::append_raw), as for
    /// [`push_binunicode`](Self::push_binunicode).
    pub fn push_binunicode8(&mut self, value: &str) -> Result<()> {
        self.check(Opcode::BINUNICODE8)?;
        let bytes = text::utf8_surrogatepass(value);
        self.emit_counted(Opcode::BINUNICODE8, bytes, WordSize::W64, false, None, "string")
    }

    /// `SHORT_BINUNICODE`: UTF-8 with a 1-byte length
    ///
    /// Lone surrogates need [`append_raw`](Self::append_raw), as for
    /// [`push_binunicode`](Self::push_binunicode).
    pub fn push_short_binunicode(&mut self, value: &str) -> Result<()> {
        self.check(Opcode::SHORT_BINUNICODE)?;
        let bytes = text::utf8_surrogatepass(value);
        self.emit_counted(
            Opcode::SHORT_BINUNICODE,
            bytes,
            WordSize::W8,
            false,
            Some(LIMIT_U8),
            "string",
        )
    }

    // References

    /// `GLOBAL`: push `module.name`, both UTF-8 and newline-terminated
    pub fn push_global(&mut self, module: &str, name: &str) -> Result<()> {
        self.emit_names(Opcode::GLOBAL, module, name, TextEncoding::Utf8)
    }

    /// `PERSID`: persistent id taken from an ASCII line
    pub fn push_persid(&mut self, pid: &str) -> Result<()> {
        self.check(Opcode::PERSID)?;
        let pid = TextEncoding::Ascii.encode(pid)?;
        self.write(Opcode::PERSID, &[&pid, b"\n"]);
        Ok(())
    }

    /// `EXT1`: extension registry code, 1-byte unsigned
    pub fn push_ext1(&mut self, code: impl Into<BigInt>) -> Result<()> {
        self.emit_fixed(Opcode::EXT1, &code.into(), WordSize::W8, false, "extension code")
    }

    /// `EXT2`: extension registry code, 2-byte unsigned
    pub fn push_ext2(&mut self, code: impl Into<BigInt>) -> Result<()> {
        self.emit_fixed(Opcode::EXT2, &code.into(), WordSize::W16, false, "extension code")
    }

    /// `EXT4`: extension registry code, 4-byte signed
    pub fn push_ext4(&mut self, code: impl Into<BigInt>) -> Result<()> {
        self.emit_fixed(Opcode::EXT4, &code.into(), WordSize::W32, true, "extension code")
    }

    /// `NEXT_BUFFER`: push the next out-of-band buffer
    pub fn push_next_buffer(&mut self) -> Result<()> {
        self.emit(Opcode::NEXT_BUFFER)
    }

    // Builders

    pub fn build_tuple(&mut self) -> Result<()> {
        self.emit(Opcode::TUPLE)
    }

    pub fn build_tuple1(&mut self) -> Result<()> {
        self.emit(Opcode::TUPLE1)
    }

    pub fn build_tuple2(&mut self) -> Result<()> {
        self.emit(Opcode::TUPLE2)
    }

    pub fn build_tuple3(&mut self) -> Result<()> {
        self.emit(Opcode::TUPLE3)
    }

    pub fn build_list(&mut self) -> Result<()> {
        self.emit(Opcode::LIST)
    }

    pub fn build_dict(&mut self) -> Result<()> {
        self.emit(Opcode::DICT)
    }

    pub fn build_frozenset(&mut self) -> Result<()> {
        self.emit(Opcode::FROZENSET)
    }

    pub fn build_append(&mut self) -> Result<()> {
        self.emit(Opcode::APPEND)
    }

    pub fn build_appends(&mut self) -> Result<()> {
        self.emit(Opcode::APPENDS)
    }

    pub fn build_setitem(&mut self) -> Result<()> {
        self.emit(Opcode::SETITEM)
    }

    pub fn build_setitems(&mut self) -> Result<()> {
        self.emit(Opcode::SETITEMS)
    }

    pub fn build_additems(&mut self) -> Result<()> {
        self.emit(Opcode::ADDITEMS)
    }

    /// `INST`: build an instance of `module.name`, both ASCII and newline-terminated
    pub fn build_inst(&mut self, module: &str, name: &str) -> Result<()> {
        self.emit_names(Opcode::INST, module, name, TextEncoding::Ascii)
    }

    pub fn build_obj(&mut self) -> Result<()> {
        self.emit(Opcode::OBJ)
    }

    pub fn build_newobj(&mut self) -> Result<()> {
        self.emit(Opcode::NEWOBJ)
    }

    pub fn build_newobj_ex(&mut self) -> Result<()> {
        self.emit(Opcode::NEWOBJ_EX)
    }

    pub fn build_stack_global(&mut self) -> Result<()> {
        self.emit(Opcode::STACK_GLOBAL)
    }

    pub fn build_reduce(&mut self) -> Result<()> {
        self.emit(Opcode::REDUCE)
    }

    pub fn build_build(&mut self) -> Result<()> {
        self.emit(Opcode::BUILD)
    }

    pub fn build_dup(&mut self) -> Result<()> {
        self.emit(Opcode::DUP)
    }

    /// `BINPERSID`: persistent id taken from the stack
    pub fn build_binpersid(&mut self) -> Result<()> {
        self.emit(Opcode::BINPERSID)
    }

    /// `READONLY_BUFFER`: make the buffer on top of the stack read-only
    pub fn build_readonly_buffer(&mut self) -> Result<()> {
        self.emit(Opcode::READONLY_BUFFER)
    }

    // Stack

    pub fn pop(&mut self) -> Result<()> {
        self.emit(Opcode::POP)
    }

    pub fn pop_mark(&mut self) -> Result<()> {
        self.emit(Opcode::POP_MARK)
    }

    // Memo

    /// `GET` with a decimal index
    pub fn memo_get(&mut self, index: impl Into<BigInt>) -> Result<()> {
        let index = non_negative(index.into())?;
        self.emit_decimal(Opcode::GET, &index)
    }

    /// `BINGET`: 1-byte index
    pub fn memo_binget(&mut self, index: impl Into<BigInt>) -> Result<()> {
        self.emit_fixed(Opcode::BINGET, &index.into(), WordSize::W8, false, "memo index")
    }

    /// `LONG_BINGET`: 4-byte unsigned index
    pub fn memo_long_binget(&mut self, index: impl Into<BigInt>) -> Result<()> {
        self.emit_fixed(Opcode::LONG_BINGET, &index.into(), WordSize::W32, false, "memo index")
    }

    /// `PUT` with a decimal index
    pub fn memo_put(&mut self, index: impl Into<BigInt>) -> Result<()> {
        let index = non_negative(index.into())?;
        self.emit_decimal(Opcode::PUT, &index)
    }

    /// `BINPUT`: 1-byte index
    pub fn memo_binput(&mut self, index: impl Into<BigInt>) -> Result<()> {
        self.emit_fixed(Opcode::BINPUT, &index.into(), WordSize::W8, false, "memo index")
    }

    /// `LONG_BINPUT`: 4-byte unsigned index
    pub fn memo_long_binput(&mut self, index: impl Into<BigInt>) -> Result<()> {
        self.emit_fixed(Opcode::LONG_BINPUT, &index.into(), WordSize::W32, false, "memo index")
    }

    /// `MEMOIZE`: store the top of the stack at the next memo index
    pub fn memo_memoize(&mut self) -> Result<()> {
        self.emit(Opcode::MEMOIZE)
    }

    // Framing

    /// `FRAME`: announce that the next `size` bytes form one frame
    pub fn frame(&mut self, size: u64) -> Result<()> {
        self.check(Opcode::FRAME)?;
        self.write(Opcode::FRAME, &[&size.to_le_bytes()]);
        Ok(())
    }
}

fn fixed_arg(
    value: &BigInt,
    size: WordSize,
    signed: bool,
    op: Opcode,
    what: &str,
) -> Result<Vec<u8>> {
    if !pack::fits(value, size, signed) {
        return Err(AssemblerError::OutOfRange(format!(
            "{what} out of range for opcode {op}"
        )));
    }
    pack::pack(value, pack::Endian::Little, Some(size), signed)
}

pub(crate) fn non_negative(index: BigInt) -> Result<BigInt> {
    if index.sign() == num_bigint::Sign::Minus {
        return Err(AssemblerError::OutOfRange(
            constants::ERR_MEMO_NEGATIVE.to_string(),
        ));
    }
    Ok(index)
}
