//! # Value Encoder
//!
//! Chooses the most compact opcode sequence for a [`PickleValue`] under the
//! assembler's active protocol, recursing into container elements.
//!
//! ## Selection Rules
//! - **bool**: `INT 01/00` below protocol 2, `NEWTRUE`/`NEWFALSE` from 2
//! - **int**: `INT` at protocol 0; otherwise the first of `BININT1`, `BININT2`,
//!   `BININT` that fits, then `INT` (protocol 1), `LONG1` or `LONG4`
//! - **float**: `FLOAT` at protocol 0, `BINFLOAT` otherwise
//! - **bytes**: protocol 3+ only; `SHORT_BINBYTES`, `BINBYTES`, `BINBYTES8` by length
//! - **str**: `UNICODE` at protocol 0; counted UTF-8 opcodes otherwise
//! - **tuple/list/dict**: empty-container opcodes from protocol 1, `MARK`-based
//!   builds otherwise; 1-3 element tuples use `TUPLE1`..`TUPLE3` from protocol 2
//!
//! A failed call restores the payload to its length before the call.

use crate::core::pack::{self, WordSize};
use crate::error::{constants, AssemblerError, Result};
use crate::protocol::assembler::{non_negative, Assembler};
use crate::protocol::value::{to_value, PickleValue};
use num_bigint::BigInt;
use num_traits::One;
use serde::Serialize;
use tracing::instrument;

/// Bit width bounding integers that are still emitted as `LONG1`.
///
/// `LONG1` can carry up to 255 bytes, but the threshold kept here is the
/// narrower signed 2040-bit range, i.e. `[-2^2039, 2^2039 - 1]`.
const LONG1_BITS: u32 = 2040;

const SHORT_LIMIT: usize = 1 << 8;
const LONG_LIMIT: u64 = 1 << 32;

impl Assembler {
    /// Emit `value` using the most compact opcodes valid for the active protocol.
    ///
    /// # Errors
    /// - `AssemblerError::ProtocolMismatch` for bytes below protocol 3
    /// - any error of the primitive emitters it delegates to
    ///
    /// The payload is left exactly as it was when an error is returned.
    #[instrument(skip(self, value), fields(proto = self.protocol(), kind = value.type_name()), level = "debug")]
    pub fn encode_push(&mut self, value: &PickleValue) -> Result<()> {
        let start = self.len();
        let result = self.encode_value(value);
        if result.is_err() {
            self.truncate(start);
        }
        result
    }

    /// Convert a `Serialize` value with [`to_value`] and emit it.
    pub fn encode<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        let value = to_value(value)?;
        self.encode_push(&value)
    }

    /// Push memo entry `index` with the most compact `GET` variant.
    pub fn encode_memo_get(&mut self, index: impl Into<BigInt>) -> Result<()> {
        let index = non_negative(index.into())?;
        match self.memo_width(&index) {
            MemoWidth::Text => self.memo_get(index),
            MemoWidth::Byte => self.memo_binget(index),
            MemoWidth::Long => self.memo_long_binget(index),
        }
    }

    /// Store the stack top at memo `index` with the most compact `PUT` variant.
    pub fn encode_memo_put(&mut self, index: impl Into<BigInt>) -> Result<()> {
        let index = non_negative(index.into())?;
        match self.memo_width(&index) {
            MemoWidth::Text => self.memo_put(index),
            MemoWidth::Byte => self.memo_binput(index),
            MemoWidth::Long => self.memo_long_binput(index),
        }
    }

    fn memo_width(&self, index: &BigInt) -> MemoWidth {
        if self.protocol() == 0 {
            MemoWidth::Text
        } else if pack::fits(index, WordSize::W8, false) {
            MemoWidth::Byte
        } else if pack::fits(index, WordSize::W32, false) {
            MemoWidth::Long
        } else {
            MemoWidth::Text
        }
    }

    fn encode_value(&mut self, value: &PickleValue) -> Result<()> {
        match value {
            PickleValue::None => self.push_none(),
            PickleValue::Bool(v) => self.encode_bool(*v),
            PickleValue::Int(v) => self.encode_int(v),
            PickleValue::Float(v) => self.encode_float(*v),
            PickleValue::Bytes(v) => self.encode_bytes(v),
            PickleValue::Str(v) => self.encode_str(v),
            PickleValue::Tuple(items) => self.encode_tuple(items),
            PickleValue::List(items) => self.encode_list(items),
            PickleValue::Dict(entries) => self.encode_dict(entries),
        }
    }

    fn encode_bool(&mut self, value: bool) -> Result<()> {
        if self.protocol() < 2 {
            self.push_int_bool(value)
        } else if value {
            self.push_true()
        } else {
            self.push_false()
        }
    }

    fn encode_int(&mut self, value: &BigInt) -> Result<()> {
        if self.protocol() == 0 {
            self.push_int(value.clone())
        } else if pack::fits(value, WordSize::W8, false) {
            self.push_binint1(value.clone())
        } else if pack::fits(value, WordSize::W16, false) {
            self.push_binint2(value.clone())
        } else if pack::fits(value, WordSize::W32, true) {
            self.push_binint(value.clone())
        } else if self.protocol() == 1 {
            self.push_int(value.clone())
        } else if fits_long1(value) {
            self.push_long1(value.clone())
        } else {
            // really large, rarely exceeds this limit
            self.push_long4(value.clone())
        }
    }

    fn encode_float(&mut self, value: f64) -> Result<()> {
        if self.protocol() == 0 {
            self.push_float(value)
        } else {
            self.push_binfloat(value)
        }
    }

    fn encode_bytes(&mut self, value: &[u8]) -> Result<()> {
        if self.protocol() < 3 {
            return Err(AssemblerError::ProtocolMismatch {
                opcode: "SHORT_BINBYTES",
                required: 3,
                current: self.protocol(),
            });
        }
        if value.len() < SHORT_LIMIT {
            self.push_short_binbytes(value)
        } else if (value.len() as u64) < LONG_LIMIT {
            self.push_binbytes(value)
        } else if self.protocol() < 4 {
            Err(AssemblerError::OutOfRange(
                constants::ERR_BYTES_TOO_LONG_PROTO3.to_string(),
            ))
        } else {
            self.push_binbytes8(value)
        }
    }

    fn encode_str(&mut self, value: &str) -> Result<()> {
        if self.protocol() == 0 {
            return self.push_unicode(value);
        }
        let length = value.len();
        if self.protocol() < 4 {
            if (length as u64) < LONG_LIMIT {
                self.push_binunicode(value)
            } else {
                self.push_unicode(value)
            }
        } else if length < SHORT_LIMIT {
            self.push_short_binunicode(value)
        } else if (length as u64) < LONG_LIMIT {
            self.push_binunicode(value)
        } else {
            self.push_binunicode8(value)
        }
    }

    fn encode_tuple(&mut self, items: &[PickleValue]) -> Result<()> {
        if items.is_empty() {
            return if self.protocol() == 0 {
                self.push_mark()?;
                self.build_tuple()
            } else {
                self.push_empty_tuple()
            };
        }

        let short = self.protocol() >= 2 && items.len() <= 3;
        if !short {
            self.push_mark()?;
        }
        for item in items {
            self.encode_value(item)?;
        }
        match (short, items.len()) {
            (true, 1) => self.build_tuple1(),
            (true, 2) => self.build_tuple2(),
            (true, _) => self.build_tuple3(),
            (false, _) => self.build_tuple(),
        }
    }

    fn encode_list(&mut self, items: &[PickleValue]) -> Result<()> {
        if items.is_empty() {
            return if self.protocol() == 0 {
                self.push_mark()?;
                self.build_list()
            } else {
                self.push_empty_list()
            };
        }

        self.push_mark()?;
        for item in items {
            self.encode_value(item)?;
        }
        self.build_list()
    }

    fn encode_dict(&mut self, entries: &[(PickleValue, PickleValue)]) -> Result<()> {
        if entries.is_empty() {
            return if self.protocol() == 0 {
                self.push_mark()?;
                self.build_dict()
            } else {
                self.push_empty_dict()
            };
        }

        if let Some(key) = duplicate_key(entries) {
            return Err(AssemblerError::InvalidArgument(format!(
                "duplicate dict key: {key:?}"
            )));
        }

        self.push_mark()?;
        for (key, value) in entries {
            self.encode_value(key)?;
            self.encode_value(value)?;
        }
        self.build_dict()
    }
}

enum MemoWidth {
    Text,
    Byte,
    Long,
}

fn duplicate_key(entries: &[(PickleValue, PickleValue)]) -> Option<&PickleValue> {
    entries
        .iter()
        .enumerate()
        .find(|(i, (key, _))| entries[..*i].iter().any(|(seen, _)| seen == key))
        .map(|(_, (key, _))| key)
}

fn fits_long1(value: &BigInt) -> bool {
    let half = BigInt::one() << (LONG1_BITS - 1);
    *value >= -half.clone() && *value < half
}
