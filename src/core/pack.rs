//! # Integer Packing
//!
//! Converts arbitrary-precision integers to bytes, either at a fixed word
//! size or at the minimal variable length used by the `LONG1`/`LONG4` opcodes.
//!
//! Every integer in the pickle wire format is little-endian, so the `p8`..`p64`
//! helpers are pinned to little-endian. The one big-endian field in the format
//! (the `BINFLOAT` payload) does not go through this module.

use crate::error::{constants, AssemblerError, Result};
use num_bigint::{BigInt, Sign};
use num_traits::{One, Zero};
use std::str::FromStr;

/// Byte order of a packed integer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

impl FromStr for Endian {
    type Err = AssemblerError;

    /// Accepts `<`, `>`, `little` and `big`
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "<" | "little" => Ok(Endian::Little),
            ">" | "big" => Ok(Endian::Big),
            _ => Err(AssemblerError::InvalidArgument(format!(
                "invalid endian: {s:?}"
            ))),
        }
    }
}

/// Fixed word sizes supported by [`pack`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordSize {
    W8,
    W16,
    W32,
    W64,
}

impl WordSize {
    /// Width in bits
    pub fn bits(self) -> u32 {
        match self {
            WordSize::W8 => 8,
            WordSize::W16 => 16,
            WordSize::W32 => 32,
            WordSize::W64 => 64,
        }
    }

    /// Width in bytes
    pub fn bytes(self) -> usize {
        (self.bits() / 8) as usize
    }
}

impl TryFrom<u32> for WordSize {
    type Error = AssemblerError;

    fn try_from(bits: u32) -> Result<Self> {
        match bits {
            8 => Ok(WordSize::W8),
            16 => Ok(WordSize::W16),
            32 => Ok(WordSize::W32),
            64 => Ok(WordSize::W64),
            _ => Err(AssemblerError::InvalidArgument(format!(
                "invalid word size: {bits}"
            ))),
        }
    }
}

/// Inclusive bounds of a fixed-width integer.
pub fn bounds(size: WordSize, signed: bool) -> (BigInt, BigInt) {
    let bits = size.bits();
    if signed {
        let half = BigInt::one() << (bits - 1);
        (-half.clone(), half - 1)
    } else {
        (BigInt::zero(), (BigInt::one() << bits) - 1)
    }
}

/// Returns true if `value` fits a fixed-width integer of `size`.
pub fn fits(value: &BigInt, size: WordSize, signed: bool) -> bool {
    let (lo, hi) = bounds(size, signed);
    *value >= lo && *value <= hi
}

/// Pack an integer into bytes.
///
/// With a `word_size`, the value is written as a fixed-width two's-complement
/// (`signed`) or unsigned integer and must fit that width. Without one, the
/// shortest encoding is produced:
/// - signed zero packs to an empty string;
/// - unsigned values use `(bit_length + 7) >> 3` bytes, so unsigned zero is
///   also empty;
/// - signed non-zero values use `(bit_length >> 3) + 1` little-endian bytes,
///   dropping a trailing `0xFF` from negative values when the byte before it
///   already carries the sign bit.
///
/// # Errors
/// Returns `AssemblerError::OutOfRange` if the value does not fit the width,
/// or is negative while `signed` is false.
pub fn pack(
    value: &BigInt,
    endian: Endian,
    word_size: Option<WordSize>,
    signed: bool,
) -> Result<Vec<u8>> {
    let mut out = match word_size {
        None if signed => pack_signed_minimal(value),
        None => {
            if value.sign() == Sign::Minus {
                return Err(AssemblerError::OutOfRange(
                    constants::ERR_UNSIGNED_NEGATIVE.to_string(),
                ));
            }
            let nbytes = ((value.bits() + 7) >> 3) as usize;
            let mut bytes = value.magnitude().to_bytes_le();
            bytes.resize(nbytes, 0);
            bytes
        }
        Some(size) => {
            if !fits(value, size, signed) {
                let kind = if signed { "signed" } else { "unsigned" };
                return Err(AssemblerError::OutOfRange(format!(
                    "{value} does not fit in a {kind} {}-bit integer",
                    size.bits()
                )));
            }
            extend_le(value, size.bytes())
        }
    };

    if endian == Endian::Big {
        out.reverse();
    }
    Ok(out)
}

fn pack_signed_minimal(value: &BigInt) -> Vec<u8> {
    if value.is_zero() {
        return Vec::new();
    }
    let nbytes = ((value.bits() >> 3) + 1) as usize;
    let mut result = extend_le(value, nbytes);
    if value.sign() == Sign::Minus && nbytes > 1 {
        let last = result[nbytes - 1];
        let prev = result[nbytes - 2];
        if last == 0xff && prev & 0x80 != 0 {
            result.truncate(nbytes - 1);
        }
    }
    result
}

// Two's-complement little-endian bytes sign-extended to `nbytes`.
// Callers guarantee the value fits.
fn extend_le(value: &BigInt, nbytes: usize) -> Vec<u8> {
    let fill = if value.sign() == Sign::Minus { 0xff } else { 0x00 };
    let mut bytes = if value.is_zero() {
        Vec::new()
    } else {
        value.to_signed_bytes_le()
    };
    bytes.resize(nbytes, fill);
    bytes.truncate(nbytes);
    bytes
}

macro_rules! fixed_packer {
    ($name:ident, $size:expr, $doc:expr) => {
        #[doc = $doc]
        pub fn $name(value: impl Into<BigInt>, signed: bool) -> Result<Vec<u8>> {
            pack(&value.into(), Endian::Little, Some($size), signed)
        }
    };
}

fixed_packer!(p8, WordSize::W8, "Pack to exactly 1 byte");
fixed_packer!(p16, WordSize::W16, "Pack to exactly 2 bytes, little-endian");
fixed_packer!(p32, WordSize::W32, "Pack to exactly 4 bytes, little-endian");
fixed_packer!(p64, WordSize::W64, "Pack to exactly 8 bytes, little-endian");
