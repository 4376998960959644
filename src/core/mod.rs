//! # Core Wire Components
//!
//! Low-level building blocks of the pickle wire format.
//!
//! This module holds the pieces that know nothing about an assembler's state:
//! how integers and text are turned into bytes, and which opcodes exist.
//!
//! ## Components
//! - **Pack**: fixed-width and minimal-length integer packing
//! - **Opcode**: the opcode catalog with wire codes and protocol eras
//! - **Text**: character encodings and the escaping used by text-mode opcodes
//!
//! ## Wire Format
//! ```text
//! [PROTO(1) version(1)]? [opcode(1) argument(N)]* [STOP(1)]
//! ```
//!
//! Integers are little-endian except the 8-byte `BINFLOAT` payload, which is
//! a big-endian IEEE-754 double.

pub mod opcode;
pub mod pack;
pub mod text;
