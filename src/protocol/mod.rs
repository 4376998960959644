//! # Protocol Layer
//!
//! Stateful pickle assembly on top of the core wire components.
//!
//! ## Components
//! - **Assembler**: one emitter per opcode, protocol gating, framing of the final payload
//! - **Encoder**: picks the most compact opcodes for a whole value tree
//! - **Value**: the value model the encoder consumes, with a serde bridge
//!
//! ## Protocol Gating
//! Every opcode belongs to the protocol version that introduced it. With
//! verification enabled, emitting a newer opcode fails with
//! `AssemblerError::ProtocolMismatch`; with it disabled, a warning is logged
//! and the opcode is written anyway.

pub mod assembler;
pub mod encoder;
pub mod value;

#[cfg(test)]
mod tests;

pub use assembler::{Assembler, HIGHEST_PROTOCOL};
pub use value::{to_value, PickleValue};
