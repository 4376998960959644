//! # Pickle Assembler
//!
//! Low-level, byte-exact assembler for the pickle serialization format,
//! protocols 0 through 5.
//!
//! The crate builds pickle payloads opcode by opcode. It does not model the
//! decoder's stack or memo; it checks only that each opcode exists in the
//! active protocol and that each argument fits the opcode's encoding.
//!
//! ## Layers
//! - [`core`]: integer packing, the opcode catalog, text codecs
//! - [`protocol`]: the [`Assembler`] with one emitter per opcode, and the
//!   value encoder that picks compact opcodes for whole values
//! - [`config`]: TOML/env configuration
//! - [`utils`]: logging setup
//!
//! ## Quick Start
//! ```rust
//! use pickle_assembler::{Assembler, PickleValue};
//!
//! let mut asm = Assembler::new(4, true).unwrap();
//! asm.encode_push(&PickleValue::from("hi")).unwrap();
//! assert_eq!(&asm.assemble()[..], b"\x80\x04\x8c\x02hi.");
//! ```

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod utils;

pub use config::AssemblerConfig;
pub use crate::core::opcode::Opcode;
pub use error::{AssemblerError, Result};
pub use protocol::{to_value, Assembler, PickleValue, HIGHEST_PROTOCOL};
