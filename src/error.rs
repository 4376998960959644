//! # Error Types
//!
//! Error handling for the pickle assembler.
//!
//! Every failure is synchronous and aborts the emission call that produced it
//! before a single byte reaches the output buffer, so an [`Assembler`] stays
//! usable after an error and callers may retry with corrected arguments.
//!
//! ## Error Categories
//! - **Argument Errors**: wrong shape for a parameter, unencodable text
//! - **Range Errors**: integers, lengths and memo indices outside an opcode's width
//! - **Lookup Errors**: unknown text encodings and opcode names
//! - **Protocol Errors**: opcode newer than the active protocol (verification only)
//! - **Type Errors**: values outside the closed set the value encoder handles
//!
//! ## Example Usage
//! ```rust
//! use pickle_assembler::error::AssemblerError;
//! use pickle_assembler::Assembler;
//!
//! let mut asm = Assembler::new(1, true).unwrap();
//! match asm.push_true() {
//!     Err(AssemblerError::ProtocolMismatch { opcode, required, current }) => {
//!         assert_eq!((opcode, required, current), ("NEWTRUE", 2, 1));
//!     }
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```
//!
//! [`Assembler`]: crate::Assembler

use std::fmt::Display;
use thiserror::Error;

/// Error message constants shared by the emitters.
pub mod constants {
    pub const ERR_MEMO_NEGATIVE: &str = "memo index should be non-negative";
    pub const ERR_BYTES_TOO_LONG_PROTO3: &str = "bytes length too long for protocol 3";
    pub const ERR_UNSIGNED_NEGATIVE: &str = "can't pack negative integer as unsigned";
}

// AssemblerError is the error type for every assembler operation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssemblerError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Out of range: {0}")]
    OutOfRange(String),

    #[error("Unknown encoding: {0}")]
    LookupError(String),

    #[error("opcode {opcode} requires protocol version >= {required}, but current protocol is {current}")]
    ProtocolMismatch {
        opcode: &'static str,
        required: u8,
        current: u8,
    },

    #[error("value of type {0:?} is currently unsupported")]
    UnsupportedType(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl serde::ser::Error for AssemblerError {
    fn custom<T: Display>(msg: T) -> Self {
        AssemblerError::InvalidArgument(msg.to_string())
    }
}

/// Type alias for Results using AssemblerError
pub type Result<T> = std::result::Result<T, AssemblerError>;
