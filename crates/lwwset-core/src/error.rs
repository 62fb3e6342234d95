//! Errors produced by the binary codec.
//!
//! Every other set operation is total, so this is the crate's only error type.

use thiserror::Error;

/// Failure to encode or decode a set.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("snappy block error: {0}")]
    Compression(#[from] snap::Error),

    #[error("block declares {declared} bytes from only {input} bytes of input")]
    ImplausibleLength { declared: usize, input: usize },

    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("varint overflow: more than 10 bytes")]
    VarintOverflow,

    #[error("negative timestamp {0} for key \"{key}\"", key = .1.escape_ascii())]
    NegativeTimestamp(i64, Vec<u8>),

    #[error("key \"{key}\" appears more than once", key = .0.escape_ascii())]
    DuplicateKey(Vec<u8>),

    #[error("{0} trailing bytes after last entry")]
    TrailingBytes(usize),
}

pub type Result<T> = std::result::Result<T, CodecError>;
