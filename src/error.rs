//! Error types for the recorded game parser.
//!
//! This module defines the error taxonomy for everything that can go wrong
//! while decoding a recorded game: I/O failures, truncated containers,
//! malformed compressed data, and header fields that overrun the region
//! they live in.
//!
//! Two conditions are deliberately *not* errors and are surfaced through
//! [`DecodeWarning`] instead: an unrecognized version stamp (decoding
//! proceeds with the closest known family) and a truncated body stream
//! (everything decoded so far is kept).

use thiserror::Error;

/// The main error type for recorded game parsing operations.
///
/// # Example
///
/// ```
/// use mgx_parser::error::{ParserError, Result};
///
/// fn example_operation() -> Result<()> {
///     Err(ParserError::HeaderDecode {
///         field: "map_width",
///         offset: 0x1F0,
///     })
/// }
/// ```
#[derive(Error, Debug)]
pub enum ParserError {
    /// An I/O error occurred while reading the recorded game file.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The declared header region length exceeds the actual file size.
    ///
    /// The first four bytes of a recorded game give the size of the
    /// compressed header region. A declared size larger than the file (or
    /// smaller than the 8-byte region prefix) means the file was cut short
    /// during upload or transfer. Terminal; never retried.
    #[error("Truncated file: header region claims {declared} bytes, file has {actual}")]
    TruncatedFile {
        /// The header region size declared by the length prefix.
        declared: usize,
        /// The number of bytes actually present.
        actual: usize,
    },

    /// Decompression of the header region failed.
    ///
    /// The header region is a raw deflate stream with no zlib wrapper.
    /// This error occurs when that stream is corrupt. Terminal.
    #[error("Decompression failed: {reason}")]
    DecompressionError {
        /// A description of the decompression failure.
        reason: String,
    },

    /// A header count or length field would read past the end of the
    /// decompressed header region.
    ///
    /// This is terminal for the header only; the body stream lives in a
    /// disjoint region and can still be decoded. Any other inconsistency
    /// in the header (an unknown civilization id, say) is carried through
    /// as data rather than rejected.
    #[error("Header decode failed at field `{field}` (offset 0x{offset:X})")]
    HeaderDecode {
        /// The name of the field being decoded when the overrun happened.
        field: &'static str,
        /// Byte offset into the decompressed header region.
        offset: usize,
    },

    /// The data ended unexpectedly before the required bytes could be read.
    ///
    /// Low-level cursor error; the header decoder wraps it into
    /// [`ParserError::HeaderDecode`] with the field name.
    #[error("Unexpected end of data: expected {expected} bytes, but only {available} available")]
    UnexpectedEof {
        /// The number of bytes that were expected to be available.
        expected: usize,
        /// The actual number of bytes available.
        available: usize,
    },
}

impl ParserError {
    /// Creates an `UnexpectedEof` error with the given sizes.
    #[must_use]
    pub fn unexpected_eof(expected: usize, available: usize) -> Self {
        ParserError::UnexpectedEof {
            expected,
            available,
        }
    }

    /// Wraps a low-level cursor error into a positioned header error.
    ///
    /// Any error kind other than EOF is passed through unchanged, so
    /// decompression and I/O failures keep their own context.
    #[must_use]
    pub fn at_field(self, field: &'static str, offset: usize) -> Self {
        match self {
            ParserError::UnexpectedEof { .. } => ParserError::HeaderDecode { field, offset },
            other => other,
        }
    }
}

/// A specialized Result type for recorded game parsing operations.
pub type Result<T> = std::result::Result<T, ParserError>;

/// A warning-grade condition attached to an otherwise usable result.
///
/// Callers always get a fully or partially populated result object plus
/// zero or more of these — never a silent substitution of wrong data for
/// missing data.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeWarning {
    /// The version stamp did not match any known format sub-version.
    ///
    /// Community mods frequently stamp non-standard strings while keeping
    /// a compatible layout, so decoding proceeds using the closest known
    /// family by numeric comparison.
    UnknownFormatVersion {
        /// The raw stamp found in the header.
        stamp: String,
    },

    /// The body stream was truncated or a record length was inconsistent
    /// with the remaining bytes.
    ///
    /// Everything decoded before the inconsistency is kept; the most
    /// valuable data (chat, player list) lives in the header and stays
    /// usable even when the body is cut short.
    PartialBody {
        /// Byte offset into the body region where decoding stopped.
        offset: usize,
        /// A description of the inconsistency.
        reason: String,
    },
}

impl std::fmt::Display for DecodeWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeWarning::UnknownFormatVersion { stamp } => {
                write!(
                    f,
                    "unknown version stamp {stamp:?}, using closest known family"
                )
            }
            DecodeWarning::PartialBody { offset, reason } => {
                write!(f, "body truncated at offset 0x{offset:X}: {reason}")
            }
        }
    }
}
