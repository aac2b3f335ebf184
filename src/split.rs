//! Stream splitting for recorded game files.
//!
//! A recorded game file is two logical regions packed back to back:
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0x00 | 4 | u32 LE header region length (includes this prefix) |
//! | 0x04 | 4 | u32 LE next-chapter pointer (saved-chapter metadata) |
//! | 0x08 | var | raw deflate compressed header payload |
//! | header_len | var | body region, stored uncompressed to end of file |
//!
//! The splitter is the only component that touches raw file bytes. It
//! decompresses the header region fully into memory up front (header sizes
//! are bounded, so streaming decompression buys nothing) and exposes the
//! body as a borrowed slice over the remaining bytes without copying.
//!
//! # Example
//!
//! ```no_run
//! use mgx_parser::split::Streams;
//!
//! let data = std::fs::read("game.mgx").unwrap();
//! let streams = Streams::split(&data).unwrap();
//!
//! println!("header: {} bytes decompressed", streams.header().len());
//! println!("body: {} bytes", streams.body(&data).len());
//! ```

use std::io::Read;

use flate2::read::DeflateDecoder;

use crate::binary::SliceCursor;
use crate::error::{ParserError, Result};

/// Size of the header region prefix: length field plus chapter pointer.
pub const REGION_PREFIX_SIZE: usize = 8;

/// The two separated regions of a recorded game file.
///
/// The header is owned (it had to be decompressed); the body is addressed
/// by offset so callers can borrow it from the original input without a
/// copy.
#[derive(Debug, Clone)]
pub struct Streams {
    header: Vec<u8>,
    body_offset: usize,
    next_chapter: u32,
}

impl Streams {
    /// Splits a recorded game file into its header and body regions.
    ///
    /// # Arguments
    ///
    /// * `data` - The raw bytes of the entire recorded game file
    ///
    /// # Errors
    ///
    /// - `ParserError::TruncatedFile` if the declared header length
    ///   exceeds the file size or cannot hold its own prefix
    /// - `ParserError::DecompressionError` if the deflate stream is
    ///   invalid
    ///
    /// Both are terminal for the file; retrying cannot help since the
    /// bytes are static.
    pub fn split(data: &[u8]) -> Result<Self> {
        let mut cursor = SliceCursor::new(data);

        let header_len = cursor
            .read_u32()
            .map_err(|_| ParserError::TruncatedFile {
                declared: REGION_PREFIX_SIZE,
                actual: data.len(),
            })? as usize;
        let next_chapter = cursor.read_u32().map_err(|_| ParserError::TruncatedFile {
            declared: REGION_PREFIX_SIZE,
            actual: data.len(),
        })?;

        if header_len < REGION_PREFIX_SIZE || header_len > data.len() {
            return Err(ParserError::TruncatedFile {
                declared: header_len,
                actual: data.len(),
            });
        }

        let compressed = &data[REGION_PREFIX_SIZE..header_len];
        let mut header = Vec::new();
        let mut decoder = DeflateDecoder::new(compressed);
        decoder
            .read_to_end(&mut header)
            .map_err(|e| ParserError::DecompressionError {
                reason: format!("invalid deflate stream in header region: {e}"),
            })?;

        Ok(Streams {
            header,
            body_offset: header_len,
            next_chapter,
        })
    }

    /// Returns the decompressed header region.
    #[must_use]
    pub fn header(&self) -> &[u8] {
        &self.header
    }

    /// Returns the byte offset where the body region begins in the file.
    #[must_use]
    pub fn body_offset(&self) -> usize {
        self.body_offset
    }

    /// Returns the body region as a slice of the original file bytes.
    ///
    /// # Panics
    ///
    /// Panics if `data` is not the same buffer (or at least as long as the
    /// one) this `Streams` was split from.
    #[must_use]
    pub fn body<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        &data[self.body_offset..]
    }

    /// Returns the saved-chapter pointer from the region prefix.
    ///
    /// Kept as metadata; chapter navigation is not part of decoding.
    #[must_use]
    pub fn next_chapter(&self) -> u32 {
        self.next_chapter
    }
}
