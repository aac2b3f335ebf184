//! Binary reading utilities for parsing recorded game data.
//!
//! The header and body decoders both walk their regions sequentially, so
//! the primary tool here is [`SliceCursor`], a bounds-checked position
//! tracker over a byte slice. All multi-byte integers in the format are
//! little-endian; the cursor handles the conversion.
//!
//! Text fields (player names, chat) are stored in the game's legacy GBK
//! multi-byte encoding. [`transcode_legacy`] converts them to UTF-8,
//! replacing untranslatable bytes rather than failing — anomalous files
//! must still render a best-effort result.
//!
//! # Example
//!
//! ```
//! use mgx_parser::binary::SliceCursor;
//!
//! let data = [0x26, 0x89, 0x01, 0x00, b'H', b'i'];
//! let mut cursor = SliceCursor::new(&data);
//!
//! assert_eq!(cursor.read_u32().unwrap(), 0x0001_8926);
//! assert_eq!(cursor.read_bytes(2).unwrap(), b"Hi");
//! assert_eq!(cursor.position(), 6);
//! ```

use crate::error::{ParserError, Result};

/// A bounds-checked, seekable cursor over a byte slice.
///
/// Every read advances the position by exactly the bytes consumed and
/// fails with `ParserError::UnexpectedEof` instead of reading past the
/// end. Count and length fields read from the data are therefore never
/// trusted blindly: the overrun surfaces at the next read.
#[derive(Debug, Clone)]
pub struct SliceCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceCursor<'a> {
    /// Creates a cursor positioned at the start of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        SliceCursor { data, pos: 0 }
    }

    /// Returns the current byte position.
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Returns the number of bytes left to read.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Returns whether the cursor has reached the end of the data.
    #[must_use]
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Returns the total length of the underlying data.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns whether the underlying data is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Moves the cursor to an absolute byte position.
    ///
    /// Seeking to or past the end is allowed; the next read fails.
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Advances the cursor by `len` bytes without interpreting them.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnexpectedEof` if fewer than `len` bytes
    /// remain.
    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.read_bytes(len).map(|_| ())
    }

    /// Reads `len` raw bytes.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnexpectedEof` if fewer than `len` bytes
    /// remain.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(len).ok_or_else(|| {
            ParserError::unexpected_eof(usize::MAX, self.data.len())
        })?;
        if end > self.data.len() {
            return Err(ParserError::unexpected_eof(end, self.data.len()));
        }
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Reads a single byte.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnexpectedEof` at end of data.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    /// Reads a little-endian u16.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnexpectedEof` if fewer than 2 bytes remain.
    pub fn read_u16(&mut self) -> Result<u16> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    /// Reads a little-endian u32.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnexpectedEof` if fewer than 4 bytes remain.
    pub fn read_u32(&mut self) -> Result<u32> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Reads a little-endian i32.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnexpectedEof` if fewer than 4 bytes remain.
    pub fn read_i32(&mut self) -> Result<i32> {
        let b = self.read_bytes(4)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Reads a little-endian f32.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnexpectedEof` if fewer than 4 bytes remain.
    pub fn read_f32(&mut self) -> Result<f32> {
        let b = self.read_bytes(4)?;
        Ok(f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Peeks at the next 4 bytes as a little-endian u32 without advancing.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnexpectedEof` if fewer than 4 bytes remain.
    pub fn peek_u32(&self) -> Result<u32> {
        let end = self.pos + 4;
        if end > self.data.len() {
            return Err(ParserError::unexpected_eof(end, self.data.len()));
        }
        let b = &self.data[self.pos..end];
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Reads a u32 length prefix followed by that many raw bytes.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnexpectedEof` if the declared length
    /// overruns the remaining data.
    pub fn read_length_prefixed(&mut self) -> Result<&'a [u8]> {
        let len = self.read_u32()? as usize;
        self.read_bytes(len)
    }

    /// Reads a u32 length prefix followed by that many bytes of legacy
    /// encoded text, transcoded to UTF-8.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnexpectedEof` if the declared length
    /// overruns the remaining data. Transcoding itself never fails.
    pub fn read_legacy_string(&mut self) -> Result<String> {
        Ok(transcode_legacy(self.read_length_prefixed()?))
    }
}

/// Transcodes bytes from the game's legacy GBK encoding to UTF-8.
///
/// Untranslatable byte sequences are replaced with U+FFFD rather than
/// rejected. Trailing null padding is stripped first, since fixed-width
/// fields are null padded.
///
/// # Example
///
/// ```
/// use mgx_parser::binary::transcode_legacy;
///
/// assert_eq!(transcode_legacy(b"Hello\x00\x00"), "Hello");
/// ```
#[must_use]
pub fn transcode_legacy(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    let (text, _, _) = encoding_rs::GBK.decode(&bytes[..end]);
    text.into_owned()
}
