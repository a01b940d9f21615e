//! Checked big-endian reads and writes over in-memory payloads.
//!
//! `bytes::Buf` panics when a read overruns the buffer; manifests come off
//! the network, so every read here checks `remaining()` first and reports a
//! [`ManifestError::Truncated`] instead.

use bytes::{Buf, BufMut};

use crate::error::ManifestError;

/// Cursor over a borrowed payload.
#[derive(Debug)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
}

impl<'a> ByteReader<'a> {
    /// Start reading at the beginning of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    fn need(&self, needed: usize, context: &'static str) -> Result<(), ManifestError> {
        if self.buf.remaining() < needed {
            return Err(ManifestError::Truncated {
                context,
                needed,
                remaining: self.buf.remaining(),
            });
        }
        Ok(())
    }

    /// Read a big-endian `u32`.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Truncated`] if fewer than 4 bytes remain.
    pub fn read_u32(&mut self, context: &'static str) -> Result<u32, ManifestError> {
        self.need(4, context)?;
        Ok(self.buf.get_u32())
    }

    /// Read a big-endian `u64`.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Truncated`] if fewer than 8 bytes remain.
    pub fn read_u64(&mut self, context: &'static str) -> Result<u64, ManifestError> {
        self.need(8, context)?;
        Ok(self.buf.get_u64())
    }

    /// Read exactly `N` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Truncated`] if fewer than `N` bytes remain.
    pub fn read_array<const N: usize>(&mut self, context: &'static str) -> Result<[u8; N], ManifestError> {
        self.need(N, context)?;
        let mut out = [0u8; N];
        self.buf.copy_to_slice(&mut out);
        Ok(out)
    }

    /// Read a `u32`-length-prefixed UTF-8 string.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Truncated`] if the prefix or body is cut short,
    /// or [`ManifestError::Format`] if the body is not UTF-8.
    pub fn read_string(&mut self, context: &'static str) -> Result<String, ManifestError> {
        let len = self.read_u32(context)? as usize;
        self.need(len, context)?;
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        String::from_utf8(head.to_vec())
            .map_err(|e| ManifestError::format(format!("{context} is not valid UTF-8: {e}")))
    }

    /// Capacity hint for a declared element count, bounded by what the
    /// remaining bytes could possibly hold.
    pub fn capacity_hint(&self, declared: u32, min_record_len: usize) -> usize {
        (declared as usize).min(self.remaining() / min_record_len.max(1))
    }
}

/// Append a `u32`-length-prefixed UTF-8 string.
pub fn put_string(out: &mut Vec<u8>, s: &str) {
    out.put_u32(s.len() as u32);
    out.put_slice(s.as_bytes());
}
