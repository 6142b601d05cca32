//! Per-thread scratch buffers for keys and values
//!
//! Buffers are allocated once at thread startup with fallible allocation, so an
//! oversized configuration surfaces as a [`RunError::Allocation`] instead of an
//! abort, and then reused for every operation.

use crate::error::RunError;
use std::fmt::Write;

/// Filler byte of every value
pub const VALUE_FILL: u8 = b'a';

/// Alternate marker byte written by updates
pub const VALUE_MARKER: u8 = b'b';

/// Fixed-width, zero-padded decimal key
#[derive(Debug)]
pub struct KeyBuffer {
    buf: String,
    width: usize,
}

impl KeyBuffer {
    pub fn new(width: usize) -> Result<Self, RunError> {
        let mut buf = String::new();
        buf.try_reserve_exact(width).map_err(|_| RunError::Allocation {
            what: "key buffer",
            bytes: width,
        })?;
        Ok(Self { buf, width })
    }

    /// Format `key` into the buffer, e.g. 42 with width 6 is `"000042"`
    #[inline]
    pub fn format(&mut self, key: u64) -> &str {
        self.buf.clear();
        // Writing into a String cannot fail
        let _ = write!(self.buf, "{:0width$}", key, width = self.width);
        &self.buf
    }

    /// Most recently formatted key
    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.buf.as_bytes()
    }
}

/// Fixed-size value filled with [`VALUE_FILL`]
#[derive(Debug)]
pub struct ValueBuffer {
    buf: Vec<u8>,
}

impl ValueBuffer {
    pub fn new(size: usize) -> Result<Self, RunError> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(size).map_err(|_| RunError::Allocation {
            what: "value buffer",
            bytes: size,
        })?;
        buf.resize(size, VALUE_FILL);
        Ok(Self { buf })
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Replace the contents with a value read back from the store
    pub fn load(&mut self, value: &[u8]) {
        self.buf.clear();
        self.buf.extend_from_slice(value);
    }

    /// Flip the leading byte between the filler and the marker
    pub fn toggle_marker(&mut self) {
        if let Some(first) = self.buf.first_mut() {
            *first = if *first == VALUE_FILL {
                VALUE_MARKER
            } else {
                VALUE_FILL
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_format() {
        let mut key = KeyBuffer::new(10).unwrap();
        assert_eq!(key.format(1), "0000000001");
        assert_eq!(key.format(1000), "0000001000");
        assert_eq!(key.as_bytes(), b"0000001000");

        // Wider numbers are never truncated
        let mut narrow = KeyBuffer::new(2).unwrap();
        assert_eq!(narrow.format(12345), "12345");
    }

    #[test]
    fn test_value_fill_and_toggle() {
        let mut value = ValueBuffer::new(8).unwrap();
        assert_eq!(value.as_slice(), b"aaaaaaaa");

        value.toggle_marker();
        assert_eq!(value.as_slice(), b"baaaaaaa");
        value.toggle_marker();
        assert_eq!(value.as_slice(), b"aaaaaaaa");

        value.load(b"bxyz");
        value.toggle_marker();
        assert_eq!(value.as_slice(), b"axyz");
    }

    #[test]
    fn test_oversized_value_reports_allocation_failure() {
        let err = ValueBuffer::new(usize::MAX).unwrap_err();
        assert!(matches!(err, RunError::Allocation { what: "value buffer", .. }));
    }
}
