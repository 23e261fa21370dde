//! Per-request allocation budget and null-terminated copies.
//!
//! # Responsibilities
//! - Copy host-owned byte spans into independently owned buffers
//! - Terminate every copy with a NUL byte so it can cross an FFI boundary
//! - Fail the copy when the request's byte budget is exhausted
//!
//! # Design Decisions
//! - Copies are sized exactly `len + 1`; nothing is over-allocated
//! - The source span is only read, never mutated or aliased
//! - Budget exhaustion is reported, never retried

use std::borrow::Cow;
use std::ffi::CStr;
use std::fmt;

use thiserror::Error;

/// The request arena could not satisfy an allocation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("insufficient memory for {site}: requested {requested} bytes, {remaining} available")]
pub struct AllocationError {
    /// What was being copied when the budget ran out.
    pub site: &'static str,
    pub requested: usize,
    pub remaining: usize,
}

/// A byte budget scoped to one request.
///
/// Stands in for the host server's request pool: every copy made while
/// building a request descriptor is charged here.
#[derive(Debug)]
pub struct RequestArena {
    capacity: usize,
    used: usize,
}

impl RequestArena {
    /// Create an arena that can hand out at most `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { capacity, used: 0 }
    }

    /// Bytes still available.
    pub fn remaining(&self) -> usize {
        self.capacity - self.used
    }

    /// Bytes handed out so far.
    pub fn used(&self) -> usize {
        self.used
    }

    /// Reserve an exactly-sized buffer of `len` bytes.
    pub(crate) fn allocate(&mut self, site: &'static str, len: usize) -> Result<Vec<u8>, AllocationError> {
        if len > self.remaining() {
            return Err(AllocationError {
                site,
                requested: len,
                remaining: self.remaining(),
            });
        }
        self.used += len;
        Ok(Vec::with_capacity(len))
    }

    /// Copy `span` into a freshly allocated, NUL-terminated string.
    pub fn copy(&mut self, site: &'static str, span: &[u8]) -> Result<NulString, AllocationError> {
        let mut buf = self.allocate(site, span.len() + 1)?;
        buf.extend_from_slice(span);
        buf.push(0);
        Ok(NulString { bytes: buf })
    }
}

/// An owned byte string that always ends in a single trailing NUL.
#[derive(Clone, PartialEq, Eq)]
pub struct NulString {
    bytes: Vec<u8>,
}

impl NulString {
    /// Wrap a buffer whose final byte is the terminator.
    ///
    /// Returns `None` when `bytes` is empty or not terminated.
    pub(crate) fn from_vec_with_nul(bytes: Vec<u8>) -> Option<Self> {
        match bytes.last() {
            Some(0) => Some(Self { bytes }),
            _ => None,
        }
    }

    /// Content without the terminator.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.bytes.len() - 1]
    }

    /// Content including the terminator.
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        &self.bytes
    }

    /// C view of the string, ending at the first NUL.
    ///
    /// Every `NulString` is built with a trailing NUL, so the fallback to an
    /// empty string is unreachable.
    pub fn as_c_str(&self) -> &CStr {
        CStr::from_bytes_until_nul(&self.bytes).unwrap_or_default()
    }

    /// Content as text, replacing invalid UTF-8.
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.as_bytes())
    }

    /// Length without the terminator.
    pub fn len(&self) -> usize {
        self.bytes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for NulString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

impl fmt::Debug for NulString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.to_string_lossy(), f)
    }
}
