//! Streaming request bodies and range arithmetic.

use std::pin::Pin;

use bytes::Bytes;
use futures::stream::{self, Stream};

use crate::error::{Error, Result};

/// Boxed chunk stream, `Sync` so it can cross into backend SDK bodies that
/// require it (e.g. `SdkBody::from_body_1_x`).
pub type PutChunkStream =
    Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send + Sync + 'static>>;

/// A single-pass request body handed to a backend adapter.
///
/// The frontend computes the MD5 and SHA256 digests while reading the HTTP
/// body; adapters surface them to backends that can validate content. The
/// stream may only be consumed once, and the gateway never buffers it.
pub struct PutStream {
    inner: PutChunkStream,
    size: i64,
    md5_base64: Option<String>,
    sha256_hex: Option<String>,
}

impl PutStream {
    /// Wraps a chunk stream with its declared size and digests.
    #[must_use]
    pub fn new(
        inner: PutChunkStream,
        size: i64,
        md5_base64: Option<String>,
        sha256_hex: Option<String>,
    ) -> Self {
        Self { inner, size, md5_base64, sha256_hex }
    }

    /// Builds a stream from an in-memory buffer. Intended for tests and
    /// small administrative writes; regular traffic arrives as a stream.
    #[must_use]
    pub fn from_bytes(data: Bytes) -> Self {
        let size = data.len() as i64;
        Self {
            inner: Box::pin(stream::iter([Ok(data)])),
            size,
            md5_base64: None,
            sha256_hex: None,
        }
    }

    /// Declared body size in bytes.
    #[must_use]
    pub const fn size(&self) -> i64 {
        self.size
    }

    /// Base64 MD5 digest of the body, when the frontend computed one.
    #[must_use]
    pub fn md5_base64(&self) -> Option<&str> {
        self.md5_base64.as_deref()
    }

    /// Hex SHA256 digest of the body, when the frontend computed one.
    #[must_use]
    pub fn sha256_hex(&self) -> Option<&str> {
        self.sha256_hex.as_deref()
    }

    /// Consumes the wrapper, yielding the raw chunk stream.
    #[must_use]
    pub fn into_inner(self) -> PutChunkStream {
        self.inner
    }
}

impl std::fmt::Debug for PutStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PutStream")
            .field("size", &self.size)
            .field("md5", &self.md5_base64)
            .finish()
    }
}

/// A client-requested byte range.
///
/// Mirrors the HTTP `Range` header shapes:
/// `bytes=start-end`, `bytes=start-` (`end == -1`), and `bytes=-n`
/// (`suffix`, where `end` carries `n`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeSpec {
    /// First byte offset; ignored for suffix ranges.
    pub start: i64,
    /// Last byte offset (inclusive), `-1` for open-ended, or the suffix
    /// length for suffix ranges.
    pub end: i64,
    /// Whether this is a suffix-length range.
    pub suffix: bool,
}

impl RangeSpec {
    /// A closed range `bytes=start-end`.
    #[must_use]
    pub const fn new(start: i64, end: i64) -> Self {
        Self { start, end, suffix: false }
    }

    /// An open-ended range `bytes=start-`.
    #[must_use]
    pub const fn from_offset(start: i64) -> Self {
        Self { start, end: -1, suffix: false }
    }

    /// A suffix range `bytes=-length`.
    #[must_use]
    pub const fn suffix(length: i64) -> Self {
        Self { start: 0, end: length, suffix: true }
    }

    /// Resolves this spec against an object of `size` bytes into an
    /// `(offset, length)` pair.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRange`] when the spec is malformed or lies
    /// entirely past the end of the object.
    pub fn offset_length(&self, size: i64) -> Result<(i64, i64)> {
        if self.suffix {
            if self.end < 0 {
                return Err(Error::InvalidRange(format!(
                    "negative suffix length {}",
                    self.end
                )));
            }
            let length = self.end.min(size);
            return Ok((size - length, length));
        }
        if self.start < 0 || (self.end < self.start && self.end != -1) {
            return Err(Error::InvalidRange(format!(
                "bytes={}-{}",
                self.start, self.end
            )));
        }
        if self.start >= size {
            return Err(Error::InvalidRange(format!(
                "start {} beyond object size {size}",
                self.start
            )));
        }
        let end = if self.end == -1 { size - 1 } else { self.end.min(size - 1) };
        Ok((self.start, end - self.start + 1))
    }

    /// Renders the spec as an HTTP `Range` header value.
    #[must_use]
    pub fn to_header(&self) -> String {
        if self.suffix {
            format!("bytes=-{}", self.end)
        } else if self.end == -1 {
            format!("bytes={}-", self.start)
        } else {
            format!("bytes={}-{}", self.start, self.end)
        }
    }
}
