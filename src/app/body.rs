//! Response body shapes and their normalization
//!
//! Every [`Body`] variant is consumed through a [`BodyReader`], which exposes a
//! plain [`Read`] interface and releases the underlying source exactly once,
//! whether the body was drained, abandoned half way or never read at all.

use std::fmt;
use std::io::{self, Cursor, Read};

/// A pull-based source of body chunks with an explicit close step
pub trait ChunkSource: Send {
    /// Returns the next chunk, or `None` once the source is exhausted
    fn next_chunk(&mut self) -> io::Result<Option<Vec<u8>>>;

    /// Releases any resource held by the source
    fn close(&mut self) {}
}

/// Response body as produced by the application
pub enum Body {
    /// A finite, fully buffered byte sequence
    Bytes(Vec<u8>),

    /// A pull-based chunk source that must be closed after use
    Chunks(Box<dyn ChunkSource>),

    /// Any body offering sequential reads
    Reader(Box<dyn Read + Send>),
}

impl Body {
    pub fn empty() -> Self {
        Body::Bytes(Vec::new())
    }

    pub fn from_chunks(source: impl ChunkSource + 'static) -> Self {
        Body::Chunks(Box::new(source))
    }

    pub fn from_reader(reader: impl Read + Send + 'static) -> Self {
        Body::Reader(Box::new(reader))
    }

    /// Normalizes the body into a sequential reader
    pub fn into_reader(self) -> BodyReader {
        let inner = match self {
            Body::Bytes(bytes) => Inner::Bytes(Cursor::new(bytes)),
            Body::Chunks(source) => Inner::Chunks {
                source,
                pending: Vec::new(),
                offset: 0,
                exhausted: false,
            },
            Body::Reader(reader) => Inner::Reader(reader),
        };

        BodyReader {
            inner,
            closed: false,
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Body::Chunks(_) => f.write_str("Chunks(..)"),
            Body::Reader(_) => f.write_str("Reader(..)"),
        }
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::Bytes(bytes)
    }
}

impl From<&[u8]> for Body {
    fn from(bytes: &[u8]) -> Self {
        Body::Bytes(bytes.to_vec())
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Bytes(text.into_bytes())
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Body::Bytes(text.as_bytes().to_vec())
    }
}

enum Inner {
    Bytes(Cursor<Vec<u8>>),
    Chunks {
        source: Box<dyn ChunkSource>,
        pending: Vec<u8>,
        offset: usize,
        exhausted: bool,
    },
    Reader(Box<dyn Read + Send>),
}

/// Sequential reader over any [`Body`] variant
///
/// Dropping the reader closes the underlying chunk source if it has not been
/// closed yet.
pub struct BodyReader {
    inner: Inner,
    closed: bool,
}

impl BodyReader {
    /// Closes the underlying source; later calls are no-ops
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Inner::Chunks { source, .. } = &mut self.inner {
            source.close();
        }
    }
}

impl Read for BodyReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.closed || buf.is_empty() {
            return Ok(0);
        }

        match &mut self.inner {
            Inner::Bytes(cursor) => cursor.read(buf),
            Inner::Reader(reader) => reader.read(buf),
            Inner::Chunks {
                source,
                pending,
                offset,
                exhausted,
            } => loop {
                if *offset < pending.len() {
                    let n = buf.len().min(pending.len() - *offset);
                    buf[..n].copy_from_slice(&pending[*offset..*offset + n]);
                    *offset += n;
                    return Ok(n);
                }

                if *exhausted {
                    return Ok(0);
                }

                match source.next_chunk()? {
                    Some(chunk) => {
                        *pending = chunk;
                        *offset = 0;
                    }
                    None => {
                        *exhausted = true;
                        return Ok(0);
                    }
                }
            },
        }
    }
}

impl Drop for BodyReader {
    fn drop(&mut self) {
        self.close();
    }
}
