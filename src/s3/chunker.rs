//! Upload sources and the lazy part chunker
//!
//! The chunker pulls from the source only when asked for the next part and
//! keeps at most one part plus one unread source item in memory. `has_more`
//! is a lookahead read: the bytes it pulls stay in `pending` and open the next part.

use crate::s3::error::{Result, S3Error};
use crate::s3::types::MAX_PARTS;
use bytes::{Bytes, BytesMut};
use futures::stream::{BoxStream, Stream, StreamExt};
use std::io;
use std::path::Path;
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;

/// Read buffer used when adapting an `AsyncRead` into a byte stream
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Data to upload: a buffer already in memory, or a stream of unknown length
pub enum UploadSource {
    Buffer(Bytes),
    Stream(BoxStream<'static, io::Result<Bytes>>),
}

impl UploadSource {
    /// Upload from any byte stream. Items may be of any size.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        UploadSource::Stream(stream.boxed())
    }

    /// Upload everything `reader` yields until EOF
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + 'static,
    {
        Self::from_stream(ReaderStream::with_capacity(reader, READ_BUFFER_SIZE))
    }

    /// Stream a local file
    pub async fn file(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = tokio::fs::File::open(path).await?;
        Ok(Self::from_reader(file))
    }
}

impl std::fmt::Debug for UploadSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadSource::Buffer(data) => f.debug_tuple("Buffer").field(&data.len()).finish(),
            UploadSource::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<Bytes> for UploadSource {
    fn from(data: Bytes) -> Self {
        UploadSource::Buffer(data)
    }
}

impl From<Vec<u8>> for UploadSource {
    fn from(data: Vec<u8>) -> Self {
        UploadSource::Buffer(Bytes::from(data))
    }
}

impl From<String> for UploadSource {
    fn from(data: String) -> Self {
        UploadSource::Buffer(Bytes::from(data))
    }
}

impl From<&'static str> for UploadSource {
    fn from(data: &'static str) -> Self {
        UploadSource::Buffer(Bytes::from_static(data.as_bytes()))
    }
}

impl From<&'static [u8]> for UploadSource {
    fn from(data: &'static [u8]) -> Self {
        UploadSource::Buffer(Bytes::from_static(data))
    }
}

/// One part of an upload
#[derive(Debug, Clone)]
pub struct Chunk {
    /// 1-based part number
    pub part_number: u32,
    pub data: Bytes,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Splits an [`UploadSource`] into parts of `part_size` bytes (the last may be shorter)
pub struct Chunker {
    source: Option<BoxStream<'static, io::Result<Bytes>>>,
    /// Bytes read from the source but not yet handed out
    pending: Bytes,
    part_size: usize,
    next_part: u32,
}

impl Chunker {
    pub fn new(source: UploadSource, part_size: usize) -> Self {
        let (source, pending) = match source {
            UploadSource::Buffer(data) => (None, data),
            UploadSource::Stream(stream) => (Some(stream), Bytes::new()),
        };
        Self {
            source,
            pending,
            part_size: part_size.max(1),
            next_part: 1,
        }
    }

    pub fn part_size(&self) -> usize {
        self.part_size
    }

    /// Next part, or `None` once the source is drained.
    ///
    /// The first call always yields part 1, which is empty for an empty source.
    pub async fn next_chunk(&mut self) -> Result<Option<Chunk>> {
        if self.next_part > 1 && !self.has_more().await? {
            return Ok(None);
        }
        if self.next_part > MAX_PARTS {
            return Err(S3Error::InvalidArgument(format!(
                "upload needs more than {} parts of {} bytes; use a larger part size",
                MAX_PARTS, self.part_size
            )));
        }

        let data = self.fill().await?;
        let part_number = self.next_part;
        self.next_part += 1;
        Ok(Some(Chunk { part_number, data }))
    }

    /// Whether another non-empty part follows. May read one item from the source.
    pub async fn has_more(&mut self) -> Result<bool> {
        if !self.pending.is_empty() {
            return Ok(true);
        }
        match self.read_item().await? {
            Some(item) => {
                self.pending = item;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Collect up to `part_size` bytes. Slices `pending` without copying
    /// when it alone covers the rest of the part.
    async fn fill(&mut self) -> Result<Bytes> {
        let mut chunk = BytesMut::new();
        loop {
            let wanted = self.part_size - chunk.len();
            if self.pending.len() >= wanted {
                let head = self.pending.split_to(wanted);
                if chunk.is_empty() {
                    return Ok(head);
                }
                chunk.extend_from_slice(&head);
                return Ok(chunk.freeze());
            }

            if !self.pending.is_empty() {
                chunk.extend_from_slice(&self.pending);
                self.pending = Bytes::new();
            }

            match self.read_item().await? {
                Some(item) => self.pending = item,
                None => return Ok(chunk.freeze()),
            }
        }
    }

    /// Next non-empty item from the source
    async fn read_item(&mut self) -> Result<Option<Bytes>> {
        while let Some(source) = self.source.as_mut() {
            match source.next().await {
                Some(Ok(item)) if item.is_empty() => continue,
                Some(Ok(item)) => return Ok(Some(item)),
                Some(Err(e)) => {
                    self.source = None;
                    return Err(S3Error::Io(e));
                }
                None => self.source = None,
            }
        }
        Ok(None)
    }
}
