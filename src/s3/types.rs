//! S3 request options and response structures

use crate::s3::error::{Result, S3Error};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Smallest part S3 accepts for any part except the last (5 MiB)
pub const MIN_PART_SIZE: usize = 5 * 1024 * 1024;

/// Largest single part S3 accepts (5 GiB)
pub const MAX_PART_SIZE: u64 = 5 * 1024 * 1024 * 1024;

/// Part size used when the caller does not choose one
pub const DEFAULT_PART_SIZE: usize = MIN_PART_SIZE;

/// S3 part numbers run from 1 to 10000
pub const MAX_PARTS: u32 = 10_000;

/// Longest expiry a presigned URL may carry (7 days)
pub const MAX_PRESIGN_EXPIRY_SECS: u64 = 7 * 24 * 60 * 60;

/// Headers that are sent as-is instead of being prefixed with `x-amz-meta-`
const PASSTHROUGH_HEADERS: &[&str] = &[
    "cache-control",
    "content-disposition",
    "content-encoding",
    "content-language",
    "content-type",
    "expires",
];

/// Options for `put_object`
#[derive(Debug, Clone, Default)]
pub struct PutObjectOptions {
    /// Bytes per part. `None` uses [`DEFAULT_PART_SIZE`].
    pub part_size: Option<usize>,
    /// Object metadata. Standard headers (`Content-Type`, `Cache-Control`, ...)
    /// and `x-amz-*` headers pass through, everything else becomes user metadata.
    pub metadata: BTreeMap<String, String>,
}

impl PutObjectOptions {
    /// Set the part size used when the upload turns into a multipart upload
    pub fn with_part_size(mut self, size: usize) -> Self {
        self.part_size = Some(size);
        self
    }

    /// Add one metadata entry
    pub fn with_metadata(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(name.into(), value.into());
        self
    }

    /// Set the `Content-Type` of the object
    pub fn with_content_type(self, content_type: impl Into<String>) -> Self {
        self.with_metadata("content-type", content_type)
    }

    /// Part size after defaults, rejecting sizes S3 would not accept for non-final parts
    pub fn resolved_part_size(&self) -> Result<usize> {
        let size = self.part_size.unwrap_or(DEFAULT_PART_SIZE);
        if size < MIN_PART_SIZE {
            return Err(S3Error::InvalidArgument(format!(
                "part size {} is below the minimum of {} bytes",
                size, MIN_PART_SIZE
            )));
        }
        if size as u64 > MAX_PART_SIZE {
            return Err(S3Error::InvalidArgument(format!(
                "part size {} exceeds the maximum of {} bytes",
                size, MAX_PART_SIZE
            )));
        }
        Ok(size)
    }

    /// Request headers carrying the metadata (lower-cased names)
    pub fn metadata_headers(&self) -> BTreeMap<String, String> {
        self.metadata
            .iter()
            .map(|(name, value)| {
                let name = name.trim().to_ascii_lowercase();
                let header = if PASSTHROUGH_HEADERS.contains(&name.as_str())
                    || name.starts_with("x-amz-")
                {
                    name
                } else {
                    format!("x-amz-meta-{}", name)
                };
                (header, value.trim().to_string())
            })
            .collect()
    }
}

/// Result of `put_object`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PutObjectResponse {
    /// ETag as reported by the server, without quotes. Multipart uploads
    /// produce a composite value suffixed with `-<part count>`.
    pub etag: String,
    /// Version id when the bucket is versioned
    pub version_id: Option<String>,
}

/// One uploaded part
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PartResult {
    /// Part number (1-10000)
    pub part_number: u32,
    /// ETag returned from UploadPart
    pub etag: String,
    /// Bytes in the part
    pub size: usize,
}

impl PartResult {
    pub fn new(part_number: u32, etag: String, size: usize) -> Self {
        Self {
            part_number,
            etag,
            size,
        }
    }
}

/// Response from InitiateMultipartUpload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiateMultipartUploadResponse {
    pub bucket: String,
    pub key: String,
    /// Upload ID for subsequent UploadPart and CompleteMultipartUpload requests
    pub upload_id: String,
}

impl InitiateMultipartUploadResponse {
    pub fn new(bucket: String, key: String, upload_id: String) -> Self {
        Self {
            bucket,
            key,
            upload_id,
        }
    }
}

/// Response from CompleteMultipartUpload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteMultipartUploadResponse {
    /// Location URL of the completed object
    pub location: Option<String>,
    pub bucket: String,
    pub key: String,
    /// Composite ETag of the completed object
    pub etag: String,
    /// Version id when the bucket is versioned
    pub version_id: Option<String>,
}

impl CompleteMultipartUploadResponse {
    pub fn new(bucket: String, key: String, etag: String) -> Self {
        Self {
            location: None,
            bucket,
            key,
            etag,
            version_id: None,
        }
    }
}

/// Byte range for `get_partial_object`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// First byte to return
    pub offset: u64,
    /// Number of bytes; `None` reads to the end of the object
    pub length: Option<u64>,
}

impl ByteRange {
    pub fn new(offset: u64, length: u64) -> Self {
        Self {
            offset,
            length: Some(length),
        }
    }

    /// Range from `offset` to the end of the object
    pub fn from_offset(offset: u64) -> Self {
        Self {
            offset,
            length: None,
        }
    }

    /// `Range` header value: `bytes=<offset>-<offset+length-1>` or `bytes=<offset>-`
    pub fn header_value(&self) -> Result<String> {
        match self.length {
            None => Ok(format!("bytes={}-", self.offset)),
            Some(0) => Err(S3Error::InvalidArgument(
                "range length must be greater than zero".to_string(),
            )),
            Some(length) => {
                let last = self
                    .offset
                    .checked_add(length - 1)
                    .ok_or_else(|| S3Error::InvalidArgument("range end overflows u64".to_string()))?;
                Ok(format!("bytes={}-{}", self.offset, last))
            }
        }
    }
}

/// Object metadata returned by `stat_object`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObjectStat {
    pub key: String,
    /// Object size in bytes
    pub size: u64,
    /// ETag without quotes
    pub etag: String,
    pub last_modified: Option<String>,
    pub content_type: Option<String>,
    pub version_id: Option<String>,
    /// User metadata (`x-amz-meta-*`), keys without the prefix
    pub metadata: BTreeMap<String, String>,
}
