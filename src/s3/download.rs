//! Object downloads: whole objects and byte ranges
//!
//! Bodies are handed out unread. Dropping an [`ObjectBody`] abandons the
//! rest of the response.

use crate::s3::client::{header_str, header_string, read_body, user_metadata, S3Client};
use crate::s3::error::{Result, S3Error};
use crate::s3::transport::ResponseBody;
use crate::s3::types::ByteRange;
use crate::s3::xml::trim_etag;
use bytes::Bytes;
use futures::stream::{Stream, StreamExt, TryStreamExt};
use http_body_util::BodyExt;
use hyper::{Method, Response, StatusCode};
use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWriteExt, BufWriter};
use tokio_util::io::StreamReader;

/// Write buffer for `save_to_file`
const FILE_WRITE_BUFFER: usize = 256 * 1024;

/// Lazily consumed object content
pub struct ObjectBody {
    body: ResponseBody,
}

impl std::fmt::Debug for ObjectBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ObjectBody(..)")
    }
}

impl ObjectBody {
    pub(crate) fn new(body: ResponseBody) -> Self {
        Self { body }
    }

    /// Read the whole body into memory
    pub async fn bytes(self) -> Result<Bytes> {
        read_body(self.body).await
    }

    /// Read the whole body as UTF-8 text
    pub async fn text(self) -> Result<String> {
        let bytes = self.bytes().await?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| S3Error::Protocol(format!("object body is not valid UTF-8: {}", e)))
    }

    /// Body as a stream of byte chunks
    pub fn into_stream(self) -> impl Stream<Item = Result<Bytes>> + Send {
        self.body.into_data_stream().map_err(S3Error::Transport)
    }

    /// Body as an `AsyncRead`
    pub fn into_async_read(self) -> impl AsyncRead + Send {
        StreamReader::new(
            self.body
                .into_data_stream()
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e)),
        )
    }

    /// Stream the body into a file, returning the number of bytes written.
    ///
    /// Network chunks are batched into 256KB disk writes.
    pub async fn save_to_file(self, path: impl AsRef<Path>) -> Result<u64> {
        let file = tokio::fs::File::create(path.as_ref()).await?;
        let mut writer = BufWriter::with_capacity(FILE_WRITE_BUFFER, file);
        let mut stream = self.body.into_data_stream();
        let mut total_bytes = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(S3Error::Transport)?;
            writer.write_all(&chunk).await?;
            total_bytes += chunk.len() as u64;
        }

        writer.flush().await?;
        Ok(total_bytes)
    }
}

/// Result of `get_object` / `get_partial_object`
#[derive(Debug)]
pub struct GetObjectResponse {
    /// 200 for whole objects, 206 for ranges
    pub status: u16,
    /// ETag without quotes
    pub etag: Option<String>,
    /// Bytes in this response (the range length for partial reads)
    pub content_length: Option<u64>,
    pub content_type: Option<String>,
    /// `Content-Range` echoed by the server for partial reads
    pub content_range: Option<String>,
    pub last_modified: Option<String>,
    pub version_id: Option<String>,
    /// User metadata (`x-amz-meta-*`), keys without the prefix
    pub metadata: BTreeMap<String, String>,
    pub body: ObjectBody,
}

impl GetObjectResponse {
    fn from_response(response: Response<ResponseBody>) -> Self {
        let (head, body) = response.into_parts();
        let headers = &head.headers;
        Self {
            status: head.status.as_u16(),
            etag: header_str(headers, "etag").map(|v| trim_etag(v).to_string()),
            content_length: header_str(headers, "content-length").and_then(|v| v.parse().ok()),
            content_type: header_string(headers, "content-type"),
            content_range: header_string(headers, "content-range"),
            last_modified: header_string(headers, "last-modified"),
            version_id: header_string(headers, "x-amz-version-id"),
            metadata: user_metadata(headers),
            body: ObjectBody::new(body),
        }
    }

    /// Read the whole body into memory
    pub async fn bytes(self) -> Result<Bytes> {
        self.body.bytes().await
    }

    /// Read the whole body as UTF-8 text
    pub async fn text(self) -> Result<String> {
        self.body.text().await
    }
}

/// Parse `bytes <first>-<last>/<total|*>`
fn parse_content_range(value: &str) -> Option<(u64, u64, Option<u64>)> {
    let spec = value.trim().strip_prefix("bytes ")?;
    let (range, total) = spec.split_once('/')?;
    let (first, last) = range.split_once('-')?;
    let first: u64 = first.trim().parse().ok()?;
    let last: u64 = last.trim().parse().ok()?;
    let total: Option<u64> = match total.trim() {
        "*" => None,
        n => Some(n.parse().ok()?),
    };
    (first <= last).then_some((first, last, total))
}

impl S3Client {
    /// Download a whole object
    pub async fn get_object(&self, key: &str) -> Result<GetObjectResponse> {
        let url = self.object_url(key)?;
        let response = self
            .send_request(Method::GET, &url, BTreeMap::new(), Bytes::new())
            .await?;
        let response = self.check_response(response, Some(key)).await?;

        if response.status() != StatusCode::OK {
            return Err(S3Error::Protocol(format!(
                "GET {} returned {}, expected 200 OK",
                key,
                response.status()
            )));
        }

        let object = GetObjectResponse::from_response(response);
        tracing::info!(key, size = ?object.content_length, "object download started");
        Ok(object)
    }

    /// Download `range` of an object.
    ///
    /// The server must answer `206 Partial Content` with a `Content-Range`
    /// starting at the requested offset; a full-object `200` is a protocol
    /// error, not a silent fallback.
    pub async fn get_partial_object(&self, key: &str, range: ByteRange) -> Result<GetObjectResponse> {
        let url = self.object_url(key)?;
        let range_header = range.header_value()?;

        let mut headers = BTreeMap::new();
        headers.insert("range".to_string(), range_header.clone());

        let response = self
            .send_request(Method::GET, &url, headers, Bytes::new())
            .await?;
        let response = self.check_response(response, Some(key)).await?;

        if response.status() != StatusCode::PARTIAL_CONTENT {
            return Err(S3Error::Protocol(format!(
                "range {} of {} not honored: server returned {}",
                range_header,
                key,
                response.status()
            )));
        }

        let content_range = header_str(response.headers(), "content-range").ok_or_else(|| {
            S3Error::Protocol(format!("206 response for {} without Content-Range", key))
        })?;
        let (first, last, _) = parse_content_range(content_range).ok_or_else(|| {
            S3Error::Protocol(format!("unparseable Content-Range '{}'", content_range))
        })?;
        if first != range.offset {
            return Err(S3Error::Protocol(format!(
                "requested {} but server sent Content-Range '{}'",
                range_header, content_range
            )));
        }
        // `last - first` is one less than the returned span and cannot overflow
        if let Some(length) = range.length {
            if last - first >= length {
                return Err(S3Error::Protocol(format!(
                    "requested {} but server sent Content-Range '{}'",
                    range_header, content_range
                )));
            }
        }

        tracing::debug!(key, range = %range_header, first, last, "partial download started");
        Ok(GetObjectResponse::from_response(response))
    }

    /// Presigned GET URL for `key`, valid for `expires`
    pub fn presigned_get_object(&self, key: &str, expires: Duration) -> Result<String> {
        self.presign_url(Method::GET, key, expires)
    }
}
