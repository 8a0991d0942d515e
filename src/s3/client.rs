//! S3 client: request addressing, signing and response checking
//!
//! Upload operations live in `upload.rs`, downloads in `download.rs`; both
//! are `impl S3Client` blocks built on the helpers here.

use crate::config::ClientConfig;
use crate::s3::error::{ErrorContext, Result, S3Error, ServerError};
use crate::s3::signer::{S3SignerV4, HEX_UPPER};
use crate::s3::transport::{HyperTransport, ResponseBody, Transport};
use crate::s3::types::{ObjectStat, MAX_PRESIGN_EXPIRY_SECS};
use crate::s3::xml::trim_etag;
use bytes::Bytes;
use chrono::Utc;
use http_body_util::{BodyExt, Full};
use hyper::header::HeaderMap;
use hyper::{Method, Request, Response};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt::Write as FmtWrite;
use std::sync::Arc;
use std::time::Duration;

/// Longest key S3 accepts, in bytes
const MAX_KEY_LENGTH: usize = 1024;

/// Prefix of user metadata headers
const USER_METADATA_PREFIX: &str = "x-amz-meta-";

/// S3 client bound to one bucket
///
/// Clone is cheap: transport, signer and configuration are shared.
#[derive(Clone)]
pub struct S3Client {
    transport: Arc<dyn Transport>,
    /// AWS SigV4 signer (with signing key cache)
    signer: Arc<S3SignerV4>,
    config: Arc<ClientConfig>,
}

impl std::fmt::Debug for S3Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Client")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl S3Client {
    /// Create a client that talks to the configured endpoint over hyper
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = HyperTransport::new(&config)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a client that sends its requests through `transport`
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;
        let signer = S3SignerV4::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            config.region.clone(),
        )?;
        Ok(Self {
            transport,
            signer: Arc::new(signer),
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn bucket(&self) -> &str {
        &self.config.bucket
    }

    /// Encode an S3 key, preserving forward slashes
    /// Returns Cow::Borrowed when no encoding is needed (common case = zero allocation)
    pub(crate) fn encode_s3_key(key: &str) -> Cow<str> {
        let needs_encoding = key.bytes().any(|b| {
            !matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/')
        });

        if !needs_encoding {
            return Cow::Borrowed(key);
        }

        let mut result = String::with_capacity(key.len() + 32);
        for byte in key.bytes() {
            match byte {
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                    result.push(byte as char);
                }
                _ => {
                    result.push('%');
                    result.push(HEX_UPPER[(byte >> 4) as usize] as char);
                    result.push(HEX_UPPER[(byte & 0xf) as usize] as char);
                }
            }
        }
        Cow::Owned(result)
    }

    /// Encode a string for use in a URL query parameter value (RFC 3986).
    fn url_encode_into(buf: &mut String, s: &str) {
        for byte in s.bytes() {
            match byte {
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                    buf.push(byte as char);
                }
                _ => {
                    buf.push('%');
                    buf.push(HEX_UPPER[(byte >> 4) as usize] as char);
                    buf.push(HEX_UPPER[(byte & 0xf) as usize] as char);
                }
            }
        }
    }

    fn validate_key(key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(S3Error::InvalidArgument("object key must not be empty".to_string()));
        }
        if key.len() > MAX_KEY_LENGTH {
            return Err(S3Error::InvalidArgument(format!(
                "object key is {} bytes, the limit is {}",
                key.len(),
                MAX_KEY_LENGTH
            )));
        }
        Ok(())
    }

    /// Full URL of an object, path-style or virtual-host style per configuration
    pub(crate) fn object_url(&self, key: &str) -> Result<String> {
        Self::validate_key(key)?;
        let base = self.config.bucket_host_url();
        let encoded_key = Self::encode_s3_key(key);
        let mut url =
            String::with_capacity(base.len() + self.config.bucket.len() + encoded_key.len() + 2);
        url.push_str(&base);
        url.push('/');
        if self.config.path_style {
            url.push_str(&self.config.bucket);
            url.push('/');
        }
        url.push_str(&encoded_key);
        Ok(url)
    }

    /// Object URL addressing a multipart upload, and one of its parts when
    /// `part_number` is given
    pub(crate) fn upload_url(
        &self,
        key: &str,
        upload_id: &str,
        part_number: Option<u32>,
    ) -> Result<String> {
        let mut url = self.object_url(key)?;
        url.reserve(upload_id.len() + 32);
        match part_number {
            Some(part_number) => {
                let _ = write!(url, "?partNumber={}&uploadId=", part_number);
            }
            None => url.push_str("?uploadId="),
        }
        Self::url_encode_into(&mut url, upload_id);
        Ok(url)
    }

    pub(crate) fn error_context<'a>(&'a self, key: Option<&'a str>) -> ErrorContext<'a> {
        ErrorContext {
            bucket: &self.config.bucket,
            region: &self.config.region,
            key,
        }
    }

    /// Sign and send one request. `headers` must use lower-case names.
    ///
    /// The body is hashed into the signature; PUT and POST carry an explicit
    /// `content-length`.
    pub(crate) async fn send_request(
        &self,
        method: Method,
        url: &str,
        mut headers: BTreeMap<String, String>,
        body: Bytes,
    ) -> Result<Response<ResponseBody>> {
        if method == Method::PUT || method == Method::POST {
            headers.insert("content-length".to_string(), body.len().to_string());
        }

        let payload_hash = S3SignerV4::payload_hash(&body);
        let signed_headers =
            self.signer
                .sign_at(method.as_str(), url, headers, &payload_hash, Utc::now());

        let mut req = Request::builder().method(method.clone()).uri(url);
        for (key, value) in signed_headers.iter() {
            req = req.header(key, value);
        }

        let request = req
            .body(Full::new(body))
            .map_err(|e| S3Error::InvalidArgument(format!("Request build error: {}", e)))?;

        tracing::debug!(method = %method, url, "sending request");
        let response = self.transport.send(request).await?;
        tracing::debug!(method = %method, url, status = response.status().as_u16(), "response received");
        Ok(response)
    }

    /// Pass 2xx responses through; map everything else to a [`ServerError`]
    pub(crate) async fn check_response(
        &self,
        response: Response<ResponseBody>,
        key: Option<&str>,
    ) -> Result<Response<ResponseBody>> {
        if response.status().is_success() {
            return Ok(response);
        }

        let (parts, body) = response.into_parts();
        // The status alone still makes a usable error when the body is lost
        let body = read_body(body).await.unwrap_or_default();
        let err = ServerError::from_response(parts.status, &parts.headers, &body, self.error_context(key));
        tracing::debug!(
            status = err.status_code,
            code = %err.code,
            key = key.unwrap_or(""),
            "server returned error"
        );
        Err(S3Error::Server(err))
    }

    /// Metadata of an object (HEAD)
    pub async fn stat_object(&self, key: &str) -> Result<ObjectStat> {
        let url = self.object_url(key)?;
        let response = self
            .send_request(Method::HEAD, &url, BTreeMap::new(), Bytes::new())
            .await?;
        let response = self.check_response(response, Some(key)).await?;
        let headers = response.headers();

        let size = header_str(headers, "content-length")
            .and_then(|v| v.parse::<u64>().ok())
            .ok_or_else(|| S3Error::Protocol("HEAD response without Content-Length".to_string()))?;

        Ok(ObjectStat {
            key: key.to_string(),
            size,
            etag: etag_header(headers)?,
            last_modified: header_string(headers, "last-modified"),
            content_type: header_string(headers, "content-type"),
            version_id: header_string(headers, "x-amz-version-id"),
            metadata: user_metadata(headers),
        })
    }

    /// Whether an object exists. A 404 is `false`; any other failure is an error.
    pub async fn exists(&self, key: &str) -> Result<bool> {
        match self.stat_object(key).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Delete an object. Deleting a missing key succeeds, as it does on S3.
    pub async fn delete_object(&self, key: &str) -> Result<()> {
        let url = self.object_url(key)?;
        let response = self
            .send_request(Method::DELETE, &url, BTreeMap::new(), Bytes::new())
            .await?;
        let response = self.check_response(response, Some(key)).await?;
        read_body(response.into_body()).await?;
        tracing::info!(key, "object deleted");
        Ok(())
    }

    /// Presigned URL granting `method` on `key` for `expires` (1 second to 7 days)
    pub fn presign_url(&self, method: Method, key: &str, expires: Duration) -> Result<String> {
        let secs = expires.as_secs();
        if secs == 0 || secs > MAX_PRESIGN_EXPIRY_SECS {
            return Err(S3Error::InvalidArgument(format!(
                "presigned URL expiry must be between 1 and {} seconds, got {}",
                MAX_PRESIGN_EXPIRY_SECS, secs
            )));
        }
        let url = self.object_url(key)?;
        Ok(self.signer.presign(method.as_str(), &url, secs, Utc::now()))
    }
}

/// Read a whole response body
pub(crate) async fn read_body(body: ResponseBody) -> Result<Bytes> {
    Ok(body.collect().await.map_err(S3Error::Transport)?.to_bytes())
}

pub(crate) fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

pub(crate) fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    header_str(headers, name).map(str::to_string)
}

/// Unquoted `ETag` header; a 2xx response without one is a protocol error
pub(crate) fn etag_header(headers: &HeaderMap) -> Result<String> {
    header_str(headers, "etag")
        .map(|v| trim_etag(v).to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| S3Error::Protocol("response is missing the ETag header".to_string()))
}

/// `x-amz-meta-*` headers with the prefix stripped
pub(crate) fn user_metadata(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            let name = name.as_str().strip_prefix(USER_METADATA_PREFIX)?;
            let value = value.to_str().ok()?;
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}
