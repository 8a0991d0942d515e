//! Error taxonomy for the S3 client and the server error mapper
//!
//! Every non-2xx response is turned into a [`ServerError`] carrying the
//! status code, the machine-readable error code and message from the XML
//! body, plus the bucket and region of the client that issued the request.
//! Connection-level failures are [`S3Error::Transport`] and never look like
//! server errors.

use crate::s3::xml::parse_error_document;
use hyper::header::HeaderMap;
use hyper::StatusCode;
use thiserror::Error;

/// Boxed error used for transport and body failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Code used when a failed response has no parseable error document
pub const UNKNOWN_ERROR_CODE: &str = "Unknown";

/// S3 client errors
#[derive(Error, Debug)]
pub enum S3Error {
    /// Missing or invalid client configuration. Raised before any request is sent.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid argument to an operation (bad key, part size, range, expiry)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Well-formed failure response from the storage server
    #[error(transparent)]
    Server(#[from] ServerError),

    /// Connection, TLS or timeout failure; no response was received
    #[error("Transport error: {0}")]
    Transport(#[source] BoxError),

    /// 2xx response the client cannot interpret
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Failure reading the upload source
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A multipart upload failed and the follow-up abort failed as well.
    /// `source` is the failure that ended the upload.
    #[error("{source} (abort of upload {upload_id} also failed: {abort})")]
    AbortFailed {
        upload_id: String,
        #[source]
        source: Box<S3Error>,
        abort: Box<S3Error>,
    },
}

impl S3Error {
    /// The server error behind this error, if any. Looks through `AbortFailed`.
    pub fn server_error(&self) -> Option<&ServerError> {
        match self {
            S3Error::Server(err) => Some(err),
            S3Error::AbortFailed { source, .. } => source.server_error(),
            _ => None,
        }
    }

    /// True for a 404 response from the server
    pub fn is_not_found(&self) -> bool {
        self.server_error()
            .map(|err| err.status_code == StatusCode::NOT_FOUND.as_u16())
            .unwrap_or(false)
    }

    pub(crate) fn transport<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        S3Error::Transport(err.into())
    }
}

impl From<quick_xml::Error> for S3Error {
    fn from(err: quick_xml::Error) -> Self {
        S3Error::Protocol(format!("XML parse error: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, S3Error>;

/// Error reported by the storage server
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code} ({status_code}): {message}")]
pub struct ServerError {
    /// HTTP status code of the response
    pub status_code: u16,
    /// Machine-readable error code, e.g. `NoSuchKey`
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Bucket the client is configured for
    pub bucket_name: String,
    /// Region the client is configured for
    pub region: String,
    /// Object key, from the error document or the request
    pub key: Option<String>,
    /// Resource named by the error document
    pub resource: Option<String>,
    /// Server request id (`x-amz-request-id` or `<RequestId>`)
    pub request_id: Option<String>,
}

/// Client-side context attached to every mapped server error
#[derive(Debug, Clone, Copy)]
pub struct ErrorContext<'a> {
    pub bucket: &'a str,
    pub region: &'a str,
    pub key: Option<&'a str>,
}

impl ServerError {
    /// Map a failed response to a typed error.
    ///
    /// Falls back to code `Unknown` with the status line as message when the
    /// body is empty or is not an S3 error document.
    pub fn from_response(
        status: StatusCode,
        headers: &HeaderMap,
        body: &[u8],
        context: ErrorContext<'_>,
    ) -> Self {
        let header_request_id = headers
            .get("x-amz-request-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        match parse_error_document(body) {
            Some(doc) => Self {
                status_code: status.as_u16(),
                code: doc.code,
                message: doc.message,
                bucket_name: context.bucket.to_string(),
                region: context.region.to_string(),
                key: doc.key.or_else(|| context.key.map(str::to_string)),
                resource: doc.resource,
                request_id: header_request_id.or(doc.request_id),
            },
            None => Self::unknown(status, header_request_id, context),
        }
    }

    fn unknown(status: StatusCode, request_id: Option<String>, context: ErrorContext<'_>) -> Self {
        Self {
            status_code: status.as_u16(),
            code: UNKNOWN_ERROR_CODE.to_string(),
            message: status.to_string(),
            bucket_name: context.bucket.to_string(),
            region: context.region.to_string(),
            key: context.key.map(str::to_string),
            resource: None,
            request_id,
        }
    }
}
