//! S3 client module with AWS SigV4 signing
//!
//! This module provides:
//! - AWS Signature Version 4 signing (headers and presigned URLs)
//! - Streaming uploads that switch between a single PUT and multipart
//! - Whole-object and ranged downloads with lazily consumed bodies
//! - Typed server errors parsed from S3 `<Error>` documents

pub mod chunker;
pub mod client;
pub mod download;
pub mod error;
pub mod signer;
pub mod transport;
pub mod types;
pub mod upload;
pub mod xml;

// Re-export main types for convenience
pub use chunker::{Chunk, Chunker, UploadSource};
pub use client::S3Client;
pub use download::{GetObjectResponse, ObjectBody};
pub use error::{BoxError, Result, S3Error, ServerError};
pub use signer::S3SignerV4;
pub use transport::{HyperTransport, ResponseBody, Transport};
pub use types::{
    ByteRange, CompleteMultipartUploadResponse, InitiateMultipartUploadResponse, ObjectStat,
    PartResult, PutObjectOptions, PutObjectResponse,
};
