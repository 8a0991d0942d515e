//! s3stream - streaming client for S3-compatible object storage

pub mod config;
pub mod s3;

pub use config::{ClientConfig, Config};
pub use s3::{
    ByteRange, GetObjectResponse, PutObjectOptions, PutObjectResponse, S3Client, S3Error,
    ServerError, UploadSource,
};
