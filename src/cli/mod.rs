//! Command implementations for the `s3stream` binary
//!
//! ```bash
//! # Upload a file, or stdin with unknown length
//! s3stream put backups/db.tar ./db.tar
//! pg_dump mydb | s3stream put backups/db.sql -
//!
//! # Download a whole object or a byte range
//! s3stream get backups/db.tar -o ./db.tar
//! s3stream get notes.txt --offset 12 --length 8
//!
//! # Object info, delete, presigned URL
//! s3stream stat backups/db.tar
//! s3stream rm backups/db.tar
//! s3stream presign backups/db.tar --expires 600
//! ```

pub mod commands;
