use anyhow::{Context, Result};
use s3stream::{ByteRange, PutObjectOptions, S3Client, UploadSource};
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let bytes_f64 = bytes as f64;
    let exponent = (bytes_f64.ln() / 1024_f64.ln()).floor() as usize;
    let exponent = exponent.min(UNITS.len() - 1);

    let value = bytes_f64 / 1024_f64.powi(exponent as i32);

    if exponent == 0 {
        format!("{} {}", bytes, UNITS[exponent])
    } else {
        format!("{:.2} {}", value, UNITS[exponent])
    }
}

/// Upload a local file, or stdin when `source` is `-` or absent
pub async fn cmd_put(
    client: &S3Client,
    key: &str,
    source: Option<&str>,
    part_size: Option<usize>,
    content_type: Option<String>,
) -> Result<()> {
    let mut options = PutObjectOptions::default();
    if let Some(size) = part_size {
        options = options.with_part_size(size);
    }
    if let Some(content_type) = content_type {
        options = options.with_content_type(content_type);
    }

    let (label, upload) = match source {
        None | Some("-") => ("<stdin>".to_string(), UploadSource::from_reader(tokio::io::stdin())),
        Some(path) => {
            let upload = UploadSource::file(path)
                .await
                .with_context(|| format!("Failed to open {}", path))?;
            (path.to_string(), upload)
        }
    };

    println!("{} -> s3://{}/{}", label, client.bucket(), key);
    let response = client.put_object(key, upload, options).await?;
    println!("  ETag: {}", response.etag);
    if let Some(version_id) = response.version_id {
        println!("  Version: {}", version_id);
    }
    Ok(())
}

/// Download an object (or a range of it) to a file or stdout
pub async fn cmd_get(
    client: &S3Client,
    key: &str,
    offset: Option<u64>,
    length: Option<u64>,
    output: Option<&Path>,
) -> Result<()> {
    let response = if offset.is_some() || length.is_some() {
        let range = ByteRange {
            offset: offset.unwrap_or(0),
            length,
        };
        client.get_partial_object(key, range).await?
    } else {
        client.get_object(key).await?
    };

    match output {
        Some(path) => {
            println!("s3://{}/{} -> {}", client.bucket(), key, path.display());
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
            let bytes_written = response.body.save_to_file(path).await?;
            println!("  {} downloaded", format_bytes(bytes_written));
        }
        None => {
            let reader = response.body.into_async_read();
            tokio::pin!(reader);
            let mut stdout = tokio::io::stdout();
            tokio::io::copy(&mut reader, &mut stdout).await?;
            stdout.flush().await?;
        }
    }
    Ok(())
}

pub async fn cmd_stat(client: &S3Client, key: &str) -> Result<()> {
    let stat = client.stat_object(key).await?;

    println!("Object: s3://{}/{}", client.bucket(), stat.key);
    println!("Size: {} ({})", format_bytes(stat.size), stat.size);
    println!("Last Modified: {}", stat.last_modified.as_deref().unwrap_or("Unknown"));
    println!("ETag: {}", stat.etag);
    if let Some(ref content_type) = stat.content_type {
        println!("Content-Type: {}", content_type);
    }
    if let Some(ref version_id) = stat.version_id {
        println!("Version: {}", version_id);
    }
    for (name, value) in &stat.metadata {
        println!("Metadata: {}={}", name, value);
    }
    Ok(())
}

pub async fn cmd_rm(client: &S3Client, key: &str) -> Result<()> {
    client.delete_object(key).await?;
    println!("Deleted: s3://{}/{}", client.bucket(), key);
    Ok(())
}

pub async fn cmd_presign(client: &S3Client, key: &str, expires: u64) -> Result<()> {
    let url = client.presigned_get_object(key, Duration::from_secs(expires))?;
    println!("{}", url);
    Ok(())
}
