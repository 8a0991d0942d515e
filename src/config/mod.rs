use crate::s3::error::S3Error;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Upper bound for concurrent part uploads within one multipart upload
pub const MAX_PART_CONCURRENCY: usize = 16;

/// Connection settings for one bucket on one S3-compatible endpoint.
///
/// Immutable once handed to an `S3Client`.
#[derive(Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Endpoint host name or IP, without scheme or path (`play.min.io`, `localhost`)
    pub end_point: String,

    /// TCP port. Defaults to 443 or 80 depending on `use_ssl`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Use HTTPS (default: true)
    #[serde(default = "default_true")]
    pub use_ssl: bool,

    /// AWS region (default: us-east-1)
    #[serde(default = "default_region")]
    pub region: String,

    /// AWS access key ID
    pub access_key: String,

    /// AWS secret access key
    pub secret_key: String,

    /// Bucket all object operations address
    pub bucket: String,

    /// Address the bucket in the path (`host/bucket/key`) instead of the
    /// host name (`bucket.host/key`). Default: true
    #[serde(default = "default_true")]
    pub path_style: bool,

    /// Parts uploaded concurrently by a multipart upload (default: 4)
    #[serde(default = "default_part_concurrency")]
    pub part_concurrency: usize,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Per-request timeout in milliseconds; takes precedence over
    /// `request_timeout_secs` when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_ms: Option<u64>,

    /// Skip TLS certificate and host name verification
    #[serde(default)]
    pub insecure_tls: bool,
}

fn default_true() -> bool {
    true
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_part_concurrency() -> usize {
    4
}

fn default_request_timeout() -> u64 {
    300
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("end_point", &self.end_point)
            .field("port", &self.port)
            .field("use_ssl", &self.use_ssl)
            .field("region", &self.region)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("path_style", &self.path_style)
            .field("part_concurrency", &self.part_concurrency)
            .field("request_timeout", &self.request_timeout())
            .field("insecure_tls", &self.insecure_tls)
            .finish()
    }
}

impl ClientConfig {
    /// Configuration with default port, TLS, region and path-style addressing
    pub fn new(
        end_point: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            end_point: end_point.into(),
            port: None,
            use_ssl: true,
            region: default_region(),
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            bucket: bucket.into(),
            path_style: true,
            part_concurrency: default_part_concurrency(),
            request_timeout_secs: default_request_timeout(),
            request_timeout_ms: None,
            insecure_tls: false,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_ssl(mut self, use_ssl: bool) -> Self {
        self.use_ssl = use_ssl;
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_path_style(mut self, path_style: bool) -> Self {
        self.path_style = path_style;
        self
    }

    pub fn with_part_concurrency(mut self, concurrency: usize) -> Self {
        self.part_concurrency = concurrency;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        let millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX).max(1);
        self.request_timeout_secs = timeout.as_secs();
        self.request_timeout_ms = Some(millis);
        self
    }

    pub fn with_insecure_tls(mut self, insecure: bool) -> Self {
        self.insecure_tls = insecure;
        self
    }

    /// Check that every field needed to sign and address a request is usable
    pub fn validate(&self) -> crate::s3::Result<()> {
        fn missing(field: &str) -> S3Error {
            S3Error::Configuration(format!("{} is required", field))
        }

        let end_point = self.end_point.trim();
        if end_point.is_empty() {
            return Err(missing("end_point"));
        }
        if end_point.contains("://") || end_point.contains('/') {
            return Err(S3Error::Configuration(format!(
                "end_point '{}' must be a host name without scheme or path (use use_ssl and port)",
                self.end_point
            )));
        }
        if self.port == Some(0) {
            return Err(S3Error::Configuration("port must not be 0".to_string()));
        }
        if self.bucket.trim().is_empty() {
            return Err(missing("bucket"));
        }
        if self.region.trim().is_empty() {
            return Err(missing("region"));
        }
        if self.access_key.is_empty() {
            return Err(missing("access_key"));
        }
        if self.secret_key.is_empty() {
            return Err(missing("secret_key"));
        }
        if self.part_concurrency == 0 || self.part_concurrency > MAX_PART_CONCURRENCY {
            return Err(S3Error::Configuration(format!(
                "part_concurrency must be between 1 and {}, got {}",
                MAX_PART_CONCURRENCY, self.part_concurrency
            )));
        }
        Ok(())
    }

    pub fn scheme(&self) -> &'static str {
        if self.use_ssl {
            "https"
        } else {
            "http"
        }
    }

    /// Port requests go to, after defaults
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or(if self.use_ssl { 443 } else { 80 })
    }

    pub fn request_timeout(&self) -> Duration {
        match self.request_timeout_ms {
            Some(millis) => Duration::from_millis(millis),
            None => Duration::from_secs(self.request_timeout_secs),
        }
    }

    /// `scheme://host[:port]` addressing the bucket: the endpoint itself in
    /// path style, `bucket.endpoint` otherwise. Default ports are omitted.
    pub fn bucket_host_url(&self) -> String {
        let host = self.end_point.trim();
        let mut url = String::with_capacity(self.bucket.len() + host.len() + 16);
        url.push_str(self.scheme());
        url.push_str("://");
        if !self.path_style {
            url.push_str(&self.bucket);
            url.push('.');
        }
        url.push_str(host);
        if let Some(port) = self.port {
            let default_port = if self.use_ssl { 443 } else { 80 };
            if port != default_port {
                url.push(':');
                url.push_str(&port.to_string());
            }
        }
        url
    }
}

/// Split `http(s)://host[:port]` into its parts. A bare host keeps `use_ssl` unset.
fn split_endpoint_url(raw: &str) -> Result<(String, Option<u16>, Option<bool>)> {
    let raw = raw.trim().trim_end_matches('/');
    let (rest, use_ssl) = if let Some(rest) = raw.strip_prefix("https://") {
        (rest, Some(true))
    } else if let Some(rest) = raw.strip_prefix("http://") {
        (rest, Some(false))
    } else {
        (raw, None)
    };

    match rest.rsplit_once(':') {
        Some((host, port)) => {
            let port: u16 = port
                .parse()
                .with_context(|| format!("Invalid port in endpoint '{}'", raw))?;
            Ok((host.to_string(), Some(port), use_ssl))
        }
        None => Ok((rest.to_string(), None, use_ssl)),
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Named client configurations
    #[serde(default)]
    pub profiles: HashMap<String, ClientConfig>,

    /// Profile used when none is named
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_profile: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a profile by name, or the default profile if not specified
    pub fn get_profile(&self, name: Option<&str>) -> Option<&ClientConfig> {
        if let Some(name) = name {
            self.profiles.get(name)
        } else if let Some(default) = &self.default_profile {
            self.profiles.get(default)
        } else {
            self.profiles.values().next()
        }
    }
}

/// Load configuration from a YAML file
pub fn load_from_yaml<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

    let config: Config =
        serde_yaml::from_str(&content).context("Failed to parse YAML configuration")?;

    Ok(config)
}

fn env_flag(name: &str) -> Result<Option<bool>> {
    match std::env::var(name) {
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            other => anyhow::bail!("{} must be a boolean, got '{}'", name, other),
        },
        Err(_) => Ok(None),
    }
}

/// Load configuration from environment variables (and `.env` if present)
///
/// - S3_ENDPOINT (host, `host:port` or `http(s)://host[:port]`)
/// - S3_PORT, S3_USE_SSL (optional, override what S3_ENDPOINT implies)
/// - AWS_ACCESS_KEY_ID / S3_KEY
/// - AWS_SECRET_ACCESS_KEY / S3_SECRET
/// - AWS_REGION (optional, defaults to us-east-1)
/// - S3_BUCKET
/// - S3_PATH_STYLE, S3_PART_CONCURRENCY (optional)
pub fn load_from_env() -> Result<Config> {
    // Try to load .env file if it exists (don't fail if it doesn't)
    let _ = dotenvy::dotenv();

    let endpoint = std::env::var("S3_ENDPOINT").context("S3_ENDPOINT environment variable not set")?;
    let (end_point, port, use_ssl) = split_endpoint_url(&endpoint)?;

    let access_key = std::env::var("AWS_ACCESS_KEY_ID")
        .or_else(|_| std::env::var("S3_KEY"))
        .context("Neither AWS_ACCESS_KEY_ID nor S3_KEY environment variable is set")?;

    let secret_key = std::env::var("AWS_SECRET_ACCESS_KEY")
        .or_else(|_| std::env::var("S3_SECRET"))
        .context("Neither AWS_SECRET_ACCESS_KEY nor S3_SECRET environment variable is set")?;

    let bucket = std::env::var("S3_BUCKET").context("S3_BUCKET environment variable not set")?;

    let mut profile = ClientConfig::new(end_point, access_key, secret_key, bucket);
    profile.port = port;
    if let Some(use_ssl) = use_ssl {
        profile.use_ssl = use_ssl;
    }

    if let Ok(port) = std::env::var("S3_PORT") {
        profile.port = Some(
            port.trim()
                .parse()
                .with_context(|| format!("S3_PORT must be a port number, got '{}'", port))?,
        );
    }
    if let Some(use_ssl) = env_flag("S3_USE_SSL")? {
        profile.use_ssl = use_ssl;
    }
    if let Ok(region) = std::env::var("AWS_REGION") {
        profile.region = region;
    }
    if let Some(path_style) = env_flag("S3_PATH_STYLE")? {
        profile.path_style = path_style;
    }
    if let Ok(concurrency) = std::env::var("S3_PART_CONCURRENCY") {
        profile.part_concurrency = concurrency.trim().parse().with_context(|| {
            format!("S3_PART_CONCURRENCY must be a number, got '{}'", concurrency)
        })?;
    }

    let mut config = Config::new();
    config.profiles.insert("default".to_string(), profile);
    config.default_profile = Some("default".to_string());
    Ok(config)
}

/// Load configuration from a YAML file when a path is given, otherwise from
/// the environment. A named profile must exist and becomes the default.
pub fn load_config(config_path: Option<&str>, profile_name: Option<&str>) -> Result<Config> {
    if let Some(path) = config_path {
        let mut config = load_from_yaml(path)?;

        if let Some(name) = profile_name {
            if !config.profiles.contains_key(name) {
                anyhow::bail!("Profile '{}' not found in config file", name);
            }
            config.default_profile = Some(name.to_string());
        }

        Ok(config)
    } else {
        load_from_env()
    }
}
