//! HTTP transport seam
//!
//! The client only needs "send a request, get a response back". [`Transport`]
//! is that capability; [`HyperTransport`] is the production implementation.

use crate::config::ClientConfig;
use crate::s3::error::{BoxError, Result, S3Error};
use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Request, Response};
use hyper_tls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client as HyperClient;
use hyper_util::rt::TokioExecutor;
use native_tls::TlsConnector;
use std::time::Duration;

/// Response body handed back by a transport. Consumed lazily by the caller.
pub type ResponseBody = http_body_util::combinators::BoxBody<Bytes, BoxError>;

/// Sends one HTTP request and returns the response head with a streaming body.
///
/// Implementations report connection-level failures as [`S3Error::Transport`]
/// and must not interpret status codes.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: Request<Full<Bytes>>) -> Result<Response<ResponseBody>>;
}

/// Wrap an in-memory body as a [`ResponseBody`]
pub fn full_body(data: impl Into<Bytes>) -> ResponseBody {
    Full::new(data.into()).map_err(|never| match never {}).boxed()
}

/// hyper client over native-tls
///
/// - HTTP/1.1 only
/// - 90s idle connection timeout
/// - TCP_NODELAY enabled
/// - 90s TCP keepalive
pub struct HyperTransport {
    client: HyperClient<HttpsConnector<HttpConnector>, Full<Bytes>>,
    /// Deadline for receiving the response head
    timeout: Duration,
}

impl HyperTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut http = HttpConnector::new();
        http.set_nodelay(true);
        http.enforce_http(false);
        http.set_connect_timeout(Some(Duration::from_secs(10)));
        http.set_keepalive(Some(Duration::from_secs(90)));

        let tls = if config.insecure_tls {
            tracing::warn!("INSECURE TLS MODE ENABLED: Certificate verification is disabled!");
            TlsConnector::builder()
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true)
                .build()
        } else {
            TlsConnector::new()
        }
        .map_err(|e| S3Error::Configuration(format!("Failed to build TLS connector: {}", e)))?;

        let https = HttpsConnector::from((http, tls.into()));

        let client = HyperClient::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(64)
            .retry_canceled_requests(true)
            .set_host(true)
            .build(https);

        Ok(Self {
            client,
            timeout: config.request_timeout(),
        })
    }
}

#[async_trait]
impl Transport for HyperTransport {
    async fn send(&self, request: Request<Full<Bytes>>) -> Result<Response<ResponseBody>> {
        let response = tokio::time::timeout(self.timeout, self.client.request(request))
            .await
            .map_err(|_| {
                S3Error::transport(format!("no response within {:?}", self.timeout))
            })?
            .map_err(S3Error::transport)?;

        Ok(response.map(|body| body.map_err(BoxError::from).boxed()))
    }
}
