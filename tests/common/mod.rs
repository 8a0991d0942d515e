//! In-memory S3 stand-in shared by the integration tests
//!
//! Checks every request's SigV4 signature with its own signer, stores
//! objects, runs the multipart protocol with server-side composite ETags,
//! honours ranges, and can be told to misbehave.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use chrono::NaiveDateTime;
use http_body_util::Full;
use hyper::header::HeaderMap;
use hyper::{Method, Request, Response, StatusCode};
use s3stream::s3::signer::{S3SignerV4, AMZ_DATE_FORMAT, UNSIGNED_PAYLOAD};
use s3stream::s3::transport::{full_body, ResponseBody, Transport};
use s3stream::{ClientConfig, S3Client};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const BUCKET: &str = "dev-bucket";
pub const REGION: &str = "dev-region";
pub const ACCESS_KEY: &str = "minio";
pub const SECRET_KEY: &str = "minio123";

pub const MIB: usize = 1024 * 1024;
const MIN_PART_SIZE: usize = 5 * MIB;
const LAST_MODIFIED: &str = "Mon, 19 Oct 2026 10:00:00 GMT";

pub const SIGNATURE_MISMATCH_MESSAGE: &str = "The request signature we calculated does not match the signature you provided. Check your key and signing method.";

/// Path-style configuration for the fake endpoint
pub fn config() -> ClientConfig {
    ClientConfig::new("localhost", ACCESS_KEY, SECRET_KEY, BUCKET)
        .with_ssl(false)
        .with_port(9000)
        .with_region(REGION)
}

pub fn client(fake: &Arc<FakeS3>) -> S3Client {
    client_with(config(), fake)
}

pub fn client_with(config: ClientConfig, fake: &Arc<FakeS3>) -> S3Client {
    S3Client::with_transport(config, fake.clone()).unwrap()
}

/// Deterministic test payload of `len` bytes
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

pub fn md5_hex(data: &[u8]) -> String {
    format!("{:x}", md5::compute(data))
}

/// Operations the fake has seen, in arrival order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    PutObject,
    Initiate,
    UploadPart(u32),
    Complete,
    Abort,
    GetObject,
    HeadObject,
    DeleteObject,
    Other,
}

/// Ways the fake can be told to misbehave
#[derive(Debug, Default)]
pub struct Behaviour {
    /// Answer ranged GETs with the whole object and 200
    pub ignore_range: bool,
    /// Fail CreateMultipartUpload with 503 SlowDown
    pub fail_initiate: bool,
    /// Fail this part number with 500 InternalError
    pub fail_part: Option<u32>,
    /// Fail AbortMultipartUpload with 500
    pub fail_abort: bool,
    /// Hold the response of AbortMultipartUpload for a while
    pub abort_delay: Option<Duration>,
    /// Answer CompleteMultipartUpload with 200 and an `<Error>` body
    pub complete_with_error_body: bool,
    /// Hold the response of these parts for a while
    pub part_delays: HashMap<u32, Duration>,
    /// Answer every request with this status and a non-XML body
    pub garbage_status: Option<StatusCode>,
}

struct StoredObject {
    data: Bytes,
    etag: String,
    /// content-type and x-amz-meta-* headers given at upload time
    headers: BTreeMap<String, String>,
}

struct OpenUpload {
    key: String,
    parts: BTreeMap<u32, Bytes>,
    headers: BTreeMap<String, String>,
}

#[derive(Default)]
struct State {
    objects: HashMap<String, StoredObject>,
    uploads: HashMap<String, OpenUpload>,
    next_upload: u64,
    next_request: u64,
    log: Vec<Op>,
    manifests: Vec<Vec<u32>>,
    part_completion_order: Vec<u32>,
    in_flight_parts: usize,
    max_in_flight_parts: usize,
}

pub struct FakeS3 {
    verifier: S3SignerV4,
    state: Mutex<State>,
    behaviour: Mutex<Behaviour>,
}

impl FakeS3 {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            verifier: S3SignerV4::new(
                ACCESS_KEY.to_string(),
                SECRET_KEY.to_string(),
                REGION.to_string(),
            )
            .unwrap(),
            state: Mutex::new(State::default()),
            behaviour: Mutex::new(Behaviour::default()),
        })
    }

    pub fn configure(&self, f: impl FnOnce(&mut Behaviour)) {
        f(&mut self.behaviour.lock().unwrap());
    }

    pub fn ops(&self) -> Vec<Op> {
        self.state.lock().unwrap().log.clone()
    }

    pub fn count(&self, pred: impl Fn(&Op) -> bool) -> usize {
        self.state.lock().unwrap().log.iter().filter(|op| pred(op)).count()
    }

    pub fn part_uploads(&self) -> usize {
        self.count(|op| matches!(op, Op::UploadPart(_)))
    }

    /// Part numbers listed by each CompleteMultipartUpload, in order received
    pub fn manifests(&self) -> Vec<Vec<u32>> {
        self.state.lock().unwrap().manifests.clone()
    }

    /// Part numbers in the order their uploads finished
    pub fn part_completion_order(&self) -> Vec<u32> {
        self.state.lock().unwrap().part_completion_order.clone()
    }

    pub fn max_in_flight_parts(&self) -> usize {
        self.state.lock().unwrap().max_in_flight_parts
    }

    pub fn open_uploads(&self) -> usize {
        self.state.lock().unwrap().uploads.len()
    }

    pub fn object(&self, key: &str) -> Option<Bytes> {
        self.state.lock().unwrap().objects.get(key).map(|o| o.data.clone())
    }

    pub fn insert_object(&self, key: &str, data: impl Into<Bytes>) {
        let data = data.into();
        let etag = md5_hex(&data);
        self.state.lock().unwrap().objects.insert(
            key.to_string(),
            StoredObject {
                data,
                etag,
                headers: BTreeMap::new(),
            },
        );
    }

    /// Handle one request addressed by its absolute `url`
    pub async fn handle(
        &self,
        method: Method,
        url: &str,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Response<Bytes> {
        let (path, query) = split_url(url);
        let op = classify(&method, &query);
        let request_id = {
            let mut state = self.state.lock().unwrap();
            state.log.push(op);
            state.next_request += 1;
            format!("FAKE{:06}", state.next_request)
        };

        let garbage_status = self.behaviour.lock().unwrap().garbage_status;
        if let Some(status) = garbage_status {
            return Response::builder()
                .status(status)
                .header("content-type", "text/html")
                .body(Bytes::from_static(b"<html><body>upstream unavailable</body></html>"))
                .unwrap();
        }

        let key = match path.strip_prefix(&format!("/{}/", BUCKET)) {
            Some(encoded) => urlencoding::decode(encoded).unwrap().into_owned(),
            None => {
                return error_response(
                    StatusCode::NOT_FOUND,
                    "NoSuchBucket",
                    "The specified bucket does not exist",
                    "",
                    &request_id,
                )
            }
        };

        if let Err(response) = self.verify(&method, url, headers, &body, &key, &request_id) {
            return response;
        }

        match op {
            Op::PutObject => self.put_object(&key, headers, body),
            Op::Initiate => self.initiate(&key, headers, &request_id),
            Op::UploadPart(part_number) => {
                let upload_id = query.get("uploadId").cloned().unwrap_or_default();
                self.upload_part(&key, &upload_id, part_number, body, &request_id)
                    .await
            }
            Op::Complete => {
                let upload_id = query.get("uploadId").cloned().unwrap_or_default();
                self.complete(&key, &upload_id, &body, &request_id)
            }
            Op::Abort => {
                let upload_id = query.get("uploadId").cloned().unwrap_or_default();
                let delay = self.behaviour.lock().unwrap().abort_delay;
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                self.abort(&key, &upload_id, &request_id)
            }
            Op::GetObject => self.get_object(&key, headers, &request_id),
            Op::HeadObject => self.head_object(&key),
            Op::DeleteObject => {
                self.state.lock().unwrap().objects.remove(&key);
                empty_response(StatusCode::NO_CONTENT)
            }
            Op::Other => error_response(
                StatusCode::NOT_IMPLEMENTED,
                "NotImplemented",
                "A header you provided implies functionality that is not implemented",
                &key,
                &request_id,
            ),
        }
    }

    fn verify(
        &self,
        method: &Method,
        url: &str,
        headers: &HeaderMap,
        body: &Bytes,
        key: &str,
        request_id: &str,
    ) -> Result<(), Response<Bytes>> {
        let mismatch = || {
            error_response(
                StatusCode::FORBIDDEN,
                "SignatureDoesNotMatch",
                SIGNATURE_MISMATCH_MESSAGE,
                key,
                request_id,
            )
        };

        let authorization = header(headers, "authorization").ok_or_else(|| {
            error_response(
                StatusCode::FORBIDDEN,
                "AccessDenied",
                "Access Denied.",
                key,
                request_id,
            )
        })?;
        let signed_list = authorization
            .split("SignedHeaders=")
            .nth(1)
            .and_then(|rest| rest.split(',').next())
            .ok_or_else(mismatch)?;
        let when = header(headers, "x-amz-date")
            .and_then(|v| NaiveDateTime::parse_from_str(v, AMZ_DATE_FORMAT).ok())
            .ok_or_else(mismatch)?
            .and_utc();
        let payload_hash = header(headers, "x-amz-content-sha256").ok_or_else(mismatch)?;

        let mut to_sign = BTreeMap::new();
        for name in signed_list.split(';') {
            if matches!(name, "host" | "x-amz-date" | "x-amz-content-sha256") {
                continue;
            }
            let value = header(headers, name).ok_or_else(mismatch)?;
            to_sign.insert(name.to_string(), value.to_string());
        }

        let expected = self
            .verifier
            .sign_at(method.as_str(), url, to_sign, payload_hash, when);
        if expected.get("authorization").map(String::as_str) != Some(authorization)
            || expected.get("host").map(String::as_str) != header(headers, "host")
        {
            return Err(mismatch());
        }

        if payload_hash != UNSIGNED_PAYLOAD && hex::encode(Sha256::digest(body)) != payload_hash {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                "XAmzContentSHA256Mismatch",
                "The provided 'x-amz-content-sha256' header does not match what was computed.",
                key,
                request_id,
            ));
        }
        Ok(())
    }

    fn put_object(&self, key: &str, headers: &HeaderMap, body: Bytes) -> Response<Bytes> {
        let etag = md5_hex(&body);
        self.state.lock().unwrap().objects.insert(
            key.to_string(),
            StoredObject {
                data: body,
                etag: etag.clone(),
                headers: object_headers(headers),
            },
        );
        Response::builder()
            .status(StatusCode::OK)
            .header("etag", format!("\"{}\"", etag))
            .body(Bytes::new())
            .unwrap()
    }

    fn initiate(&self, key: &str, headers: &HeaderMap, request_id: &str) -> Response<Bytes> {
        if self.behaviour.lock().unwrap().fail_initiate {
            return error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "SlowDown",
                "Please reduce your request rate.",
                key,
                request_id,
            );
        }
        let mut state = self.state.lock().unwrap();
        state.next_upload += 1;
        let upload_id = format!("upload/{}+{}", state.next_upload, key.len());
        state.uploads.insert(
            upload_id.clone(),
            OpenUpload {
                key: key.to_string(),
                parts: BTreeMap::new(),
                headers: object_headers(headers),
            },
        );
        let xml = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
<InitiateMultipartUploadResult xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">\
<Bucket>{}</Bucket><Key>{}</Key><UploadId>{}</UploadId></InitiateMultipartUploadResult>",
            BUCKET,
            xml_escape(key),
            xml_escape(&upload_id)
        );
        xml_response(StatusCode::OK, xml)
    }

    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: u32,
        body: Bytes,
        request_id: &str,
    ) -> Response<Bytes> {
        let (delay, fail) = {
            let behaviour = self.behaviour.lock().unwrap();
            (
                behaviour.part_delays.get(&part_number).copied(),
                behaviour.fail_part == Some(part_number),
            )
        };

        {
            let mut state = self.state.lock().unwrap();
            state.in_flight_parts += 1;
            state.max_in_flight_parts = state.max_in_flight_parts.max(state.in_flight_parts);
        }
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock().unwrap();
        state.in_flight_parts -= 1;

        if fail {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalError",
                "We encountered an internal error, please try again.",
                key,
                request_id,
            );
        }

        let Some(upload) = state.uploads.get_mut(upload_id).filter(|u| u.key == key) else {
            return no_such_upload(key, request_id);
        };
        let etag = md5_hex(&body);
        upload.parts.insert(part_number, body);
        state.part_completion_order.push(part_number);

        Response::builder()
            .status(StatusCode::OK)
            .header("etag", format!("\"{}\"", etag))
            .body(Bytes::new())
            .unwrap()
    }

    fn complete(&self, key: &str, upload_id: &str, body: &Bytes, request_id: &str) -> Response<Bytes> {
        let manifest = match std::str::from_utf8(body).ok().and_then(parse_manifest) {
            Some(manifest) if !manifest.is_empty() => manifest,
            _ => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    "MalformedXML",
                    "The XML you provided was not well-formed or did not validate against our published schema.",
                    key,
                    request_id,
                )
            }
        };

        let complete_with_error = self.behaviour.lock().unwrap().complete_with_error_body;
        let mut state = self.state.lock().unwrap();
        state
            .manifests
            .push(manifest.iter().map(|(n, _)| *n).collect());

        if complete_with_error {
            return xml_response(
                StatusCode::OK,
                error_document("InternalError", "We encountered an internal error, please try again.", key, request_id),
            );
        }

        let Some(upload) = state.uploads.get(upload_id).filter(|u| u.key == key) else {
            return no_such_upload(key, request_id);
        };

        if manifest.windows(2).any(|w| w[0].0 >= w[1].0) {
            return error_response(
                StatusCode::BAD_REQUEST,
                "InvalidPartOrder",
                "The list of parts was not in ascending order. The parts list must be specified in order by part number.",
                key,
                request_id,
            );
        }

        let mut data = Vec::new();
        let mut digests = Vec::with_capacity(manifest.len() * 16);
        for (index, (part_number, etag)) in manifest.iter().enumerate() {
            let part = match upload.parts.get(part_number) {
                Some(part) if md5_hex(part) == *etag => part,
                _ => {
                    return error_response(
                        StatusCode::BAD_REQUEST,
                        "InvalidPart",
                        "One or more of the specified parts could not be found.",
                        key,
                        request_id,
                    )
                }
            };
            if index + 1 < manifest.len() && part.len() < MIN_PART_SIZE {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    "EntityTooSmall",
                    "Your proposed upload is smaller than the minimum allowed object size.",
                    key,
                    request_id,
                );
            }
            data.extend_from_slice(part);
            digests.extend_from_slice(&md5::compute(part).0);
        }

        let etag = format!("{:x}-{}", md5::compute(&digests), manifest.len());
        let headers = upload.headers.clone();
        state.uploads.remove(upload_id);
        state.objects.insert(
            key.to_string(),
            StoredObject {
                data: Bytes::from(data),
                etag: etag.clone(),
                headers,
            },
        );

        let xml = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
<CompleteMultipartUploadResult xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">\
<Location>http://localhost:9000/{bucket}/{key}</Location><Bucket>{bucket}</Bucket>\
<Key>{key}</Key><ETag>&quot;{etag}&quot;</ETag></CompleteMultipartUploadResult>",
            bucket = BUCKET,
            key = xml_escape(key),
            etag = etag
        );
        xml_response(StatusCode::OK, xml)
    }

    fn abort(&self, key: &str, upload_id: &str, request_id: &str) -> Response<Bytes> {
        if self.behaviour.lock().unwrap().fail_abort {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalError",
                "We encountered an internal error, please try again.",
                key,
                request_id,
            );
        }
        match self.state.lock().unwrap().uploads.remove(upload_id) {
            Some(_) => empty_response(StatusCode::NO_CONTENT),
            None => no_such_upload(key, request_id),
        }
    }

    fn get_object(&self, key: &str, headers: &HeaderMap, request_id: &str) -> Response<Bytes> {
        let ignore_range = self.behaviour.lock().unwrap().ignore_range;
        let state = self.state.lock().unwrap();
        let Some(object) = state.objects.get(key) else {
            return error_response(
                StatusCode::NOT_FOUND,
                "NoSuchKey",
                "The specified key does not exist.",
                key,
                request_id,
            );
        };

        let total = object.data.len() as u64;
        let range = header(headers, "range").filter(|_| !ignore_range);
        let (status, body, content_range) = match range {
            None => (StatusCode::OK, object.data.clone(), None),
            Some(range) => match parse_range(range, total) {
                Some((first, last)) => (
                    StatusCode::PARTIAL_CONTENT,
                    object.data.slice(first as usize..=last as usize),
                    Some(format!("bytes {}-{}/{}", first, last, total)),
                ),
                None => {
                    return error_response(
                        StatusCode::RANGE_NOT_SATISFIABLE,
                        "InvalidRange",
                        "The requested range is not satisfiable",
                        key,
                        request_id,
                    )
                }
            },
        };

        let mut builder = object_response_headers(Response::builder().status(status), object)
            .header("content-length", body.len().to_string())
            .header("accept-ranges", "bytes");
        if let Some(content_range) = content_range {
            builder = builder.header("content-range", content_range);
        }
        builder.body(body).unwrap()
    }

    fn head_object(&self, key: &str) -> Response<Bytes> {
        let state = self.state.lock().unwrap();
        match state.objects.get(key) {
            Some(object) => object_response_headers(Response::builder().status(StatusCode::OK), object)
                .header("content-length", object.data.len().to_string())
                .body(Bytes::new())
                .unwrap(),
            // HEAD errors carry no body
            None => empty_response(StatusCode::NOT_FOUND),
        }
    }
}

#[async_trait]
impl Transport for FakeS3 {
    async fn send(&self, request: Request<Full<Bytes>>) -> s3stream::s3::Result<Response<ResponseBody>> {
        let (parts, body) = request.into_parts();
        let body = http_body_util::BodyExt::collect(body)
            .await
            .map(|collected| collected.to_bytes())
            .unwrap_or_default();
        let url = parts.uri.to_string();
        let response = self.handle(parts.method, &url, &parts.headers, body).await;
        Ok(response.map(full_body))
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Split an absolute URL into its path and decoded query parameters
fn split_url(url: &str) -> (String, HashMap<String, String>) {
    let after_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    let path_and_query = after_scheme
        .find('/')
        .map(|pos| &after_scheme[pos..])
        .unwrap_or("/");
    let (path, query) = path_and_query
        .split_once('?')
        .unwrap_or((path_and_query, ""));

    let params = query
        .split('&')
        .filter(|p| !p.is_empty())
        .map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            (
                urlencoding::decode(k).unwrap().into_owned(),
                urlencoding::decode(v).unwrap().into_owned(),
            )
        })
        .collect();
    (path.to_string(), params)
}

fn classify(method: &Method, query: &HashMap<String, String>) -> Op {
    let upload_id = query.contains_key("uploadId");
    match *method {
        Method::PUT if upload_id => query
            .get("partNumber")
            .and_then(|n| n.parse().ok())
            .map(Op::UploadPart)
            .unwrap_or(Op::Other),
        Method::PUT => Op::PutObject,
        Method::POST if query.contains_key("uploads") => Op::Initiate,
        Method::POST if upload_id => Op::Complete,
        Method::DELETE if upload_id => Op::Abort,
        Method::DELETE => Op::DeleteObject,
        Method::GET => Op::GetObject,
        Method::HEAD => Op::HeadObject,
        _ => Op::Other,
    }
}

/// `bytes=a-b` / `bytes=a-` against an object of `total` bytes
fn parse_range(range: &str, total: u64) -> Option<(u64, u64)> {
    let spec = range.strip_prefix("bytes=")?;
    let (first, last) = spec.split_once('-')?;
    let first: u64 = first.parse().ok()?;
    if first >= total {
        return None;
    }
    let last = if last.is_empty() {
        total - 1
    } else {
        last.parse::<u64>().ok()?.min(total - 1)
    };
    (first <= last).then_some((first, last))
}

fn parse_manifest(xml: &str) -> Option<Vec<(u32, String)>> {
    fn between<'a>(s: &'a str, open: &str, close: &str) -> Option<&'a str> {
        let start = s.find(open)? + open.len();
        let end = s[start..].find(close)? + start;
        Some(&s[start..end])
    }

    xml.split("<Part>")
        .skip(1)
        .map(|part| {
            let number = between(part, "<PartNumber>", "</PartNumber>")?.parse().ok()?;
            let etag = between(part, "<ETag>", "</ETag>")?
                .replace("&quot;", "\"")
                .trim_matches('"')
                .to_string();
            Some((number, etag))
        })
        .collect()
}

fn object_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter(|(name, _)| {
            let name = name.as_str();
            name == "content-type" || name.starts_with("x-amz-meta-")
        })
        .filter_map(|(name, value)| Some((name.to_string(), value.to_str().ok()?.to_string())))
        .collect()
}

fn object_response_headers(
    mut builder: hyper::http::response::Builder,
    object: &StoredObject,
) -> hyper::http::response::Builder {
    builder = builder
        .header("etag", format!("\"{}\"", object.etag))
        .header("last-modified", LAST_MODIFIED);
    if !object.headers.contains_key("content-type") {
        builder = builder.header("content-type", "binary/octet-stream");
    }
    for (name, value) in &object.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn error_document(code: &str, message: &str, key: &str, request_id: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
<Error><Code>{code}</Code><Message>{message}</Message><Key>{key}</Key>\
<BucketName>{bucket}</BucketName><Resource>/{bucket}/{key}</Resource>\
<RequestId>{request_id}</RequestId><HostId>fake-host</HostId></Error>",
        code = code,
        message = xml_escape(message),
        key = xml_escape(key),
        bucket = BUCKET,
        request_id = request_id
    )
}

fn error_response(
    status: StatusCode,
    code: &str,
    message: &str,
    key: &str,
    request_id: &str,
) -> Response<Bytes> {
    Response::builder()
        .status(status)
        .header("content-type", "application/xml")
        .header("x-amz-request-id", request_id)
        .body(Bytes::from(error_document(code, message, key, request_id)))
        .unwrap()
}

fn no_such_upload(key: &str, request_id: &str) -> Response<Bytes> {
    error_response(
        StatusCode::NOT_FOUND,
        "NoSuchUpload",
        "The specified multipart upload does not exist. The upload ID may be invalid, or the upload may have been aborted or completed.",
        key,
        request_id,
    )
}

fn xml_response(status: StatusCode, xml: String) -> Response<Bytes> {
    Response::builder()
        .status(status)
        .header("content-type", "application/xml")
        .body(Bytes::from(xml))
        .unwrap()
}

fn empty_response(status: StatusCode) -> Response<Bytes> {
    Response::builder().status(status).body(Bytes::new()).unwrap()
}
