//! AWS Signature Version 4 signer for S3 requests
//!
//! - Header signing (`Authorization` + `x-amz-date` + `x-amz-content-sha256`)
//! - Query-string presigning (`X-Amz-*` parameters)
//! - Daily signing key cache (avoids 4 HMAC operations per request)
//! - Constant empty payload hash (avoids SHA256 for empty bodies)
//! - Zero-allocation URI encoding (hex lookup table, no format!())

use crate::s3::error::{Result, S3Error};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt::Write as FmtWrite;
use std::sync::Mutex;

type HmacSha256 = Hmac<Sha256>;

/// Hex lookup table for zero-allocation percent encoding
pub(crate) static HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

/// SHA256 of the empty payload
pub const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Payload hash marker for requests whose body is not covered by the signature
pub const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const SERVICE: &str = "s3";

/// `x-amz-date` / `X-Amz-Date` timestamp format
pub const AMZ_DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// AWS Signature Version 4 signer
pub struct S3SignerV4 {
    access_key: String,
    region: String,
    /// "AWS4" + secret_key as bytes, the root of the key derivation chain
    aws4_key: Vec<u8>,
    /// Cached signing key per day: (date_stamp, derived_key)
    cached_signing_key: Mutex<Option<(String, [u8; 32])>>,
}

impl std::fmt::Debug for S3SignerV4 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3SignerV4")
            .field("access_key", &self.access_key)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl S3SignerV4 {
    /// Create a new S3 signer. Fails when a credential or the region is empty.
    pub fn new(access_key: String, secret_key: String, region: String) -> Result<Self> {
        if access_key.is_empty() {
            return Err(S3Error::Configuration("access key is required".to_string()));
        }
        if secret_key.is_empty() {
            return Err(S3Error::Configuration("secret key is required".to_string()));
        }
        if region.is_empty() {
            return Err(S3Error::Configuration("region is required".to_string()));
        }
        let aws4_key = format!("AWS4{}", secret_key).into_bytes();
        Ok(Self {
            access_key,
            region,
            aws4_key,
            cached_signing_key: Mutex::new(None),
        })
    }

    /// Hex SHA256 of a request body, using the constant for empty bodies
    pub fn payload_hash(payload: &[u8]) -> String {
        if payload.is_empty() {
            EMPTY_SHA256.to_string()
        } else {
            hex::encode(Sha256::digest(payload))
        }
    }

    /// Sign with a precomputed payload hash (or [`UNSIGNED_PAYLOAD`]) at a given time.
    ///
    /// `headers` must use lower-case names. Returns them with `host`,
    /// `x-amz-date`, `x-amz-content-sha256` and `authorization` added.
    pub fn sign_at(
        &self,
        method: &str,
        url: &str,
        mut headers: BTreeMap<String, String>,
        payload_hash: &str,
        now: DateTime<Utc>,
    ) -> BTreeMap<String, String> {
        let (host, path, query) = Self::parse_url_fast(url);

        let amz_date = now.format(AMZ_DATE_FORMAT).to_string();
        let date_stamp = now.format("%Y%m%d").to_string();

        headers.insert("host".to_string(), host.to_string());
        headers.insert("x-amz-date".to_string(), amz_date.clone());
        headers.insert("x-amz-content-sha256".to_string(), payload_hash.to_string());

        let canonical_query = Self::create_canonical_query_string(query);
        let canonical_headers = Self::create_canonical_headers(&headers);
        let signed_headers = Self::create_signed_headers(&headers);

        // Path is used as-is: object URLs are built already URI-encoded
        let canonical_request = format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            method, path, canonical_query, canonical_headers, signed_headers, payload_hash
        );
        tracing::trace!(method, url, canonical_request = %canonical_request, "sigv4 canonical request");

        let credential_scope = self.credential_scope(&date_stamp);
        let signature =
            self.signature_for(&amz_date, &date_stamp, &credential_scope, &canonical_request);

        let authorization = format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM, self.access_key, credential_scope, signed_headers, signature
        );
        headers.insert("authorization".to_string(), authorization);

        headers
    }

    /// Presign a URL with query-string authentication.
    ///
    /// Only the `host` header is signed and the payload is [`UNSIGNED_PAYLOAD`].
    /// Returns `url` with the `X-Amz-*` parameters and signature appended.
    pub fn presign(&self, method: &str, url: &str, expires_secs: u64, now: DateTime<Utc>) -> String {
        let (host, path, query) = Self::parse_url_fast(url);

        let amz_date = now.format(AMZ_DATE_FORMAT).to_string();
        let date_stamp = now.format("%Y%m%d").to_string();
        let credential_scope = self.credential_scope(&date_stamp);

        let mut auth_query = String::with_capacity(256);
        auth_query.push_str("X-Amz-Algorithm=");
        auth_query.push_str(ALGORITHM);
        auth_query.push_str("&X-Amz-Credential=");
        auth_query.push_str(&Self::uri_encode(
            &format!("{}/{}", self.access_key, credential_scope),
            true,
        ));
        auth_query.push_str("&X-Amz-Date=");
        auth_query.push_str(&amz_date);
        let _ = write!(auth_query, "&X-Amz-Expires={}", expires_secs);
        auth_query.push_str("&X-Amz-SignedHeaders=host");

        let full_query = if query.is_empty() {
            auth_query
        } else {
            format!("{}&{}", query, auth_query)
        };

        let canonical_query = Self::create_canonical_query_string(&full_query);
        let canonical_request = format!(
            "{}\n{}\n{}\nhost:{}\n\nhost\n{}",
            method, path, canonical_query, host, UNSIGNED_PAYLOAD
        );
        let signature =
            self.signature_for(&amz_date, &date_stamp, &credential_scope, &canonical_request);

        let base = match url.find('?') {
            Some(pos) => &url[..pos],
            None => url,
        };
        format!("{}?{}&X-Amz-Signature={}", base, canonical_query, signature)
    }

    fn credential_scope(&self, date_stamp: &str) -> String {
        format!("{}/{}/{}/aws4_request", date_stamp, self.region, SERVICE)
    }

    fn signature_for(
        &self,
        amz_date: &str,
        date_stamp: &str,
        credential_scope: &str,
        canonical_request: &str,
    ) -> String {
        let canonical_request_hash = hex::encode(Sha256::digest(canonical_request.as_bytes()));
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM, amz_date, credential_scope, canonical_request_hash
        );
        self.calculate_signature(date_stamp, &string_to_sign)
    }

    /// Extract (host, path, query) from a URL without allocating.
    /// Default ports (:443 for https, :80 for http) are stripped from the host.
    fn parse_url_fast(url: &str) -> (&str, &str, &str) {
        let after_scheme = if let Some(rest) = url.strip_prefix("https://") {
            rest
        } else if let Some(rest) = url.strip_prefix("http://") {
            rest
        } else {
            url
        };

        let (authority, path_and_query) = match after_scheme.find('/') {
            Some(pos) => (&after_scheme[..pos], &after_scheme[pos..]),
            None => (after_scheme, "/"),
        };

        let (path, query) = match path_and_query.find('?') {
            Some(pos) => (&path_and_query[..pos], &path_and_query[pos + 1..]),
            None => (path_and_query, ""),
        };

        let host = if url.starts_with("https") {
            authority.strip_suffix(":443").unwrap_or(authority)
        } else {
            authority.strip_suffix(":80").unwrap_or(authority)
        };

        (host, path, query)
    }

    /// Create canonical query string (sorted by parameter name)
    ///
    /// Fast path: if all characters are already in canonical form, parameters
    /// are sorted, and all params have `=`, returns as-is. Valueless params
    /// like `?uploads` take the slow path and become `uploads=`.
    fn create_canonical_query_string(query: &str) -> String {
        if query.is_empty() {
            return String::new();
        }

        let all_canonical = query.bytes().all(|b| {
            matches!(b,
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9'
                | b'-' | b'_' | b'.' | b'~'
                | b'=' | b'&' | b'%'
            )
        });

        if all_canonical {
            let mut sorted = true;
            let mut all_have_equals = true;
            let mut last_key: &str = "";
            for pair in query.split('&') {
                let key = match pair.find('=') {
                    Some(pos) => &pair[..pos],
                    None => {
                        all_have_equals = false;
                        pair
                    }
                };
                if key < last_key {
                    sorted = false;
                    break;
                }
                last_key = key;
            }
            if sorted && all_have_equals {
                return query.to_string();
            }
        }

        // Slow path: decode, re-encode, sort
        let mut params: Vec<(String, String)> = Vec::new();
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            if let Some(pos) = pair.find('=') {
                let key = &pair[..pos];
                let value = &pair[pos + 1..];
                let decoded_key = urlencoding::decode(key).unwrap_or_else(|_| key.into());
                let decoded_value = urlencoding::decode(value).unwrap_or_else(|_| value.into());
                params.push((
                    Self::uri_encode(&decoded_key, true),
                    Self::uri_encode(&decoded_value, true),
                ));
            } else {
                let decoded = urlencoding::decode(pair).unwrap_or_else(|_| pair.into());
                params.push((Self::uri_encode(&decoded, true), String::new()));
            }
        }

        params.sort_unstable();

        params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Canonical headers; keys are lower-case and sorted by the BTreeMap
    fn create_canonical_headers(headers: &BTreeMap<String, String>) -> String {
        let mut result = String::with_capacity(headers.len() * 64);
        for (k, v) in headers {
            result.push_str(k);
            result.push(':');
            // Trimmed, with inner runs of whitespace collapsed to one space
            for (i, word) in v.split_whitespace().enumerate() {
                if i > 0 {
                    result.push(' ');
                }
                result.push_str(word);
            }
            result.push('\n');
        }
        result
    }

    fn create_signed_headers(headers: &BTreeMap<String, String>) -> String {
        let mut result = String::with_capacity(headers.len() * 20);
        for (i, k) in headers.keys().enumerate() {
            if i > 0 {
                result.push(';');
            }
            result.push_str(k);
        }
        result
    }

    /// Calculate the signature using the daily signing key cache
    fn calculate_signature(&self, date_stamp: &str, string_to_sign: &str) -> String {
        let signing_key = {
            let mut cache = self
                .cached_signing_key
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            match cache.as_ref() {
                Some((cached_date, cached_key)) if cached_date == date_stamp => *cached_key,
                _ => {
                    let key = self.derive_signing_key(date_stamp);
                    *cache = Some((date_stamp.to_string(), key));
                    key
                }
            }
        };

        hex::encode(Self::hmac_sha256(&signing_key, string_to_sign.as_bytes()))
    }

    /// Derive signing key: date -> region -> service -> "aws4_request"
    fn derive_signing_key(&self, date_stamp: &str) -> [u8; 32] {
        let k_date = Self::hmac_sha256(&self.aws4_key, date_stamp.as_bytes());
        let k_region = Self::hmac_sha256(&k_date, self.region.as_bytes());
        let k_service = Self::hmac_sha256(&k_region, SERVICE.as_bytes());
        Self::hmac_sha256(&k_service, b"aws4_request")
    }

    fn hmac_sha256(key: &[u8], msg: &[u8]) -> [u8; 32] {
        let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
        mac.update(msg);
        let result = mac.finalize().into_bytes();
        let mut output = [0u8; 32];
        output.copy_from_slice(&result);
        output
    }

    /// URI encode a string (RFC 3986) using the hex lookup table
    pub(crate) fn uri_encode(s: &str, encode_slash: bool) -> String {
        let mut result = String::with_capacity(s.len() + 16);
        for byte in s.bytes() {
            match byte {
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                    result.push(byte as char);
                }
                b'/' if !encode_slash => {
                    result.push('/');
                }
                _ => {
                    result.push('%');
                    result.push(HEX_UPPER[(byte >> 4) as usize] as char);
                    result.push(HEX_UPPER[(byte & 0xf) as usize] as char);
                }
            }
        }
        result
    }
}
