//! XML bodies of the multipart sub-protocol and S3 error documents
//!
//! Parsing uses byte-slice tag matching on a streaming quick-xml reader;
//! no DOM is built.

use crate::s3::error::{Result, S3Error};
use crate::s3::types::{
    CompleteMultipartUploadResponse, InitiateMultipartUploadResponse, PartResult,
};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::fmt::Write as FmtWrite;

/// Fields of an S3 `<Error>` document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorDocument {
    pub code: String,
    pub message: String,
    pub key: Option<String>,
    pub resource: Option<String>,
    pub request_id: Option<String>,
}

/// Outcome of CompleteMultipartUpload: S3 may answer 200 OK with an `<Error>` body
#[derive(Debug, Clone)]
pub enum CompleteOutcome {
    Completed(CompleteMultipartUploadResponse),
    Failed(ErrorDocument),
}

fn reader(xml_data: &[u8]) -> Reader<&[u8]> {
    let mut reader = Reader::from_reader(xml_data);
    reader.config_mut().trim_text_start = true;
    reader.config_mut().trim_text_end = true;
    reader
}

/// Parse an `<Error>` document. Returns `None` when the body is empty,
/// malformed, or has a different root element.
pub fn parse_error_document(xml_data: &[u8]) -> Option<ErrorDocument> {
    let mut reader = reader(xml_data);
    let mut doc = ErrorDocument::default();
    let mut root_seen = false;
    let mut current_text = String::with_capacity(128);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if !root_seen {
                    if e.local_name().as_ref() != b"Error" {
                        return None;
                    }
                    root_seen = true;
                }
                current_text.clear();
            }
            Ok(Event::Text(e)) => {
                current_text.clear();
                current_text.push_str(&e.unescape().ok()?);
            }
            Ok(Event::End(e)) => {
                match e.local_name().as_ref() {
                    b"Code" => doc.code = std::mem::take(&mut current_text),
                    b"Message" => doc.message = std::mem::take(&mut current_text),
                    b"Key" => doc.key = Some(std::mem::take(&mut current_text)),
                    b"Resource" => doc.resource = Some(std::mem::take(&mut current_text)),
                    b"RequestId" => doc.request_id = Some(std::mem::take(&mut current_text)),
                    _ => {}
                }
                current_text.clear();
            }
            Ok(Event::Eof) => break,
            Err(_) => return None,
            _ => {}
        }
    }

    if !root_seen || doc.code.is_empty() {
        return None;
    }
    Some(doc)
}

/// Parse the InitiateMultipartUploadResult body
pub fn parse_initiate_response(xml_data: &[u8]) -> Result<InitiateMultipartUploadResponse> {
    let mut reader = reader(xml_data);
    let mut bucket = String::new();
    let mut key = String::new();
    let mut upload_id = String::new();
    let mut current_text = String::with_capacity(256);

    loop {
        match reader.read_event() {
            Ok(Event::Text(e)) => {
                current_text.clear();
                current_text.push_str(&e.unescape()?);
            }
            Ok(Event::End(e)) => {
                match e.local_name().as_ref() {
                    b"Bucket" => bucket = std::mem::take(&mut current_text),
                    b"Key" => key = std::mem::take(&mut current_text),
                    b"UploadId" => upload_id = std::mem::take(&mut current_text),
                    _ => {}
                }
                current_text.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
    }

    if upload_id.is_empty() {
        return Err(S3Error::Protocol("Missing UploadId in response".to_string()));
    }
    Ok(InitiateMultipartUploadResponse::new(bucket, key, upload_id))
}

/// Parse the CompleteMultipartUpload response body
pub fn parse_complete_response(xml_data: &[u8]) -> Result<CompleteOutcome> {
    if let Some(doc) = parse_error_document(xml_data) {
        return Ok(CompleteOutcome::Failed(doc));
    }

    let mut reader = reader(xml_data);
    let mut location = None;
    let mut bucket = String::new();
    let mut key = String::new();
    let mut etag = String::new();
    let mut current_text = String::with_capacity(256);

    loop {
        match reader.read_event() {
            Ok(Event::Text(e)) => {
                current_text.clear();
                current_text.push_str(&e.unescape()?);
            }
            Ok(Event::End(e)) => {
                match e.local_name().as_ref() {
                    b"Location" => location = Some(std::mem::take(&mut current_text)),
                    b"Bucket" => bucket = std::mem::take(&mut current_text),
                    b"Key" => key = std::mem::take(&mut current_text),
                    b"ETag" => etag = trim_etag(&current_text).to_string(),
                    _ => {}
                }
                current_text.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
    }

    if etag.is_empty() {
        return Err(S3Error::Protocol(
            "Missing ETag in CompleteMultipartUpload response".to_string(),
        ));
    }

    let mut response = CompleteMultipartUploadResponse::new(bucket, key, etag);
    response.location = location;
    Ok(CompleteOutcome::Completed(response))
}

/// Build the CompleteMultipartUpload manifest. `parts` must already be in
/// ascending part-number order.
pub fn complete_multipart_body(parts: &[PartResult]) -> String {
    let mut xml = String::with_capacity(parts.len() * 100 + 100);
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>");
    xml.push_str("<CompleteMultipartUpload>");
    for part in parts {
        xml.push_str("<Part><PartNumber>");
        let _ = write!(xml, "{}", part.part_number);
        xml.push_str("</PartNumber><ETag>\"");
        xml.push_str(trim_etag(&part.etag));
        xml.push_str("\"</ETag></Part>");
    }
    xml.push_str("</CompleteMultipartUpload>");
    xml
}

/// Strip the surrounding quotes servers put on ETag values
pub fn trim_etag(etag: &str) -> &str {
    etag.trim().trim_matches('"')
}
