//! Object uploads: single PUT or multipart, chosen by lookahead
//!
//! `put_object` reads the first part and reads one more item from the source. If
//! nothing follows, the part goes out as one PUT. Otherwise a multipart
//! upload is initiated and the parts stream through a bounded window of
//! concurrent uploads. A `MultipartSession` guard makes sure every
//! initiated upload is completed or aborted, also when the caller drops the
//! future halfway.

use crate::s3::chunker::{Chunk, Chunker, UploadSource};
use crate::s3::client::{etag_header, header_string, read_body, S3Client};
use crate::s3::error::{Result, S3Error, ServerError};
use crate::s3::types::{
    CompleteMultipartUploadResponse, InitiateMultipartUploadResponse, PartResult,
    PutObjectOptions, PutObjectResponse,
};
use crate::s3::xml::{
    complete_multipart_body, parse_complete_response, parse_initiate_response, CompleteOutcome,
};
use bytes::Bytes;
use futures::stream::{self, TryStreamExt};
use hyper::Method;
use std::collections::BTreeMap;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

impl S3Client {
    /// Upload an object from a buffer or a stream of unknown length.
    ///
    /// Sources that fit in one part are sent with a single PUT, larger ones
    /// as a multipart upload. An empty source creates an empty object.
    pub async fn put_object(
        &self,
        key: &str,
        source: impl Into<UploadSource>,
        options: PutObjectOptions,
    ) -> Result<PutObjectResponse> {
        // Fail on a bad key or part size before touching the source
        self.object_url(key)?;
        let part_size = options.resolved_part_size()?;

        let mut chunker = Chunker::new(source.into(), part_size);
        let first = chunker.next_chunk().await?.unwrap_or(Chunk {
            part_number: 1,
            data: Bytes::new(),
        });

        if !chunker.has_more().await? {
            return self.put_single(key, first.data, &options).await;
        }
        self.put_multipart(key, first, chunker, &options).await
    }

    /// Upload `data` with one signed PUT and relay the server's ETag
    pub async fn put_single(
        &self,
        key: &str,
        data: Bytes,
        options: &PutObjectOptions,
    ) -> Result<PutObjectResponse> {
        let url = self.object_url(key)?;
        let size = data.len();

        let mut headers = options.metadata_headers();
        headers
            .entry("content-type".to_string())
            .or_insert_with(|| DEFAULT_CONTENT_TYPE.to_string());

        let response = self.send_request(Method::PUT, &url, headers, data).await?;
        let response = self.check_response(response, Some(key)).await?;
        let etag = etag_header(response.headers())?;
        let version_id = header_string(response.headers(), "x-amz-version-id");
        read_body(response.into_body()).await?;

        tracing::info!(key, size, etag = %etag, "object uploaded");
        Ok(PutObjectResponse { etag, version_id })
    }

    async fn put_multipart(
        &self,
        key: &str,
        first: Chunk,
        chunker: Chunker,
        options: &PutObjectOptions,
    ) -> Result<PutObjectResponse> {
        let part_size = chunker.part_size();
        let session = MultipartSession::initiate(self, key, options).await?;
        tracing::info!(
            key,
            upload_id = %session.upload_id,
            part_size,
            concurrency = self.config().part_concurrency,
            "multipart upload started"
        );

        let uploaded = self.upload_parts(&session, first, chunker).await;
        let parts = match uploaded {
            Ok(parts) => parts,
            Err(e) => return Err(session.abort(e).await),
        };

        let part_count = parts.len();
        let size: usize = parts.iter().map(|p| p.size).sum();
        let completed = session.complete(&parts).await?;

        tracing::info!(
            key,
            parts = part_count,
            size,
            etag = %completed.etag,
            "multipart upload completed"
        );
        Ok(PutObjectResponse {
            etag: completed.etag,
            version_id: completed.version_id,
        })
    }

    /// Upload every remaining part with at most `part_concurrency` in flight.
    ///
    /// The chunker is only polled when a slot frees up, so at most one part
    /// per slot is held in memory. The first failure drops the stream, which
    /// cancels the parts still in flight. Results come back in part order.
    async fn upload_parts(
        &self,
        session: &MultipartSession,
        first: Chunk,
        chunker: Chunker,
    ) -> Result<Vec<PartResult>> {
        let chunks = stream::try_unfold((Some(first), chunker), |(first, mut chunker)| async move {
            let next = match first {
                Some(chunk) => Some(chunk),
                None => chunker.next_chunk().await?,
            };
            Ok::<_, S3Error>(next.map(|chunk| (chunk, (None, chunker))))
        });

        let uploads = chunks
            .map_ok(|chunk| {
                self.upload_part(&session.key, &session.upload_id, chunk.part_number, chunk.data)
            })
            .try_buffer_unordered(self.config().part_concurrency);
        let mut uploads = std::pin::pin!(uploads);

        // Single writer: only this loop touches the part map
        let mut completed: BTreeMap<u32, PartResult> = BTreeMap::new();
        while let Some(part) = uploads.try_next().await? {
            completed.insert(part.part_number, part);
        }
        Ok(completed.into_values().collect())
    }

    /// Initiate a multipart upload (CreateMultipartUpload).
    ///
    /// Metadata from `options` is attached here; parts carry none.
    pub async fn initiate_multipart_upload(
        &self,
        key: &str,
        options: &PutObjectOptions,
    ) -> Result<InitiateMultipartUploadResponse> {
        let url = format!("{}?uploads", self.object_url(key)?);

        let mut headers = options.metadata_headers();
        headers
            .entry("content-type".to_string())
            .or_insert_with(|| DEFAULT_CONTENT_TYPE.to_string());

        let response = self
            .send_request(Method::POST, &url, headers, Bytes::new())
            .await?;
        let response = self.check_response(response, Some(key)).await?;
        let body = read_body(response.into_body()).await?;
        parse_initiate_response(&body)
    }

    /// Upload one part (UploadPart). Part numbers are 1-based.
    pub async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: u32,
        data: Bytes,
    ) -> Result<PartResult> {
        let url = self.upload_url(key, upload_id, Some(part_number))?;
        let size = data.len();

        let response = self
            .send_request(Method::PUT, &url, BTreeMap::new(), data)
            .await?;
        let response = self.check_response(response, Some(key)).await?;
        let etag = etag_header(response.headers())?;
        // Drain body to return connection to pool
        read_body(response.into_body()).await?;

        tracing::debug!(key, upload_id, part_number, size, etag = %etag, "part uploaded");
        Ok(PartResult::new(part_number, etag, size))
    }

    /// Complete a multipart upload (CompleteMultipartUpload).
    ///
    /// `parts` must be sorted by part number. A `200 OK` carrying an
    /// `<Error>` document is reported as a [`ServerError`].
    pub async fn complete_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[PartResult],
    ) -> Result<CompleteMultipartUploadResponse> {
        let url = self.upload_url(key, upload_id, None)?;
        let xml = complete_multipart_body(parts);

        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), "application/xml".to_string());

        let response = self
            .send_request(Method::POST, &url, headers, Bytes::from(xml))
            .await?;
        let response = self.check_response(response, Some(key)).await?;
        let (head, body) = response.into_parts();
        let body = read_body(body).await?;

        match parse_complete_response(&body)? {
            CompleteOutcome::Completed(mut completed) => {
                completed.version_id = header_string(&head.headers, "x-amz-version-id");
                Ok(completed)
            }
            CompleteOutcome::Failed(_) => Err(S3Error::Server(ServerError::from_response(
                head.status,
                &head.headers,
                &body,
                self.error_context(Some(key)),
            ))),
        }
    }

    /// Abort a multipart upload (AbortMultipartUpload); the server discards its parts
    pub async fn abort_multipart_upload(&self, key: &str, upload_id: &str) -> Result<()> {
        let url = self.upload_url(key, upload_id, None)?;
        let response = self
            .send_request(Method::DELETE, &url, BTreeMap::new(), Bytes::new())
            .await?;
        let response = self.check_response(response, Some(key)).await?;
        read_body(response.into_body()).await?;
        tracing::debug!(key, upload_id, "multipart upload aborted");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Active,
    /// Abort request sent, response not yet in
    Aborting,
    Completed,
    Aborted,
}

/// An initiated multipart upload that must end in complete or abort.
///
/// Consuming `complete`/`abort` settle it explicitly. Dropping a session that
/// never sent its abort spawns a best-effort abort on the current runtime, so
/// each upload sees at most one abort request.
struct MultipartSession {
    client: S3Client,
    key: String,
    upload_id: String,
    state: SessionState,
}

impl MultipartSession {
    async fn initiate(client: &S3Client, key: &str, options: &PutObjectOptions) -> Result<Self> {
        let initiated = client.initiate_multipart_upload(key, options).await?;
        Ok(Self {
            client: client.clone(),
            key: key.to_string(),
            upload_id: initiated.upload_id,
            state: SessionState::Active,
        })
    }

    /// Complete with `parts`; a failed completion aborts the upload
    async fn complete(mut self, parts: &[PartResult]) -> Result<CompleteMultipartUploadResponse> {
        match self
            .client
            .complete_multipart_upload(&self.key, &self.upload_id, parts)
            .await
        {
            Ok(completed) => {
                self.state = SessionState::Completed;
                Ok(completed)
            }
            Err(e) => Err(self.abort(e).await),
        }
    }

    /// Abort after `cause` and hand back the error to report. The abort's own
    /// failure is attached to `cause`, never substituted for it.
    async fn abort(mut self, cause: S3Error) -> S3Error {
        tracing::warn!(
            key = %self.key,
            upload_id = %self.upload_id,
            error = %cause,
            "multipart upload failed, aborting"
        );
        self.state = SessionState::Aborting;
        let result = self
            .client
            .abort_multipart_upload(&self.key, &self.upload_id)
            .await;
        self.state = SessionState::Aborted;

        match result {
            Ok(()) => cause,
            Err(abort) => {
                tracing::warn!(
                    key = %self.key,
                    upload_id = %self.upload_id,
                    error = %abort,
                    "abort of multipart upload failed"
                );
                S3Error::AbortFailed {
                    upload_id: self.upload_id.clone(),
                    source: Box::new(cause),
                    abort: Box::new(abort),
                }
            }
        }
    }
}

impl Drop for MultipartSession {
    fn drop(&mut self) {
        match self.state {
            SessionState::Active => {}
            SessionState::Aborting => {
                // The abort request is already out; never send a second one
                tracing::warn!(
                    key = %self.key,
                    upload_id = %self.upload_id,
                    "multipart upload dropped while its abort was in flight"
                );
                return;
            }
            SessionState::Completed | SessionState::Aborted => return,
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::warn!(
                    key = %self.key,
                    upload_id = %self.upload_id,
                    "multipart upload dropped before completion, aborting in background"
                );
                let client = self.client.clone();
                let key = std::mem::take(&mut self.key);
                let upload_id = std::mem::take(&mut self.upload_id);
                handle.spawn(async move {
                    if let Err(e) = client.abort_multipart_upload(&key, &upload_id).await {
                        tracing::warn!(key = %key, upload_id = %upload_id, error = %e, "background abort failed");
                    }
                });
            }
            Err(_) => {
                tracing::warn!(
                    key = %self.key,
                    upload_id = %self.upload_id,
                    "multipart upload dropped outside a runtime, it stays open on the server"
                );
            }
        }
    }
}
