//! Provider backend API client.
//!
//! Async HTTP client using `reqwest` with Bearer token authentication.
//! File bodies are streamed from disk through a byte-counting adapter so the
//! pipeline sees progress while bytes are actually leaving the machine.

use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::multipart;
use tokio::sync::mpsc;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use modeldock_protocol::{CommitRequest, Model, ProcessedFile, UploadSession};
use modeldock_uploader::{
    BoxFuture, FileRequest, MultipartRequest, TransferEvent, UploadError, UploadFile,
    UploadTransport,
};

use crate::stream::{ProgressStream, ProgressTarget};

/// HTTP implementation of the upload transport.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Creates a client for `base_url`, attaching `api_token` as a Bearer
    /// header on every request when given.
    pub fn new(base_url: &str, api_token: Option<&str>) -> Result<Self, UploadError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = api_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| UploadError::Validation("invalid API token".into()))?;
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| UploadError::Transfer(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Opens `file` and wraps it in a counted streaming multipart part.
    async fn file_part(
        file: &UploadFile,
        counter: Arc<AtomicU64>,
        target: ProgressTarget,
        events: mpsc::UnboundedSender<TransferEvent>,
    ) -> Result<multipart::Part, UploadError> {
        let handle = tokio::fs::File::open(&file.path).await?;
        let stream = ProgressStream::new(ReaderStream::new(handle), counter, target, events);
        let part = multipart::Part::stream_with_length(reqwest::Body::wrap_stream(stream), file.size)
            .file_name(file.filename.clone())
            .mime_str("application/octet-stream")
            .map_err(|e| UploadError::Transfer(e.to_string()))?;
        Ok(part)
    }
}

/// Converts a non-2xx response into a server error, pulling the message from
/// the body's `error` field when the backend sent one.
async fn server_error(resp: reqwest::Response) -> UploadError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    UploadError::Server {
        status: status.as_u16(),
        message: extract_error_message(&body, status),
    }
}

fn extract_error_message(body: &str, status: StatusCode) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body)
        && let Some(message) = value.get("error").and_then(|e| e.as_str())
    {
        return message.to_string();
    }
    status
        .canonical_reason()
        .unwrap_or("request failed")
        .to_string()
}

impl UploadTransport for ApiClient {
    fn upload_multipart(
        &self,
        req: MultipartRequest,
        progress: mpsc::UnboundedSender<TransferEvent>,
        cancel: CancellationToken,
    ) -> BoxFuture<'_, Result<UploadSession, UploadError>> {
        Box::pin(async move {
            // One counter across all parts; aggregate events carry the total
            // bytes streamed for the whole body, in part order.
            let counter = Arc::new(AtomicU64::new(0));
            let mut form = multipart::Form::new()
                .text("provider_id", req.provider_id.to_string())
                .text("main_filename", req.main_filename.clone());
            for file in &req.files {
                let part = Self::file_part(
                    file,
                    Arc::clone(&counter),
                    ProgressTarget::Aggregate,
                    progress.clone(),
                )
                .await?;
                form = form.part("files", part);
            }

            let url = self.endpoint("upload-multipart");
            debug!(%url, files = req.files.len(), "sending multipart upload");

            let send = self.http.post(&url).multipart(form).send();
            let response = tokio::select! {
                result = send => result.map_err(|e| UploadError::Transfer(e.to_string()))?,
                _ = cancel.cancelled() => return Err(UploadError::Cancelled),
            };

            if !response.status().is_success() {
                return Err(server_error(response).await);
            }
            let session: UploadSession = response
                .json()
                .await
                .map_err(|e| UploadError::Transfer(e.to_string()))?;
            Ok(session)
        })
    }

    fn upload_file(
        &self,
        req: FileRequest,
        progress: mpsc::UnboundedSender<TransferEvent>,
        cancel: CancellationToken,
    ) -> BoxFuture<'_, Result<ProcessedFile, UploadError>> {
        Box::pin(async move {
            let part = Self::file_part(
                &req.file,
                Arc::new(AtomicU64::new(0)),
                ProgressTarget::File {
                    file_index: req.file_index,
                },
                progress,
            )
            .await?;
            let form = multipart::Form::new()
                .text("session_id", req.session_id.to_string())
                .text("provider_id", req.provider_id.to_string())
                .text("main_filename", req.main_filename.clone())
                .part("file", part);

            let url = self.endpoint("upload-file");
            debug!(%url, filename = %req.file.filename, "sending file upload");

            let send = self.http.post(&url).multipart(form).send();
            let response = tokio::select! {
                result = send => result.map_err(|e| UploadError::Transfer(e.to_string()))?,
                _ = cancel.cancelled() => return Err(UploadError::Cancelled),
            };

            if !response.status().is_success() {
                return Err(server_error(response).await);
            }
            let file: ProcessedFile = response
                .json()
                .await
                .map_err(|e| UploadError::Transfer(e.to_string()))?;
            Ok(file)
        })
    }

    fn commit(&self, req: CommitRequest) -> BoxFuture<'_, Result<Model, UploadError>> {
        Box::pin(async move {
            let url = self.endpoint("commit-upload");
            debug!(%url, session_id = %req.session_id, "committing session");

            let response = self
                .http
                .post(&url)
                .json(&req)
                .send()
                .await
                .map_err(|e| UploadError::Transfer(e.to_string()))?;

            if !response.status().is_success() {
                return Err(server_error(response).await);
            }
            let model: Model = response
                .json()
                .await
                .map_err(|e| UploadError::Transfer(e.to_string()))?;
            Ok(model)
        })
    }
}
