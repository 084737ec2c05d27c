//! Transport abstraction between the upload pipeline and the REST backend.
//!
//! The coordinator and strategies are written against [`UploadTransport`];
//! the HTTP implementation lives in its own crate and tests use mocks.

use std::future::Future;
use std::pin::Pin;

use modeldock_protocol::{CommitRequest, Model, ProcessedFile, UploadSession};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::UploadError;
use crate::files::UploadFile;

/// Boxed future used by the transport trait (object safety without an
/// async-trait dependency).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Typed progress event emitted by a transport while bytes move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEvent {
    /// Aggregate "bytes uploaded so far" for the whole multipart body.
    Aggregate { bytes_uploaded: u64 },
    /// Native byte count for one file of a per-file transfer.
    File { file_index: usize, bytes_uploaded: u64 },
}

/// Context for one monolithic multipart upload.
#[derive(Debug, Clone)]
pub struct MultipartRequest {
    pub provider_id: Uuid,
    pub main_filename: String,
    /// Files in selection order; part order must match so byte-offset
    /// attribution lines up.
    pub files: Vec<UploadFile>,
}

/// Context for one per-file upload request.
#[derive(Debug, Clone)]
pub struct FileRequest {
    /// Client-generated session the file belongs to.
    pub session_id: Uuid,
    pub provider_id: Uuid,
    pub main_filename: String,
    pub file_index: usize,
    pub file: UploadFile,
}

/// Abstract connection to the provider backend.
///
/// Implementations observe `cancel` cooperatively at their I/O suspension
/// points and report progress over the channel; they never retry on their
/// own.
pub trait UploadTransport: Send + Sync {
    /// `POST /upload-multipart`: all files in one request. Returns the
    /// backend-issued session.
    fn upload_multipart(
        &self,
        req: MultipartRequest,
        progress: mpsc::UnboundedSender<TransferEvent>,
        cancel: CancellationToken,
    ) -> BoxFuture<'_, Result<UploadSession, UploadError>>;

    /// `POST /upload-file`: one file. Returns the backend-issued temp file
    /// record.
    fn upload_file(
        &self,
        req: FileRequest,
        progress: mpsc::UnboundedSender<TransferEvent>,
        cancel: CancellationToken,
    ) -> BoxFuture<'_, Result<ProcessedFile, UploadError>>;

    /// `POST /commit-upload`: promotes selected session files into a
    /// persisted model.
    fn commit(&self, req: CommitRequest) -> BoxFuture<'_, Result<Model, UploadError>>;
}
