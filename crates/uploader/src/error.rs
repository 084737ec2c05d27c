//! Upload error taxonomy.
//!
//! Every failure is surfaced to the caller as one of these variants; the
//! pipeline performs no automatic retries. A failed or cancelled session has
//! no partial-resume capability and must be re-uploaded from scratch.

/// Errors produced by the upload pipeline.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// Rejected before any network call (no files, main file absent,
    /// format validator verdict negative).
    #[error("validation error: {0}")]
    Validation(String),

    /// Network failure or timeout during transfer.
    #[error("transfer error: {0}")]
    Transfer(String),

    /// Non-2xx response; message comes from the body's `error` field when
    /// present, else the status text.
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Stale/unknown session or a selected file id absent from the session.
    #[error("commit error: {0}")]
    Commit(String),

    /// The transfer was aborted via the cancellation handle.
    #[error("cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
