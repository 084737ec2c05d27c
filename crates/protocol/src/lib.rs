//! Shared data model for the modeldock upload and commit API.
//!
//! Plain serde types exchanged with the provider backend plus the
//! client-local progress types consumed by UI layers. No I/O lives here.

pub mod classify;
pub mod model;
pub mod types;

pub use classify::{ModelFileType, content_issues};
pub use model::{CommitRequest, Model, ModelCapabilities, ModelMetadata, ModelSource};
pub use types::{
    FileFormat, FileStatus, FileUploadProgress, FormatValidation, ProcessedFile, UploadSession,
};
