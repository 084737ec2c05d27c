//! Upload pipeline for local model artifacts.
//!
//! A set of files that together constitute one model (weights, tokenizer,
//! config, vocab, optional shards) is transferred to the provider backend in
//! two phases: [`SessionCoordinator::upload`] moves the bytes into temporary
//! storage and returns an [`UploadSession`](modeldock_protocol::UploadSession),
//! then [`SessionCoordinator::commit`] promotes a caller-chosen subset of the
//! session's files into a persisted model record. Per-file byte progress is
//! tracked throughout, and the transfer can be cancelled cooperatively at any
//! point.

pub mod cancel;
pub mod commit;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod files;
pub mod progress;
mod strategy;
pub mod transport;

pub use cancel::CancellationController;
pub use commit::CommitClient;
pub use config::{StrategyKind, UploaderConfig};
pub use coordinator::{SessionCoordinator, SessionState, UploadEvent};
pub use error::UploadError;
pub use files::{UploadFile, scan_model_dir};
pub use progress::ProgressAggregator;
pub use transport::{BoxFuture, FileRequest, MultipartRequest, TransferEvent, UploadTransport};
