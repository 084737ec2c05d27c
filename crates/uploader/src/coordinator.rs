//! Session lifecycle orchestration.
//!
//! One coordinator owns one upload session at a time: starting a new upload
//! resets any previous progress and session state. All session-state
//! mutation happens on the task driving [`SessionCoordinator::upload`];
//! transports and workers only feed it events over channels.

use std::sync::Arc;

use modeldock_protocol::{
    FileUploadProgress, FormatValidation, Model, ModelCapabilities, ModelMetadata, UploadSession,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cancel::CancellationController;
use crate::commit::CommitClient;
use crate::config::{StrategyKind, UploaderConfig};
use crate::error::UploadError;
use crate::files::UploadFile;
use crate::progress::ProgressAggregator;
use crate::strategy;
use crate::transport::{MultipartRequest, UploadTransport};

/// Lifecycle of the session owned by a coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    New,
    Uploading,
    /// Files are in temporary storage; the session can be committed.
    Uploaded,
    /// Terminal: the session became a persisted model.
    Committed,
    /// Terminal: the transfer was aborted; the session is discarded.
    Cancelled,
    /// Terminal: the transfer failed, possibly partially.
    Failed,
}

/// Events published while an upload runs. Subscribe via
/// [`SessionCoordinator::take_events`].
#[derive(Debug, Clone)]
pub enum UploadEvent {
    /// Snapshot of every file's progress plus the overall percentage.
    Progress {
        files: Vec<FileUploadProgress>,
        overall: u8,
    },
    Completed {
        session: UploadSession,
    },
    Failed {
        error: String,
    },
    Cancelled,
}

/// Orchestrates strategy selection and owns the session lifecycle.
pub struct SessionCoordinator {
    transport: Arc<dyn UploadTransport>,
    config: UploaderConfig,
    cancel: CancellationController,
    commit_client: CommitClient,
    aggregator: ProgressAggregator,
    state: SessionState,
    session: Option<UploadSession>,
    events_tx: mpsc::Sender<UploadEvent>,
    events_rx: Option<mpsc::Receiver<UploadEvent>>,
}

impl SessionCoordinator {
    pub fn new(transport: Arc<dyn UploadTransport>, config: UploaderConfig) -> Self {
        let (events_tx, events_rx) = mpsc::channel(256);
        Self {
            commit_client: CommitClient::new(Arc::clone(&transport)),
            transport,
            config,
            cancel: CancellationController::new(),
            aggregator: ProgressAggregator::empty(),
            state: SessionState::New,
            session: None,
            events_tx,
            events_rx: Some(events_rx),
        }
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<UploadEvent>> {
        self.events_rx.take()
    }

    /// Returns a handle that aborts the in-flight transfer. A no-op outside
    /// `Uploading`: every upload begins a fresh token generation.
    pub fn cancel_handle(&self) -> CancellationController {
        self.cancel.clone()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The uploaded-but-not-committed session, if any.
    pub fn session(&self) -> Option<&UploadSession> {
        self.session.as_ref()
    }

    /// Current per-file progress snapshot.
    pub fn progress(&self) -> Vec<FileUploadProgress> {
        self.aggregator.snapshot()
    }

    /// Overall percentage in [0, 100].
    pub fn overall_progress(&self) -> u8 {
        self.aggregator.overall()
    }

    /// Discards the session and all progress state.
    pub fn clear_session(&mut self) {
        self.session = None;
        self.aggregator = ProgressAggregator::empty();
        self.state = SessionState::New;
    }

    /// Uploads `files` for `provider_id` and returns the backend session.
    ///
    /// `main_filename` must case-insensitively match exactly one file, and
    /// `validation` is the external format validator's verdict for this
    /// selection; both are checked before any network call. Any previous
    /// session and progress state is discarded when the upload starts.
    pub async fn upload(
        &mut self,
        provider_id: Uuid,
        files: Vec<UploadFile>,
        main_filename: &str,
        validation: &FormatValidation,
    ) -> Result<UploadSession, UploadError> {
        if files.is_empty() {
            return Err(UploadError::Validation("no files selected".into()));
        }
        if !validation.valid {
            let message = if validation.errors.is_empty() {
                "file format validation failed".to_string()
            } else {
                validation.errors.join("; ")
            };
            return Err(UploadError::Validation(message));
        }
        let main_matches = files
            .iter()
            .filter(|f| f.filename.eq_ignore_ascii_case(main_filename))
            .count();
        match main_matches {
            1 => {}
            0 => return Err(UploadError::Validation("main file not found".into())),
            n => {
                return Err(UploadError::Validation(format!(
                    "main filename matches {n} files"
                )));
            }
        }
        for warning in &validation.warnings {
            debug!(warning = %warning, "format validator warning");
        }

        // Reset for the new attempt; anything in flight from a previous
        // generation can no longer reach this state.
        self.session = None;
        let sizes: Vec<(String, u64)> = files
            .iter()
            .map(|f| (f.filename.clone(), f.size))
            .collect();
        self.aggregator = ProgressAggregator::new(&sizes);
        let token = self.cancel.begin();
        self.state = SessionState::Uploading;

        info!(
            provider_id = %provider_id,
            files = files.len(),
            total_bytes = self.aggregator.total_size(),
            strategy = ?self.config.strategy,
            "starting upload"
        );

        let result = match self.config.strategy {
            StrategyKind::MonolithicMultipart => {
                let req = MultipartRequest {
                    provider_id,
                    main_filename: main_filename.to_string(),
                    files,
                };
                strategy::run_monolithic(
                    self.transport.as_ref(),
                    req,
                    self.config.timeout,
                    token,
                    &mut self.aggregator,
                    &self.events_tx,
                )
                .await
            }
            StrategyKind::ConcurrentPerFile => {
                let session_id = Uuid::new_v4();
                strategy::run_concurrent(
                    Arc::clone(&self.transport),
                    session_id,
                    provider_id,
                    main_filename.to_string(),
                    files,
                    self.config.concurrency,
                    self.config.fail_fast,
                    token,
                    &mut self.aggregator,
                    &self.events_tx,
                )
                .await
                .map(|processed| {
                    let total_size_bytes = processed.iter().map(|f| f.size_bytes).sum();
                    UploadSession {
                        session_id,
                        provider_id,
                        main_filename: main_filename.to_string(),
                        total_size_bytes,
                        files: processed,
                    }
                })
            }
        };

        match result {
            Ok(session) => {
                if let Err(e) = session.verify() {
                    let message = format!("backend returned inconsistent session: {e}");
                    warn!(session_id = %session.session_id, error = %e, "rejecting session");
                    self.state = SessionState::Failed;
                    let _ = self.events_tx.try_send(UploadEvent::Failed {
                        error: message.clone(),
                    });
                    return Err(UploadError::Transfer(message));
                }

                self.aggregator.complete_all();
                self.state = SessionState::Uploaded;
                self.session = Some(session.clone());
                let _ = self.events_tx.try_send(UploadEvent::Progress {
                    files: self.aggregator.snapshot(),
                    overall: self.aggregator.overall(),
                });
                let _ = self.events_tx.try_send(UploadEvent::Completed {
                    session: session.clone(),
                });
                info!(
                    session_id = %session.session_id,
                    files = session.files.len(),
                    total_bytes = session.total_size_bytes,
                    "upload complete"
                );
                Ok(session)
            }
            Err(UploadError::Cancelled) => {
                info!("upload cancelled");
                self.aggregator.mark_cancelled();
                self.state = SessionState::Cancelled;
                let _ = self.events_tx.try_send(UploadEvent::Progress {
                    files: self.aggregator.snapshot(),
                    overall: self.aggregator.overall(),
                });
                let _ = self.events_tx.try_send(UploadEvent::Cancelled);
                Err(UploadError::Cancelled)
            }
            Err(e) => {
                warn!(error = %e, "upload failed");
                self.state = SessionState::Failed;
                let _ = self.events_tx.try_send(UploadEvent::Failed {
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Commits the uploaded session, keeping only `selected_files`.
    ///
    /// Valid only in state `Uploaded`; a cancelled or failed session can
    /// never be committed. On success the session is discarded.
    pub async fn commit(
        &mut self,
        metadata: &ModelMetadata,
        capabilities: ModelCapabilities,
        selected_files: &[Uuid],
    ) -> Result<Model, UploadError> {
        if self.state != SessionState::Uploaded {
            return Err(UploadError::Commit(format!(
                "no uploaded session to commit (state: {:?})",
                self.state
            )));
        }
        let Some(session) = self.session.as_ref() else {
            return Err(UploadError::Commit("no uploaded session to commit".into()));
        };

        let model = self
            .commit_client
            .commit(session, metadata, capabilities, selected_files)
            .await?;

        self.state = SessionState::Committed;
        self.session = None;
        Ok(model)
    }
}
