//! Transfer strategy execution.
//!
//! Both strategies funnel every progress event and worker completion into
//! the caller's task over mpsc channels, so the aggregate counters have a
//! single writer and simultaneously completing transfers cannot lose
//! updates.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use modeldock_protocol::{ProcessedFile, UploadSession};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::coordinator::UploadEvent;
use crate::error::UploadError;
use crate::files::UploadFile;
use crate::progress::ProgressAggregator;
use crate::transport::{FileRequest, MultipartRequest, TransferEvent, UploadTransport};

/// Emits a progress snapshot without ever blocking the transfer; a UI that
/// falls behind loses intermediate snapshots, not correctness.
fn emit_progress(events_tx: &mpsc::Sender<UploadEvent>, aggregator: &ProgressAggregator) {
    let _ = events_tx.try_send(UploadEvent::Progress {
        files: aggregator.snapshot(),
        overall: aggregator.overall(),
    });
}

/// Runs a monolithic multipart transfer, applying aggregate byte events to
/// the aggregator as they arrive. Hitting `timeout` cancels the transfer
/// and surfaces a transfer error.
pub(crate) async fn run_monolithic(
    transport: &dyn UploadTransport,
    req: MultipartRequest,
    timeout: Duration,
    cancel: CancellationToken,
    aggregator: &mut ProgressAggregator,
    events_tx: &mpsc::Sender<UploadEvent>,
) -> Result<UploadSession, UploadError> {
    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
    let mut transfer = transport.upload_multipart(req, progress_tx, cancel.clone());

    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    let mut progress_done = false;
    loop {
        tokio::select! {
            result = &mut transfer => {
                // Apply anything still queued before reporting the outcome.
                while let Ok(ev) = progress_rx.try_recv() {
                    if let TransferEvent::Aggregate { bytes_uploaded } = ev {
                        aggregator.apply_aggregate(bytes_uploaded);
                    }
                }
                emit_progress(events_tx, aggregator);
                return result;
            }
            ev = progress_rx.recv(), if !progress_done => {
                match ev {
                    Some(TransferEvent::Aggregate { bytes_uploaded }) => {
                        aggregator.apply_aggregate(bytes_uploaded);
                        emit_progress(events_tx, aggregator);
                    }
                    Some(TransferEvent::File { .. }) => {
                        // Monolithic transports have no per-file signal.
                    }
                    None => progress_done = true,
                }
            }
            _ = &mut deadline => {
                warn!(timeout_secs = timeout.as_secs(), "monolithic upload timed out");
                cancel.cancel();
                return Err(UploadError::Transfer(format!(
                    "upload timed out after {}s",
                    timeout.as_secs()
                )));
            }
        }
    }
}

struct WorkerOutcome {
    file_index: usize,
    result: Result<ProcessedFile, UploadError>,
}

/// Runs per-file transfers through a bounded worker pool.
///
/// Each worker dequeues the next pending file until none remain or
/// cancellation is observed. One file's failure marks only that file and
/// the rest continue, unless `fail_fast` is set. Returns the processed
/// files in selection order.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn run_concurrent(
    transport: Arc<dyn UploadTransport>,
    session_id: Uuid,
    provider_id: Uuid,
    main_filename: String,
    files: Vec<UploadFile>,
    concurrency: usize,
    fail_fast: bool,
    cancel: CancellationToken,
    aggregator: &mut ProgressAggregator,
    events_tx: &mpsc::Sender<UploadEvent>,
) -> Result<Vec<ProcessedFile>, UploadError> {
    let file_count = files.len();
    let queue: Arc<Mutex<VecDeque<usize>>> = Arc::new(Mutex::new((0..file_count).collect()));
    let files = Arc::new(files);

    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
    // Capacity covers one outcome per file, so workers never block on send.
    let (outcome_tx, mut outcome_rx) = mpsc::channel::<WorkerOutcome>(file_count.max(1));

    let workers = concurrency.clamp(1, file_count.max(1));
    debug!(files = file_count, workers, "starting per-file uploads");

    let mut handles = Vec::with_capacity(workers);
    for _ in 0..workers {
        let queue = Arc::clone(&queue);
        let files = Arc::clone(&files);
        let transport = Arc::clone(&transport);
        let progress_tx = progress_tx.clone();
        let outcome_tx = outcome_tx.clone();
        let cancel = cancel.clone();
        let main_filename = main_filename.clone();

        handles.push(tokio::spawn(async move {
            loop {
                if cancel.is_cancelled() {
                    break;
                }
                let next = queue.lock().unwrap().pop_front();
                let Some(file_index) = next else { break };

                let req = FileRequest {
                    session_id,
                    provider_id,
                    main_filename: main_filename.clone(),
                    file_index,
                    file: files[file_index].clone(),
                };
                let result = transport
                    .upload_file(req, progress_tx.clone(), cancel.clone())
                    .await;
                if outcome_tx
                    .send(WorkerOutcome { file_index, result })
                    .await
                    .is_err()
                {
                    break;
                }
            }
        }));
    }
    drop(progress_tx);
    drop(outcome_tx);

    let mut processed: Vec<Option<ProcessedFile>> = (0..file_count).map(|_| None).collect();
    let mut failures: usize = 0;
    let mut progress_done = false;
    let mut outcomes_done = false;

    while !(progress_done && outcomes_done) {
        tokio::select! {
            ev = progress_rx.recv(), if !progress_done => {
                match ev {
                    Some(TransferEvent::File { file_index, bytes_uploaded }) => {
                        aggregator.apply_file_bytes(file_index, bytes_uploaded);
                        emit_progress(events_tx, aggregator);
                    }
                    Some(TransferEvent::Aggregate { .. }) => {
                        // Per-file transports have native signals; nothing to
                        // attribute.
                    }
                    None => progress_done = true,
                }
            }
            outcome = outcome_rx.recv(), if !outcomes_done => {
                match outcome {
                    Some(WorkerOutcome { file_index, result }) => match result {
                        Ok(file) => {
                            aggregator.mark_file_completed(file_index);
                            processed[file_index] = Some(file);
                            emit_progress(events_tx, aggregator);
                        }
                        Err(UploadError::Cancelled) => {
                            // The coordinator marks unfinished files once the
                            // whole transfer winds down.
                        }
                        Err(e) => {
                            let message = e.to_string();
                            warn!(file_index, error = %message, "file upload failed");
                            failures += 1;
                            aggregator.mark_file_error(file_index, &message);
                            emit_progress(events_tx, aggregator);
                            if fail_fast {
                                cancel.cancel();
                            }
                        }
                    },
                    None => outcomes_done = true,
                }
            }
        }
    }

    for handle in handles {
        let _ = handle.await;
    }

    if cancel.is_cancelled() && (fail_fast && failures > 0) {
        // Fail-fast abort: report the underlying failure, not a user cancel.
        return Err(UploadError::Transfer(format!(
            "{failures} file(s) failed to upload"
        )));
    }
    if cancel.is_cancelled() {
        return Err(UploadError::Cancelled);
    }
    if failures > 0 {
        return Err(UploadError::Transfer(format!(
            "{failures} file(s) failed to upload"
        )));
    }

    let completed: Vec<ProcessedFile> = processed.into_iter().flatten().collect();
    if completed.len() != file_count {
        return Err(UploadError::Transfer("missing upload results".into()));
    }
    Ok(completed)
}
