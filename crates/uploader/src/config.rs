use std::time::Duration;

/// Default bound on concurrent per-file transfers.
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Default upper bound on the monolithic transfer; hitting it is treated as
/// a transport error equivalent to cancellation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// How the files of one upload are moved over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrategyKind {
    /// All files in a single multipart request. Per-file progress is
    /// reconstructed from the aggregate byte counter via offset attribution.
    /// The default: the transfer is atomic and the commit-race window is
    /// minimal.
    #[default]
    MonolithicMultipart,
    /// One request per file with native byte progress, at most
    /// [`UploaderConfig::concurrency`] in flight.
    ConcurrentPerFile,
}

/// Tuning knobs for the upload pipeline.
///
/// Strategy choice is configuration, not correctness: both strategies honor
/// the same progress and cancellation contract.
#[derive(Debug, Clone)]
pub struct UploaderConfig {
    pub strategy: StrategyKind,
    /// Worker pool size for [`StrategyKind::ConcurrentPerFile`].
    pub concurrency: usize,
    /// Upper bound on the monolithic transfer.
    pub timeout: Duration,
    /// Abort the remaining transfers as soon as one file fails. Off by
    /// default: a single failed file marks only itself as errored while the
    /// rest continue.
    pub fail_fast: bool,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            concurrency: DEFAULT_CONCURRENCY,
            timeout: DEFAULT_TIMEOUT,
            fail_fast: false,
        }
    }
}
