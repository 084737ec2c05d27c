//! Per-file and overall progress state.
//!
//! The monolithic transport reports only a single aggregate "bytes uploaded
//! so far" counter for the whole multipart body. [`ProgressAggregator`]
//! reconstructs per-file progress from it deterministically: files get
//! cumulative byte offsets in selection order, and each aggregate event
//! attributes `clamp(bytes - offset, 0, size)` bytes to every file. The
//! attribution is an approximation of what is physically on the wire, so a
//! high-water-mark rule guarantees the visible numbers never regress.

use modeldock_protocol::{FileStatus, FileUploadProgress};

const CANCELLED_MESSAGE: &str = "Upload cancelled";

struct FileEntry {
    filename: String,
    size: u64,
    /// Cumulative byte offset of this file within the multipart body.
    offset: u64,
    /// High-water mark; never regresses.
    progress: u8,
    status: FileStatus,
    error: Option<String>,
}

/// Converts raw transfer-byte events into per-file and overall percentages.
///
/// Mutated exclusively by the coordinator task; everything else reads
/// snapshots.
pub struct ProgressAggregator {
    entries: Vec<FileEntry>,
    total_size: u64,
    /// High-water mark of the aggregate byte counter.
    bytes_seen: u64,
    /// High-water mark of the overall percentage.
    overall: u8,
}

impl ProgressAggregator {
    /// Creates an aggregator for the given `(filename, size)` list in
    /// selection order.
    pub fn new(files: &[(String, u64)]) -> Self {
        let mut entries = Vec::with_capacity(files.len());
        let mut offset: u64 = 0;
        for (filename, size) in files {
            entries.push(FileEntry {
                filename: filename.clone(),
                size: *size,
                offset,
                progress: 0,
                status: FileStatus::Pending,
                error: None,
            });
            offset += size;
        }
        Self {
            entries,
            total_size: offset,
            bytes_seen: 0,
            overall: 0,
        }
    }

    /// An aggregator tracking nothing (the state between uploads).
    pub fn empty() -> Self {
        Self::new(&[])
    }

    /// Applies an aggregate byte event from a monolithic transfer.
    ///
    /// Out-of-order and duplicate events are tolerated; per-file progress
    /// and the overall percentage only ever move forward.
    pub fn apply_aggregate(&mut self, bytes_uploaded: u64) {
        if bytes_uploaded > self.bytes_seen {
            self.bytes_seen = bytes_uploaded;
        }

        for entry in &mut self.entries {
            let attributed = bytes_uploaded.saturating_sub(entry.offset).min(entry.size);
            apply_attributed(entry, attributed);
        }

        let pct = overall_bytes_percent(self.bytes_seen, self.total_size);
        if pct > self.overall {
            self.overall = pct;
        }
    }

    /// Applies a native byte count for one file (per-file transfers).
    pub fn apply_file_bytes(&mut self, index: usize, bytes_uploaded: u64) {
        let Some(entry) = self.entries.get_mut(index) else {
            return;
        };
        let attributed = bytes_uploaded.min(entry.size);
        apply_attributed(entry, attributed);
    }

    /// Marks one file fully uploaded and refreshes the file-count-based
    /// overall percentage used by the per-file strategy.
    pub fn mark_file_completed(&mut self, index: usize) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.progress = 100;
            entry.status = FileStatus::Completed;
        }

        let completed = self
            .entries
            .iter()
            .filter(|e| e.status == FileStatus::Completed)
            .count();
        let pct = ((completed as f64 / self.entries.len().max(1) as f64) * 100.0).round() as u8;
        if pct > self.overall {
            self.overall = pct;
        }
    }

    /// Marks one file failed. Its progress freezes where it was.
    pub fn mark_file_error(&mut self, index: usize, message: &str) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.status = FileStatus::Error;
            entry.error = Some(message.to_string());
        }
    }

    /// Forces every file to `completed` and the overall percentage to 100.
    /// Called when the session transitions to uploaded.
    pub fn complete_all(&mut self) {
        for entry in &mut self.entries {
            entry.progress = 100;
            entry.status = FileStatus::Completed;
        }
        self.bytes_seen = self.total_size;
        self.overall = 100;
    }

    /// Cancellation: every pending/uploading file becomes an error;
    /// files that already completed keep that status.
    pub fn mark_cancelled(&mut self) {
        for entry in &mut self.entries {
            if matches!(entry.status, FileStatus::Pending | FileStatus::Uploading) {
                entry.status = FileStatus::Error;
                entry.error = Some(CANCELLED_MESSAGE.to_string());
            }
        }
    }

    /// Overall percentage in [0, 100]; 100 only once the transfer is
    /// actually complete.
    pub fn overall(&self) -> u8 {
        self.overall
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn file_count(&self) -> usize {
        self.entries.len()
    }

    /// Snapshot of every file's progress for UI consumption.
    pub fn snapshot(&self) -> Vec<FileUploadProgress> {
        self.entries
            .iter()
            .map(|e| FileUploadProgress {
                filename: e.filename.clone(),
                progress: e.progress,
                status: e.status,
                error: e.error.clone(),
                size: e.size,
            })
            .collect()
    }
}

fn apply_attributed(entry: &mut FileEntry, attributed: u64) {
    let pct = if entry.size == 0 {
        100
    } else {
        ((attributed as f64 / entry.size as f64) * 100.0).round() as u8
    };
    if pct > entry.progress {
        entry.progress = pct;
    }

    // Status only advances; errored files stay errored.
    if entry.status == FileStatus::Error {
        return;
    }
    if attributed == entry.size {
        entry.status = FileStatus::Completed;
    } else if attributed > 0 && entry.status == FileStatus::Pending {
        entry.status = FileStatus::Uploading;
    }
}

/// Floor-based percentage capped at 99 below completion, so 100 is reported
/// iff `bytes == total`.
fn overall_bytes_percent(bytes: u64, total: u64) -> u8 {
    if total == 0 || bytes >= total {
        return 100;
    }
    ((bytes * 100 / total) as u8).min(99)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: u64 = 1024 * 1024;

    fn three_files() -> ProgressAggregator {
        ProgressAggregator::new(&[
            ("a.safetensors".into(), 300 * MB),
            ("b.safetensors".into(), 100 * MB),
            ("c.safetensors".into(), 50 * MB),
        ])
    }

    #[test]
    fn offsets_are_cumulative_in_selection_order() {
        let agg = three_files();
        assert_eq!(agg.entries[0].offset, 0);
        assert_eq!(agg.entries[1].offset, 300 * MB);
        assert_eq!(agg.entries[2].offset, 400 * MB);
        assert_eq!(agg.total_size(), 450 * MB);
    }

    #[test]
    fn attribution_scenario_320_of_450_mb() {
        let mut agg = three_files();
        agg.apply_aggregate(320 * MB);

        let snap = agg.snapshot();
        assert_eq!(snap[0].progress, 100);
        assert_eq!(snap[0].status, FileStatus::Completed);
        assert_eq!(snap[1].progress, 20);
        assert_eq!(snap[1].status, FileStatus::Uploading);
        assert_eq!(snap[2].progress, 0);
        assert_eq!(snap[2].status, FileStatus::Pending);
    }

    #[test]
    fn attribution_sums_exactly_at_completion() {
        let mut agg = three_files();
        agg.apply_aggregate(320 * MB);
        agg.apply_aggregate(450 * MB);

        for f in agg.snapshot() {
            assert_eq!(f.progress, 100);
            assert_eq!(f.status, FileStatus::Completed);
        }
        assert_eq!(agg.overall(), 100);
    }

    #[test]
    fn progress_is_monotonic_under_out_of_order_events() {
        let mut agg = three_files();
        let events = [320 * MB, 100 * MB, 320 * MB, 50 * MB, 310 * MB];

        let mut last: Vec<u8> = vec![0; 3];
        for bytes in events {
            agg.apply_aggregate(bytes);
            for (i, f) in agg.snapshot().iter().enumerate() {
                assert!(
                    f.progress >= last[i],
                    "file {i} regressed: {} -> {}",
                    last[i],
                    f.progress
                );
                last[i] = f.progress;
            }
        }
        // Still at the high-water mark set by the 320 MB event.
        assert_eq!(agg.snapshot()[0].progress, 100);
        assert_eq!(agg.snapshot()[1].progress, 20);
    }

    #[test]
    fn status_never_reverses_on_duplicate_events() {
        let mut agg = three_files();
        agg.apply_aggregate(450 * MB);
        agg.apply_aggregate(10 * MB);
        for f in agg.snapshot() {
            assert_eq!(f.status, FileStatus::Completed);
        }
    }

    #[test]
    fn overall_is_bounded_and_100_iff_complete() {
        let mut agg = three_files();
        assert_eq!(agg.overall(), 0);

        // 449 of 450 MB would round to 100; must still report < 100.
        agg.apply_aggregate(450 * MB - 1);
        assert!(agg.overall() < 100);

        agg.apply_aggregate(450 * MB);
        assert_eq!(agg.overall(), 100);
    }

    #[test]
    fn overall_never_exceeds_100_on_overshoot() {
        let mut agg = three_files();
        agg.apply_aggregate(500 * MB);
        assert_eq!(agg.overall(), 100);
        for f in agg.snapshot() {
            assert_eq!(f.progress, 100);
        }
    }

    #[test]
    fn file_bytes_native_progress() {
        let mut agg = ProgressAggregator::new(&[("a.gguf".into(), 200), ("b.gguf".into(), 100)]);
        agg.apply_file_bytes(1, 50);

        let snap = agg.snapshot();
        assert_eq!(snap[0].status, FileStatus::Pending);
        assert_eq!(snap[1].progress, 50);
        assert_eq!(snap[1].status, FileStatus::Uploading);
    }

    #[test]
    fn file_bytes_out_of_range_index_is_ignored() {
        let mut agg = ProgressAggregator::new(&[("a.gguf".into(), 200)]);
        agg.apply_file_bytes(5, 50);
        assert_eq!(agg.snapshot()[0].progress, 0);
    }

    #[test]
    fn completed_count_drives_overall_for_per_file_mode() {
        let mut agg = ProgressAggregator::new(&[
            ("a".into(), 10),
            ("b".into(), 10),
            ("c".into(), 10),
        ]);
        agg.mark_file_completed(0);
        assert_eq!(agg.overall(), 33);
        agg.mark_file_completed(1);
        assert_eq!(agg.overall(), 67);
        agg.mark_file_completed(2);
        assert_eq!(agg.overall(), 100);
    }

    #[test]
    fn cancel_marks_unfinished_files_only() {
        let mut agg = three_files();
        agg.apply_aggregate(320 * MB); // a completed, b uploading, c pending
        agg.mark_cancelled();

        let snap = agg.snapshot();
        assert_eq!(snap[0].status, FileStatus::Completed);
        assert!(snap[0].error.is_none());
        assert_eq!(snap[1].status, FileStatus::Error);
        assert_eq!(snap[1].error.as_deref(), Some("Upload cancelled"));
        assert_eq!(snap[2].status, FileStatus::Error);
        assert_eq!(snap[2].error.as_deref(), Some("Upload cancelled"));
    }

    #[test]
    fn errored_file_does_not_advance_afterwards() {
        let mut agg = ProgressAggregator::new(&[("a".into(), 100)]);
        agg.apply_file_bytes(0, 40);
        agg.mark_file_error(0, "connection reset");
        agg.apply_file_bytes(0, 100);

        let snap = agg.snapshot();
        assert_eq!(snap[0].status, FileStatus::Error);
        assert_eq!(snap[0].error.as_deref(), Some("connection reset"));
    }

    #[test]
    fn zero_size_file_completes_immediately() {
        let mut agg = ProgressAggregator::new(&[("empty.json".into(), 0), ("a".into(), 10)]);
        agg.apply_aggregate(0);
        let snap = agg.snapshot();
        assert_eq!(snap[0].progress, 100);
        assert_eq!(snap[0].status, FileStatus::Completed);
        assert_eq!(snap[1].status, FileStatus::Pending);
    }

    #[test]
    fn complete_all_forces_terminal_state() {
        let mut agg = three_files();
        agg.apply_aggregate(10 * MB);
        agg.complete_all();
        assert_eq!(agg.overall(), 100);
        for f in agg.snapshot() {
            assert_eq!(f.status, FileStatus::Completed);
            assert_eq!(f.progress, 100);
        }
    }

    #[test]
    fn attribution_totality_for_arbitrary_sizes() {
        // Any size mix: at bytes == total every file is fully attributed.
        let sizes: Vec<(String, u64)> = [7u64, 0, 1, 4096, 3, 1024 * 1024]
            .iter()
            .enumerate()
            .map(|(i, s)| (format!("f{i}"), *s))
            .collect();
        let total: u64 = sizes.iter().map(|(_, s)| s).sum();

        let mut agg = ProgressAggregator::new(&sizes);
        agg.apply_aggregate(total);
        for f in agg.snapshot() {
            assert_eq!(f.progress, 100);
            assert_eq!(f.status, FileStatus::Completed);
        }
        assert_eq!(agg.overall(), 100);
    }
}
