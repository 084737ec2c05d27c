use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::classify::ModelFileType;

/// On-disk format of a model's weight files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Safetensors,
    Pytorch,
    Gguf,
}

impl std::fmt::Display for FileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileFormat::Safetensors => write!(f, "safetensors"),
            FileFormat::Pytorch => write!(f, "pytorch"),
            FileFormat::Gguf => write!(f, "gguf"),
        }
    }
}

/// A file accepted into temporary storage by the backend.
///
/// Issued on successful transfer and immutable thereafter; the backend
/// destroys it when the session is committed or discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedFile {
    pub temp_file_id: Uuid,
    pub filename: String,
    pub file_type: ModelFileType,
    pub size_bytes: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub checksum: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_issues: Vec<String>,
    pub is_main_file: bool,
}

/// Server-side record of files uploaded to temporary storage for one
/// prospective model, prior to commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadSession {
    pub session_id: Uuid,
    pub provider_id: Uuid,
    pub main_filename: String,
    pub total_size_bytes: u64,
    pub files: Vec<ProcessedFile>,
}

impl UploadSession {
    /// Returns the temp file ids of every file in the session.
    pub fn file_ids(&self) -> Vec<Uuid> {
        self.files.iter().map(|f| f.temp_file_id).collect()
    }

    /// Returns `true` if `id` refers to a file in this session.
    pub fn contains_file(&self, id: &Uuid) -> bool {
        self.files.iter().any(|f| f.temp_file_id == *id)
    }

    /// Returns the main file entry, if present.
    pub fn main_file(&self) -> Option<&ProcessedFile> {
        self.files.iter().find(|f| f.is_main_file)
    }

    /// Checks the session invariants.
    ///
    /// File sizes must sum to `total_size_bytes`, and exactly one file must
    /// be flagged as main with a filename matching `main_filename`
    /// case-insensitively.
    pub fn verify(&self) -> Result<(), String> {
        let sum: u64 = self.files.iter().map(|f| f.size_bytes).sum();
        if sum != self.total_size_bytes {
            return Err(format!(
                "file sizes sum to {sum}, session claims {}",
                self.total_size_bytes
            ));
        }

        let mains: Vec<&ProcessedFile> = self.files.iter().filter(|f| f.is_main_file).collect();
        match mains.as_slice() {
            [main] => {
                if !main.filename.eq_ignore_ascii_case(&self.main_filename) {
                    Err(format!(
                        "main file '{}' does not match session main_filename '{}'",
                        main.filename, self.main_filename
                    ))
                } else {
                    Ok(())
                }
            }
            [] => Err("no main file in session".into()),
            _ => Err(format!("{} files flagged as main", mains.len())),
        }
    }
}

/// Transfer status of a single file, client-side.
///
/// Only advances forward: `pending → uploading → {completed | error}`.
/// A new upload attempt starts a fresh object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Pending,
    Uploading,
    Completed,
    Error,
}

/// Ephemeral per-file progress as shown to UI layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileUploadProgress {
    pub filename: String,
    /// Percentage in 0–100, monotonically non-decreasing for a given file.
    pub progress: u8,
    pub status: FileStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub size: u64,
}

/// Output of the external file-format validator, consumed as upload input.
///
/// The validator classifies the selected files for a declared format into
/// required/optional sets. This subsystem only acts on the `valid` verdict
/// and the categorized lists; it does not reimplement the rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormatValidation {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub optional: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl FormatValidation {
    /// A validation that accepts everything (useful for tests and callers
    /// that have already validated elsewhere).
    pub fn accepting() -> Self {
        Self {
            valid: true,
            ..Default::default()
        }
    }
}
