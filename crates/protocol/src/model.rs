use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{FileFormat, ProcessedFile};

/// Capability flags advertised for a model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCapabilities {
    #[serde(default)]
    pub chat: bool,
    #[serde(default)]
    pub completion: bool,
    #[serde(default)]
    pub vision: bool,
    #[serde(default)]
    pub tools: bool,
}

/// Where a model's artifacts come from.
///
/// Each arm carries only the fields that source requires; local weight
/// uploads need an architecture and a file format, hub downloads need a
/// repository path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ModelSource {
    LocalWeights {
        architecture: String,
        file_format: FileFormat,
    },
    RemoteRepository {
        repository_path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        branch: Option<String>,
    },
}

/// Caller-supplied metadata for a model being committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Unique model id within the provider.
    pub name: String,
    /// Human-readable display name.
    pub alias: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub source: ModelSource,
}

/// Body of the second-phase `POST /commit-upload` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitRequest {
    pub session_id: Uuid,
    pub provider_id: Uuid,
    pub name: String,
    pub alias: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub architecture: String,
    pub file_format: FileFormat,
    pub capabilities: ModelCapabilities,
    /// Temp file ids the user kept; files not listed are dropped.
    pub selected_files: Vec<Uuid>,
}

/// A persisted model record returned by the backend on commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub name: String,
    pub alias: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub architecture: String,
    pub file_format: FileFormat,
    #[serde(default)]
    pub capabilities: ModelCapabilities,
    pub size_bytes: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<ProcessedFile>,
    pub created_at: DateTime<Utc>,
}
