//! Local artifact handles for upload.

use std::path::{Path, PathBuf};

use crate::error::UploadError;

/// A local file selected for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    /// Final path component only; the backend never sees directories.
    pub filename: String,
    pub path: PathBuf,
    pub size: u64,
}

impl UploadFile {
    /// Builds an upload handle from a path on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, UploadError> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(UploadError::Validation(format!(
                "not a regular file: {}",
                path.display()
            )));
        }
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                UploadError::Validation(format!("path has no usable filename: {}", path.display()))
            })?
            .to_string();

        Ok(Self {
            filename,
            path: path.to_path_buf(),
            size: metadata.len(),
        })
    }
}

/// Collects every regular file in a model directory (non-recursive; model
/// artifacts live flat) sorted by filename, plus the total size.
pub fn scan_model_dir(dir: &Path) -> Result<(Vec<UploadFile>, u64), UploadError> {
    let mut files = Vec::new();
    let mut total: u64 = 0;

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        let file = UploadFile::from_path(entry.path())?;
        total += file.size;
        files.push(file);
    }

    // Deterministic order so byte-offset attribution is reproducible.
    files.sort_by(|a, b| a.filename.cmp(&b.filename));

    Ok((files, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn from_path_reads_name_and_size() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.safetensors");
        fs::write(&path, vec![0u8; 2048]).unwrap();

        let file = UploadFile::from_path(&path).unwrap();
        assert_eq!(file.filename, "model.safetensors");
        assert_eq!(file.size, 2048);
    }

    #[test]
    fn from_path_rejects_directory() {
        let dir = TempDir::new().unwrap();
        let result = UploadFile::from_path(dir.path());
        assert!(matches!(result, Err(UploadError::Validation(_))));
    }

    #[test]
    fn from_path_missing_file_is_io_error() {
        let result = UploadFile::from_path("/nonexistent/model.gguf");
        assert!(matches!(result, Err(UploadError::Io(_))));
    }

    #[test]
    fn scan_collects_flat_files_sorted() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("tokenizer.json"), b"{}").unwrap();
        fs::write(dir.path().join("config.json"), b"{}").unwrap();
        fs::write(dir.path().join("model.gguf"), vec![0u8; 100]).unwrap();
        fs::create_dir(dir.path().join("subdir")).unwrap();
        fs::write(dir.path().join("subdir").join("ignored.bin"), b"x").unwrap();

        let (files, total) = scan_model_dir(dir.path()).unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(names, vec!["config.json", "model.gguf", "tokenizer.json"]);
        assert_eq!(total, 104);
    }

    #[test]
    fn scan_empty_dir() {
        let dir = TempDir::new().unwrap();
        let (files, total) = scan_model_dir(dir.path()).unwrap();
        assert!(files.is_empty());
        assert_eq!(total, 0);
    }
}
