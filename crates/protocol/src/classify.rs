//! Filename-based classification of model artifacts and advisory content
//! checks.
//!
//! Classification mirrors what the backend reports in
//! [`ProcessedFile::file_type`](crate::types::ProcessedFile); having it
//! client-side lets UIs group files before the upload starts. The content
//! checks are advisory only and never block an upload.

use serde::{Deserialize, Serialize};

/// Role a file plays within a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFileType {
    /// Actual model parameters (.safetensors, .bin, .gguf, ...).
    Weight,
    /// index.json files describing sharded weights.
    Index,
    /// config.json, generation_config.json.
    Config,
    /// tokenizer.json, tokenizer_config.json.
    Tokenizer,
    /// vocab.json, merges.txt, special_tokens_map.json.
    Vocab,
    /// Everything else.
    Unknown,
}

impl ModelFileType {
    /// Classifies a file by name.
    pub fn from_filename(filename: &str) -> Self {
        let name = filename.to_lowercase();

        if name.ends_with(".safetensors")
            || name.ends_with(".bin")
            || name.ends_with(".pt")
            || name.ends_with(".pth")
            || name.ends_with(".gguf")
            || name.ends_with(".ggml")
        {
            // A weight extension on an index file never happens; extension
            // check first matches the backend's precedence.
            return ModelFileType::Weight;
        }

        if name.ends_with(".index.json") || (name.contains("index") && name.ends_with(".json")) {
            return ModelFileType::Index;
        }

        if name == "config.json" || name.starts_with("config_") || name == "generation_config.json"
        {
            return ModelFileType::Config;
        }

        if name == "tokenizer.json" || name == "tokenizer_config.json" || name.starts_with("tokenizer_")
        {
            return ModelFileType::Tokenizer;
        }

        if name == "vocab.json"
            || name == "vocab.txt"
            || name == "merges.txt"
            || name == "special_tokens_map.json"
            || name == "spiece.model"
        {
            return ModelFileType::Vocab;
        }

        ModelFileType::Unknown
    }
}

impl std::fmt::Display for ModelFileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ModelFileType::Weight => "weight",
            ModelFileType::Index => "index",
            ModelFileType::Config => "config",
            ModelFileType::Tokenizer => "tokenizer",
            ModelFileType::Vocab => "vocab",
            ModelFileType::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// Inspects file content and returns human-readable issues.
///
/// Catches the common failure modes of hand-collected artifacts: empty
/// files, truncated weight files, configs that are not JSON, and HTML error
/// pages saved as model files by a browser.
pub fn content_issues(filename: &str, data: &[u8]) -> Vec<String> {
    let mut issues = Vec::new();

    if data.is_empty() {
        issues.push("File is empty".to_string());
        return issues;
    }

    match ModelFileType::from_filename(filename) {
        ModelFileType::Weight => {
            if data.len() < 1024 {
                issues.push("Model weight file is suspiciously small (< 1KB)".to_string());
            }
        }
        ModelFileType::Config | ModelFileType::Index => {
            if serde_json::from_slice::<serde_json::Value>(data).is_err() {
                issues.push(format!("{filename} is not valid JSON"));
            }
        }
        ModelFileType::Tokenizer => {
            if filename.eq_ignore_ascii_case("tokenizer.json")
                && serde_json::from_slice::<serde_json::Value>(data).is_err()
            {
                issues.push("Tokenizer file is not valid JSON".to_string());
            }
        }
        _ => {}
    }

    // "<!do", "<htm", "<HTM": an error page saved in place of the artifact.
    if data.len() >= 4 {
        let head = &data[0..4];
        if matches!(
            head,
            [0x3C, 0x21, _, _] | [0x3C, 0x68, 0x74, 0x6D] | [0x3C, 0x48, 0x54, 0x4D]
        ) {
            issues.push("File appears to be HTML content (possibly an error page)".to_string());
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_weight_extensions() {
        for name in [
            "model.safetensors",
            "pytorch_model.bin",
            "model.pt",
            "model.pth",
            "llama.gguf",
            "old.ggml",
        ] {
            assert_eq!(ModelFileType::from_filename(name), ModelFileType::Weight, "{name}");
        }
    }

    #[test]
    fn classifies_sharded_index() {
        assert_eq!(
            ModelFileType::from_filename("model.safetensors.index.json"),
            ModelFileType::Index
        );
        assert_eq!(
            ModelFileType::from_filename("pytorch_model.bin.index.json"),
            ModelFileType::Index
        );
    }

    #[test]
    fn classifies_config_and_tokenizer() {
        assert_eq!(ModelFileType::from_filename("config.json"), ModelFileType::Config);
        assert_eq!(
            ModelFileType::from_filename("generation_config.json"),
            ModelFileType::Config
        );
        assert_eq!(
            ModelFileType::from_filename("tokenizer.json"),
            ModelFileType::Tokenizer
        );
        assert_eq!(
            ModelFileType::from_filename("tokenizer_config.json"),
            ModelFileType::Tokenizer
        );
    }

    #[test]
    fn classifies_vocab_files() {
        for name in ["vocab.json", "vocab.txt", "merges.txt", "special_tokens_map.json"] {
            assert_eq!(ModelFileType::from_filename(name), ModelFileType::Vocab, "{name}");
        }
    }

    #[test]
    fn classification_is_case_insensitive() {
        assert_eq!(
            ModelFileType::from_filename("Model.SafeTensors"),
            ModelFileType::Weight
        );
    }

    #[test]
    fn unknown_for_everything_else() {
        assert_eq!(ModelFileType::from_filename("README.md"), ModelFileType::Unknown);
    }

    #[test]
    fn empty_file_is_flagged() {
        let issues = content_issues("model.safetensors", b"");
        assert_eq!(issues, vec!["File is empty".to_string()]);
    }

    #[test]
    fn tiny_weight_file_is_flagged() {
        let issues = content_issues("model.safetensors", &[0u8; 100]);
        assert!(issues.iter().any(|i| i.contains("suspiciously small")));
    }

    #[test]
    fn invalid_config_json_is_flagged() {
        let issues = content_issues("config.json", b"not json at all");
        assert!(issues.iter().any(|i| i.contains("not valid JSON")));
    }

    #[test]
    fn html_error_page_is_flagged() {
        let issues = content_issues("weights.gguf", b"<html><body>404</body></html>");
        assert!(issues.iter().any(|i| i.contains("HTML content")));
    }

    #[test]
    fn valid_config_passes() {
        assert!(content_issues("config.json", br#"{"hidden_size": 4096}"#).is_empty());
    }
}
