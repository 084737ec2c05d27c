//! Second-phase commit: promotes an uploaded session into a persisted model.

use std::sync::Arc;

use modeldock_protocol::{
    CommitRequest, Model, ModelCapabilities, ModelMetadata, ModelSource, UploadSession,
};
use tracing::info;
use uuid::Uuid;

use crate::error::UploadError;
use crate::transport::UploadTransport;

/// Performs the commit call that converts an uploaded session plus a
/// user-chosen subset of its files into a persisted model record.
pub struct CommitClient {
    transport: Arc<dyn UploadTransport>,
}

impl CommitClient {
    pub fn new(transport: Arc<dyn UploadTransport>) -> Self {
        Self { transport }
    }

    /// Commits `selected_files` out of `session`.
    ///
    /// Every id must be a `temp_file_id` present in the session, and the
    /// main file cannot be dropped; optional artifacts discovered during
    /// categorization (a README, say) can be.
    pub async fn commit(
        &self,
        session: &UploadSession,
        metadata: &ModelMetadata,
        capabilities: ModelCapabilities,
        selected_files: &[Uuid],
    ) -> Result<Model, UploadError> {
        if selected_files.is_empty() {
            return Err(UploadError::Commit("no files selected".into()));
        }
        for id in selected_files {
            if !session.contains_file(id) {
                return Err(UploadError::Commit(format!("unknown file reference: {id}")));
            }
        }
        if let Some(main) = session.main_file()
            && !selected_files.contains(&main.temp_file_id)
        {
            return Err(UploadError::Commit(format!(
                "main file '{}' cannot be deselected",
                main.filename
            )));
        }

        let ModelSource::LocalWeights {
            architecture,
            file_format,
        } = &metadata.source
        else {
            return Err(UploadError::Validation(
                "commit requires local_weights metadata".into(),
            ));
        };

        let req = CommitRequest {
            session_id: session.session_id,
            provider_id: session.provider_id,
            name: metadata.name.clone(),
            alias: metadata.alias.clone(),
            description: metadata.description.clone(),
            architecture: architecture.clone(),
            file_format: *file_format,
            capabilities,
            selected_files: selected_files.to_vec(),
        };

        let model = self.transport.commit(req).await?;
        info!(
            session_id = %session.session_id,
            model_id = %model.id,
            files = selected_files.len(),
            "session committed"
        );
        Ok(model)
    }
}
