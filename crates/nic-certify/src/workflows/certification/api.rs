use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::domain::{Application, ApplicationId, ApplicationStatus, AuditLogEntry, Document};
use super::signature::SignatureFile;

/// Body of the status-update call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: ApplicationStatus,
    pub comment: String,
}

/// Registry operations the review desk depends on.
///
/// Implementations return the server's view of the entity; the desk never
/// patches records locally.
#[async_trait]
pub trait CertificationApi: Send + Sync {
    async fn list_applications(&self) -> Result<Vec<Application>, ApiError>;

    async fn get_application_by_id(&self, id: &ApplicationId) -> Result<Application, ApiError>;

    async fn update_application_status(
        &self,
        id: &ApplicationId,
        update: &StatusUpdate,
    ) -> Result<Application, ApiError>;

    async fn sign_application(
        &self,
        id: &ApplicationId,
        signature: &SignatureFile,
    ) -> Result<Application, ApiError>;

    async fn get_documents_for_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Vec<Document>, ApiError>;

    async fn get_audit_logs_for_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Vec<AuditLogEntry>, ApiError>;
}

/// Failure talking to the registry. Callers treat every variant as "request failed".
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("registry request failed: {0}")]
    Transport(String),
    #[error("registry returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("unexpected registry response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            ApiError::Decode(value.to_string())
        } else {
            ApiError::Transport(value.to_string())
        }
    }
}
