use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::config::ReviewConfig;
use crate::workflows::certification::api::{ApiError, CertificationApi, StatusUpdate};
use crate::workflows::certification::domain::{
    ApplicantProfile, Application, ApplicationId, ApplicationStatus, ApplicationType,
    AuditLogEntry, Document, ReviewerRole, SignatureRecord,
};
use crate::workflows::certification::review::{ApplicationReview, ReviewSnapshot};
use crate::workflows::certification::session::ReviewerSession;
use crate::workflows::certification::signature::{SignatureArtifact, SignatureFile};

pub(super) fn timestamp(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 14, 9, minute, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn application(id: &str, status: ApplicationStatus) -> Application {
    Application {
        id: ApplicationId::new(id),
        application_type: ApplicationType::NewNic,
        current_status: status,
        applicant: ApplicantProfile {
            full_name: format!("Applicant {id}"),
            phone: "0771234567".to_string(),
            nic_number: None,
            email: None,
        },
        created_at: timestamp(0),
        updated_at: timestamp(0),
        signature: None,
    }
}

pub(super) fn signed(mut application: Application) -> Application {
    application.signature = Some(SignatureRecord {
        url: Some(format!("/files/{}/signature.png", application.id)),
        signed_at: Some(timestamp(5)),
    });
    application
}

pub(super) fn gn_session() -> ReviewerSession {
    ReviewerSession {
        user_id: "gn-01".to_string(),
        display_name: "N. Silva".to_string(),
        role: ReviewerRole::GramaNiladhari,
        access_token: "gn-token".to_string(),
    }
}

pub(super) fn ds_session() -> ReviewerSession {
    ReviewerSession {
        user_id: "ds-01".to_string(),
        display_name: "R. Fernando".to_string(),
        role: ReviewerRole::DivisionalSecretariat,
        access_token: "ds-token".to_string(),
    }
}

pub(super) fn review_config() -> ReviewConfig {
    ReviewConfig {
        refresh_delay: Duration::from_millis(5),
        ..ReviewConfig::default()
    }
}

pub(super) fn png_artifact() -> SignatureArtifact {
    SignatureArtifact {
        preview: "data:image/png;base64,AA==".to_string(),
        file: Some(SignatureFile {
            file_name: "signature.png".to_string(),
            content_type: "image/png".to_string(),
            bytes: vec![0x89, b'P', b'N', b'G'],
        }),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(super) enum ApiCall {
    List,
    Get(ApplicationId),
    UpdateStatus(ApplicationId, StatusUpdate),
    Sign(ApplicationId, Vec<u8>),
    Documents(ApplicationId),
    AuditLogs(ApplicationId),
}

#[derive(Debug, Default)]
struct FakeState {
    applications: HashMap<ApplicationId, Application>,
    audit: HashMap<ApplicationId, Vec<AuditLogEntry>>,
    calls: Vec<ApiCall>,
    fail_sign: bool,
    fail_status: bool,
    fail_reads: bool,
    sign_omits_signature: bool,
}

/// In-memory registry that records every call in order.
#[derive(Debug, Default, Clone)]
pub(super) struct RecordingApi {
    state: Arc<Mutex<FakeState>>,
}

impl RecordingApi {
    pub(super) fn with(applications: impl IntoIterator<Item = Application>) -> Self {
        let api = Self::default();
        {
            let mut state = api.state.lock().expect("lock");
            for application in applications {
                state.applications.insert(application.id.clone(), application);
            }
        }
        api
    }

    pub(super) fn fail_sign(&self, fail: bool) {
        self.state.lock().expect("lock").fail_sign = fail;
    }

    pub(super) fn fail_status(&self, fail: bool) {
        self.state.lock().expect("lock").fail_status = fail;
    }

    pub(super) fn fail_reads(&self, fail: bool) {
        self.state.lock().expect("lock").fail_reads = fail;
    }

    /// Store the signature but answer the sign call with the record as it was before.
    pub(super) fn sign_omits_signature(&self, omit: bool) {
        self.state.lock().expect("lock").sign_omits_signature = omit;
    }

    pub(super) fn calls(&self) -> Vec<ApiCall> {
        self.state.lock().expect("lock").calls.clone()
    }

    /// Only the mutating calls, in order.
    pub(super) fn writes(&self) -> Vec<ApiCall> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, ApiCall::Sign(..) | ApiCall::UpdateStatus(..)))
            .collect()
    }

    pub(super) fn stored(&self, id: &str) -> Application {
        self.state
            .lock()
            .expect("lock")
            .applications
            .get(&ApplicationId::new(id))
            .cloned()
            .expect("stored application")
    }

    /// Mutate the stored record behind the reviewer's back.
    pub(super) fn edit(&self, id: &str, change: impl FnOnce(&mut Application)) {
        let mut state = self.state.lock().expect("lock");
        let application = state
            .applications
            .get_mut(&ApplicationId::new(id))
            .expect("stored application");
        change(application);
    }
}

fn unavailable() -> ApiError {
    ApiError::Status {
        status: 503,
        message: "registry unavailable".to_string(),
    }
}

#[async_trait]
impl CertificationApi for RecordingApi {
    async fn list_applications(&self) -> Result<Vec<Application>, ApiError> {
        let mut state = self.state.lock().expect("lock");
        state.calls.push(ApiCall::List);
        let mut all: Vec<Application> = state.applications.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }

    async fn get_application_by_id(&self, id: &ApplicationId) -> Result<Application, ApiError> {
        let mut state = self.state.lock().expect("lock");
        state.calls.push(ApiCall::Get(id.clone()));
        if state.fail_reads {
            return Err(unavailable());
        }
        state.applications.get(id).cloned().ok_or(ApiError::Status {
            status: 404,
            message: "not found".to_string(),
        })
    }

    async fn update_application_status(
        &self,
        id: &ApplicationId,
        update: &StatusUpdate,
    ) -> Result<Application, ApiError> {
        let mut state = self.state.lock().expect("lock");
        state
            .calls
            .push(ApiCall::UpdateStatus(id.clone(), update.clone()));
        if state.fail_status {
            return Err(unavailable());
        }
        let application = state.applications.get_mut(id).ok_or(unavailable())?;
        let from = application.current_status;
        application.current_status = update.status;
        application.updated_at = timestamp(30);
        let updated = application.clone();
        let log = state.audit.entry(id.clone()).or_default();
        log.push(AuditLogEntry {
            id: format!("log-{}", log.len() + 1),
            application_id: id.clone(),
            user_id: "reviewer".to_string(),
            user_name: "Reviewer".to_string(),
            from_status: Some(from),
            to_status: update.status,
            comment: update.comment.clone(),
            created_at: timestamp(30),
        });
        Ok(updated)
    }

    async fn sign_application(
        &self,
        id: &ApplicationId,
        signature: &SignatureFile,
    ) -> Result<Application, ApiError> {
        let mut state = self.state.lock().expect("lock");
        state
            .calls
            .push(ApiCall::Sign(id.clone(), signature.bytes.clone()));
        if state.fail_sign {
            return Err(ApiError::Transport("connection reset".to_string()));
        }
        let omit = state.sign_omits_signature;
        let application = state.applications.get_mut(id).ok_or(unavailable())?;
        let before = application.clone();
        application.signature = Some(SignatureRecord {
            url: Some(format!("/files/{id}/signature.png")),
            signed_at: Some(timestamp(20)),
        });
        Ok(if omit { before } else { application.clone() })
    }

    async fn get_documents_for_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Vec<Document>, ApiError> {
        let mut state = self.state.lock().expect("lock");
        state.calls.push(ApiCall::Documents(id.clone()));
        if state.fail_reads {
            return Err(unavailable());
        }
        Ok(vec![Document {
            id: format!("{id}-birth-cert"),
            file_type: "PDF".to_string(),
            url: format!("/files/{id}/birth-certificate.pdf"),
            uploaded_at: timestamp(1),
            file_name: None,
        }])
    }

    async fn get_audit_logs_for_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Vec<AuditLogEntry>, ApiError> {
        let mut state = self.state.lock().expect("lock");
        state.calls.push(ApiCall::AuditLogs(id.clone()));
        if state.fail_reads {
            return Err(unavailable());
        }
        Ok(state.audit.get(id).cloned().unwrap_or_default())
    }
}

pub(super) async fn open_review(
    api: &RecordingApi,
    session: &ReviewerSession,
    id: &str,
) -> ApplicationReview<RecordingApi> {
    ApplicationReview::open(
        Arc::new(api.clone()),
        session,
        &ApplicationId::new(id),
        &review_config(),
    )
    .await
    .expect("review opens")
}

pub(super) fn snapshot_of(application: Application) -> ReviewSnapshot {
    ReviewSnapshot {
        application,
        documents: Vec::new(),
        audit_log: Vec::new(),
    }
}
