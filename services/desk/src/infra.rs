use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use nic_certify::workflows::certification::status::TRANSITION_RULES;
use nic_certify::workflows::certification::{
    ApiError, ApplicantProfile, Application, ApplicationId, ApplicationStatus, ApplicationType,
    AuditLogEntry, CertificationApi, Document, ReviewerSession, SignatureFile, SignatureRecord,
    StatusUpdate,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Registry stand-in for the demo. Enforces the same lifecycle edges as the
/// real backend and writes an audit entry for every transition.
#[derive(Default, Clone)]
pub(crate) struct InMemoryRegistry {
    state: Arc<Mutex<RegistryState>>,
}

#[derive(Default)]
struct RegistryState {
    applications: Vec<Application>,
    documents: HashMap<ApplicationId, Vec<Document>>,
    audit: HashMap<ApplicationId, Vec<AuditLogEntry>>,
    actor: Option<(String, String)>,
}

const SEED: [(&str, &str, &str, Option<&str>, ApplicationType); 5] = [
    (
        "NIC-2025-0001",
        "Kamala Jayasuriya",
        "0712345678",
        None,
        ApplicationType::NewNic,
    ),
    (
        "NIC-2025-0002",
        "Sunil Perera",
        "0773456789",
        Some("851234567V"),
        ApplicationType::DocumentVerification,
    ),
    (
        "NIC-2025-0003",
        "Nadeesha Fernando",
        "0759876543",
        None,
        ApplicationType::NewNic,
    ),
    (
        "NIC-2025-0004",
        "Ruwan Bandara",
        "0112223334",
        Some("199012345678"),
        ApplicationType::DocumentVerification,
    ),
    (
        "NIC-2025-0005",
        "Tharushi Wickramasinghe",
        "0701112223",
        None,
        ApplicationType::NewNic,
    ),
];

impl InMemoryRegistry {
    /// Five freshly filed applications, the oldest filed a week before `now`.
    pub(crate) fn seeded(now: DateTime<Utc>) -> Self {
        let registry = Self::default();
        {
            let mut state = registry.state.lock().expect("registry mutex poisoned");
            for (offset, (id, name, phone, nic, application_type)) in SEED.into_iter().enumerate() {
                let filed = now - Duration::days(7 - offset as i64);
                let id = ApplicationId::new(id);
                state.applications.push(Application {
                    id: id.clone(),
                    application_type,
                    current_status: ApplicationStatus::Submitted,
                    applicant: ApplicantProfile {
                        full_name: name.to_string(),
                        phone: phone.to_string(),
                        nic_number: nic.map(str::to_string),
                        email: None,
                    },
                    created_at: filed,
                    updated_at: filed,
                    signature: None,
                });
                state.documents.insert(
                    id.clone(),
                    vec![
                        Document {
                            id: format!("{id}-birth"),
                            file_type: "PDF".to_string(),
                            url: format!("/files/{id}/birth-certificate.pdf"),
                            uploaded_at: filed,
                            file_name: Some("Birth certificate.pdf".to_string()),
                        },
                        Document {
                            id: format!("{id}-photo"),
                            file_type: "JPG".to_string(),
                            url: format!("/files/{id}/photo.jpg"),
                            uploaded_at: filed,
                            file_name: None,
                        },
                    ],
                );
                state.audit.insert(
                    id.clone(),
                    vec![AuditLogEntry {
                        id: format!("{id}-log-1"),
                        application_id: id,
                        user_id: "citizen-portal".to_string(),
                        user_name: "Citizen portal".to_string(),
                        from_status: None,
                        to_status: ApplicationStatus::Submitted,
                        comment: "Application filed online".to_string(),
                        created_at: filed,
                    }],
                );
            }
        }
        registry
    }

    /// Attribute subsequent audit entries to this reviewer.
    pub(crate) fn act_as(&self, session: &ReviewerSession) {
        let mut state = self.state.lock().expect("registry mutex poisoned");
        state.actor = Some((session.user_id.clone(), session.display_name.clone()));
    }
}

fn not_found(id: &ApplicationId) -> ApiError {
    ApiError::Status {
        status: 404,
        message: format!("application {id} not found"),
    }
}

impl RegistryState {
    fn application_mut(&mut self, id: &ApplicationId) -> Result<&mut Application, ApiError> {
        self.applications
            .iter_mut()
            .find(|application| &application.id == id)
            .ok_or_else(|| not_found(id))
    }
}

#[async_trait]
impl CertificationApi for InMemoryRegistry {
    async fn list_applications(&self) -> Result<Vec<Application>, ApiError> {
        let guard = self.state.lock().expect("registry mutex poisoned");
        Ok(guard.applications.clone())
    }

    async fn get_application_by_id(&self, id: &ApplicationId) -> Result<Application, ApiError> {
        let guard = self.state.lock().expect("registry mutex poisoned");
        guard
            .applications
            .iter()
            .find(|application| &application.id == id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    async fn update_application_status(
        &self,
        id: &ApplicationId,
        update: &StatusUpdate,
    ) -> Result<Application, ApiError> {
        let mut guard = self.state.lock().expect("registry mutex poisoned");
        let (user_id, user_name) = guard
            .actor
            .clone()
            .unwrap_or_else(|| ("unknown".to_string(), "Unknown reviewer".to_string()));

        let now = Utc::now();
        let application = guard.application_mut(id)?;
        let from = application.current_status;
        let rule = TRANSITION_RULES
            .iter()
            .find(|rule| rule.from == from && rule.to == update.status)
            .ok_or_else(|| ApiError::Status {
                status: 409,
                message: format!("cannot move {id} from {from} to {}", update.status),
            })?;
        if rule.requires_signature && !application.is_signed() {
            return Err(ApiError::Status {
                status: 422,
                message: format!("{id} must be signed before {}", update.status),
            });
        }

        application.current_status = update.status;
        application.updated_at = now;
        let updated = application.clone();

        let log = guard.audit.entry(id.clone()).or_default();
        log.push(AuditLogEntry {
            id: format!("{id}-log-{}", log.len() + 1),
            application_id: id.clone(),
            user_id,
            user_name,
            from_status: Some(from),
            to_status: update.status,
            comment: update.comment.clone(),
            created_at: now,
        });
        Ok(updated)
    }

    async fn sign_application(
        &self,
        id: &ApplicationId,
        signature: &SignatureFile,
    ) -> Result<Application, ApiError> {
        let mut guard = self.state.lock().expect("registry mutex poisoned");
        let now = Utc::now();
        let application = guard.application_mut(id)?;
        application.signature = Some(SignatureRecord {
            url: Some(format!("/files/{id}/{}", signature.file_name)),
            signed_at: Some(now),
        });
        application.updated_at = now;
        Ok(application.clone())
    }

    async fn get_documents_for_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Vec<Document>, ApiError> {
        let guard = self.state.lock().expect("registry mutex poisoned");
        Ok(guard.documents.get(id).cloned().unwrap_or_default())
    }

    async fn get_audit_logs_for_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Vec<AuditLogEntry>, ApiError> {
        let guard = self.state.lock().expect("registry mutex poisoned");
        Ok(guard.audit.get(id).cloned().unwrap_or_default())
    }
}
