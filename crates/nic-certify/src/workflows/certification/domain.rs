use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for NIC applications as issued by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub String);

impl ApplicationId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

/// Kind of request the citizen filed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationType {
    NewNic,
    DocumentVerification,
    #[serde(other)]
    Other,
}

impl ApplicationType {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationType::NewNic => "New NIC",
            ApplicationType::DocumentVerification => "Document verification",
            ApplicationType::Other => "Other",
        }
    }
}

/// Lifecycle node of an application. Transition rules live in [`super::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    /// Older registry builds still emit `RECEIVED` for freshly filed applications.
    #[serde(alias = "RECEIVED")]
    Submitted,
    ApprovedByGn,
    RejectedByGn,
    OnHoldByDs,
    SentToDrp,
    Completed,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 6] = [
        ApplicationStatus::Submitted,
        ApplicationStatus::ApprovedByGn,
        ApplicationStatus::RejectedByGn,
        ApplicationStatus::OnHoldByDs,
        ApplicationStatus::SentToDrp,
        ApplicationStatus::Completed,
    ];

    /// Wire constant sent to the status endpoint.
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Submitted => "SUBMITTED",
            ApplicationStatus::ApprovedByGn => "APPROVED_BY_GN",
            ApplicationStatus::RejectedByGn => "REJECTED_BY_GN",
            ApplicationStatus::OnHoldByDs => "ON_HOLD_BY_DS",
            ApplicationStatus::SentToDrp => "SENT_TO_DRP",
            ApplicationStatus::Completed => "COMPLETED",
        }
    }

    /// Human readable label for queue listings and the audit timeline.
    pub const fn display_label(self) -> &'static str {
        match self {
            ApplicationStatus::Submitted => "Submitted",
            ApplicationStatus::ApprovedByGn => "Approved by GN",
            ApplicationStatus::RejectedByGn => "Rejected",
            ApplicationStatus::OnHoldByDs => "On hold (DS)",
            ApplicationStatus::SentToDrp => "Sent to DRP",
            ApplicationStatus::Completed => "Completed",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The two reviewer roles in the certification chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReviewerRole {
    /// Grama Niladhari: verifies and signs.
    #[serde(rename = "GN")]
    GramaNiladhari,
    /// Divisional Secretariat: forwards signed applications to DRP.
    #[serde(rename = "DS")]
    DivisionalSecretariat,
}

impl ReviewerRole {
    pub const fn label(self) -> &'static str {
        match self {
            ReviewerRole::GramaNiladhari => "GN",
            ReviewerRole::DivisionalSecretariat => "DS",
        }
    }
}

impl fmt::Display for ReviewerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Applicant details shown to reviewers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantProfile {
    pub full_name: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nic_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Server-side trace of a signature attached to an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_at: Option<DateTime<Utc>>,
}

/// One citizen's request as returned by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "ApplicationWire")]
pub struct Application {
    pub id: ApplicationId,
    pub application_type: ApplicationType,
    pub current_status: ApplicationStatus,
    pub applicant: ApplicantProfile,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<SignatureRecord>,
}

impl Application {
    /// Whether a signature is already persisted on the record.
    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }
}

/// Accepts every signature encoding the registry has used and folds them into
/// [`Application::signature`].
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApplicationWire {
    id: ApplicationId,
    application_type: ApplicationType,
    current_status: ApplicationStatus,
    applicant: ApplicantProfile,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    signature: Option<SignatureRecord>,
    #[serde(default)]
    signed_pdf_url: Option<String>,
    #[serde(default)]
    signature_url: Option<String>,
    #[serde(default)]
    signed: Option<bool>,
}

impl From<ApplicationWire> for Application {
    fn from(wire: ApplicationWire) -> Self {
        let legacy_url = wire
            .signed_pdf_url
            .or(wire.signature_url)
            .filter(|url| !url.trim().is_empty());

        let signature = match (wire.signature, legacy_url, wire.signed) {
            (Some(record), _, _) => Some(record),
            (None, Some(url), _) => Some(SignatureRecord {
                url: Some(url),
                signed_at: None,
            }),
            (None, None, Some(true)) => Some(SignatureRecord {
                url: None,
                signed_at: None,
            }),
            _ => None,
        };

        Self {
            id: wire.id,
            application_type: wire.application_type,
            current_status: wire.current_status,
            applicant: wire.applicant,
            created_at: wire.created_at,
            updated_at: wire.updated_at,
            signature,
        }
    }
}

/// Immutable record of one status transition, written by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: String,
    pub application_id: ApplicationId,
    pub user_id: String,
    pub user_name: String,
    #[serde(default)]
    pub from_status: Option<ApplicationStatus>,
    pub to_status: ApplicationStatus,
    #[serde(default)]
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// Read-only file descriptor attached to an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub file_type: String,
    pub url: String,
    pub uploaded_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

impl Document {
    /// Name used when saving the document locally.
    pub fn download_name(&self) -> String {
        match &self.file_name {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => {
                let tail = self.url.rsplit('/').next().unwrap_or_default();
                if tail.is_empty() {
                    format!("{}.{}", self.id, self.file_type.to_ascii_lowercase())
                } else {
                    tail.to_string()
                }
            }
        }
    }
}
