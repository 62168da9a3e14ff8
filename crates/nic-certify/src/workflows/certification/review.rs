//! Decision submission for a single application.
//!
//! A decision runs as an ordered pseudo-transaction against the registry:
//! local precondition checks, an optional signature upload, the status
//! transition with its audit comment, then a delayed best-effort refresh.
//! There is no server-side atomicity between the upload and the transition; a
//! failure in between leaves the application signed but untransitioned, and the
//! next attempt sees the persisted signature and goes straight to the
//! transition.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::api::{ApiError, CertificationApi, StatusUpdate};
use super::domain::{Application, ApplicationId, AuditLogEntry, Document, ReviewerRole};
use super::session::ReviewerSession;
use super::signature::SignatureArtifact;
use super::status::{authorize_transition, ReviewDecision, TransitionError, TransitionRule};
use crate::config::ReviewConfig;

pub type UpdateHandler = Arc<dyn Fn(&Application) + Send + Sync>;
pub type BackHandler = Arc<dyn Fn() + Send + Sync>;

/// Application plus the collections shown alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewSnapshot {
    pub application: Application,
    pub documents: Vec<Document>,
    pub audit_log: Vec<AuditLogEntry>,
}

impl ReviewSnapshot {
    pub async fn fetch<A>(api: &A, id: &ApplicationId) -> Result<Self, ApiError>
    where
        A: CertificationApi + ?Sized,
    {
        let (application, documents, audit_log) = tokio::try_join!(
            api.get_application_by_id(id),
            api.get_documents_for_application(id),
            api.get_audit_logs_for_application(id),
        )?;
        Ok(Self {
            application,
            documents,
            audit_log,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Shown next to the form; the user fixes their input.
    Inline,
    /// Transient banner for request failures; the user retries.
    Toast,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStep {
    AttachSignature,
    RecordTransition,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    Committed(Application),
    /// Refused locally; nothing was sent.
    Invalid(Notice),
    Failed { step: SubmissionStep, notice: Notice },
}

impl SubmissionOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, SubmissionOutcome::Committed(_))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("please add a comment before submitting")]
    EmptyComment,
    #[error("please sign the application before approving")]
    SignatureRequired,
    #[error("the captured signature has no file to upload; please sign again")]
    SignaturePayloadMissing,
    #[error("{decision} is not available to {role} reviewers")]
    DecisionUnavailable {
        decision: &'static str,
        role: ReviewerRole,
    },
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("failed to sign the application, please try again")]
    Signing(#[source] ApiError),
    #[error("failed to update the application status, please try again")]
    Recording(#[source] ApiError),
}

impl ReviewError {
    pub fn notice(&self) -> Notice {
        let level = match self {
            ReviewError::Signing(_) | ReviewError::Recording(_) => NoticeLevel::Toast,
            _ => NoticeLevel::Inline,
        };
        Notice {
            level,
            message: self.to_string(),
        }
    }
}

/// Review screen state for one application.
pub struct ApplicationReview<A> {
    api: Arc<A>,
    role: ReviewerRole,
    reviewer: String,
    snapshot: Arc<Mutex<ReviewSnapshot>>,
    comment: String,
    pending_signature: Option<SignatureArtifact>,
    /// Set once the sign call succeeds, whatever the response body carries.
    signature_persisted: bool,
    notices: Vec<Notice>,
    on_update: Option<UpdateHandler>,
    on_back: Option<BackHandler>,
    refresh_delay: Duration,
    refresh: Option<JoinHandle<()>>,
}

impl<A> ApplicationReview<A>
where
    A: CertificationApi + 'static,
{
    pub fn new(
        api: Arc<A>,
        session: &ReviewerSession,
        snapshot: ReviewSnapshot,
        config: &ReviewConfig,
    ) -> Self {
        Self {
            api,
            role: session.role,
            reviewer: session.display_name.clone(),
            snapshot: Arc::new(Mutex::new(snapshot)),
            comment: String::new(),
            pending_signature: None,
            signature_persisted: false,
            notices: Vec::new(),
            on_update: None,
            on_back: None,
            refresh_delay: config.refresh_delay,
            refresh: None,
        }
    }

    /// Load the application with its documents and audit trail.
    pub async fn open(
        api: Arc<A>,
        session: &ReviewerSession,
        id: &ApplicationId,
        config: &ReviewConfig,
    ) -> Result<Self, ApiError> {
        let snapshot = ReviewSnapshot::fetch(api.as_ref(), id).await?;
        Ok(Self::new(api, session, snapshot, config))
    }

    pub fn with_update_handler(mut self, handler: UpdateHandler) -> Self {
        self.on_update = Some(handler);
        self
    }

    pub fn with_back_handler(mut self, handler: BackHandler) -> Self {
        self.on_back = Some(handler);
        self
    }

    pub fn role(&self) -> ReviewerRole {
        self.role
    }

    pub fn snapshot(&self) -> ReviewSnapshot {
        self.snapshot.lock().expect("snapshot mutex poisoned").clone()
    }

    pub fn application(&self) -> Application {
        self.snapshot
            .lock()
            .expect("snapshot mutex poisoned")
            .application
            .clone()
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.comment = comment.into();
    }

    /// Hold a finished capture until the next submission uploads it.
    pub fn attach_capture(&mut self, artifact: SignatureArtifact) {
        self.pending_signature = Some(artifact);
    }

    pub fn discard_capture(&mut self) {
        self.pending_signature = None;
    }

    pub fn pending_signature(&self) -> Option<&SignatureArtifact> {
        self.pending_signature.as_ref()
    }

    /// Signed means persisted on the record, accepted by the sign call, or
    /// captured and awaiting upload.
    pub fn is_signed(&self) -> bool {
        self.pending_signature.is_some()
            || self.signature_persisted
            || self.application().is_signed()
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Decisions the current role may take from the current status.
    pub fn available_decisions(&self) -> Vec<ReviewDecision> {
        let status = self.application().current_status;
        [
            ReviewDecision::Approve,
            ReviewDecision::Forward,
            ReviewDecision::Hold,
            ReviewDecision::Reject,
        ]
        .into_iter()
        .filter(|decision| {
            decision
                .target_status(self.role)
                .map(|target| authorize_transition(self.role, status, target).is_ok())
                .unwrap_or(false)
        })
        .collect()
    }

    pub fn back(&self) {
        if let Some(handler) = &self.on_back {
            handler();
        }
    }

    pub async fn approve(&mut self) -> SubmissionOutcome {
        self.submit(ReviewDecision::Approve).await
    }

    pub async fn reject(&mut self) -> SubmissionOutcome {
        self.submit(ReviewDecision::Reject).await
    }

    /// Run the decision protocol. Failures become notices and never escape.
    pub async fn submit(&mut self, decision: ReviewDecision) -> SubmissionOutcome {
        let rule = match self.check_preconditions(decision) {
            Ok(rule) => rule,
            Err(err) => {
                let notice = err.notice();
                debug!(decision = decision.label(), reason = %err, "decision refused locally");
                self.notices.push(notice.clone());
                return SubmissionOutcome::Invalid(notice);
            }
        };

        match self.run(decision, rule).await {
            Ok(application) => SubmissionOutcome::Committed(application),
            Err((step, err)) => {
                warn!(
                    decision = decision.label(),
                    ?step,
                    error = %err,
                    "decision submission failed"
                );
                let notice = err.notice();
                self.notices.push(notice.clone());
                SubmissionOutcome::Failed { step, notice }
            }
        }
    }

    fn check_preconditions(
        &self,
        decision: ReviewDecision,
    ) -> Result<TransitionRule, ReviewError> {
        if self.comment.trim().is_empty() {
            return Err(ReviewError::EmptyComment);
        }

        let target = decision
            .target_status(self.role)
            .ok_or(ReviewError::DecisionUnavailable {
                decision: decision.label(),
                role: self.role,
            })?;
        let rule = authorize_transition(self.role, self.application().current_status, target)?;

        if rule.requires_signature {
            if !self.is_signed() {
                return Err(ReviewError::SignatureRequired);
            }
            if let Some(pending) = &self.pending_signature {
                if pending.file.is_none() {
                    return Err(ReviewError::SignaturePayloadMissing);
                }
            }
        }

        Ok(rule)
    }

    async fn run(
        &mut self,
        decision: ReviewDecision,
        rule: TransitionRule,
    ) -> Result<Application, (SubmissionStep, ReviewError)> {
        let id = self.application().id;

        if rule.requires_signature {
            if let Some(file) = self
                .pending_signature
                .as_ref()
                .and_then(|pending| pending.file.clone())
            {
                let signed = self
                    .api
                    .sign_application(&id, &file)
                    .await
                    .map_err(|err| (SubmissionStep::AttachSignature, ReviewError::Signing(err)))?;
                self.replace_application(signed);
                self.signature_persisted = true;
                self.pending_signature = None;
                info!(application_id = %id, reviewer = %self.reviewer, "signature attached");
            }
        }

        let update = StatusUpdate {
            status: rule.to,
            comment: self.comment.clone(),
        };
        let updated = self
            .api
            .update_application_status(&id, &update)
            .await
            .map_err(|err| (SubmissionStep::RecordTransition, ReviewError::Recording(err)))?;

        self.replace_application(updated.clone());
        self.comment.clear();
        self.pending_signature = None;
        info!(
            application_id = %id,
            reviewer = %self.reviewer,
            decision = decision.label(),
            from = %rule.from,
            to = %updated.current_status,
            "status transition recorded"
        );

        if let Some(handler) = &self.on_update {
            handler(&updated);
        }
        self.schedule_refresh(id);

        Ok(updated)
    }

    fn replace_application(&self, application: Application) {
        self.snapshot
            .lock()
            .expect("snapshot mutex poisoned")
            .application = application;
    }

    // Last write wins: a refresh landing after a later local change overwrites it.
    fn schedule_refresh(&mut self, id: ApplicationId) {
        let api = Arc::clone(&self.api);
        let snapshot = Arc::clone(&self.snapshot);
        let delay = self.refresh_delay;

        self.refresh = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match ReviewSnapshot::fetch(api.as_ref(), &id).await {
                Ok(fresh) => {
                    *snapshot.lock().expect("snapshot mutex poisoned") = fresh;
                    debug!(application_id = %id, "review snapshot refreshed");
                }
                Err(err) => {
                    warn!(application_id = %id, error = %err, "post-commit refresh failed");
                }
            }
        }));
    }

    /// Wait for the most recent post-commit refresh, if one is in flight.
    pub async fn settle(&mut self) {
        if let Some(handle) = self.refresh.take() {
            if let Err(err) = handle.await {
                warn!(error = %err, "post-commit refresh task aborted");
            }
        }
    }
}
