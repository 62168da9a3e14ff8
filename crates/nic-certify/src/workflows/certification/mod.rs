//! NIC certification review: the GN sign-off and DS forwarding chain.

pub mod api;
pub mod dashboard;
pub mod domain;
pub mod http;
pub mod review;
pub mod session;
pub mod signature;
pub mod status;

#[cfg(test)]
mod tests;

pub use api::{ApiError, CertificationApi, StatusUpdate};
pub use dashboard::{
    audit_timeline, filter_queue, queue_page, tab_counts, Page, QueueQuery, QueueTab,
};
pub use domain::{
    ApplicantProfile, Application, ApplicationId, ApplicationStatus, ApplicationType,
    AuditLogEntry, Document, ReviewerRole, SignatureRecord,
};
pub use http::HttpCertificationApi;
pub use review::{
    ApplicationReview, Notice, NoticeLevel, ReviewError, ReviewSnapshot, SubmissionOutcome,
    SubmissionStep,
};
pub use session::{
    FileSessionStore, MemorySessionStore, ReviewerSession, SessionError, SessionStore,
};
pub use signature::{
    CaptureMode, Point, SignatureArtifact, SignatureCapture, SignatureError, SignatureFile,
    SignatureSettings,
};
pub use status::{authorize_transition, ReviewDecision, TransitionError, TransitionRule};
