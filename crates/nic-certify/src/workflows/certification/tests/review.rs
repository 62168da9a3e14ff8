use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::common::*;
use crate::workflows::certification::api::StatusUpdate;
use crate::workflows::certification::domain::{Application, ApplicationId, ApplicationStatus};
use crate::workflows::certification::review::{
    ApplicationReview, NoticeLevel, SubmissionOutcome, SubmissionStep,
};
use crate::workflows::certification::status::ReviewDecision;

#[tokio::test]
async fn approve_without_any_signature_makes_no_calls() {
    let api = RecordingApi::with([application("A1", ApplicationStatus::Submitted)]);
    let mut review = open_review(&api, &gn_session(), "A1").await;
    let reads = api.calls().len();
    review.set_comment("Verified in person");

    let outcome = review.approve().await;

    match outcome {
        SubmissionOutcome::Invalid(notice) => {
            assert_eq!(notice.level, NoticeLevel::Inline);
            assert!(notice.message.contains("sign"));
        }
        other => panic!("expected local refusal, got {other:?}"),
    }
    assert_eq!(api.calls().len(), reads);
    assert_eq!(review.comment(), "Verified in person");
}

#[tokio::test]
async fn whitespace_comment_is_refused_for_every_decision() {
    let api = RecordingApi::with([application("A1", ApplicationStatus::Submitted)]);
    let mut review = open_review(&api, &gn_session(), "A1").await;
    review.attach_capture(png_artifact());
    review.set_comment("   \n\t");
    let reads = api.calls().len();

    for decision in [ReviewDecision::Approve, ReviewDecision::Reject] {
        let outcome = review.submit(decision).await;
        assert!(matches!(outcome, SubmissionOutcome::Invalid(_)));
    }
    assert_eq!(api.calls().len(), reads);
    assert!(review.pending_signature().is_some());
    assert_eq!(review.notices().len(), 2);
}

#[tokio::test]
async fn pending_signature_is_uploaded_before_status_change() {
    let api = RecordingApi::with([application("A1", ApplicationStatus::Submitted)]);
    let mut review = open_review(&api, &gn_session(), "A1").await;
    review.attach_capture(png_artifact());
    review.set_comment("Verified in person");

    let outcome = review.approve().await;

    let application = match outcome {
        SubmissionOutcome::Committed(application) => application,
        other => panic!("expected commit, got {other:?}"),
    };
    assert_eq!(application.current_status, ApplicationStatus::ApprovedByGn);
    assert_eq!(
        api.writes(),
        vec![
            ApiCall::Sign(ApplicationId::new("A1"), png_artifact().file.expect("file").bytes),
            ApiCall::UpdateStatus(
                ApplicationId::new("A1"),
                StatusUpdate {
                    status: ApplicationStatus::ApprovedByGn,
                    comment: "Verified in person".to_string(),
                }
            ),
        ]
    );
    assert_eq!(review.comment(), "");
    assert!(review.pending_signature().is_none());
    assert!(review.application().is_signed());
}

#[tokio::test]
async fn failed_signing_keeps_capture_and_skips_status_call() {
    let api = RecordingApi::with([application("A1", ApplicationStatus::Submitted)]);
    api.fail_sign(true);
    let mut review = open_review(&api, &gn_session(), "A1").await;
    review.attach_capture(png_artifact());
    review.set_comment("Verified in person");

    let outcome = review.approve().await;

    match outcome {
        SubmissionOutcome::Failed { step, notice } => {
            assert_eq!(step, SubmissionStep::AttachSignature);
            assert_eq!(notice.level, NoticeLevel::Toast);
        }
        other => panic!("expected signing failure, got {other:?}"),
    }
    assert!(api
        .writes()
        .iter()
        .all(|call| !matches!(call, ApiCall::UpdateStatus(..))));
    assert_eq!(review.pending_signature(), Some(&png_artifact()));
    assert_eq!(review.comment(), "Verified in person");
    assert_eq!(
        review.application().current_status,
        ApplicationStatus::Submitted
    );

    api.fail_sign(false);
    let retry = review.approve().await;
    assert!(retry.is_committed());
    assert_eq!(api.writes().len(), 3);
}

#[tokio::test]
async fn persisted_signature_skips_upload() {
    let api = RecordingApi::with([signed(application("A1", ApplicationStatus::Submitted))]);
    let mut review = open_review(&api, &gn_session(), "A1").await;
    assert!(review.is_signed());
    review.set_comment("Signed last week, approving now");

    let outcome = review.approve().await;

    assert!(outcome.is_committed());
    assert_eq!(
        api.writes(),
        vec![ApiCall::UpdateStatus(
            ApplicationId::new("A1"),
            StatusUpdate {
                status: ApplicationStatus::ApprovedByGn,
                comment: "Signed last week, approving now".to_string(),
            }
        )]
    );
}

#[tokio::test]
async fn status_failure_leaves_signature_attached_and_retry_skips_upload() {
    let api = RecordingApi::with([application("A1", ApplicationStatus::Submitted)]);
    api.fail_status(true);
    let mut review = open_review(&api, &gn_session(), "A1").await;
    review.attach_capture(png_artifact());
    review.set_comment("Verified in person");

    let outcome = review.approve().await;
    assert!(matches!(
        outcome,
        SubmissionOutcome::Failed {
            step: SubmissionStep::RecordTransition,
            ..
        }
    ));
    assert!(api.stored("A1").is_signed());
    assert!(review.pending_signature().is_none());
    assert!(review.is_signed());
    assert_eq!(review.comment(), "Verified in person");

    api.fail_status(false);
    assert!(review.approve().await.is_committed());
    let signs = api
        .writes()
        .into_iter()
        .filter(|call| matches!(call, ApiCall::Sign(..)))
        .count();
    assert_eq!(signs, 1);
}

#[tokio::test]
async fn rejection_never_uploads_even_with_pending_capture() {
    let api = RecordingApi::with([application("A2", ApplicationStatus::Submitted)]);
    let mut review = open_review(&api, &gn_session(), "A2").await;
    review.attach_capture(png_artifact());
    review.set_comment("Birth certificate is illegible");

    let outcome = review.reject().await;

    assert!(outcome.is_committed());
    assert_eq!(
        api.writes(),
        vec![ApiCall::UpdateStatus(
            ApplicationId::new("A2"),
            StatusUpdate {
                status: ApplicationStatus::RejectedByGn,
                comment: "Birth certificate is illegible".to_string(),
            }
        )]
    );
}

#[tokio::test]
async fn rejection_needs_only_a_comment() {
    let api = RecordingApi::with([application("A2", ApplicationStatus::Submitted)]);
    let mut review = open_review(&api, &gn_session(), "A2").await;
    review.set_comment("Duplicate application");

    let outcome = review.reject().await;

    match outcome {
        SubmissionOutcome::Committed(application) => {
            assert_eq!(application.current_status, ApplicationStatus::RejectedByGn)
        }
        other => panic!("expected commit, got {other:?}"),
    }
    assert_eq!(api.writes().len(), 1);
}

#[tokio::test]
async fn update_handler_receives_the_new_snapshot() {
    let api = RecordingApi::with([signed(application("A3", ApplicationStatus::ApprovedByGn))]);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let mut review = open_review(&api, &ds_session(), "A3")
        .await
        .with_update_handler(Arc::new(move |application: &Application| {
            sink.lock()
                .expect("lock")
                .push(application.current_status);
        }));
    review.set_comment("Forwarding to DRP");

    assert!(review.submit(ReviewDecision::Forward).await.is_committed());
    assert_eq!(
        *seen.lock().expect("lock"),
        vec![ApplicationStatus::SentToDrp]
    );
}

#[tokio::test]
async fn ds_hold_then_forward() {
    let api = RecordingApi::with([signed(application("A4", ApplicationStatus::ApprovedByGn))]);
    let mut review = open_review(&api, &ds_session(), "A4").await;
    assert_eq!(
        review.available_decisions(),
        vec![
            ReviewDecision::Forward,
            ReviewDecision::Hold,
            ReviewDecision::Reject
        ]
    );

    review.set_comment("Awaiting police report");
    assert!(review.submit(ReviewDecision::Hold).await.is_committed());
    assert_eq!(
        review.application().current_status,
        ApplicationStatus::OnHoldByDs
    );

    review.set_comment("Police report received");
    assert!(review.submit(ReviewDecision::Forward).await.is_committed());
    assert_eq!(
        review.application().current_status,
        ApplicationStatus::SentToDrp
    );
    assert!(review.available_decisions().is_empty());
}

#[tokio::test]
async fn wrong_role_is_refused_locally() {
    let api = RecordingApi::with([application("A5", ApplicationStatus::Submitted)]);
    let mut review = open_review(&api, &ds_session(), "A5").await;
    review.set_comment("Trying to skip the GN");

    let forward = review.submit(ReviewDecision::Forward).await;
    let approve = review.submit(ReviewDecision::Approve).await;

    assert!(matches!(forward, SubmissionOutcome::Invalid(_)));
    assert!(matches!(approve, SubmissionOutcome::Invalid(_)));
    assert!(api.writes().is_empty());
}

#[tokio::test]
async fn capture_without_file_payload_is_refused() {
    let api = RecordingApi::with([application("A6", ApplicationStatus::Submitted)]);
    let mut review = open_review(&api, &gn_session(), "A6").await;
    let mut artifact = png_artifact();
    artifact.file = None;
    review.attach_capture(artifact);
    review.set_comment("Verified");

    assert!(matches!(
        review.approve().await,
        SubmissionOutcome::Invalid(_)
    ));
    assert!(api.writes().is_empty());
}

#[tokio::test]
async fn refresh_reconciles_server_side_changes() {
    let api = RecordingApi::with([application("A7", ApplicationStatus::Submitted)]);
    let mut review = open_review(&api, &gn_session(), "A7").await;
    review.set_comment("Rejected: wrong division");
    assert!(review.reject().await.is_committed());

    api.edit("A7", |application| {
        application.applicant.phone = "0779999999".to_string()
    });
    review.settle().await;

    let snapshot = review.snapshot();
    assert_eq!(snapshot.application.applicant.phone, "0779999999");
    assert_eq!(snapshot.audit_log.len(), 1);
    assert_eq!(snapshot.audit_log[0].comment, "Rejected: wrong division");
    assert_eq!(snapshot.documents.len(), 1);
}

#[tokio::test]
async fn refresh_failure_is_silent_and_keeps_the_commit() {
    let api = RecordingApi::with([application("A8", ApplicationStatus::Submitted)]);
    let mut review = open_review(&api, &gn_session(), "A8").await;
    review.set_comment("Not resident in this division");
    assert!(review.reject().await.is_committed());
    let notices_after_commit = review.notices().len();

    api.fail_reads(true);
    review.settle().await;

    assert_eq!(
        review.application().current_status,
        ApplicationStatus::RejectedByGn
    );
    assert_eq!(review.notices().len(), notices_after_commit);
}

#[tokio::test]
async fn back_handler_is_invoked() {
    let api = RecordingApi::with([application("A9", ApplicationStatus::Submitted)]);
    let presses = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&presses);
    let review = ApplicationReview::new(
        Arc::new(api.clone()),
        &gn_session(),
        snapshot_of(application("A9", ApplicationStatus::Submitted)),
        &review_config(),
    )
    .with_back_handler(Arc::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    review.back();
    assert_eq!(presses.load(Ordering::SeqCst), 1);
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn accepted_signature_is_remembered_when_response_omits_it() {
    let api = RecordingApi::with([application("A10", ApplicationStatus::Submitted)]);
    api.sign_omits_signature(true);
    api.fail_status(true);
    let mut review = open_review(&api, &gn_session(), "A10").await;
    review.attach_capture(png_artifact());
    review.set_comment("Verified in person");

    let first = review.approve().await;
    assert!(matches!(
        first,
        SubmissionOutcome::Failed {
            step: SubmissionStep::RecordTransition,
            ..
        }
    ));
    assert!(!review.application().is_signed());
    assert!(review.pending_signature().is_none());
    assert!(review.is_signed());

    api.fail_status(false);
    let retry = review.approve().await;
    assert!(retry.is_committed(), "unexpected retry outcome {retry:?}");
    let signs = api
        .writes()
        .into_iter()
        .filter(|call| matches!(call, ApiCall::Sign(..)))
        .count();
    assert_eq!(signs, 1);
}
