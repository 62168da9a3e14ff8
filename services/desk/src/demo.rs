use crate::commands::{render_queue, render_review};
use crate::infra::InMemoryRegistry;
use chrono::Utc;
use clap::Args;
use nic_certify::config::{AppConfig, ReviewConfig};
use nic_certify::error::AppError;
use nic_certify::telemetry;
use nic_certify::workflows::certification::{
    audit_timeline, queue_page, Application, ApplicationId, ApplicationReview, CertificationApi,
    MemorySessionStore, Point, QueueQuery, QueueTab, ReviewDecision, ReviewerRole,
    ReviewerSession, SignatureCapture, SignatureSettings, SubmissionOutcome,
};
use std::sync::Arc;
use std::time::Duration;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Delay before the post-commit refresh, in milliseconds
    #[arg(long, default_value_t = 50)]
    pub(crate) refresh_delay_ms: u64,
    /// Stop after the GN sign-off
    #[arg(long)]
    pub(crate) skip_forwarding: bool,
}

const DEMO_APPLICATION: &str = "NIC-2025-0001";

fn demo_session(role: ReviewerRole) -> ReviewerSession {
    match role {
        ReviewerRole::GramaNiladhari => ReviewerSession {
            user_id: "gn-colombo-07".to_string(),
            display_name: "N. Silva".to_string(),
            role,
            access_token: "demo-gn-token".to_string(),
        },
        ReviewerRole::DivisionalSecretariat => ReviewerSession {
            user_id: "ds-colombo".to_string(),
            display_name: "R. Fernando".to_string(),
            role,
            access_token: "demo-ds-token".to_string(),
        },
    }
}

/// Swap the stored session and hand back what the store now holds.
fn sign_in(
    store: &MemorySessionStore,
    registry: &InMemoryRegistry,
    role: ReviewerRole,
) -> Result<ReviewerSession, AppError> {
    ReviewerSession::clear(store)?;
    demo_session(role).save(store)?;
    let session = ReviewerSession::require(store)?;
    registry.act_as(&session);
    println!(
        "\nSigned in as {} ({} reviewer)",
        session.display_name, session.role
    );
    Ok(session)
}

fn demo_strokes() -> Vec<Vec<Point>> {
    let underline = vec![Point::new(60.0, 165.0), Point::new(420.0, 160.0)];
    let flourish = (0..=40)
        .map(|step| {
            let x = 70.0 + step as f32 * 9.0;
            let y = 110.0 + (step as f32 / 3.0).sin() * 35.0;
            Point::new(x, y)
        })
        .collect();
    vec![flourish, underline]
}

fn report_outcome(outcome: &SubmissionOutcome) {
    match outcome {
        SubmissionOutcome::Committed(application) => println!(
            "  Recorded: {} is {}",
            application.id,
            application.current_status.display_label()
        ),
        SubmissionOutcome::Invalid(notice) => {
            println!("  Refused before sending: {}", notice.message)
        }
        SubmissionOutcome::Failed { step, notice } => {
            println!("  Request failed at {:?}: {}", step, notice.message)
        }
    }
}

fn print_timeline(review: &ApplicationReview<InMemoryRegistry>) {
    let snapshot = review.snapshot();
    println!("  Audit trail after refresh:");
    for entry in audit_timeline(&snapshot.audit_log) {
        println!("    - {}", entry.summary());
    }
}

async fn print_queue(
    registry: &InMemoryRegistry,
    role: ReviewerRole,
    tab: QueueTab,
    page_size: usize,
) -> Result<(), AppError> {
    let applications = registry.list_applications().await?;
    let query = QueueQuery::new(tab, page_size);
    let page = queue_page(&applications, role, &query);
    render_queue(role, &applications, &query, &page);
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        refresh_delay_ms,
        skip_forwarding,
    } = args;

    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    let review_config = ReviewConfig {
        refresh_delay: Duration::from_millis(refresh_delay_ms),
        ..config.review.clone()
    };
    let registry = Arc::new(InMemoryRegistry::seeded(Utc::now()));
    let store = MemorySessionStore::default();
    let id = ApplicationId::new(DEMO_APPLICATION);

    println!("NIC certification desk demo");
    let gn = sign_in(&store, &registry, ReviewerRole::GramaNiladhari)?;
    print_queue(&registry, gn.role, QueueTab::Pending, review_config.page_size).await?;

    println!();
    let mut review =
        ApplicationReview::open(Arc::clone(&registry), &gn, &id, &review_config)
            .await?
            .with_update_handler(Arc::new(|application: &Application| {
                println!(
                    "  Dashboard notified: {} -> {}",
                    application.id,
                    application.current_status.label()
                );
            }));
    render_review(&review);

    println!("\nGN approves before signing");
    review.set_comment("Verified in person");
    report_outcome(&review.approve().await);

    println!("\nGN draws a signature and approves again");
    let mut capture = SignatureCapture::new(SignatureSettings {
        max_upload_bytes: review_config.signature_max_bytes,
        ..SignatureSettings::default()
    });
    for stroke in demo_strokes() {
        capture.add_stroke(stroke);
    }
    let artifact = capture.finalize().await?;
    println!(
        "  Captured {} byte PNG ({} character preview URL)",
        artifact.file.as_ref().map_or(0, |file| file.bytes.len()),
        artifact.preview.len()
    );
    review.attach_capture(artifact);
    report_outcome(&review.approve().await);
    review.settle().await;
    print_timeline(&review);

    if skip_forwarding {
        return Ok(());
    }

    let ds = sign_in(&store, &registry, ReviewerRole::DivisionalSecretariat)?;
    print_queue(&registry, ds.role, QueueTab::Pending, review_config.page_size).await?;

    let mut review =
        ApplicationReview::open(Arc::clone(&registry), &ds, &id, &review_config).await?;
    let choices = review
        .available_decisions()
        .into_iter()
        .map(ReviewDecision::label)
        .collect::<Vec<_>>();
    println!("\nDS options for {id}: {}", choices.join(", "));

    println!("DS places the application on hold");
    review.set_comment("Awaiting police clearance");
    report_outcome(&review.submit(ReviewDecision::Hold).await);

    println!("DS forwards to DRP");
    review.set_comment("Police clearance received, forwarding");
    report_outcome(&review.submit(ReviewDecision::Forward).await);
    review.settle().await;
    print_timeline(&review);

    println!();
    print_queue(&registry, ds.role, QueueTab::Forwarded, review_config.page_size).await?;
    Ok(())
}
