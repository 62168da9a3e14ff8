use crate::cli::{DecisionArg, RoleArg, TabArg};
use clap::{Args, Subcommand};
use nic_certify::config::AppConfig;
use nic_certify::error::AppError;
use nic_certify::telemetry;
use nic_certify::workflows::certification::{
    audit_timeline, filter_queue, queue_page, tab_counts, Application, ApplicationId,
    ApplicationReview, CertificationApi, FileSessionStore, HttpCertificationApi, Page, Point,
    QueueQuery, ReviewDecision, ReviewSnapshot, ReviewerRole, ReviewerSession, SignatureArtifact,
    SignatureCapture, SignatureSettings, SubmissionOutcome,
};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Args, Debug, Default)]
pub(crate) struct QueueArgs {
    /// Status tab to list
    #[arg(long, value_enum, default_value_t = TabArg::Pending)]
    pub(crate) tab: TabArg,
    /// Case-insensitive match on applicant name, phone, NIC number or application id
    #[arg(long)]
    pub(crate) search: Option<String>,
    /// 1-based page number; out-of-range pages clamp
    #[arg(long, default_value_t = 1)]
    pub(crate) page: usize,
    /// Override the configured page size
    #[arg(long)]
    pub(crate) page_size: Option<usize>,
    /// Print the page as JSON instead of a table
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ShowArgs {
    /// Application id
    pub(crate) id: String,
}

#[derive(Args, Debug)]
pub(crate) struct DecideArgs {
    /// Application id
    pub(crate) id: String,
    /// Decision to record
    #[arg(value_enum)]
    pub(crate) decision: DecisionArg,
    /// Audit comment; every decision needs one
    #[arg(long, default_value = "")]
    pub(crate) comment: String,
    /// Image file to upload as the signature
    #[arg(long, conflicts_with = "draw")]
    pub(crate) signature: Option<PathBuf>,
    /// JSON strokes (`[[{"x":1,"y":2}, ...], ...]`) rendered into a PNG signature
    #[arg(long)]
    pub(crate) draw: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct ExportArgs {
    /// Status tab to export
    #[arg(long, value_enum, default_value_t = TabArg::All)]
    pub(crate) tab: TabArg,
    /// Case-insensitive match on applicant name, phone, NIC number or application id
    #[arg(long)]
    pub(crate) search: Option<String>,
    /// Destination file; stdout when omitted
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub(crate) enum SessionCommand {
    /// Persist the reviewer identity and access token
    Set(SessionSetArgs),
    /// Print the stored reviewer
    Show,
    /// Remove the stored session
    Clear,
}

#[derive(Args, Debug)]
pub(crate) struct SessionSetArgs {
    #[arg(long)]
    pub(crate) user_id: String,
    /// Name recorded against audit entries
    #[arg(long)]
    pub(crate) name: String,
    #[arg(long, value_enum)]
    pub(crate) role: RoleArg,
    /// Bearer token issued by the registry
    #[arg(long)]
    pub(crate) token: String,
}

/// Configuration, reviewer and registry client shared by the online commands.
struct Desk {
    config: AppConfig,
    session: ReviewerSession,
    api: Arc<HttpCertificationApi>,
}

impl Desk {
    fn connect() -> Result<Self, AppError> {
        let config = AppConfig::load()?;
        telemetry::init(&config.telemetry)?;

        let store = FileSessionStore::new(config.session.session_file.clone());
        let session = ReviewerSession::require(&store)?;
        let api = HttpCertificationApi::new(&config.api, Some(session.access_token.clone()))?;

        info!(
            ?config.environment,
            role = %session.role,
            base_url = %config.api.base_url,
            "reviewer desk connected"
        );
        Ok(Self {
            config,
            session,
            api: Arc::new(api),
        })
    }
}

pub(crate) async fn run_queue(args: QueueArgs) -> Result<(), AppError> {
    let desk = Desk::connect()?;
    let applications = desk.api.list_applications().await?;

    let page_size = args.page_size.unwrap_or(desk.config.review.page_size);
    let mut query = QueueQuery::new(args.tab.into(), page_size);
    query.search = args.search.unwrap_or_default();
    query.page = args.page;
    let page = queue_page(&applications, desk.session.role, &query);

    if args.json {
        let rendered = serde_json::to_string_pretty(&page)
            .map_err(|err| AppError::Usage(format!("failed to render queue page: {err}")))?;
        println!("{rendered}");
    } else {
        render_queue(desk.session.role, &applications, &query, &page);
    }
    Ok(())
}

pub(crate) async fn run_show(args: ShowArgs) -> Result<(), AppError> {
    let desk = Desk::connect()?;
    let id = ApplicationId::new(args.id.trim());
    let snapshot = ReviewSnapshot::fetch(desk.api.as_ref(), &id).await?;
    let review = ApplicationReview::new(
        Arc::clone(&desk.api),
        &desk.session,
        snapshot,
        &desk.config.review,
    );
    render_review(&review);
    Ok(())
}

pub(crate) async fn run_decide(args: DecideArgs) -> Result<(), AppError> {
    let desk = Desk::connect()?;
    let id = ApplicationId::new(args.id.trim());
    let decision = ReviewDecision::from(args.decision);

    let mut review = ApplicationReview::open(
        Arc::clone(&desk.api),
        &desk.session,
        &id,
        &desk.config.review,
    )
    .await?
    .with_update_handler(Arc::new(|application: &Application| {
        println!(
            "Application {} is now {}",
            application.id,
            application.current_status.display_label()
        );
    }));

    let settings = SignatureSettings {
        max_upload_bytes: desk.config.review.signature_max_bytes,
        ..SignatureSettings::default()
    };
    if let Some(artifact) =
        capture_signature(settings, args.signature.as_deref(), args.draw.as_deref()).await?
    {
        review.attach_capture(artifact);
    }

    review.set_comment(args.comment);
    match review.submit(decision).await {
        SubmissionOutcome::Committed(_) => {
            review.settle().await;
            let snapshot = review.snapshot();
            if let Some(entry) = audit_timeline(&snapshot.audit_log).last() {
                println!("  {}", entry.summary());
            }
            Ok(())
        }
        SubmissionOutcome::Invalid(notice) => Err(AppError::Usage(notice.message)),
        SubmissionOutcome::Failed { step, notice } => Err(AppError::Usage(format!(
            "{} (failed at {:?})",
            notice.message, step
        ))),
    }
}

pub(crate) async fn run_export(args: ExportArgs) -> Result<(), AppError> {
    let desk = Desk::connect()?;
    let applications = desk.api.list_applications().await?;
    let search = args.search.unwrap_or_default();
    let rows = filter_queue(&applications, desk.session.role, args.tab.into(), &search);

    let written = match args.output {
        Some(path) => {
            let mut writer = csv::Writer::from_writer(File::create(&path)?);
            let written = write_rows(&mut writer, &rows)?;
            info!(rows = written, path = %path.display(), "queue exported");
            written
        }
        None => write_rows(&mut csv::Writer::from_writer(std::io::stdout()), &rows)?,
    };
    if written == 0 {
        info!("no applications matched the export filter");
    }
    Ok(())
}

pub(crate) fn run_session(command: SessionCommand) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    let store = FileSessionStore::new(config.session.session_file.clone());

    match command {
        SessionCommand::Set(args) => {
            let session = ReviewerSession {
                user_id: args.user_id,
                display_name: args.name,
                role: args.role.into(),
                access_token: args.token,
            };
            session.save(&store)?;
            println!(
                "Signed in as {} ({}) in {}",
                session.display_name,
                session.role,
                store.path().display()
            );
        }
        SessionCommand::Show => match ReviewerSession::load(&store)? {
            Some(session) => println!(
                "{} ({}) as {} reviewer",
                session.display_name, session.user_id, session.role
            ),
            None => println!("No reviewer session stored"),
        },
        SessionCommand::Clear => {
            ReviewerSession::clear(&store)?;
            println!("Reviewer session cleared");
        }
    }
    Ok(())
}

/// Build a signature artifact from an uploaded image or a strokes file, if either was given.
pub(crate) async fn capture_signature(
    settings: SignatureSettings,
    upload: Option<&Path>,
    strokes: Option<&Path>,
) -> Result<Option<SignatureArtifact>, AppError> {
    let mut capture = SignatureCapture::new(settings);

    if let Some(path) = upload {
        let bytes = std::fs::read(path)?;
        let content_type = mime_guess::from_path(path).first_or_octet_stream();
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("signature")
            .to_string();
        capture.select_file(file_name, content_type.essence_str(), bytes)?;
    } else if let Some(path) = strokes {
        let raw = std::fs::read_to_string(path)?;
        for stroke in parse_strokes(&raw)? {
            capture.add_stroke(stroke);
        }
    } else {
        return Ok(None);
    }

    Ok(Some(capture.finalize().await?))
}

fn parse_strokes(raw: &str) -> Result<Vec<Vec<Point>>, AppError> {
    serde_json::from_str(raw)
        .map_err(|err| AppError::Usage(format!("failed to parse signature strokes: {err}")))
}

pub(crate) fn render_queue(
    role: ReviewerRole,
    applications: &[Application],
    query: &QueueQuery,
    page: &Page<Application>,
) {
    let counts = tab_counts(applications, role)
        .into_iter()
        .map(|(tab, count)| format!("{} {}", tab.label(), count))
        .collect::<Vec<_>>()
        .join(" | ");
    println!("{role} queue [{counts}]");
    println!(
        "Tab {} | page {}/{} | {} matching",
        query.tab.label(),
        page.page,
        page.total_pages,
        page.total_items
    );

    if page.items.is_empty() {
        println!("  (no applications)");
        return;
    }
    for application in &page.items {
        println!(
            "  {:<14} {:<24} {:<12} {:<16} {}{}",
            application.id,
            application.applicant.full_name,
            application.applicant.phone,
            application.current_status.display_label(),
            application.application_type.label(),
            if application.is_signed() { " [signed]" } else { "" }
        );
    }
}

pub(crate) fn render_review<A>(review: &ApplicationReview<A>)
where
    A: CertificationApi + 'static,
{
    let snapshot = review.snapshot();
    let application = &snapshot.application;
    let applicant = &application.applicant;

    println!(
        "Application {} ({})",
        application.id,
        application.application_type.label()
    );
    println!("- Applicant: {} | {}", applicant.full_name, applicant.phone);
    if let Some(nic) = &applicant.nic_number {
        println!("- NIC number: {nic}");
    }
    if let Some(email) = &applicant.email {
        println!("- Email: {email}");
    }
    println!(
        "- Status: {} | signed: {}",
        application.current_status.display_label(),
        if review.is_signed() { "yes" } else { "no" }
    );
    println!(
        "- Filed {} | updated {}",
        application.created_at.format("%Y-%m-%d %H:%M"),
        application.updated_at.format("%Y-%m-%d %H:%M")
    );

    println!("Documents:");
    if snapshot.documents.is_empty() {
        println!("  (none)");
    }
    for document in &snapshot.documents {
        println!(
            "  - {} [{}] {}",
            document.download_name(),
            document.file_type,
            document.url
        );
    }

    println!("Audit trail:");
    if snapshot.audit_log.is_empty() {
        println!("  (no entries)");
    }
    for entry in audit_timeline(&snapshot.audit_log) {
        println!(
            "  {} {}",
            entry.created_at.format("%Y-%m-%d %H:%M"),
            entry.summary()
        );
    }

    let decisions = review
        .available_decisions()
        .into_iter()
        .map(ReviewDecision::label)
        .collect::<Vec<_>>();
    if decisions.is_empty() {
        println!("No decisions available to the {} reviewer", review.role());
    } else {
        println!("Available decisions: {}", decisions.join(", "));
    }
}

#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    id: &'a str,
    applicant: &'a str,
    phone: &'a str,
    nic_number: &'a str,
    application_type: &'static str,
    status: &'static str,
    signed: bool,
    created_at: String,
    updated_at: String,
}

impl<'a> From<&'a Application> for ExportRow<'a> {
    fn from(application: &'a Application) -> Self {
        Self {
            id: application.id.as_str(),
            applicant: &application.applicant.full_name,
            phone: &application.applicant.phone,
            nic_number: application.applicant.nic_number.as_deref().unwrap_or(""),
            application_type: application.application_type.label(),
            status: application.current_status.label(),
            signed: application.is_signed(),
            created_at: application.created_at.to_rfc3339(),
            updated_at: application.updated_at.to_rfc3339(),
        }
    }
}

fn write_rows<W: Write>(
    writer: &mut csv::Writer<W>,
    rows: &[&Application],
) -> Result<usize, AppError> {
    for application in rows {
        writer
            .serialize(ExportRow::from(*application))
            .map_err(|err| AppError::Io(err.into()))?;
    }
    writer.flush()?;
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use nic_certify::workflows::certification::{
        ApplicantProfile, ApplicationStatus, ApplicationType,
    };

    fn application(id: &str, nic: Option<&str>) -> Application {
        let at = Utc
            .with_ymd_and_hms(2025, 3, 14, 9, 0, 0)
            .single()
            .expect("timestamp");
        Application {
            id: ApplicationId::new(id),
            application_type: ApplicationType::NewNic,
            current_status: ApplicationStatus::Submitted,
            applicant: ApplicantProfile {
                full_name: "Perera, Sunil".to_string(),
                phone: "0712345678".to_string(),
                nic_number: nic.map(str::to_string),
                email: None,
            },
            created_at: at,
            updated_at: at,
            signature: None,
        }
    }

    #[test]
    fn export_writes_header_and_quoted_rows() {
        let applications = vec![
            application("A1", Some("851234567V")),
            application("A2", None),
        ];
        let rows: Vec<&Application> = applications.iter().collect();
        let mut writer = csv::Writer::from_writer(Vec::new());

        let written = write_rows(&mut writer, &rows).expect("export");
        let output = String::from_utf8(writer.into_inner().expect("flushed")).expect("utf8");
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(written, 2);
        assert_eq!(
            lines[0],
            "id,applicant,phone,nic_number,application_type,status,signed,created_at,updated_at"
        );
        assert_eq!(
            lines[1],
            "A1,\"Perera, Sunil\",0712345678,851234567V,New NIC,SUBMITTED,false,2025-03-14T09:00:00+00:00,2025-03-14T09:00:00+00:00"
        );
        assert!(lines[2].starts_with("A2,\"Perera, Sunil\",0712345678,,"));
    }

    #[test]
    fn strokes_parse_from_point_arrays() {
        let strokes = parse_strokes(r#"[[{"x":1,"y":2},{"x":3.5,"y":4}],[]]"#).expect("parses");
        assert_eq!(strokes.len(), 2);
        assert_eq!(strokes[0][1], Point::new(3.5, 4.0));
        assert!(parse_strokes("{not json").is_err());
    }

    #[tokio::test]
    async fn no_signature_source_yields_nothing() {
        let artifact = capture_signature(SignatureSettings::default(), None, None)
            .await
            .expect("no-op");
        assert!(artifact.is_none());
    }
}
