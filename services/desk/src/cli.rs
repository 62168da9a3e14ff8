use crate::commands::{
    run_decide, run_export, run_queue, run_session, run_show, DecideArgs, ExportArgs, QueueArgs,
    SessionCommand, ShowArgs,
};
use crate::demo::{run_demo, DemoArgs};
use clap::{Parser, Subcommand, ValueEnum};
use nic_certify::error::AppError;
use nic_certify::workflows::certification::{QueueTab, ReviewDecision, ReviewerRole};

#[derive(Parser, Debug)]
#[command(
    name = "NIC Certification Desk",
    about = "Review NIC applications as a Grama Niladhari or Divisional Secretariat officer",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the review queue for the signed-in role (default command)
    Queue(QueueArgs),
    /// Show one application with its documents and audit trail
    Show(ShowArgs),
    /// Record a decision, signing first when the transition needs it
    Decide(DecideArgs),
    /// Write the filtered queue as CSV
    Export(ExportArgs),
    /// Store, inspect or clear the reviewer session used by other commands
    Session {
        #[command(subcommand)]
        command: SessionCommand,
    },
    /// Walk an application through GN sign-off and DS forwarding against an in-memory registry
    Demo(DemoArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum TabArg {
    #[default]
    Pending,
    Approved,
    OnHold,
    Forwarded,
    Rejected,
    All,
}

impl From<TabArg> for QueueTab {
    fn from(value: TabArg) -> Self {
        match value {
            TabArg::Pending => QueueTab::Pending,
            TabArg::Approved => QueueTab::Approved,
            TabArg::OnHold => QueueTab::OnHold,
            TabArg::Forwarded => QueueTab::Forwarded,
            TabArg::Rejected => QueueTab::Rejected,
            TabArg::All => QueueTab::All,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DecisionArg {
    Approve,
    Reject,
    Forward,
    Hold,
}

impl From<DecisionArg> for ReviewDecision {
    fn from(value: DecisionArg) -> Self {
        match value {
            DecisionArg::Approve => ReviewDecision::Approve,
            DecisionArg::Reject => ReviewDecision::Reject,
            DecisionArg::Forward => ReviewDecision::Forward,
            DecisionArg::Hold => ReviewDecision::Hold,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RoleArg {
    Gn,
    Ds,
}

impl From<RoleArg> for ReviewerRole {
    fn from(value: RoleArg) -> Self {
        match value {
            RoleArg::Gn => ReviewerRole::GramaNiladhari,
            RoleArg::Ds => ReviewerRole::DivisionalSecretariat,
        }
    }
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Queue(QueueArgs::default()));

    match command {
        Command::Queue(args) => run_queue(args).await,
        Command::Show(args) => run_show(args).await,
        Command::Decide(args) => run_decide(args).await,
        Command::Export(args) => run_export(args).await,
        Command::Session { command } => run_session(command),
        Command::Demo(args) => run_demo(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_the_queue() {
        let cli = Cli::try_parse_from(["nic-certify-desk"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn parses_a_signed_approval() {
        let cli = Cli::try_parse_from([
            "nic-certify-desk",
            "decide",
            "A1",
            "approve",
            "--comment",
            "Verified in person",
            "--signature",
            "scan.png",
        ])
        .expect("parses");
        match cli.command {
            Some(Command::Decide(args)) => {
                assert_eq!(args.id, "A1");
                assert_eq!(args.decision, DecisionArg::Approve);
                assert_eq!(args.comment, "Verified in person");
                assert!(args.signature.is_some());
            }
            other => panic!("expected decide, got {other:?}"),
        }
    }

    #[test]
    fn signature_sources_are_exclusive() {
        let result = Cli::try_parse_from([
            "nic-certify-desk",
            "decide",
            "A1",
            "approve",
            "--comment",
            "ok",
            "--signature",
            "scan.png",
            "--draw",
            "strokes.json",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn tab_names_use_kebab_case() {
        let cli = Cli::try_parse_from(["nic-certify-desk", "queue", "--tab", "on-hold"])
            .expect("parses");
        match cli.command {
            Some(Command::Queue(args)) => assert_eq!(QueueTab::from(args.tab), QueueTab::OnHold),
            other => panic!("expected queue, got {other:?}"),
        }
    }
}
