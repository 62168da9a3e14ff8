use serde::{Deserialize, Serialize};

use super::domain::{ApplicationStatus, ReviewerRole};

/// One permitted edge of the application lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRule {
    pub from: ApplicationStatus,
    pub to: ApplicationStatus,
    pub role: ReviewerRole,
    pub requires_signature: bool,
}

const fn rule(
    from: ApplicationStatus,
    to: ApplicationStatus,
    role: ReviewerRole,
    requires_signature: bool,
) -> TransitionRule {
    TransitionRule {
        from,
        to,
        role,
        requires_signature,
    }
}

/// Every client-initiated edge. Anything absent here is refused locally.
pub const TRANSITION_RULES: [TransitionRule; 7] = [
    rule(
        ApplicationStatus::Submitted,
        ApplicationStatus::ApprovedByGn,
        ReviewerRole::GramaNiladhari,
        true,
    ),
    rule(
        ApplicationStatus::Submitted,
        ApplicationStatus::RejectedByGn,
        ReviewerRole::GramaNiladhari,
        false,
    ),
    rule(
        ApplicationStatus::ApprovedByGn,
        ApplicationStatus::SentToDrp,
        ReviewerRole::DivisionalSecretariat,
        false,
    ),
    rule(
        ApplicationStatus::ApprovedByGn,
        ApplicationStatus::OnHoldByDs,
        ReviewerRole::DivisionalSecretariat,
        false,
    ),
    rule(
        ApplicationStatus::ApprovedByGn,
        ApplicationStatus::RejectedByGn,
        ReviewerRole::DivisionalSecretariat,
        false,
    ),
    rule(
        ApplicationStatus::OnHoldByDs,
        ApplicationStatus::SentToDrp,
        ReviewerRole::DivisionalSecretariat,
        false,
    ),
    rule(
        ApplicationStatus::OnHoldByDs,
        ApplicationStatus::RejectedByGn,
        ReviewerRole::DivisionalSecretariat,
        false,
    ),
];

impl ApplicationStatus {
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            ApplicationStatus::SentToDrp
                | ApplicationStatus::RejectedByGn
                | ApplicationStatus::Completed
        )
    }

    /// Role expected to act next, if any.
    pub const fn responsible_role(self) -> Option<ReviewerRole> {
        match self {
            ApplicationStatus::Submitted => Some(ReviewerRole::GramaNiladhari),
            ApplicationStatus::ApprovedByGn | ApplicationStatus::OnHoldByDs => {
                Some(ReviewerRole::DivisionalSecretariat)
            }
            _ => None,
        }
    }

    /// Edges the given role may take from this status.
    pub fn allowed_transitions(self, role: ReviewerRole) -> Vec<TransitionRule> {
        TRANSITION_RULES
            .iter()
            .filter(|rule| rule.from == self && rule.role == role)
            .copied()
            .collect()
    }
}

/// Reasons a transition is refused before any request is issued.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("application is {0} and accepts no further decisions")]
    Terminal(ApplicationStatus),
    #[error("{role} reviewers cannot move an application from {from} to {to}")]
    Unauthorized {
        role: ReviewerRole,
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
    #[error("no transition from {from} to {to}")]
    NoSuchTransition {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
}

/// Resolve the edge `from -> to` for `role`, refusing anything not in [`TRANSITION_RULES`].
pub fn authorize_transition(
    role: ReviewerRole,
    from: ApplicationStatus,
    to: ApplicationStatus,
) -> Result<TransitionRule, TransitionError> {
    if from.is_terminal() {
        return Err(TransitionError::Terminal(from));
    }

    let mut edges = TRANSITION_RULES
        .iter()
        .filter(|rule| rule.from == from && rule.to == to)
        .peekable();

    if edges.peek().is_none() {
        return Err(TransitionError::NoSuchTransition { from, to });
    }

    edges
        .find(|rule| rule.role == role)
        .copied()
        .ok_or(TransitionError::Unauthorized { role, from, to })
}

/// What a reviewer chose to do with an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    /// GN sign-off.
    Approve,
    Reject,
    /// DS forwards to DRP.
    Forward,
    Hold,
}

impl ReviewDecision {
    /// Target status this decision records for the acting role.
    pub const fn target_status(self, role: ReviewerRole) -> Option<ApplicationStatus> {
        match (self, role) {
            (ReviewDecision::Approve, ReviewerRole::GramaNiladhari) => {
                Some(ApplicationStatus::ApprovedByGn)
            }
            (ReviewDecision::Reject, _) => Some(ApplicationStatus::RejectedByGn),
            (ReviewDecision::Forward, ReviewerRole::DivisionalSecretariat) => {
                Some(ApplicationStatus::SentToDrp)
            }
            (ReviewDecision::Hold, ReviewerRole::DivisionalSecretariat) => {
                Some(ApplicationStatus::OnHoldByDs)
            }
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            ReviewDecision::Approve => "approve",
            ReviewDecision::Reject => "reject",
            ReviewDecision::Forward => "forward",
            ReviewDecision::Hold => "hold",
        }
    }
}
