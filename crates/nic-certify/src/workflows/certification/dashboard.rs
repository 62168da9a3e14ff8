use serde::Serialize;

use super::domain::{Application, ApplicationStatus, AuditLogEntry, ReviewerRole};

/// Status-derived queue tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueTab {
    Pending,
    Approved,
    OnHold,
    Forwarded,
    Rejected,
    All,
}

const GN_TABS: [QueueTab; 4] = [
    QueueTab::Pending,
    QueueTab::Approved,
    QueueTab::Rejected,
    QueueTab::All,
];

const DS_TABS: [QueueTab; 5] = [
    QueueTab::Pending,
    QueueTab::OnHold,
    QueueTab::Forwarded,
    QueueTab::Rejected,
    QueueTab::All,
];

impl QueueTab {
    pub fn for_role(role: ReviewerRole) -> &'static [QueueTab] {
        match role {
            ReviewerRole::GramaNiladhari => &GN_TABS,
            ReviewerRole::DivisionalSecretariat => &DS_TABS,
        }
    }

    pub fn matches(self, role: ReviewerRole, status: ApplicationStatus) -> bool {
        use ApplicationStatus as S;
        match (self, role) {
            (QueueTab::All, _) => true,
            (QueueTab::Rejected, _) => status == S::RejectedByGn,
            (QueueTab::Pending, ReviewerRole::GramaNiladhari) => status == S::Submitted,
            (QueueTab::Pending, ReviewerRole::DivisionalSecretariat) => status == S::ApprovedByGn,
            (QueueTab::Approved, _) => matches!(
                status,
                S::ApprovedByGn | S::OnHoldByDs | S::SentToDrp | S::Completed
            ),
            (QueueTab::OnHold, _) => status == S::OnHoldByDs,
            (QueueTab::Forwarded, _) => matches!(status, S::SentToDrp | S::Completed),
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            QueueTab::Pending => "pending",
            QueueTab::Approved => "approved",
            QueueTab::OnHold => "on_hold",
            QueueTab::Forwarded => "forwarded",
            QueueTab::Rejected => "rejected",
            QueueTab::All => "all",
        }
    }
}

/// Filter and paging request for a queue screen. Pages are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueQuery {
    pub tab: QueueTab,
    pub search: String,
    pub page: usize,
    pub page_size: usize,
}

impl QueueQuery {
    pub fn new(tab: QueueTab, page_size: usize) -> Self {
        Self {
            tab,
            search: String::new(),
            page: 1,
            page_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

fn matches_search(application: &Application, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    let applicant = &application.applicant;
    [
        Some(applicant.full_name.as_str()),
        Some(applicant.phone.as_str()),
        applicant.nic_number.as_deref(),
        Some(application.id.as_str()),
    ]
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(needle))
}

/// Every application visible under `tab` and `search`, in source order.
pub fn filter_queue<'a>(
    applications: &'a [Application],
    role: ReviewerRole,
    tab: QueueTab,
    search: &str,
) -> Vec<&'a Application> {
    let needle = search.trim().to_lowercase();
    applications
        .iter()
        .filter(|application| tab.matches(role, application.current_status))
        .filter(|application| matches_search(application, &needle))
        .collect()
}

/// Filter then slice one page. Out-of-range pages clamp to the nearest valid page.
pub fn queue_page(
    applications: &[Application],
    role: ReviewerRole,
    query: &QueueQuery,
) -> Page<Application> {
    let matching = filter_queue(applications, role, query.tab, &query.search);
    let page_size = query.page_size.max(1);
    let total_items = matching.len();
    let total_pages = total_items.div_ceil(page_size).max(1);
    let page = query.page.clamp(1, total_pages);

    let items = matching
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .cloned()
        .collect();

    Page {
        items,
        page,
        page_size,
        total_items,
        total_pages,
    }
}

/// Badge counts for each tab the role sees.
pub fn tab_counts(applications: &[Application], role: ReviewerRole) -> Vec<(QueueTab, usize)> {
    QueueTab::for_role(role)
        .iter()
        .map(|tab| {
            let count = applications
                .iter()
                .filter(|application| tab.matches(role, application.current_status))
                .count();
            (*tab, count)
        })
        .collect()
}

/// Audit entries oldest first; entries sharing a timestamp keep their order.
pub fn audit_timeline(entries: &[AuditLogEntry]) -> Vec<&AuditLogEntry> {
    let mut ordered: Vec<&AuditLogEntry> = entries.iter().collect();
    ordered.sort_by_key(|entry| entry.created_at);
    ordered
}

impl AuditLogEntry {
    pub fn summary(&self) -> String {
        let transition = match self.from_status {
            Some(from) => format!(
                "{} -> {}",
                from.display_label(),
                self.to_status.display_label()
            ),
            None => self.to_status.display_label().to_string(),
        };
        if self.comment.trim().is_empty() {
            format!("{transition} by {}", self.user_name)
        } else {
            format!("{transition} by {}: {}", self.user_name, self.comment.trim())
        }
    }
}
