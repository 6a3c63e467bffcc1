//! DopamineLite Issue Reports
//!
//! Boundary between the issue service and the PDF renderer. Loads a solved issue, its
//! transcript and the display names of everyone involved, then renders the report.

use chrono::{DateTime, Utc};
use issue_report_pdf::{
    generate_report, ChatMessage, FontResolver, IssueStatus, ReportGenerationError,
    ReportOptions, ReportRequest,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;
use uuid::Uuid;

pub use issue_report_pdf;

/// Error type returned by storage and directory collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: Uuid,
    pub issue_number: i64,
    pub title: String,
    pub description: String,
    pub student_id: Uuid,
    #[serde(default)]
    pub assigned_admin_id: Option<Uuid>,
    pub status: IssueStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub solved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: Uuid,
    pub full_name: String,
    #[serde(default)]
    pub email: Option<String>,
}

pub trait IssueRepository {
    fn find_issue(&self, issue_id: Uuid) -> Result<Option<Issue>, BoxError>;

    /// Messages of an issue, oldest first.
    fn messages_ascending(&self, issue_id: Uuid) -> Result<Vec<ChatMessage>, BoxError>;
}

pub trait UserDirectory {
    fn fetch_users_by_ids(&self, user_ids: &[Uuid]) -> Result<HashMap<Uuid, UserInfo>, BoxError>;
}

impl<T: IssueRepository + ?Sized> IssueRepository for &T {
    fn find_issue(&self, issue_id: Uuid) -> Result<Option<Issue>, BoxError> {
        (**self).find_issue(issue_id)
    }

    fn messages_ascending(&self, issue_id: Uuid) -> Result<Vec<ChatMessage>, BoxError> {
        (**self).messages_ascending(issue_id)
    }
}

impl<T: UserDirectory + ?Sized> UserDirectory for &T {
    fn fetch_users_by_ids(&self, user_ids: &[Uuid]) -> Result<HashMap<Uuid, UserInfo>, BoxError> {
        (**self).fetch_users_by_ids(user_ids)
    }
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Issue not found: {0}")]
    NotFound(Uuid),

    #[error("Report cannot be generated for issue {issue_id} with status {status}; it must be SOLVED")]
    NotSolved { issue_id: Uuid, status: IssueStatus },

    #[error("Issue storage failed: {0}")]
    Repository(#[source] BoxError),

    #[error(transparent)]
    Render(#[from] ReportGenerationError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueReportMetadata {
    pub issue_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub report_type: String,
}

/// A rendered report ready to be returned to the caller.
#[derive(Debug, Clone)]
pub struct IssueReport {
    pub bytes: Vec<u8>,
    pub metadata: IssueReportMetadata,
    pub file_name: String,
}

pub struct IssueReportService<R, U> {
    issues: R,
    users: U,
    fonts: FontResolver,
    options: ReportOptions,
}

impl<R: IssueRepository, U: UserDirectory> IssueReportService<R, U> {
    pub fn new(issues: R, users: U, fonts: FontResolver, options: ReportOptions) -> Self {
        Self {
            issues,
            users,
            fonts,
            options,
        }
    }

    pub fn generate_issue_report(&self, issue_id: Uuid) -> Result<IssueReport, ServiceError> {
        self.generate_issue_report_at(issue_id, Utc::now())
    }

    /// Same as [`Self::generate_issue_report`] with an explicit generation time.
    pub fn generate_issue_report_at(
        &self,
        issue_id: Uuid,
        generated_at: DateTime<Utc>,
    ) -> Result<IssueReport, ServiceError> {
        log::debug!("Generating PDF report for issue {}", issue_id);

        let issue = self
            .issues
            .find_issue(issue_id)
            .map_err(ServiceError::Repository)?
            .ok_or_else(|| {
                log::error!("Issue not found for report generation, id: {}", issue_id);
                ServiceError::NotFound(issue_id)
            })?;

        if issue.status != IssueStatus::Solved {
            log::error!(
                "Cannot generate report for issue {} because status is {}",
                issue_id,
                issue.status
            );
            return Err(ServiceError::NotSolved {
                issue_id,
                status: issue.status,
            });
        }

        let messages = self
            .issues
            .messages_ascending(issue_id)
            .map_err(ServiceError::Repository)?;
        let directory = self.lookup_names(&issue, &messages);

        log::debug!(
            "Generating PDF with {} messages for issue {}",
            messages.len(),
            issue_id
        );
        let file_name = format!("issue-{}-report.pdf", issue.issue_number);
        let request = build_request(issue, messages, directory);
        let bytes = generate_report(&request, &self.fonts, &self.options)?;

        Ok(IssueReport {
            bytes,
            metadata: IssueReportMetadata {
                issue_id,
                generated_at,
                report_type: "PDF".to_string(),
            },
            file_name,
        })
    }

    /// Display names for the student, the assignee and every sender. A failing
    /// directory only costs the names.
    fn lookup_names(&self, issue: &Issue, messages: &[ChatMessage]) -> HashMap<Uuid, String> {
        let ids: BTreeSet<Uuid> = std::iter::once(issue.student_id)
            .chain(issue.assigned_admin_id)
            .chain(messages.iter().map(|m| m.sender_id))
            .collect();
        let ids: Vec<Uuid> = ids.into_iter().collect();

        match self.users.fetch_users_by_ids(&ids) {
            Ok(users) => {
                log::info!("Resolved {} of {} users for issue {}", users.len(), ids.len(), issue.id);
                users
                    .into_iter()
                    .map(|(id, user)| (id, user.full_name))
                    .collect()
            }
            Err(err) => {
                log::warn!("User lookup failed for issue {}: {}; rendering without names", issue.id, err);
                HashMap::new()
            }
        }
    }
}

fn build_request(
    issue: Issue,
    messages: Vec<ChatMessage>,
    directory: HashMap<Uuid, String>,
) -> ReportRequest {
    ReportRequest {
        issue_id: issue.id,
        issue_number: issue.issue_number,
        title: issue.title,
        description: issue.description,
        status: issue.status,
        assigned_admin_id: issue.assigned_admin_id,
        created_at: issue.created_at,
        solved_at: issue.solved_at,
        messages,
        directory,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn request_carries_issue_fields() {
        let issue = Issue {
            id: Uuid::new_v4(),
            issue_number: 7,
            title: "Title".to_string(),
            description: "Body".to_string(),
            student_id: Uuid::new_v4(),
            assigned_admin_id: None,
            status: IssueStatus::Solved,
            created_at: Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap(),
            solved_at: None,
        };
        let request = build_request(issue.clone(), Vec::new(), HashMap::new());
        assert_eq!(request.issue_id, issue.id);
        assert_eq!(request.issue_number, 7);
        assert!(request.messages.is_empty());
        assert_eq!(request.solved_at, None);
    }

    #[test]
    fn metadata_serialises_camel_case() {
        let metadata = IssueReportMetadata {
            issue_id: Uuid::nil(),
            generated_at: Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap(),
            report_type: "PDF".to_string(),
        };
        let value = serde_json::to_value(&metadata).unwrap();
        assert_eq!(value["reportType"], "PDF");
        assert_eq!(value["issueId"], "00000000-0000-0000-0000-000000000000");
        assert!(value.get("generatedAt").is_some());
    }
}
