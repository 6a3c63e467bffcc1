//! Report input supplied by the issue service.

use crate::error::ReportResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SenderRole {
    Student,
    Admin,
    MainAdmin,
}

impl SenderRole {
    pub fn label(self) -> &'static str {
        match self {
            SenderRole::Student => "Student",
            SenderRole::Admin => "Admin",
            SenderRole::MainAdmin => "Main Admin",
        }
    }

    /// Admins are drawn on the right side of the transcript.
    pub fn is_admin_side(self) -> bool {
        matches!(self, SenderRole::Admin | SenderRole::MainAdmin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueStatus {
    Open,
    InProgress,
    Solved,
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IssueStatus::Open => "OPEN",
            IssueStatus::InProgress => "IN_PROGRESS",
            IssueStatus::Solved => "SOLVED",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub sender_role: SenderRole,
    #[serde(default)]
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Everything needed to render one report. Never mutated by the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub issue_id: Uuid,
    pub issue_number: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: IssueStatus,
    #[serde(default)]
    pub assigned_admin_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub solved_at: Option<DateTime<Utc>>,
    /// Ascending by `created_at`.
    pub messages: Vec<ChatMessage>,
    /// User id to display name.
    #[serde(default)]
    pub directory: HashMap<Uuid, String>,
}

impl ReportRequest {
    pub fn from_json(bytes: &[u8]) -> ReportResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn display_name(&self, user_id: &Uuid) -> Option<&str> {
        self.directory.get(user_id).map(String::as_str)
    }
}
