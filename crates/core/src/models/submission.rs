use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::SubmissionStatus;

/// A student's work against an assignment; the grade is pushed outbound.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: i64,
    pub tenant_id: i64,
    pub assignment_id: i64,
    pub user_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<f64>,
    pub status: SubmissionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
