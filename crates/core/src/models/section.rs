use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A scheduled section of a course within a term.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: i64,
    pub tenant_id: i64,
    pub course_id: i64,
    pub term_id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
