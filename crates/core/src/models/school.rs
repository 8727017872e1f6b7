use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A school belonging to a tenant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct School {
    pub id: i64,
    pub tenant_id: i64,
    pub name: String,
    pub timezone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
