use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::UserRole;

/// A platform user. Email is unique per tenant; roster imports adopt an
/// existing user with the same email instead of creating a duplicate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub tenant_id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
