use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::EnrollmentRole;

/// Membership of a user in a section. Unique per (user, section).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: i64,
    pub tenant_id: i64,
    pub user_id: i64,
    pub section_id: i64,
    pub role: EnrollmentRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn enrollment_round_trip() {
        let enrollment = Enrollment {
            id: 21,
            tenant_id: 7,
            user_id: 11,
            section_id: 9,
            role: EnrollmentRole::Student,
            created_at: Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap(),
        };
        let json = serde_json::to_string(&enrollment).unwrap();
        assert!(json.contains("\"sectionId\""));
        let back: Enrollment = serde_json::from_str(&json).unwrap();
        assert_eq!(back, enrollment);
    }
}
