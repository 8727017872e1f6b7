use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A grading term within an academic year.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Term {
    pub id: i64,
    pub tenant_id: i64,
    pub academic_year_id: i64,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn term_round_trip() {
        let term = Term {
            id: 3,
            tenant_id: 7,
            academic_year_id: 1,
            name: "Fall 2025".to_string(),
            start_date: NaiveDate::from_ymd_opt(2025, 8, 15).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 12, 20).unwrap(),
            created_at: Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap(),
        };
        let json = serde_json::to_string(&term).unwrap();
        assert!(json.contains("\"academicYearId\""));
        let back: Term = serde_json::from_str(&json).unwrap();
        assert_eq!(back, term);
    }
}
