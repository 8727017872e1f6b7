//! Normalized roster records.
//!
//! Both the OneRoster REST connector and the CSV bundle importer reduce
//! provider payloads to these shapes before reconciliation, so the two
//! transports share one set of adapters.

use chrono::NaiveDate;

/// Lifecycle status carried on every OneRoster record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    Active,
    ToBeDeleted,
}

impl RecordStatus {
    /// Tolerant parse: anything other than "tobedeleted" is treated as
    /// active, matching how sparse CSV exports omit the column.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("tobedeleted") {
            RecordStatus::ToBeDeleted
        } else {
            RecordStatus::Active
        }
    }

    pub fn is_deleted(&self) -> bool {
        *self == RecordStatus::ToBeDeleted
    }
}

/// An org row; only `type == school` rows are reconciled.
#[derive(Debug, Clone, PartialEq)]
pub struct OrgRecord {
    pub sourced_id: String,
    pub status: RecordStatus,
    pub name: String,
    pub org_type: String,
    pub identifier: Option<String>,
}

/// An academicSession row. `session_type` dispatches the record to the
/// school-year or term pass.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub sourced_id: String,
    pub status: RecordStatus,
    pub title: String,
    pub session_type: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub parent_sourced_id: Option<String>,
}

/// Which pass a session record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    SchoolYear,
    Term,
    Unsupported,
}

impl SessionRecord {
    pub fn kind(&self) -> SessionKind {
        match self.session_type.to_ascii_lowercase().as_str() {
            "schoolyear" => SessionKind::SchoolYear,
            "term" | "semester" | "gradingperiod" => SessionKind::Term,
            _ => SessionKind::Unsupported,
        }
    }
}

/// A user row. Email is a hard requirement for reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub sourced_id: String,
    pub status: RecordStatus,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub role: Option<String>,
    pub email: Option<String>,
}

/// A class row, reconciled into a Course.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassRecord {
    pub sourced_id: String,
    pub status: RecordStatus,
    pub title: Option<String>,
    pub class_code: Option<String>,
    pub term_sourced_id: Option<String>,
}

/// An enrollment row, joining a user to a class by external id.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrollmentRecord {
    pub sourced_id: String,
    pub status: RecordStatus,
    pub user_sourced_id: Option<String>,
    pub class_sourced_id: Option<String>,
    pub role: Option<String>,
}

/// The full flat payload of one roster sync, in provider order.
#[derive(Debug, Clone, Default)]
pub struct RosterBundle {
    pub orgs: Vec<OrgRecord>,
    pub sessions: Vec<SessionRecord>,
    pub users: Vec<UserRecord>,
    pub classes: Vec<ClassRecord>,
    pub enrollments: Vec<EnrollmentRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_status_parse() {
        assert_eq!(RecordStatus::parse("active"), RecordStatus::Active);
        assert_eq!(RecordStatus::parse("tobedeleted"), RecordStatus::ToBeDeleted);
        assert_eq!(RecordStatus::parse("ToBeDeleted"), RecordStatus::ToBeDeleted);
        // Unknown and empty values default to active.
        assert_eq!(RecordStatus::parse(""), RecordStatus::Active);
        assert_eq!(RecordStatus::parse("archived"), RecordStatus::Active);
    }

    #[test]
    fn session_kind_dispatch() {
        let mut session = SessionRecord {
            sourced_id: "s-1".into(),
            status: RecordStatus::Active,
            title: "Fall".into(),
            session_type: "schoolYear".into(),
            start_date: None,
            end_date: None,
            parent_sourced_id: None,
        };
        assert_eq!(session.kind(), SessionKind::SchoolYear);

        for t in ["term", "semester", "gradingPeriod"] {
            session.session_type = t.into();
            assert_eq!(session.kind(), SessionKind::Term, "{t}");
        }

        session.session_type = "weird".into();
        assert_eq!(session.kind(), SessionKind::Unsupported);
    }
}
