//! Sync engine state models: the run ledger, per-record logs, and the
//! bidirectional identity mapping between local entities and external records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SlateError};

/// Direction of a sync run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SyncDirection {
    Pull,
    Push,
}

impl SyncDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncDirection::Pull => "pull",
            SyncDirection::Push => "push",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "pull" => Ok(SyncDirection::Pull),
            "push" => Ok(SyncDirection::Push),
            other => Err(SlateError::Serialization(format!(
                "unknown sync direction: {other}"
            ))),
        }
    }
}

/// Status of a sync run. Transitions are monotonic:
/// pending → running → completed | failed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Pending => "pending",
            SyncStatus::Running => "running",
            SyncStatus::Completed => "completed",
            SyncStatus::Failed => "failed",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "pending" => Ok(SyncStatus::Pending),
            "running" => Ok(SyncStatus::Running),
            "completed" => Ok(SyncStatus::Completed),
            "failed" => Ok(SyncStatus::Failed),
            other => Err(SlateError::Serialization(format!(
                "unknown sync status: {other}"
            ))),
        }
    }
}

/// Severity of a sync log line.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(SlateError::Serialization(format!(
                "unknown log level: {other}"
            ))),
        }
    }
}

/// Closed set of local entity kinds a mapping may point at.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LocalKind {
    School,
    AcademicYear,
    Term,
    Course,
    Section,
    User,
    Enrollment,
    Assignment,
    Submission,
}

impl LocalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocalKind::School => "school",
            LocalKind::AcademicYear => "academic_year",
            LocalKind::Term => "term",
            LocalKind::Course => "course",
            LocalKind::Section => "section",
            LocalKind::User => "user",
            LocalKind::Enrollment => "enrollment",
            LocalKind::Assignment => "assignment",
            LocalKind::Submission => "submission",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "school" => Ok(LocalKind::School),
            "academic_year" => Ok(LocalKind::AcademicYear),
            "term" => Ok(LocalKind::Term),
            "course" => Ok(LocalKind::Course),
            "section" => Ok(LocalKind::Section),
            "user" => Ok(LocalKind::User),
            "enrollment" => Ok(LocalKind::Enrollment),
            "assignment" => Ok(LocalKind::Assignment),
            "submission" => Ok(LocalKind::Submission),
            other => Err(SlateError::Serialization(format!(
                "unknown local entity kind: {other}"
            ))),
        }
    }
}

/// Closed set of external record kinds, per provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExternalKind {
    OnerosterOrg,
    OnerosterAcademicSession,
    OnerosterUser,
    OnerosterClass,
    OnerosterEnrollment,
    ClassroomCourse,
    ClassroomStudent,
    ClassroomCoursework,
}

impl ExternalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExternalKind::OnerosterOrg => "oneroster_org",
            ExternalKind::OnerosterAcademicSession => "oneroster_academic_session",
            ExternalKind::OnerosterUser => "oneroster_user",
            ExternalKind::OnerosterClass => "oneroster_class",
            ExternalKind::OnerosterEnrollment => "oneroster_enrollment",
            ExternalKind::ClassroomCourse => "classroom_course",
            ExternalKind::ClassroomStudent => "classroom_student",
            ExternalKind::ClassroomCoursework => "classroom_coursework",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "oneroster_org" => Ok(ExternalKind::OnerosterOrg),
            "oneroster_academic_session" => Ok(ExternalKind::OnerosterAcademicSession),
            "oneroster_user" => Ok(ExternalKind::OnerosterUser),
            "oneroster_class" => Ok(ExternalKind::OnerosterClass),
            "oneroster_enrollment" => Ok(ExternalKind::OnerosterEnrollment),
            "classroom_course" => Ok(ExternalKind::ClassroomCourse),
            "classroom_student" => Ok(ExternalKind::ClassroomStudent),
            "classroom_coursework" => Ok(ExternalKind::ClassroomCoursework),
            other => Err(SlateError::Serialization(format!(
                "unknown external entity kind: {other}"
            ))),
        }
    }
}

/// Counter tallied on a run while a batch executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunCounter {
    Processed,
    Succeeded,
    Failed,
}

/// A record of a single connector execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncRun {
    pub id: i64,
    pub tenant_id: i64,
    pub integration_config_id: i64,
    pub sync_type: String,
    pub direction: SyncDirection,
    pub status: SyncStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub records_processed: i64,
    pub records_succeeded: i64,
    pub records_failed: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub triggered_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// An append-only diagnostic line attached to a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncLog {
    pub id: i64,
    pub sync_run_id: i64,
    pub level: LogLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<LocalKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// One row of the bidirectional identity map. Unique per config on both the
/// local side (local_kind, local_id) and the external side (external_kind,
/// external_id); never deleted by the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncMapping {
    pub id: i64,
    pub tenant_id: i64,
    pub integration_config_id: i64,
    pub local_kind: LocalKind,
    pub local_id: i64,
    pub external_kind: ExternalKind,
    pub external_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn sync_status_serialization() {
        assert_eq!(
            serde_json::to_string(&SyncStatus::Pending).unwrap(),
            "\"pending\""
        );
        assert_eq!(
            serde_json::to_string(&SyncStatus::Failed).unwrap(),
            "\"failed\""
        );
    }

    #[test]
    fn sync_status_parse_round_trip() {
        for status in [
            SyncStatus::Pending,
            SyncStatus::Running,
            SyncStatus::Completed,
            SyncStatus::Failed,
        ] {
            assert_eq!(SyncStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(SyncStatus::parse("cancelled").is_err());
    }

    #[test]
    fn local_kind_parse_round_trip() {
        for kind in [
            LocalKind::School,
            LocalKind::AcademicYear,
            LocalKind::Term,
            LocalKind::Course,
            LocalKind::Section,
            LocalKind::User,
            LocalKind::Enrollment,
            LocalKind::Assignment,
            LocalKind::Submission,
        ] {
            assert_eq!(LocalKind::parse(kind.as_str()).unwrap(), kind);
        }
        assert!(LocalKind::parse("District").is_err());
    }

    #[test]
    fn external_kind_parse_round_trip() {
        for kind in [
            ExternalKind::OnerosterOrg,
            ExternalKind::OnerosterAcademicSession,
            ExternalKind::OnerosterUser,
            ExternalKind::OnerosterClass,
            ExternalKind::OnerosterEnrollment,
            ExternalKind::ClassroomCourse,
            ExternalKind::ClassroomStudent,
            ExternalKind::ClassroomCoursework,
        ] {
            assert_eq!(ExternalKind::parse(kind.as_str()).unwrap(), kind);
        }
        assert!(ExternalKind::parse("oneroster_demographics").is_err());
    }

    fn sample_run() -> SyncRun {
        SyncRun {
            id: 1,
            tenant_id: 7,
            integration_config_id: 2,
            sync_type: "oneroster_api_sync".to_string(),
            direction: SyncDirection::Pull,
            status: SyncStatus::Completed,
            started_at: Some(Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap()),
            completed_at: Some(Utc.with_ymd_and_hms(2025, 1, 15, 12, 5, 0).unwrap()),
            records_processed: 150,
            records_succeeded: 148,
            records_failed: 2,
            error_message: None,
            triggered_by: Some(11),
            created_at: Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn sync_run_round_trip() {
        let run = sample_run();
        let json = serde_json::to_string(&run).unwrap();
        assert!(json.contains("\"recordsProcessed\""));
        assert!(json.contains("\"syncType\""));
        let back: SyncRun = serde_json::from_str(&json).unwrap();
        assert_eq!(back, run);
    }

    #[test]
    fn sync_mapping_round_trip() {
        let mapping = SyncMapping {
            id: 5,
            tenant_id: 7,
            integration_config_id: 2,
            local_kind: LocalKind::School,
            local_id: 1,
            external_kind: ExternalKind::OnerosterOrg,
            external_id: "org-001".to_string(),
            last_synced_at: Some(Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap()),
            created_at: Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap(),
        };
        let json = serde_json::to_string(&mapping).unwrap();
        assert!(json.contains("\"localKind\""));
        assert!(json.contains("\"oneroster_org\""));
        let back: SyncMapping = serde_json::from_str(&json).unwrap();
        assert_eq!(back, mapping);
    }

    #[test]
    fn sync_log_round_trip() {
        let log = SyncLog {
            id: 9,
            sync_run_id: 1,
            level: LogLevel::Warn,
            message: "skipping user without email".to_string(),
            entity_type: Some(LocalKind::User),
            entity_id: None,
            external_id: Some("u-42".to_string()),
            metadata: Some(serde_json::json!({ "row": 5 })),
            created_at: Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap(),
        };
        let json = serde_json::to_string(&log).unwrap();
        let back: SyncLog = serde_json::from_str(&json).unwrap();
        assert_eq!(back, log);
    }
}
