use serde::{Deserialize, Serialize};

use crate::error::{Result, SlateError};

/// Platform-wide user role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Student,
    Teacher,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Student => "student",
            UserRole::Teacher => "teacher",
            UserRole::Admin => "admin",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "student" => Ok(UserRole::Student),
            "teacher" => Ok(UserRole::Teacher),
            "admin" => Ok(UserRole::Admin),
            other => Err(SlateError::Serialization(format!(
                "unknown user role: {other}"
            ))),
        }
    }
}

/// Role within a section enrollment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentRole {
    Student,
    Teacher,
}

impl EnrollmentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentRole::Student => "student",
            EnrollmentRole::Teacher => "teacher",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "student" => Ok(EnrollmentRole::Student),
            "teacher" => Ok(EnrollmentRole::Teacher),
            other => Err(SlateError::Serialization(format!(
                "unknown enrollment role: {other}"
            ))),
        }
    }
}

/// Assignment publication state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStatus {
    Draft,
    Published,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Draft => "draft",
            AssignmentStatus::Published => "published",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "draft" => Ok(AssignmentStatus::Draft),
            "published" => Ok(AssignmentStatus::Published),
            other => Err(SlateError::Serialization(format!(
                "unknown assignment status: {other}"
            ))),
        }
    }
}

/// Grading state of a submission.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Graded,
    Returned,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Graded => "graded",
            SubmissionStatus::Returned => "returned",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "pending" => Ok(SubmissionStatus::Pending),
            "graded" => Ok(SubmissionStatus::Graded),
            "returned" => Ok(SubmissionStatus::Returned),
            other => Err(SlateError::Serialization(format!(
                "unknown submission status: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_role_serialization() {
        assert_eq!(
            serde_json::to_string(&UserRole::Student).unwrap(),
            "\"student\""
        );
        assert_eq!(
            serde_json::to_string(&UserRole::Teacher).unwrap(),
            "\"teacher\""
        );
        assert_eq!(serde_json::to_string(&UserRole::Admin).unwrap(), "\"admin\"");
    }

    #[test]
    fn user_role_parse_round_trip() {
        for role in [UserRole::Student, UserRole::Teacher, UserRole::Admin] {
            assert_eq!(UserRole::parse(role.as_str()).unwrap(), role);
        }
        assert!(UserRole::parse("principal").is_err());
    }

    #[test]
    fn enrollment_role_parse_round_trip() {
        for role in [EnrollmentRole::Student, EnrollmentRole::Teacher] {
            assert_eq!(EnrollmentRole::parse(role.as_str()).unwrap(), role);
        }
        assert!(EnrollmentRole::parse("administrator").is_err());
    }

    #[test]
    fn assignment_status_parse_round_trip() {
        for status in [AssignmentStatus::Draft, AssignmentStatus::Published] {
            assert_eq!(AssignmentStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(AssignmentStatus::parse("archived").is_err());
    }

    #[test]
    fn submission_status_parse_round_trip() {
        for status in [
            SubmissionStatus::Pending,
            SubmissionStatus::Graded,
            SubmissionStatus::Returned,
        ] {
            assert_eq!(SubmissionStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(SubmissionStatus::parse("late").is_err());
    }
}
