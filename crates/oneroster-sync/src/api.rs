//! Wire structs for the OneRoster 1.1 REST endpoints, with conversions into
//! the normalized roster records the reconciliation adapters consume.

use chrono::NaiveDate;
use serde::Deserialize;

use slate_core::sync::roster::records::{
    ClassRecord, EnrollmentRecord, OrgRecord, RecordStatus, SessionRecord, UserRecord,
};

/// Reference to another resource by sourcedId.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuidRef {
    pub sourced_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgResource {
    pub sourced_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub org_type: Option<String>,
    #[serde(default)]
    pub identifier: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicSessionResource {
    pub sourced_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "type")]
    pub session_type: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub parent: Option<GuidRef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResource {
    pub sourced_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassResource {
    pub sourced_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub class_code: Option<String>,
    #[serde(default)]
    pub terms: Vec<GuidRef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentResource {
    pub sourced_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub user: Option<GuidRef>,
    #[serde(default)]
    pub class: Option<GuidRef>,
}

fn parse_status(raw: &Option<String>) -> RecordStatus {
    RecordStatus::parse(raw.as_deref().unwrap_or(""))
}

fn parse_date(raw: &Option<String>) -> Option<NaiveDate> {
    raw.as_deref()
        .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
}

impl OrgResource {
    pub fn into_record(self) -> OrgRecord {
        OrgRecord {
            status: parse_status(&self.status),
            sourced_id: self.sourced_id,
            name: self.name.unwrap_or_default(),
            org_type: self.org_type.unwrap_or_default(),
            identifier: self.identifier,
        }
    }
}

impl AcademicSessionResource {
    pub fn into_record(self) -> SessionRecord {
        SessionRecord {
            status: parse_status(&self.status),
            start_date: parse_date(&self.start_date),
            end_date: parse_date(&self.end_date),
            sourced_id: self.sourced_id,
            title: self.title.unwrap_or_default(),
            session_type: self.session_type.unwrap_or_default(),
            parent_sourced_id: self.parent.map(|p| p.sourced_id),
        }
    }
}

impl UserResource {
    pub fn into_record(self) -> UserRecord {
        UserRecord {
            status: parse_status(&self.status),
            sourced_id: self.sourced_id,
            given_name: self.given_name,
            family_name: self.family_name,
            role: self.role,
            email: self.email,
        }
    }
}

impl ClassResource {
    pub fn into_record(self) -> ClassRecord {
        ClassRecord {
            status: parse_status(&self.status),
            sourced_id: self.sourced_id,
            title: self.title,
            class_code: self.class_code,
            term_sourced_id: self.terms.into_iter().next().map(|t| t.sourced_id),
        }
    }
}

impl EnrollmentResource {
    pub fn into_record(self) -> EnrollmentRecord {
        EnrollmentRecord {
            status: parse_status(&self.status),
            sourced_id: self.sourced_id,
            user_sourced_id: self.user.map(|u| u.sourced_id),
            class_sourced_id: self.class.map(|c| c.sourced_id),
            role: self.role,
        }
    }
}
