use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SlateError};

/// External system a config connects to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IntegrationProvider {
    Oneroster,
    Classroom,
}

impl IntegrationProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntegrationProvider::Oneroster => "oneroster",
            IntegrationProvider::Classroom => "classroom",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "oneroster" => Ok(IntegrationProvider::Oneroster),
            "classroom" => Ok(IntegrationProvider::Classroom),
            other => Err(SlateError::Serialization(format!(
                "unknown integration provider: {other}"
            ))),
        }
    }
}

/// Whether a connector is allowed to run for this config.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IntegrationStatus {
    Active,
    Disabled,
}

impl IntegrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntegrationStatus::Active => "active",
            IntegrationStatus::Disabled => "disabled",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "active" => Ok(IntegrationStatus::Active),
            "disabled" => Ok(IntegrationStatus::Disabled),
            other => Err(SlateError::Serialization(format!(
                "unknown integration status: {other}"
            ))),
        }
    }
}

/// Tenant-scoped configuration for one provider connection.
///
/// The sync engine consumes configs and never mutates them; status gates
/// whether a connector may run at all.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationConfig {
    pub id: i64,
    pub tenant_id: i64,
    pub provider: IntegrationProvider,
    pub status: IntegrationStatus,
    pub settings: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Settings for a OneRoster SIS connection.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OneRosterSettings {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
}

/// Settings for a classroom provider connection.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ClassroomSettings {
    pub access_token: String,
    /// Email domain allowlist for roster filtering.
    #[serde(default)]
    pub domain: Option<String>,
}

impl IntegrationConfig {
    /// Returns an error unless the config is active. Checked by every
    /// connector before a run is created.
    pub fn ensure_active(&self) -> Result<()> {
        if self.status != IntegrationStatus::Active {
            return Err(SlateError::Config(format!(
                "integration config {} is not active",
                self.id
            )));
        }
        Ok(())
    }

    pub fn oneroster_settings(&self) -> Result<OneRosterSettings> {
        serde_json::from_value(self.settings.clone()).map_err(|e| {
            SlateError::Config(format!(
                "integration config {} has invalid OneRoster settings: {e}",
                self.id
            ))
        })
    }

    pub fn classroom_settings(&self) -> Result<ClassroomSettings> {
        serde_json::from_value(self.settings.clone()).map_err(|e| {
            SlateError::Config(format!(
                "integration config {} has invalid classroom settings: {e}",
                self.id
            ))
        })
    }
}
