//! Explicit tenant scope for a connector invocation.
//!
//! Every reconcile call receives the context by reference instead of reading
//! an ambient current-tenant value; the scope ends when the context goes out
//! of scope, so a worker can never leak one tenant's identity into the next
//! job it picks up.

use crate::models::integration::IntegrationConfig;

/// Tenant scope for one connector invocation.
#[derive(Debug, Clone)]
pub struct SyncContext {
    pub tenant_id: i64,
    pub config: IntegrationConfig,
}

impl SyncContext {
    pub fn new(config: IntegrationConfig) -> Self {
        Self {
            tenant_id: config.tenant_id,
            config,
        }
    }

    pub fn config_id(&self) -> i64 {
        self.config.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::integration::{IntegrationProvider, IntegrationStatus};
    use chrono::{TimeZone, Utc};

    #[test]
    fn context_carries_tenant_from_config() {
        let config = IntegrationConfig {
            id: 2,
            tenant_id: 7,
            provider: IntegrationProvider::Oneroster,
            status: IntegrationStatus::Active,
            settings: serde_json::json!({}),
            created_at: Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap(),
        };
        let ctx = SyncContext::new(config);
        assert_eq!(ctx.tenant_id, 7);
        assert_eq!(ctx.config_id(), 2);
    }
}
