//! Dependency-ordered processing of a flat roster payload.
//!
//! External roster data arrives as five independent collections that are
//! semantically hierarchical. The processor runs a fixed topological order —
//! org → school-year → term → user → class → enrollment — and each pass runs
//! to completion before the next begins, because later passes look up
//! mappings created by earlier ones.

pub mod adapters;
pub mod records;

use tracing::info;

use crate::db::repository::SlateRepository;
use crate::error::Result;
use crate::sync::context::SyncContext;
use crate::sync::ledger::{LogDetail, RunLedger};
use crate::sync::reconcile::run_pass;

use self::adapters::{
    ClassAdapter, EnrollmentAdapter, OrgAdapter, SchoolYearAdapter, TermAdapter, UserAdapter,
};
use self::records::{RosterBundle, SessionKind, SessionRecord};

pub struct RosterProcessor<'a, R: SlateRepository> {
    repo: &'a R,
    ctx: &'a SyncContext,
    ledger: &'a RunLedger<'a, R>,
}

impl<'a, R: SlateRepository> RosterProcessor<'a, R> {
    pub fn new(repo: &'a R, ctx: &'a SyncContext, ledger: &'a RunLedger<'a, R>) -> Self {
        Self { repo, ctx, ledger }
    }

    /// Reconcile a full bundle in dependency order. Per-record failures are
    /// tallied on the run; only batch-fatal errors escape.
    pub async fn process(&self, bundle: &RosterBundle) -> Result<()> {
        info!(count = bundle.orgs.len(), "reconciling orgs");
        run_pass(self.repo, self.ctx, self.ledger, &OrgAdapter, &bundle.orgs, "org").await?;

        let (years, terms) = self.split_sessions(&bundle.sessions).await?;
        info!(
            years = years.len(),
            terms = terms.len(),
            "reconciling academic sessions"
        );
        run_pass(
            self.repo,
            self.ctx,
            self.ledger,
            &SchoolYearAdapter,
            &years,
            "school year",
        )
        .await?;
        run_pass(self.repo, self.ctx, self.ledger, &TermAdapter, &terms, "term").await?;

        info!(count = bundle.users.len(), "reconciling users");
        run_pass(
            self.repo,
            self.ctx,
            self.ledger,
            &UserAdapter,
            &bundle.users,
            "user",
        )
        .await?;

        info!(count = bundle.classes.len(), "reconciling classes");
        run_pass(
            self.repo,
            self.ctx,
            self.ledger,
            &ClassAdapter,
            &bundle.classes,
            "class",
        )
        .await?;

        info!(count = bundle.enrollments.len(), "reconciling enrollments");
        run_pass(
            self.repo,
            self.ctx,
            self.ledger,
            &EnrollmentAdapter,
            &bundle.enrollments,
            "enrollment",
        )
        .await?;

        Ok(())
    }

    /// Partition sessions into the school-year and term passes. Unsupported
    /// session types are counted as processed and logged.
    async fn split_sessions(
        &self,
        sessions: &[SessionRecord],
    ) -> Result<(Vec<SessionRecord>, Vec<SessionRecord>)> {
        let mut years = Vec::new();
        let mut terms = Vec::new();
        for session in sessions {
            match session.kind() {
                SessionKind::SchoolYear => years.push(session.clone()),
                SessionKind::Term => terms.push(session.clone()),
                SessionKind::Unsupported => {
                    if session.status.is_deleted() {
                        continue;
                    }
                    self.ledger.record_processed().await?;
                    self.ledger
                        .log_warn(
                            &format!(
                                "unsupported academic session type '{}'",
                                session.session_type
                            ),
                            LogDetail::external(&session.sourced_id),
                        )
                        .await?;
                }
            }
        }
        Ok((years, terms))
    }
}

#[cfg(test)]
mod tests {
    use super::records::*;
    use super::*;
    use crate::db::repository::*;
    use crate::db::sqlite::SqliteRepository;
    use crate::db::DatabasePool;
    use crate::models::integration::{IntegrationProvider, IntegrationStatus};
    use crate::models::sync::{ExternalKind, LocalKind, LogLevel, SyncDirection, SyncStatus};
    use chrono::NaiveDate;

    async fn setup() -> (SqliteRepository, SyncContext) {
        let pool = DatabasePool::new_sqlite_memory().await.unwrap();
        let repo = match pool {
            DatabasePool::Sqlite(p) => SqliteRepository::new(p),
        };
        let config = repo
            .create_integration_config(
                7,
                IntegrationProvider::Oneroster,
                IntegrationStatus::Active,
                &serde_json::json!({}),
            )
            .await
            .unwrap();
        let ctx = SyncContext::new(config);
        (repo, ctx)
    }

    async fn started_ledger<'a>(
        repo: &'a SqliteRepository,
        ctx: &SyncContext,
    ) -> RunLedger<'a, SqliteRepository> {
        let ledger = RunLedger::create(repo, ctx, "oneroster_csv_import", SyncDirection::Pull, None)
            .await
            .unwrap();
        ledger.start().await.unwrap();
        ledger
    }

    fn org(id: &str, status: RecordStatus, name: &str) -> OrgRecord {
        OrgRecord {
            sourced_id: id.to_string(),
            status,
            name: name.to_string(),
            org_type: "school".to_string(),
            identifier: None,
        }
    }

    fn session(id: &str, session_type: &str, parent: Option<&str>) -> SessionRecord {
        SessionRecord {
            sourced_id: id.to_string(),
            status: RecordStatus::Active,
            title: format!("Session {id}"),
            session_type: session_type.to_string(),
            start_date: NaiveDate::from_ymd_opt(2025, 8, 15),
            end_date: NaiveDate::from_ymd_opt(2025, 12, 20),
            parent_sourced_id: parent.map(str::to_string),
        }
    }

    fn user(id: &str, email: Option<&str>) -> UserRecord {
        UserRecord {
            sourced_id: id.to_string(),
            status: RecordStatus::Active,
            given_name: Some("First".to_string()),
            family_name: Some(format!("Last-{id}")),
            role: Some("student".to_string()),
            email: email.map(str::to_string),
        }
    }

    fn class(id: &str, title: &str) -> ClassRecord {
        ClassRecord {
            sourced_id: id.to_string(),
            status: RecordStatus::Active,
            title: Some(title.to_string()),
            class_code: None,
            term_sourced_id: None,
        }
    }

    fn enrollment(id: &str, user: &str, class: &str) -> EnrollmentRecord {
        EnrollmentRecord {
            sourced_id: id.to_string(),
            status: RecordStatus::Active,
            user_sourced_id: Some(user.to_string()),
            class_sourced_id: Some(class.to_string()),
            role: Some("student".to_string()),
        }
    }

    fn full_bundle() -> RosterBundle {
        RosterBundle {
            orgs: vec![org("org-1", RecordStatus::Active, "Springfield High")],
            sessions: vec![
                SessionRecord {
                    sourced_id: "year-1".to_string(),
                    status: RecordStatus::Active,
                    title: "2025-2026".to_string(),
                    session_type: "schoolYear".to_string(),
                    start_date: NaiveDate::from_ymd_opt(2025, 8, 1),
                    end_date: NaiveDate::from_ymd_opt(2026, 6, 30),
                    parent_sourced_id: None,
                },
                session("term-1", "term", Some("year-1")),
            ],
            users: vec![
                user("u-1", Some("u1@school.example")),
                user("u-2", Some("u2@school.example")),
            ],
            classes: vec![class("c-1", "Algebra I")],
            enrollments: vec![
                enrollment("e-1", "u-1", "c-1"),
                enrollment("e-2", "u-2", "c-1"),
            ],
        }
    }

    #[tokio::test]
    async fn full_bundle_creates_entities_in_dependency_order() {
        let (repo, ctx) = setup().await;
        let ledger = started_ledger(&repo, &ctx).await;
        let processor = RosterProcessor::new(&repo, &ctx, &ledger);

        processor.process(&full_bundle()).await.unwrap();
        ledger.complete().await.unwrap();

        assert_eq!(repo.list_schools(7).await.unwrap().len(), 1);
        assert_eq!(repo.list_academic_years(7).await.unwrap().len(), 1);
        assert_eq!(repo.list_terms(7).await.unwrap().len(), 1);
        assert_eq!(repo.list_users(7).await.unwrap().len(), 2);
        assert_eq!(repo.list_courses(7).await.unwrap().len(), 1);
        assert_eq!(repo.list_sections(7).await.unwrap().len(), 1);
        assert_eq!(repo.list_enrollments(7).await.unwrap().len(), 2);

        // Term attached to the mapped parent year, not a synthesized one.
        let term = &repo.list_terms(7).await.unwrap()[0];
        let year = &repo.list_academic_years(7).await.unwrap()[0];
        assert_eq!(term.academic_year_id, year.id);

        let run = ledger.reload().await.unwrap();
        assert_eq!(run.status, SyncStatus::Completed);
        assert_eq!(run.records_processed, 8);
        assert_eq!(run.records_succeeded, 8);
        assert_eq!(run.records_failed, 0);
    }

    #[tokio::test]
    async fn second_identical_run_is_a_no_op() {
        let (repo, ctx) = setup().await;
        let bundle = full_bundle();

        let ledger1 = started_ledger(&repo, &ctx).await;
        RosterProcessor::new(&repo, &ctx, &ledger1)
            .process(&bundle)
            .await
            .unwrap();
        ledger1.complete().await.unwrap();

        let users_before = repo.list_users(7).await.unwrap();
        let mappings_before = repo.list_mappings(ctx.config_id()).await.unwrap();

        let ledger2 = started_ledger(&repo, &ctx).await;
        RosterProcessor::new(&repo, &ctx, &ledger2)
            .process(&bundle)
            .await
            .unwrap();
        ledger2.complete().await.unwrap();

        // Zero net new entities, zero net new mappings.
        assert_eq!(repo.list_users(7).await.unwrap(), users_before);
        assert_eq!(repo.list_schools(7).await.unwrap().len(), 1);
        assert_eq!(repo.list_courses(7).await.unwrap().len(), 1);
        assert_eq!(repo.list_enrollments(7).await.unwrap().len(), 2);
        let mappings_after = repo.list_mappings(ctx.config_id()).await.unwrap();
        assert_eq!(mappings_after.len(), mappings_before.len());

        let run = ledger2.reload().await.unwrap();
        assert_eq!(run.records_succeeded, 8);
        assert_eq!(run.records_failed, 0);
    }

    #[tokio::test]
    async fn deleted_org_is_skipped_entirely() {
        let (repo, ctx) = setup().await;
        let ledger = started_ledger(&repo, &ctx).await;
        let bundle = RosterBundle {
            orgs: vec![
                org("org-1", RecordStatus::Active, "Springfield High"),
                org("org-2", RecordStatus::ToBeDeleted, "Closed School"),
            ],
            ..Default::default()
        };
        RosterProcessor::new(&repo, &ctx, &ledger)
            .process(&bundle)
            .await
            .unwrap();
        ledger.complete().await.unwrap();

        assert_eq!(repo.list_schools(7).await.unwrap().len(), 1);
        let mappings = repo.list_mappings(ctx.config_id()).await.unwrap();
        assert_eq!(mappings.len(), 1);
        assert_eq!(mappings[0].external_kind, ExternalKind::OnerosterOrg);
        assert_eq!(mappings[0].external_id, "org-1");

        // Deleted rows are not counted as processed.
        let run = ledger.reload().await.unwrap();
        assert_eq!(run.records_processed, 1);
        assert_eq!(run.records_succeeded, 1);
    }

    #[tokio::test]
    async fn one_invalid_row_does_not_abort_the_batch() {
        let (repo, ctx) = setup().await;
        let ledger = started_ledger(&repo, &ctx).await;

        let mut users = Vec::new();
        for i in 0..10 {
            let email = if i == 4 {
                // Present but invalid, so it reaches the validated create
                // path and fails there.
                Some("not-an-email".to_string())
            } else {
                Some(format!("u{i}@school.example"))
            };
            let mut record = user(&format!("u-{i}"), None);
            record.email = email;
            users.push(record);
        }
        let bundle = RosterBundle {
            users,
            ..Default::default()
        };

        RosterProcessor::new(&repo, &ctx, &ledger)
            .process(&bundle)
            .await
            .unwrap();
        ledger.complete().await.unwrap();

        let run = ledger.reload().await.unwrap();
        assert_eq!(run.status, SyncStatus::Completed);
        assert_eq!(run.records_processed, 10);
        assert_eq!(run.records_succeeded, 9);
        assert_eq!(run.records_failed, 1);
        assert_eq!(repo.list_users(7).await.unwrap().len(), 9);

        let logs = repo.list_sync_logs(ledger.run_id()).await.unwrap();
        let errors: Vec<_> = logs.iter().filter(|l| l.level == LogLevel::Error).collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].external_id.as_deref(), Some("u-4"));
    }

    #[tokio::test]
    async fn user_without_email_is_processed_but_not_tallied_either_way() {
        let (repo, ctx) = setup().await;
        let ledger = started_ledger(&repo, &ctx).await;
        let bundle = RosterBundle {
            users: vec![user("u-1", None), user("u-2", Some("ok@school.example"))],
            ..Default::default()
        };
        RosterProcessor::new(&repo, &ctx, &ledger)
            .process(&bundle)
            .await
            .unwrap();
        ledger.complete().await.unwrap();

        let run = ledger.reload().await.unwrap();
        assert_eq!(run.records_processed, 2);
        assert_eq!(run.records_succeeded, 1);
        assert_eq!(run.records_failed, 0);
        assert_eq!(repo.list_users(7).await.unwrap().len(), 1);

        let logs = repo.list_sync_logs(ledger.run_id()).await.unwrap();
        assert!(logs
            .iter()
            .any(|l| l.level == LogLevel::Warn && l.message.contains("without email")));
    }

    #[tokio::test]
    async fn term_without_parent_mapping_falls_back_to_existing_year() {
        let (repo, ctx) = setup().await;
        let existing = repo
            .create_academic_year(
                7,
                "2025-2026",
                NaiveDate::from_ymd_opt(2025, 8, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 6, 30).unwrap(),
            )
            .await
            .unwrap();

        let ledger = started_ledger(&repo, &ctx).await;
        let bundle = RosterBundle {
            sessions: vec![session("term-9", "term", Some("year-unknown"))],
            ..Default::default()
        };
        RosterProcessor::new(&repo, &ctx, &ledger)
            .process(&bundle)
            .await
            .unwrap();
        ledger.complete().await.unwrap();

        let terms = repo.list_terms(7).await.unwrap();
        assert_eq!(terms.len(), 1);
        assert_eq!(terms[0].academic_year_id, existing.id);
        let run = ledger.reload().await.unwrap();
        assert_eq!(run.records_succeeded, 1);
    }

    #[tokio::test]
    async fn term_with_no_years_anywhere_synthesizes_one() {
        let (repo, ctx) = setup().await;
        let ledger = started_ledger(&repo, &ctx).await;
        let bundle = RosterBundle {
            sessions: vec![session("term-9", "semester", None)],
            ..Default::default()
        };
        RosterProcessor::new(&repo, &ctx, &ledger)
            .process(&bundle)
            .await
            .unwrap();
        ledger.complete().await.unwrap();

        let years = repo.list_academic_years(7).await.unwrap();
        assert_eq!(years.len(), 1);
        assert_eq!(years[0].name, "Imported Academic Year");
        assert_eq!(years[0].start_date, NaiveDate::from_ymd_opt(2025, 8, 15).unwrap());

        let terms = repo.list_terms(7).await.unwrap();
        assert_eq!(terms.len(), 1);
        assert_eq!(terms[0].academic_year_id, years[0].id);
    }

    #[tokio::test]
    async fn unsupported_session_type_warns_and_moves_on() {
        let (repo, ctx) = setup().await;
        let ledger = started_ledger(&repo, &ctx).await;
        let bundle = RosterBundle {
            sessions: vec![session("s-1", "weekOfSchool", None)],
            ..Default::default()
        };
        RosterProcessor::new(&repo, &ctx, &ledger)
            .process(&bundle)
            .await
            .unwrap();
        ledger.complete().await.unwrap();

        let run = ledger.reload().await.unwrap();
        assert_eq!(run.records_processed, 1);
        assert_eq!(run.records_succeeded, 0);
        assert_eq!(run.records_failed, 0);
        let logs = repo.list_sync_logs(ledger.run_id()).await.unwrap();
        assert!(logs
            .iter()
            .any(|l| l.level == LogLevel::Warn && l.message.contains("unsupported")));
    }

    #[tokio::test]
    async fn enrollment_with_unmapped_user_fails_that_record_only() {
        let (repo, ctx) = setup().await;
        let ledger = started_ledger(&repo, &ctx).await;
        let mut bundle = full_bundle();
        bundle
            .enrollments
            .push(enrollment("e-3", "u-ghost", "c-1"));

        RosterProcessor::new(&repo, &ctx, &ledger)
            .process(&bundle)
            .await
            .unwrap();
        ledger.complete().await.unwrap();

        let run = ledger.reload().await.unwrap();
        assert_eq!(run.status, SyncStatus::Completed);
        assert_eq!(run.records_processed, 9);
        assert_eq!(run.records_succeeded, 8);
        assert_eq!(run.records_failed, 1);

        let logs = repo.list_sync_logs(ledger.run_id()).await.unwrap();
        assert!(logs
            .iter()
            .any(|l| l.level == LogLevel::Warn && l.message.contains("u-ghost")));
    }

    #[tokio::test]
    async fn user_with_existing_email_is_adopted_not_duplicated() {
        let (repo, ctx) = setup().await;
        let existing = repo
            .create_user(
                7,
                "u1@school.example",
                "Old",
                "Name",
                crate::models::common::UserRole::Teacher,
            )
            .await
            .unwrap();

        let ledger = started_ledger(&repo, &ctx).await;
        let bundle = RosterBundle {
            users: vec![user("u-1", Some("u1@school.example"))],
            ..Default::default()
        };
        RosterProcessor::new(&repo, &ctx, &ledger)
            .process(&bundle)
            .await
            .unwrap();
        ledger.complete().await.unwrap();

        let users = repo.list_users(7).await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, existing.id);
        // Externally sourced fields overwrote the stale ones.
        assert_eq!(users[0].last_name, "Last-u-1");

        let mapping = repo
            .find_mapping_by_local(ctx.config_id(), LocalKind::User, existing.id)
            .await
            .unwrap();
        assert!(mapping.is_some());
    }
}
