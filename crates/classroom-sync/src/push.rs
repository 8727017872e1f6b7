//! Outbound push: coursework creation/update and grade passback.
//!
//! Push connectors resolve a chain of existing mappings. A missing
//! prerequisite link is a per-record condition: log a warning, skip, and let
//! the run complete. Only authentication failures and batch-level fetch
//! errors fail the run.

use std::sync::Arc;

use tracing::{error, info};

use slate_core::db::repository::SlateRepository;
use slate_core::error::{Result, SlateError};
use slate_core::models::assignment::Assignment;
use slate_core::models::sync::{ExternalKind, LocalKind, SyncDirection, SyncRun};
use slate_core::sync::context::SyncContext;
use slate_core::sync::ledger::{LogDetail, RunLedger};

use crate::client::ClassroomClient;
use crate::models::{CourseWork, WorkDate};

pub const SYNC_TYPE_COURSEWORK: &str = "coursework_push";
pub const SYNC_TYPE_GRADES: &str = "grade_passback";

const COURSEWORK_UPDATE_MASK: &str = "title,description,maxPoints";

fn coursework_payload(assignment: &Assignment) -> CourseWork {
    CourseWork {
        id: None,
        title: assignment.title.clone(),
        description: assignment.description.clone(),
        max_points: assignment.points_possible,
        work_type: Some("ASSIGNMENT".to_string()),
        state: Some("PUBLISHED".to_string()),
        due_date: assignment.due_date.map(|d| {
            use chrono::Datelike;
            WorkDate {
                year: d.year(),
                month: d.month(),
                day: d.day(),
            }
        }),
    }
}

/// Push one assignment to the classroom provider as coursework.
pub struct CourseworkPush<R> {
    repo: Arc<R>,
    client: ClassroomClient,
}

impl<R: SlateRepository> CourseworkPush<R> {
    pub fn new(repo: Arc<R>, client: ClassroomClient) -> Self {
        Self { repo, client }
    }

    pub async fn run(
        &self,
        config_id: i64,
        triggered_by: Option<i64>,
        assignment_id: i64,
    ) -> Result<SyncRun> {
        let config = self
            .repo
            .get_integration_config(config_id)
            .await?
            .ok_or_else(|| {
                SlateError::Config(format!("integration config {config_id} not found"))
            })?;
        config.ensure_active()?;

        let ctx = SyncContext::new(config);
        let ledger = RunLedger::create(
            self.repo.as_ref(),
            &ctx,
            SYNC_TYPE_COURSEWORK,
            SyncDirection::Push,
            triggered_by,
        )
        .await?;
        ledger.start().await?;
        info!(config_id, run_id = ledger.run_id(), assignment_id, "starting coursework push");

        match self.execute(&ctx, &ledger, assignment_id).await {
            Ok(()) => {
                ledger.complete().await?;
                ledger.reload().await
            }
            Err(e) => {
                error!(run_id = ledger.run_id(), error = %e, "coursework push failed");
                ledger.fail(&e.to_string()).await?;
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        ctx: &SyncContext,
        ledger: &RunLedger<'_, R>,
        assignment_id: i64,
    ) -> Result<()> {
        let repo = self.repo.as_ref();
        let assignment = repo.get_assignment(assignment_id).await?.ok_or_else(|| {
            SlateError::Sync(format!("assignment {assignment_id} not found"))
        })?;

        ledger.record_processed().await?;

        let Some(course_mapping) = repo
            .find_mapping_by_local(ctx.config_id(), LocalKind::Course, assignment.course_id)
            .await?
        else {
            ledger
                .log_warn(
                    &format!(
                        "no course mapping for course {}, skipping coursework push",
                        assignment.course_id
                    ),
                    LogDetail::none().with_entity(LocalKind::Assignment, assignment.id),
                )
                .await?;
            return Ok(());
        };

        let payload = coursework_payload(&assignment);
        let existing = repo
            .find_mapping_by_local(ctx.config_id(), LocalKind::Assignment, assignment.id)
            .await?;

        let result = match &existing {
            Some(mapping) => self
                .client
                .update_coursework(
                    &course_mapping.external_id,
                    &mapping.external_id,
                    &payload,
                    COURSEWORK_UPDATE_MASK,
                )
                .await
                .map(|_| mapping.external_id.clone()),
            None => {
                let created = self
                    .client
                    .create_coursework(&course_mapping.external_id, &payload)
                    .await;
                match created {
                    Ok(work) => work.id.ok_or_else(|| {
                        SlateError::Provider("create coursework response missing id".into())
                    }),
                    Err(e) => Err(e),
                }
            }
        };

        match result {
            Ok(external_id) => {
                match existing {
                    Some(mapping) => {
                        repo.touch_mapping(mapping.id, assignment.id).await?;
                    }
                    None => {
                        repo.create_sync_mapping(
                            ctx.tenant_id,
                            ctx.config_id(),
                            LocalKind::Assignment,
                            assignment.id,
                            ExternalKind::ClassroomCoursework,
                            &external_id,
                        )
                        .await?;
                    }
                }
                ledger.record_succeeded().await?;
                ledger
                    .log_info(
                        "pushed coursework",
                        LogDetail::external(external_id)
                            .with_entity(LocalKind::Assignment, assignment.id),
                    )
                    .await?;
                Ok(())
            }
            // Credential failures poison the whole push; surface them.
            Err(e @ SlateError::Auth(_)) => Err(e),
            Err(e) => {
                ledger.record_failed().await?;
                ledger
                    .log_error(
                        &format!("failed to push coursework: {e}"),
                        LogDetail::none().with_entity(LocalKind::Assignment, assignment.id),
                    )
                    .await?;
                Ok(())
            }
        }
    }
}

/// Push grades for every graded submission of one assignment.
pub struct GradePassback<R> {
    repo: Arc<R>,
    client: ClassroomClient,
}

impl<R: SlateRepository> GradePassback<R> {
    pub fn new(repo: Arc<R>, client: ClassroomClient) -> Self {
        Self { repo, client }
    }

    pub async fn run(
        &self,
        config_id: i64,
        triggered_by: Option<i64>,
        assignment_id: i64,
    ) -> Result<SyncRun> {
        let config = self
            .repo
            .get_integration_config(config_id)
            .await?
            .ok_or_else(|| {
                SlateError::Config(format!("integration config {config_id} not found"))
            })?;
        config.ensure_active()?;

        let ctx = SyncContext::new(config);
        let ledger = RunLedger::create(
            self.repo.as_ref(),
            &ctx,
            SYNC_TYPE_GRADES,
            SyncDirection::Push,
            triggered_by,
        )
        .await?;
        ledger.start().await?;
        info!(config_id, run_id = ledger.run_id(), assignment_id, "starting grade passback");

        match self.execute(&ctx, &ledger, assignment_id).await {
            Ok(()) => {
                ledger.complete().await?;
                ledger.reload().await
            }
            Err(e) => {
                error!(run_id = ledger.run_id(), error = %e, "grade passback failed");
                ledger.fail(&e.to_string()).await?;
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        ctx: &SyncContext,
        ledger: &RunLedger<'_, R>,
        assignment_id: i64,
    ) -> Result<()> {
        let repo = self.repo.as_ref();
        let assignment = repo.get_assignment(assignment_id).await?.ok_or_else(|| {
            SlateError::Sync(format!("assignment {assignment_id} not found"))
        })?;

        let Some(course_mapping) = repo
            .find_mapping_by_local(ctx.config_id(), LocalKind::Course, assignment.course_id)
            .await?
        else {
            ledger
                .log_warn(
                    &format!(
                        "no course mapping for course {}, skipping grade passback",
                        assignment.course_id
                    ),
                    LogDetail::none().with_entity(LocalKind::Assignment, assignment.id),
                )
                .await?;
            return Ok(());
        };
        let Some(coursework_mapping) = repo
            .find_mapping_by_local(ctx.config_id(), LocalKind::Assignment, assignment.id)
            .await?
        else {
            ledger
                .log_warn(
                    &format!(
                        "no coursework mapping for assignment {}, skipping grade passback",
                        assignment.id
                    ),
                    LogDetail::none().with_entity(LocalKind::Assignment, assignment.id),
                )
                .await?;
            return Ok(());
        };

        // One list call resolves external submissions for the whole batch.
        let classroom_submissions = self
            .client
            .list_submissions(&course_mapping.external_id, &coursework_mapping.external_id)
            .await?;
        let graded = repo.list_graded_submissions(assignment.id).await?;
        info!(
            graded = graded.len(),
            external = classroom_submissions.len(),
            "pushing grades"
        );

        for submission in graded {
            ledger.record_processed().await?;

            let Some(student_mapping) = repo
                .find_student_mapping_for_user(ctx.config_id(), submission.user_id)
                .await?
            else {
                ledger
                    .log_warn(
                        &format!("no student mapping for user {}", submission.user_id),
                        LogDetail::none().with_entity(LocalKind::Submission, submission.id),
                    )
                    .await?;
                continue;
            };

            let Some(classroom_submission) = classroom_submissions
                .iter()
                .find(|cs| cs.user_id == student_mapping.external_id)
            else {
                ledger
                    .log_warn(
                        &format!(
                            "no classroom submission for student {}",
                            student_mapping.external_id
                        ),
                        LogDetail::none().with_entity(LocalKind::Submission, submission.id),
                    )
                    .await?;
                continue;
            };

            let Some(grade) = submission.grade else {
                continue;
            };

            match self
                .client
                .patch_submission_grade(
                    &course_mapping.external_id,
                    &coursework_mapping.external_id,
                    &classroom_submission.id,
                    grade,
                )
                .await
            {
                Ok(()) => {
                    ledger.record_succeeded().await?;
                    ledger
                        .log_info(
                            "pushed grade",
                            LogDetail::external(classroom_submission.id.clone())
                                .with_entity(LocalKind::Submission, submission.id),
                        )
                        .await?;
                }
                Err(e @ SlateError::Auth(_)) => return Err(e),
                Err(e) => {
                    ledger.record_failed().await?;
                    ledger
                        .log_error(
                            &format!("failed to push grade: {e}"),
                            LogDetail::none().with_entity(LocalKind::Submission, submission.id),
                        )
                        .await?;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use slate_core::db::repository::*;
    use slate_core::db::sqlite::SqliteRepository;
    use slate_core::db::DatabasePool;
    use slate_core::models::common::{
        AssignmentStatus, EnrollmentRole, SubmissionStatus, UserRole,
    };
    use slate_core::models::integration::{IntegrationProvider, IntegrationStatus};
    use slate_core::models::sync::{LogLevel, SyncStatus};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup_repo() -> Arc<SqliteRepository> {
        let pool = DatabasePool::new_sqlite_memory().await.unwrap();
        match pool {
            DatabasePool::Sqlite(p) => Arc::new(SqliteRepository::new(p)),
        }
    }

    struct PushFixture {
        config_id: i64,
        assignment_id: i64,
        user_id: i64,
    }

    /// Tenant with one course (mapped to gc-1), one published assignment,
    /// and one enrolled student.
    async fn push_fixture(repo: &SqliteRepository) -> PushFixture {
        let config_id = repo
            .create_integration_config(
                7,
                IntegrationProvider::Classroom,
                IntegrationStatus::Active,
                &serde_json::json!({ "access_token": "tok" }),
            )
            .await
            .unwrap()
            .id;
        let year = repo
            .create_academic_year(
                7,
                "2025",
                NaiveDate::from_ymd_opt(2025, 8, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 6, 30).unwrap(),
            )
            .await
            .unwrap();
        let term = repo
            .create_term(7, year.id, "Fall", year.start_date, year.end_date)
            .await
            .unwrap();
        let course = repo.create_course(7, year.id, "Math 101", None).await.unwrap();
        let section = repo
            .create_section(7, course.id, term.id, "Math 101 - Section 1")
            .await
            .unwrap();
        let user = repo
            .create_user(7, "jdoe@school.example", "John", "Doe", UserRole::Student)
            .await
            .unwrap();
        let enrollment = repo
            .create_enrollment(7, user.id, section.id, EnrollmentRole::Student)
            .await
            .unwrap();

        repo.create_sync_mapping(
            7,
            config_id,
            LocalKind::Course,
            course.id,
            ExternalKind::ClassroomCourse,
            "gc-1",
        )
        .await
        .unwrap();
        repo.create_sync_mapping(
            7,
            config_id,
            LocalKind::Enrollment,
            enrollment.id,
            ExternalKind::ClassroomStudent,
            "gc-student-1",
        )
        .await
        .unwrap();

        let assignment = repo
            .create_assignment(
                7,
                course.id,
                "Essay 1",
                Some("Write an essay"),
                Some(100.0),
                NaiveDate::from_ymd_opt(2025, 10, 1),
                AssignmentStatus::Published,
            )
            .await
            .unwrap();

        PushFixture {
            config_id,
            assignment_id: assignment.id,
            user_id: user.id,
        }
    }

    fn client_for(server: &MockServer) -> ClassroomClient {
        ClassroomClient::new("tok").with_base_url(&server.uri())
    }

    #[tokio::test]
    async fn coursework_push_creates_coursework_and_mapping() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/courses/gc-1/courseWork"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "cw-123",
                "title": "Essay 1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let repo = setup_repo().await;
        let fixture = push_fixture(&repo).await;
        let push = CourseworkPush::new(repo.clone(), client_for(&server));
        let run = push
            .run(fixture.config_id, Some(3), fixture.assignment_id)
            .await
            .unwrap();

        assert_eq!(run.status, SyncStatus::Completed);
        assert_eq!(run.sync_type, SYNC_TYPE_COURSEWORK);
        assert_eq!(run.direction, SyncDirection::Push);
        assert_eq!(run.records_succeeded, 1);

        let mapping = repo
            .find_mapping_by_local(fixture.config_id, LocalKind::Assignment, fixture.assignment_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(mapping.external_id, "cw-123");
        assert_eq!(mapping.external_kind, ExternalKind::ClassroomCoursework);
    }

    #[tokio::test]
    async fn coursework_push_updates_when_mapping_exists() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/v1/courses/gc-1/courseWork/cw-existing"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "cw-existing",
                "title": "Essay 1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let repo = setup_repo().await;
        let fixture = push_fixture(&repo).await;
        repo.create_sync_mapping(
            7,
            fixture.config_id,
            LocalKind::Assignment,
            fixture.assignment_id,
            ExternalKind::ClassroomCoursework,
            "cw-existing",
        )
        .await
        .unwrap();

        let push = CourseworkPush::new(repo.clone(), client_for(&server));
        let run = push
            .run(fixture.config_id, None, fixture.assignment_id)
            .await
            .unwrap();

        assert_eq!(run.records_succeeded, 1);
        // No new mapping was created.
        assert_eq!(
            repo.list_mappings(fixture.config_id).await.unwrap().len(),
            3
        );
    }

    #[tokio::test]
    async fn coursework_push_without_course_mapping_warns_and_completes() {
        let server = MockServer::start().await;
        let repo = setup_repo().await;
        let fixture = push_fixture(&repo).await;

        // Orphan the assignment by moving it to an unmapped course.
        let year = repo.latest_academic_year(7).await.unwrap().unwrap();
        let unmapped = repo.create_course(7, year.id, "Unmapped", None).await.unwrap();
        let assignment = repo
            .create_assignment(
                7,
                unmapped.id,
                "Orphan Essay",
                None,
                None,
                None,
                AssignmentStatus::Published,
            )
            .await
            .unwrap();

        let push = CourseworkPush::new(repo.clone(), client_for(&server));
        let run = push
            .run(fixture.config_id, None, assignment.id)
            .await
            .unwrap();

        assert_eq!(run.status, SyncStatus::Completed);
        assert_eq!(run.records_processed, 1);
        assert_eq!(run.records_succeeded, 0);
        assert_eq!(run.records_failed, 0);

        let logs = repo.list_sync_logs(run.id).await.unwrap();
        assert!(logs
            .iter()
            .any(|l| l.level == LogLevel::Warn && l.message.contains("no course mapping")));
    }

    #[tokio::test]
    async fn coursework_push_provider_error_is_per_record_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/courses/gc-1/courseWork"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let repo = setup_repo().await;
        let fixture = push_fixture(&repo).await;
        let push = CourseworkPush::new(repo.clone(), client_for(&server));
        let run = push
            .run(fixture.config_id, None, fixture.assignment_id)
            .await
            .unwrap();

        assert_eq!(run.status, SyncStatus::Completed);
        assert_eq!(run.records_failed, 1);
    }

    async fn mock_submissions(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/v1/courses/gc-1/courseWork/cw-1/studentSubmissions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "studentSubmissions": [
                    { "id": "sub-1", "userId": "gc-student-1" }
                ]
            })))
            .mount(server)
            .await;
    }

    async fn coursework_mapping(repo: &SqliteRepository, fixture: &PushFixture) {
        repo.create_sync_mapping(
            7,
            fixture.config_id,
            LocalKind::Assignment,
            fixture.assignment_id,
            ExternalKind::ClassroomCoursework,
            "cw-1",
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn grade_passback_patches_matching_submission() {
        let server = MockServer::start().await;
        mock_submissions(&server).await;
        Mock::given(method("PATCH"))
            .and(path(
                "/v1/courses/gc-1/courseWork/cw-1/studentSubmissions/sub-1",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let repo = setup_repo().await;
        let fixture = push_fixture(&repo).await;
        coursework_mapping(&repo, &fixture).await;
        repo.create_submission(
            7,
            fixture.assignment_id,
            fixture.user_id,
            Some(92.5),
            SubmissionStatus::Graded,
        )
        .await
        .unwrap();

        let push = GradePassback::new(repo.clone(), client_for(&server));
        let run = push
            .run(fixture.config_id, Some(3), fixture.assignment_id)
            .await
            .unwrap();

        assert_eq!(run.status, SyncStatus::Completed);
        assert_eq!(run.sync_type, SYNC_TYPE_GRADES);
        assert_eq!(run.records_processed, 1);
        assert_eq!(run.records_succeeded, 1);
        assert_eq!(run.records_failed, 0);
    }

    #[tokio::test]
    async fn grade_passback_skips_submission_without_student_mapping() {
        let server = MockServer::start().await;
        mock_submissions(&server).await;

        let repo = setup_repo().await;
        let fixture = push_fixture(&repo).await;
        coursework_mapping(&repo, &fixture).await;

        // A second graded student with no classroom mapping.
        let stranger = repo
            .create_user(7, "stranger@school.example", "No", "Mapping", UserRole::Student)
            .await
            .unwrap();
        repo.create_submission(
            7,
            fixture.assignment_id,
            stranger.id,
            Some(75.0),
            SubmissionStatus::Returned,
        )
        .await
        .unwrap();

        let push = GradePassback::new(repo.clone(), client_for(&server));
        let run = push
            .run(fixture.config_id, None, fixture.assignment_id)
            .await
            .unwrap();

        // Warn and skip; the run does not raise and nothing is tallied as
        // succeeded or failed.
        assert_eq!(run.status, SyncStatus::Completed);
        assert_eq!(run.records_processed, 1);
        assert_eq!(run.records_succeeded, 0);
        assert_eq!(run.records_failed, 0);
        let logs = repo.list_sync_logs(run.id).await.unwrap();
        assert!(logs
            .iter()
            .any(|l| l.level == LogLevel::Warn && l.message.contains("no student mapping")));
    }

    #[tokio::test]
    async fn grade_passback_skips_when_provider_has_no_submission() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/courses/gc-1/courseWork/cw-1/studentSubmissions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "studentSubmissions": [] })),
            )
            .mount(&server)
            .await;

        let repo = setup_repo().await;
        let fixture = push_fixture(&repo).await;
        coursework_mapping(&repo, &fixture).await;
        repo.create_submission(
            7,
            fixture.assignment_id,
            fixture.user_id,
            Some(92.5),
            SubmissionStatus::Graded,
        )
        .await
        .unwrap();

        let push = GradePassback::new(repo.clone(), client_for(&server));
        let run = push
            .run(fixture.config_id, None, fixture.assignment_id)
            .await
            .unwrap();

        assert_eq!(run.status, SyncStatus::Completed);
        assert_eq!(run.records_succeeded, 0);
        let logs = repo.list_sync_logs(run.id).await.unwrap();
        assert!(logs
            .iter()
            .any(|l| l.level == LogLevel::Warn && l.message.contains("no classroom submission")));
    }

    #[tokio::test]
    async fn grade_passback_without_coursework_mapping_warns_and_completes() {
        let server = MockServer::start().await;
        let repo = setup_repo().await;
        let fixture = push_fixture(&repo).await;

        let push = GradePassback::new(repo.clone(), client_for(&server));
        let run = push
            .run(fixture.config_id, None, fixture.assignment_id)
            .await
            .unwrap();

        assert_eq!(run.status, SyncStatus::Completed);
        assert_eq!(run.records_processed, 0);
        let logs = repo.list_sync_logs(run.id).await.unwrap();
        assert!(logs
            .iter()
            .any(|l| l.level == LogLevel::Warn && l.message.contains("no coursework mapping")));
    }
}
