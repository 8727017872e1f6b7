//! Inbound classroom sync: course import and per-course roster import.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use slate_core::db::repository::SlateRepository;
use slate_core::error::{Result, SlateError};
use slate_core::models::common::{EnrollmentRole, UserRole};
use slate_core::models::sync::{ExternalKind, LocalKind, SyncDirection, SyncRun};
use slate_core::sync::context::SyncContext;
use slate_core::sync::ledger::RunLedger;
use slate_core::sync::reconcile::{
    run_pass, Admission, Applied, ApplyOutcome, RecordAdapter,
};
use slate_core::sync::roster::adapters::{ensure_section, resolve_academic_year};

use crate::client::ClassroomClient;
use crate::models::{ClassroomCourse, ClassroomStudent};

pub const SYNC_TYPE_COURSE: &str = "classroom_course_sync";
pub const SYNC_TYPE_ROSTER: &str = "classroom_roster_sync";

/// Pull the caller's classroom courses into local Courses.
pub struct ClassroomCourseSync<R> {
    repo: Arc<R>,
    client: ClassroomClient,
}

impl<R: SlateRepository> ClassroomCourseSync<R> {
    pub fn new(repo: Arc<R>, client: ClassroomClient) -> Self {
        Self { repo, client }
    }

    pub async fn run(&self, config_id: i64, triggered_by: Option<i64>) -> Result<SyncRun> {
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
            SYNC_TYPE_COURSE,
            SyncDirection::Pull,
            triggered_by,
        )
        .await?;
        ledger.start().await?;
        info!(config_id, run_id = ledger.run_id(), "starting classroom course sync");

        match self.execute(&ctx, &ledger).await {
            Ok(()) => {
                ledger.complete().await?;
                ledger.reload().await
            }
            Err(e) => {
                error!(run_id = ledger.run_id(), error = %e, "classroom course sync failed");
                ledger.fail(&e.to_string()).await?;
                Err(e)
            }
        }
    }

    async fn execute(&self, ctx: &SyncContext, ledger: &RunLedger<'_, R>) -> Result<()> {
        let courses = self.client.list_courses().await?;
        info!(count = courses.len(), "fetched classroom courses");
        run_pass(
            self.repo.as_ref(),
            ctx,
            ledger,
            &ClassroomCourseAdapter,
            &courses,
            "classroom course",
        )
        .await
    }
}

struct ClassroomCourseAdapter;

#[async_trait]
impl<R: SlateRepository> RecordAdapter<R> for ClassroomCourseAdapter {
    type Record = ClassroomCourse;

    fn local_kind(&self) -> LocalKind {
        LocalKind::Course
    }

    fn external_kind(&self) -> ExternalKind {
        ExternalKind::ClassroomCourse
    }

    fn external_id<'r>(&self, record: &'r ClassroomCourse) -> &'r str {
        &record.id
    }

    async fn apply(
        &self,
        repo: &R,
        ctx: &SyncContext,
        existing: Option<i64>,
        record: &ClassroomCourse,
    ) -> Result<Applied> {
        let name = if record.name.trim().is_empty() {
            "Imported Course"
        } else {
            record.name.trim()
        };

        match existing {
            Some(id) => {
                let course = repo.get_course(id).await?.ok_or_else(|| {
                    SlateError::Sync(format!("mapped course {id} is missing"))
                })?;
                if course.name != name {
                    repo.update_course(id, name, course.code.as_deref()).await?;
                    Ok(Applied {
                        local_id: id,
                        outcome: ApplyOutcome::Updated,
                    })
                } else {
                    Ok(Applied {
                        local_id: id,
                        outcome: ApplyOutcome::Unchanged,
                    })
                }
            }
            None => {
                let year = resolve_academic_year(repo, ctx).await?;
                let course = repo.create_course(ctx.tenant_id, year.id, name, None).await?;
                Ok(Applied {
                    local_id: course.id,
                    outcome: ApplyOutcome::Created,
                })
            }
        }
    }
}

/// Pull the student roster of one mapped classroom course.
pub struct ClassroomRosterSync<R> {
    repo: Arc<R>,
    client: ClassroomClient,
}

impl<R: SlateRepository> ClassroomRosterSync<R> {
    pub fn new(repo: Arc<R>, client: ClassroomClient) -> Self {
        Self { repo, client }
    }

    pub async fn run(
        &self,
        config_id: i64,
        triggered_by: Option<i64>,
        course_mapping_id: i64,
    ) -> Result<SyncRun> {
        let config = self
            .repo
            .get_integration_config(config_id)
            .await?
            .ok_or_else(|| {
                SlateError::Config(format!("integration config {config_id} not found"))
            })?;
        config.ensure_active()?;
        let domain = config.classroom_settings()?.domain;

        let ctx = SyncContext::new(config);
        let ledger = RunLedger::create(
            self.repo.as_ref(),
            &ctx,
            SYNC_TYPE_ROSTER,
            SyncDirection::Pull,
            triggered_by,
        )
        .await?;
        ledger.start().await?;
        info!(config_id, run_id = ledger.run_id(), course_mapping_id, "starting classroom roster sync");

        match self
            .execute(&ctx, &ledger, course_mapping_id, domain)
            .await
        {
            Ok(()) => {
                ledger.complete().await?;
                ledger.reload().await
            }
            Err(e) => {
                error!(run_id = ledger.run_id(), error = %e, "classroom roster sync failed");
                ledger.fail(&e.to_string()).await?;
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        ctx: &SyncContext,
        ledger: &RunLedger<'_, R>,
        course_mapping_id: i64,
        domain: Option<String>,
    ) -> Result<()> {
        let repo = self.repo.as_ref();
        let mapping = repo
            .get_sync_mapping(course_mapping_id)
            .await?
            .ok_or_else(|| {
                SlateError::Sync(format!("course mapping {course_mapping_id} not found"))
            })?;
        if mapping.external_kind != ExternalKind::ClassroomCourse {
            return Err(SlateError::Sync(format!(
                "mapping {course_mapping_id} is not a classroom course mapping"
            )));
        }
        let course = repo.get_course(mapping.local_id).await?.ok_or_else(|| {
            SlateError::Sync(format!("mapped course {} is missing", mapping.local_id))
        })?;

        let section = ensure_section(repo, ctx, &course).await?;
        let students = self.client.list_students(&mapping.external_id).await?;
        info!(count = students.len(), course = %mapping.external_id, "fetched classroom students");

        let adapter = ClassroomStudentAdapter {
            section_id: section.id,
            domain,
        };
        run_pass(repo, ctx, ledger, &adapter, &students, "classroom student").await
    }
}

struct ClassroomStudentAdapter {
    section_id: i64,
    domain: Option<String>,
}

impl ClassroomStudentAdapter {
    fn email_of(record: &ClassroomStudent) -> Option<&str> {
        record
            .profile
            .as_ref()
            .and_then(|p| p.email_address.as_deref())
            .map(str::trim)
            .filter(|e| !e.is_empty())
    }
}

#[async_trait]
impl<R: SlateRepository> RecordAdapter<R> for ClassroomStudentAdapter {
    type Record = ClassroomStudent;

    fn local_kind(&self) -> LocalKind {
        LocalKind::Enrollment
    }

    fn external_kind(&self) -> ExternalKind {
        ExternalKind::ClassroomStudent
    }

    fn external_id<'r>(&self, record: &'r ClassroomStudent) -> &'r str {
        &record.user_id
    }

    fn admit(&self, record: &ClassroomStudent) -> Admission {
        let Some(email) = Self::email_of(record) else {
            return Admission::SkipWarn(format!(
                "skipping student {} without email",
                record.user_id
            ));
        };
        if let Some(domain) = &self.domain {
            if !email.ends_with(&format!("@{domain}")) {
                return Admission::SkipWarn(format!("skipping student outside domain: {email}"));
            }
        }
        Admission::Process
    }

    async fn apply(
        &self,
        repo: &R,
        ctx: &SyncContext,
        existing: Option<i64>,
        record: &ClassroomStudent,
    ) -> Result<Applied> {
        let email = Self::email_of(record).ok_or_else(|| {
            SlateError::Validation(format!("student {} has no email", record.user_id))
        })?;
        let name = record.profile.as_ref().and_then(|p| p.name.as_ref());
        let first_name = name
            .and_then(|n| n.given_name.as_deref())
            .unwrap_or("Unknown");
        let last_name = name
            .and_then(|n| n.family_name.as_deref())
            .unwrap_or("Student");

        let user = match repo.find_user_by_email(ctx.tenant_id, email).await? {
            Some(user) => user,
            None => {
                repo.create_user(ctx.tenant_id, email, first_name, last_name, UserRole::Student)
                    .await?
            }
        };

        let enrollment = match existing {
            Some(id) => Some(repo.get_enrollment(id).await?.ok_or_else(|| {
                SlateError::Sync(format!("mapped enrollment {id} is missing"))
            })?),
            None => repo.find_enrollment(user.id, self.section_id).await?,
        };

        match enrollment {
            Some(enrollment) => Ok(Applied {
                local_id: enrollment.id,
                outcome: ApplyOutcome::Unchanged,
            }),
            None => {
                let enrollment = repo
                    .create_enrollment(ctx.tenant_id, user.id, self.section_id, EnrollmentRole::Student)
                    .await?;
                Ok(Applied {
                    local_id: enrollment.id,
                    outcome: ApplyOutcome::Created,
                })
            }
        }
    }
}
