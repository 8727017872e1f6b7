use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::models::{
    academic_year::AcademicYear,
    assignment::Assignment,
    common::{AssignmentStatus, EnrollmentRole, SubmissionStatus, UserRole},
    course::Course,
    enrollment::Enrollment,
    integration::{IntegrationConfig, IntegrationProvider, IntegrationStatus},
    school::School,
    section::Section,
    submission::Submission,
    sync::{
        ExternalKind, LocalKind, LogLevel, RunCounter, SyncDirection, SyncLog, SyncMapping,
        SyncRun,
    },
    term::Term,
    user::User,
};

#[async_trait]
pub trait SchoolRepository: Send + Sync {
    async fn create_school(&self, tenant_id: i64, name: &str, timezone: &str) -> Result<School>;
    async fn update_school(&self, id: i64, name: &str, timezone: &str) -> Result<()>;
    async fn get_school(&self, id: i64) -> Result<Option<School>>;
    async fn list_schools(&self, tenant_id: i64) -> Result<Vec<School>>;
}

#[async_trait]
pub trait AcademicYearRepository: Send + Sync {
    async fn create_academic_year(
        &self,
        tenant_id: i64,
        name: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<AcademicYear>;
    async fn update_academic_year(
        &self,
        id: i64,
        name: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<()>;
    async fn get_academic_year(&self, id: i64) -> Result<Option<AcademicYear>>;
    /// Most recently starting year for the tenant; the term-parent fallback.
    async fn latest_academic_year(&self, tenant_id: i64) -> Result<Option<AcademicYear>>;
    async fn list_academic_years(&self, tenant_id: i64) -> Result<Vec<AcademicYear>>;
}

#[async_trait]
pub trait TermRepository: Send + Sync {
    async fn create_term(
        &self,
        tenant_id: i64,
        academic_year_id: i64,
        name: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Term>;
    async fn update_term(
        &self,
        id: i64,
        academic_year_id: i64,
        name: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<()>;
    async fn get_term(&self, id: i64) -> Result<Option<Term>>;
    async fn latest_term(&self, tenant_id: i64) -> Result<Option<Term>>;
    async fn list_terms(&self, tenant_id: i64) -> Result<Vec<Term>>;
}

#[async_trait]
pub trait CourseRepository: Send + Sync {
    async fn create_course(
        &self,
        tenant_id: i64,
        academic_year_id: i64,
        name: &str,
        code: Option<&str>,
    ) -> Result<Course>;
    async fn update_course(&self, id: i64, name: &str, code: Option<&str>) -> Result<()>;
    async fn get_course(&self, id: i64) -> Result<Option<Course>>;
    async fn list_courses(&self, tenant_id: i64) -> Result<Vec<Course>>;
}

#[async_trait]
pub trait SectionRepository: Send + Sync {
    async fn create_section(
        &self,
        tenant_id: i64,
        course_id: i64,
        term_id: i64,
        name: &str,
    ) -> Result<Section>;
    async fn get_section(&self, id: i64) -> Result<Option<Section>>;
    /// Oldest section of a course, the default target for imported enrollments.
    async fn first_section_for_course(&self, course_id: i64) -> Result<Option<Section>>;
    async fn list_sections(&self, tenant_id: i64) -> Result<Vec<Section>>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(
        &self,
        tenant_id: i64,
        email: &str,
        first_name: &str,
        last_name: &str,
        role: UserRole,
    ) -> Result<User>;
    async fn update_user(
        &self,
        id: i64,
        email: &str,
        first_name: &str,
        last_name: &str,
        role: UserRole,
    ) -> Result<()>;
    async fn get_user(&self, id: i64) -> Result<Option<User>>;
    async fn find_user_by_email(&self, tenant_id: i64, email: &str) -> Result<Option<User>>;
    async fn list_users(&self, tenant_id: i64) -> Result<Vec<User>>;
}

#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    async fn create_enrollment(
        &self,
        tenant_id: i64,
        user_id: i64,
        section_id: i64,
        role: EnrollmentRole,
    ) -> Result<Enrollment>;
    async fn update_enrollment(
        &self,
        id: i64,
        user_id: i64,
        section_id: i64,
        role: EnrollmentRole,
    ) -> Result<()>;
    async fn get_enrollment(&self, id: i64) -> Result<Option<Enrollment>>;
    async fn find_enrollment(&self, user_id: i64, section_id: i64) -> Result<Option<Enrollment>>;
    async fn list_enrollments(&self, tenant_id: i64) -> Result<Vec<Enrollment>>;
}

#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    #[allow(clippy::too_many_arguments)]
    async fn create_assignment(
        &self,
        tenant_id: i64,
        course_id: i64,
        title: &str,
        description: Option<&str>,
        points_possible: Option<f64>,
        due_date: Option<NaiveDate>,
        status: AssignmentStatus,
    ) -> Result<Assignment>;
    async fn get_assignment(&self, id: i64) -> Result<Option<Assignment>>;
}

#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    async fn create_submission(
        &self,
        tenant_id: i64,
        assignment_id: i64,
        user_id: i64,
        grade: Option<f64>,
        status: SubmissionStatus,
    ) -> Result<Submission>;
    /// Graded or returned submissions carrying a grade, for passback.
    async fn list_graded_submissions(&self, assignment_id: i64) -> Result<Vec<Submission>>;
}

#[async_trait]
pub trait IntegrationConfigRepository: Send + Sync {
    async fn create_integration_config(
        &self,
        tenant_id: i64,
        provider: IntegrationProvider,
        status: IntegrationStatus,
        settings: &serde_json::Value,
    ) -> Result<IntegrationConfig>;
    async fn get_integration_config(&self, id: i64) -> Result<Option<IntegrationConfig>>;
}

#[async_trait]
pub trait SyncRunRepository: Send + Sync {
    async fn create_sync_run(
        &self,
        tenant_id: i64,
        integration_config_id: i64,
        sync_type: &str,
        direction: SyncDirection,
        triggered_by: Option<i64>,
    ) -> Result<SyncRun>;
    /// pending → running. Errors if the run is in any other state.
    async fn mark_run_running(&self, id: i64) -> Result<()>;
    /// running → completed. Errors if the run is in any other state.
    async fn mark_run_completed(&self, id: i64) -> Result<()>;
    /// running → failed with a captured message. Errors if not running.
    async fn mark_run_failed(&self, id: i64, error_message: &str) -> Result<()>;
    /// Atomic `SET counter = counter + 1`.
    async fn increment_run_counter(&self, id: i64, counter: RunCounter) -> Result<()>;
    async fn get_sync_run(&self, id: i64) -> Result<Option<SyncRun>>;
    async fn list_recent_runs(&self, tenant_id: i64, limit: i64) -> Result<Vec<SyncRun>>;
}

#[async_trait]
pub trait SyncLogRepository: Send + Sync {
    #[allow(clippy::too_many_arguments)]
    async fn append_sync_log(
        &self,
        sync_run_id: i64,
        level: LogLevel,
        message: &str,
        entity_type: Option<LocalKind>,
        entity_id: Option<i64>,
        external_id: Option<&str>,
        metadata: Option<&serde_json::Value>,
    ) -> Result<i64>;
    async fn list_sync_logs(&self, sync_run_id: i64) -> Result<Vec<SyncLog>>;
}

#[async_trait]
pub trait SyncMappingRepository: Send + Sync {
    async fn create_sync_mapping(
        &self,
        tenant_id: i64,
        integration_config_id: i64,
        local_kind: LocalKind,
        local_id: i64,
        external_kind: ExternalKind,
        external_id: &str,
    ) -> Result<SyncMapping>;
    async fn get_sync_mapping(&self, id: i64) -> Result<Option<SyncMapping>>;
    async fn find_mapping_by_external(
        &self,
        integration_config_id: i64,
        external_kind: ExternalKind,
        external_id: &str,
    ) -> Result<Option<SyncMapping>>;
    async fn find_mapping_by_local(
        &self,
        integration_config_id: i64,
        local_kind: LocalKind,
        local_id: i64,
    ) -> Result<Option<SyncMapping>>;
    /// Refresh last_synced_at (and the local pointer) after a successful
    /// reconciliation.
    async fn touch_mapping(&self, id: i64, local_id: i64) -> Result<()>;
    /// First mapping joining an external kind to a local kind for a config;
    /// used to locate the imported academic year for class reconciliation.
    async fn first_mapping_for_kinds(
        &self,
        integration_config_id: i64,
        external_kind: ExternalKind,
        local_kind: LocalKind,
    ) -> Result<Option<SyncMapping>>;
    /// The classroom_student mapping whose enrollment belongs to the given
    /// user, resolved through the enrollments table. Used by grade passback.
    async fn find_student_mapping_for_user(
        &self,
        integration_config_id: i64,
        user_id: i64,
    ) -> Result<Option<SyncMapping>>;
    async fn list_mappings(&self, integration_config_id: i64) -> Result<Vec<SyncMapping>>;
}

/// Combined repository trait for all entity types.
pub trait SlateRepository:
    SchoolRepository
    + AcademicYearRepository
    + TermRepository
    + CourseRepository
    + SectionRepository
    + UserRepository
    + EnrollmentRepository
    + AssignmentRepository
    + SubmissionRepository
    + IntegrationConfigRepository
    + SyncRunRepository
    + SyncLogRepository
    + SyncMappingRepository
{
}
