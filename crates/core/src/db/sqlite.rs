use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Row, SqlitePool};

use crate::error::{Result, SlateError};
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
        SyncRun, SyncStatus,
    },
    term::Term,
    user::User,
};

use super::repository::{
    AcademicYearRepository, AssignmentRepository, CourseRepository, EnrollmentRepository,
    IntegrationConfigRepository, SchoolRepository, SectionRepository, SlateRepository,
    SubmissionRepository, SyncLogRepository, SyncMappingRepository, SyncRunRepository,
    TermRepository, UserRepository,
};

#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl SlateRepository for SqliteRepository {}

// -- Helper functions for the TEXT-backed column encodings --

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn datetime_to_str(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn parse_naive_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| SlateError::Serialization(format!("invalid date '{s}': {e}")))
}

fn naive_date_to_str(d: &NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

fn parse_json(s: &str) -> Result<serde_json::Value> {
    serde_json::from_str(s).map_err(|e| SlateError::Serialization(format!("invalid JSON: {e}")))
}

fn validate_email(email: &str) -> Result<()> {
    let trimmed = email.trim();
    if trimmed.is_empty() || !trimmed.contains('@') {
        return Err(SlateError::Validation(format!(
            "user email '{email}' is invalid"
        )));
    }
    Ok(())
}

fn validate_date_range(start: &NaiveDate, end: &NaiveDate) -> Result<()> {
    if end <= start {
        return Err(SlateError::Validation(format!(
            "end date {end} must be after start date {start}"
        )));
    }
    Ok(())
}

// -- Row mappers --

fn school_from_row(r: &sqlx::sqlite::SqliteRow) -> School {
    School {
        id: r.get("id"),
        tenant_id: r.get("tenant_id"),
        name: r.get("name"),
        timezone: r.get("timezone"),
        created_at: parse_datetime(r.get("created_at")),
        updated_at: parse_datetime(r.get("updated_at")),
    }
}

fn academic_year_from_row(r: &sqlx::sqlite::SqliteRow) -> Result<AcademicYear> {
    Ok(AcademicYear {
        id: r.get("id"),
        tenant_id: r.get("tenant_id"),
        name: r.get("name"),
        start_date: parse_naive_date(r.get("start_date"))?,
        end_date: parse_naive_date(r.get("end_date"))?,
        created_at: parse_datetime(r.get("created_at")),
        updated_at: parse_datetime(r.get("updated_at")),
    })
}

fn term_from_row(r: &sqlx::sqlite::SqliteRow) -> Result<Term> {
    Ok(Term {
        id: r.get("id"),
        tenant_id: r.get("tenant_id"),
        academic_year_id: r.get("academic_year_id"),
        name: r.get("name"),
        start_date: parse_naive_date(r.get("start_date"))?,
        end_date: parse_naive_date(r.get("end_date"))?,
        created_at: parse_datetime(r.get("created_at")),
        updated_at: parse_datetime(r.get("updated_at")),
    })
}

fn course_from_row(r: &sqlx::sqlite::SqliteRow) -> Course {
    Course {
        id: r.get("id"),
        tenant_id: r.get("tenant_id"),
        academic_year_id: r.get("academic_year_id"),
        name: r.get("name"),
        code: r.get("code"),
        created_at: parse_datetime(r.get("created_at")),
        updated_at: parse_datetime(r.get("updated_at")),
    }
}

fn section_from_row(r: &sqlx::sqlite::SqliteRow) -> Section {
    Section {
        id: r.get("id"),
        tenant_id: r.get("tenant_id"),
        course_id: r.get("course_id"),
        term_id: r.get("term_id"),
        name: r.get("name"),
        created_at: parse_datetime(r.get("created_at")),
        updated_at: parse_datetime(r.get("updated_at")),
    }
}

fn user_from_row(r: &sqlx::sqlite::SqliteRow) -> Result<User> {
    Ok(User {
        id: r.get("id"),
        tenant_id: r.get("tenant_id"),
        email: r.get("email"),
        first_name: r.get("first_name"),
        last_name: r.get("last_name"),
        role: UserRole::parse(r.get("role"))?,
        created_at: parse_datetime(r.get("created_at")),
        updated_at: parse_datetime(r.get("updated_at")),
    })
}

fn enrollment_from_row(r: &sqlx::sqlite::SqliteRow) -> Result<Enrollment> {
    Ok(Enrollment {
        id: r.get("id"),
        tenant_id: r.get("tenant_id"),
        user_id: r.get("user_id"),
        section_id: r.get("section_id"),
        role: EnrollmentRole::parse(r.get("role"))?,
        created_at: parse_datetime(r.get("created_at")),
        updated_at: parse_datetime(r.get("updated_at")),
    })
}

fn assignment_from_row(r: &sqlx::sqlite::SqliteRow) -> Result<Assignment> {
    let due_date = match r.get::<Option<String>, _>("due_date") {
        Some(s) => Some(parse_naive_date(&s)?),
        None => None,
    };
    Ok(Assignment {
        id: r.get("id"),
        tenant_id: r.get("tenant_id"),
        course_id: r.get("course_id"),
        title: r.get("title"),
        description: r.get("description"),
        points_possible: r.get("points_possible"),
        due_date,
        status: AssignmentStatus::parse(r.get("status"))?,
        created_at: parse_datetime(r.get("created_at")),
        updated_at: parse_datetime(r.get("updated_at")),
    })
}

fn submission_from_row(r: &sqlx::sqlite::SqliteRow) -> Result<Submission> {
    Ok(Submission {
        id: r.get("id"),
        tenant_id: r.get("tenant_id"),
        assignment_id: r.get("assignment_id"),
        user_id: r.get("user_id"),
        grade: r.get("grade"),
        status: SubmissionStatus::parse(r.get("status"))?,
        created_at: parse_datetime(r.get("created_at")),
        updated_at: parse_datetime(r.get("updated_at")),
    })
}

fn integration_config_from_row(r: &sqlx::sqlite::SqliteRow) -> Result<IntegrationConfig> {
    Ok(IntegrationConfig {
        id: r.get("id"),
        tenant_id: r.get("tenant_id"),
        provider: IntegrationProvider::parse(r.get("provider"))?,
        status: IntegrationStatus::parse(r.get("status"))?,
        settings: parse_json(r.get("settings"))?,
        created_at: parse_datetime(r.get("created_at")),
    })
}

fn sync_run_from_row(r: &sqlx::sqlite::SqliteRow) -> Result<SyncRun> {
    Ok(SyncRun {
        id: r.get("id"),
        tenant_id: r.get("tenant_id"),
        integration_config_id: r.get("integration_config_id"),
        sync_type: r.get("sync_type"),
        direction: SyncDirection::parse(r.get("direction"))?,
        status: SyncStatus::parse(r.get("status"))?,
        started_at: r
            .get::<Option<String>, _>("started_at")
            .map(|s| parse_datetime(&s)),
        completed_at: r
            .get::<Option<String>, _>("completed_at")
            .map(|s| parse_datetime(&s)),
        records_processed: r.get("records_processed"),
        records_succeeded: r.get("records_succeeded"),
        records_failed: r.get("records_failed"),
        error_message: r.get("error_message"),
        triggered_by: r.get("triggered_by"),
        created_at: parse_datetime(r.get("created_at")),
    })
}

fn sync_log_from_row(r: &sqlx::sqlite::SqliteRow) -> Result<SyncLog> {
    let entity_type = match r.get::<Option<String>, _>("entity_type") {
        Some(s) => Some(LocalKind::parse(&s)?),
        None => None,
    };
    let metadata = match r.get::<Option<String>, _>("metadata") {
        Some(s) => Some(parse_json(&s)?),
        None => None,
    };
    Ok(SyncLog {
        id: r.get("id"),
        sync_run_id: r.get("sync_run_id"),
        level: LogLevel::parse(r.get("level"))?,
        message: r.get("message"),
        entity_type,
        entity_id: r.get("entity_id"),
        external_id: r.get("external_id"),
        metadata,
        created_at: parse_datetime(r.get("created_at")),
    })
}

fn sync_mapping_from_row(r: &sqlx::sqlite::SqliteRow) -> Result<SyncMapping> {
    Ok(SyncMapping {
        id: r.get("id"),
        tenant_id: r.get("tenant_id"),
        integration_config_id: r.get("integration_config_id"),
        local_kind: LocalKind::parse(r.get("local_type"))?,
        local_id: r.get("local_id"),
        external_kind: ExternalKind::parse(r.get("external_type"))?,
        external_id: r.get("external_id"),
        last_synced_at: r
            .get::<Option<String>, _>("last_synced_at")
            .map(|s| parse_datetime(&s)),
        created_at: parse_datetime(r.get("created_at")),
    })
}

// -- SchoolRepository --

#[async_trait]
impl SchoolRepository for SqliteRepository {
    async fn create_school(&self, tenant_id: i64, name: &str, timezone: &str) -> Result<School> {
        if name.trim().is_empty() {
            return Err(SlateError::Validation("school name is required".into()));
        }
        let now = Utc::now();
        let now_str = datetime_to_str(&now);
        let result = sqlx::query(
            "INSERT INTO schools (tenant_id, name, timezone, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
        )
        .bind(tenant_id)
        .bind(name)
        .bind(timezone)
        .bind(&now_str)
        .execute(&self.pool)
        .await?;

        Ok(School {
            id: result.last_insert_rowid(),
            tenant_id,
            name: name.to_string(),
            timezone: timezone.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    async fn update_school(&self, id: i64, name: &str, timezone: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(SlateError::Validation("school name is required".into()));
        }
        sqlx::query("UPDATE schools SET name = ?1, timezone = ?2, updated_at = ?3 WHERE id = ?4")
            .bind(name)
            .bind(timezone)
            .bind(datetime_to_str(&Utc::now()))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_school(&self, id: i64) -> Result<Option<School>> {
        let row = sqlx::query("SELECT * FROM schools WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| school_from_row(&r)))
    }

    async fn list_schools(&self, tenant_id: i64) -> Result<Vec<School>> {
        let rows = sqlx::query("SELECT * FROM schools WHERE tenant_id = ?1 ORDER BY id")
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(school_from_row).collect())
    }
}

// -- AcademicYearRepository --

#[async_trait]
impl AcademicYearRepository for SqliteRepository {
    async fn create_academic_year(
        &self,
        tenant_id: i64,
        name: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<AcademicYear> {
        validate_date_range(&start_date, &end_date)?;
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO academic_years (tenant_id, name, start_date, end_date, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        )
        .bind(tenant_id)
        .bind(name)
        .bind(naive_date_to_str(&start_date))
        .bind(naive_date_to_str(&end_date))
        .bind(datetime_to_str(&now))
        .execute(&self.pool)
        .await?;

        Ok(AcademicYear {
            id: result.last_insert_rowid(),
            tenant_id,
            name: name.to_string(),
            start_date,
            end_date,
            created_at: now,
            updated_at: now,
        })
    }

    async fn update_academic_year(
        &self,
        id: i64,
        name: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<()> {
        validate_date_range(&start_date, &end_date)?;
        sqlx::query(
            "UPDATE academic_years SET name = ?1, start_date = ?2, end_date = ?3, updated_at = ?4 WHERE id = ?5",
        )
        .bind(name)
        .bind(naive_date_to_str(&start_date))
        .bind(naive_date_to_str(&end_date))
        .bind(datetime_to_str(&Utc::now()))
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_academic_year(&self, id: i64) -> Result<Option<AcademicYear>> {
        let row = sqlx::query("SELECT * FROM academic_years WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| academic_year_from_row(&r)).transpose()
    }

    async fn latest_academic_year(&self, tenant_id: i64) -> Result<Option<AcademicYear>> {
        let row = sqlx::query(
            "SELECT * FROM academic_years WHERE tenant_id = ?1 ORDER BY start_date DESC, id DESC LIMIT 1",
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| academic_year_from_row(&r)).transpose()
    }

    async fn list_academic_years(&self, tenant_id: i64) -> Result<Vec<AcademicYear>> {
        let rows = sqlx::query("SELECT * FROM academic_years WHERE tenant_id = ?1 ORDER BY id")
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(academic_year_from_row).collect()
    }
}

// -- TermRepository --

#[async_trait]
impl TermRepository for SqliteRepository {
    async fn create_term(
        &self,
        tenant_id: i64,
        academic_year_id: i64,
        name: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Term> {
        validate_date_range(&start_date, &end_date)?;
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO terms (tenant_id, academic_year_id, name, start_date, end_date, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        )
        .bind(tenant_id)
        .bind(academic_year_id)
        .bind(name)
        .bind(naive_date_to_str(&start_date))
        .bind(naive_date_to_str(&end_date))
        .bind(datetime_to_str(&now))
        .execute(&self.pool)
        .await?;

        Ok(Term {
            id: result.last_insert_rowid(),
            tenant_id,
            academic_year_id,
            name: name.to_string(),
            start_date,
            end_date,
            created_at: now,
            updated_at: now,
        })
    }

    async fn update_term(
        &self,
        id: i64,
        academic_year_id: i64,
        name: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<()> {
        validate_date_range(&start_date, &end_date)?;
        sqlx::query(
            "UPDATE terms SET academic_year_id = ?1, name = ?2, start_date = ?3, end_date = ?4, updated_at = ?5 WHERE id = ?6",
        )
        .bind(academic_year_id)
        .bind(name)
        .bind(naive_date_to_str(&start_date))
        .bind(naive_date_to_str(&end_date))
        .bind(datetime_to_str(&Utc::now()))
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_term(&self, id: i64) -> Result<Option<Term>> {
        let row = sqlx::query("SELECT * FROM terms WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| term_from_row(&r)).transpose()
    }

    async fn latest_term(&self, tenant_id: i64) -> Result<Option<Term>> {
        let row = sqlx::query(
            "SELECT * FROM terms WHERE tenant_id = ?1 ORDER BY start_date DESC, id DESC LIMIT 1",
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| term_from_row(&r)).transpose()
    }

    async fn list_terms(&self, tenant_id: i64) -> Result<Vec<Term>> {
        let rows = sqlx::query("SELECT * FROM terms WHERE tenant_id = ?1 ORDER BY id")
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(term_from_row).collect()
    }
}

// -- CourseRepository --

#[async_trait]
impl CourseRepository for SqliteRepository {
    async fn create_course(
        &self,
        tenant_id: i64,
        academic_year_id: i64,
        name: &str,
        code: Option<&str>,
    ) -> Result<Course> {
        if name.trim().is_empty() {
            return Err(SlateError::Validation("course name is required".into()));
        }
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO courses (tenant_id, academic_year_id, name, code, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        )
        .bind(tenant_id)
        .bind(academic_year_id)
        .bind(name)
        .bind(code)
        .bind(datetime_to_str(&now))
        .execute(&self.pool)
        .await?;

        Ok(Course {
            id: result.last_insert_rowid(),
            tenant_id,
            academic_year_id,
            name: name.to_string(),
            code: code.map(str::to_string),
            created_at: now,
            updated_at: now,
        })
    }

    async fn update_course(&self, id: i64, name: &str, code: Option<&str>) -> Result<()> {
        if name.trim().is_empty() {
            return Err(SlateError::Validation("course name is required".into()));
        }
        sqlx::query("UPDATE courses SET name = ?1, code = ?2, updated_at = ?3 WHERE id = ?4")
            .bind(name)
            .bind(code)
            .bind(datetime_to_str(&Utc::now()))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_course(&self, id: i64) -> Result<Option<Course>> {
        let row = sqlx::query("SELECT * FROM courses WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| course_from_row(&r)))
    }

    async fn list_courses(&self, tenant_id: i64) -> Result<Vec<Course>> {
        let rows = sqlx::query("SELECT * FROM courses WHERE tenant_id = ?1 ORDER BY id")
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(course_from_row).collect())
    }
}

// -- SectionRepository --

#[async_trait]
impl SectionRepository for SqliteRepository {
    async fn create_section(
        &self,
        tenant_id: i64,
        course_id: i64,
        term_id: i64,
        name: &str,
    ) -> Result<Section> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO sections (tenant_id, course_id, term_id, name, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        )
        .bind(tenant_id)
        .bind(course_id)
        .bind(term_id)
        .bind(name)
        .bind(datetime_to_str(&now))
        .execute(&self.pool)
        .await?;

        Ok(Section {
            id: result.last_insert_rowid(),
            tenant_id,
            course_id,
            term_id,
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_section(&self, id: i64) -> Result<Option<Section>> {
        let row = sqlx::query("SELECT * FROM sections WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| section_from_row(&r)))
    }

    async fn first_section_for_course(&self, course_id: i64) -> Result<Option<Section>> {
        let row = sqlx::query("SELECT * FROM sections WHERE course_id = ?1 ORDER BY id LIMIT 1")
            .bind(course_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| section_from_row(&r)))
    }

    async fn list_sections(&self, tenant_id: i64) -> Result<Vec<Section>> {
        let rows = sqlx::query("SELECT * FROM sections WHERE tenant_id = ?1 ORDER BY id")
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(section_from_row).collect())
    }
}

// -- UserRepository --

#[async_trait]
impl UserRepository for SqliteRepository {
    async fn create_user(
        &self,
        tenant_id: i64,
        email: &str,
        first_name: &str,
        last_name: &str,
        role: UserRole,
    ) -> Result<User> {
        validate_email(email)?;
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO users (tenant_id, email, first_name, last_name, role, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        )
        .bind(tenant_id)
        .bind(email)
        .bind(first_name)
        .bind(last_name)
        .bind(role.as_str())
        .bind(datetime_to_str(&now))
        .execute(&self.pool)
        .await?;

        Ok(User {
            id: result.last_insert_rowid(),
            tenant_id,
            email: email.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            role,
            created_at: now,
            updated_at: now,
        })
    }

    async fn update_user(
        &self,
        id: i64,
        email: &str,
        first_name: &str,
        last_name: &str,
        role: UserRole,
    ) -> Result<()> {
        validate_email(email)?;
        sqlx::query(
            "UPDATE users SET email = ?1, first_name = ?2, last_name = ?3, role = ?4, updated_at = ?5 WHERE id = ?6",
        )
        .bind(email)
        .bind(first_name)
        .bind(last_name)
        .bind(role.as_str())
        .bind(datetime_to_str(&Utc::now()))
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| user_from_row(&r)).transpose()
    }

    async fn find_user_by_email(&self, tenant_id: i64, email: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE tenant_id = ?1 AND email = ?2")
            .bind(tenant_id)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| user_from_row(&r)).transpose()
    }

    async fn list_users(&self, tenant_id: i64) -> Result<Vec<User>> {
        let rows = sqlx::query("SELECT * FROM users WHERE tenant_id = ?1 ORDER BY id")
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(user_from_row).collect()
    }
}

// -- EnrollmentRepository --

#[async_trait]
impl EnrollmentRepository for SqliteRepository {
    async fn create_enrollment(
        &self,
        tenant_id: i64,
        user_id: i64,
        section_id: i64,
        role: EnrollmentRole,
    ) -> Result<Enrollment> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO enrollments (tenant_id, user_id, section_id, role, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        )
        .bind(tenant_id)
        .bind(user_id)
        .bind(section_id)
        .bind(role.as_str())
        .bind(datetime_to_str(&now))
        .execute(&self.pool)
        .await?;

        Ok(Enrollment {
            id: result.last_insert_rowid(),
            tenant_id,
            user_id,
            section_id,
            role,
            created_at: now,
            updated_at: now,
        })
    }

    async fn update_enrollment(
        &self,
        id: i64,
        user_id: i64,
        section_id: i64,
        role: EnrollmentRole,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE enrollments SET user_id = ?1, section_id = ?2, role = ?3, updated_at = ?4 WHERE id = ?5",
        )
        .bind(user_id)
        .bind(section_id)
        .bind(role.as_str())
        .bind(datetime_to_str(&Utc::now()))
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_enrollment(&self, id: i64) -> Result<Option<Enrollment>> {
        let row = sqlx::query("SELECT * FROM enrollments WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| enrollment_from_row(&r)).transpose()
    }

    async fn find_enrollment(&self, user_id: i64, section_id: i64) -> Result<Option<Enrollment>> {
        let row = sqlx::query("SELECT * FROM enrollments WHERE user_id = ?1 AND section_id = ?2")
            .bind(user_id)
            .bind(section_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| enrollment_from_row(&r)).transpose()
    }

    async fn list_enrollments(&self, tenant_id: i64) -> Result<Vec<Enrollment>> {
        let rows = sqlx::query("SELECT * FROM enrollments WHERE tenant_id = ?1 ORDER BY id")
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(enrollment_from_row).collect()
    }
}

// -- AssignmentRepository --

#[async_trait]
impl AssignmentRepository for SqliteRepository {
    async fn create_assignment(
        &self,
        tenant_id: i64,
        course_id: i64,
        title: &str,
        description: Option<&str>,
        points_possible: Option<f64>,
        due_date: Option<NaiveDate>,
        status: AssignmentStatus,
    ) -> Result<Assignment> {
        if title.trim().is_empty() {
            return Err(SlateError::Validation("assignment title is required".into()));
        }
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO assignments (tenant_id, course_id, title, description, points_possible, due_date, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        )
        .bind(tenant_id)
        .bind(course_id)
        .bind(title)
        .bind(description)
        .bind(points_possible)
        .bind(due_date.map(|d| naive_date_to_str(&d)))
        .bind(status.as_str())
        .bind(datetime_to_str(&now))
        .execute(&self.pool)
        .await?;

        Ok(Assignment {
            id: result.last_insert_rowid(),
            tenant_id,
            course_id,
            title: title.to_string(),
            description: description.map(str::to_string),
            points_possible,
            due_date,
            status,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_assignment(&self, id: i64) -> Result<Option<Assignment>> {
        let row = sqlx::query("SELECT * FROM assignments WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| assignment_from_row(&r)).transpose()
    }
}

// -- SubmissionRepository --

#[async_trait]
impl SubmissionRepository for SqliteRepository {
    async fn create_submission(
        &self,
        tenant_id: i64,
        assignment_id: i64,
        user_id: i64,
        grade: Option<f64>,
        status: SubmissionStatus,
    ) -> Result<Submission> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO submissions (tenant_id, assignment_id, user_id, grade, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        )
        .bind(tenant_id)
        .bind(assignment_id)
        .bind(user_id)
        .bind(grade)
        .bind(status.as_str())
        .bind(datetime_to_str(&now))
        .execute(&self.pool)
        .await?;

        Ok(Submission {
            id: result.last_insert_rowid(),
            tenant_id,
            assignment_id,
            user_id,
            grade,
            status,
            created_at: now,
            updated_at: now,
        })
    }

    async fn list_graded_submissions(&self, assignment_id: i64) -> Result<Vec<Submission>> {
        let rows = sqlx::query(
            "SELECT * FROM submissions WHERE assignment_id = ?1 AND status IN ('graded', 'returned') AND grade IS NOT NULL ORDER BY id",
        )
        .bind(assignment_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(submission_from_row).collect()
    }
}

// -- IntegrationConfigRepository --

#[async_trait]
impl IntegrationConfigRepository for SqliteRepository {
    async fn create_integration_config(
        &self,
        tenant_id: i64,
        provider: IntegrationProvider,
        status: IntegrationStatus,
        settings: &serde_json::Value,
    ) -> Result<IntegrationConfig> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO integration_configs (tenant_id, provider, status, settings, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(tenant_id)
        .bind(provider.as_str())
        .bind(status.as_str())
        .bind(settings.to_string())
        .bind(datetime_to_str(&now))
        .execute(&self.pool)
        .await?;

        Ok(IntegrationConfig {
            id: result.last_insert_rowid(),
            tenant_id,
            provider,
            status,
            settings: settings.clone(),
            created_at: now,
        })
    }

    async fn get_integration_config(&self, id: i64) -> Result<Option<IntegrationConfig>> {
        let row = sqlx::query("SELECT * FROM integration_configs WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| integration_config_from_row(&r)).transpose()
    }
}

// -- SyncRunRepository --

#[async_trait]
impl SyncRunRepository for SqliteRepository {
    async fn create_sync_run(
        &self,
        tenant_id: i64,
        integration_config_id: i64,
        sync_type: &str,
        direction: SyncDirection,
        triggered_by: Option<i64>,
    ) -> Result<SyncRun> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO sync_runs (tenant_id, integration_config_id, sync_type, direction, status, records_processed, records_succeeded, records_failed, triggered_by, created_at)
             VALUES (?1, ?2, ?3, ?4, 'pending', 0, 0, 0, ?5, ?6)",
        )
        .bind(tenant_id)
        .bind(integration_config_id)
        .bind(sync_type)
        .bind(direction.as_str())
        .bind(triggered_by)
        .bind(datetime_to_str(&now))
        .execute(&self.pool)
        .await?;

        Ok(SyncRun {
            id: result.last_insert_rowid(),
            tenant_id,
            integration_config_id,
            sync_type: sync_type.to_string(),
            direction,
            status: SyncStatus::Pending,
            started_at: None,
            completed_at: None,
            records_processed: 0,
            records_succeeded: 0,
            records_failed: 0,
            error_message: None,
            triggered_by,
            created_at: now,
        })
    }

    async fn mark_run_running(&self, id: i64) -> Result<()> {
        let result = sqlx::query(
            "UPDATE sync_runs SET status = 'running', started_at = ?1 WHERE id = ?2 AND status = 'pending'",
        )
        .bind(datetime_to_str(&Utc::now()))
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(SlateError::Sync(format!(
                "sync run {id} is not pending and cannot start"
            )));
        }
        Ok(())
    }

    async fn mark_run_completed(&self, id: i64) -> Result<()> {
        let result = sqlx::query(
            "UPDATE sync_runs SET status = 'completed', completed_at = ?1 WHERE id = ?2 AND status = 'running'",
        )
        .bind(datetime_to_str(&Utc::now()))
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(SlateError::Sync(format!(
                "sync run {id} is not running and cannot complete"
            )));
        }
        Ok(())
    }

    async fn mark_run_failed(&self, id: i64, error_message: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE sync_runs SET status = 'failed', completed_at = ?1, error_message = ?2 WHERE id = ?3 AND status = 'running'",
        )
        .bind(datetime_to_str(&Utc::now()))
        .bind(error_message)
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(SlateError::Sync(format!(
                "sync run {id} is not running and cannot fail"
            )));
        }
        Ok(())
    }

    async fn increment_run_counter(&self, id: i64, counter: RunCounter) -> Result<()> {
        let sql = match counter {
            RunCounter::Processed => {
                "UPDATE sync_runs SET records_processed = records_processed + 1 WHERE id = ?1"
            }
            RunCounter::Succeeded => {
                "UPDATE sync_runs SET records_succeeded = records_succeeded + 1 WHERE id = ?1"
            }
            RunCounter::Failed => {
                "UPDATE sync_runs SET records_failed = records_failed + 1 WHERE id = ?1"
            }
        };
        sqlx::query(sql).bind(id).execute(&self.pool).await?;
        Ok(())
    }

    async fn get_sync_run(&self, id: i64) -> Result<Option<SyncRun>> {
        let row = sqlx::query("SELECT * FROM sync_runs WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| sync_run_from_row(&r)).transpose()
    }

    async fn list_recent_runs(&self, tenant_id: i64, limit: i64) -> Result<Vec<SyncRun>> {
        let rows =
            sqlx::query("SELECT * FROM sync_runs WHERE tenant_id = ?1 ORDER BY id DESC LIMIT ?2")
                .bind(tenant_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?;
        rows.iter().map(sync_run_from_row).collect()
    }
}

// -- SyncLogRepository --

#[async_trait]
impl SyncLogRepository for SqliteRepository {
    async fn append_sync_log(
        &self,
        sync_run_id: i64,
        level: LogLevel,
        message: &str,
        entity_type: Option<LocalKind>,
        entity_id: Option<i64>,
        external_id: Option<&str>,
        metadata: Option<&serde_json::Value>,
    ) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO sync_logs (sync_run_id, level, message, entity_type, entity_id, external_id, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(sync_run_id)
        .bind(level.as_str())
        .bind(message)
        .bind(entity_type.map(|k| k.as_str()))
        .bind(entity_id)
        .bind(external_id)
        .bind(metadata.map(|m| m.to_string()))
        .bind(datetime_to_str(&Utc::now()))
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn list_sync_logs(&self, sync_run_id: i64) -> Result<Vec<SyncLog>> {
        let rows = sqlx::query("SELECT * FROM sync_logs WHERE sync_run_id = ?1 ORDER BY id")
            .bind(sync_run_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(sync_log_from_row).collect()
    }
}

// -- SyncMappingRepository --

#[async_trait]
impl SyncMappingRepository for SqliteRepository {
    async fn create_sync_mapping(
        &self,
        tenant_id: i64,
        integration_config_id: i64,
        local_kind: LocalKind,
        local_id: i64,
        external_kind: ExternalKind,
        external_id: &str,
    ) -> Result<SyncMapping> {
        let now = Utc::now();
        let now_str = datetime_to_str(&now);
        let result = sqlx::query(
            "INSERT INTO sync_mappings (tenant_id, integration_config_id, local_type, local_id, external_type, external_id, last_synced_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        )
        .bind(tenant_id)
        .bind(integration_config_id)
        .bind(local_kind.as_str())
        .bind(local_id)
        .bind(external_kind.as_str())
        .bind(external_id)
        .bind(&now_str)
        .execute(&self.pool)
        .await?;

        Ok(SyncMapping {
            id: result.last_insert_rowid(),
            tenant_id,
            integration_config_id,
            local_kind,
            local_id,
            external_kind,
            external_id: external_id.to_string(),
            last_synced_at: Some(now),
            created_at: now,
        })
    }

    async fn get_sync_mapping(&self, id: i64) -> Result<Option<SyncMapping>> {
        let row = sqlx::query("SELECT * FROM sync_mappings WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| sync_mapping_from_row(&r)).transpose()
    }

    async fn find_mapping_by_external(
        &self,
        integration_config_id: i64,
        external_kind: ExternalKind,
        external_id: &str,
    ) -> Result<Option<SyncMapping>> {
        let row = sqlx::query(
            "SELECT * FROM sync_mappings WHERE integration_config_id = ?1 AND external_type = ?2 AND external_id = ?3",
        )
        .bind(integration_config_id)
        .bind(external_kind.as_str())
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| sync_mapping_from_row(&r)).transpose()
    }

    async fn find_mapping_by_local(
        &self,
        integration_config_id: i64,
        local_kind: LocalKind,
        local_id: i64,
    ) -> Result<Option<SyncMapping>> {
        let row = sqlx::query(
            "SELECT * FROM sync_mappings WHERE integration_config_id = ?1 AND local_type = ?2 AND local_id = ?3",
        )
        .bind(integration_config_id)
        .bind(local_kind.as_str())
        .bind(local_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| sync_mapping_from_row(&r)).transpose()
    }

    async fn touch_mapping(&self, id: i64, local_id: i64) -> Result<()> {
        sqlx::query("UPDATE sync_mappings SET local_id = ?1, last_synced_at = ?2 WHERE id = ?3")
            .bind(local_id)
            .bind(datetime_to_str(&Utc::now()))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn first_mapping_for_kinds(
        &self,
        integration_config_id: i64,
        external_kind: ExternalKind,
        local_kind: LocalKind,
    ) -> Result<Option<SyncMapping>> {
        let row = sqlx::query(
            "SELECT * FROM sync_mappings WHERE integration_config_id = ?1 AND external_type = ?2 AND local_type = ?3 ORDER BY id LIMIT 1",
        )
        .bind(integration_config_id)
        .bind(external_kind.as_str())
        .bind(local_kind.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| sync_mapping_from_row(&r)).transpose()
    }

    async fn find_student_mapping_for_user(
        &self,
        integration_config_id: i64,
        user_id: i64,
    ) -> Result<Option<SyncMapping>> {
        let row = sqlx::query(
            "SELECT m.* FROM sync_mappings m
             JOIN enrollments e ON e.id = m.local_id
             WHERE m.integration_config_id = ?1
               AND m.local_type = 'enrollment'
               AND m.external_type = 'classroom_student'
               AND e.user_id = ?2
             ORDER BY m.id LIMIT 1",
        )
        .bind(integration_config_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| sync_mapping_from_row(&r)).transpose()
    }

    async fn list_mappings(&self, integration_config_id: i64) -> Result<Vec<SyncMapping>> {
        let rows =
            sqlx::query("SELECT * FROM sync_mappings WHERE integration_config_id = ?1 ORDER BY id")
                .bind(integration_config_id)
                .fetch_all(&self.pool)
                .await?;
        rows.iter().map(sync_mapping_from_row).collect()
    }
}
