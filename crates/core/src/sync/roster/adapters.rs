//! Per-entity-type adapters for the reconciliation primitive.
//!
//! Field projections and parent-resolution fallbacks for the five roster
//! passes. Dates are normalized defensively: roster exports routinely omit
//! or invert date ranges, and an import must survive that.

use async_trait::async_trait;
use chrono::{Datelike, Days, NaiveDate, Utc};

use crate::db::repository::SlateRepository;
use crate::error::{Result, SlateError};
use crate::models::academic_year::AcademicYear;
use crate::models::common::{EnrollmentRole, UserRole};
use crate::models::course::Course;
use crate::models::section::Section;
use crate::models::sync::{ExternalKind, LocalKind};
use crate::sync::context::SyncContext;
use crate::sync::reconcile::{Admission, Applied, ApplyOutcome, RecordAdapter};

use super::records::{ClassRecord, EnrollmentRecord, OrgRecord, SessionRecord, UserRecord};

const DEFAULT_TIMEZONE: &str = "UTC";
const YEAR_SPAN_DAYS: u64 = 365;
const TERM_SPAN_DAYS: u64 = 120;

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Fill in missing dates and repair inverted ranges.
fn normalize_dates(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    default_span_days: u64,
) -> (NaiveDate, NaiveDate) {
    let start = start.unwrap_or_else(today);
    let mut end = end.unwrap_or_else(|| start + Days::new(default_span_days));
    if end <= start {
        end = start + Days::new(1);
    }
    (start, end)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn map_user_role(raw: Option<&str>) -> UserRole {
    match non_blank(raw).map(str::to_ascii_lowercase).as_deref() {
        Some("teacher") => UserRole::Teacher,
        Some("administrator") => UserRole::Admin,
        _ => UserRole::Student,
    }
}

fn map_enrollment_role(raw: Option<&str>) -> EnrollmentRole {
    match non_blank(raw).map(str::to_ascii_lowercase).as_deref() {
        Some("teacher") => EnrollmentRole::Teacher,
        _ => EnrollmentRole::Student,
    }
}

/// The academic year classes attach to: prefer a year that arrived through
/// this config's session mappings, then any year the tenant already has,
/// then a synthesized default spanning Aug 1 – Jun 30.
pub async fn resolve_academic_year<R: SlateRepository>(
    repo: &R,
    ctx: &SyncContext,
) -> Result<AcademicYear> {
    if let Some(mapping) = repo
        .first_mapping_for_kinds(
            ctx.config_id(),
            ExternalKind::OnerosterAcademicSession,
            LocalKind::AcademicYear,
        )
        .await?
    {
        if let Some(year) = repo.get_academic_year(mapping.local_id).await? {
            return Ok(year);
        }
    }

    if let Some(year) = repo.latest_academic_year(ctx.tenant_id).await? {
        return Ok(year);
    }

    let year_start = NaiveDate::from_ymd_opt(today().year(), 8, 1)
        .ok_or_else(|| SlateError::Sync("failed to build default academic year".into()))?;
    let year_end = NaiveDate::from_ymd_opt(today().year() + 1, 6, 30)
        .ok_or_else(|| SlateError::Sync("failed to build default academic year".into()))?;
    repo.create_academic_year(ctx.tenant_id, "Default Academic Year", year_start, year_end)
        .await
}

/// The section imported enrollments land in: the course's first section, or
/// a new "<course> - Section 1" attached to the tenant's latest term (a
/// default term is synthesized from the course's year when none exists).
pub async fn ensure_section<R: SlateRepository>(
    repo: &R,
    ctx: &SyncContext,
    course: &Course,
) -> Result<Section> {
    if let Some(section) = repo.first_section_for_course(course.id).await? {
        return Ok(section);
    }

    let term = match repo.latest_term(ctx.tenant_id).await? {
        Some(term) => term,
        None => {
            let year = repo
                .get_academic_year(course.academic_year_id)
                .await?
                .ok_or_else(|| {
                    SlateError::Sync(format!(
                        "course {} references missing academic year {}",
                        course.id, course.academic_year_id
                    ))
                })?;
            repo.create_term(
                ctx.tenant_id,
                year.id,
                "Default Term",
                year.start_date,
                year.end_date,
            )
            .await?
        }
    };

    repo.create_section(
        ctx.tenant_id,
        course.id,
        term.id,
        &format!("{} - Section 1", course.name),
    )
    .await
}

// ---------------------------------------------------------------------------
// Org → School
// ---------------------------------------------------------------------------

pub struct OrgAdapter;

#[async_trait]
impl<R: SlateRepository> RecordAdapter<R> for OrgAdapter {
    type Record = OrgRecord;

    fn local_kind(&self) -> LocalKind {
        LocalKind::School
    }

    fn external_kind(&self) -> ExternalKind {
        ExternalKind::OnerosterOrg
    }

    fn external_id<'r>(&self, record: &'r OrgRecord) -> &'r str {
        &record.sourced_id
    }

    fn admit(&self, record: &OrgRecord) -> Admission {
        if record.status.is_deleted() {
            return Admission::SkipSilent;
        }
        // Districts, departments etc. are not materialized locally.
        if !record.org_type.eq_ignore_ascii_case("school") {
            return Admission::SkipSilent;
        }
        Admission::Process
    }

    async fn apply(
        &self,
        repo: &R,
        ctx: &SyncContext,
        existing: Option<i64>,
        record: &OrgRecord,
    ) -> Result<Applied> {
        let name = non_blank(Some(record.name.as_str())).unwrap_or("Imported School");

        match existing {
            Some(id) => {
                let school = repo.get_school(id).await?.ok_or_else(|| {
                    SlateError::Sync(format!("mapped school {id} is missing"))
                })?;
                if school.name != name {
                    repo.update_school(id, name, &school.timezone).await?;
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
                let school = repo
                    .create_school(ctx.tenant_id, name, DEFAULT_TIMEZONE)
                    .await?;
                Ok(Applied {
                    local_id: school.id,
                    outcome: ApplyOutcome::Created,
                })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// academicSession (schoolYear) → AcademicYear
// ---------------------------------------------------------------------------

pub struct SchoolYearAdapter;

#[async_trait]
impl<R: SlateRepository> RecordAdapter<R> for SchoolYearAdapter {
    type Record = SessionRecord;

    fn local_kind(&self) -> LocalKind {
        LocalKind::AcademicYear
    }

    fn external_kind(&self) -> ExternalKind {
        ExternalKind::OnerosterAcademicSession
    }

    fn external_id<'r>(&self, record: &'r SessionRecord) -> &'r str {
        &record.sourced_id
    }

    fn admit(&self, record: &SessionRecord) -> Admission {
        if record.status.is_deleted() {
            return Admission::SkipSilent;
        }
        Admission::Process
    }

    async fn apply(
        &self,
        repo: &R,
        ctx: &SyncContext,
        existing: Option<i64>,
        record: &SessionRecord,
    ) -> Result<Applied> {
        let (start, end) = normalize_dates(record.start_date, record.end_date, YEAR_SPAN_DAYS);
        let name = non_blank(Some(record.title.as_str())).unwrap_or("Imported School Year");

        match existing {
            Some(id) => {
                let year = repo.get_academic_year(id).await?.ok_or_else(|| {
                    SlateError::Sync(format!("mapped academic year {id} is missing"))
                })?;
                if year.name != name || year.start_date != start || year.end_date != end {
                    repo.update_academic_year(id, name, start, end).await?;
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
                let year = repo
                    .create_academic_year(ctx.tenant_id, name, start, end)
                    .await?;
                Ok(Applied {
                    local_id: year.id,
                    outcome: ApplyOutcome::Created,
                })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// academicSession (term/semester/gradingPeriod) → Term
// ---------------------------------------------------------------------------

pub struct TermAdapter;

impl TermAdapter {
    /// Parent chain: the mapped parent year, then any existing year for the
    /// tenant, then a synthesized year spanning a year from the term start.
    /// Keeps CSV imports resilient to files that omit the parent link or
    /// arrive out of order.
    async fn resolve_parent_year<R: SlateRepository>(
        repo: &R,
        ctx: &SyncContext,
        record: &SessionRecord,
        term_start: NaiveDate,
    ) -> Result<AcademicYear> {
        if let Some(parent_id) = non_blank(record.parent_sourced_id.as_deref()) {
            if let Some(mapping) = repo
                .find_mapping_by_external(
                    ctx.config_id(),
                    ExternalKind::OnerosterAcademicSession,
                    parent_id,
                )
                .await?
            {
                if mapping.local_kind == LocalKind::AcademicYear {
                    if let Some(year) = repo.get_academic_year(mapping.local_id).await? {
                        return Ok(year);
                    }
                }
            }
        }

        if let Some(year) = repo.latest_academic_year(ctx.tenant_id).await? {
            return Ok(year);
        }

        repo.create_academic_year(
            ctx.tenant_id,
            "Imported Academic Year",
            term_start,
            term_start + Days::new(YEAR_SPAN_DAYS),
        )
        .await
    }
}

#[async_trait]
impl<R: SlateRepository> RecordAdapter<R> for TermAdapter {
    type Record = SessionRecord;

    fn local_kind(&self) -> LocalKind {
        LocalKind::Term
    }

    fn external_kind(&self) -> ExternalKind {
        ExternalKind::OnerosterAcademicSession
    }

    fn external_id<'r>(&self, record: &'r SessionRecord) -> &'r str {
        &record.sourced_id
    }

    fn admit(&self, record: &SessionRecord) -> Admission {
        if record.status.is_deleted() {
            return Admission::SkipSilent;
        }
        Admission::Process
    }

    async fn apply(
        &self,
        repo: &R,
        ctx: &SyncContext,
        existing: Option<i64>,
        record: &SessionRecord,
    ) -> Result<Applied> {
        let (start, end) = normalize_dates(record.start_date, record.end_date, TERM_SPAN_DAYS);
        let name = non_blank(Some(record.title.as_str())).unwrap_or("Imported Term");
        let year = Self::resolve_parent_year(repo, ctx, record, start).await?;

        match existing {
            Some(id) => {
                let term = repo.get_term(id).await?.ok_or_else(|| {
                    SlateError::Sync(format!("mapped term {id} is missing"))
                })?;
                if term.name != name
                    || term.start_date != start
                    || term.end_date != end
                    || term.academic_year_id != year.id
                {
                    repo.update_term(id, year.id, name, start, end).await?;
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
                let term = repo
                    .create_term(ctx.tenant_id, year.id, name, start, end)
                    .await?;
                Ok(Applied {
                    local_id: term.id,
                    outcome: ApplyOutcome::Created,
                })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// user → User
// ---------------------------------------------------------------------------

pub struct UserAdapter;

#[async_trait]
impl<R: SlateRepository> RecordAdapter<R> for UserAdapter {
    type Record = UserRecord;

    fn local_kind(&self) -> LocalKind {
        LocalKind::User
    }

    fn external_kind(&self) -> ExternalKind {
        ExternalKind::OnerosterUser
    }

    fn external_id<'r>(&self, record: &'r UserRecord) -> &'r str {
        &record.sourced_id
    }

    fn admit(&self, record: &UserRecord) -> Admission {
        if record.status.is_deleted() {
            return Admission::SkipSilent;
        }
        if non_blank(record.email.as_deref()).is_none() {
            return Admission::SkipWarn(format!(
                "skipping user {} without email",
                record.sourced_id
            ));
        }
        Admission::Process
    }

    async fn apply(
        &self,
        repo: &R,
        ctx: &SyncContext,
        existing: Option<i64>,
        record: &UserRecord,
    ) -> Result<Applied> {
        let email = non_blank(record.email.as_deref()).ok_or_else(|| {
            SlateError::Validation(format!("user {} has no email", record.sourced_id))
        })?;
        let first_name = non_blank(record.given_name.as_deref()).unwrap_or("First");
        let last_name = non_blank(record.family_name.as_deref()).unwrap_or("Last");
        let role = map_user_role(record.role.as_deref());

        let user = match existing {
            Some(id) => repo.get_user(id).await?.ok_or_else(|| {
                SlateError::Sync(format!("mapped user {id} is missing"))
            })?,
            // Adopt an existing account with the same email rather than
            // tripping the unique-email constraint.
            None => match repo.find_user_by_email(ctx.tenant_id, email).await? {
                Some(user) => user,
                None => {
                    let user = repo
                        .create_user(ctx.tenant_id, email, first_name, last_name, role)
                        .await?;
                    return Ok(Applied {
                        local_id: user.id,
                        outcome: ApplyOutcome::Created,
                    });
                }
            },
        };

        if user.email != email
            || user.first_name != first_name
            || user.last_name != last_name
            || user.role != role
        {
            repo.update_user(user.id, email, first_name, last_name, role)
                .await?;
            Ok(Applied {
                local_id: user.id,
                outcome: ApplyOutcome::Updated,
            })
        } else {
            Ok(Applied {
                local_id: user.id,
                outcome: ApplyOutcome::Unchanged,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// class → Course
// ---------------------------------------------------------------------------

pub struct ClassAdapter;

#[async_trait]
impl<R: SlateRepository> RecordAdapter<R> for ClassAdapter {
    type Record = ClassRecord;

    fn local_kind(&self) -> LocalKind {
        LocalKind::Course
    }

    fn external_kind(&self) -> ExternalKind {
        ExternalKind::OnerosterClass
    }

    fn external_id<'r>(&self, record: &'r ClassRecord) -> &'r str {
        &record.sourced_id
    }

    fn admit(&self, record: &ClassRecord) -> Admission {
        if record.status.is_deleted() {
            return Admission::SkipSilent;
        }
        Admission::Process
    }

    async fn apply(
        &self,
        repo: &R,
        ctx: &SyncContext,
        existing: Option<i64>,
        record: &ClassRecord,
    ) -> Result<Applied> {
        let name = non_blank(record.title.as_deref())
            .or(non_blank(record.class_code.as_deref()))
            .unwrap_or("Imported Course");
        let code = non_blank(record.class_code.as_deref());

        match existing {
            Some(id) => {
                let course = repo.get_course(id).await?.ok_or_else(|| {
                    SlateError::Sync(format!("mapped course {id} is missing"))
                })?;
                if course.name != name || course.code.as_deref() != code {
                    repo.update_course(id, name, code).await?;
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
                let course = repo
                    .create_course(ctx.tenant_id, year.id, name, code)
                    .await?;
                Ok(Applied {
                    local_id: course.id,
                    outcome: ApplyOutcome::Created,
                })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// enrollment → Enrollment
// ---------------------------------------------------------------------------

pub struct EnrollmentAdapter;

#[async_trait]
impl<R: SlateRepository> RecordAdapter<R> for EnrollmentAdapter {
    type Record = EnrollmentRecord;

    fn local_kind(&self) -> LocalKind {
        LocalKind::Enrollment
    }

    fn external_kind(&self) -> ExternalKind {
        ExternalKind::OnerosterEnrollment
    }

    fn external_id<'r>(&self, record: &'r EnrollmentRecord) -> &'r str {
        &record.sourced_id
    }

    fn admit(&self, record: &EnrollmentRecord) -> Admission {
        if record.status.is_deleted() {
            return Admission::SkipSilent;
        }
        Admission::Process
    }

    async fn apply(
        &self,
        repo: &R,
        ctx: &SyncContext,
        existing: Option<i64>,
        record: &EnrollmentRecord,
    ) -> Result<Applied> {
        let user_sourced_id = non_blank(record.user_sourced_id.as_deref()).ok_or_else(|| {
            SlateError::MissingMapping(format!(
                "enrollment {} has no user reference",
                record.sourced_id
            ))
        })?;
        let class_sourced_id = non_blank(record.class_sourced_id.as_deref()).ok_or_else(|| {
            SlateError::MissingMapping(format!(
                "enrollment {} has no class reference",
                record.sourced_id
            ))
        })?;

        let user_mapping = repo
            .find_mapping_by_external(ctx.config_id(), ExternalKind::OnerosterUser, user_sourced_id)
            .await?
            .ok_or_else(|| {
                SlateError::MissingMapping(format!(
                    "user {user_sourced_id} not mapped for enrollment {}",
                    record.sourced_id
                ))
            })?;
        let class_mapping = repo
            .find_mapping_by_external(
                ctx.config_id(),
                ExternalKind::OnerosterClass,
                class_sourced_id,
            )
            .await?
            .ok_or_else(|| {
                SlateError::MissingMapping(format!(
                    "class {class_sourced_id} not mapped for enrollment {}",
                    record.sourced_id
                ))
            })?;

        let user = repo.get_user(user_mapping.local_id).await?.ok_or_else(|| {
            SlateError::Sync(format!("mapped user {} is missing", user_mapping.local_id))
        })?;
        let course = repo
            .get_course(class_mapping.local_id)
            .await?
            .ok_or_else(|| {
                SlateError::Sync(format!(
                    "mapped course {} is missing",
                    class_mapping.local_id
                ))
            })?;

        let section = ensure_section(repo, ctx, &course).await?;
        let role = map_enrollment_role(record.role.as_deref());

        let enrollment = match existing {
            Some(id) => Some(repo.get_enrollment(id).await?.ok_or_else(|| {
                SlateError::Sync(format!("mapped enrollment {id} is missing"))
            })?),
            None => repo.find_enrollment(user.id, section.id).await?,
        };

        match enrollment {
            Some(enrollment) => {
                if enrollment.user_id != user.id
                    || enrollment.section_id != section.id
                    || enrollment.role != role
                {
                    repo.update_enrollment(enrollment.id, user.id, section.id, role)
                        .await?;
                    Ok(Applied {
                        local_id: enrollment.id,
                        outcome: ApplyOutcome::Updated,
                    })
                } else {
                    Ok(Applied {
                        local_id: enrollment.id,
                        outcome: ApplyOutcome::Unchanged,
                    })
                }
            }
            None => {
                let enrollment = repo
                    .create_enrollment(ctx.tenant_id, user.id, section.id, role)
                    .await?;
                Ok(Applied {
                    local_id: enrollment.id,
                    outcome: ApplyOutcome::Created,
                })
            }
        }
    }
}
