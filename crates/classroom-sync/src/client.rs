//! Typed reqwest wrapper for the classroom provider's REST API.

use reqwest::StatusCode;
use tracing::debug;

use slate_core::error::{Result, SlateError};

use crate::models::{
    ClassroomCourse, ClassroomStudent, CourseList, CourseWork, StudentList, StudentSubmission,
    SubmissionList,
};

const CLASSROOM_API_BASE: &str = "https://classroom.googleapis.com";

/// HTTP client for classroom course, roster, coursework, and grade
/// operations.
pub struct ClassroomClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl ClassroomClient {
    /// Create a new client with the given bearer token.
    pub fn new(access_token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: CLASSROOM_API_BASE.to_string(),
            access_token: access_token.to_string(),
        }
    }

    /// Override the base URL (for testing with wiremock).
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    async fn check(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            return Err(SlateError::Auth(format!(
                "{what} rejected with status {status}: {body}"
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SlateError::Provider(format!(
                "{what} failed with status {status}: {body}"
            )));
        }
        Ok(response)
    }

    /// List the caller's active courses, following pagination.
    pub async fn list_courses(&self) -> Result<Vec<ClassroomCourse>> {
        let mut courses = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self
                .http
                .get(format!("{}/v1/courses", self.base_url))
                .bearer_auth(&self.access_token)
                .query(&[("teacherId", "me"), ("courseStates", "ACTIVE")]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }
            let response = Self::check(request.send().await?, "list courses").await?;
            let list: CourseList = response
                .json()
                .await
                .map_err(|e| SlateError::Provider(format!("list courses parse failed: {e}")))?;
            courses.extend(list.courses.unwrap_or_default());
            page_token = list.next_page_token;
            if page_token.is_none() {
                break;
            }
        }
        debug!(count = courses.len(), "listed classroom courses");
        Ok(courses)
    }

    /// List all students of a course, following pagination.
    pub async fn list_students(&self, course_id: &str) -> Result<Vec<ClassroomStudent>> {
        let mut students = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self
                .http
                .get(format!("{}/v1/courses/{course_id}/students", self.base_url))
                .bearer_auth(&self.access_token);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }
            let response = Self::check(request.send().await?, "list students").await?;
            let list: StudentList = response
                .json()
                .await
                .map_err(|e| SlateError::Provider(format!("list students parse failed: {e}")))?;
            students.extend(list.students.unwrap_or_default());
            page_token = list.next_page_token;
            if page_token.is_none() {
                break;
            }
        }
        Ok(students)
    }

    /// Create a coursework item on a course.
    pub async fn create_coursework(
        &self,
        course_id: &str,
        coursework: &CourseWork,
    ) -> Result<CourseWork> {
        let response = self
            .http
            .post(format!(
                "{}/v1/courses/{course_id}/courseWork",
                self.base_url
            ))
            .bearer_auth(&self.access_token)
            .json(coursework)
            .send()
            .await?;
        let response = Self::check(response, "create coursework").await?;
        response
            .json()
            .await
            .map_err(|e| SlateError::Provider(format!("create coursework parse failed: {e}")))
    }

    /// Patch an existing coursework item.
    pub async fn update_coursework(
        &self,
        course_id: &str,
        coursework_id: &str,
        coursework: &CourseWork,
        update_mask: &str,
    ) -> Result<CourseWork> {
        let response = self
            .http
            .patch(format!(
                "{}/v1/courses/{course_id}/courseWork/{coursework_id}",
                self.base_url
            ))
            .bearer_auth(&self.access_token)
            .query(&[("updateMask", update_mask)])
            .json(coursework)
            .send()
            .await?;
        let response = Self::check(response, "update coursework").await?;
        response
            .json()
            .await
            .map_err(|e| SlateError::Provider(format!("update coursework parse failed: {e}")))
    }

    /// List all submissions for one coursework item, following pagination.
    pub async fn list_submissions(
        &self,
        course_id: &str,
        coursework_id: &str,
    ) -> Result<Vec<StudentSubmission>> {
        let mut submissions = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self
                .http
                .get(format!(
                    "{}/v1/courses/{course_id}/courseWork/{coursework_id}/studentSubmissions",
                    self.base_url
                ))
                .bearer_auth(&self.access_token);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }
            let response = Self::check(request.send().await?, "list submissions").await?;
            let list: SubmissionList = response
                .json()
                .await
                .map_err(|e| SlateError::Provider(format!("list submissions parse failed: {e}")))?;
            submissions.extend(list.student_submissions.unwrap_or_default());
            page_token = list.next_page_token;
            if page_token.is_none() {
                break;
            }
        }
        Ok(submissions)
    }

    /// Patch a submission's assigned and draft grades.
    pub async fn patch_submission_grade(
        &self,
        course_id: &str,
        coursework_id: &str,
        submission_id: &str,
        grade: f64,
    ) -> Result<()> {
        let body = serde_json::json!({
            "assignedGrade": grade,
            "draftGrade": grade,
        });
        let response = self
            .http
            .patch(format!(
                "{}/v1/courses/{course_id}/courseWork/{coursework_id}/studentSubmissions/{submission_id}",
                self.base_url
            ))
            .bearer_auth(&self.access_token)
            .query(&[("updateMask", "assignedGrade,draftGrade")])
            .json(&body)
            .send()
            .await?;
        Self::check(response, "patch submission grade").await?;
        Ok(())
    }
}
