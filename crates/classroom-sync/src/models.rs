//! Classroom API request/response structs.

use serde::{Deserialize, Serialize};

/// A course on the classroom provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassroomCourse {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_state: Option<String>,
}

/// Paginated list of courses.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseList {
    #[serde(default)]
    pub courses: Option<Vec<ClassroomCourse>>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// A student membership in a classroom course.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassroomStudent {
    pub user_id: String,
    #[serde(default)]
    pub profile: Option<StudentProfile>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    #[serde(default)]
    pub email_address: Option<String>,
    #[serde(default)]
    pub name: Option<StudentName>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentName {
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
}

/// Paginated list of students.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentList {
    #[serde(default)]
    pub students: Option<Vec<ClassroomStudent>>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Coursework payload for create/update calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseWork {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_points: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<WorkDate>,
}

/// A calendar date in the provider's year/month/day shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

/// A student's submission against one coursework item.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSubmission {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub assigned_grade: Option<f64>,
    #[serde(default)]
    pub draft_grade: Option<f64>,
}

/// Paginated list of submissions.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionList {
    #[serde(default)]
    pub student_submissions: Option<Vec<StudentSubmission>>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coursework_serializes_camel_case() {
        let work = CourseWork {
            id: None,
            title: "Essay 1".to_string(),
            description: Some("Write an essay".to_string()),
            max_points: Some(100.0),
            work_type: Some("ASSIGNMENT".to_string()),
            state: Some("PUBLISHED".to_string()),
            due_date: Some(WorkDate {
                year: 2025,
                month: 10,
                day: 1,
            }),
        };
        let json = serde_json::to_string(&work).unwrap();
        assert!(json.contains("\"maxPoints\""));
        assert!(json.contains("\"workType\""));
        assert!(json.contains("\"dueDate\""));
        assert!(!json.contains("\"id\""));
    }

    #[test]
    fn student_list_with_pagination() {
        let json = r#"{
            "students": [
                {
                    "userId": "gc-1",
                    "profile": {
                        "emailAddress": "jdoe@school.example",
                        "name": { "givenName": "John", "familyName": "Doe" }
                    }
                }
            ],
            "nextPageToken": "tok-2"
        }"#;
        let list: StudentList = serde_json::from_str(json).unwrap();
        let students = list.students.unwrap();
        assert_eq!(students.len(), 1);
        assert_eq!(students[0].user_id, "gc-1");
        assert_eq!(
            students[0]
                .profile
                .as_ref()
                .unwrap()
                .email_address
                .as_deref(),
            Some("jdoe@school.example")
        );
        assert_eq!(list.next_page_token.as_deref(), Some("tok-2"));
    }

    #[test]
    fn submission_deserializes() {
        let json = r#"{ "id": "sub-1", "userId": "gc-1", "assignedGrade": 92.5 }"#;
        let submission: StudentSubmission = serde_json::from_str(json).unwrap();
        assert_eq!(submission.id, "sub-1");
        assert_eq!(submission.assigned_grade, Some(92.5));
        assert_eq!(submission.draft_grade, None);
    }

    #[test]
    fn empty_course_list_deserializes() {
        let list: CourseList = serde_json::from_str("{}").unwrap();
        assert!(list.courses.is_none());
        assert!(list.next_page_token.is_none());
    }
}
