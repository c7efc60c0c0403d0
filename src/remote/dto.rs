use serde::{Deserialize, Serialize};

use crate::models::CourseField;

#[derive(Debug, Deserialize)]
pub struct ListDocumentsResponse<T> {
    pub documents: Vec<T>,
}

#[derive(Debug, Serialize)]
pub struct UpdateCourseRequest {
    pub fields: serde_json::Map<String, serde_json::Value>,
    pub expected_version: u64,
}

impl UpdateCourseRequest {
    pub fn new(fields: &[CourseField], expected_version: u64) -> Result<Self, serde_json::Error> {
        let mut map = serde_json::Map::new();
        for field in fields {
            map.insert(field.name().to_string(), field_value(field)?);
        }
        Ok(Self {
            fields: map,
            expected_version,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateCourseResponse {
    pub version: u64,
}

#[derive(Debug, Serialize)]
pub struct UpdateTaskRequest<'a> {
    pub status: crate::models::TaskStatus,
    pub updated_at: &'a str,
}

fn field_value(field: &CourseField) -> Result<serde_json::Value, serde_json::Error> {
    match field {
        CourseField::Title(v) | CourseField::Description(v) | CourseField::Color(v) => {
            serde_json::to_value(v)
        }
        CourseField::MeetingLink(v) => serde_json::to_value(v),
        CourseField::Modules(v) => serde_json::to_value(v),
        CourseField::Submissions(v) => serde_json::to_value(v),
        CourseField::Discussions(v) => serde_json::to_value(v),
        CourseField::Students(v) => serde_json::to_value(v),
        CourseField::CalendarEvents(v) => serde_json::to_value(v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_keys_fields_by_name() {
        let req = UpdateCourseRequest::new(
            &[
                CourseField::Title("Biologi".to_string()),
                CourseField::MeetingLink(None),
            ],
            3,
        )
        .unwrap();

        let body = serde_json::to_value(&req).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "fields": { "title": "Biologi", "meeting_link": null },
                "expected_version": 3
            })
        );
    }
}
