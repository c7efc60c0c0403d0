use crate::error::AppError;
use crate::kv::{KeyValueStore, Namespace};

/// Free-text note for a course, or an empty string if none was saved.
pub async fn get_note(kv: &dyn KeyValueStore, course_id: &str) -> Result<String, AppError> {
    Ok(kv.get(Namespace::Note, course_id).await?.unwrap_or_default())
}

pub async fn save_note(kv: &dyn KeyValueStore, course_id: &str, text: &str) -> Result<(), AppError> {
    kv.put(Namespace::Note, course_id, text).await
}
