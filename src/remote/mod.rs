pub mod dto;

use std::env;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::error::AppError;
use crate::models::{CourseField, CourseRecord, TaskDocument, UserProfile};

#[derive(Clone, Debug)]
pub struct RemoteConfig {
    pub base_url: String,
    pub api_token: String,
}

impl RemoteConfig {
    pub fn new_from_env() -> Result<Self, AppError> {
        let base_url = env::var("REMOTE_BASE_URL")
            .map_err(|_| AppError::BadRequest("REMOTE_BASE_URL is not set".to_string()))?;
        let api_token = env::var("REMOTE_API_TOKEN")
            .map_err(|_| AppError::BadRequest("REMOTE_API_TOKEN is not set".to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
        })
    }
}

/// Hosted document store holding the course collection, per-user task
/// documents and user profiles.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn fetch_courses(&self) -> Result<Vec<CourseRecord>, AppError>;
    async fn insert_course(&self, course: &CourseRecord) -> Result<CourseRecord, AppError>;
    /// Replaces whole fields; returns the new version. A stale
    /// `expected_version` yields [`AppError::Conflict`].
    async fn update_course_fields(
        &self,
        id: &str,
        fields: &[CourseField],
        expected_version: u64,
    ) -> Result<u64, AppError>;

    /// Tasks owned by `owner_id`, oldest first.
    async fn fetch_tasks(&self, owner_id: &str) -> Result<Vec<TaskDocument>, AppError>;
    async fn insert_task(&self, task: &TaskDocument) -> Result<(), AppError>;
    async fn update_task_status(&self, task: &TaskDocument) -> Result<(), AppError>;
    async fn delete_task(&self, id: &str) -> Result<(), AppError>;

    async fn fetch_profile(&self, uid: &str) -> Result<Option<UserProfile>, AppError>;
    async fn put_profile(&self, profile: &UserProfile) -> Result<(), AppError>;
}

pub struct HttpRemoteStore {
    client: Client,
    config: RemoteConfig,
}

impl HttpRemoteStore {
    pub fn new(config: RemoteConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::BadRequest(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client, config })
    }

    /// Appends `segments` to the base URL, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> Result<Url, AppError> {
        let mut url = Url::parse(&self.config.base_url)
            .map_err(|e| AppError::Remote(format!("invalid REMOTE_BASE_URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| AppError::Remote("REMOTE_BASE_URL cannot take a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn tasks_url(&self, owner_id: &str) -> Result<Url, AppError> {
        let mut url = self.url(&["tasks"])?;
        url.query_pairs_mut()
            .append_pair("owner", owner_id)
            .append_pair("order_by", "created_at");
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, AppError> {
        let response = request
            .bearer_auth(&self.config.api_token)
            .send()
            .await
            .map_err(|e| AppError::Remote(format!("request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::NOT_FOUND => Err(AppError::NotFound),
            StatusCode::CONFLICT => Err(AppError::Conflict(body)),
            _ => Err(AppError::Remote(format!("remote store error {}: {}", status, body))),
        }
    }

    async fn read_json<T: DeserializeOwned>(&self, response: Response) -> Result<T, AppError> {
        let body_text = response
            .text()
            .await
            .map_err(|e| AppError::Remote(format!("failed to read body: {}", e)))?;

        serde_json::from_str::<T>(&body_text).map_err(|e| {
            tracing::error!("Failed to parse: {}", e);
            AppError::Remote(format!("Failed to parse remote response: {}", e))
        })
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn fetch_courses(&self) -> Result<Vec<CourseRecord>, AppError> {
        let response = self.send(self.client.get(self.url(&["courses"])?)).await?;
        let list: dto::ListDocumentsResponse<CourseRecord> = self.read_json(response).await?;
        Ok(list.documents)
    }

    async fn insert_course(&self, course: &CourseRecord) -> Result<CourseRecord, AppError> {
        let response = self
            .send(self.client.post(self.url(&["courses"])?).json(course))
            .await?;
        self.read_json(response).await
    }

    async fn update_course_fields(
        &self,
        id: &str,
        fields: &[CourseField],
        expected_version: u64,
    ) -> Result<u64, AppError> {
        let body = dto::UpdateCourseRequest::new(fields, expected_version)?;
        let response = self
            .send(
                self.client
                    .patch(self.url(&["courses", id])?)
                    .json(&body),
            )
            .await?;
        let updated: dto::UpdateCourseResponse = self.read_json(response).await?;
        Ok(updated.version)
    }

    async fn fetch_tasks(&self, owner_id: &str) -> Result<Vec<TaskDocument>, AppError> {
        let response = self
            .send(
                self.client.get(self.tasks_url(owner_id)?),
            )
            .await?;
        let list: dto::ListDocumentsResponse<TaskDocument> = self.read_json(response).await?;
        Ok(list.documents)
    }

    async fn insert_task(&self, task: &TaskDocument) -> Result<(), AppError> {
        self.send(self.client.post(self.url(&["tasks"])?).json(task))
            .await?;
        Ok(())
    }

    async fn update_task_status(&self, task: &TaskDocument) -> Result<(), AppError> {
        let updated_at = task.updated_at.to_rfc3339();
        let body = dto::UpdateTaskRequest {
            status: task.status,
            updated_at: &updated_at,
        };
        self.send(
            self.client
                .patch(self.url(&["tasks", task.id.as_str()])?)
                .json(&body),
        )
        .await?;
        Ok(())
    }

    async fn delete_task(&self, id: &str) -> Result<(), AppError> {
        self.send(self.client.delete(self.url(&["tasks", id])?))
            .await?;
        Ok(())
    }

    async fn fetch_profile(&self, uid: &str) -> Result<Option<UserProfile>, AppError> {
        match self
            .send(self.client.get(self.url(&["users", uid])?))
            .await
        {
            Ok(response) => Ok(Some(self.read_json(response).await?)),
            Err(AppError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn put_profile(&self, profile: &UserProfile) -> Result<(), AppError> {
        self.send(
            self.client
                .put(self.url(&["users", profile.uid.as_str()])?)
                .json(profile),
        )
        .await?;
        Ok(())
    }
}

/// Remote that holds nothing and accepts every write. Used when no remote is
/// configured; the mirror then shows seed data.
pub struct NoopRemoteStore;

#[async_trait]
impl RemoteStore for NoopRemoteStore {
    async fn fetch_courses(&self) -> Result<Vec<CourseRecord>, AppError> {
        Ok(Vec::new())
    }

    async fn insert_course(&self, course: &CourseRecord) -> Result<CourseRecord, AppError> {
        Ok(course.clone())
    }

    async fn update_course_fields(
        &self,
        _id: &str,
        _fields: &[CourseField],
        expected_version: u64,
    ) -> Result<u64, AppError> {
        Ok(expected_version + 1)
    }

    async fn fetch_tasks(&self, _owner_id: &str) -> Result<Vec<TaskDocument>, AppError> {
        Ok(Vec::new())
    }

    async fn insert_task(&self, _task: &TaskDocument) -> Result<(), AppError> {
        Ok(())
    }

    async fn update_task_status(&self, _task: &TaskDocument) -> Result<(), AppError> {
        Ok(())
    }

    async fn delete_task(&self, _id: &str) -> Result<(), AppError> {
        Ok(())
    }

    async fn fetch_profile(&self, _uid: &str) -> Result<Option<UserProfile>, AppError> {
        Ok(None)
    }

    async fn put_profile(&self, _profile: &UserProfile) -> Result<(), AppError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> HttpRemoteStore {
        HttpRemoteStore::new(RemoteConfig {
            base_url: "https://documents.example.com/v1".to_string(),
            api_token: "token".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_owner_filter_is_encoded() {
        let url = store().tasks_url("a&b=c#d").unwrap();
        assert_eq!(
            url.as_str(),
            "https://documents.example.com/v1/tasks?owner=a%26b%3Dc%23d&order_by=created_at"
        );
    }

    #[test]
    fn test_path_segments_are_encoded() {
        let url = store().url(&["users", "u/1?x"]).unwrap();
        assert_eq!(url.as_str(), "https://documents.example.com/v1/users/u%2F1%3Fx");
    }
}
