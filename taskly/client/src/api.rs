//! HTTP access to the Taskly REST API.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use taskly_core::api::{
    AuthResponse, CreateTaskRequest, CurrentUserResponse, ErrorResponse, LoginRequest,
    MessageResponse, RegisterRequest, UpdateTaskRequest,
};
use taskly_core::{Task, TaskId, ValidationErrors};

/// A failed API call, decoded from the error body the service returns.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("{}", .0.summary())]
    Validation(ValidationErrors),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Server responded with {status}: {message}")]
    Server { status: u16, message: String },
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ClientError {
    /// Maps a non-2xx response to the error taxonomy.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let decoded = serde_json::from_str::<ErrorResponse>(body).ok();
        let message = match &decoded {
            Some(decoded) => decoded.message.clone(),
            None if body.trim().is_empty() => status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string(),
            None => body.trim().to_string(),
        };

        match status {
            StatusCode::UNAUTHORIZED => ClientError::Unauthorized(message),
            StatusCode::FORBIDDEN => ClientError::Forbidden(message),
            StatusCode::NOT_FOUND => ClientError::NotFound(message),
            StatusCode::UNPROCESSABLE_ENTITY => match decoded.and_then(|d| d.errors) {
                Some(errors) => ClientError::Validation(errors),
                None => ClientError::Server {
                    status: status.as_u16(),
                    message,
                },
            },
            _ => ClientError::Server {
                status: status.as_u16(),
                message,
            },
        }
    }
}

/// Every call the client makes. One request per call and no retries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskApi {
    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ClientError>;

    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ClientError>;

    async fn logout(&self, token: &str) -> Result<MessageResponse, ClientError>;

    async fn current_user(&self, token: &str) -> Result<CurrentUserResponse, ClientError>;

    async fn list_tasks(&self, token: &str) -> Result<Vec<Task>, ClientError>;

    async fn get_task(&self, token: &str, id: TaskId) -> Result<Task, ClientError>;

    async fn create_task(
        &self,
        token: &str,
        request: &CreateTaskRequest,
    ) -> Result<Task, ClientError>;

    async fn update_task(
        &self,
        token: &str,
        id: TaskId,
        request: &UpdateTaskRequest,
    ) -> Result<Task, ClientError>;

    async fn delete_task(&self, token: &str, id: TaskId) -> Result<MessageResponse, ClientError>;
}

/// [`TaskApi`] over HTTP.
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: Arc<str>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: Arc::from(base_url.trim_end_matches('/')),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }
    let body = response.text().await?;
    tracing::debug!(%status, "API call failed");
    Err(ClientError::from_response(status, &body))
}

#[async_trait]
impl TaskApi for ApiClient {
    #[tracing::instrument(skip(self, request), fields(email = ?request.email))]
    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ClientError> {
        let response = self
            .client
            .post(self.url("/register"))
            .json(request)
            .send()
            .await?;
        decode(response).await
    }

    #[tracing::instrument(skip(self, request), fields(email = ?request.email))]
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ClientError> {
        let response = self
            .client
            .post(self.url("/login"))
            .json(request)
            .send()
            .await?;
        decode(response).await
    }

    #[tracing::instrument(skip_all)]
    async fn logout(&self, token: &str) -> Result<MessageResponse, ClientError> {
        let response = self
            .client
            .post(self.url("/logout"))
            .bearer_auth(token)
            .send()
            .await?;
        decode(response).await
    }

    #[tracing::instrument(skip_all)]
    async fn current_user(&self, token: &str) -> Result<CurrentUserResponse, ClientError> {
        let response = self
            .client
            .get(self.url("/user"))
            .bearer_auth(token)
            .send()
            .await?;
        decode(response).await
    }

    #[tracing::instrument(skip_all)]
    async fn list_tasks(&self, token: &str) -> Result<Vec<Task>, ClientError> {
        let response = self
            .client
            .get(self.url("/tasks"))
            .bearer_auth(token)
            .send()
            .await?;
        decode(response).await
    }

    #[tracing::instrument(skip(self, token))]
    async fn get_task(&self, token: &str, id: TaskId) -> Result<Task, ClientError> {
        let response = self
            .client
            .get(self.url(&format!("/tasks/{}", id)))
            .bearer_auth(token)
            .send()
            .await?;
        decode(response).await
    }

    #[tracing::instrument(skip(self, token))]
    async fn create_task(
        &self,
        token: &str,
        request: &CreateTaskRequest,
    ) -> Result<Task, ClientError> {
        let response = self
            .client
            .post(self.url("/tasks"))
            .bearer_auth(token)
            .json(request)
            .send()
            .await?;
        decode(response).await
    }

    #[tracing::instrument(skip(self, token))]
    async fn update_task(
        &self,
        token: &str,
        id: TaskId,
        request: &UpdateTaskRequest,
    ) -> Result<Task, ClientError> {
        let response = self
            .client
            .put(self.url(&format!("/tasks/{}", id)))
            .bearer_auth(token)
            .json(request)
            .send()
            .await?;
        decode(response).await
    }

    #[tracing::instrument(skip(self, token))]
    async fn delete_task(&self, token: &str, id: TaskId) -> Result<MessageResponse, ClientError> {
        let response = self
            .client
            .delete(self.url(&format!("/tasks/{}", id)))
            .bearer_auth(token)
            .send()
            .await?;
        decode(response).await
    }
}
