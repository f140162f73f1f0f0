//! Request and response bodies of the Taskly REST API.
//!
//! Requests are decoded into the raw `*Fields` structs and only become
//! domain values after passing [`crate::validation`].

use serde::{Deserialize, Serialize};

use crate::task::Task;
use crate::user::User;
use crate::validation::ValidationErrors;

pub use crate::validation::{
    LoginFields as LoginRequest, NewTaskFields as CreateTaskRequest,
    RegistrationFields as RegisterRequest, TaskPatchFields as UpdateTaskRequest,
};

/// Returned by `POST /register` and `POST /login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

/// Returned by `GET /user`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CurrentUserResponse {
    pub user: User,
    /// Tasks owned by the user.
    pub tasks: Vec<Task>,
}

/// Plain confirmation message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Body of every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ErrorResponse {
    pub message: String,
    /// Per-field messages, present on validation failures only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(
        feature = "openapi",
        schema(value_type = Option<std::collections::HashMap<String, Vec<String>>>)
    )]
    pub errors: Option<ValidationErrors>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            errors: None,
        }
    }
}

impl From<ValidationErrors> for ErrorResponse {
    fn from(errors: ValidationErrors) -> Self {
        Self {
            message: errors.summary(),
            errors: Some(errors),
        }
    }
}
