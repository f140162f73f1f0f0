use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Path};
use axum::http::request::Parts;
use taskly_core::validation::not_a_string_message;
use taskly_core::{TaskId, ValidationErrors};

use crate::web::ApiError;

/// JSON body extractor whose rejections use the ErrorResponse body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let field = match &rejection {
            JsonRejection::JsonDataError(err) => {
                mistyped_field(&err.body_text()).map(str::to_string)
            }
            _ => None,
        };
        if let Some(field) = field {
            let mut errors = ValidationErrors::new();
            errors.add(&field, not_a_string_message(&field));
            return ApiError::Validation(errors);
        }
        tracing::debug!("Rejected request body: {}", rejection.body_text());
        ApiError::MalformedBody
    }
}

/// Field named by a serde "invalid type" failure, e.g. `title: invalid type: integer`.
fn mistyped_field(detail: &str) -> Option<&str> {
    let (head, _) = detail.split_once(": invalid type")?;
    let field = head.rsplit(": ").next()?;
    let is_identifier =
        !field.is_empty() && field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    is_identifier.then_some(field)
}

/// The `{id}` segment of a task route. Ids that do not parse name no task.
#[derive(Debug, Clone, Copy)]
pub struct TaskIdPath(pub TaskId);

impl<S> FromRequestParts<S> for TaskIdPath
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| {
                let segment = parts.uri.path().rsplit('/').next().unwrap_or_default();
                ApiError::UnknownTask(segment.to_string())
            })?;
        raw.parse::<TaskId>()
            .map(TaskIdPath)
            .map_err(|_| ApiError::UnknownTask(raw))
    }
}
