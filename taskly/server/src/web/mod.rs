use axum::Json;
use axum::Router;
use axum::http::{Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};
use std::sync::Arc;
use taskly_core::api::ErrorResponse;
use taskly_core::{TaskId, ValidationErrors};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::sensitive_headers::SetSensitiveRequestHeadersLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::auth::{AuthServiceError, AuthState};
use crate::config::Config;
use crate::task::{TaskServiceError, TaskState};

pub mod api;
pub mod extract;

const INTERNAL_ERROR_MESSAGE: &str =
    "An unexpected error occurred while processing your request. Please try again later.";

/// Error type for API handlers. Every variant maps to one HTTP status and an ErrorResponse body.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(ValidationErrors),
    #[error("Unauthenticated.")]
    Unauthenticated,
    #[error("The provided credentials are incorrect.")]
    InvalidCredentials,
    #[error("This action is unauthorized.")]
    Forbidden,
    #[error("Task {0} not found.")]
    NotFound(TaskId),
    /// A task route whose id segment is not a task id.
    #[error("Task {0} not found.")]
    UnknownTask(String),
    #[error("The request body must be a JSON object.")]
    MalformedBody,
    /// The cause is logged and never sent to the client.
    #[error("Internal server error")]
    Internal(#[source] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::MalformedBody => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Unauthenticated | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) | ApiError::UnknownTask(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Validation(errors) => ErrorResponse::from(errors),
            ApiError::Internal(err) => {
                tracing::error!("Unhandled error: {:#}", err);
                ErrorResponse::new(INTERNAL_ERROR_MESSAGE)
            }
            other => ErrorResponse::new(other.to_string()),
        };
        (status, Json(body)).into_response()
    }
}

impl From<TaskServiceError> for ApiError {
    fn from(err: TaskServiceError) -> Self {
        match err {
            TaskServiceError::Validation(errors) => ApiError::Validation(errors),
            TaskServiceError::NotFound(id) => ApiError::NotFound(id),
            TaskServiceError::Forbidden { .. } => ApiError::Forbidden,
            TaskServiceError::Database(err) => ApiError::Internal(err.into()),
        }
    }
}

impl From<AuthServiceError> for ApiError {
    fn from(err: AuthServiceError) -> Self {
        match err {
            AuthServiceError::Validation(errors) => ApiError::Validation(errors),
            AuthServiceError::InvalidCredentials => ApiError::InvalidCredentials,
            AuthServiceError::Unauthenticated => ApiError::Unauthenticated,
            AuthServiceError::Database(err) => ApiError::Internal(err.into()),
            AuthServiceError::Internal(err) => ApiError::Internal(err),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(title = "Taskly", description = "Multi-user to-do list API"),
    paths(
        crate::task::api::list_tasks_handler,
        crate::task::api::create_task_handler,
        crate::task::api::show_task_handler,
        crate::task::api::update_task_handler,
        crate::task::api::delete_task_handler,
        crate::auth::api::register_handler,
        crate::auth::api::login_handler,
        crate::auth::api::logout_handler,
        crate::auth::api::current_user_handler,
        health_check_handler,
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Tasks", description = "Task management"),
        (name = "Auth", description = "Accounts and bearer tokens")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// Builds the application router on top of an already migrated database.
pub fn create_app(db: Arc<DatabaseConnection>, config: &Config) -> Router {
    let auth_state = Arc::new(AuthState::from_config(config, db.clone()));
    let task_state = Arc::new(TaskState { db });

    let public_routes = Router::new()
        .route("/health", get(health_check_handler))
        .route("/api-docs/openapi.json", get(openapi_handler));

    Router::new()
        .merge(public_routes)
        .merge(api::create_api_router(
            auth_state,
            task_state,
            config.public_reads,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(SetSensitiveRequestHeadersLayer::new([header::AUTHORIZATION]))
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer()),
        )
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
}

#[tracing::instrument(skip(config))]
pub async fn start_web_server(config: Config) -> anyhow::Result<()> {
    let server_address = format!("0.0.0.0:{}", &config.port);
    let listener = tokio::net::TcpListener::bind(&server_address).await?;
    tracing::info!("Web server running on http://{}", server_address);

    let db = Database::connect(&config.db_url).await?;
    migration::Migrator::up(&db, None).await?;
    tracing::info!("Database migrations applied successfully");

    if config.public_reads {
        tracing::info!("Task reads are public");
    }

    serve(listener, Arc::new(db), &config, shutdown_signal()).await
}

/// Serves the application on `listener` until `shutdown` completes.
pub async fn serve(
    listener: tokio::net::TcpListener,
    db: Arc<DatabaseConnection>,
    config: &Config,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_app(db, config);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

#[tracing::instrument]
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = String)),
    tag = "Health"
)]
pub async fn health_check_handler() -> &'static str {
    "OK"
}

pub async fn openapi_handler() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_text(response: Response) -> String {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(body.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn can_hide_internal_error_details() {
        let err = ApiError::Internal(anyhow::anyhow!("connection refused on 10.0.0.3"));
        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_text(response).await,
            format!(r#"{{"message":"{INTERNAL_ERROR_MESSAGE}"}}"#)
        );
    }

    #[tokio::test]
    async fn can_map_forbidden_to_403() {
        let err = ApiError::from(TaskServiceError::Forbidden {
            task_id: 1,
            requester: 2,
        });
        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            body_text(response).await,
            r#"{"message":"This action is unauthorized."}"#
        );
    }

    #[tokio::test]
    async fn can_map_database_errors_to_500() {
        let err = ApiError::from(AuthServiceError::Database(sea_orm::DbErr::Custom(
            "boom".to_string(),
        )));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn openapi_document_lists_task_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/tasks"));
        assert!(doc.paths.paths.contains_key("/tasks/{id}"));
        assert!(doc.paths.paths.contains_key("/login"));
    }
}
