use crate::auth::CurrentUser;
use crate::auth::api::require_auth_middleware;
use crate::task::{TaskService, TaskState};
use crate::web::ApiError;
use crate::web::extract::{ApiJson, TaskIdPath};
use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    middleware::from_fn,
    routing::{get, post},
};
use std::sync::Arc;
use taskly_core::api::{CreateTaskRequest, ErrorResponse, MessageResponse, UpdateTaskRequest};
use taskly_core::Task;

/// Handler for GET /tasks - Returns every task with its owner embedded.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/tasks",
    responses(
        (status = 200, description = "Successfully retrieved tasks", body = Vec<Task>),
        (status = 401, description = "Reads require a token in this deployment", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn list_tasks_handler(
    State(state): State<Arc<TaskState>>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let tasks = TaskService::new(&state.db).list_tasks().await?;
    Ok(Json(tasks))
}

/// Handler for POST /tasks - Creates a task owned by the requester.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    post,
    path = "/tasks",
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created", body = Task),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 422, description = "Invalid task fields", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Tasks"
)]
pub async fn create_task_handler(
    State(state): State<Arc<TaskState>>,
    Extension(current_user): Extension<CurrentUser>,
    ApiJson(payload): ApiJson<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let task = TaskService::new(&state.db)
        .create_task(&payload, current_user.id)
        .await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// Handler for GET /tasks/{id}.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/tasks/{id}",
    params(("id" = i32, Path, description = "Task ID")),
    responses(
        (status = 200, description = "The task", body = Task),
        (status = 404, description = "No such task", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn show_task_handler(
    State(state): State<Arc<TaskState>>,
    TaskIdPath(id): TaskIdPath,
) -> Result<Json<Task>, ApiError> {
    let task = TaskService::new(&state.db).get_task(id).await?;
    Ok(Json(task))
}

/// Handler for PUT and PATCH /tasks/{id} - Applies the supplied fields only.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    put,
    path = "/tasks/{id}",
    params(("id" = i32, Path, description = "Task ID")),
    request_body = UpdateTaskRequest,
    responses(
        (status = 200, description = "Updated task", body = Task),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 403, description = "Requester does not own the task", body = ErrorResponse),
        (status = 404, description = "No such task", body = ErrorResponse),
        (status = 422, description = "Invalid task fields", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Tasks"
)]
pub async fn update_task_handler(
    State(state): State<Arc<TaskState>>,
    Extension(current_user): Extension<CurrentUser>,
    TaskIdPath(id): TaskIdPath,
    payload: Result<ApiJson<UpdateTaskRequest>, ApiError>,
) -> Result<Json<Task>, ApiError> {
    let service = TaskService::new(&state.db);
    // A non-owner is refused before their body is looked at.
    let ApiJson(payload) = match payload {
        Ok(payload) => payload,
        Err(err) => {
            service.ensure_owner(id, current_user.id).await?;
            return Err(err);
        }
    };
    let task = service.update_task(id, &payload, current_user.id).await?;
    Ok(Json(task))
}

/// Handler for DELETE /tasks/{id}.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    delete,
    path = "/tasks/{id}",
    params(("id" = i32, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task deleted", body = MessageResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 403, description = "Requester does not own the task", body = ErrorResponse),
        (status = 404, description = "No such task", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Tasks"
)]
pub async fn delete_task_handler(
    State(state): State<Arc<TaskState>>,
    Extension(current_user): Extension<CurrentUser>,
    TaskIdPath(id): TaskIdPath,
) -> Result<Json<MessageResponse>, ApiError> {
    TaskService::new(&state.db)
        .delete_task(id, current_user.id)
        .await?;
    Ok(Json(MessageResponse::new("Task deleted successfully")))
}

/// Creates and returns the tasks router.
///
/// Writes always require a token. Reads do only when `public_reads` is false.
pub fn create_api_router(state: Arc<TaskState>, public_reads: bool) -> Router {
    let read_routes = Router::new()
        .route("/tasks", get(list_tasks_handler))
        .route("/tasks/{id}", get(show_task_handler));
    let read_routes = if public_reads {
        read_routes
    } else {
        read_routes.layer(from_fn(require_auth_middleware))
    };

    let write_routes = Router::new()
        .route("/tasks", post(create_task_handler))
        .route(
            "/tasks/{id}",
            axum::routing::put(update_task_handler)
                .patch(update_task_handler)
                .delete(delete_task_handler),
        )
        .layer(from_fn(require_auth_middleware));

    read_routes.merge(write_routes).with_state(state)
}
