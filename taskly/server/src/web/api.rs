use std::sync::Arc;

use crate::{
    auth::{self, AuthState},
    task::TaskState,
};

use axum::{Router, middleware::from_fn_with_state};

use tower::ServiceBuilder;

/// Creates the JSON API routes: accounts and tasks.
pub fn create_api_router(
    auth_state: Arc<AuthState>,
    task_state: Arc<TaskState>,
    public_reads: bool,
) -> Router {
    let auth_routes = auth::api::create_api_router(auth_state.clone());
    let task_routes = crate::task::api::create_api_router(task_state, public_reads);
    auth_routes
        .merge(task_routes)
        .layer(ServiceBuilder::new().layer(from_fn_with_state(
            auth_state,
            auth::api::auth_user_middleware,
        )))
}
