use crate::auth::{AuthService, AuthServiceError, AuthState, CurrentUser};
use crate::web::ApiError;
use crate::web::extract::ApiJson;
use axum::{
    Extension, Json, Router,
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::{Next, from_fn},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::sync::Arc;
use taskly_core::api::{
    AuthResponse, CurrentUserResponse, ErrorResponse, LoginRequest, MessageResponse,
    RegisterRequest,
};

/// Creates the router for the account endpoints.
pub fn create_api_router(state: Arc<AuthState>) -> Router {
    let public_routes = Router::new()
        .route("/register", post(register_handler))
        .route("/login", post(login_handler));
    let protected_routes = Router::new()
        .route("/logout", post(logout_handler))
        .route("/user", get(current_user_handler))
        .layer(from_fn(require_auth_middleware));

    public_routes.merge(protected_routes).with_state(state)
}

/// Extracts the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolves the bearer token, if any, and sets the CurrentUser extension.
/// Requests without a valid token pass through anonymously.
pub async fn auth_user_middleware(
    State(state): State<Arc<AuthState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = bearer_token(&headers) {
        match AuthService::from_state(&state).authenticate(token).await {
            Ok(current_user) => {
                request.extensions_mut().insert(current_user);
            }
            Err(AuthServiceError::Unauthenticated) => {
                tracing::debug!("Ignoring invalid bearer token");
            }
            Err(err) => return ApiError::from(err).into_response(),
        }
    }

    next.run(request).await
}

/// Rejects requests that carry no CurrentUser extension with UNAUTHORIZED.
/// Must run after auth_user_middleware.
pub async fn require_auth_middleware(request: Request, next: Next) -> Response {
    if request.extensions().get::<CurrentUser>().is_none() {
        return ApiError::Unauthenticated.into_response();
    }

    next.run(request).await
}

/// Handler for POST /register.
#[tracing::instrument(skip(state, payload))]
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered and signed in", body = AuthResponse),
        (status = 422, description = "Invalid registration", body = ErrorResponse)
    ),
    tag = "Auth"
)]
pub async fn register_handler(
    State(state): State<Arc<AuthState>>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let (user, token) = AuthService::from_state(&state).register(&payload).await?;
    Ok((StatusCode::CREATED, Json(AuthResponse { user, token })))
}

/// Handler for POST /login.
#[tracing::instrument(skip(state, payload))]
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 422, description = "Malformed request", body = ErrorResponse)
    ),
    tag = "Auth"
)]
pub async fn login_handler(
    State(state): State<Arc<AuthState>>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let (user, token) = AuthService::from_state(&state).login(&payload).await?;
    Ok(Json(AuthResponse { user, token }))
}

/// Handler for POST /logout. Revokes the presented token.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 200, description = "Token revoked", body = MessageResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout_handler(
    State(state): State<Arc<AuthState>>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Json<MessageResponse>, ApiError> {
    AuthService::from_state(&state).logout(&current_user).await?;
    Ok(Json(MessageResponse::new("You are logged out.")))
}

/// Handler for GET /user.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/user",
    responses(
        (status = 200, description = "The signed-in user and their tasks", body = CurrentUserResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn current_user_handler(
    State(state): State<Arc<AuthState>>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Json<CurrentUserResponse>, ApiError> {
    let (user, tasks) = AuthService::from_state(&state)
        .current_user(&current_user)
        .await?;
    Ok(Json(CurrentUserResponse { user, tasks }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_authorization(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn can_extract_bearer_token() {
        let headers = headers_with_authorization("Bearer abc.def.ghi");
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));
    }

    #[test]
    fn ignores_other_authorization_schemes() {
        let headers = headers_with_authorization("Basic dXNlcjpwYXNz");
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn ignores_empty_bearer_token() {
        let headers = headers_with_authorization("Bearer ");
        assert_eq!(bearer_token(&headers), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
