#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use migration::MigratorTrait;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use serde_json::{Value, json};
use std::sync::Arc;
use taskly_server::config::Config;
use taskly_server::entities::user;
use testcontainers_modules::testcontainers::runners::AsyncRunner;
use testcontainers_modules::{postgres, testcontainers};
use tower::ServiceExt;

pub const JWT_SECRET: &str = "test_secret";

pub fn test_config(public_reads: bool) -> Config {
    Config {
        db_url: "sqlite::memory:".to_string(),
        port: 8080,
        jwt_secret: JWT_SECRET.to_string(),
        token_ttl_hours: 24,
        public_reads,
    }
}

/// Connects to a fresh in-memory SQLite database with all migrations applied.
pub async fn setup_db() -> anyhow::Result<DatabaseConnection> {
    // Every pooled connection would get its own in-memory database.
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(options).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

pub async fn setup_container() -> anyhow::Result<testcontainers::ContainerAsync<postgres::Postgres>>
{
    let container = postgres::Postgres::default().start().await?;
    Ok(container)
}

pub async fn setup_postgres_db(
    container: &testcontainers::ContainerAsync<postgres::Postgres>,
) -> anyhow::Result<DatabaseConnection> {
    let host = container.get_host().await?;
    let port = container.get_host_port_ipv4(5432).await?;
    let db_url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);
    let db = Database::connect(&db_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

/// Test context for endpoint tests.
pub struct TestContext {
    pub db: Arc<DatabaseConnection>,
    pub app: Router,
}

pub async fn setup() -> anyhow::Result<TestContext> {
    setup_with_config(test_config(true)).await
}

pub async fn setup_with_config(config: Config) -> anyhow::Result<TestContext> {
    // Allow multiple calls to init for tests.
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let db = Arc::new(setup_db().await?);
    let app = taskly_server::web::create_app(db.clone(), &config);
    Ok(TestContext { db, app })
}

/// Inserts a user row directly, bypassing registration and password hashing.
pub async fn insert_user(db: &DatabaseConnection, name: &str, email: &str) -> i32 {
    let now = chrono::Utc::now();
    let model = user::ActiveModel {
        name: Set(name.to_string()),
        email: Set(email.to_string()),
        password_hash: Set("unused".to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    model.insert(db).await.unwrap().id
}

pub fn request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::ACCEPT, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Sends a request and returns the status with the raw body.
pub async fn send_raw(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

/// Sends a request and decodes the JSON body. Empty bodies decode to `Value::Null`.
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send_raw(app, request).await;
    if body.is_empty() {
        return (status, Value::Null);
    }
    let value = serde_json::from_slice(&body).unwrap_or_else(|err| {
        panic!(
            "Response body is not JSON ({}): {}",
            err,
            String::from_utf8_lossy(&body)
        )
    });
    (status, value)
}

/// Registers a user through the API and returns their ID and token.
pub async fn register_user(app: &Router, name: &str, email: &str) -> (i32, String) {
    let (status, body) = send(
        app,
        request(
            Method::POST,
            "/register",
            None,
            Some(json!({
                "name": name,
                "email": email,
                "password": "password123",
                "password_confirmation": "password123",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "registration failed: {}", body);
    let id = body["user"]["id"].as_i64().unwrap() as i32;
    let token = body["token"].as_str().unwrap().to_string();
    (id, token)
}

/// Creates a task through the API and returns its JSON representation.
pub async fn create_task(app: &Router, token: &str, title: &str, due_date: &str) -> Value {
    let (status, body) = send(
        app,
        request(
            Method::POST,
            "/tasks",
            Some(token),
            Some(json!({
                "title": title,
                "description": format!("{} description", title),
                "due_date": due_date,
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "task creation failed: {}", body);
    body
}
