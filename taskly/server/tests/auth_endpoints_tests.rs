use axum::http::{Method, StatusCode};
use common::{create_task, register_user, request, send, send_raw, setup};
use insta::assert_json_snapshot;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::json;
use taskly_core::api::ErrorResponse;
use taskly_server::entities::access_token;

mod common;

#[tokio::test]
async fn can_register_and_receive_token() -> anyhow::Result<()> {
    let ctx = setup().await?;

    let (status, body) = send(
        &ctx.app,
        request(
            Method::POST,
            "/register",
            None,
            Some(json!({
                "name": "Alice",
                "email": "alice@example.com",
                "password": "password123",
                "password_confirmation": "password123",
            })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["name"], "Alice");
    assert_eq!(body["user"]["email"], "alice@example.com");
    assert!(body["user"].get("password_hash").is_none());
    assert!(!body["token"].as_str().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn register_reports_every_invalid_field() -> anyhow::Result<()> {
    let ctx = setup().await?;

    let (status, body) = send_raw(
        &ctx.app,
        request(
            Method::POST,
            "/register",
            None,
            Some(json!({
                "name": "",
                "email": "not-an-email",
                "password": "short",
                "password_confirmation": "short",
            })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let body: ErrorResponse = serde_json::from_slice(&body)?;
    assert_json_snapshot!(body, @r#"
    {
      "message": "The name field is required. (and 2 more errors)",
      "errors": {
        "name": [
          "The name field is required."
        ],
        "email": [
          "The email field must be a valid email address."
        ],
        "password": [
          "The password field must be at least 8 characters."
        ]
      }
    }
    "#);
    Ok(())
}

#[tokio::test]
async fn register_rejects_mismatched_confirmation() -> anyhow::Result<()> {
    let ctx = setup().await?;

    let (status, body) = send(
        &ctx.app,
        request(
            Method::POST,
            "/register",
            None,
            Some(json!({
                "name": "Alice",
                "email": "alice@example.com",
                "password": "password123",
                "password_confirmation": "password124",
            })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body["errors"]["password"][0],
        "The password field confirmation does not match."
    );
    Ok(())
}

#[tokio::test]
async fn register_rejects_taken_email() -> anyhow::Result<()> {
    let ctx = setup().await?;
    register_user(&ctx.app, "Alice", "alice@example.com").await;

    let (status, body) = send(
        &ctx.app,
        request(
            Method::POST,
            "/register",
            None,
            Some(json!({
                "name": "Impostor",
                "email": "alice@example.com",
                "password": "password123",
                "password_confirmation": "password123",
            })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "The email has already been taken.");
    assert_eq!(body["errors"]["email"][0], "The email has already been taken.");
    Ok(())
}

#[tokio::test]
async fn can_login_with_registered_credentials() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let (user_id, _) = register_user(&ctx.app, "Alice", "alice@example.com").await;

    let (status, body) = send(
        &ctx.app,
        request(
            Method::POST,
            "/login",
            None,
            Some(json!({ "email": "alice@example.com", "password": "password123" })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], user_id);
    let token = body["token"].as_str().unwrap();

    let (status, _) = send(&ctx.app, request(Method::GET, "/user", Some(token), None)).await;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn login_rejects_wrong_password() -> anyhow::Result<()> {
    let ctx = setup().await?;
    register_user(&ctx.app, "Alice", "alice@example.com").await;

    let (status, body) = send(
        &ctx.app,
        request(
            Method::POST,
            "/login",
            None,
            Some(json!({ "email": "alice@example.com", "password": "wrong-password" })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "message": "The provided credentials are incorrect." }));
    Ok(())
}

#[tokio::test]
async fn login_rejects_unknown_email() -> anyhow::Result<()> {
    let ctx = setup().await?;

    let (status, body) = send(
        &ctx.app,
        request(
            Method::POST,
            "/login",
            None,
            Some(json!({ "email": "nobody@example.com", "password": "password123" })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "The provided credentials are incorrect.");
    Ok(())
}

#[tokio::test]
async fn login_requires_both_fields() -> anyhow::Result<()> {
    let ctx = setup().await?;

    let (status, body) = send(
        &ctx.app,
        request(Method::POST, "/login", None, Some(json!({}))),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"]["email"][0], "The email field is required.");
    assert_eq!(body["errors"]["password"][0], "The password field is required.");
    Ok(())
}

#[tokio::test]
async fn logout_revokes_token() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let (_, token) = register_user(&ctx.app, "Alice", "alice@example.com").await;

    let (status, body) =
        send(&ctx.app, request(Method::POST, "/logout", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "You are logged out." }));

    let (status, body) = send(&ctx.app, request(Method::GET, "/user", Some(&token), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "message": "Unauthenticated." }));
    Ok(())
}

#[tokio::test]
async fn logout_keeps_other_tokens_valid() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let (_, first_token) = register_user(&ctx.app, "Alice", "alice@example.com").await;
    let (_, body) = send(
        &ctx.app,
        request(
            Method::POST,
            "/login",
            None,
            Some(json!({ "email": "alice@example.com", "password": "password123" })),
        ),
    )
    .await;
    let second_token = body["token"].as_str().unwrap().to_string();

    send(&ctx.app, request(Method::POST, "/logout", Some(&first_token), None)).await;

    let (status, _) = send(
        &ctx.app,
        request(Method::GET, "/user", Some(&second_token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn logout_requires_token() -> anyhow::Result<()> {
    let ctx = setup().await?;

    let (status, _) = send(&ctx.app, request(Method::POST, "/logout", None, None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn current_user_rejects_garbage_token() -> anyhow::Result<()> {
    let ctx = setup().await?;

    let (status, body) = send(
        &ctx.app,
        request(Method::GET, "/user", Some("not.a.token"), None),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Unauthenticated.");
    Ok(())
}

#[tokio::test]
async fn expired_token_is_rejected() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let (alice_id, token) = register_user(&ctx.app, "Alice", "alice@example.com").await;

    access_token::Entity::update_many()
        .col_expr(
            access_token::Column::ExpiresAt,
            Expr::value(chrono::Utc::now() - chrono::Duration::hours(1)),
        )
        .filter(access_token::Column::UserId.eq(alice_id))
        .exec(ctx.db.as_ref())
        .await?;

    let (status, body) = send(&ctx.app, request(Method::GET, "/user", Some(&token), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Unauthenticated.");
    Ok(())
}

#[tokio::test]
async fn current_user_lists_only_own_tasks() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let (alice_id, alice_token) = register_user(&ctx.app, "Alice", "alice@example.com").await;
    let (_, bob_token) = register_user(&ctx.app, "Bob", "bob@example.com").await;
    create_task(&ctx.app, &alice_token, "Buy milk", "2024-01-01").await;
    create_task(&ctx.app, &bob_token, "Walk dog", "2024-01-02").await;
    create_task(&ctx.app, &alice_token, "Pay rent", "2024-01-03").await;

    let (status, body) = send(
        &ctx.app,
        request(Method::GET, "/user", Some(&alice_token), None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], alice_id);
    let titles: Vec<&str> = body["tasks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|task| task["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Buy milk", "Pay rent"]);
    Ok(())
}
