//! Tests for the forgot-password / reset-password flow.

mod common;

use axum::http::StatusCode;
use common::{login, post_json, register, settle, test_app};
use serde_json::json;

/// Read alice's live reset token straight from the store.
async fn reset_token_for(ctx: &common::TestApp, username: &str) -> Option<String> {
    let user = ctx.db.users().get_by_username(username).await.unwrap()?;
    let row: Option<(String,)> =
        sqlx::query_as("SELECT token FROM password_reset_tokens WHERE user_id = ?")
            .bind(user.id)
            .fetch_optional(ctx.db.pool())
            .await
            .unwrap();
    row.map(|r| r.0)
}

#[tokio::test]
async fn test_forgot_password_unknown_email_sends_nothing() {
    let ctx = test_app().await;

    let (status, _) = post_json(
        &ctx.app,
        "/api/auth/forgot-password",
        json!({ "email": "nobody@x.com" }),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);

    settle().await;
    assert!(ctx.mailer.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_forgot_password_creates_record_and_emails_link() {
    let ctx = test_app().await;
    register(&ctx.app, "alice", "a@x.com", "Aa1!aaaa").await;

    let (status, _) = post_json(
        &ctx.app,
        "/api/auth/forgot-password",
        json!({ "email": "a@x.com" }),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let token = reset_token_for(&ctx, "alice").await.expect("record created");

    settle().await;
    let sent = ctx.mailer.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "a@x.com");
    assert!(sent[0].1.contains(&token), "email body embeds the raw token");
}

#[tokio::test]
async fn test_second_request_replaces_reset_record() {
    let ctx = test_app().await;
    register(&ctx.app, "alice", "a@x.com", "Aa1!aaaa").await;

    post_json(&ctx.app, "/api/auth/forgot-password", json!({ "email": "a@x.com" })).await;
    let first = reset_token_for(&ctx, "alice").await.unwrap();

    post_json(&ctx.app, "/api/auth/forgot-password", json!({ "email": "a@x.com" })).await;
    let second = reset_token_for(&ctx, "alice").await.unwrap();

    assert_ne!(first, second);

    let user = ctx.db.users().get_by_username("alice").await.unwrap().unwrap();
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM password_reset_tokens WHERE user_id = ?")
        .bind(user.id)
        .fetch_one(ctx.db.pool())
        .await
        .unwrap();
    assert_eq!(row.0, 1);
}

#[tokio::test]
async fn test_reset_password_is_single_use() {
    let ctx = test_app().await;
    register(&ctx.app, "alice", "a@x.com", "Aa1!aaaa").await;
    post_json(&ctx.app, "/api/auth/forgot-password", json!({ "email": "a@x.com" })).await;
    let token = reset_token_for(&ctx, "alice").await.unwrap();

    let (status, _) = post_json(
        &ctx.app,
        "/api/auth/reset-password",
        json!({ "token": token, "newPassword": "Bb2!bbbb" }),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Old password is dead, new one works.
    let (status, _) = login(&ctx.app, "alice", "Aa1!aaaa").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = login(&ctx.app, "alice", "Bb2!bbbb").await;
    assert_eq!(status, StatusCode::OK);

    // The record was consumed; replaying the token is NotFound.
    let (status, _) = post_json(
        &ctx.app,
        "/api/auth/reset-password",
        json!({ "token": token, "newPassword": "Cc3!cccc" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reset_password_expired_token_deleted() {
    let ctx = test_app().await;
    register(&ctx.app, "alice", "a@x.com", "Aa1!aaaa").await;
    post_json(&ctx.app, "/api/auth/forgot-password", json!({ "email": "a@x.com" })).await;
    let token = reset_token_for(&ctx, "alice").await.unwrap();

    sqlx::query("UPDATE password_reset_tokens SET expires_at = datetime('now', '-1 minute')")
        .execute(ctx.db.pool())
        .await
        .unwrap();

    let (status, body) = post_json(
        &ctx.app,
        "/api/auth/reset-password",
        json!({ "token": token, "newPassword": "Bb2!bbbb" }),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Password reset token expired");
    assert!(reset_token_for(&ctx, "alice").await.is_none());

    // The password did not change.
    let (status, _) = login(&ctx.app, "alice", "Aa1!aaaa").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_reset_password_rejects_weak_password() {
    let ctx = test_app().await;
    register(&ctx.app, "alice", "a@x.com", "Aa1!aaaa").await;
    post_json(&ctx.app, "/api/auth/forgot-password", json!({ "email": "a@x.com" })).await;
    let token = reset_token_for(&ctx, "alice").await.unwrap();

    let (status, _) = post_json(
        &ctx.app,
        "/api/auth/reset-password",
        json!({ "token": token, "newPassword": "short" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    // The token was not consumed by the rejected attempt.
    assert!(reset_token_for(&ctx, "alice").await.is_some());
}
