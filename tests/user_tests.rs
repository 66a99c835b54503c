// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account creation and `/users/me/` tests.

use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;
use unitconv_api::db::Store;
use uuid::Uuid;

mod common;

use common::{body_json, create_test_app, request, session_for};

#[tokio::test]
async fn test_create_user() {
    let (app, state) = create_test_app();

    let response = app
        .oneshot(request(
            "POST",
            "/users/create/",
            None,
            Some(json!({
                "username": "uma",
                "email": "uma@example.com",
                "password": "correct horse battery staple",
                "first_name": "Uma",
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["username"], "uma");
    assert_eq!(body["full_name"], "Uma");
    assert_eq!(body["last_name"], "");
    assert!(body["date_joined"].is_string());
    assert!(body.get("password").is_none());
    assert!(body.get("password_hash").is_none());

    let stored = state.db.find_by_username("uma").await.unwrap().unwrap();
    let hash = stored.password_hash.unwrap();
    assert_ne!(hash, "correct horse battery staple");
    assert!(bcrypt::verify("correct horse battery staple", &hash).unwrap());
}

#[tokio::test]
async fn test_create_user_duplicates_rejected() {
    let (app, state) = create_test_app();
    session_for(&state, "vic@example.com").await;

    for (username, email) in [("vic", "other@example.com"), ("vic2", "vic@example.com")] {
        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/users/create/",
                None,
                Some(json!({ "username": username, "email": email, "password": "pw" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "bad_request");
    }
}

#[tokio::test]
async fn test_create_user_validation() {
    let (app, _) = create_test_app();

    for body in [
        json!({ "username": "", "email": "w@example.com", "password": "pw" }),
        json!({ "username": "w", "email": "not-an-email", "password": "pw" }),
        json!({ "username": "w", "email": "w@example.com", "password": "" }),
    ] {
        let response = app
            .clone()
            .oneshot(request("POST", "/users/create/", None, Some(body)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let response = app
        .oneshot(request(
            "POST",
            "/users/create/",
            None,
            Some(json!({ "username": "w" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "malformed_request");
}

#[tokio::test]
async fn test_get_me() {
    let (app, state) = create_test_app();
    let (user_id, access, _) = session_for(&state, "wren@example.com").await;

    let response = app
        .oneshot(request("GET", "/users/me/", Some(&access), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["id"], user_id.to_string());
    assert_eq!(body["email"], "wren@example.com");
    assert_eq!(body["full_name"], "wren");
}

#[tokio::test]
async fn test_update_me_changes_names_only() {
    let (app, state) = create_test_app();
    let (user_id, access, _) = session_for(&state, "xia@example.com").await;

    let response = app
        .oneshot(request(
            "PUT",
            "/users/me/",
            Some(&access),
            Some(json!({
                "first_name": "Xia",
                "last_name": "Lin",
                "email": "hijack@example.com",
                "username": "root",
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["full_name"], "Xia Lin");
    assert_eq!(body["email"], "xia@example.com");
    assert_eq!(body["username"], "xia");

    let stored = state.db.find_user_by_id(user_id).await.unwrap().unwrap();
    assert_eq!(stored.first_name, "Xia");
    assert_eq!(stored.email, "xia@example.com");
}

#[tokio::test]
async fn test_token_for_unknown_user_is_404() {
    let (app, state) = create_test_app();
    let pair = state.tokens.issue(Uuid::new_v4()).unwrap();

    let response = app
        .oneshot(request("GET", "/users/me/", Some(&pair.access_token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
