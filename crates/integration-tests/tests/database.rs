//! End-to-end tests against a real `PostgreSQL`.
//!
//! Run with `TEST_DATABASE_URL` set and `-- --ignored`.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;

use proudshop_admin::services::AdminAccounts;
use proudshop_admin::state::AppState;
use proudshop_core::AdminRole;
use proudshop_integration_tests::{
    app, database_pool, get, json, send, test_cipher, test_config,
};

async fn state() -> AppState {
    let pool = database_pool().await;
    AppState::new(test_config("postgres://from-env"), pool, test_cipher())
}

fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4().simple())
}

/// Create an admin with `role` and return a bearer token for it.
async fn login_as(state: &AppState, role: AdminRole) -> String {
    let email = format!("{}@proudshop.test", unique("admin"));
    let password = "correct horse battery";
    AdminAccounts::new(state.pool())
        .create_admin(&email, "Test Admin", role, password)
        .await
        .unwrap();

    let response = send(
        app(state.clone()),
        json(
            "POST",
            "/api/v1/auth/login",
            None,
            &json!({"email": email, "password": password}),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["token_type"], "bearer");
    response.body["access_token"].as_str().unwrap().to_owned()
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_login_and_me() {
    let state = state().await;
    let token = login_as(&state, AdminRole::Admin).await;

    let me = send(app(state.clone()), get("/api/v1/auth/me", Some(&token))).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["role"], "admin");

    let wrong = send(
        app(state),
        json(
            "POST",
            "/api/v1/auth/login",
            None,
            &json!({"email": me.body["email"], "password": "wrong password"}),
        ),
    )
    .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.error(), Some("Incorrect email or password"));
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_settings_lifecycle() {
    let state = state().await;
    let token = login_as(&state, AdminRole::Admin).await;
    let key = unique("smtp_test");

    let created = send(
        app(state.clone()),
        json(
            "POST",
            "/api/v1/settings/",
            Some(&token),
            &json!({"key": key, "value": "first", "category": "email"}),
        ),
    )
    .await;
    assert_eq!(created.status, StatusCode::OK);
    assert_eq!(created.body["value"], "first");

    // PUT replaces by key
    let replaced = send(
        app(state.clone()),
        json(
            "PUT",
            "/api/v1/settings",
            Some(&token),
            &json!({"key": key, "value": "second", "category": "email"}),
        ),
    )
    .await;
    assert_eq!(replaced.status, StatusCode::OK);
    assert_eq!(replaced.body["id"], created.body["id"]);

    let email = send(
        app(state.clone()),
        get("/api/v1/settings/category/email", Some(&token)),
    )
    .await;
    let rows = email.body.as_array().unwrap();
    assert!(rows.iter().all(|r| r["category"] == "email"));
    assert!(rows.iter().any(|r| r["key"] == key.as_str() && r["value"] == "second"));

    let delete = Request::delete(format!("/api/v1/settings/{key}"))
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(app(state.clone()), delete).await.status, StatusCode::NO_CONTENT);

    let again = Request::delete(format!("/api/v1/settings/{key}"))
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(app(state), again).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_staff_cannot_write_settings() {
    let state = state().await;
    let token = login_as(&state, AdminRole::Staff).await;

    let list = send(app(state.clone()), get("/api/v1/settings", Some(&token))).await;
    assert_eq!(list.status, StatusCode::OK);

    let write = send(
        app(state),
        json(
            "POST",
            "/api/v1/settings",
            Some(&token),
            &json!({"key": unique("k"), "value": "v"}),
        ),
    )
    .await;
    assert_eq!(write.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_openai_key_is_masked() {
    let state = state().await;
    let token = login_as(&state, AdminRole::SuperAdmin).await;

    let rejected = send(
        app(state.clone()),
        json(
            "POST",
            "/api/v1/openai/key",
            Some(&token),
            &json!({"key": "openai_key", "value": "sk-test-9876"}),
        ),
    )
    .await;
    assert_eq!(rejected.status, StatusCode::BAD_REQUEST);
    assert_eq!(rejected.error(), Some("Key name must be OPENAI_API_KEY"));

    let saved = send(
        app(state.clone()),
        json(
            "POST",
            "/api/v1/openai/key",
            Some(&token),
            &json!({"key": "OPENAI_API_KEY", "value": "sk-test-9876"}),
        ),
    )
    .await;
    assert_eq!(saved.body, json!({"ok": true}));

    let status = send(app(state.clone()), get("/api/v1/openai/key", Some(&token))).await;
    assert_eq!(
        status.body,
        json!({"exists": true, "masked": true, "last4": "9876"})
    );

    // Stored encrypted, readable through the settings store
    let raw = send(app(state.clone()), get("/api/v1/settings/category/openai", Some(&token))).await;
    let row = raw
        .body
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["key"] == "OPENAI_API_KEY")
        .unwrap()
        .clone();
    assert_eq!(row["is_encrypted"], true);
    assert_ne!(row["value"], "sk-test-9876");
    assert_eq!(
        state.settings().try_get("OPENAI_API_KEY").await.unwrap().as_deref(),
        Some("sk-test-9876")
    );
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_chat_flow() {
    let state = state().await;

    let created = send(
        app(state.clone()),
        json(
            "POST",
            "/api/v1/chat/sessions",
            None,
            &json!({"customer_name": "Arta", "customer_email": "arta@example.com"}),
        ),
    )
    .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["messages"], json!([]));
    let session_id = created.body["session_id"].as_str().unwrap().to_owned();

    for content in ["Përshëndetje", "A e keni në stok?"] {
        let posted = send(
            app(state.clone()),
            json(
                "POST",
                &format!("/api/v1/chat/sessions/{session_id}/messages"),
                None,
                &json!({"content": content}),
            ),
        )
        .await;
        assert_eq!(posted.status, StatusCode::CREATED);
        assert_eq!(posted.body["role"], "user");
    }

    let token = login_as(&state, AdminRole::Admin).await;
    let reply = send(
        app(state.clone()),
        json(
            "POST",
            &format!("/api/v1/chat/sessions/{session_id}/messages"),
            Some(&token),
            &json!({"content": "Po, e kemi.", "role": "admin"}),
        ),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED);

    let session = send(
        app(state.clone()),
        get(&format!("/api/v1/chat/sessions/{session_id}"), None),
    )
    .await;
    let contents: Vec<&str> = session.body["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, ["Përshëndetje", "A e keni në stok?", "Po, e kemi."]);

    let missing = send(
        app(state.clone()),
        json(
            "POST",
            "/api/v1/chat/sessions/no-such-session/messages",
            None,
            &json!({"content": "hello"}),
        ),
    )
    .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.error(), Some("Session not found"));

    let delete = Request::delete(format!("/api/v1/chat/sessions/{session_id}"))
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(app(state.clone()), delete).await.status, StatusCode::NO_CONTENT);

    let gone = send(
        app(state),
        get(&format!("/api/v1/chat/sessions/{session_id}"), None),
    )
    .await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
    assert_eq!(gone.error(), Some("Not found"));
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_compose_validation() {
    let state = state().await;
    let token = login_as(&state, AdminRole::Admin).await;

    let missing_type = send(
        app(state.clone()),
        json("POST", "/api/v1/ai/email", Some(&token), &json!({"data": {}})),
    )
    .await;
    assert_eq!(missing_type.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing_type.error(), Some("Missing type"));

    let unsupported = send(
        app(state.clone()),
        json(
            "POST",
            "/api/v1/ai/email",
            Some(&token),
            &json!({"type": "flyer", "data": {}}),
        ),
    )
    .await;
    assert_eq!(unsupported.status, StatusCode::BAD_REQUEST);
    assert_eq!(unsupported.error(), Some("Unsupported type"));

    let overflow = send(
        app(state.clone()),
        json(
            "POST",
            "/api/v1/ai/email",
            Some(&token),
            &json!({
                "type": "product_offer",
                "data": {
                    "productData": {"name": "X", "price": 1_000_000_000_000_000_i64},
                    "offerDetails": {"discount": -1_000_000_000_000_000_i64}
                }
            }),
        ),
    )
    .await;
    assert_eq!(overflow.status, StatusCode::BAD_REQUEST);

    let no_product = send(
        app(state),
        json(
            "POST",
            "/api/v1/ai/email",
            Some(&token),
            &json!({"type": "product_offer", "data": {}}),
        ),
    )
    .await;
    assert_eq!(no_product.status, StatusCode::BAD_REQUEST);
    assert_eq!(no_product.error(), Some("Missing product data"));
}
