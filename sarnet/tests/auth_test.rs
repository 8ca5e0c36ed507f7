use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::json;

mod common;
use common::{TestApp, PASSWORD};

#[tokio::test]
async fn test_registration_returns_tokens_and_user() {
    let app = TestApp::new().await;

    let (status, body) = app
        .json(
            "POST",
            "/api/auth/registration/",
            None,
            json!({
                "email": "analyst@example.com",
                "password1": PASSWORD,
                "password2": PASSWORD,
                "first_name": "Ana",
            }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(body["access"].as_str().is_some());
    assert!(body["refresh"].as_str().is_some());
    assert_eq!(body["user"]["email"], "analyst@example.com");
    assert_eq!(body["user"]["username"], "analyst");
    assert_eq!(body["user"]["first_name"], "Ana");
    assert!(
        body["user"].get("password_hash").is_none(),
        "password hash must never be serialized"
    );
}

#[tokio::test]
async fn test_derived_usernames_get_numeric_suffix() {
    let app = TestApp::new().await;

    app.register("sam@one.example").await;
    let (token, _) = app.register("sam@two.example").await;

    let (status, body) = app.get("/api/auth/user/", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "sam1");
}

#[tokio::test]
async fn test_registration_rejects_mismatched_passwords() {
    let app = TestApp::new().await;

    let (status, body) = app
        .json(
            "POST",
            "/api/auth/registration/",
            None,
            json!({
                "email": "x@example.com",
                "password1": PASSWORD,
                "password2": "something-else",
            }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_request");
    assert_eq!(body["error"], "The two password fields didn't match");
}

#[tokio::test]
async fn test_registration_rejects_duplicate_email_and_bad_fields() {
    let app = TestApp::new().await;
    app.register("dup@example.com").await;

    let (status, _) = app
        .json(
            "POST",
            "/api/auth/registration/",
            None,
            json!({"email": "dup@example.com", "password1": PASSWORD, "password2": PASSWORD}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .json(
            "POST",
            "/api/auth/registration/",
            None,
            json!({"email": "not-an-email", "password1": "short", "password2": "short"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["email"].is_array());
    assert!(body["fields"]["password1"].is_array());
}

#[tokio::test]
async fn test_token_obtain_by_email_and_by_username() {
    let app = TestApp::new().await;
    app.register("radar@example.com").await;

    for identifier in ["radar@example.com", "radar"] {
        let (status, body) = app
            .json(
                "POST",
                "/api/token/",
                None,
                json!({"email": identifier, "password": PASSWORD}),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login with {identifier}: {body}");
        let access = body["access"].as_str().unwrap();

        let (status, me) = app.get("/api/users/me/", Some(access)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["email"], "radar@example.com");
    }
}

#[tokio::test]
async fn test_login_failures() {
    let app = TestApp::new().await;
    app.register("who@example.com").await;

    let (status, body) = app
        .json(
            "POST",
            "/api/auth/login/",
            None,
            json!({"email": "who@example.com", "password": "wrong-password"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthorized");

    let (status, _) = app
        .json("POST", "/api/auth/login/", None, json!({"email": "who@example.com"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_refresh_and_verify() {
    let app = TestApp::new().await;
    app.register("tok@example.com").await;

    let (_, pair) = app
        .json(
            "POST",
            "/api/token/",
            None,
            json!({"email": "tok@example.com", "password": PASSWORD}),
        )
        .await;
    let refresh = pair["refresh"].as_str().unwrap();
    let access = pair["access"].as_str().unwrap();

    let (status, body) = app
        .json("POST", "/api/token/refresh/", None, json!({"refresh": refresh}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["access"].as_str().is_some());

    // An access token is not a refresh token.
    let (status, _) = app
        .json("POST", "/api/token/refresh/", None, json!({"refresh": access}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .json("POST", "/api/token/verify/", None, json!({"token": access}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));

    let (status, _) = app
        .json("POST", "/api/token/verify/", None, json!({"token": "garbage"}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_routes_require_bearer_token() {
    let app = TestApp::new().await;

    for uri in ["/api/sessions/", "/api/notifications/", "/api/users/me/"] {
        let (status, body) = app.get(uri, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(body["code"], "unauthorized");
    }

    let (status, _) = app.get("/api/sessions/", Some("not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_users_only_see_themselves() {
    let app = TestApp::new().await;
    let (alice, alice_id) = app.register("alice@example.com").await;
    let (_, bob_id) = app.register("bob@example.com").await;

    let (status, body) = app.get("/api/users/", Some(&alice)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["id"], alice_id);

    let (status, _) = app
        .get(&format!("/api/users/{bob_id}/"), Some(&alice))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_profile_rehashes_password() {
    let app = TestApp::new().await;
    let (token, _) = app.register("pw@example.com").await;

    let (status, body) = app
        .json(
            "PATCH",
            "/api/users/update_profile/",
            Some(&token),
            json!({"last_name": "Rivera", "password": "a-brand-new-password"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["last_name"], "Rivera");

    let (status, _) = app
        .json(
            "POST",
            "/api/token/",
            None,
            json!({"email": "pw@example.com", "password": PASSWORD}),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .json(
            "POST",
            "/api/token/",
            None,
            json!({"email": "pw@example.com", "password": "a-brand-new-password"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_email_change_cannot_claim_another_account() {
    let app = TestApp::new().await;
    app.register("alice@example.com").await;
    let (bob, _) = app.register("bob@example.com").await;

    let (status, body) = app
        .json(
            "PATCH",
            "/api/users/me/",
            Some(&bob),
            json!({"email": "ALICE@example.com"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "A user is already registered with this e-mail address"
    );

    let (status, body) = app
        .json(
            "POST",
            "/api/token/",
            None,
            json!({"email": "alice@example.com", "password": PASSWORD}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    // Re-casing your own address is not a conflict.
    let (status, body) = app
        .json(
            "PATCH",
            "/api/users/me/",
            Some(&bob),
            json!({"email": "Bob@example.com"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["email"], "Bob@example.com");
}

#[tokio::test]
async fn test_superuser_sees_every_user() {
    let app = TestApp::new().await;
    let (admin, admin_id) = app.register("admin@example.com").await;
    let (regular, regular_id) = app.register("regular@example.com").await;
    app.promote_to_superuser(admin_id).await;

    let (status, body) = app.get("/api/users/", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);

    let (status, body) = app
        .get(&format!("/api/users/{regular_id}/"), Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "regular@example.com");

    let (status, body) = app.get("/api/users/", Some(&regular)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);

    let (status, _) = app
        .get(&format!("/api/users/{admin_id}/"), Some(&regular))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
