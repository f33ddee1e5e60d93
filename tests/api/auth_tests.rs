//! Sign-in, session and sign-up tests.

use actix_web::http::header;
use actix_web::test;
use serde_json::json;

use detection_gateway_lib::auth::SessionKeys;
use detection_gateway_lib::models::NewUser;
use detection_gateway_lib::services::users;
use detection_gateway_lib::config::SESSION_COOKIE;
use secrecy::SecretString;

use super::helpers::*;

#[actix_rt::test]
async fn test_sign_in_with_username_returns_token_and_cookie() {
    let ctx = setup().await;
    let alice = seed_user(&ctx, "alice", false).await;
    let app = create_test_app(&ctx).await;

    let req = test::TestRequest::post()
        .uri("/api/auth/token")
        .set_json(json!({ "identifier": "alice", "password": TEST_PASSWORD }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let cookie = resp
        .response()
        .cookies()
        .find(|c| c.name() == SESSION_COOKIE)
        .expect("session cookie set");
    assert!(cookie.http_only().unwrap_or(false));
    assert!(!cookie.value().is_empty());

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["user"]["id"], alice.id);
    assert!(body["user"].get("password_hash").is_none());

    let claims = ctx.keys.verify(body["access_token"].as_str().unwrap()).unwrap();
    assert_eq!(claims.user_id, alice.id);
    assert!(!claims.is_admin);
}

#[actix_rt::test]
async fn test_sign_in_with_email_is_case_insensitive() {
    let ctx = setup().await;
    seed_user(&ctx, "alice", false).await;
    let app = create_test_app(&ctx).await;

    let req = test::TestRequest::post()
        .uri("/api/auth/token")
        .set_json(json!({ "email": "ALICE@Example.com", "password": TEST_PASSWORD }))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["user"]["username"], "alice");
}

#[actix_rt::test]
async fn test_sign_in_accepts_form_body() {
    let ctx = setup().await;
    seed_user(&ctx, "alice", false).await;
    let app = create_test_app(&ctx).await;

    let req = test::TestRequest::post()
        .uri("/api/auth/token")
        .set_form([("username", "alice"), ("password", TEST_PASSWORD)])
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, 200, "{}", body);
    assert!(body["access_token"].is_string());
}

#[actix_rt::test]
async fn test_sign_in_failures_are_indistinguishable() {
    let ctx = setup().await;
    seed_user(&ctx, "alice", false).await;
    let app = create_test_app(&ctx).await;

    let wrong_password = test::TestRequest::post()
        .uri("/api/auth/token")
        .set_json(json!({ "identifier": "alice", "password": "nope" }))
        .to_request();
    let (status_a, body_a) = send(&app, wrong_password).await;

    let unknown_user = test::TestRequest::post()
        .uri("/api/auth/token")
        .set_json(json!({ "identifier": "mallory", "password": "nope" }))
        .to_request();
    let (status_b, body_b) = send(&app, unknown_user).await;

    assert_eq!(status_a, 401);
    assert_eq!(status_b, 401);
    assert_eq!(body_a, body_b);
    assert_eq!(body_a["error"], "Invalid credentials");
}

#[actix_rt::test]
async fn test_unknown_identifier_pays_a_hash_round() {
    // A cost high enough that one bcrypt round dwarfs the lookup
    const COST: u32 = 8;
    let ctx = setup().await;
    let new = NewUser {
        username: "alice".to_string(),
        email: "alice@example.com".to_string(),
        password: TEST_PASSWORD.to_string(),
        is_active: true,
        is_admin: false,
    };
    users::create_user(&ctx.pool, new, COST).await.unwrap();

    let started = std::time::Instant::now();
    let known = users::authenticate(&ctx.pool, "alice", "wrong", COST).await;
    let known_elapsed = started.elapsed();

    let started = std::time::Instant::now();
    let unknown = users::authenticate(&ctx.pool, "mallory", "wrong", COST).await;
    let unknown_elapsed = started.elapsed();

    assert!(known.is_err());
    assert!(unknown.is_err());
    assert!(
        unknown_elapsed * 4 >= known_elapsed,
        "miss took {:?}, wrong password took {:?}",
        unknown_elapsed,
        known_elapsed
    );
}

#[actix_rt::test]
async fn test_inactive_account_cannot_sign_in() {
    let ctx = setup().await;
    let admin = seed_user(&ctx, "root", true).await;
    let alice = seed_user(&ctx, "alice", false).await;
    let app = create_test_app(&ctx).await;

    let req = test::TestRequest::put()
        .uri(&format!("/api/users/{}", alice.id))
        .insert_header(bearer(&ctx, &admin))
        .set_json(json!({ "is_active": false }))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, 200);

    let req = test::TestRequest::post()
        .uri("/api/auth/token")
        .set_json(json!({ "identifier": "alice", "password": TEST_PASSWORD }))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, 401);
    assert_eq!(body["error"], "Invalid credentials");
}

#[actix_rt::test]
async fn test_me_accepts_bearer_and_cookie() {
    let ctx = setup().await;
    let alice = seed_user(&ctx, "alice", false).await;
    let app = create_test_app(&ctx).await;

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(bearer(&ctx, &alice))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, 200);
    assert_eq!(body["username"], "alice");

    let token = ctx.keys.issue(&alice).unwrap();
    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .cookie(actix_web::cookie::Cookie::new(SESSION_COOKIE, token))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, 200);
    assert_eq!(body["id"], alice.id);
}

#[actix_rt::test]
async fn test_missing_or_forged_session_is_rejected() {
    let ctx = setup().await;
    let alice = seed_user(&ctx, "alice", false).await;
    let app = create_test_app(&ctx).await;

    let req = test::TestRequest::get().uri("/api/auth/me").to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, 401);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let forged = SessionKeys::new(SecretString::from("some-other-secret"), 3600)
        .issue(&alice)
        .unwrap();
    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header((header::AUTHORIZATION, format!("Bearer {}", forged)))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, 401);
}

#[actix_rt::test]
async fn test_me_after_account_deleted() {
    let ctx = setup().await;
    let admin = seed_user(&ctx, "root", true).await;
    let alice = seed_user(&ctx, "alice", false).await;
    let app = create_test_app(&ctx).await;
    let alice_auth = bearer(&ctx, &alice);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/users/{}", alice.id))
        .insert_header(bearer(&ctx, &admin))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, 204);

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(alice_auth)
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, 401);
}

#[actix_rt::test]
async fn test_logout_clears_cookie() {
    let ctx = setup().await;
    let app = create_test_app(&ctx).await;

    let req = test::TestRequest::post().uri("/api/auth/logout").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let cookie = resp
        .response()
        .cookies()
        .find(|c| c.name() == SESSION_COOKIE)
        .expect("removal cookie set");
    assert!(cookie.value().is_empty());
    assert_eq!(
        cookie.max_age(),
        Some(actix_web::cookie::time::Duration::ZERO)
    );
}

#[actix_rt::test]
async fn test_signup_disabled_by_default() {
    let ctx = setup().await;
    let app = create_test_app(&ctx).await;

    let req = test::TestRequest::post()
        .uri("/api/auth/signup")
        .set_json(json!({
            "username": "newbie",
            "email": "newbie@example.com",
            "password": "pw",
        }))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, 403);
}

#[actix_rt::test]
async fn test_signup_creates_plain_user() {
    let ctx = setup_with(test_config("http://127.0.0.1:9", true)).await;
    let app = create_test_app(&ctx).await;

    let req = test::TestRequest::post()
        .uri("/api/auth/signup")
        .set_json(json!({
            "username": "newbie",
            "email": "newbie@example.com",
            "password": "pw",
            "is_admin": true,
        }))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, 201, "{}", body);
    assert_eq!(body["is_admin"], false);
    assert_eq!(body["is_active"], true);

    let req = test::TestRequest::post()
        .uri("/api/auth/token")
        .set_json(json!({ "identifier": "newbie", "password": "pw" }))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, 200);
}
