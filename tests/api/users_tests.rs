//! User management tests.

use actix_web::test;
use serde_json::json;

use super::helpers::*;

#[actix_rt::test]
async fn test_admin_creates_user() {
    let ctx = setup().await;
    let admin = seed_user(&ctx, "root", true).await;
    let app = create_test_app(&ctx).await;

    let req = test::TestRequest::post()
        .uri("/api/users")
        .insert_header(bearer(&ctx, &admin))
        .set_json(json!({
            "username": "bob",
            "email": "bob@example.com",
            "password": "pw",
        }))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, 201, "{}", body);
    assert_eq!(body["username"], "bob");
    assert_eq!(body["is_admin"], false);
    assert_eq!(body["is_active"], true);
    assert!(body.get("password_hash").is_none());
    assert!(body.get("password").is_none());
}

#[actix_rt::test]
async fn test_create_user_requires_all_fields() {
    let ctx = setup().await;
    let admin = seed_user(&ctx, "root", true).await;
    let app = create_test_app(&ctx).await;

    let req = test::TestRequest::post()
        .uri("/api/users")
        .insert_header(bearer(&ctx, &admin))
        .set_json(json!({ "username": "bob", "email": "  " }))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Missing required fields");
}

#[actix_rt::test]
async fn test_duplicate_username_or_email_rejected_without_insert() {
    let ctx = setup().await;
    let admin = seed_user(&ctx, "root", true).await;
    seed_user(&ctx, "alice", false).await;
    let app = create_test_app(&ctx).await;

    for body in [
        json!({ "username": "ALICE", "email": "other@example.com", "password": "pw" }),
        json!({ "username": "someone", "email": "Alice@Example.COM", "password": "pw" }),
    ] {
        let req = test::TestRequest::post()
            .uri("/api/users")
            .insert_header(bearer(&ctx, &admin))
            .set_json(body)
            .to_request();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, 409, "{}", body);
        assert_eq!(body["error"], "Username or email already registered");
    }

    let req = test::TestRequest::get()
        .uri("/api/users")
        .insert_header(bearer(&ctx, &admin))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, 200);
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[actix_rt::test]
async fn test_list_users_is_admin_only_and_hides_hashes() {
    let ctx = setup().await;
    let admin = seed_user(&ctx, "root", true).await;
    let alice = seed_user(&ctx, "alice", false).await;
    let app = create_test_app(&ctx).await;

    let req = test::TestRequest::get()
        .uri("/api/users")
        .insert_header(bearer(&ctx, &alice))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, 403);

    let req = test::TestRequest::get()
        .uri("/api/users")
        .insert_header(bearer(&ctx, &admin))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, 200);

    let users = body.as_array().unwrap();
    assert_eq!(users[0]["username"], "root");
    assert_eq!(users[1]["username"], "alice");
    for user in users {
        assert!(user.get("password_hash").is_none());
    }
}

#[actix_rt::test]
async fn test_get_missing_user_returns_not_found() {
    let ctx = setup().await;
    let admin = seed_user(&ctx, "root", true).await;
    let app = create_test_app(&ctx).await;

    let req = test::TestRequest::get()
        .uri("/api/users/999")
        .insert_header(bearer(&ctx, &admin))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "User not found");
}

#[actix_rt::test]
async fn test_non_admin_reads_only_self() {
    let ctx = setup().await;
    let alice = seed_user(&ctx, "alice", false).await;
    let bob = seed_user(&ctx, "bob", false).await;
    let app = create_test_app(&ctx).await;

    let req = test::TestRequest::get()
        .uri(&format!("/api/users/{}", alice.id))
        .insert_header(bearer(&ctx, &alice))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, 200);

    let req = test::TestRequest::get()
        .uri(&format!("/api/users/{}", bob.id))
        .insert_header(bearer(&ctx, &alice))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, 403);
    assert_eq!(body["code"], "FORBIDDEN");

    let req = test::TestRequest::get()
        .uri("/api/users/me")
        .insert_header(bearer(&ctx, &bob))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, 200);
    assert_eq!(body["id"], bob.id);
}

#[actix_rt::test]
async fn test_invalid_path_parameter_is_bad_request() {
    let ctx = setup().await;
    let admin = seed_user(&ctx, "root", true).await;
    let app = create_test_app(&ctx).await;

    let req = test::TestRequest::get()
        .uri("/api/users/not-a-number")
        .insert_header(bearer(&ctx, &admin))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "INVALID_INPUT");
}

#[actix_rt::test]
async fn test_empty_update_leaves_user_unchanged() {
    let ctx = setup().await;
    let alice = seed_user(&ctx, "alice", false).await;
    let app = create_test_app(&ctx).await;

    let req = test::TestRequest::get()
        .uri(&format!("/api/users/{}", alice.id))
        .insert_header(bearer(&ctx, &alice))
        .to_request();
    let (_, before) = send(&app, req).await;

    let req = test::TestRequest::put()
        .uri(&format!("/api/users/{}", alice.id))
        .insert_header(bearer(&ctx, &alice))
        .set_json(json!({}))
        .to_request();
    let (status, after) = send(&app, req).await;
    assert_eq!(status, 200);
    assert_eq!(before, after);
    assert_eq!(after["username"], "alice");
    assert_eq!(after["is_admin"], false);

    // Password untouched: the old one still works
    let req = test::TestRequest::post()
        .uri("/api/auth/token")
        .set_json(json!({ "identifier": "alice", "password": TEST_PASSWORD }))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, 200);
}

#[actix_rt::test]
async fn test_update_changes_password_and_email() {
    let ctx = setup().await;
    let alice = seed_user(&ctx, "alice", false).await;
    let app = create_test_app(&ctx).await;

    let req = test::TestRequest::put()
        .uri(&format!("/api/users/{}", alice.id))
        .insert_header(bearer(&ctx, &alice))
        .set_json(json!({ "email": "alice@new.example", "password": "new-pw", "username": "" }))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["email"], "alice@new.example");
    assert_eq!(body["username"], "alice");

    let req = test::TestRequest::post()
        .uri("/api/auth/token")
        .set_json(json!({ "identifier": "alice", "password": TEST_PASSWORD }))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, 401);

    let req = test::TestRequest::post()
        .uri("/api/auth/token")
        .set_json(json!({ "identifier": "alice@new.example", "password": "new-pw" }))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, 200);
}

#[actix_rt::test]
async fn test_update_rechecks_uniqueness() {
    let ctx = setup().await;
    let alice = seed_user(&ctx, "alice", false).await;
    seed_user(&ctx, "bob", false).await;
    let app = create_test_app(&ctx).await;

    let req = test::TestRequest::put()
        .uri(&format!("/api/users/{}", alice.id))
        .insert_header(bearer(&ctx, &alice))
        .set_json(json!({ "username": "Bob" }))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, 409);

    // Re-submitting your own username is not a conflict
    let req = test::TestRequest::put()
        .uri(&format!("/api/users/{}", alice.id))
        .insert_header(bearer(&ctx, &alice))
        .set_json(json!({ "username": "ALICE" }))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, 200);
    assert_eq!(body["username"], "ALICE");
}

#[actix_rt::test]
async fn test_non_admin_cannot_change_own_role() {
    let ctx = setup().await;
    let alice = seed_user(&ctx, "alice", false).await;
    let app = create_test_app(&ctx).await;

    let req = test::TestRequest::put()
        .uri(&format!("/api/users/{}", alice.id))
        .insert_header(bearer(&ctx, &alice))
        .set_json(json!({ "is_admin": true }))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, 403);
}

#[actix_rt::test]
async fn test_admin_cannot_change_own_flags() {
    let ctx = setup().await;
    let admin = seed_user(&ctx, "root", true).await;
    let app = create_test_app(&ctx).await;

    for body in [
        json!({ "is_admin": false, "is_active": false }),
        json!({ "is_admin": false }),
        json!({ "is_active": false }),
    ] {
        let req = test::TestRequest::put()
            .uri(&format!("/api/users/{}", admin.id))
            .insert_header(bearer(&ctx, &admin))
            .set_json(body)
            .to_request();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, 403, "{}", body);
    }

    let req = test::TestRequest::get()
        .uri("/api/users/me")
        .insert_header(bearer(&ctx, &admin))
        .to_request();
    let (_, body) = send(&app, req).await;
    assert_eq!(body["is_admin"], true);
    assert_eq!(body["is_active"], true);

    // Other fields on the own account are still editable
    let req = test::TestRequest::put()
        .uri(&format!("/api/users/{}", admin.id))
        .insert_header(bearer(&ctx, &admin))
        .set_json(json!({ "email": "root@new.example" }))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, 200);
}

#[actix_rt::test]
async fn test_username_with_at_sign_rejected() {
    let ctx = setup().await;
    let admin = seed_user(&ctx, "root", true).await;
    let alice = seed_user(&ctx, "alice", false).await;
    let app = create_test_app(&ctx).await;

    let req = test::TestRequest::post()
        .uri("/api/users")
        .insert_header(bearer(&ctx, &admin))
        .set_json(json!({
            "username": "alice@example.com",
            "email": "impostor@example.com",
            "password": "pw",
        }))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, 400, "{}", body);

    let req = test::TestRequest::put()
        .uri(&format!("/api/users/{}", admin.id))
        .insert_header(bearer(&ctx, &admin))
        .set_json(json!({ "username": "alice@example.com" }))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, 400);

    // Signing in with alice's email still reaches alice
    let req = test::TestRequest::post()
        .uri("/api/auth/token")
        .set_json(json!({ "identifier": "alice@example.com", "password": TEST_PASSWORD }))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, 200);
    assert_eq!(body["user"]["id"], alice.id);
}

#[actix_rt::test]
async fn test_delete_user_then_get_returns_not_found() {
    let ctx = setup().await;
    let admin = seed_user(&ctx, "root", true).await;
    let alice = seed_user(&ctx, "alice", false).await;
    let app = create_test_app(&ctx).await;

    let req = test::TestRequest::delete()
        .uri(&format!("/api/users/{}", alice.id))
        .insert_header(bearer(&ctx, &admin))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 204);
    let body = test::read_body(resp).await;
    assert!(body.is_empty());

    let req = test::TestRequest::get()
        .uri(&format!("/api/users/{}", alice.id))
        .insert_header(bearer(&ctx, &admin))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, 404);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/users/{}", alice.id))
        .insert_header(bearer(&ctx, &admin))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, 404);
}

#[actix_rt::test]
async fn test_admin_cannot_delete_self_and_users_cannot_delete() {
    let ctx = setup().await;
    let admin = seed_user(&ctx, "root", true).await;
    let alice = seed_user(&ctx, "alice", false).await;
    let app = create_test_app(&ctx).await;

    let req = test::TestRequest::delete()
        .uri(&format!("/api/users/{}", admin.id))
        .insert_header(bearer(&ctx, &admin))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, 403);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/users/{}", admin.id))
        .insert_header(bearer(&ctx, &alice))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, 403);
}
