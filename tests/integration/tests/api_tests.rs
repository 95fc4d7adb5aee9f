//! API Integration Tests
//!
//! These tests require:
//! - Running PostgreSQL instance
//! - Running Redis instance
//! - Environment variables: DATABASE_URL, REDIS_URL, JWT_SECRET
//!
//! Run with: cargo test -p integration-tests --test api_tests

use chrono::{Months, NaiveDate, Utc};
use integration_tests::{assert_json, assert_status, check_test_env, fixtures::*, TestServer};
use reqwest::StatusCode;
use serde_json::{json, Value};

fn ids(results: &Value) -> Vec<String> {
    results
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item["id"].as_str().map(ToString::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn years_ago(years: u32) -> NaiveDate {
    let today = Utc::now().date_naive();
    today.checked_sub_months(Months::new(years * 12)).unwrap()
}

/// Admin with a photo, so their posts skip moderation
async fn register_visible_author(server: &TestServer) -> TestUser {
    let author = TestUser::register(server, "Author").await.unwrap();
    server.make_admin(&author.id).await.unwrap();
    server
        .post_auth(
            "/users/current/photos",
            &author.token,
            &json!({ "image_url": "https://img.example.com/author.jpg" }),
        )
        .await
        .unwrap();
    author
}

async fn create_feed_post(server: &TestServer, author: &TestUser, text: &str) -> String {
    let question = server.seed_poll_question("Weekend plans?", false).await.unwrap();
    let response = server
        .post_auth(
            &format!("/poll_questions/{question}/posts"),
            &author.token,
            &post_body_ignoring_limit(text),
        )
        .await
        .unwrap();
    let post: Value = assert_json(response, StatusCode::OK).await.unwrap();
    post["id"].as_str().unwrap().to_string()
}

async fn feed_ids(server: &TestServer, viewer: &TestUser, query: &str) -> Vec<String> {
    let response = server
        .get_auth(&format!("/posts/feed?max=500{query}"), &viewer.token)
        .await
        .unwrap();
    let feed: Value = assert_json(response, StatusCode::OK).await.unwrap();
    ids(&feed["results"])
}

// ============================================================================
// Health Check Tests
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let response = server.get("/health").await.expect("Request failed");
    let body: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_health_ready() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let response = server.get("/health/ready").await.expect("Request failed");
    let body: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(body["checks"]["database"], true);
    assert_eq!(body["checks"]["redis"], true);
}

// ============================================================================
// Token Tests
// ============================================================================

#[tokio::test]
async fn test_register_user() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let request = RegisterRequest::unique("Ann");

    let response = server.post("/users", &request).await.unwrap();
    let auth: AuthResponse = assert_json(response, StatusCode::CREATED).await.unwrap();

    assert_eq!(auth.user.first_name, "Ann");
    assert_eq!(auth.user.email.as_deref(), Some(request.email.as_str()));
    assert!(!auth.access_token.is_empty());
    assert!(!auth.refresh_token.is_empty());
    assert!(!auth.expires_on.is_empty());
}

#[tokio::test]
async fn test_register_duplicate_email() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let user = TestUser::register(&server, "Ann").await.unwrap();

    let response = server.post("/users", &user.registration).await.unwrap();
    assert_status(response, StatusCode::CONFLICT).await.unwrap();
}

#[tokio::test]
async fn test_register_short_password() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let mut request = RegisterRequest::unique("Ann");
    request.password = "123".to_string();

    let response = server.post("/users", &request).await.unwrap();
    let body: Value = assert_json(response, StatusCode::BAD_REQUEST).await.unwrap();
    assert_eq!(body["error"], "Password must be between 6 and 40 characters");
}

#[tokio::test]
async fn test_login() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let user = TestUser::register(&server, "Ann").await.unwrap();

    let response = server
        .post("/tokens/login", &LoginRequest::from_register(&user.registration))
        .await
        .unwrap();
    let auth: AuthResponse = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(auth.user.id, user.id);
}

#[tokio::test]
async fn test_login_wrong_password() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let user = TestUser::register(&server, "Ann").await.unwrap();

    let mut login = LoginRequest::from_register(&user.registration);
    login.password = "not-the-password".to_string();

    let response = server.post("/tokens/login", &login).await.unwrap();
    let body: Value = assert_json(response, StatusCode::UNAUTHORIZED).await.unwrap();
    assert_eq!(body["error"], "unauthorized");
    assert_eq!(body["message"], "Incorrect username/password");
}

#[tokio::test]
async fn test_refresh_rotates_token() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let user = TestUser::register(&server, "Ann").await.unwrap();

    let response = server
        .post("/tokens/refresh", &json!({ "refresh_token": user.refresh_token }))
        .await
        .unwrap();
    let body: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_ne!(body["refresh_token"].as_str(), Some(user.refresh_token.as_str()));

    // The old token is gone after rotation
    let response = server
        .post("/tokens/refresh", &json!({ "refresh_token": user.refresh_token }))
        .await
        .unwrap();
    let body: Value = assert_json(response, StatusCode::BAD_REQUEST).await.unwrap();
    assert_eq!(body["error"], "invalid_refresh_token");
}

#[tokio::test]
async fn test_logout_clears_refresh_token() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let user = TestUser::register(&server, "Ann").await.unwrap();

    let response = server.delete_auth("/tokens", &user.token).await.unwrap();
    let body: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(body["result"], "success");

    let response = server
        .post("/tokens/refresh", &json!({ "refresh_token": user.refresh_token }))
        .await
        .unwrap();
    assert_status(response, StatusCode::BAD_REQUEST).await.unwrap();
}

#[tokio::test]
async fn test_external_auth_unknown_provider() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let response = server
        .post(
            "/tokens/external_auth",
            &json!({ "token": { "provider": "myspace", "provider_id": "1" } }),
        )
        .await
        .unwrap();
    assert_status(response, StatusCode::BAD_REQUEST).await.unwrap();
}

#[tokio::test]
async fn test_external_auth_snapchat_creates_user() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let provider_id = format!("snap-{}", uuid::Uuid::new_v4());
    let device_id = uuid::Uuid::new_v4().to_string();
    let body = json!({
        "token": { "provider": "snapchat", "provider_id": provider_id },
        "device_id": device_id,
    });

    let response = server.post("/tokens/external_auth", &body).await.unwrap();
    let first: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(first["provider"], "snapchat");
    assert_eq!(first["user"]["is_new"], true);
    assert_eq!(first["user"]["seconds_until_post_allowed"], 0);
    assert!(first["refresh_by"].is_null());

    let response = server.post("/tokens/external_auth", &body).await.unwrap();
    let second: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(second["user_id"], first["user_id"]);
    assert_eq!(second["user"]["is_new"], false);
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let response = server.get("/users/current").await.unwrap();
    let body: Value = assert_json(response, StatusCode::UNAUTHORIZED).await.unwrap();
    assert_eq!(body["error"], "unauthorized");

    let response = server.get_auth("/users/current", "garbage").await.unwrap();
    assert_status(response, StatusCode::UNAUTHORIZED).await.unwrap();
}

// ============================================================================
// User, Friendship and Block Tests
// ============================================================================

#[tokio::test]
async fn test_current_user_and_other_user() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let ann = TestUser::register(&server, "Ann").await.unwrap();
    let bo = TestUser::register(&server, "Bo").await.unwrap();

    let response = server.get_auth("/users/current", &ann.token).await.unwrap();
    let me: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(me["id"], ann.id.as_str());
    assert_eq!(me["email"], ann.registration.email.as_str());
    assert!(me.get("password_hash").is_none());

    let response = server
        .get_auth(&format!("/users/{}", bo.id), &ann.token)
        .await
        .unwrap();
    let other: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(other["is_friend"], false);
    assert_eq!(other["is_a_friend"], "no");
    assert!(other.get("email").is_none());
}

#[tokio::test]
async fn test_update_current_user() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let ann = TestUser::register(&server, "Ann").await.unwrap();

    let response = server
        .put_auth(
            "/users/current",
            &ann.token,
            &json!({ "first_name": "Annie", "gender": "female" }),
        )
        .await
        .unwrap();
    let me: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(me["first_name"], "Annie");
    assert_eq!(me["gender"], "female");

    let response = server
        .put_auth("/users/current", &ann.token, &json!({ "latitude": 120.0 }))
        .await
        .unwrap();
    assert_status(response, StatusCode::BAD_REQUEST).await.unwrap();
}

#[tokio::test]
async fn test_friend_request_and_accept() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let ann = TestUser::register(&server, "Ann").await.unwrap();
    let bo = TestUser::register(&server, "Bo").await.unwrap();

    let response = server
        .post_auth(&format!("/users/{}/friends", bo.id), &ann.token, &json!({}))
        .await
        .unwrap();
    let pending: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(pending["id"], bo.id.as_str());
    assert_eq!(pending["is_a_friend"], "pending");

    let response = server
        .post_auth(&format!("/users/{}/friends", ann.id), &bo.token, &json!({}))
        .await
        .unwrap();
    let accepted: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(accepted["is_a_friend"], "yes");
    assert_eq!(accepted["is_friend"], true);

    let response = server.get_auth("/users/current/friends", &ann.token).await.unwrap();
    let friends: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert!(ids(&friends["results"]).contains(&bo.id));
}

#[tokio::test]
async fn test_unfriend() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let ann = TestUser::register(&server, "Ann").await.unwrap();
    let bo = TestUser::register(&server, "Bo").await.unwrap();
    let path = format!("/users/{}/friends", bo.id);

    server.post_auth(&path, &ann.token, &json!({})).await.unwrap();

    let response = server.delete_auth(&path, &ann.token).await.unwrap();
    let body: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(body["result"], "success");

    // Nothing left to remove
    let response = server.delete_auth(&path, &ann.token).await.unwrap();
    assert_status(response, StatusCode::FORBIDDEN).await.unwrap();
}

#[tokio::test]
async fn test_block_ends_friendship_and_messages() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let ann = TestUser::register(&server, "Ann").await.unwrap();
    let bo = TestUser::register(&server, "Bo").await.unwrap();

    server
        .post_auth(&format!("/users/{}/friends", bo.id), &ann.token, &json!({}))
        .await
        .unwrap();

    let response = server
        .post_auth(&format!("/users/{}/user_blocks", bo.id), &ann.token, &json!({}))
        .await
        .unwrap();
    let body: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(body["result"], "success");

    let response = server
        .get_auth(&format!("/users/{}", bo.id), &ann.token)
        .await
        .unwrap();
    let other: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(other["is_a_friend"], "no");

    let response = server
        .post_auth("/messages", &bo.token, &message_body(&ann.id, "hello?"))
        .await
        .unwrap();
    assert_status(response, StatusCode::FORBIDDEN).await.unwrap();
}

// ============================================================================
// Photo Tests
// ============================================================================

#[tokio::test]
async fn test_photo_moderation_releases_pending_posts() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let admin = TestUser::register(&server, "Admin").await.unwrap();
    server.make_admin(&admin.id).await.unwrap();
    let ann = TestUser::register(&server, "Ann").await.unwrap();
    let question = server.seed_poll_question("Favorite city?", false).await.unwrap();

    let response = server
        .post_auth(
            "/users/current/photos",
            &ann.token,
            &json!({ "image_url": "https://img.example.com/ann.jpg" }),
        )
        .await
        .unwrap();
    let photo: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(photo["needs_moderation"], true);
    let photo_id = photo["id"].as_str().unwrap().to_string();

    let response = server
        .post_auth(
            &format!("/poll_questions/{question}/posts"),
            &ann.token,
            &post_body("Lisbon"),
        )
        .await
        .unwrap();
    let post: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(post["needs_moderation"], true);
    assert_eq!(post["moderated"], false);
    let post_id = post["id"].as_str().unwrap().to_string();

    // Regular users cannot moderate
    let response = server
        .post_auth("/mod/user_photos", &ann.token, &json!({ "moderated": [photo_id] }))
        .await
        .unwrap();
    assert_status(response, StatusCode::FORBIDDEN).await.unwrap();

    let response = server
        .post_auth("/mod/user_photos", &admin.token, &json!({ "moderated": [photo_id] }))
        .await
        .unwrap();
    assert_status(response, StatusCode::OK).await.unwrap();

    let response = server
        .get_auth(&format!("/posts/{post_id}"), &ann.token)
        .await
        .unwrap();
    let shown: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(shown["result"]["moderated"], true);
}

// ============================================================================
// Post Tests
// ============================================================================

#[tokio::test]
async fn test_create_post() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let ann = TestUser::register(&server, "Ann").await.unwrap();
    let question = server.seed_poll_question("Best pizza topping?", false).await.unwrap();

    let response = server
        .post_auth(
            &format!("/poll_questions/{question}/posts"),
            &ann.token,
            &post_body("  Pineapple  "),
        )
        .await
        .unwrap();
    let post: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(post["response_text"], "Pineapple");
    assert_eq!(post["mood"], "friendly");
    assert_eq!(post["user_id"], ann.id.as_str());
    assert!(post.get("dob").is_none());
    assert!(post.get("external_image_url").is_none());
}

#[tokio::test]
async fn test_create_post_through_flat_route() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let ann = TestUser::register(&server, "Ann").await.unwrap();
    let question = server.seed_poll_question("Dream job?", false).await.unwrap();

    let body = json!({ "post": { "response_text": "Astronaut", "mood": "flirty" }, "poll_question_id": question });
    let response = server.post_auth("/posts", &ann.token, &body).await.unwrap();
    let post: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(post["poll_question_id"], question.as_str());
    assert_eq!(post["mood"], "flirty");
}

#[tokio::test]
async fn test_post_limit_and_duplicate_answer() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let ann = TestUser::register(&server, "Ann").await.unwrap();
    let first = server.seed_poll_question("Morning or night?", false).await.unwrap();
    let second = server.seed_poll_question("Cats or dogs?", false).await.unwrap();

    let response = server
        .post_auth(&format!("/poll_questions/{first}/posts"), &ann.token, &post_body("Night"))
        .await
        .unwrap();
    assert_status(response, StatusCode::OK).await.unwrap();

    let response = server
        .post_auth(&format!("/poll_questions/{second}/posts"), &ann.token, &post_body("Cats"))
        .await
        .unwrap();
    let limited: Value = assert_json(response, StatusCode::FORBIDDEN).await.unwrap();
    assert_eq!(limited["exceeded_post_limit"], true);
    assert!(limited["error"]
        .as_str()
        .unwrap()
        .starts_with("You are not allowed to post for"));

    let response = server
        .post_auth(
            &format!("/poll_questions/{first}/posts"),
            &ann.token,
            &post_body_ignoring_limit("Morning"),
        )
        .await
        .unwrap();
    let duplicate: Value = assert_json(response, StatusCode::NOT_FOUND).await.unwrap();
    assert_eq!(duplicate["success"], false);
    assert_eq!(duplicate["error"], "You've already posted this icebreaker before");
}

#[tokio::test]
async fn test_intro_post_does_not_start_interval() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let ann = TestUser::register(&server, "Ann").await.unwrap();
    let intro = server.seed_poll_question("Introduce yourself", true).await.unwrap();

    let response = server
        .post_auth(&format!("/poll_questions/{intro}/posts"), &ann.token, &post_body("Hi!"))
        .await
        .unwrap();
    assert_status(response, StatusCode::OK).await.unwrap();

    let response = server.get_auth("/users/current", &ann.token).await.unwrap();
    let me: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(me["seconds_until_post_allowed"], 0);
}

#[tokio::test]
async fn test_show_missing_post() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let ann = TestUser::register(&server, "Ann").await.unwrap();

    let response = server.get_auth("/posts/12345", &ann.token).await.unwrap();
    let body: Value = assert_json(response, StatusCode::NOT_FOUND).await.unwrap();
    assert_eq!(body["error"], "This post has been removed");
}

#[tokio::test]
async fn test_post_index_requires_user_for_non_admin() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let ann = TestUser::register(&server, "Ann").await.unwrap();
    let question = server.seed_poll_question("Go-to karaoke song?", false).await.unwrap();
    server
        .post_auth(&format!("/poll_questions/{question}/posts"), &ann.token, &post_body("Africa"))
        .await
        .unwrap();

    let response = server.get_auth("/posts", &ann.token).await.unwrap();
    assert_status(response, StatusCode::FORBIDDEN).await.unwrap();

    let response = server
        .get_auth(&format!("/posts?user_id={}&offset=0", ann.id), &ann.token)
        .await
        .unwrap();
    let page: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(page["results"].as_array().unwrap().len(), 1);
    assert_eq!(page["max"], 10);
    assert_eq!(page["offset"], 0);
    assert_eq!(page["total"], 1);
}

#[tokio::test]
async fn test_update_and_destroy_post_owner_only() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let ann = TestUser::register(&server, "Ann").await.unwrap();
    let bo = TestUser::register(&server, "Bo").await.unwrap();
    let question = server.seed_poll_question("Last concert?", false).await.unwrap();

    let response = server
        .post_auth(&format!("/poll_questions/{question}/posts"), &ann.token, &post_body("Queen"))
        .await
        .unwrap();
    let post: Value = assert_json(response, StatusCode::OK).await.unwrap();
    let path = format!("/posts/{}", post["id"].as_str().unwrap());

    let changes = json!({ "post": { "response_text": "Abba" } });
    let response = server.put_auth(&path, &bo.token, &changes).await.unwrap();
    assert_status(response, StatusCode::FORBIDDEN).await.unwrap();

    let response = server.put_auth(&path, &ann.token, &changes).await.unwrap();
    let updated: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(updated["response_text"], "Abba");

    let response = server.delete_auth(&path, &ann.token).await.unwrap();
    let body: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(body["result"], "success");

    let response = server.get_auth(&path, &ann.token).await.unwrap();
    assert_status(response, StatusCode::NOT_FOUND).await.unwrap();
}

#[tokio::test]
async fn test_flag_and_rate_post() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let ann = TestUser::register(&server, "Ann").await.unwrap();
    let bo = TestUser::register(&server, "Bo").await.unwrap();
    let question = server.seed_poll_question("Weekend plans?", false).await.unwrap();

    let response = server
        .post_auth(&format!("/poll_questions/{question}/posts"), &ann.token, &post_body("Hiking"))
        .await
        .unwrap();
    let post: Value = assert_json(response, StatusCode::OK).await.unwrap();
    let post_id = post["id"].as_str().unwrap().to_string();

    let response = server
        .post_auth(&format!("/posts/{post_id}/ratings"), &bo.token, &json!({ "value": 1 }))
        .await
        .unwrap();
    let rated: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(rated["rating_count"], 1);

    let flag_path = format!("/posts/{post_id}/flag");
    let response = server.post_auth(&flag_path, &bo.token, &json!({})).await.unwrap();
    let flagged: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(flagged["flag_count"], 1);

    // A second flag from the same user does not count
    let response = server.post_auth(&flag_path, &bo.token, &json!({})).await.unwrap();
    let flagged: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(flagged["flag_count"], 1);
}

#[tokio::test]
async fn test_feed_returns_visible_posts() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let admin = TestUser::register(&server, "Admin").await.unwrap();
    server.make_admin(&admin.id).await.unwrap();
    let viewer = TestUser::register(&server, "Viewer").await.unwrap();
    let question = server.seed_poll_question("Favorite season?", false).await.unwrap();

    // Admin photos skip moderation, so the post is visible right away
    server
        .post_auth(
            "/users/current/photos",
            &admin.token,
            &json!({ "image_url": "https://img.example.com/admin.jpg" }),
        )
        .await
        .unwrap();
    let response = server
        .post_auth(&format!("/poll_questions/{question}/posts"), &admin.token, &post_body("Autumn"))
        .await
        .unwrap();
    let post: Value = assert_json(response, StatusCode::OK).await.unwrap();
    let post_id = post["id"].as_str().unwrap().to_string();
    assert_eq!(post["needs_moderation"], false);

    let response = server.get_auth("/posts/feed?max=500", &viewer.token).await.unwrap();
    let feed: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert!(ids(&feed["results"]).contains(&post_id));

    let response = server
        .get_auth(&format!("/posts/feed?max=500&skip={post_id}"), &viewer.token)
        .await
        .unwrap();
    let feed: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert!(!ids(&feed["results"]).contains(&post_id));

    // The poster never sees their own post
    let response = server.get_auth("/posts/feed?max=500", &admin.token).await.unwrap();
    let feed: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert!(!ids(&feed["results"]).contains(&post_id));
}

#[tokio::test]
async fn test_feed_age_band_is_computed_then_stored() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let author = register_visible_author(&server).await;
    let viewer = TestUser::register(&server, "Viewer").await.unwrap();

    // A 25 year old falls in [21, 30) and [25, 35)
    let dob = years_ago(25).checked_sub_months(Months::new(6)).unwrap();
    let response = server
        .put_auth("/users/current", &viewer.token, &json!({ "dob": dob }))
        .await
        .unwrap();
    assert_status(response, StatusCode::OK).await.unwrap();

    let in_band = create_feed_post(&server, &author, "Hiking").await;
    let too_old = create_feed_post(&server, &author, "Gardening").await;
    let no_dob = create_feed_post(&server, &author, "Reading").await;
    server
        .set_post_author_fields(&in_band, "female", Some(years_ago(28)))
        .await
        .unwrap();
    server
        .set_post_author_fields(&too_old, "female", Some(years_ago(40)))
        .await
        .unwrap();

    let feed = feed_ids(&server, &viewer, "").await;
    assert!(feed.contains(&in_band));
    assert!(feed.contains(&no_dob));
    assert!(!feed.contains(&too_old));

    let settings = server.feed_settings(&viewer.id).await.unwrap().expect("settings saved");
    assert_eq!(settings.feed_filter_min, Some(years_ago(21)));
    assert_eq!(settings.feed_filter_max, Some(years_ago(35)));

    // A stored band wins over the computed one
    server
        .set_feed_band(&viewer.id, Some(years_ago(38)), Some(years_ago(50)))
        .await
        .unwrap();
    let feed = feed_ids(&server, &viewer, "").await;
    assert!(feed.contains(&too_old));
    assert!(feed.contains(&no_dob));
    assert!(!feed.contains(&in_band));

    let settings = server.feed_settings(&viewer.id).await.unwrap().unwrap();
    assert_eq!(settings.feed_filter_min, Some(years_ago(38)));
    assert_eq!(settings.feed_filter_max, Some(years_ago(50)));
}

#[tokio::test]
async fn test_feed_gender_filter() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let author = register_visible_author(&server).await;
    let viewer = TestUser::register(&server, "Viewer").await.unwrap();

    let post_id = create_feed_post(&server, &author, "Board games").await;
    server
        .set_post_author_fields(&post_id, "female", None)
        .await
        .unwrap();

    assert!(feed_ids(&server, &viewer, "&gender=female").await.contains(&post_id));
    assert!(!feed_ids(&server, &viewer, "&gender=male").await.contains(&post_id));
    // Anything but male or female is no filter
    assert!(feed_ids(&server, &viewer, "&gender=everyone").await.contains(&post_id));
}

#[tokio::test]
async fn test_feed_nearby_falls_back_only_for_recent() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let author = register_visible_author(&server).await;
    let viewer = TestUser::register(&server, "Viewer").await.unwrap();

    // Somewhere no other post lives
    let spread = (uuid::Uuid::new_v4().as_u128() % 10_000) as f64 / 10_000.0;
    let response = server
        .put_auth(
            "/users/current",
            &viewer.token,
            &json!({ "latitude": -75.0 + spread * 10.0, "longitude": -150.0 + spread * 300.0 }),
        )
        .await
        .unwrap();
    assert_status(response, StatusCode::OK).await.unwrap();

    let post_id = create_feed_post(&server, &author, "Stargazing").await;

    let feed = feed_ids(&server, &viewer, "&location_type=nearby").await;
    assert!(feed.contains(&post_id));

    let settings = server.feed_settings(&viewer.id).await.unwrap().expect("settings saved");
    assert_eq!(settings.location_type.as_deref(), Some("nearby"));

    // One row per recorded stage; only recent dropped the location filter
    let results = server.feed_results(&viewer.id).await.unwrap();
    assert_eq!(results.len(), 3);
    assert!(results[0].0.starts_with("now-"));
    assert_eq!(results[0].1, 0);
    assert!(results[1].0.starts_with("active-"));
    assert_eq!(results[1].1, 0);
    assert!(results[2].0.starts_with("recent-"));
    assert!(results[2].1 >= 1);
}

// ============================================================================
// Conversation Tests
// ============================================================================

#[tokio::test]
async fn test_send_message_creates_conversation() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let ann = TestUser::register(&server, "Ann").await.unwrap();
    let bo = TestUser::register(&server, "Bo").await.unwrap();

    let response = server
        .post_auth("/messages", &ann.token, &message_body(&bo.id, "Hey Bo"))
        .await
        .unwrap();
    let message: Value = assert_json(response, StatusCode::CREATED).await.unwrap();
    assert_eq!(message["text"], "Hey Bo");
    let conversation_id = message["conversation_id"].as_str().unwrap().to_string();

    // Replying reuses the conversation
    let response = server
        .post_auth("/messages", &bo.token, &message_body(&ann.id, "Hi Ann"))
        .await
        .unwrap();
    let reply: Value = assert_json(response, StatusCode::CREATED).await.unwrap();
    assert_eq!(reply["conversation_id"], conversation_id.as_str());

    let response = server.get_auth("/conversations", &ann.token).await.unwrap();
    let list: Value = assert_json(response, StatusCode::OK).await.unwrap();
    let conversation = list["results"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["id"] == conversation_id.as_str())
        .expect("conversation listed");
    assert_eq!(conversation["unread_count"], 1);
    assert_eq!(conversation["other_user"]["id"], bo.id.as_str());
}

#[tokio::test]
async fn test_conversation_messages_marks_read() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let ann = TestUser::register(&server, "Ann").await.unwrap();
    let bo = TestUser::register(&server, "Bo").await.unwrap();
    let eve = TestUser::register(&server, "Eve").await.unwrap();

    let response = server
        .post_auth("/messages", &ann.token, &message_body(&bo.id, "Coffee?"))
        .await
        .unwrap();
    let message: Value = assert_json(response, StatusCode::CREATED).await.unwrap();
    let path = format!("/conversations/{}/messages", message["conversation_id"].as_str().unwrap());

    let response = server.get_auth(&path, &eve.token).await.unwrap();
    assert_status(response, StatusCode::FORBIDDEN).await.unwrap();

    let response = server.get_auth(&path, &bo.token).await.unwrap();
    let body: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(body["conversation"]["unread_count"], 0);
    assert_eq!(body["messages"][0]["read_by_recipient"], true);
}

#[tokio::test]
async fn test_hide_conversation() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let ann = TestUser::register(&server, "Ann").await.unwrap();
    let bo = TestUser::register(&server, "Bo").await.unwrap();

    let response = server
        .post_auth("/messages", &ann.token, &message_body(&bo.id, "Hello"))
        .await
        .unwrap();
    let message: Value = assert_json(response, StatusCode::CREATED).await.unwrap();
    let conversation_id = message["conversation_id"].as_str().unwrap().to_string();

    let response = server
        .delete_auth(&format!("/conversations/{conversation_id}"), &bo.token)
        .await
        .unwrap();
    assert_status(response, StatusCode::OK).await.unwrap();

    let response = server.get_auth("/conversations", &bo.token).await.unwrap();
    let list: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert!(!ids(&list["results"]).contains(&conversation_id));

    // Still visible to the other participant
    let response = server.get_auth("/conversations", &ann.token).await.unwrap();
    let list: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert!(ids(&list["results"]).contains(&conversation_id));
}

#[tokio::test]
async fn test_post_conversations_owner_only() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let ann = TestUser::register(&server, "Ann").await.unwrap();
    let bo = TestUser::register(&server, "Bo").await.unwrap();
    let question = server.seed_poll_question("Ideal first date?", false).await.unwrap();

    let response = server
        .post_auth(&format!("/poll_questions/{question}/posts"), &ann.token, &post_body("Picnic"))
        .await
        .unwrap();
    let post: Value = assert_json(response, StatusCode::OK).await.unwrap();
    let post_id = post["id"].as_str().unwrap().to_string();

    let reply = json!({ "recipient_user_id": ann.id, "text": "Love picnics", "initiating_post_id": post_id });
    let response = server.post_auth("/messages", &bo.token, &reply).await.unwrap();
    assert_status(response, StatusCode::CREATED).await.unwrap();

    let path = format!("/posts/{post_id}/conversations");
    let response = server.get_auth(&path, &bo.token).await.unwrap();
    assert_status(response, StatusCode::FORBIDDEN).await.unwrap();

    let response = server.get_auth(&path, &ann.token).await.unwrap();
    let body: Value = assert_json(response, StatusCode::OK).await.unwrap();
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["post_reply"], "Love picnics");
    assert_eq!(results[0]["initiating_user"]["id"], bo.id.as_str());
}

// ============================================================================
// Guess Game Tests
// ============================================================================

#[tokio::test]
async fn test_guess_about_someone_creates_game() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let ann = TestUser::register(&server, "Ann").await.unwrap();
    let bo = TestUser::register_with(&server, RegisterRequest::unique("Bo").with_gender("male"))
        .await
        .unwrap();
    let (_, choices) = server
        .seed_guess_question("What does %@ order?", "What do you order?", &["Tea", "Coffee"])
        .await
        .unwrap();

    // Ann answers about herself first
    let response = server
        .post_auth("/guess_game/answer", &ann.token, &answer_body(&ann.id, &choices[0]))
        .await
        .unwrap();
    let own: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert!(own["game"].is_null());

    let response = server
        .post_auth("/guess_game/answer", &bo.token, &answer_body(&ann.id, &choices[0]))
        .await
        .unwrap();
    let guess: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(guess["answer"]["is_correct"], true);
    assert_eq!(guess["game"]["by_user_id"], bo.id.as_str());
    assert_eq!(guess["game"]["current_guesses"], 1);
    let game_id = guess["game"]["id"].as_str().unwrap().to_string();

    // Re-answering about someone else is refused
    let response = server
        .post_auth("/guess_game/answer", &bo.token, &answer_body(&ann.id, &choices[1]))
        .await
        .unwrap();
    let again: Value = assert_json(response, StatusCode::FORBIDDEN).await.unwrap();
    assert_eq!(again["error"], "You have already answered this question.");

    let response = server
        .get_auth(&format!("/guess_game/{game_id}"), &ann.token)
        .await
        .unwrap();
    let shown: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(shown["game"]["id"], game_id.as_str());
    assert!(shown["game"].get("user_message_id").is_none());
    assert!(shown["game"].get("have_all_answers").is_none());

    let eve = TestUser::register(&server, "Eve").await.unwrap();
    let response = server
        .get_auth(&format!("/guess_game/{game_id}"), &eve.token)
        .await
        .unwrap();
    let refused: Value = assert_json(response, StatusCode::FORBIDDEN).await.unwrap();
    assert_eq!(refused["error"], "You are not a participant in this game.");
}

#[tokio::test]
async fn test_completed_game_is_scored_after_self_answers() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let ann = TestUser::register(&server, "Ann").await.unwrap();
    let bo = TestUser::register(&server, "Bo").await.unwrap();

    let mut questions = Vec::new();
    for n in 0..5 {
        let (_, choices) = server
            .seed_guess_question(
                &format!("Would %@ pick option {n}?"),
                &format!("Would you pick option {n}?"),
                &["Yes", "No"],
            )
            .await
            .unwrap();
        questions.push(choices);
    }

    // Bo guesses Yes everywhere before Ann has answered anything
    let mut game = Value::Null;
    for choices in &questions {
        let response = server
            .post_auth("/guess_game/answer", &bo.token, &answer_body(&ann.id, &choices[0]))
            .await
            .unwrap();
        let guess: Value = assert_json(response, StatusCode::OK).await.unwrap();
        assert!(guess["answer"]["is_correct"].is_null());
        game = guess["game"].clone();
    }
    assert_eq!(game["current_guesses"], 5);
    assert_eq!(game["is_guessing_done"], true);
    assert!(game.get("score").is_none());
    let game_id = game["id"].as_str().unwrap().to_string();

    let response = server.get_auth("/conversations", &ann.token).await.unwrap();
    let list: Value = assert_json(response, StatusCode::OK).await.unwrap();
    let conversation_id = list["results"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["other_user"]["id"] == bo.id.as_str())
        .and_then(|c| c["id"].as_str())
        .expect("game conversation listed")
        .to_string();
    let messages_path = format!("/conversations/{conversation_id}/messages");

    let response = server.get_auth(&messages_path, &ann.token).await.unwrap();
    let body: Value = assert_json(response, StatusCode::OK).await.unwrap();
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    let done_message_id = messages[0]["id"].clone();
    assert!(messages[0]["text"]
        .as_str()
        .unwrap()
        .starts_with("Bo made some guesses about you."));

    // Ann answers: three Yes, two No
    for (n, choices) in questions.iter().enumerate() {
        let pick = if n < 3 { &choices[0] } else { &choices[1] };
        let response = server
            .post_auth("/guess_game/answer", &ann.token, &answer_body(&ann.id, pick))
            .await
            .unwrap();
        assert_status(response, StatusCode::OK).await.unwrap();
    }

    // Grading runs in the background
    let game_path = format!("/guess_game/{game_id}");
    let mut score = None;
    for _ in 0..40 {
        let response = server.get_auth(&game_path, &bo.token).await.unwrap();
        let shown: Value = assert_json(response, StatusCode::OK).await.unwrap();
        if let Some(value) = shown["game"]["score"].as_f64() {
            score = Some(value);
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(250)).await;
    }
    let score = score.expect("game scored");
    assert!((score - 0.6).abs() < 1e-9);

    // The scored text replaces the guessing-done message in place
    let expected = "Bo made some guesses and was 60% right about you.";
    let mut rewritten = Value::Null;
    for _ in 0..20 {
        let response = server.get_auth(&messages_path, &ann.token).await.unwrap();
        rewritten = assert_json(response, StatusCode::OK).await.unwrap();
        if rewritten["messages"][0]["text"] == expected {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(250)).await;
    }
    let messages = rewritten["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["id"], done_message_id);
    assert_eq!(messages[0]["text"], expected);
}

#[tokio::test]
async fn test_guess_about_missing_user() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let ann = TestUser::register(&server, "Ann").await.unwrap();
    let (_, choices) = server
        .seed_guess_question("Where would %@ travel?", "Where would you travel?", &["Beach", "Mountains"])
        .await
        .unwrap();

    let response = server
        .post_auth("/guess_game/answer", &ann.token, &answer_body("42", &choices[0]))
        .await
        .unwrap();
    let body: Value = assert_json(response, StatusCode::FORBIDDEN).await.unwrap();
    assert_eq!(body["error"], "The user you want to guess does not exist.");
}

#[tokio::test]
async fn test_questions_render_names() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let ann = TestUser::register(&server, "Ann").await.unwrap();
    let bo = TestUser::register(&server, "Bo").await.unwrap();
    let (question_id, _) = server
        .seed_guess_question("Is %@ a morning person?", "Are you a morning person?", &["Yes", "No"])
        .await
        .unwrap();

    let response = server
        .get_auth(&format!("/guess_game/questions?question_id={question_id}"), &ann.token)
        .await
        .unwrap();
    let single: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(single["about_user"]["id"], ann.id.as_str());
    assert_eq!(single["guess_game_question"]["text"], "Are you a morning person?");

    let response = server
        .get_auth("/guess_game/questions?question_id=1", &ann.token)
        .await
        .unwrap();
    let invalid: Value = assert_json(response, StatusCode::FORBIDDEN).await.unwrap();
    assert_eq!(invalid["error"], "Invalid question id.");

    let response = server
        .get_auth(&format!("/guess_game/questions?about_user_id={}&max=50", bo.id), &ann.token)
        .await
        .unwrap();
    let page: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert!(page["questions_for_me"].is_array());
}

#[tokio::test]
async fn test_share_link_requires_self_answers() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let ann = TestUser::register(&server, "Ann").await.unwrap();

    let response = server.get_auth("/guess_game/link", &ann.token).await.unwrap();
    let body: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(body["error"], true);
    assert_eq!(
        body["error_message"],
        "you have not answered sufficient questions about yourself to invite others"
    );
    assert!(body["max_guesses"].is_u64());
}

#[tokio::test]
async fn test_anonymous_guessing() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let ann = TestUser::register(&server, "Ann").await.unwrap();
    let (_, choices) = server
        .seed_guess_question("What pet would %@ get?", "What pet would you get?", &["Cat", "Dog"])
        .await
        .unwrap();

    server
        .post_auth("/guess_game/answer", &ann.token, &answer_body(&ann.id, &choices[1]))
        .await
        .unwrap();

    let response = server
        .get(&format!("/guess_game/guess?user_id={}", ann.id))
        .await
        .unwrap();
    let page: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(page["about_user"]["id"], ann.id.as_str());
    assert!(!page["guess_game_questions"].as_array().unwrap().is_empty());

    let guesser = uuid::Uuid::new_v4().to_string();
    let response = server
        .post(
            "/guess_game/answer_anonymously",
            &json!({ "about_user_id": ann.id, "uuid": guesser, "source": "web", "choice_ids": [choices[1]] }),
        )
        .await
        .unwrap();
    let rankings: Value = assert_json(response, StatusCode::OK).await.unwrap();
    let mine = rankings["rankings"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["uuid"] == guesser.as_str())
        .expect("ranking for guesser");
    assert_eq!(mine["num_answers"], 1);
    assert_eq!(mine["score"], 1.0);

    let response = server
        .post(
            "/guess_game/update_anonymous_name",
            &json!({ "uuid": guesser, "name": "Secret admirer" }),
        )
        .await
        .unwrap();
    let renamed: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(renamed["message"], "success!");
    assert_eq!(renamed["name"], "Secret admirer");
}

#[tokio::test]
async fn test_anonymous_guessing_rejections() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");

    let response = server
        .post(
            "/guess_game/answer_anonymously",
            &json!({ "about_user_id": "42", "uuid": "abc", "choice_ids": [] }),
        )
        .await
        .unwrap();
    let body: Value = assert_json(response, StatusCode::FORBIDDEN).await.unwrap();
    assert_eq!(body["error"], true);
    assert_eq!(body["message"], "Unable to find user");

    let response = server
        .post("/guess_game/update_anonymous_name", &json!({ "name": "Nobody" }))
        .await
        .unwrap();
    let body: Value = assert_json(response, StatusCode::BAD_REQUEST).await.unwrap();
    assert_eq!(body["error"], true);
    assert_eq!(body["message"], "Missing uuid");
}
