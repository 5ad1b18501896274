use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rotation_cell::{rotation_routes, CursorStore, InMemoryCursorStore};
use shared_config::AppConfig;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

struct TestApp {
    app: Router,
    config: AppConfig,
    cursor: Arc<InMemoryCursorStore>,
}

async fn create_test_app(mock_server: &MockServer) -> TestApp {
    let config = TestConfig::with_supabase_url(mock_server.uri()).to_app_config();
    let cursor = Arc::new(InMemoryCursorStore::new());
    let app = rotation_routes(Arc::new(config.clone()), cursor.clone());
    TestApp { app, config, cursor }
}

async fn mount_doctors(mock_server: &MockServer, doctors: Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(doctors))
        .mount(mock_server)
        .await;
}

fn request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_assign_rotates_through_doctors() {
    let mock_server = MockServer::start().await;
    let test_app = create_test_app(&mock_server).await;
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

    mount_doctors(&mock_server, json!([
        MockSupabaseResponses::doctor_record(a, &["Monday", "Wednesday"]),
        MockSupabaseResponses::doctor_record(b, &["Monday"]),
    ]))
    .await;

    let user = TestUser::receptionist("desk@example.com");
    let token = JwtTestUtils::create_test_token(&user, &test_app.config.supabase_jwt_secret, Some(24));

    let mut assigned = Vec::new();
    for _ in 0..4 {
        let response = test_app
            .app
            .clone()
            .oneshot(request("POST", "/assign", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json_response = body_json(response).await;
        assigned.push(json_response["doctor_id"].as_str().unwrap().to_string());
    }

    assert_eq!(assigned, vec![a.to_string(), b.to_string(), a.to_string(), a.to_string()]);
    assert_eq!(test_app.cursor.read_cursor().await.unwrap(), 1);
}

#[tokio::test]
async fn test_assign_without_doctors_is_conflict() {
    let mock_server = MockServer::start().await;
    let test_app = create_test_app(&mock_server).await;
    mount_doctors(&mock_server, json!([])).await;

    let user = TestUser::admin("admin@example.com");
    let token = JwtTestUtils::create_test_token(&user, &test_app.config.supabase_jwt_secret, Some(24));

    let response = test_app
        .app
        .oneshot(request("POST", "/assign", Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json_response = body_json(response).await;
    assert!(json_response["error"].as_str().unwrap().contains("No doctors available"));
    assert_eq!(test_app.cursor.write_count(), 0);
}

#[tokio::test]
async fn test_assign_with_corrupt_schedule_is_server_error() {
    let mock_server = MockServer::start().await;
    let test_app = create_test_app(&mock_server).await;
    mount_doctors(&mock_server, json!([
        MockSupabaseResponses::doctor_record(Uuid::new_v4(), &["funday"]),
    ]))
    .await;

    let user = TestUser::receptionist("desk@example.com");
    let token = JwtTestUtils::create_test_token(&user, &test_app.config.supabase_jwt_secret, Some(24));

    let response = test_app
        .app
        .oneshot(request("POST", "/assign", Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(test_app.cursor.write_count(), 0);
}

#[tokio::test]
async fn test_assign_requires_token() {
    let mock_server = MockServer::start().await;
    let test_app = create_test_app(&mock_server).await;

    let response = test_app
        .app
        .oneshot(request("POST", "/assign", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_assign_rejects_expired_token() {
    let mock_server = MockServer::start().await;
    let test_app = create_test_app(&mock_server).await;

    let user = TestUser::receptionist("desk@example.com");
    let token = JwtTestUtils::create_expired_token(&user, &test_app.config.supabase_jwt_secret);

    let response = test_app
        .app
        .oneshot(request("POST", "/assign", Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_doctor_cannot_assign() {
    let mock_server = MockServer::start().await;
    let test_app = create_test_app(&mock_server).await;

    let user = TestUser::doctor("doctor@example.com");
    let token = JwtTestUtils::create_test_token(&user, &test_app.config.supabase_jwt_secret, Some(24));

    let response = test_app
        .app
        .oneshot(request("POST", "/assign", Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(test_app.cursor.write_count(), 0);
}

#[tokio::test]
async fn test_sequence_preview() {
    let mock_server = MockServer::start().await;
    let test_app = create_test_app(&mock_server).await;
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

    mount_doctors(&mock_server, json!([
        MockSupabaseResponses::doctor_record(a, &["Monday", "Wednesday"]),
        MockSupabaseResponses::doctor_record(b, &["Monday"]),
    ]))
    .await;
    test_app.cursor.write_cursor(4).await.unwrap();

    let user = TestUser::receptionist("desk@example.com");
    let token = JwtTestUtils::create_test_token(&user, &test_app.config.supabase_jwt_secret, Some(24));

    let response = test_app
        .app
        .oneshot(request("GET", "/sequence", Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json_response = body_json(response).await;
    assert_eq!(json_response["length"], 3);
    assert_eq!(json_response["cursor"], 4);
    assert_eq!(json_response["sequence"], json!([a, b, a]));
    assert_eq!(json_response["next_doctor_id"], json!(b));
    assert_eq!(test_app.cursor.read_cursor().await.unwrap(), 4);
}

#[tokio::test]
async fn test_cursor_reset_is_admin_only() {
    let mock_server = MockServer::start().await;
    let test_app = create_test_app(&mock_server).await;
    test_app.cursor.write_cursor(2).await.unwrap();

    let desk = TestUser::receptionist("desk@example.com");
    let desk_token = JwtTestUtils::create_test_token(&desk, &test_app.config.supabase_jwt_secret, Some(24));

    let response = test_app
        .app
        .clone()
        .oneshot(request("POST", "/cursor/reset", Some(&desk_token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(test_app.cursor.read_cursor().await.unwrap(), 2);

    let admin = TestUser::admin("admin@example.com");
    let admin_token = JwtTestUtils::create_test_token(&admin, &test_app.config.supabase_jwt_secret, Some(24));

    let response = test_app
        .app
        .oneshot(request("POST", "/cursor/reset", Some(&admin_token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "cursor": 0 }));
    assert_eq!(test_app.cursor.read_cursor().await.unwrap(), 0);
}
