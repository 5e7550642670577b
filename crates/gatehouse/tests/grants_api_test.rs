//! integration tests for the admin grant api and the authorization layer

use std::net::SocketAddr;

use axum::{
    Router,
    body::Body,
    extract::ConnectInfo,
    http::{Request, StatusCode, header},
    response::Response,
};
use base64::{Engine, engine::general_purpose::STANDARD};
use gatehouse::{PeerCertificates, create_app, handlers::ListGrantsResponse};
use gatehouse_grants::Authorizer;
use gatehouse_store::{AnyStore, MemoryStore};
use gatehouse_types::{AccessTokenCredential, CertSubject, Config, GrantItem, GrantSpec};
use serde_json::{Value, json};
use tower::ServiceExt;

/// config with an admin token allowed to write and a reader token known but
/// not granted anything.
fn test_config() -> Config {
    let mut config = Config::default();
    config.access_tokens = vec![
        AccessTokenCredential::from_secret("admin", "admin-secret"),
        AccessTokenCredential::from_secret("reader", "reader-secret"),
    ];
    config.builtin_grants.push(GrantSpec {
        guard_type: "access_token".to_string(),
        guard_data: json!({"id": "admin"}),
        policy: "client-readwrite".to_string(),
    });
    config
}

fn app(config: &Config) -> Router {
    let store = AnyStore::Memory(MemoryStore::default());
    let authorizer = Authorizer::from_config(store, config).expect("valid config");
    create_app(authorizer, config)
}

fn remote() -> ConnectInfo<SocketAddr> {
    ConnectInfo("203.0.113.7:51000".parse().unwrap())
}

fn post(uri: &str, auth: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .extension(remote());
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, auth: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri).extension(remote());
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read body")
        .to_vec()
}

const ADMIN: &str = "Bearer admin:admin-secret";
const READER: &str = "Bearer reader:reader-secret";

fn reader_grant() -> Value {
    json!({
        "guard_type": "access_token",
        "guard_data": {"id": "reader"},
        "policy": "client-readonly",
    })
}

#[tokio::test]
async fn test_health_is_public() {
    let response = app(&test_config())
        .oneshot(get("/health", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body["status"], "pass");
}

#[tokio::test]
async fn test_anonymous_create_is_forbidden() {
    let response = app(&test_config())
        .oneshot(post("/create-authorization-grant", None, reader_grant()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_bad_credentials_are_unauthorized() {
    let app = app(&test_config());

    let wrong_secret = app
        .clone()
        .oneshot(get("/list-authorization-grants", Some("Bearer admin:nope")))
        .await
        .unwrap();
    assert_eq!(wrong_secret.status(), StatusCode::UNAUTHORIZED);

    let unknown_id = app
        .clone()
        .oneshot(get("/list-authorization-grants", Some("Bearer ghost:x")))
        .await
        .unwrap();
    assert_eq!(unknown_id.status(), StatusCode::UNAUTHORIZED);

    let malformed = app
        .oneshot(get("/list-authorization-grants", Some("Bearer admin")))
        .await
        .unwrap();
    assert_eq!(malformed.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_list_delete() {
    let app = app(&test_config());

    let response = app
        .clone()
        .oneshot(post("/create-authorization-grant", Some(ADMIN), reader_grant()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let created: GrantItem = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(created.guard_type, "access_token");
    assert_eq!(created.guard_data, json!({"id": "reader"}));
    assert_eq!(created.policy, "client-readonly");

    // the new grant lets the reader list, via basic auth this time
    let basic = format!("Basic {}", STANDARD.encode("reader:reader-secret"));
    let response = app
        .clone()
        .oneshot(get("/list-authorization-grants", Some(&basic)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let list: ListGrantsResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(list.items, vec![created]);

    // but not create
    let response = app
        .clone()
        .oneshot(post("/create-authorization-grant", Some(READER), reader_grant()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(post("/delete-authorization-grant", Some(ADMIN), reader_grant()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body, json!({}));

    let response = app
        .oneshot(post("/list-authorization-grants", Some(READER), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_invalid_grant_requests_are_bad_requests() {
    let app = app(&test_config());

    let cases = [
        json!({"guard_type": "password", "guard_data": {}, "policy": "network"}),
        json!({"guard_type": "access_token", "guard_data": {"id": ""}, "policy": "network"}),
        json!({"guard_type": "x509", "guard_data": {"subject": {}}, "policy": "network"}),
        json!({"guard_type": "any", "policy": "superuser"}),
        json!({"policy": "network"}),
    ];
    for body in cases {
        let response = app
            .clone()
            .oneshot(post("/create-authorization-grant", Some(ADMIN), body.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
    }
}

#[tokio::test]
async fn test_loopback_grant() {
    let mut config = test_config();
    config.builtin_grants.push(GrantSpec {
        guard_type: "localhost".to_string(),
        guard_data: Value::Null,
        policy: "client-readonly".to_string(),
    });
    let app = app(&config);

    let local = Request::builder()
        .uri("/list-authorization-grants")
        .extension(ConnectInfo::<SocketAddr>("127.0.0.1:40000".parse().unwrap()))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(local).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get("/list-authorization-grants", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_peer_certificate_grant() {
    let mut config = test_config();
    config.builtin_grants.push(GrantSpec {
        guard_type: "x509".to_string(),
        guard_data: json!({"O": ["Acme Corp"]}),
        policy: "client-readonly".to_string(),
    });
    let app = app(&config);

    let subject = CertSubject {
        organization: vec!["Acme Corp".to_string(), "R&D".to_string()],
        ..Default::default()
    };
    let request = Request::builder()
        .uri("/list-authorization-grants")
        .extension(remote())
        .extension(PeerCertificates(vec![subject]))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let other = CertSubject {
        organization: vec!["OtherCorp".to_string()],
        ..Default::default()
    };
    let request = Request::builder()
        .uri("/list-authorization-grants")
        .extension(remote())
        .extension(PeerCertificates(vec![other]))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_unmapped_route_is_missing_policy() {
    let mut config = test_config();
    config.routes.remove("/list-authorization-grants");
    let response = app(&config)
        .oneshot(get("/list-authorization-grants", Some(ADMIN)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(body.contains("missing policy"), "body: {body}");
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let response = app(&test_config())
        .oneshot(get("/nope", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
