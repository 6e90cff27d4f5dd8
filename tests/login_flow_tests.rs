//! # Login Flow Integration Tests
//!
//! Drives the assembled router end to end with `tower::ServiceExt::oneshot`:
//! registration, login disambiguation, bearer authentication, the access policy,
//! push-token attachment and static uploads.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    middleware,
    routing::get,
    Extension, Router,
};
use club_auth::auth::authenticate_request;
use club_auth::{
    AccessPolicy, AuthenticationGateway, ClubConfig, ClubServer, Identity, IdentityStore, IdentityStores,
    InMemoryIdentityStore, Principal, Role, TokenCodec,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const SECRET: &str = "integration-test-secret-0123456789abcdef";

// ============================================================================
// Test Utilities
// ============================================================================

fn test_config() -> ClubConfig {
    let mut config = ClubConfig::with_secret(SECRET);
    config.server.bind_address = "127.0.0.1".to_string();
    config
}

fn create_test_server(stores: IdentityStores) -> ClubServer {
    ClubServer::new(&test_config(), stores).unwrap()
}

/// Stores where "X" exists as coach, player and parent with different passwords
fn colliding_stores() -> IdentityStores {
    IdentityStores::new(
        Arc::new(
            InMemoryIdentityStore::with_identities(Role::Coach, [Identity::new("X", "pc", Role::Coach)])
                .unwrap(),
        ),
        Arc::new(
            InMemoryIdentityStore::with_identities(
                Role::Player,
                [Identity::new("X", "pp", Role::Player).with_team("T1")],
            )
            .unwrap(),
        ),
        Arc::new(
            InMemoryIdentityStore::with_identities(Role::Parent, [Identity::new("X", "pa", Role::Parent)])
                .unwrap(),
        ),
    )
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_with_token(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if body_bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

async fn login(app: &Router, identifier: &str, password: &str) -> (StatusCode, Value) {
    send(
        app,
        json_request(
            Method::POST,
            "/api/login",
            json!({ "identifier": identifier, "password": password }),
        ),
    )
    .await
}

// ============================================================================
// Login and Bearer Authentication
// ============================================================================

#[tokio::test]
async fn test_register_login_and_access_protected_route() {
    let app = create_test_server(IdentityStores::in_memory()).router();

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/entrenadores/registrar",
            json!({ "id": "C1", "password": "secret1", "name": "Ana" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["identityId"], "C1");

    let (status, body) = login(&app, "C1", "secret1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "coach");
    assert_eq!(body["identityId"], "C1");
    assert!(body.get("teamId").is_none());
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = send(&app, get_with_token("/api/me", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["identityId"], "C1");
    assert_eq!(body["role"], "coach");
    assert_eq!(body["authority"], "ROLE_COACH");
}

#[tokio::test]
async fn test_tampered_token_is_rejected_by_policy() {
    let app = create_test_server(IdentityStores::in_memory()).router();
    let codec = TokenCodec::new(SECRET.as_bytes());
    let token = codec.generate("C1", "coach").unwrap();

    // Flip one character of the signature.
    let mut tampered: Vec<char> = token.chars().collect();
    let last = tampered.len() - 2;
    tampered[last] = if tampered[last] == 'A' { 'B' } else { 'A' };
    let tampered: String = tampered.into_iter().collect();

    let (status, body) = send(&app, get_with_token("/api/me", &tampered)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["type"], "unauthenticated");
    assert_eq!(body["error"]["code"], 401);

    let (status, _) = send(&app, get_with_token("/api/me", &format!("{}x", token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_signed_with_other_key_is_rejected() {
    let app = create_test_server(IdentityStores::in_memory()).router();
    let foreign = TokenCodec::new(b"some-other-secret-0123456789abcdefgh");
    let token = foreign.generate("C1", "coach").unwrap();

    let (status, _) = send(&app, get_with_token("/api/me", &token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_route_without_token() {
    let app = create_test_server(IdentityStores::in_memory()).router();

    let request = Request::builder().uri("/api/me").body(Body::empty()).unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["type"], "unauthenticated");
}

#[tokio::test]
async fn test_health_is_protected_by_default() {
    let app = create_test_server(IdentityStores::in_memory()).router();
    let codec = TokenCodec::new(SECRET.as_bytes());
    let token = codec.generate("P1", "player").unwrap();

    let anonymous = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, _) = send(&app, anonymous).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, get_with_token("/health", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_health_can_be_made_public() {
    let mut config = test_config();
    config.access.public_routes.push("/health".to_string());
    let app = ClubServer::new(&config, IdentityStores::in_memory()).unwrap().router();

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_login_ignores_junk_bearer_header() {
    let stores = IdentityStores::in_memory();
    stores
        .parents
        .save(Identity::new("PA1", "pw", Role::Parent))
        .await
        .unwrap();
    let app = create_test_server(stores).router();

    let mut request = json_request(
        Method::POST,
        "/api/login",
        json!({ "identifier": "PA1", "password": "pw" }),
    );
    request
        .headers_mut()
        .insert(header::AUTHORIZATION, "Bearer not-a-token".parse().unwrap());

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "parent");
}

// ============================================================================
// Login Disambiguation
// ============================================================================

#[tokio::test]
async fn test_login_disambiguation_by_password() {
    let app = create_test_server(colliding_stores()).router();

    let (status, body) = login(&app, "X", "pc").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "coach");

    let (status, body) = login(&app, "X", "pp").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "player");
    assert_eq!(body["teamId"], "T1");

    let (status, body) = login(&app, "X", "pa").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "parent");
    assert!(body.get("teamId").is_none());

    let (status, body) = login(&app, "X", "nope").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["type"], "invalid_credentials");
}

#[tokio::test]
async fn test_login_accepts_legacy_field_name() {
    let app = create_test_server(colliding_stores()).router();

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/login",
            json!({ "identificador": "X", "password": "pa" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "parent");
}

#[tokio::test]
async fn test_login_rejects_empty_fields() {
    let app = create_test_server(IdentityStores::in_memory()).router();

    let (status, body) = login(&app, "", "pw").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "request_validation_error");

    let (status, _) = login(&app, "C1", "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_issued_token_authenticates_as_resolved_role() {
    let app = create_test_server(colliding_stores()).router();

    let (_, body) = login(&app, "X", "pp").await;
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = send(&app, get_with_token("/api/me", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "player");
    assert_eq!(body["authority"], "ROLE_PLAYER");
}

// ============================================================================
// Registration
// ============================================================================

#[tokio::test]
async fn test_registration_conflict_and_validation() {
    let app = create_test_server(IdentityStores::in_memory()).router();
    let body = json!({ "id": "J1", "password": "pw", "teamId": "T9" });

    let (status, _) = send(&app, json_request(Method::POST, "/api/jugadores/registrar", body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, response) = send(&app, json_request(Method::POST, "/api/jugadores/registrar", body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(response["error"]["type"], "identity_exists");

    // Same id in another role's store is allowed.
    let (status, _) = send(
        &app,
        json_request(Method::POST, "/api/padres/registrar", json!({ "id": "J1", "password": "pw2" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        &app,
        json_request(Method::POST, "/api/entrenadores/registrar", json!({ "id": " ", "password": "pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, login_body) = login(&app, "J1", "pw").await;
    assert_eq!(login_body["role"], "player");
    assert_eq!(login_body["teamId"], "T9");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registration_creates_once() {
    let server = create_test_server(IdentityStores::in_memory());
    let app = server.router();

    let attempts: Vec<_> = (0..12)
        .map(|i| {
            let app = app.clone();
            tokio::spawn(async move {
                let request = json_request(
                    Method::POST,
                    "/api/entrenadores/registrar",
                    json!({ "id": "C9", "password": format!("pw{}", i) }),
                );
                app.oneshot(request).await.unwrap().status()
            })
        })
        .collect();

    let mut created = 0;
    let mut conflicts = 0;
    for attempt in attempts {
        match attempt.await.unwrap() {
            StatusCode::CREATED => created += 1,
            StatusCode::CONFLICT => conflicts += 1,
            other => panic!("unexpected status {}", other),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(conflicts, 11);
}

// ============================================================================
// Push Token Attachment
// ============================================================================

fn push_token_request(method: Method, uri: &str, token: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_push_token_attach() {
    let server = create_test_server(colliding_stores());
    let app = server.router();
    let token = TokenCodec::new(SECRET.as_bytes()).generate("X", "coach").unwrap();

    let (status, _) = send(
        &app,
        push_token_request(Method::PUT, "/api/identities/X/push-token", &token, " fcm:abc \n"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // The body is stored verbatim, surrounding whitespace included.
    let stores = &server.state().stores;
    let coach = stores.coaches.find_by_id("X").await.unwrap().unwrap();
    assert_eq!(coach.push_token.as_deref(), Some(" fcm:abc \n"));
    let player = stores.players.find_by_id("X").await.unwrap().unwrap();
    assert_eq!(player.push_token, None);
}

#[tokio::test]
async fn test_push_token_legacy_route_and_errors() {
    let server = create_test_server(colliding_stores());
    let app = server.router();
    let token = TokenCodec::new(SECRET.as_bytes()).generate("X", "coach").unwrap();

    let (status, _) = send(
        &app,
        push_token_request(Method::POST, "/api/usuarios/X/fcm-token", &token, "legacy-device"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        push_token_request(Method::PUT, "/api/identities/ghost/push-token", &token, "device"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["type"], "identity_not_found");

    let (status, _) = send(
        &app,
        push_token_request(Method::PUT, "/api/identities/X/push-token", &token, "   "),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let anonymous = Request::builder()
        .method(Method::PUT)
        .uri("/api/identities/X/push-token")
        .body(Body::from("device"))
        .unwrap();
    let (status, _) = send(&app, anonymous).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Static Uploads
// ============================================================================

#[tokio::test]
async fn test_uploads_are_public() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("logo.txt"), "club logo").unwrap();

    let mut config = test_config();
    config.server.uploads_dir = dir.path().to_path_buf();
    let app = ClubServer::new(&config, IdentityStores::in_memory()).unwrap().router();

    let request = Request::builder().uri("/uploads/logo.txt").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body_bytes[..], b"club logo");
}

// ============================================================================
// Hand-assembled Router
// ============================================================================

#[tokio::test]
async fn test_from_fn_gateway_binds_principal() {
    let codec = Arc::new(TokenCodec::new(SECRET.as_bytes()));
    let gateway = Arc::new(AuthenticationGateway::new(codec.clone(), Arc::new(AccessPolicy::default())));

    let app = Router::new()
        .route(
            "/whoami",
            get(|principal: Option<Extension<Principal>>| async move {
                principal
                    .map(|Extension(p)| p.authority)
                    .unwrap_or_else(|| "anonymous".to_string())
            }),
        )
        .layer(middleware::from_fn_with_state(gateway, authenticate_request));

    let token = codec.generate("PA1", "parent").unwrap();
    let response = app.clone().oneshot(get_with_token("/whoami", &token)).await.unwrap();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body_bytes[..], b"ROLE_PARENT");

    let anonymous = Request::builder().uri("/whoami").body(Body::empty()).unwrap();
    let response = app.oneshot(anonymous).await.unwrap();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body_bytes[..], b"anonymous");
}
