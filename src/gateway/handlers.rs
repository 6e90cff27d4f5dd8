//! # HTTP Handlers
//!
//! Thin boundary code: each handler validates its input, calls into the resolver or the
//! identity stores, and maps the outcome onto the wire contract. Every error path goes
//! through `ClubError`'s `IntoResponse`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument};

use crate::core::error::{ClubError, ClubResult};
use crate::core::types::{LoginRequest, LoginResponse, Principal, Role};
use crate::gateway::server::AppState;
use crate::identity::{Identity, IdentityStore};

/// Body of the self-registration routes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    pub id: String,
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Only kept for players
    #[serde(default)]
    pub team_id: Option<String>,
}

/// `POST /api/login`
#[instrument(skip_all, fields(identifier = %request.identifier))]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ClubResult<Json<LoginResponse>> {
    if request.identifier.is_empty() {
        return Err(ClubError::validation("identifier", "must not be empty"));
    }
    if request.password.is_empty() {
        return Err(ClubError::validation("password", "must not be empty"));
    }

    let result = state
        .resolver
        .resolve(&request.identifier, &request.password)
        .await?;

    Ok(Json(result.into()))
}

/// `PUT /api/identities/:id/push-token`
#[instrument(skip_all, fields(identity_id = %identity_id))]
pub async fn attach_push_token(
    State(state): State<AppState>,
    Path(identity_id): Path<String>,
    body: String,
) -> ClubResult<StatusCode> {
    // Stored exactly as sent; only a blank body is refused.
    if body.trim().is_empty() {
        return Err(ClubError::validation("pushToken", "must not be empty"));
    }

    state
        .resolver
        .attach_push_token(&identity_id, &body)
        .await?;

    Ok(StatusCode::OK)
}

pub async fn register_coach(
    State(state): State<AppState>,
    Json(request): Json<RegistrationRequest>,
) -> ClubResult<impl IntoResponse> {
    register(&state, Role::Coach, request).await
}

pub async fn register_player(
    State(state): State<AppState>,
    Json(request): Json<RegistrationRequest>,
) -> ClubResult<impl IntoResponse> {
    register(&state, Role::Player, request).await
}

pub async fn register_parent(
    State(state): State<AppState>,
    Json(request): Json<RegistrationRequest>,
) -> ClubResult<impl IntoResponse> {
    register(&state, Role::Parent, request).await
}

/// Create an identity in the store for `role`; the route decides the role
async fn register(
    state: &AppState,
    role: Role,
    request: RegistrationRequest,
) -> ClubResult<impl IntoResponse> {
    if request.id.trim().is_empty() {
        return Err(ClubError::validation("id", "must not be empty"));
    }
    if request.password.is_empty() {
        return Err(ClubError::validation("password", "must not be empty"));
    }

    let identity = Identity {
        id: request.id.clone(),
        password: request.password,
        role,
        name: request.name,
        email: request.email,
        team_id: if role == Role::Player { request.team_id } else { None },
        push_token: None,
    };
    state.stores.for_role(role).create(identity).await?;

    info!(identity_id = %request.id, role = %role, "Identity registered");
    Ok((StatusCode::CREATED, Json(json!({ "identityId": request.id }))))
}

/// `GET /api/me`
pub async fn current_principal(Extension(principal): Extension<Principal>) -> Json<Principal> {
    Json(principal)
}

/// Liveness check
pub async fn health_check() -> impl IntoResponse {
    let health_info = json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "service": "club-auth"
    });

    (StatusCode::OK, Json(health_info))
}
