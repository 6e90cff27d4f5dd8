//! # HTTP Server Module
//!
//! This module assembles the axum application: shared state, routes, and the middleware
//! stack. Requests pass through the layers outermost first:
//!
//! `TraceLayer` → timeout → CORS → authentication gateway → access policy → handler
//!
//! The gateway binds a principal when the request carries a valid bearer token; the
//! access policy then rejects protected routes that still have none.
//!
//! ## Rust Concepts Used
//!
//! - `Arc<T>` for sharing the codec, resolver and policy across request tasks
//! - `#[derive(Clone)]` state handed to every handler through `State<AppState>`
//! - `tokio::net::TcpListener` plus `axum::serve` with graceful shutdown

use axum::{
    middleware,
    routing::{get, post, put},
    Router as AxumRouter,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, instrument};

use crate::auth::middleware::{AuthLayer, AuthenticationGateway};
use crate::auth::policy::{enforce_access_policy, AccessPolicy};
use crate::auth::resolver::IdentityResolver;
use crate::auth::token::TokenCodec;
use crate::core::config::{ClubConfig, CorsConfig, ServerConfig};
use crate::core::error::{ClubError, ClubResult};
use crate::gateway::handlers;
use crate::identity::IdentityStores;

/// State shared by every handler
#[derive(Debug, Clone)]
pub struct AppState {
    pub codec: Arc<TokenCodec>,
    pub resolver: Arc<IdentityResolver>,
    pub stores: IdentityStores,
    pub policy: Arc<AccessPolicy>,
    pub gateway: Arc<AuthenticationGateway>,
}

impl AppState {
    /// Wire the authentication core from configuration and identity stores
    pub fn new(config: &ClubConfig, stores: IdentityStores) -> ClubResult<Self> {
        let codec = Arc::new(TokenCodec::from_config(&config.auth)?);
        let policy = Arc::new(AccessPolicy::from_config(&config.access)?);
        let resolver = Arc::new(IdentityResolver::new(stores.clone(), codec.clone()));
        let gateway = Arc::new(
            AuthenticationGateway::new(codec.clone(), policy.clone())
                .with_scheme(config.auth.bearer_scheme.clone()),
        );

        Ok(Self {
            codec,
            resolver,
            stores,
            policy,
            gateway,
        })
    }
}

/// Build the application router with its full middleware stack
pub fn build_router(state: AppState, config: &ServerConfig) -> AxumRouter {
    let mut app = AxumRouter::new()
        .route("/api/login", post(handlers::login))
        .route("/api/entrenadores/registrar", post(handlers::register_coach))
        .route("/api/jugadores/registrar", post(handlers::register_player))
        .route("/api/padres/registrar", post(handlers::register_parent))
        .route("/api/identities/:id/push-token", put(handlers::attach_push_token))
        .route("/api/usuarios/:id/fcm-token", post(handlers::attach_push_token))
        .route("/api/me", get(handlers::current_principal))
        .route("/health", get(handlers::health_check))
        .nest_service("/uploads", ServeDir::new(&config.uploads_dir))
        .with_state(state.clone());

    // Added innermost first: the gateway must wrap the policy check.
    app = app
        .layer(middleware::from_fn_with_state(
            state.policy.clone(),
            enforce_access_policy,
        ))
        .layer(AuthLayer::new(state.gateway.clone()));

    if config.cors.enabled {
        app = app.layer(cors_layer(&config.cors));
        info!("CORS enabled with {} allowed origins", config.cors.allowed_origins.len());
    }

    app.layer(TimeoutLayer::new(config.request_timeout))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let mut cors = CorsLayer::new().allow_headers(Any);

    if config.allowed_origins.iter().any(|origin| origin == "*") {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<axum::http::HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        cors = cors.allow_origin(origins);
    }

    let methods: Vec<axum::http::Method> = config
        .allowed_methods
        .iter()
        .filter_map(|method| method.parse().ok())
        .collect();

    cors.allow_methods(methods)
}

/// The club authentication HTTP server
pub struct ClubServer {
    state: AppState,
    app: AxumRouter,
    bind_addr: SocketAddr,
}

impl ClubServer {
    pub fn new(config: &ClubConfig, stores: IdentityStores) -> ClubResult<Self> {
        let bind_addr = config.socket_addr()?;
        let state = AppState::new(config, stores)?;
        let app = build_router(state.clone(), &config.server);

        Ok(Self {
            state,
            app,
            bind_addr,
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Clone of the assembled router, for in-process testing
    pub fn router(&self) -> AxumRouter {
        self.app.clone()
    }

    /// Serve until `shutdown` resolves
    #[instrument(skip(self, shutdown))]
    pub async fn start<F>(self, shutdown: F) -> ClubResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.bind_addr)
            .await
            .map_err(|e| ClubError::internal(format!("Failed to bind server to {}: {}", self.bind_addr, e)))?;

        info!("Club auth server listening on {}", self.bind_addr);

        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ClubError::internal(format!("Server error: {}", e)))
    }
}
