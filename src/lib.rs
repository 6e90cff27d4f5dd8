//! # Club Auth - Core Library Crate
//!
//! Authentication and identity-resolution core for a sports-club management backend.
//! Coaches, players and parents sign in with one shared login route; the resolver finds
//! which kind of identity the credentials belong to, and a signed bearer token carries
//! that identity and role on every later request.
//!
//! ## Module Layout
//!
//! - `core` - error type, configuration and shared data structures
//! - `auth` - token codec, identity resolver, authentication gateway and access policy
//! - `identity` - identity records and the per-role store abstraction
//! - `gateway` - axum router, handlers and server lifecycle
//! - `observability` - structured logging setup

/// Error types, configuration and the data structures shared by every layer
pub mod core;

/// Token handling, login resolution and request authentication
pub mod auth;

/// Identity records and per-role stores
pub mod identity;

/// HTTP server, routes and handlers
pub mod gateway;

/// Logging setup
pub mod observability;

pub use crate::core::config::ClubConfig;
pub use crate::core::error::{ClubError, ClubResult};
pub use crate::core::types::{LoginRequest, LoginResponse, Principal, Role};

pub use auth::{AccessPolicy, AuthenticationGateway, IdentityResolver, TokenCodec};
pub use gateway::{AppState, ClubServer};
pub use identity::{Identity, IdentityStore, IdentityStores, InMemoryIdentityStore};
