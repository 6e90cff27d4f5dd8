//! # Authentication Module
//!
//! Stateless authentication core: the token codec, the login resolver, the per-request
//! authentication gateway and the static access policy.

pub mod middleware;
pub mod policy;
pub mod resolver;
pub mod token;


pub use middleware::{authenticate_request, AuthLayer, AuthenticationGateway, GatewayOutcome};
pub use policy::{enforce_access_policy, AccessPolicy, AccessRule, RoutePattern};
pub use resolver::{IdentityResolver, LoginResult};
pub use token::{Claims, TokenCodec, TokenError};
