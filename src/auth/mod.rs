//! # Authentication Module
//!
//! Dual-token authentication: the issuer signs access/refresh pairs, the
//! gate authenticates requests and transparently rotates expired sessions,
//! and the middleware plugs the gate into axum.

pub mod gate;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;

pub use gate::{Authorized, CredentialHeaders, GateError, authenticate};
pub use jwt::{TokenError, TokenIssuer, TokenPair};
pub use middleware::TokenGate;
pub use models::{IdentityClaims, Role};
