//! # Marketplace Server
//!
//! Backend for a listings/cart/wishlist marketplace, built around a
//! stateless dual-token authentication scheme:
//!
//! - `auth`: token issuer, token gate and the axum middleware wrapping it
//! - `database`: user account storage (in-memory or PostgreSQL)
//! - `routes`: HTTP handlers for signup, login, health and protected routes
//! - `server`: router assembly and server lifecycle
//! - `config`: environment variable configuration

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod routes;
pub mod server;
