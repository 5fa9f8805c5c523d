// # Routes Module
//
// HTTP route handlers, grouped by functionality.
// Protected handlers are mounted behind the token gate in `server.rs`.

/// Root, health check and storage connectivity endpoints
pub mod health;

/// Signup and login
pub mod auth;

/// Handlers that require an authenticated caller
pub mod protected;
