use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without authentication. None of them expose resources;
/// listing and downloading require a signed-in user.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /register
        // Creates an account; 409 when the email already exists.
        .route("/register", post(handlers::register_user))
        // POST /login
        // Exchanges email/password for a bearer token.
        .route("/login", post(handlers::login))
}
