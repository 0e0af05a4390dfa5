//! Read-only admin API over the live resolver.
//!
//! ```text
//! GET /admin/status                      version, rule counts
//! GET /admin/rules?scope=site|cp         compiled rules in match order
//! GET /admin/url?handler=..&scope=..     URL generation
//! ```

pub mod auth;
pub mod handlers;

use axum::{middleware, routing::get, Router};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/rules", get(get_rules))
        .route("/admin/url", get(get_url))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
