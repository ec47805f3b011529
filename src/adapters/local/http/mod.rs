//! HTTP inbound adapter.
//!
//! REST routes over the static-resource service. Callers authenticate with
//! `Authorization: Bearer <token>`; every route is guarded by the service.

pub mod auth;
pub mod error;
pub mod handlers;

pub use auth::TokenTable;
pub use error::ErrorResponse;

use crate::application::StaticResourceService;
use crate::ports::{BlobStore, DispatchPort, ResourceRegistry, UserDirectory};
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the router for one fully wired service.
pub fn router<R, B, M, U>(service: StaticResourceService<R, B, M, U>, tokens: TokenTable) -> Router
where
    R: ResourceRegistry + Clone + 'static,
    B: BlobStore + Clone + 'static,
    M: DispatchPort + Clone + 'static,
    U: UserDirectory + Clone + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/static-resource/", post(handlers::create::<R, B, M, U>))
        .route("/static-resource/type/:type", get(handlers::list::<R, B, M, U>))
        .route(
            "/static-resource/:id",
            get(handlers::load::<R, B, M, U>).delete(handlers::delete::<R, B, M, U>),
        )
        .route(
            "/static-resource/:id/public/toggle",
            put(handlers::toggle_public::<R, B, M, U>),
        )
        .layer(middleware::from_fn_with_state(tokens, auth::authenticate))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::disable())
        .with_state(Arc::new(service))
}
