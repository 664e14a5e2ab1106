//! REST surface over the loader layer.

mod auth;
mod error;
mod handlers;
mod middleware;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

use crate::application::examiner::Examiner;
use crate::application::loader::LoaderRegistry;
use crate::application::repos::CategoriesRepo;
use crate::application::upstream::Upstream;
use crate::config::BasicCredentials;

pub use error::ApiError;
pub use middleware::RequestId;

#[derive(Clone)]
pub struct HttpState {
    pub registry: Arc<LoaderRegistry>,
    pub categories: Arc<dyn CategoriesRepo>,
    pub upstream: Arc<dyn Upstream>,
    pub examiner: Arc<Examiner>,
    pub admin: Option<BasicCredentials>,
    /// Deadline attached to each request context.
    pub request_timeout: Duration,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/api/categories", get(handlers::list_categories))
        .route(
            "/api/categories/{category_id}/sections",
            get(handlers::list_category_sections),
        )
        .route(
            "/api/categories/{category_id}/articles",
            get(handlers::list_category_articles),
        )
        .route(
            "/api/category/{key_name}",
            get(handlers::category_id_by_key_name),
        )
        .route("/api/sections/{section_id}", get(handlers::get_section))
        .route(
            "/api/sections/{section_id}/articles",
            get(handlers::list_section_articles),
        )
        .route("/api/articles/{article_id}", get(handlers::get_article))
        .route("/api/toparticles/{top_n}", get(handlers::top_articles))
        .route("/api/ticket_forms/{form_id}", get(handlers::get_ticket_form))
        .route("/api/instant_search", get(handlers::instant_search))
        .route("/api/search", get(handlers::search))
        .route("/api/status", get(handlers::status))
        .route(
            "/api/vote/{article_id}/{value}",
            post(handlers::create_vote),
        )
        .route("/api/requests", post(handlers::create_request))
        .route("/api/forcesync", post(handlers::force_sync))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::attach_request_context,
        ))
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .with_state(state)
}
