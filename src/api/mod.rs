//! API 路由模块

mod health;
mod improve;

pub use health::health_routes;
pub use improve::improve_routes;

use axum::Router;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use std::sync::Arc;

/// 创建所有 API 路由
pub fn create_api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(improve_routes())
        .with_state(state)
}

/// 创建完整应用（路由 + CORS + 请求追踪）
pub fn create_app(state: Arc<AppState>) -> Router {
    // 允许所有来源、方法和请求头，并允许携带凭据（回显请求方的值）
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    create_api_routes(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
