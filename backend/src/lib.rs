pub mod config;
pub mod error;
pub mod extract;
pub mod identity;
pub mod logging;
pub mod models;
pub mod routes;
pub mod store;
pub mod test_util;
pub mod token;

pub use config::{Config, CorsConfig, WechatConfig};
pub use error::LoginError;
pub use identity::{Identity, IdentityProvider, WechatClient};
pub use models::user::User;
pub use store::{UserStore, UserUpsert};

use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use axum::{middleware, Router};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    /// Exchanges login codes for openids.
    pub identity: Arc<dyn IdentityProvider>,
    /// User table.
    pub users: Arc<UserStore>,
}

impl AppState {
    /// Build the production state: WeChat client and SQLite store.
    pub fn from_config(config: Config) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let identity = WechatClient::new(&config.wechat)?;
        let users = UserStore::new(&config.database.url)?;

        Ok(Self {
            config,
            identity: Arc::new(identity),
            users: Arc::new(users),
        })
    }
}

fn cors_layer(cors: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    match cors.allowed_origins() {
        None => layer.allow_origin(Any),
        Some(origins) => layer.allow_origin(AllowOrigin::list(
            origins.iter().filter_map(|o| o.parse::<HeaderValue>().ok()),
        )),
    }
}

/// Full application router with logging, CORS and timeout layers.
pub fn app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.cors);
    let timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    Router::new()
        .merge(routes::health::router(state.clone()))
        .merge(routes::login::router(state))
        .layer(middleware::from_fn(logging::request_logger))
        .layer(TimeoutLayer::new(timeout))
        .layer(middleware::from_fn(error::timeout_envelope))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
