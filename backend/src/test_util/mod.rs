pub mod mock_wechat;

use std::sync::Arc;

use crate::config::{Config, CorsConfig, DatabaseConfig, LoggingConfig, ServerConfig, WechatConfig};
use crate::AppState;

pub const TEST_APP_ID: &str = "wx-test-app";
pub const TEST_APP_SECRET: &str = "test-secret";

/// Configuration pointing the WeChat client at `wechat_base_url` and the
/// store at an in-memory database.
pub fn test_config(wechat_base_url: &str) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout_secs: 10,
        },
        wechat: WechatConfig {
            app_id: TEST_APP_ID.to_string(),
            app_secret: TEST_APP_SECRET.to_string(),
            base_url: wechat_base_url.to_string(),
            timeout_secs: 1,
        },
        database: DatabaseConfig {
            url: ":memory:".to_string(),
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
        },
        cors: CorsConfig { origins: "*".to_string() },
    }
}

pub fn create_test_state(wechat_base_url: &str) -> Arc<AppState> {
    let state = AppState::from_config(test_config(wechat_base_url))
        .expect("Failed to build test state");
    Arc::new(state)
}
