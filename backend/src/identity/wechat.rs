use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{ExchangeError, Identity, IdentityProvider};
use crate::config::WechatConfig;

const SESSION_PATH: &str = "/sns/jscode2session";

/// Client for the WeChat `jscode2session` endpoint.
pub struct WechatClient {
    http_client: Client,
    base_url: String,
    app_id: String,
    app_secret: String,
}

/// `jscode2session` response. The provider answers HTTP 200 in both cases
/// and reports failures through `errcode`/`errmsg`.
#[derive(Debug, Deserialize)]
struct SessionResponse {
    #[serde(default)]
    openid: Option<String>,
    #[serde(default)]
    unionid: Option<String>,
    #[serde(default)]
    errcode: Option<i64>,
    #[serde(default)]
    errmsg: Option<String>,
}

impl WechatClient {
    pub fn new(config: &WechatConfig) -> Result<Self, ExchangeError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ExchangeError::RequestFailed(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            app_id: config.app_id.clone(),
            app_secret: config.app_secret.clone(),
        })
    }
}

#[async_trait]
impl IdentityProvider for WechatClient {
    fn provider_name(&self) -> &'static str {
        "wechat"
    }

    async fn exchange_code(&self, code: &str) -> Result<Identity, ExchangeError> {
        let url = format!("{}{}", self.base_url, SESSION_PATH);

        tracing::debug!("Exchanging login code at {}", url);

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("appid", self.app_id.as_str()),
                ("secret", self.app_secret.as_str()),
                ("js_code", code),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| ExchangeError::RequestFailed(e.without_url().to_string()))?;

        if !response.status().is_success() {
            return Err(ExchangeError::RequestFailed(format!(
                "unexpected status {}",
                response.status()
            )));
        }

        // The endpoint may label JSON as text/plain, so parse the raw body.
        let body = response
            .text()
            .await
            .map_err(|e| ExchangeError::RequestFailed(e.without_url().to_string()))?;
        let session: SessionResponse = serde_json::from_str(&body)
            .map_err(|e| ExchangeError::InvalidResponse(e.to_string()))?;

        session.into_identity()
    }
}

impl SessionResponse {
    fn into_identity(self) -> Result<Identity, ExchangeError> {
        if let Some(code) = self.errcode.filter(|c| *c != 0) {
            return Err(ExchangeError::Rejected {
                code,
                message: self.errmsg.unwrap_or_else(|| "unknown error".to_string()),
            });
        }

        let openid = self
            .openid
            .filter(|id| !id.is_empty())
            .ok_or(ExchangeError::MissingOpenid)?;

        Ok(Identity {
            openid,
            unionid: self.unionid.filter(|id| !id.is_empty()),
        })
    }
}
