//! Identity exchange: authorization code in, stable user identifiers out.
//!
//! The login handler only sees the `IdentityProvider` trait; `WechatClient`
//! is the production implementation backed by `jscode2session`.

mod wechat;

pub use wechat::WechatClient;

use async_trait::async_trait;

/// Identifiers issued by the identity provider for one end user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Per-application identifier (openid).
    pub openid: String,
    /// Cross-application identifier (unionid), when the app is bound to an
    /// open platform account.
    pub unionid: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    /// The provider answered with a non-zero `errcode`.
    #[error("Provider rejected code ({code}): {message}")]
    Rejected { code: i64, message: String },
    #[error("Provider response has no openid")]
    MissingOpenid,
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Exchanges a short-lived authorization code for an [`Identity`].
///
/// One attempt per call, no retries.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Short name used in logs (e.g. "wechat").
    fn provider_name(&self) -> &'static str;

    async fn exchange_code(&self, code: &str) -> Result<Identity, ExchangeError>;
}
