use std::fmt;

use chrono::{DateTime, Utc};
use mini_login_common::UserProfile;
use serde::Serialize;

/// Mini-program user, one row per openid.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// Row id, assigned on first login
    pub id: i64,
    /// Per-application identifier from the identity provider
    pub openid: String,
    /// Cross-application identifier, when the provider issues one
    pub unionid: Option<String>,
    /// Nickname sent by the client on the last login
    pub nickname: Option<String>,
    /// Avatar URL sent by the client on the last login
    pub avatar_url: Option<String>,
    /// Whether the account may log in
    pub is_active: bool,
    /// When the user last logged in
    pub last_login: DateTime<Utc>,
    /// When the user first logged in
    pub date_joined: DateTime<Utc>,
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.nickname.as_deref() {
            Some(nickname) if !nickname.is_empty() => f.write_str(nickname),
            _ => f.write_str(&self.openid),
        }
    }
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            nickname: user.nickname.clone(),
            avatar_url: user.avatar_url.clone(),
            openid: user.openid.clone(),
        }
    }
}
