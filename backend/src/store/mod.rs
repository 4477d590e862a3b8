//! User persistence.

mod sqlite;

pub use sqlite::{StoreError, UserStore};

/// Values written by one login. `None` clears the stored value: the last
/// login wins, fields are never merged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserUpsert {
    pub openid: String,
    pub unionid: Option<String>,
    pub nickname: Option<String>,
    pub avatar_url: Option<String>,
}
