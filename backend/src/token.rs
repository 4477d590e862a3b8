//! Login token.
//!
//! The token is `"{user id}:{first 8 characters of the openid}"`. It has no
//! signature and no expiry, and anyone who knows a user's id and openid
//! prefix can forge it. Clients may use it to tell users apart, but nothing
//! should accept it as proof of identity until it is replaced by a signed,
//! expiring credential.

/// Number of openid characters embedded in the token.
pub const OPENID_PREFIX_LEN: usize = 8;

/// Build the login token for a stored user. Deterministic for a given
/// `(user_id, openid prefix)` pair.
pub fn mint_token(user_id: i64, openid: &str) -> String {
    let prefix: String = openid.chars().take(OPENID_PREFIX_LEN).collect();
    format!("{}:{}", user_id, prefix)
}
