use serde_json::json;

/// Canned `jscode2session` bodies.
pub struct MockSession;

impl MockSession {
    pub fn success(openid: &str) -> serde_json::Value {
        json!({
            "openid": openid,
            "session_key": "tiihtNczf5v6AKRyjwEUhQ=="
        })
    }

    pub fn with_unionid(openid: &str, unionid: &str) -> serde_json::Value {
        json!({
            "openid": openid,
            "unionid": unionid,
            "session_key": "tiihtNczf5v6AKRyjwEUhQ=="
        })
    }

    pub fn error(errcode: i64, errmsg: &str) -> serde_json::Value {
        json!({
            "errcode": errcode,
            "errmsg": errmsg
        })
    }

    /// A "successful" answer that lacks the openid.
    pub fn without_openid() -> serde_json::Value {
        json!({
            "session_key": "tiihtNczf5v6AKRyjwEUhQ=="
        })
    }
}
