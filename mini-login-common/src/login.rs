//! Mini-program login request and response types.

use serde::{Deserialize, Deserializer, Serialize};
use validator::{Validate, ValidationError};

/// Longest authorization code accepted.
pub const MAX_CODE_LENGTH: u64 = 100;
/// Longest nickname accepted, matching the `nickname` column.
pub const MAX_NICKNAME_LENGTH: u64 = 100;
/// Longest avatar URL accepted, matching the `avatar_url` column.
pub const MAX_AVATAR_URL_LENGTH: u64 = 200;

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }

    Ok(())
}

/// Incoming strings lose surrounding whitespace before any rule runs, so
/// length limits apply to the trimmed value and `"  "` counts as blank.
fn trimmed<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.map(|s| s.trim().to_string()))
}

/// Body of `POST /user/wechat/mini/login`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    /// Temporary credential from `wx.login()`, valid for five minutes.
    #[validate(
        required(message = "This field is required."),
        custom(function = "not_blank", message = "This field may not be blank."),
        length(max = MAX_CODE_LENGTH, message = "Ensure this field has no more than 100 characters.")
    )]
    #[serde(default, deserialize_with = "trimmed")]
    pub code: Option<String>,
    #[validate(nested)]
    #[serde(default, rename = "userInfo", skip_serializing_if = "Option::is_none")]
    pub user_info: Option<UserInfo>,
}

/// Optional profile the client may send along with the code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct UserInfo {
    #[validate(
        custom(function = "not_blank", message = "This field may not be blank."),
        length(max = MAX_NICKNAME_LENGTH, message = "Ensure this field has no more than 100 characters.")
    )]
    #[serde(default, rename = "nickName", deserialize_with = "trimmed", skip_serializing_if = "Option::is_none")]
    pub nick_name: Option<String>,
    #[validate(
        url(message = "Enter a valid URL."),
        length(max = MAX_AVATAR_URL_LENGTH, message = "Ensure this field has no more than 200 characters.")
    )]
    #[serde(default, rename = "avatarUrl", deserialize_with = "trimmed", skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// `data` of a successful login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginData {
    pub token: String,
    #[serde(rename = "userInfo")]
    pub user_info: UserProfile,
}

/// Public view of a stored user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub nickname: Option<String>,
    #[serde(rename = "avatarUrl")]
    pub avatar_url: Option<String>,
    pub openid: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: &str) -> LoginRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_login_request_code_only() {
        let req = request(r#"{"code": "081abc"}"#);
        assert_eq!(req.code.as_deref(), Some("081abc"));
        assert!(req.user_info.is_none());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_login_request_with_user_info() {
        let req = request(
            r#"{"code": "081abc", "userInfo": {"nickName": "Alice", "avatarUrl": "https://thirdwx.qlogo.cn/a/132", "gender": "1"}}"#,
        );
        let info = req.user_info.clone().unwrap();
        assert_eq!(info.nick_name.as_deref(), Some("Alice"));
        assert_eq!(info.avatar_url.as_deref(), Some("https://thirdwx.qlogo.cn/a/132"));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_missing_code_is_rejected() {
        let errors = request("{}").validate().unwrap_err();
        assert!(errors.field_errors().contains_key("code"));
    }

    #[test]
    fn test_blank_code_is_rejected() {
        let errors = request(r#"{"code": "   "}"#).validate().unwrap_err();
        let code_errors = &errors.field_errors()["code"];
        assert_eq!(code_errors.len(), 1);
    }

    #[test]
    fn test_strings_are_trimmed() {
        let req = request(
            r#"{"code": "  081abc\n", "userInfo": {"nickName": "  Alice  ", "avatarUrl": " https://thirdwx.qlogo.cn/a/132 "}}"#,
        );
        assert_eq!(req.code.as_deref(), Some("081abc"));
        let info = req.user_info.clone().unwrap();
        assert_eq!(info.nick_name.as_deref(), Some("Alice"));
        assert_eq!(info.avatar_url.as_deref(), Some("https://thirdwx.qlogo.cn/a/132"));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_length_is_checked_after_trimming() {
        let padded = format!("  {}  ", "x".repeat(100));
        let req = request(&serde_json::json!({ "code": padded }).to_string());
        assert_eq!(req.code.as_ref().map(String::len), Some(100));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_null_fields_deserialize_as_absent() {
        let req = request(r#"{"code": null, "userInfo": {"nickName": null}}"#);
        assert!(req.code.is_none());
        assert_eq!(req.user_info, Some(UserInfo::default()));
    }

    #[test]
    fn test_overlong_code_is_rejected() {
        let req = LoginRequest {
            code: Some("x".repeat(101)),
            user_info: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_invalid_avatar_url_is_rejected() {
        let req = request(r#"{"code": "c", "userInfo": {"avatarUrl": "not a url"}}"#);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_empty_user_info_is_valid() {
        let req = request(r#"{"code": "c", "userInfo": {}}"#);
        assert_eq!(req.user_info, Some(UserInfo::default()));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_user_profile_serializes_nulls() {
        let profile = UserProfile {
            id: 7,
            nickname: None,
            avatar_url: None,
            openid: "abc123".to_string(),
        };
        let json = serde_json::to_string(&profile).unwrap();
        assert_eq!(json, r#"{"id":7,"nickname":null,"avatarUrl":null,"openid":"abc123"}"#);
    }
}
