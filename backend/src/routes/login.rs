//! Mini-program login: code exchange, user upsert, token.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use mini_login_common::{ApiResponse, LoginData, LoginRequest, UserProfile};
use validator::{ValidationError, ValidationErrors};

use crate::error::LoginError;
use crate::extract::Valid;
use crate::store::UserUpsert;
use crate::token::mint_token;
use crate::AppState;

pub const LOGIN_PATH: &str = "/user/wechat/mini/login";

fn missing_code() -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.add(
        "code",
        ValidationError::new("required").with_message("This field is required.".into()),
    );
    errors
}

/// POST /user/wechat/mini/login
///
/// Nothing is written when validation or the code exchange fails; the upsert
/// is the last fallible step.
async fn wechat_mini_login(
    State(state): State<Arc<AppState>>,
    Valid(request): Valid<LoginRequest>,
) -> Result<Json<ApiResponse<LoginData>>, LoginError> {
    let LoginRequest { code, user_info } = request;
    let Some(code) = code else {
        return Err(missing_code().into());
    };
    let user_info = user_info.unwrap_or_default();

    let identity = state.identity.exchange_code(&code).await?;
    tracing::debug!(
        provider = state.identity.provider_name(),
        has_unionid = identity.unionid.is_some(),
        "Login code exchanged"
    );

    let upsert = UserUpsert {
        openid: identity.openid,
        unionid: identity.unionid,
        nickname: user_info.nick_name,
        avatar_url: user_info.avatar_url,
    };
    let users = state.users.clone();
    let (user, created) = tokio::task::spawn_blocking(move || users.upsert_user(&upsert))
        .await
        .map_err(|e| LoginError::Persistence(e.to_string()))??;

    let token = mint_token(user.id, &user.openid);
    tracing::info!(user_id = user.id, created, "Login succeeded");

    Ok(Json(ApiResponse::success(
        "login succeeded",
        LoginData {
            token,
            user_info: UserProfile::from(&user),
        },
    )))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(LOGIN_PATH, post(wechat_mini_login))
        .route(&format!("{}/", LOGIN_PATH), post(wechat_mini_login))
        .with_state(state)
}
