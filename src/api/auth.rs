//! Account endpoints under `/auth`

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::marketplace::{NewAccount, ProfileBody, ProfileUpdate, PublicUser};
use crate::state::SharedState;
use crate::{OnTymError, Result};

/// Registration body: account fields plus the role-tagged profile, flat
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(flatten)]
    pub profile: ProfileBody,
}

impl From<RegisterRequest> for NewAccount {
    fn from(request: RegisterRequest) -> Self {
        Self {
            username: request.username,
            email: request.email,
            password: request.password,
            phone_number: request.phone_number,
            profile: request.profile.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountFields {
    username: Option<String>,
    phone_number: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub message: &'static str,
    pub user: PublicUser,
}

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/profile/{user_id}", get(profile).put(update_profile))
}

async fn register(
    State(state): State<SharedState>,
    payload: std::result::Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AccountResponse>)> {
    let Json(request) = payload?;
    let user = state.accounts.register(request.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(AccountResponse {
            message: "User registered successfully",
            user: user.into(),
        }),
    ))
}

async fn login(
    State(state): State<SharedState>,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AccountResponse>> {
    let Json(request) = payload?;
    let user = state.accounts.login(&request.email, &request.password).await?;
    Ok(Json(AccountResponse {
        message: "Logged in successfully",
        user: user.into(),
    }))
}

async fn profile(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
) -> Result<Json<PublicUser>> {
    let user = state.accounts.get(&user_id).await?;
    Ok(Json(user.into()))
}

/// Split a partial update body. Profile fields are only read when `role` is present.
fn parse_profile_update(body: Value) -> Result<ProfileUpdate> {
    let fields: AccountFields = serde_json::from_value(body.clone())
        .map_err(|e| OnTymError::validation(e.to_string()))?;

    let profile = match body.get("role") {
        Some(_) => {
            let profile: ProfileBody = serde_json::from_value(body)
                .map_err(|e| OnTymError::validation(e.to_string()))?;
            Some(profile.into())
        }
        None => None,
    };

    Ok(ProfileUpdate {
        username: fields.username,
        phone_number: fields.phone_number,
        profile,
    })
}

async fn update_profile(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<AccountResponse>> {
    let Json(body) = payload?;
    let update = parse_profile_update(body)?;
    let user = state.accounts.update_profile(&user_id, update).await?;
    Ok(Json(AccountResponse {
        message: "Profile updated successfully",
        user: user.into(),
    }))
}
