use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::instrument;
use utoipa::ToSchema;

use super::{ApiError, CurrentUser, ErrorBody};
use crate::auth::{AuthSession, AuthState, PublicUser};

#[derive(ToSchema, Deserialize, Debug)]
pub struct RegisterRequest {
    name: String,
    email: String,
    #[schema(value_type = String, format = Password)]
    password: SecretString,
}

#[derive(ToSchema, Deserialize, Debug)]
pub struct LoginRequest {
    email: String,
    #[schema(value_type = String, format = Password)]
    password: SecretString,
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created and logged in", body = AuthSession),
        (status = 400, description = "Email already registered or invalid input", body = ErrorBody),
    ),
    tag = "auth"
)]
#[instrument(skip(auth, payload))]
pub async fn register(
    auth: Extension<AuthState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<AuthSession>, ApiError> {
    let Json(request) = payload?;
    let session = auth
        .accounts
        .register(&request.name, &request.email, request.password.expose_secret())
        .await?;
    Ok(Json(session))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthSession),
        (status = 401, description = "Invalid email or password", body = ErrorBody),
    ),
    tag = "auth"
)]
#[instrument(skip(auth, payload))]
pub async fn login(
    auth: Extension<AuthState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthSession>, ApiError> {
    let Json(request) = payload?;
    let session = auth
        .accounts
        .login(&request.email, request.password.expose_secret())
        .await?;
    Ok(Json(session))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "The authenticated user", body = PublicUser),
        (status = 401, description = "Missing, malformed or expired credentials", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn me(CurrentUser(user): CurrentUser) -> Json<PublicUser> {
    Json(PublicUser::from(&user))
}
