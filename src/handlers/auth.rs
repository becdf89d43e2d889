// src/handlers/auth.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedActor, i18n::Locale},
    models::auth::{AuthResponse, LoginPayload, Profile, RegisterRetailerPayload, RegisterWholesalerPayload},
};

// POST /api/auth/register/wholesaler
#[utoipa::path(
    post,
    path = "/api/auth/register/wholesaler",
    tag = "Auth",
    request_body = RegisterWholesalerPayload,
    responses(
        (status = 201, description = "Atacadista cadastrado", body = AuthResponse),
        (status = 409, description = "E-mail já cadastrado")
    )
)]
pub async fn register_wholesaler(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<RegisterWholesalerPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let response = app_state
        .auth_service
        .register_wholesaler(&payload)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(response)))
}

// POST /api/auth/register/retailer
#[utoipa::path(
    post,
    path = "/api/auth/register/retailer",
    tag = "Auth",
    request_body = RegisterRetailerPayload,
    responses(
        (status = 201, description = "Varejista cadastrado", body = AuthResponse),
        (status = 409, description = "E-mail já cadastrado")
    )
)]
pub async fn register_retailer(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<RegisterRetailerPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let response = app_state
        .auth_service
        .register_retailer(&payload)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(response)))
}

// POST /api/auth/login
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginPayload,
    responses(
        (status = 200, description = "Login efetuado", body = AuthResponse),
        (status = 401, description = "Credenciais inválidas")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<LoginPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let response = app_state
        .auth_service
        .login(&payload)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(response)))
}

// GET /api/me
#[utoipa::path(
    get,
    path = "/api/me",
    tag = "Users",
    responses(
        (status = 200, description = "Perfil do usuário autenticado", body = Profile)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_me(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedActor(actor): AuthenticatedActor,
) -> Result<impl IntoResponse, ApiError> {
    let profile = app_state
        .auth_service
        .profile(&actor)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(profile))
}
