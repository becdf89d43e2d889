// src/handlers/team.rs
//
// Equipe do atacadista: vendedores e varejistas cadastrados por ele.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedActor, i18n::Locale},
    models::{
        auth::{CreateSalesmanPayload, RegisterRetailerPayload, Retailer, Salesman, SalesmanPermissions},
        connection::{ConnectedRetailer, Connection},
    },
};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetActivePayload {
    #[schema(example = false)]
    pub is_active: bool,
}

// =============================================================================
//  VENDEDORES
// =============================================================================

// POST /api/salesmen
#[utoipa::path(
    post,
    path = "/api/salesmen",
    tag = "Team",
    request_body = CreateSalesmanPayload,
    responses(
        (status = 201, description = "Vendedor criado", body = Salesman),
        (status = 403, description = "Apenas o atacadista gerencia vendedores")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_salesman(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedActor(actor): AuthenticatedActor,
    Json(payload): Json<CreateSalesmanPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let salesman = app_state
        .account_service
        .create_salesman(&actor, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(salesman)))
}

// GET /api/salesmen
#[utoipa::path(
    get,
    path = "/api/salesmen",
    tag = "Team",
    responses(
        (status = 200, description = "Vendedores do atacadista", body = Vec<Salesman>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_salesmen(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedActor(actor): AuthenticatedActor,
) -> Result<impl IntoResponse, ApiError> {
    let salesmen = app_state
        .account_service
        .list_salesmen(&actor)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(salesmen))
}

// PUT /api/salesmen/{salesman_id}/permissions
#[utoipa::path(
    put,
    path = "/api/salesmen/{salesman_id}/permissions",
    tag = "Team",
    request_body = SalesmanPermissions,
    responses(
        (status = 200, description = "Permissões atualizadas", body = Salesman),
        (status = 404, description = "Vendedor não encontrado")
    ),
    params(("salesman_id" = Uuid, Path, description = "ID do vendedor")),
    security(("api_jwt" = []))
)]
pub async fn update_salesman_permissions(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(salesman_id): Path<Uuid>,
    Json(permissions): Json<SalesmanPermissions>,
) -> Result<impl IntoResponse, ApiError> {
    let salesman = app_state
        .account_service
        .update_salesman_permissions(&actor, salesman_id, &permissions)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(salesman))
}

// PATCH /api/salesmen/{salesman_id}/active
#[utoipa::path(
    patch,
    path = "/api/salesmen/{salesman_id}/active",
    tag = "Team",
    request_body = SetActivePayload,
    responses(
        (status = 200, description = "Vendedor (des)ativado", body = Salesman)
    ),
    params(("salesman_id" = Uuid, Path, description = "ID do vendedor")),
    security(("api_jwt" = []))
)]
pub async fn set_salesman_active(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(salesman_id): Path<Uuid>,
    Json(payload): Json<SetActivePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let salesman = app_state
        .account_service
        .set_salesman_active(&actor, salesman_id, payload.is_active)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(salesman))
}

// =============================================================================
//  VAREJISTAS
// =============================================================================

// POST /api/retailers
#[utoipa::path(
    post,
    path = "/api/retailers",
    tag = "Team",
    request_body = RegisterRetailerPayload,
    responses(
        (status = 201, description = "Varejista cadastrado e já conectado", body = Retailer),
        (status = 403, description = "Sem permissão para cadastrar varejistas")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_retailer(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedActor(actor): AuthenticatedActor,
    Json(payload): Json<RegisterRetailerPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let retailer = app_state
        .account_service
        .create_retailer_for_wholesaler(&actor, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(retailer)))
}

// GET /api/retailers
#[utoipa::path(
    get,
    path = "/api/retailers",
    tag = "Team",
    responses(
        (status = 200, description = "Varejistas com conexão ao atacadista", body = Vec<ConnectedRetailer>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_retailers(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedActor(actor): AuthenticatedActor,
) -> Result<impl IntoResponse, ApiError> {
    let retailers = app_state
        .account_service
        .list_retailers(&actor)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(retailers))
}

// POST /api/retailers/{retailer_id}/connect
#[utoipa::path(
    post,
    path = "/api/retailers/{retailer_id}/connect",
    tag = "Team",
    responses(
        (status = 200, description = "Conexão aprovada com um varejista existente", body = Connection)
    ),
    params(("retailer_id" = Uuid, Path, description = "ID do varejista")),
    security(("api_jwt" = []))
)]
pub async fn connect_retailer(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(retailer_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let connection = app_state
        .connection_service
        .connect_existing_retailer(&actor, retailer_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(connection))
}
