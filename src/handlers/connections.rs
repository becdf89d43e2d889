// src/handlers/connections.rs

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
    models::connection::{Connection, ConnectionStatusResponse},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestConnectionPayload {
    pub wholesaler_id: Uuid,

    #[validate(length(max = 500, message = "A mensagem deve ter no máximo 500 caracteres."))]
    #[schema(example = "Gostaríamos de comprar de vocês.")]
    pub message: Option<String>,
}

// POST /api/connections
#[utoipa::path(
    post,
    path = "/api/connections",
    tag = "Connections",
    request_body = RequestConnectionPayload,
    responses(
        (status = 201, description = "Pedido de conexão criado (ou reaberto)", body = Connection),
        (status = 409, description = "Já existe conexão para o par")
    ),
    security(("api_jwt" = []))
)]
pub async fn request_connection(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedActor(actor): AuthenticatedActor,
    Json(payload): Json<RequestConnectionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let connection = app_state
        .connection_service
        .request_connection(&actor, payload.wholesaler_id, payload.message.as_deref())
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(connection)))
}

// GET /api/connections
#[utoipa::path(
    get,
    path = "/api/connections",
    tag = "Connections",
    responses(
        (status = 200, description = "Conexões visíveis ao usuário", body = Vec<Connection>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_connections(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedActor(actor): AuthenticatedActor,
) -> Result<impl IntoResponse, ApiError> {
    let connections = app_state
        .connection_service
        .list(&actor)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(connections))
}

// GET /api/connections/status/{counterpart_id}
#[utoipa::path(
    get,
    path = "/api/connections/status/{counterpart_id}",
    tag = "Connections",
    responses(
        (status = 200, description = "Status da conexão com a outra ponta", body = ConnectionStatusResponse)
    ),
    params(("counterpart_id" = Uuid, Path, description = "Atacadista (para varejistas) ou varejista (para atacadistas)")),
    security(("api_jwt" = []))
)]
pub async fn connection_status(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(counterpart_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let (wholesaler_id, retailer_id, status) = app_state
        .connection_service
        .status_for(&actor, counterpart_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(ConnectionStatusResponse {
        wholesaler_id,
        retailer_id,
        status,
    }))
}

// POST /api/connections/{connection_id}/approve
#[utoipa::path(
    post,
    path = "/api/connections/{connection_id}/approve",
    tag = "Connections",
    responses(
        (status = 200, description = "Conexão aprovada", body = Connection),
        (status = 409, description = "Transição inválida")
    ),
    params(("connection_id" = Uuid, Path, description = "ID da conexão")),
    security(("api_jwt" = []))
)]
pub async fn approve_connection(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(connection_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let connection = app_state
        .connection_service
        .approve(&actor, connection_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(connection))
}

// POST /api/connections/{connection_id}/reject
#[utoipa::path(
    post,
    path = "/api/connections/{connection_id}/reject",
    tag = "Connections",
    responses(
        (status = 200, description = "Conexão rejeitada", body = Connection),
        (status = 409, description = "Transição inválida")
    ),
    params(("connection_id" = Uuid, Path, description = "ID da conexão")),
    security(("api_jwt" = []))
)]
pub async fn reject_connection(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(connection_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let connection = app_state
        .connection_service
        .reject(&actor, connection_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(connection))
}

// DELETE /api/connections/{connection_id}
#[utoipa::path(
    delete,
    path = "/api/connections/{connection_id}",
    tag = "Connections",
    responses(
        (status = 204, description = "Conexão removida"),
        (status = 403, description = "Sem permissão para remover")
    ),
    params(("connection_id" = Uuid, Path, description = "ID da conexão")),
    security(("api_jwt" = []))
)]
pub async fn delete_connection(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(connection_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .connection_service
        .delete(&actor, connection_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(StatusCode::NO_CONTENT)
}
