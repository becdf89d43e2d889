// src/handlers/orders.rs

use axum::{
    extract::{Path, Query, State},
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
    models::orders::{Order, OrderDetail, OrderFilter, OrderStatus, PaymentStatus, PaymentTerms},
    services::order_service::PlaceOrderInput,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderPayload {
    /// Obrigatório para vendedores
    pub retailer_id: Option<Uuid>,

    #[validate(length(min = 1, message = "O endereço de entrega é obrigatório."))]
    #[schema(example = "Rua das Flores, 100 - Centro")]
    pub delivery_address: String,

    pub notes: Option<String>,

    #[serde(default)]
    pub payment_terms: PaymentTerms,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusPayload {
    #[schema(example = "confirmed")]
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePaymentPayload {
    #[schema(example = "paid")]
    pub payment_status: PaymentStatus,
}

// POST /api/orders
#[utoipa::path(
    post,
    path = "/api/orders",
    tag = "Orders",
    request_body = PlaceOrderPayload,
    responses(
        (status = 201, description = "Um pedido por atacadista do carrinho", body = Vec<OrderDetail>),
        (status = 422, description = "Carrinho vazio ou estoque insuficiente"),
        (status = 403, description = "Sem conexão aprovada")
    ),
    security(("api_jwt" = []))
)]
pub async fn place_order(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedActor(actor): AuthenticatedActor,
    Json(payload): Json<PlaceOrderPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let input = PlaceOrderInput {
        retailer_id: payload.retailer_id,
        delivery_address: payload.delivery_address,
        notes: payload.notes,
        payment_terms: payload.payment_terms,
    };

    let orders = app_state
        .order_service
        .place_order(&actor, &input)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(orders)))
}

// GET /api/orders
#[utoipa::path(
    get,
    path = "/api/orders",
    tag = "Orders",
    params(OrderFilter),
    responses((status = 200, description = "Pedidos visíveis ao usuário", body = Vec<Order>)),
    security(("api_jwt" = []))
)]
pub async fn list_orders(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedActor(actor): AuthenticatedActor,
    Query(filter): Query<OrderFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let orders = app_state
        .order_service
        .list_orders(&actor, filter.status)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(orders))
}

// GET /api/orders/{order_id}
#[utoipa::path(
    get,
    path = "/api/orders/{order_id}",
    tag = "Orders",
    responses(
        (status = 200, description = "Pedido com itens", body = OrderDetail),
        (status = 404, description = "Pedido não encontrado")
    ),
    params(("order_id" = Uuid, Path, description = "ID do pedido")),
    security(("api_jwt" = []))
)]
pub async fn get_order(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let order = app_state
        .order_service
        .get_order(&actor, order_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(order))
}

// POST /api/orders/{order_id}/cancel
#[utoipa::path(
    post,
    path = "/api/orders/{order_id}/cancel",
    tag = "Orders",
    responses(
        (status = 200, description = "Pedido cancelado e estoque devolvido", body = Order),
        (status = 409, description = "Só pedidos pendentes podem ser cancelados")
    ),
    params(("order_id" = Uuid, Path, description = "ID do pedido")),
    security(("api_jwt" = []))
)]
pub async fn cancel_order(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let order = app_state
        .order_service
        .cancel_order(&actor, order_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(order))
}

// PATCH /api/orders/{order_id}/status
#[utoipa::path(
    patch,
    path = "/api/orders/{order_id}/status",
    tag = "Orders",
    request_body = UpdateStatusPayload,
    responses(
        (status = 200, description = "Status avançado", body = Order),
        (status = 409, description = "Transição inválida")
    ),
    params(("order_id" = Uuid, Path, description = "ID do pedido")),
    security(("api_jwt" = []))
)]
pub async fn update_status(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<UpdateStatusPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let order = app_state
        .order_service
        .update_status(&actor, order_id, payload.status)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(order))
}

// PATCH /api/orders/{order_id}/payment
#[utoipa::path(
    patch,
    path = "/api/orders/{order_id}/payment",
    tag = "Orders",
    request_body = UpdatePaymentPayload,
    responses((status = 200, description = "Status de pagamento atualizado", body = Order)),
    params(("order_id" = Uuid, Path, description = "ID do pedido")),
    security(("api_jwt" = []))
)]
pub async fn update_payment_status(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<UpdatePaymentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let order = app_state
        .order_service
        .update_payment_status(&actor, order_id, payload.payment_status)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(order))
}
