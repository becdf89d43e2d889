// src/handlers/cart.rs
//
// O varejista usa o próprio carrinho; o vendedor informa `retailerId`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedActor, i18n::Locale},
    models::cart::CartView,
};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CartQuery {
    /// Obrigatório para vendedores
    pub retailer_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddCartItemPayload {
    pub retailer_id: Option<Uuid>,
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "A quantidade deve ser pelo menos 1."))]
    #[schema(example = 10)]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartItemPayload {
    pub retailer_id: Option<Uuid>,
    #[validate(range(min = 1, message = "A quantidade deve ser pelo menos 1."))]
    #[schema(example = 50)]
    pub quantity: i32,
}

// GET /api/cart
#[utoipa::path(
    get,
    path = "/api/cart",
    tag = "Cart",
    params(CartQuery),
    responses((status = 200, description = "Carrinho com totais", body = CartView)),
    security(("api_jwt" = []))
)]
pub async fn get_cart(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedActor(actor): AuthenticatedActor,
    Query(query): Query<CartQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let cart = app_state
        .cart_service
        .view(&actor, query.retailer_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(cart))
}

// POST /api/cart/items
#[utoipa::path(
    post,
    path = "/api/cart/items",
    tag = "Cart",
    request_body = AddCartItemPayload,
    responses(
        (status = 200, description = "Item adicionado (ou substituído)", body = CartView),
        (status = 422, description = "Quantidade inválida ou produto inativo"),
        (status = 403, description = "Sem conexão aprovada com o atacadista")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_item(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedActor(actor): AuthenticatedActor,
    Json(payload): Json<AddCartItemPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let cart = app_state
        .cart_service
        .add(&actor, payload.retailer_id, payload.product_id, payload.quantity)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(cart))
}

// PUT /api/cart/items/{product_id}
#[utoipa::path(
    put,
    path = "/api/cart/items/{product_id}",
    tag = "Cart",
    request_body = UpdateCartItemPayload,
    responses(
        (status = 200, description = "Quantidade atualizada", body = CartView),
        (status = 404, description = "Produto não está no carrinho")
    ),
    params(("product_id" = Uuid, Path, description = "ID do produto")),
    security(("api_jwt" = []))
)]
pub async fn update_item(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<UpdateCartItemPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let cart = app_state
        .cart_service
        .update(&actor, payload.retailer_id, product_id, payload.quantity)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(cart))
}

// DELETE /api/cart/items/{product_id}
#[utoipa::path(
    delete,
    path = "/api/cart/items/{product_id}",
    tag = "Cart",
    params(
        ("product_id" = Uuid, Path, description = "ID do produto"),
        CartQuery
    ),
    responses((status = 200, description = "Item removido", body = CartView)),
    security(("api_jwt" = []))
)]
pub async fn remove_item(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(product_id): Path<Uuid>,
    Query(query): Query<CartQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let cart = app_state
        .cart_service
        .remove(&actor, query.retailer_id, product_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(cart))
}

// DELETE /api/cart
#[utoipa::path(
    delete,
    path = "/api/cart",
    tag = "Cart",
    params(CartQuery),
    responses((status = 204, description = "Carrinho esvaziado")),
    security(("api_jwt" = []))
)]
pub async fn clear_cart(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedActor(actor): AuthenticatedActor,
    Query(query): Query<CartQuery>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .cart_service
        .clear(&actor, query.retailer_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(StatusCode::NO_CONTENT)
}
