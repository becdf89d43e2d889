// src/handlers/catalog.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedActor, i18n::Locale},
    models::catalog::{Brand, Category, PriceQuote, PricingTier, Product, ProductFilter, UnitType},
    services::{catalog_service::ProductInput, pricing},
};

// ---
// Validações customizadas
// ---
fn has_money_scale(val: &Decimal) -> bool {
    val.normalize().scale() <= pricing::MONEY_SCALE
}

/// Preço entre 0 e `MAX_MONEY`, com no máximo duas casas.
fn validate_money(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() || *val > pricing::MAX_MONEY || !has_money_scale(val) {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0.0);
        err.add_param("max".into(), &pricing::MAX_MONEY.to_string());
        err.message = Some("O valor deve estar entre 0 e 999999999999.99, com até duas casas decimais.".into());
        return Err(err);
    }
    Ok(())
}

fn validate_tax_percentage(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() || *val > Decimal::ONE_HUNDRED || !has_money_scale(val) {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0.0);
        err.add_param("max".into(), &100.0);
        err.message = Some("A alíquota deve estar entre 0 e 100.".into());
        return Err(err);
    }
    Ok(())
}

/// Pelo menos uma faixa; cada faixa com `min >= 1`, `max >= min` e preço válido.
/// A ordem é preservada como veio: a primeira faixa compatível vence.
fn validate_pricing_tiers(tiers: &[PricingTier]) -> Result<(), ValidationError> {
    if tiers.is_empty() {
        let mut err = ValidationError::new("tiers_required");
        err.message = Some("Informe pelo menos uma faixa de preço.".into());
        return Err(err);
    }
    for tier in tiers {
        let bad_range = tier.min_quantity < 1 || tier.max_quantity.is_some_and(|max| max < tier.min_quantity);
        if bad_range {
            let mut err = ValidationError::new("tier_range");
            err.message = Some("Faixa de quantidade inválida.".into());
            return Err(err);
        }
        if validate_money(&tier.price_per_unit).is_err() {
            let mut err = ValidationError::new("tier_price");
            err.message = Some("Preço da faixa fora do intervalo permitido.".into());
            return Err(err);
        }
    }
    Ok(())
}

// ---
// Payloads
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    #[schema(example = "Grãos")]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BrandPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    #[schema(example = "Tio João")]
    pub name: String,
    pub description: Option<String>,
    #[validate(url(message = "URL de imagem inválida."))]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductPayload {
    pub category_id: Uuid,
    pub brand_id: Option<Uuid>,

    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    #[schema(example = "Arroz 5kg")]
    pub name: String,

    pub description: Option<String>,

    pub unit_type: UnitType,

    #[validate(range(min = 1, message = "O pedido mínimo deve ser pelo menos 1."))]
    #[schema(example = 10)]
    pub min_order_quantity: i32,

    #[validate(custom(function = "validate_money"))]
    #[schema(example = "10.00")]
    pub base_price: Decimal,

    #[validate(custom(function = "validate_tax_percentage"))]
    #[schema(example = "18")]
    pub tax_percentage: Decimal,

    #[validate(custom(function = "validate_pricing_tiers"))]
    pub pricing_tiers: Vec<PricingTier>,
}

impl From<ProductPayload> for ProductInput {
    fn from(p: ProductPayload) -> Self {
        ProductInput {
            category_id: p.category_id,
            brand_id: p.brand_id,
            name: p.name,
            description: p.description,
            unit_type: p.unit_type,
            min_order_quantity: p.min_order_quantity,
            base_price: p.base_price,
            tax_percentage: p.tax_percentage,
            pricing_tiers: p.pricing_tiers,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductPayload {
    #[serde(flatten)]
    #[validate(nested)]
    pub product: ProductPayload,

    // Estoque inicial; depois disso só muda por ajuste (delta)
    #[serde(default)]
    #[validate(range(min = 0, message = "O estoque não pode ser negativo."))]
    #[schema(example = 100)]
    pub stock_quantity: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockAdjustmentPayload {
    /// Positivo para entrada, negativo para saída
    #[validate(range(
        min = -1_000_000_000,
        max = 1_000_000_000,
        message = "O ajuste deve estar entre -1000000000 e 1000000000."
    ))]
    #[schema(example = -5)]
    pub delta: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductActivePayload {
    pub is_active: bool,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct QuoteQuery {
    pub quantity: i32,
}

#[derive(Debug, serde::Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockResponse {
    pub product_id: Uuid,
    pub stock_quantity: i32,
}

// =============================================================================
//  CATEGORIAS
// =============================================================================

// POST /api/categories
#[utoipa::path(
    post,
    path = "/api/categories",
    tag = "Catalog",
    request_body = CategoryPayload,
    responses(
        (status = 201, description = "Categoria criada", body = Category),
        (status = 409, description = "Nome já existe")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_category(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedActor(actor): AuthenticatedActor,
    Json(payload): Json<CategoryPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let category = app_state
        .catalog_service
        .create_category(&actor, &payload.name, payload.description.as_deref())
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(category)))
}

// GET /api/categories
#[utoipa::path(
    get,
    path = "/api/categories",
    tag = "Catalog",
    responses((status = 200, description = "Categorias", body = Vec<Category>)),
    security(("api_jwt" = []))
)]
pub async fn list_categories(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let categories = app_state
        .catalog_service
        .list_categories()
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(categories))
}

// =============================================================================
//  MARCAS
// =============================================================================

// POST /api/brands
#[utoipa::path(
    post,
    path = "/api/brands",
    tag = "Catalog",
    request_body = BrandPayload,
    responses(
        (status = 201, description = "Marca criada", body = Brand),
        (status = 409, description = "Marca já existe para o atacadista")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_brand(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedActor(actor): AuthenticatedActor,
    Json(payload): Json<BrandPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let brand = app_state
        .catalog_service
        .create_brand(
            &actor,
            &payload.name,
            payload.description.as_deref(),
            payload.image_url.as_deref(),
        )
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(brand)))
}

// GET /api/brands
#[utoipa::path(
    get,
    path = "/api/brands",
    tag = "Catalog",
    responses((status = 200, description = "Marcas visíveis", body = Vec<Brand>)),
    security(("api_jwt" = []))
)]
pub async fn list_brands(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedActor(actor): AuthenticatedActor,
) -> Result<impl IntoResponse, ApiError> {
    let brands = app_state
        .catalog_service
        .list_brands(&actor)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(brands))
}

// =============================================================================
//  PRODUTOS
// =============================================================================

// POST /api/products
#[utoipa::path(
    post,
    path = "/api/products",
    tag = "Catalog",
    request_body = CreateProductPayload,
    responses(
        (status = 201, description = "Produto criado", body = Product),
        (status = 403, description = "Sem permissão para cadastrar produtos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_product(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedActor(actor): AuthenticatedActor,
    Json(payload): Json<CreateProductPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let stock_quantity = payload.stock_quantity;
    let input = ProductInput::from(payload.product);

    let product = app_state
        .catalog_service
        .create_product(&actor, &input, stock_quantity)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(product)))
}

// GET /api/products
#[utoipa::path(
    get,
    path = "/api/products",
    tag = "Catalog",
    params(ProductFilter),
    responses((status = 200, description = "Produtos visíveis ao usuário", body = Vec<Product>)),
    security(("api_jwt" = []))
)]
pub async fn list_products(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedActor(actor): AuthenticatedActor,
    Query(filter): Query<ProductFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let products = app_state
        .catalog_service
        .list_products(&actor, &filter)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(products))
}

// GET /api/products/{product_id}
#[utoipa::path(
    get,
    path = "/api/products/{product_id}",
    tag = "Catalog",
    responses(
        (status = 200, description = "Produto", body = Product),
        (status = 404, description = "Produto não encontrado ou não visível")
    ),
    params(("product_id" = Uuid, Path, description = "ID do produto")),
    security(("api_jwt" = []))
)]
pub async fn get_product(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let product = app_state
        .catalog_service
        .get_product(&actor, product_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(product))
}

// PUT /api/products/{product_id}
#[utoipa::path(
    put,
    path = "/api/products/{product_id}",
    tag = "Catalog",
    request_body = ProductPayload,
    responses((status = 200, description = "Produto atualizado", body = Product)),
    params(("product_id" = Uuid, Path, description = "ID do produto")),
    security(("api_jwt" = []))
)]
pub async fn update_product(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<ProductPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let input = ProductInput::from(payload);
    let product = app_state
        .catalog_service
        .update_product(&actor, product_id, &input)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(product))
}

// POST /api/products/{product_id}/stock
#[utoipa::path(
    post,
    path = "/api/products/{product_id}/stock",
    tag = "Catalog",
    request_body = StockAdjustmentPayload,
    responses(
        (status = 200, description = "Estoque ajustado", body = StockResponse),
        (status = 422, description = "O ajuste deixaria o estoque negativo")
    ),
    params(("product_id" = Uuid, Path, description = "ID do produto")),
    security(("api_jwt" = []))
)]
pub async fn adjust_stock(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<StockAdjustmentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let stock_quantity = app_state
        .catalog_service
        .adjust_stock(&actor, product_id, payload.delta)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(StockResponse {
        product_id,
        stock_quantity,
    }))
}

// PATCH /api/products/{product_id}/active
#[utoipa::path(
    patch,
    path = "/api/products/{product_id}/active",
    tag = "Catalog",
    request_body = ProductActivePayload,
    responses((status = 200, description = "Produto (des)ativado", body = Product)),
    params(("product_id" = Uuid, Path, description = "ID do produto")),
    security(("api_jwt" = []))
)]
pub async fn set_product_active(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<ProductActivePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let product = app_state
        .catalog_service
        .set_product_active(&actor, product_id, payload.is_active)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(product))
}

// DELETE /api/products/{product_id}
#[utoipa::path(
    delete,
    path = "/api/products/{product_id}",
    tag = "Catalog",
    responses(
        (status = 204, description = "Produto removido"),
        (status = 403, description = "Apenas o atacadista remove produtos")
    ),
    params(("product_id" = Uuid, Path, description = "ID do produto")),
    security(("api_jwt" = []))
)]
pub async fn delete_product(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .catalog_service
        .delete_product(&actor, product_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(StatusCode::NO_CONTENT)
}

// GET /api/products/{product_id}/quote?quantity=
#[utoipa::path(
    get,
    path = "/api/products/{product_id}/quote",
    tag = "Catalog",
    params(
        ("product_id" = Uuid, Path, description = "ID do produto"),
        QuoteQuery
    ),
    responses(
        (status = 200, description = "Preço da faixa e totais", body = PriceQuote),
        (status = 422, description = "Quantidade abaixo do mínimo ou acima do estoque")
    ),
    security(("api_jwt" = []))
)]
pub async fn quote_price(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(product_id): Path<Uuid>,
    Query(query): Query<QuoteQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let quote = app_state
        .catalog_service
        .quote_price(&actor, product_id, query.quantity)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(quote))
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn tier(min: i32, max: Option<i32>, price: &str) -> PricingTier {
        PricingTier {
            min_quantity: min,
            max_quantity: max,
            price_per_unit: Decimal::from_str(price).unwrap(),
        }
    }

    fn payload(tiers: Vec<PricingTier>) -> ProductPayload {
        ProductPayload {
            category_id: Uuid::new_v4(),
            brand_id: None,
            name: "Arroz 5kg".into(),
            description: None,
            unit_type: UnitType::Box,
            min_order_quantity: 10,
            base_price: Decimal::from(10),
            tax_percentage: Decimal::from(18),
            pricing_tiers: tiers,
        }
    }

    #[test]
    fn product_needs_at_least_one_tier() {
        assert!(payload(vec![]).validate().is_err());
        assert!(payload(vec![tier(10, Some(49), "9.00"), tier(50, None, "8.00")]).validate().is_ok());
    }

    #[test]
    fn tier_ranges_are_checked() {
        assert!(validate_pricing_tiers(&[tier(0, None, "1.00")]).is_err());
        assert!(validate_pricing_tiers(&[tier(10, Some(5), "1.00")]).is_err());
        assert!(validate_pricing_tiers(&[tier(10, Some(10), "1.00")]).is_ok());
        assert!(validate_pricing_tiers(&[tier(1, None, "-0.01")]).is_err());
    }

    #[test]
    fn tax_must_be_a_percentage() {
        assert!(validate_tax_percentage(&Decimal::ZERO).is_ok());
        assert!(validate_tax_percentage(&Decimal::ONE_HUNDRED).is_ok());
        assert!(validate_tax_percentage(&Decimal::from(101)).is_err());
        assert!(validate_tax_percentage(&Decimal::from(-1)).is_err());
    }

    #[test]
    fn create_payload_reads_flattened_product_fields() {
        let json = serde_json::json!({
            "categoryId": Uuid::new_v4(),
            "name": "Feijão 1kg",
            "unitType": "box",
            "minOrderQuantity": 5,
            "basePrice": 7.5,
            "taxPercentage": 5,
            "pricingTiers": [{ "minQuantity": 5, "maxQuantity": null, "pricePerUnit": 7.0 }],
            "stockQuantity": 40
        });
        let payload: CreateProductPayload = serde_json::from_value(json).unwrap();
        assert_eq!(payload.stock_quantity, 40);
        assert_eq!(payload.product.pricing_tiers.len(), 1);
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn prices_are_bounded_by_the_money_ceiling() {
        assert!(validate_money(&pricing::MAX_MONEY).is_ok());
        assert!(validate_money(&Decimal::from_str("7.50").unwrap()).is_ok());
        assert!(validate_money(&Decimal::from_str("50000000000000000000000000000").unwrap()).is_err());
        assert!(validate_money(&Decimal::from_str("1000000000000").unwrap()).is_err());
        assert!(validate_money(&Decimal::from_str("1.005").unwrap()).is_err());

        let mut huge = payload(vec![tier(10, None, "9.00")]);
        huge.base_price = Decimal::from_str("50000000000000000000000000000").unwrap();
        assert!(huge.validate().is_err());
        assert!(payload(vec![tier(10, None, "50000000000000000000000000000")]).validate().is_err());
    }

    #[test]
    fn stock_adjustment_is_range_checked() {
        assert!(StockAdjustmentPayload { delta: -5 }.validate().is_ok());
        assert!(StockAdjustmentPayload { delta: 1_000_000_000 }.validate().is_ok());
        assert!(StockAdjustmentPayload { delta: i32::MIN }.validate().is_err());
        assert!(StockAdjustmentPayload { delta: i32::MAX }.validate().is_err());
    }
}
