// src/models/catalog.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

// --- Unidade de venda ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "unit_type", rename_all = "lowercase")] // Banco
#[serde(rename_all = "lowercase")] // JSON
pub enum UnitType {
    Piece,
    Box,
    Carton,
    Kg,
    Liter,
    Meter,
}

// --- Categorias (globais) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

// --- Marcas (por atacadista) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Brand {
    pub id: Uuid,
    pub wholesaler_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Faixa de preço por quantidade. `max_quantity = None` significa "sem limite".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PricingTier {
    #[schema(example = 10)]
    pub min_quantity: i32,
    #[schema(example = 49)]
    pub max_quantity: Option<i32>,
    #[schema(example = "9.00")]
    pub price_per_unit: Decimal,
}

impl PricingTier {
    pub fn matches(&self, quantity: i32) -> bool {
        quantity >= self.min_quantity && self.max_quantity.is_none_or(|max| quantity <= max)
    }
}

// --- Produto ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub wholesaler_id: Uuid,
    pub category_id: Uuid,
    pub brand_id: Option<Uuid>,
    #[schema(ignore)]
    #[serde(skip_serializing)]
    pub created_by_salesman: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub unit_type: UnitType,
    #[schema(example = 10)]
    pub min_order_quantity: i32,
    #[schema(example = 100)]
    pub stock_quantity: i32,
    #[schema(example = "10.00")]
    pub base_price: Decimal,
    #[schema(example = "18")]
    pub tax_percentage: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    // Preenchidos pelo repositório, não vêm da linha de `products`
    #[sqlx(skip)]
    pub pricing_tiers: Vec<PricingTier>,
    #[sqlx(skip)]
    pub brand: Option<BrandSummary>,
}

/// Metadados da marca anexados na leitura (etapa explícita de enriquecimento).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BrandSummary {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

/// Filtros de listagem do catálogo.
#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ProductFilter {
    pub category_id: Option<Uuid>,
    pub brand_id: Option<Uuid>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl ProductFilter {
    pub const DEFAULT_LIMIT: i64 = 20;
    pub const MAX_LIMIT: i64 = 100;

    /// (limit, offset) normalizados.
    pub fn pagination(&self) -> (i64, i64) {
        let limit = self
            .limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT);
        let page = self.page.unwrap_or(1).max(1);
        (limit, (page - 1).saturating_mul(limit))
    }
}

/// Cotação de preço sem tocar no carrinho.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_range_is_inclusive_and_open_ended() {
        let bounded = PricingTier {
            min_quantity: 10,
            max_quantity: Some(49),
            price_per_unit: Decimal::new(900, 2),
        };
        assert!(!bounded.matches(9));
        assert!(bounded.matches(10));
        assert!(bounded.matches(49));
        assert!(!bounded.matches(50));

        let open = PricingTier {
            min_quantity: 50,
            max_quantity: None,
            price_per_unit: Decimal::new(800, 2),
        };
        assert!(open.matches(50));
        assert!(open.matches(1_000_000));
    }

    #[test]
    fn pagination_is_clamped() {
        let filter = ProductFilter {
            page: Some(0),
            limit: Some(500),
            ..Default::default()
        };
        assert_eq!(filter.pagination(), (100, 0));

        let filter = ProductFilter {
            page: Some(3),
            ..Default::default()
        };
        assert_eq!(filter.pagination(), (20, 40));
    }

    #[test]
    fn huge_page_saturates_the_offset() {
        let filter = ProductFilter {
            page: Some(i64::MAX),
            limit: Some(100),
            ..Default::default()
        };
        assert_eq!(filter.pagination(), (100, i64::MAX));
    }
}
