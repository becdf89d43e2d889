// src/models/cart.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Dono do carrinho: o próprio varejista, ou um vendedor agindo por ele.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartScope {
    pub retailer_id: Uuid,
    pub salesman_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: Uuid,
    pub retailer_id: Uuid,
    pub salesman_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Linha do carrinho junto com os dados atuais do produto necessários para
/// exibição e checkout.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: Uuid,
    pub product_name: String,
    pub wholesaler_id: Uuid,
    pub quantity: i32,
    /// Preço congelado no momento do add/update
    pub unit_price: Decimal,
    pub tax_percentage: Decimal,
    pub added_at: DateTime<Utc>,
}

impl CartLine {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartLineView {
    #[serde(flatten)]
    pub line: CartLine,
    pub line_total: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub cart_id: Uuid,
    pub retailer_id: Uuid,
    pub salesman_id: Option<Uuid>,
    pub items: Vec<CartLineView>,
    pub subtotal: Decimal,
    /// Estimativa com a alíquota atual de cada produto
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
}
