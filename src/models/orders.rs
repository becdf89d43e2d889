// src/models/orders.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

// --- Enums ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Posição na esteira de atendimento. `Cancelled` está fora dela.
    fn fulfillment_rank(self) -> Option<u8> {
        match self {
            OrderStatus::Pending => Some(0),
            OrderStatus::Confirmed => Some(1),
            OrderStatus::Processing => Some(2),
            OrderStatus::Shipped => Some(3),
            OrderStatus::Delivered => Some(4),
            OrderStatus::Cancelled => None,
        }
    }

    /// Avanço conduzido pelo atacadista: apenas para frente, nunca para `Cancelled`.
    pub fn can_advance_to(self, next: OrderStatus) -> bool {
        match (self.fulfillment_rank(), next.fulfillment_rank()) {
            (Some(current), Some(target)) => target > current,
            _ => false,
        }
    }

    pub fn can_cancel(self) -> bool {
        self == OrderStatus::Pending
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    PartiallyPaid,
    Refunded,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_terms", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentTerms {
    #[default]
    Immediate,
    Net15,
    Net30,
    Net60,
}

// --- Structs ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    #[schema(example = "ORD2510190001")]
    pub order_number: String,
    pub retailer_id: Uuid,
    pub wholesaler_id: Uuid,
    pub salesman_id: Option<Uuid>,
    #[schema(example = "90.00")]
    pub subtotal: Decimal,
    #[schema(example = "16.20")]
    pub tax_amount: Decimal,
    #[schema(example = "106.20")]
    pub total_amount: Decimal,
    pub delivery_address: String,
    pub notes: Option<String>,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_terms: PaymentTerms,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Snapshot congelado de uma linha do pedido.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub tax_amount: Decimal,
    pub line_total: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    #[serde(flatten)]
    pub header: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
}

#[cfg(test)]
mod tests {
    use super::OrderStatus::*;

    #[test]
    fn fulfillment_moves_forward_only() {
        assert!(Pending.can_advance_to(Confirmed));
        assert!(Confirmed.can_advance_to(Processing));
        assert!(Processing.can_advance_to(Shipped));
        assert!(Shipped.can_advance_to(Delivered));
        assert!(Pending.can_advance_to(Shipped));

        assert!(!Shipped.can_advance_to(Confirmed));
        assert!(!Delivered.can_advance_to(Delivered));
        assert!(!Pending.can_advance_to(Pending));
    }

    #[test]
    fn cancelled_is_outside_the_fulfillment_path() {
        assert!(!Pending.can_advance_to(Cancelled));
        assert!(!Cancelled.can_advance_to(Confirmed));
    }

    #[test]
    fn only_pending_orders_can_be_cancelled() {
        assert!(Pending.can_cancel());
        for status in [Confirmed, Processing, Shipped, Delivered, Cancelled] {
            assert!(!status.can_cancel(), "{status:?}");
        }
    }
}
