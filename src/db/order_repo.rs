// src/db/order_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::{conflict_on_unique, AppError},
    models::orders::{Order, OrderItem, OrderStatus, PaymentStatus, PaymentTerms},
};

/// Cabeçalho de um pedido ainda não persistido.
#[derive(Debug, Clone)]
pub struct NewOrder<'a> {
    pub order_number: &'a str,
    pub retailer_id: Uuid,
    pub wholesaler_id: Uuid,
    pub salesman_id: Option<Uuid>,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub delivery_address: &'a str,
    pub notes: Option<&'a str>,
    pub payment_terms: PaymentTerms,
}

/// Quem pode ver quais pedidos.
#[derive(Debug, Clone, Copy)]
pub enum OrderVisibility {
    Retailer(Uuid),
    Wholesaler(Uuid),
    PlacedBy { wholesaler_id: Uuid, salesman_id: Uuid },
}

#[derive(Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Próximo número da sequência diária. O upsert é atômico: duas chamadas
    /// concorrentes no mesmo dia nunca recebem o mesmo valor.
    pub async fn next_daily_sequence<'e, E>(&self, executor: E, day: NaiveDate) -> Result<i32, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sequence: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO order_counters (day, last_sequence)
            VALUES ($1, 1)
            ON CONFLICT (day) DO UPDATE SET last_sequence = order_counters.last_sequence + 1
            RETURNING last_sequence
            "#,
        )
        .bind(day)
        .fetch_one(executor)
        .await?;
        Ok(sequence)
    }

    pub async fn insert_order<'e, E>(&self, executor: E, order: &NewOrder<'_>) -> Result<Order, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (
                order_number, retailer_id, wholesaler_id, salesman_id,
                subtotal, tax_amount, total_amount, delivery_address, notes, payment_terms
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(order.order_number)
        .bind(order.retailer_id)
        .bind(order.wholesaler_id)
        .bind(order.salesman_id)
        .bind(order.subtotal)
        .bind(order.tax_amount)
        .bind(order.total_amount)
        .bind(order.delivery_address)
        .bind(order.notes)
        .bind(order.payment_terms)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            let number = order.order_number.to_string();
            conflict_on_unique(e, move || format!("Order number {number} already exists."))
        })
    }

    pub async fn insert_item<'e, E>(&self, executor: E, order_id: Uuid, item: &OrderItem) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO order_items (order_id, product_id, product_name, quantity, unit_price, tax_amount, line_total)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(order_id)
        .bind(item.product_id)
        .bind(&item.product_name)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(item.tax_amount)
        .bind(item.line_total)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn find<'e, E>(&self, executor: E, order_id: Uuid) -> Result<Option<Order>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
            .bind(order_id)
            .fetch_optional(executor)
            .await?;
        Ok(order)
    }

    pub async fn items<'e, E>(&self, executor: E, order_id: Uuid) -> Result<Vec<OrderItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT product_id, product_name, quantity, unit_price, tax_amount, line_total
            FROM order_items WHERE order_id = $1 ORDER BY id ASC
            "#,
        )
        .bind(order_id)
        .fetch_all(executor)
        .await?;
        Ok(items)
    }

    pub async fn list(
        &self,
        visibility: OrderVisibility,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, AppError> {
        let (retailer_id, wholesaler_id, salesman_id) = match visibility {
            OrderVisibility::Retailer(id) => (Some(id), None, None),
            OrderVisibility::Wholesaler(id) => (None, Some(id), None),
            OrderVisibility::PlacedBy { wholesaler_id, salesman_id } => {
                (None, Some(wholesaler_id), Some(salesman_id))
            }
        };

        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT * FROM orders
            WHERE ($1::uuid IS NULL OR retailer_id = $1)
              AND ($2::uuid IS NULL OR wholesaler_id = $2)
              AND ($3::uuid IS NULL OR salesman_id = $3)
              AND ($4::order_status IS NULL OR status = $4)
            ORDER BY created_at DESC
            "#,
        )
        .bind(retailer_id)
        .bind(wholesaler_id)
        .bind(salesman_id)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(orders)
    }

    /// Compare-and-set do status: só muda se o status atual estiver em `from`.
    pub async fn transition_status<'e, E>(
        &self,
        executor: E,
        order_id: Uuid,
        from: &[OrderStatus],
        to: OrderStatus,
    ) -> Result<Option<Order>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = ANY($2)
            RETURNING *
            "#,
        )
        .bind(order_id)
        .bind(from)
        .bind(to)
        .fetch_optional(executor)
        .await?;
        Ok(order)
    }

    pub async fn set_payment_status(
        &self,
        order_id: Uuid,
        payment_status: PaymentStatus,
    ) -> Result<Option<Order>, AppError> {
        let order = sqlx::query_as::<_, Order>(
            "UPDATE orders SET payment_status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(order_id)
        .bind(payment_status)
        .fetch_optional(&self.pool)
        .await?;
        Ok(order)
    }
}
