// src/db/cart_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::cart::{Cart, CartLine, CartScope},
};

#[derive(Clone)]
pub struct CartRepository {
    pool: PgPool,
}

impl CartRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Devolve o carrinho do escopo, criando-o na primeira vez.
    /// O `ON CONFLICT` mantém "um carrinho por escopo" mesmo sob concorrência.
    pub async fn get_or_create(&self, scope: CartScope) -> Result<Cart, AppError> {
        let cart = sqlx::query_as::<_, Cart>(
            r#"
            INSERT INTO carts (retailer_id, salesman_id)
            VALUES ($1, $2)
            ON CONFLICT ON CONSTRAINT carts_scope_key
            DO UPDATE SET updated_at = carts.updated_at
            RETURNING *
            "#,
        )
        .bind(scope.retailer_id)
        .bind(scope.salesman_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(cart)
    }

    pub async fn find(&self, scope: CartScope) -> Result<Option<Cart>, AppError> {
        let cart = sqlx::query_as::<_, Cart>(
            "SELECT * FROM carts WHERE retailer_id = $1 AND salesman_id IS NOT DISTINCT FROM $2",
        )
        .bind(scope.retailer_id)
        .bind(scope.salesman_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(cart)
    }

    /// Insere a linha ou sobrescreve quantidade e preço (re-add idempotente).
    /// A posição original (id) é preservada no update.
    pub async fn upsert_line(
        &self,
        cart_id: Uuid,
        product_id: Uuid,
        quantity: i32,
        unit_price: Decimal,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO cart_items (cart_id, product_id, quantity, unit_price)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT ON CONSTRAINT cart_items_product_key
            DO UPDATE SET quantity = EXCLUDED.quantity, unit_price = EXCLUDED.unit_price
            "#,
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(quantity)
        .bind(unit_price)
        .execute(&self.pool)
        .await?;

        self.touch(cart_id).await
    }

    /// Atualiza uma linha existente; `false` quando o produto não está no carrinho.
    pub async fn update_line(
        &self,
        cart_id: Uuid,
        product_id: Uuid,
        quantity: i32,
        unit_price: Decimal,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE cart_items SET quantity = $3, unit_price = $4
            WHERE cart_id = $1 AND product_id = $2
            "#,
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(quantity)
        .bind(unit_price)
        .execute(&self.pool)
        .await?;

        self.touch(cart_id).await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn has_line(&self, cart_id: Uuid, product_id: Uuid) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM cart_items WHERE cart_id = $1 AND product_id = $2)",
        )
        .bind(cart_id)
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    pub async fn remove_line(&self, cart_id: Uuid, product_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND product_id = $2")
            .bind(cart_id)
            .bind(product_id)
            .execute(&self.pool)
            .await?;
        self.touch(cart_id).await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove todas as linhas, ou só as dos produtos informados.
    pub async fn clear<'e, E>(
        &self,
        executor: E,
        cart_id: Uuid,
        only_products: Option<&[Uuid]>,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "DELETE FROM cart_items WHERE cart_id = $1 AND ($2::uuid[] IS NULL OR product_id = ANY($2))",
        )
        .bind(cart_id)
        .bind(only_products)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn clear_all(&self, cart_id: Uuid) -> Result<u64, AppError> {
        let removed = self.clear(&self.pool, cart_id, None).await?;
        self.touch(cart_id).await?;
        Ok(removed)
    }

    /// Linhas em ordem de inserção, com os dados atuais do produto.
    pub async fn lines(&self, cart_id: Uuid) -> Result<Vec<CartLine>, AppError> {
        let lines = sqlx::query_as::<_, CartLine>(
            r#"
            SELECT
                ci.product_id, p.name AS product_name, p.wholesaler_id,
                ci.quantity, ci.unit_price, p.tax_percentage, ci.added_at
            FROM cart_items ci
            JOIN products p ON p.id = ci.product_id
            WHERE ci.cart_id = $1
            ORDER BY ci.id ASC
            "#,
        )
        .bind(cart_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(lines)
    }

    async fn touch(&self, cart_id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE carts SET updated_at = NOW() WHERE id = $1")
            .bind(cart_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
