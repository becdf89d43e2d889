// src/db/catalog_repo.rs

use std::collections::HashMap;

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::{conflict_on_unique, AppError},
    models::catalog::{
        Brand, BrandSummary, Category, PricingTier, Product, ProductFilter, UnitType,
    },
};

/// Campos editáveis do produto (o estoque nunca entra aqui).
#[derive(Debug, Clone)]
pub struct ProductFields<'a> {
    pub category_id: Uuid,
    pub brand_id: Option<Uuid>,
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub unit_type: UnitType,
    pub min_order_quantity: i32,
    pub base_price: Decimal,
    pub tax_percentage: Decimal,
}

#[derive(sqlx::FromRow)]
struct TierRow {
    product_id: Uuid,
    min_quantity: i32,
    max_quantity: Option<i32>,
    price_per_unit: Decimal,
}

#[derive(Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  CATEGORIAS
    // =========================================================================

    pub async fn create_category(&self, name: &str, description: Option<&str>) -> Result<Category, AppError> {
        sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name, description) VALUES ($1, $2) RETURNING *",
        )
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, || format!("Category '{name}' already exists.")))
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT * FROM categories WHERE is_active ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    pub async fn category_exists(&self, id: Uuid) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM categories WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    // =========================================================================
    //  MARCAS
    // =========================================================================

    pub async fn create_brand(
        &self,
        wholesaler_id: Uuid,
        name: &str,
        description: Option<&str>,
        image_url: Option<&str>,
    ) -> Result<Brand, AppError> {
        sqlx::query_as::<_, Brand>(
            r#"
            INSERT INTO brands (wholesaler_id, name, description, image_url)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(wholesaler_id)
        .bind(name)
        .bind(description)
        .bind(image_url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, || format!("Brand '{name}' already exists.")))
    }

    pub async fn list_brands(&self, wholesaler_ids: &[Uuid]) -> Result<Vec<Brand>, AppError> {
        let brands = sqlx::query_as::<_, Brand>(
            "SELECT * FROM brands WHERE wholesaler_id = ANY($1) ORDER BY name ASC",
        )
        .bind(wholesaler_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(brands)
    }

    pub async fn brand_belongs_to(&self, brand_id: Uuid, wholesaler_id: Uuid) -> Result<bool, AppError> {
        let belongs: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM brands WHERE id = $1 AND wholesaler_id = $2)",
        )
        .bind(brand_id)
        .bind(wholesaler_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(belongs)
    }

    // =========================================================================
    //  PRODUTOS
    // =========================================================================

    pub async fn create_product<'e, E>(
        &self,
        executor: E,
        wholesaler_id: Uuid,
        created_by_salesman: Option<Uuid>,
        fields: &ProductFields<'_>,
        stock_quantity: i32,
    ) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (
                wholesaler_id, created_by_salesman, category_id, brand_id, name, description,
                unit_type, min_order_quantity, stock_quantity, base_price, tax_percentage
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(wholesaler_id)
        .bind(created_by_salesman)
        .bind(fields.category_id)
        .bind(fields.brand_id)
        .bind(fields.name)
        .bind(fields.description)
        .bind(fields.unit_type)
        .bind(fields.min_order_quantity)
        .bind(stock_quantity)
        .bind(fields.base_price)
        .bind(fields.tax_percentage)
        .fetch_one(executor)
        .await?;
        Ok(product)
    }

    pub async fn update_product<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
        fields: &ProductFields<'_>,
    ) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products SET
                category_id = $2, brand_id = $3, name = $4, description = $5,
                unit_type = $6, min_order_quantity = $7, base_price = $8,
                tax_percentage = $9, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(product_id)
        .bind(fields.category_id)
        .bind(fields.brand_id)
        .bind(fields.name)
        .bind(fields.description)
        .bind(fields.unit_type)
        .bind(fields.min_order_quantity)
        .bind(fields.base_price)
        .bind(fields.tax_percentage)
        .fetch_optional(executor)
        .await?;
        Ok(product)
    }

    /// Substitui a lista de faixas preservando a ordem recebida (coluna `position`).
    pub async fn replace_tiers(
        &self,
        conn: &mut sqlx::PgConnection,
        product_id: Uuid,
        tiers: &[PricingTier],
    ) -> Result<(), AppError> {
        sqlx::query("DELETE FROM product_pricing_tiers WHERE product_id = $1")
            .bind(product_id)
            .execute(&mut *conn)
            .await?;

        for (position, tier) in tiers.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO product_pricing_tiers (product_id, position, min_quantity, max_quantity, price_per_unit)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(product_id)
            .bind(position as i32)
            .bind(tier.min_quantity)
            .bind(tier.max_quantity)
            .bind(tier.price_per_unit)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    pub async fn find_product<'e, E>(&self, executor: E, product_id: Uuid) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
            .bind(product_id)
            .fetch_optional(executor)
            .await?;
        Ok(product)
    }

    /// Produto completo: linha + faixas + marca.
    pub async fn get_product(&self, product_id: Uuid) -> Result<Option<Product>, AppError> {
        let Some(product) = self.find_product(&self.pool, product_id).await? else {
            return Ok(None);
        };
        let mut products = vec![product];
        self.attach_tiers(&mut products).await?;
        self.attach_brands(&mut products).await?;
        Ok(products.pop())
    }

    /// Lista produtos de um conjunto de atacadistas. `only_active` vale para varejistas.
    pub async fn list_products(
        &self,
        wholesaler_ids: &[Uuid],
        only_active: bool,
        filter: &ProductFilter,
    ) -> Result<Vec<Product>, AppError> {
        if wholesaler_ids.is_empty() {
            return Ok(Vec::new());
        }

        let (limit, offset) = filter.pagination();
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{s}%"));

        let mut products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE wholesaler_id = ANY($1)
              AND (NOT $2 OR is_active)
              AND ($3::uuid IS NULL OR category_id = $3)
              AND ($4::uuid IS NULL OR brand_id = $4)
              AND ($5::text IS NULL OR name ILIKE $5)
            ORDER BY name ASC, id ASC
            LIMIT $6 OFFSET $7
            "#,
        )
        .bind(wholesaler_ids)
        .bind(only_active)
        .bind(filter.category_id)
        .bind(filter.brand_id)
        .bind(search)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        self.attach_tiers(&mut products).await?;
        self.attach_brands(&mut products).await?;
        Ok(products)
    }

    async fn attach_tiers(&self, products: &mut [Product]) -> Result<(), AppError> {
        if products.is_empty() {
            return Ok(());
        }
        let ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();

        let rows = sqlx::query_as::<_, TierRow>(
            r#"
            SELECT product_id, min_quantity, max_quantity, price_per_unit
            FROM product_pricing_tiers
            WHERE product_id = ANY($1)
            ORDER BY product_id, position ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_product: HashMap<Uuid, Vec<PricingTier>> = HashMap::new();
        for row in rows {
            by_product.entry(row.product_id).or_default().push(PricingTier {
                min_quantity: row.min_quantity,
                max_quantity: row.max_quantity,
                price_per_unit: row.price_per_unit,
            });
        }
        for product in products.iter_mut() {
            product.pricing_tiers = by_product.remove(&product.id).unwrap_or_default();
        }
        Ok(())
    }

    /// Enriquecimento de leitura: resolve a FK `brand_id` de toda a página de uma vez.
    async fn attach_brands(&self, products: &mut [Product]) -> Result<(), AppError> {
        let brand_ids: Vec<Uuid> = products.iter().filter_map(|p| p.brand_id).collect();
        if brand_ids.is_empty() {
            return Ok(());
        }

        let brands = sqlx::query_as::<_, BrandSummary>(
            "SELECT id, name, description, image_url FROM brands WHERE id = ANY($1)",
        )
        .bind(&brand_ids)
        .fetch_all(&self.pool)
        .await?;

        let by_id: HashMap<Uuid, BrandSummary> = brands.into_iter().map(|b| (b.id, b)).collect();
        for product in products.iter_mut() {
            product.brand = product.brand_id.and_then(|id| by_id.get(&id).cloned());
        }
        Ok(())
    }

    pub async fn set_active(&self, product_id: Uuid, active: bool) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>(
            "UPDATE products SET is_active = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(product_id)
        .bind(active)
        .fetch_optional(&self.pool)
        .await?;
        Ok(product)
    }

    pub async fn delete_product(&self, product_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(product_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    //  ESTOQUE (sempre por delta atômico)
    // =========================================================================

    /// Aplica `delta` ao estoque se o resultado couber em `0..=i32::MAX`.
    /// Devolve o novo saldo, ou `None` quando o saldo não comporta o delta.
    pub async fn apply_stock_delta<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
        delta: i32,
    ) -> Result<Option<i32>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let stock: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity + $2, updated_at = NOW()
            WHERE id = $1 AND stock_quantity::BIGINT + $2 BETWEEN 0 AND 2147483647
            RETURNING stock_quantity
            "#,
        )
        .bind(product_id)
        .bind(delta)
        .fetch_optional(executor)
        .await?;
        Ok(stock)
    }

    pub async fn stock_of<'e, E>(&self, executor: E, product_id: Uuid) -> Result<Option<i32>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let stock: Option<i32> = sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = $1")
            .bind(product_id)
            .fetch_optional(executor)
            .await?;
        Ok(stock)
    }
}
