// src/db/user_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::auth::{
        RegisterRetailerPayload, RegisterWholesalerPayload, Retailer, Salesman,
        SalesmanPermissions, Wholesaler,
    },
};

const SALESMAN_COLUMNS: &str = r#"
    id, wholesaler_id, name, email, phone, password_hash,
    can_add_products, can_delete_products, can_add_brands, can_add_retailers,
    can_delete_retailers, can_view_all_retailers, can_place_orders,
    is_active, created_at, updated_at
"#;

fn email_conflict(e: sqlx::Error) -> AppError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            return AppError::EmailAlreadyExists;
        }
    }
    AppError::DatabaseError(e)
}

// Repositório das identidades: atacadistas, varejistas e vendedores
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  ATACADISTAS
    // =========================================================================

    pub async fn find_wholesaler_by_email(&self, email: &str) -> Result<Option<Wholesaler>, AppError> {
        let wholesaler = sqlx::query_as::<_, Wholesaler>("SELECT * FROM wholesalers WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(wholesaler)
    }

    pub async fn find_wholesaler_by_id<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<Wholesaler>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let wholesaler = sqlx::query_as::<_, Wholesaler>("SELECT * FROM wholesalers WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(wholesaler)
    }

    pub async fn create_wholesaler<'e, E>(
        &self,
        executor: E,
        payload: &RegisterWholesalerPayload,
        hashed_password: &str,
    ) -> Result<Wholesaler, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Wholesaler>(
            r#"
            INSERT INTO wholesalers (
                email, password_hash, business_name, owner_name, phone,
                gst_number, address, city, state, pincode
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(&payload.email)
        .bind(hashed_password)
        .bind(&payload.business_name)
        .bind(&payload.owner_name)
        .bind(&payload.phone)
        .bind(&payload.gst_number)
        .bind(&payload.address)
        .bind(&payload.city)
        .bind(&payload.state)
        .bind(&payload.pincode)
        .fetch_one(executor)
        .await
        .map_err(email_conflict)
    }

    // =========================================================================
    //  VAREJISTAS
    // =========================================================================

    pub async fn find_retailer_by_email(&self, email: &str) -> Result<Option<Retailer>, AppError> {
        let retailer = sqlx::query_as::<_, Retailer>("SELECT * FROM retailers WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(retailer)
    }

    pub async fn find_retailer_by_id<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<Retailer>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let retailer = sqlx::query_as::<_, Retailer>("SELECT * FROM retailers WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(retailer)
    }

    pub async fn create_retailer<'e, E>(
        &self,
        executor: E,
        payload: &RegisterRetailerPayload,
        hashed_password: &str,
    ) -> Result<Retailer, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Retailer>(
            r#"
            INSERT INTO retailers (
                email, password_hash, shop_name, owner_name, phone,
                gst_number, address, city, state, pincode
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(&payload.email)
        .bind(hashed_password)
        .bind(&payload.shop_name)
        .bind(&payload.owner_name)
        .bind(&payload.phone)
        .bind(&payload.gst_number)
        .bind(&payload.address)
        .bind(&payload.city)
        .bind(&payload.state)
        .bind(&payload.pincode)
        .fetch_one(executor)
        .await
        .map_err(email_conflict)
    }

    // =========================================================================
    //  VENDEDORES
    // =========================================================================

    pub async fn find_salesman_by_email(&self, email: &str) -> Result<Option<Salesman>, AppError> {
        let salesman = sqlx::query_as::<_, Salesman>(&format!(
            "SELECT {SALESMAN_COLUMNS} FROM salesmen WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(salesman)
    }

    pub async fn find_salesman_by_id<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<Salesman>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let salesman = sqlx::query_as::<_, Salesman>(&format!(
            "SELECT {SALESMAN_COLUMNS} FROM salesmen WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(salesman)
    }

    pub async fn create_salesman<'e, E>(
        &self,
        executor: E,
        wholesaler_id: Uuid,
        name: &str,
        email: &str,
        phone: &str,
        hashed_password: &str,
        permissions: &SalesmanPermissions,
    ) -> Result<Salesman, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Salesman>(&format!(
            r#"
            INSERT INTO salesmen (
                wholesaler_id, name, email, phone, password_hash,
                can_add_products, can_delete_products, can_add_brands, can_add_retailers,
                can_delete_retailers, can_view_all_retailers, can_place_orders
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {SALESMAN_COLUMNS}
            "#
        ))
        .bind(wholesaler_id)
        .bind(name)
        .bind(email)
        .bind(phone)
        .bind(hashed_password)
        .bind(permissions.can_add_products)
        .bind(permissions.can_delete_products)
        .bind(permissions.can_add_brands)
        .bind(permissions.can_add_retailers)
        .bind(permissions.can_delete_retailers)
        .bind(permissions.can_view_all_retailers)
        .bind(permissions.can_place_orders)
        .fetch_one(executor)
        .await
        .map_err(email_conflict)
    }

    pub async fn list_salesmen(&self, wholesaler_id: Uuid) -> Result<Vec<Salesman>, AppError> {
        let salesmen = sqlx::query_as::<_, Salesman>(&format!(
            "SELECT {SALESMAN_COLUMNS} FROM salesmen WHERE wholesaler_id = $1 ORDER BY name ASC"
        ))
        .bind(wholesaler_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(salesmen)
    }

    /// Atualiza as flags de um vendedor, restrito ao próprio atacadista.
    pub async fn update_salesman_permissions(
        &self,
        wholesaler_id: Uuid,
        salesman_id: Uuid,
        permissions: &SalesmanPermissions,
    ) -> Result<Option<Salesman>, AppError> {
        let salesman = sqlx::query_as::<_, Salesman>(&format!(
            r#"
            UPDATE salesmen SET
                can_add_products = $3,
                can_delete_products = $4,
                can_add_brands = $5,
                can_add_retailers = $6,
                can_delete_retailers = $7,
                can_view_all_retailers = $8,
                can_place_orders = $9,
                updated_at = NOW()
            WHERE id = $1 AND wholesaler_id = $2
            RETURNING {SALESMAN_COLUMNS}
            "#
        ))
        .bind(salesman_id)
        .bind(wholesaler_id)
        .bind(permissions.can_add_products)
        .bind(permissions.can_delete_products)
        .bind(permissions.can_add_brands)
        .bind(permissions.can_add_retailers)
        .bind(permissions.can_delete_retailers)
        .bind(permissions.can_view_all_retailers)
        .bind(permissions.can_place_orders)
        .fetch_optional(&self.pool)
        .await?;
        Ok(salesman)
    }

    pub async fn set_salesman_active(
        &self,
        wholesaler_id: Uuid,
        salesman_id: Uuid,
        active: bool,
    ) -> Result<Option<Salesman>, AppError> {
        let salesman = sqlx::query_as::<_, Salesman>(&format!(
            r#"
            UPDATE salesmen SET is_active = $3, updated_at = NOW()
            WHERE id = $1 AND wholesaler_id = $2
            RETURNING {SALESMAN_COLUMNS}
            "#
        ))
        .bind(salesman_id)
        .bind(wholesaler_id)
        .bind(active)
        .fetch_optional(&self.pool)
        .await?;
        Ok(salesman)
    }
}
