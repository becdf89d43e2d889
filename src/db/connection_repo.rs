// src/db/connection_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::{conflict_on_unique, AppError},
    models::connection::{ConnectedRetailer, Connection, ConnectionStatus, RequestedBy},
};

#[derive(Clone)]
pub struct ConnectionRepository {
    pool: PgPool,
}

impl ConnectionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Connection>, AppError> {
        let connection = sqlx::query_as::<_, Connection>("SELECT * FROM connections WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(connection)
    }

    pub async fn find_by_pair<'e, E>(
        &self,
        executor: E,
        wholesaler_id: Uuid,
        retailer_id: Uuid,
    ) -> Result<Option<Connection>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let connection = sqlx::query_as::<_, Connection>(
            "SELECT * FROM connections WHERE wholesaler_id = $1 AND retailer_id = $2",
        )
        .bind(wholesaler_id)
        .bind(retailer_id)
        .fetch_optional(executor)
        .await?;
        Ok(connection)
    }

    pub async fn is_approved<'e, E>(
        &self,
        executor: E,
        wholesaler_id: Uuid,
        retailer_id: Uuid,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let approved: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM connections
                WHERE wholesaler_id = $1 AND retailer_id = $2 AND status = 'approved'
            )
            "#,
        )
        .bind(wholesaler_id)
        .bind(retailer_id)
        .fetch_one(executor)
        .await?;
        Ok(approved)
    }

    /// Atacadistas com conexão aprovada para o varejista.
    pub async fn approved_wholesaler_ids(&self, retailer_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT wholesaler_id FROM connections WHERE retailer_id = $1 AND status = 'approved'",
        )
        .bind(retailer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    /// Cria uma conexão pendente. A constraint do par garante a unicidade mesmo
    /// sob requisições concorrentes.
    pub async fn create_pending(
        &self,
        wholesaler_id: Uuid,
        retailer_id: Uuid,
        message: Option<&str>,
    ) -> Result<Connection, AppError> {
        sqlx::query_as::<_, Connection>(
            r#"
            INSERT INTO connections (wholesaler_id, retailer_id, status, requested_by, message)
            VALUES ($1, $2, 'pending', 'retailer', $3)
            RETURNING *
            "#,
        )
        .bind(wholesaler_id)
        .bind(retailer_id)
        .bind(message)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, || "A connection already exists for this pair.".into()))
    }

    /// Reabre uma conexão rejeitada. Condicional no status para não atropelar
    /// uma aprovação concorrente.
    pub async fn reopen_rejected(
        &self,
        connection_id: Uuid,
        message: Option<&str>,
    ) -> Result<Option<Connection>, AppError> {
        let connection = sqlx::query_as::<_, Connection>(
            r#"
            UPDATE connections
            SET status = 'pending', requested_by = 'retailer', salesman_id = NULL,
                message = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'rejected'
            RETURNING *
            "#,
        )
        .bind(connection_id)
        .bind(message)
        .fetch_optional(&self.pool)
        .await?;
        Ok(connection)
    }

    /// Muda o status apenas se o status atual for um dos esperados (compare-and-set).
    pub async fn transition(
        &self,
        connection_id: Uuid,
        from: &[ConnectionStatus],
        to: ConnectionStatus,
    ) -> Result<Option<Connection>, AppError> {
        let connection = sqlx::query_as::<_, Connection>(
            r#"
            UPDATE connections SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = ANY($2)
            RETURNING *
            "#,
        )
        .bind(connection_id)
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await?;
        Ok(connection)
    }

    /// Cria (ou força para aprovada) a conexão de um varejista cadastrado pelo
    /// atacadista ou por um vendedor.
    pub async fn upsert_approved<'e, E>(
        &self,
        executor: E,
        wholesaler_id: Uuid,
        retailer_id: Uuid,
        requested_by: RequestedBy,
        salesman_id: Option<Uuid>,
    ) -> Result<Connection, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let connection = sqlx::query_as::<_, Connection>(
            r#"
            INSERT INTO connections (wholesaler_id, retailer_id, status, requested_by, salesman_id)
            VALUES ($1, $2, 'approved', $3, $4)
            ON CONFLICT ON CONSTRAINT connections_pair_key
            DO UPDATE SET
                status = 'approved',
                requested_by = EXCLUDED.requested_by,
                salesman_id = COALESCE(EXCLUDED.salesman_id, connections.salesman_id),
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(wholesaler_id)
        .bind(retailer_id)
        .bind(requested_by)
        .bind(salesman_id)
        .fetch_one(executor)
        .await?;
        Ok(connection)
    }

    pub async fn delete(&self, connection_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM connections WHERE id = $1")
            .bind(connection_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_for_retailer(&self, retailer_id: Uuid) -> Result<Vec<Connection>, AppError> {
        let connections = sqlx::query_as::<_, Connection>(
            "SELECT * FROM connections WHERE retailer_id = $1 ORDER BY created_at DESC",
        )
        .bind(retailer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(connections)
    }

    /// Conexões do atacadista; com `salesman_id`, apenas as atribuídas àquele vendedor.
    pub async fn list_for_wholesaler(
        &self,
        wholesaler_id: Uuid,
        salesman_id: Option<Uuid>,
    ) -> Result<Vec<Connection>, AppError> {
        let connections = sqlx::query_as::<_, Connection>(
            r#"
            SELECT * FROM connections
            WHERE wholesaler_id = $1 AND ($2::uuid IS NULL OR salesman_id = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(wholesaler_id)
        .bind(salesman_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(connections)
    }

    pub async fn list_retailers(
        &self,
        wholesaler_id: Uuid,
        salesman_id: Option<Uuid>,
    ) -> Result<Vec<ConnectedRetailer>, AppError> {
        let retailers = sqlx::query_as::<_, ConnectedRetailer>(
            r#"
            SELECT
                r.id AS retailer_id, r.shop_name, r.owner_name, r.email, r.phone, r.city,
                c.id AS connection_id, c.status AS connection_status, c.salesman_id
            FROM connections c
            JOIN retailers r ON r.id = c.retailer_id
            WHERE c.wholesaler_id = $1 AND ($2::uuid IS NULL OR c.salesman_id = $2)
            ORDER BY r.shop_name ASC
            "#,
        )
        .bind(wholesaler_id)
        .bind(salesman_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(retailers)
    }
}
