// src/services/connection_service.rs

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{ConnectionRepository, UserRepository},
    models::{
        auth::Actor,
        connection::{Connection, ConnectionStatus, RequestedBy},
    },
    services::account_service::retailer_scope,
};

/// Quem pode apagar uma conexão: o atacadista, o varejista, ou um vendedor do
/// atacadista com `can_delete_retailers`.
pub fn may_delete(actor: &Actor, connection: &Connection) -> bool {
    match actor {
        Actor::Wholesaler { id } => *id == connection.wholesaler_id,
        Actor::Retailer { id } => *id == connection.retailer_id,
        Actor::Salesman { delegate_of, permissions, .. } => {
            *delegate_of == connection.wholesaler_id && permissions.can_delete_retailers
        }
    }
}

#[derive(Clone)]
pub struct ConnectionService {
    repo: ConnectionRepository,
    user_repo: UserRepository,
    pool: sqlx::PgPool,
}

impl ConnectionService {
    pub fn new(repo: ConnectionRepository, user_repo: UserRepository, pool: sqlx::PgPool) -> Self {
        Self { repo, user_repo, pool }
    }

    /// Pedido do varejista. Uma conexão rejeitada é reaberta; qualquer outra
    /// existente é conflito.
    pub async fn request_connection(
        &self,
        actor: &Actor,
        wholesaler_id: Uuid,
        message: Option<&str>,
    ) -> Result<Connection, AppError> {
        let Actor::Retailer { id: retailer_id } = actor else {
            return Err(AppError::Forbidden("only retailers can request connections".into()));
        };

        let wholesaler = self.user_repo.find_wholesaler_by_id(&self.pool, wholesaler_id).await?;
        if !wholesaler.is_some_and(|w| w.is_active) {
            return Err(AppError::NotFound("Wholesaler"));
        }

        let connection = match self.repo.find_by_pair(&self.pool, wholesaler_id, *retailer_id).await? {
            None => self.repo.create_pending(wholesaler_id, *retailer_id, message).await?,
            Some(existing) if existing.status == ConnectionStatus::Rejected => self
                .repo
                .reopen_rejected(existing.id, message)
                .await?
                // Alguém mudou o status entre a leitura e o update
                .ok_or_else(|| AppError::Conflict("The connection changed concurrently.".into()))?,
            Some(existing) => {
                return Err(AppError::Conflict(format!(
                    "A connection already exists with status '{:?}'.",
                    existing.status
                )));
            }
        };

        tracing::info!(
            "📨 Pedido de conexão {} do varejista {} para o atacadista {}.",
            connection.id,
            retailer_id,
            wholesaler_id
        );
        Ok(connection)
    }

    pub async fn approve(&self, actor: &Actor, connection_id: Uuid) -> Result<Connection, AppError> {
        self.decide(actor, connection_id, ConnectionStatus::Approved).await
    }

    pub async fn reject(&self, actor: &Actor, connection_id: Uuid) -> Result<Connection, AppError> {
        self.decide(actor, connection_id, ConnectionStatus::Rejected).await
    }

    // Aprovação/rejeição: só o próprio atacadista.
    async fn decide(&self, actor: &Actor, connection_id: Uuid, to: ConnectionStatus) -> Result<Connection, AppError> {
        let Actor::Wholesaler { id: wholesaler_id } = actor else {
            return Err(AppError::Forbidden("only the wholesaler can approve or reject".into()));
        };

        let connection = self
            .repo
            .find_by_id(connection_id)
            .await?
            .filter(|c| c.wholesaler_id == *wholesaler_id)
            .ok_or(AppError::NotFound("Connection"))?;

        let allowed: &[ConnectionStatus] = match to {
            ConnectionStatus::Approved => &[ConnectionStatus::Pending, ConnectionStatus::Rejected],
            _ => &[ConnectionStatus::Pending, ConnectionStatus::Approved],
        };

        let legal = match to {
            ConnectionStatus::Approved => connection.status.can_approve(),
            _ => connection.status.can_reject(),
        };
        if !legal {
            return Err(AppError::InvalidStateTransition(format!(
                "Cannot move a connection from {:?} to {:?}.",
                connection.status, to
            )));
        }

        let updated = self
            .repo
            .transition(connection_id, allowed, to)
            .await?
            .ok_or_else(|| AppError::InvalidStateTransition("The connection changed concurrently.".into()))?;

        tracing::info!("✅ Conexão {} agora está {:?}.", connection_id, to);
        Ok(updated)
    }

    /// Conexão criada já aprovada (varejista cadastrado pelo atacadista/vendedor).
    pub async fn auto_approve(
        &self,
        wholesaler_id: Uuid,
        retailer_id: Uuid,
        created_by: RequestedBy,
        salesman_id: Option<Uuid>,
    ) -> Result<Connection, AppError> {
        self.repo
            .upsert_approved(&self.pool, wholesaler_id, retailer_id, created_by, salesman_id)
            .await
    }

    /// Atacadista (ou vendedor com `can_add_retailers`) vincula um varejista já cadastrado.
    pub async fn connect_existing_retailer(&self, actor: &Actor, retailer_id: Uuid) -> Result<Connection, AppError> {
        if !actor.can(|p| p.can_add_retailers) {
            return Err(AppError::Forbidden("missing permission to add retailers".into()));
        }
        let Some(wholesaler_id) = actor.effective_wholesaler_id() else {
            return Err(AppError::Forbidden("missing permission to add retailers".into()));
        };

        let retailer = self.user_repo.find_retailer_by_id(&self.pool, retailer_id).await?;
        if !retailer.is_some_and(|r| r.is_active) {
            return Err(AppError::NotFound("Retailer"));
        }

        let created_by = match actor {
            Actor::Salesman { .. } => RequestedBy::Salesman,
            _ => RequestedBy::Wholesaler,
        };
        let connection = self
            .auto_approve(wholesaler_id, retailer_id, created_by, actor.salesman_id())
            .await?;

        tracing::info!("🔗 Varejista {} vinculado ao atacadista {}.", retailer_id, wholesaler_id);
        Ok(connection)
    }

    pub async fn status(&self, wholesaler_id: Uuid, retailer_id: Uuid) -> Result<Option<ConnectionStatus>, AppError> {
        Ok(self
            .repo
            .find_by_pair(&self.pool, wholesaler_id, retailer_id)
            .await?
            .map(|c| c.status))
    }

    /// Status visto pelo ator: cada lado só consulta pares que o envolvem.
    pub async fn status_for(
        &self,
        actor: &Actor,
        counterpart_id: Uuid,
    ) -> Result<(Uuid, Uuid, Option<ConnectionStatus>), AppError> {
        let (wholesaler_id, retailer_id) = match actor {
            Actor::Retailer { id } => (counterpart_id, *id),
            Actor::Wholesaler { id } => (*id, counterpart_id),
            Actor::Salesman { delegate_of, .. } => (*delegate_of, counterpart_id),
        };
        let status = self.status(wholesaler_id, retailer_id).await?;
        Ok((wholesaler_id, retailer_id, status))
    }

    pub async fn delete(&self, actor: &Actor, connection_id: Uuid) -> Result<(), AppError> {
        let connection = self
            .repo
            .find_by_id(connection_id)
            .await?
            .ok_or(AppError::NotFound("Connection"))?;

        if !may_delete(actor, &connection) {
            return Err(AppError::Forbidden("not allowed to delete this connection".into()));
        }

        self.repo.delete(connection_id).await?;
        tracing::info!("🗑️ Conexão {} removida por {}.", connection_id, actor.id());
        Ok(())
    }

    pub async fn list(&self, actor: &Actor) -> Result<Vec<Connection>, AppError> {
        match actor {
            Actor::Retailer { id } => self.repo.list_for_retailer(*id).await,
            _ => {
                let (wholesaler_id, salesman_id) = retailer_scope(actor)?;
                self.repo.list_for_wholesaler(wholesaler_id, salesman_id).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::auth::SalesmanPermissions;

    fn connection(wholesaler_id: Uuid, retailer_id: Uuid) -> Connection {
        Connection {
            id: Uuid::new_v4(),
            wholesaler_id,
            retailer_id,
            status: ConnectionStatus::Approved,
            requested_by: RequestedBy::Retailer,
            salesman_id: None,
            message: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn both_ends_may_delete() {
        let (w, r) = (Uuid::new_v4(), Uuid::new_v4());
        let c = connection(w, r);
        assert!(may_delete(&Actor::Wholesaler { id: w }, &c));
        assert!(may_delete(&Actor::Retailer { id: r }, &c));
        assert!(!may_delete(&Actor::Wholesaler { id: Uuid::new_v4() }, &c));
        assert!(!may_delete(&Actor::Retailer { id: Uuid::new_v4() }, &c));
    }

    #[test]
    fn salesman_needs_flag_and_same_wholesaler() {
        let (w, r) = (Uuid::new_v4(), Uuid::new_v4());
        let c = connection(w, r);
        let with_flag = SalesmanPermissions {
            can_delete_retailers: true,
            ..Default::default()
        };

        let own = Actor::Salesman { id: Uuid::new_v4(), delegate_of: w, permissions: with_flag };
        assert!(may_delete(&own, &c));

        let foreign = Actor::Salesman { id: Uuid::new_v4(), delegate_of: Uuid::new_v4(), permissions: with_flag };
        assert!(!may_delete(&foreign, &c));

        let no_flag = Actor::Salesman {
            id: Uuid::new_v4(),
            delegate_of: w,
            permissions: SalesmanPermissions::default(),
        };
        assert!(!may_delete(&no_flag, &c));
    }
}
