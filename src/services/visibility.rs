// src/services/visibility.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{common::error::AppError, db::ConnectionRepository, models::auth::Actor};

/// Regra de visibilidade do catálogo, compartilhada por catálogo, carrinho e pedidos.
#[derive(Clone)]
pub struct Visibility {
    connection_repo: ConnectionRepository,
    pool: PgPool,
}

impl Visibility {
    pub fn new(connection_repo: ConnectionRepository, pool: PgPool) -> Self {
        Self { connection_repo, pool }
    }

    /// Atacadistas cujo catálogo o ator enxerga.
    pub async fn visible_wholesalers(&self, actor: &Actor) -> Result<Vec<Uuid>, AppError> {
        match actor {
            Actor::Retailer { id } => self.connection_repo.approved_wholesaler_ids(*id).await,
            Actor::Wholesaler { id } => Ok(vec![*id]),
            Actor::Salesman { delegate_of, .. } => Ok(vec![*delegate_of]),
        }
    }

    pub async fn can_see_wholesaler(&self, actor: &Actor, wholesaler_id: Uuid) -> Result<bool, AppError> {
        match actor {
            Actor::Retailer { id } => self.is_connected(wholesaler_id, *id).await,
            _ => Ok(actor.effective_wholesaler_id() == Some(wholesaler_id)),
        }
    }

    pub async fn is_connected(&self, wholesaler_id: Uuid, retailer_id: Uuid) -> Result<bool, AppError> {
        self.connection_repo
            .is_approved(&self.pool, wholesaler_id, retailer_id)
            .await
    }
}
