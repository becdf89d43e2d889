// src/services/account_service.rs
//
// Equipe do atacadista: vendedores e varejistas cadastrados "de fora".

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{ConnectionRepository, UserRepository},
    models::{
        auth::{Actor, CreateSalesmanPayload, RegisterRetailerPayload, Retailer, Salesman, SalesmanPermissions},
        connection::{ConnectedRetailer, RequestedBy},
    },
    services::auth::hash_password,
};

/// Escopo de listagem: `None` = todos do atacadista, `Some(id)` = só os do vendedor.
pub fn retailer_scope(actor: &Actor) -> Result<(Uuid, Option<Uuid>), AppError> {
    match actor {
        Actor::Wholesaler { id } => Ok((*id, None)),
        Actor::Salesman { id, delegate_of, permissions } => {
            let only_mine = (!permissions.can_view_all_retailers).then_some(*id);
            Ok((*delegate_of, only_mine))
        }
        Actor::Retailer { .. } => Err(AppError::Forbidden("retailers cannot list retailers".into())),
    }
}

fn require_wholesaler(actor: &Actor) -> Result<Uuid, AppError> {
    match actor {
        Actor::Wholesaler { id } => Ok(*id),
        _ => Err(AppError::Forbidden("only the wholesaler can manage salesmen".into())),
    }
}

#[derive(Clone)]
pub struct AccountService {
    user_repo: UserRepository,
    connection_repo: ConnectionRepository,
    pool: PgPool,
}

impl AccountService {
    pub fn new(user_repo: UserRepository, connection_repo: ConnectionRepository, pool: PgPool) -> Self {
        Self {
            user_repo,
            connection_repo,
            pool,
        }
    }

    // --- VENDEDORES ---

    pub async fn create_salesman(&self, actor: &Actor, payload: &CreateSalesmanPayload) -> Result<Salesman, AppError> {
        let wholesaler_id = require_wholesaler(actor)?;
        let hashed_password = hash_password(&payload.password).await?;

        let salesman = self
            .user_repo
            .create_salesman(
                &self.pool,
                wholesaler_id,
                &payload.name,
                &payload.email,
                &payload.phone,
                &hashed_password,
                &payload.permissions,
            )
            .await?;

        tracing::info!("🧑‍💼 Vendedor {} criado para o atacadista {}.", salesman.id, wholesaler_id);
        Ok(salesman)
    }

    pub async fn list_salesmen(&self, actor: &Actor) -> Result<Vec<Salesman>, AppError> {
        let wholesaler_id = require_wholesaler(actor)?;
        self.user_repo.list_salesmen(wholesaler_id).await
    }

    pub async fn update_salesman_permissions(
        &self,
        actor: &Actor,
        salesman_id: Uuid,
        permissions: &SalesmanPermissions,
    ) -> Result<Salesman, AppError> {
        let wholesaler_id = require_wholesaler(actor)?;
        self.user_repo
            .update_salesman_permissions(wholesaler_id, salesman_id, permissions)
            .await?
            .ok_or(AppError::NotFound("Salesman"))
    }

    pub async fn set_salesman_active(&self, actor: &Actor, salesman_id: Uuid, active: bool) -> Result<Salesman, AppError> {
        let wholesaler_id = require_wholesaler(actor)?;
        self.user_repo
            .set_salesman_active(wholesaler_id, salesman_id, active)
            .await?
            .ok_or(AppError::NotFound("Salesman"))
    }

    // --- VAREJISTAS ---

    /// Cadastra um varejista em nome do atacadista e já aprova a conexão,
    /// tudo na mesma transação.
    pub async fn create_retailer_for_wholesaler(
        &self,
        actor: &Actor,
        payload: &RegisterRetailerPayload,
    ) -> Result<Retailer, AppError> {
        if !actor.can(|p| p.can_add_retailers) {
            return Err(AppError::Forbidden("missing permission to add retailers".into()));
        }
        let Some(wholesaler_id) = actor.effective_wholesaler_id() else {
            return Err(AppError::Forbidden("missing permission to add retailers".into()));
        };
        let requested_by = match actor {
            Actor::Salesman { .. } => RequestedBy::Salesman,
            _ => RequestedBy::Wholesaler,
        };

        let hashed_password = hash_password(&payload.password).await?;

        let mut tx = self.pool.begin().await?;

        let retailer = self
            .user_repo
            .create_retailer(&mut *tx, payload, &hashed_password)
            .await?; // Se falhar aqui, o tx sofre rollback automático ao sair do escopo (drop)

        self.connection_repo
            .upsert_approved(&mut *tx, wholesaler_id, retailer.id, requested_by, actor.salesman_id())
            .await?;

        tx.commit().await?;

        tracing::info!(
            "🔗 Varejista {} cadastrado e conectado ao atacadista {}.",
            retailer.id,
            wholesaler_id
        );
        Ok(retailer)
    }

    pub async fn list_retailers(&self, actor: &Actor) -> Result<Vec<ConnectedRetailer>, AppError> {
        let (wholesaler_id, salesman_id) = retailer_scope(actor)?;
        self.connection_repo.list_retailers(wholesaler_id, salesman_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn salesman_scope_depends_on_view_all_flag() {
        let wholesaler = Uuid::new_v4();
        let salesman = Uuid::new_v4();

        let restricted = Actor::Salesman {
            id: salesman,
            delegate_of: wholesaler,
            permissions: SalesmanPermissions::default(),
        };
        assert_eq!(retailer_scope(&restricted).unwrap(), (wholesaler, Some(salesman)));

        let all = Actor::Salesman {
            id: salesman,
            delegate_of: wholesaler,
            permissions: SalesmanPermissions {
                can_view_all_retailers: true,
                ..Default::default()
            },
        };
        assert_eq!(retailer_scope(&all).unwrap(), (wholesaler, None));
    }

    #[test]
    fn retailers_cannot_list_retailers() {
        let actor = Actor::Retailer { id: Uuid::new_v4() };
        assert!(matches!(retailer_scope(&actor), Err(AppError::Forbidden(_))));
    }

    #[test]
    fn only_wholesalers_manage_salesmen() {
        let salesman = Actor::Salesman {
            id: Uuid::new_v4(),
            delegate_of: Uuid::new_v4(),
            permissions: SalesmanPermissions {
                can_add_retailers: true,
                ..Default::default()
            },
        };
        assert!(require_wholesaler(&salesman).is_err());
        let wholesaler = Actor::Wholesaler { id: Uuid::new_v4() };
        assert_eq!(require_wholesaler(&wholesaler).unwrap(), wholesaler.id());
    }
}
