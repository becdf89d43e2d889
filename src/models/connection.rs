// src/models/connection.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "connection_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Pending,
    Approved,
    Rejected,
}

impl ConnectionStatus {
    /// Aprovar é válido a partir de pendente ou rejeitada.
    pub fn can_approve(self) -> bool {
        matches!(self, ConnectionStatus::Pending | ConnectionStatus::Rejected)
    }

    /// Rejeitar uma conexão aprovada equivale a revogar o acesso ao catálogo.
    pub fn can_reject(self) -> bool {
        matches!(self, ConnectionStatus::Pending | ConnectionStatus::Approved)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "requested_by", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RequestedBy {
    Retailer,
    Wholesaler,
    Salesman,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: Uuid,
    pub wholesaler_id: Uuid,
    pub retailer_id: Uuid,
    pub status: ConnectionStatus,
    pub requested_by: RequestedBy,
    pub salesman_id: Option<Uuid>,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Varejista visto pelo atacadista, com o estado da conexão.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedRetailer {
    pub retailer_id: Uuid,
    pub shop_name: String,
    pub owner_name: String,
    pub email: String,
    pub phone: String,
    pub city: Option<String>,
    pub connection_id: Uuid,
    pub connection_status: ConnectionStatus,
    pub salesman_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatusResponse {
    pub wholesaler_id: Uuid,
    pub retailer_id: Uuid,
    /// `None` quando não existe conexão entre o par
    pub status: Option<ConnectionStatus>,
}

#[cfg(test)]
mod tests {
    use super::ConnectionStatus::*;

    #[test]
    fn approval_transitions() {
        assert!(Pending.can_approve());
        assert!(Rejected.can_approve());
        assert!(!Approved.can_approve());
    }

    #[test]
    fn rejection_transitions() {
        assert!(Pending.can_reject());
        assert!(Approved.can_reject());
        assert!(!Rejected.can_reject());
    }
}
