// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

// --- Papéis ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Wholesaler,
    Retailer,
    Salesman,
}

// --- Identidades ---

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Wholesaler {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)] // IMPORTANTE para segurança
    pub password_hash: String,
    pub business_name: String,
    pub owner_name: String,
    pub phone: String,
    pub gst_number: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Retailer {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub shop_name: String,
    pub owner_name: String,
    pub phone: String,
    pub gst_number: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Conjunto de capacidades delegadas pelo atacadista ao vendedor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SalesmanPermissions {
    #[serde(default)]
    pub can_add_products: bool,
    #[serde(default)]
    pub can_delete_products: bool,
    #[serde(default)]
    pub can_add_brands: bool,
    #[serde(default)]
    pub can_add_retailers: bool,
    #[serde(default)]
    pub can_delete_retailers: bool,
    #[serde(default)]
    pub can_view_all_retailers: bool,
    #[serde(default)]
    pub can_place_orders: bool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Salesman {
    pub id: Uuid,
    pub wholesaler_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[sqlx(flatten)]
    pub permissions: SalesmanPermissions,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---
// Actor: a identidade efetiva resolvida uma única vez por requisição
// ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    Wholesaler {
        id: Uuid,
    },
    Retailer {
        id: Uuid,
    },
    Salesman {
        id: Uuid,
        delegate_of: Uuid,
        permissions: SalesmanPermissions,
    },
}

impl Actor {
    pub fn id(&self) -> Uuid {
        match self {
            Actor::Wholesaler { id } | Actor::Retailer { id } | Actor::Salesman { id, .. } => *id,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Actor::Wholesaler { .. } => Role::Wholesaler,
            Actor::Retailer { .. } => Role::Retailer,
            Actor::Salesman { .. } => Role::Salesman,
        }
    }

    /// O atacadista "dono" das operações: ele mesmo, ou aquele para quem o vendedor trabalha.
    pub fn effective_wholesaler_id(&self) -> Option<Uuid> {
        match self {
            Actor::Wholesaler { id } => Some(*id),
            Actor::Salesman { delegate_of, .. } => Some(*delegate_of),
            Actor::Retailer { .. } => None,
        }
    }

    pub fn salesman_id(&self) -> Option<Uuid> {
        match self {
            Actor::Salesman { id, .. } => Some(*id),
            _ => None,
        }
    }

    /// Atacadistas sempre passam; vendedores dependem da flag; varejistas nunca.
    pub fn can(&self, capability: impl Fn(&SalesmanPermissions) -> bool) -> bool {
        match self {
            Actor::Wholesaler { .. } => true,
            Actor::Salesman { permissions, .. } => capability(permissions),
            Actor::Retailer { .. } => false,
        }
    }
}

// ---
// Payloads
// ---

/// GSTIN: 15 caracteres alfanuméricos.
pub fn validate_gst_number(gst: &str) -> Result<(), ValidationError> {
    if gst.len() != 15 || !gst.chars().all(|c| c.is_ascii_alphanumeric()) {
        let mut err = ValidationError::new("gst_format");
        err.message = Some("O GSTIN deve ter 15 caracteres alfanuméricos.".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterWholesalerPayload {
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: String,
    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    pub password: String,
    #[validate(length(min = 1, message = "O nome da empresa é obrigatório."))]
    pub business_name: String,
    #[validate(length(min = 1, message = "O nome do proprietário é obrigatório."))]
    pub owner_name: String,
    #[validate(length(min = 8, message = "O telefone é inválido."))]
    pub phone: String,
    #[validate(custom(function = "validate_gst_number"))]
    pub gst_number: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRetailerPayload {
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: String,
    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    pub password: String,
    #[validate(length(min = 1, message = "O nome da loja é obrigatório."))]
    pub shop_name: String,
    #[validate(length(min = 1, message = "O nome do proprietário é obrigatório."))]
    pub owner_name: String,
    #[validate(length(min = 8, message = "O telefone é inválido."))]
    pub phone: String,
    #[validate(custom(function = "validate_gst_number"))]
    pub gst_number: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginPayload {
    pub role: Role,
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: String,
    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSalesmanPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: String,
    #[validate(length(min = 8, message = "O telefone é inválido."))]
    pub phone: String,
    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    pub password: String,
    #[serde(default)]
    pub permissions: SalesmanPermissions,
}

// Resposta de autenticação com o token
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub role: Role,
    /// Aviso não bloqueante (ex: GST não pôde ser verificado)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisory: Option<String>,
}

/// Perfil devolvido por `/api/me`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Profile {
    Wholesaler(Wholesaler),
    Retailer(Retailer),
    Salesman(Salesman),
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,  // Subject (ID da identidade)
    pub role: Role, // Tabela onde a identidade vive
    pub exp: usize, // Expiration time (quando o token expira)
    pub iat: usize, // Issued At (quando o token foi criado)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn salesman(permissions: SalesmanPermissions) -> Actor {
        Actor::Salesman {
            id: Uuid::new_v4(),
            delegate_of: Uuid::new_v4(),
            permissions,
        }
    }

    #[test]
    fn wholesaler_has_every_capability() {
        let actor = Actor::Wholesaler { id: Uuid::new_v4() };
        assert!(actor.can(|p| p.can_add_products));
        assert!(actor.can(|p| p.can_delete_retailers));
        assert_eq!(actor.effective_wholesaler_id(), Some(actor.id()));
    }

    #[test]
    fn salesman_is_scoped_by_flags() {
        let actor = salesman(SalesmanPermissions {
            can_add_products: true,
            ..Default::default()
        });
        assert!(actor.can(|p| p.can_add_products));
        assert!(!actor.can(|p| p.can_delete_products));

        let Actor::Salesman { delegate_of, .. } = &actor else {
            unreachable!()
        };
        assert_eq!(actor.effective_wholesaler_id(), Some(*delegate_of));
        assert_eq!(actor.salesman_id(), Some(actor.id()));
    }

    #[test]
    fn retailer_has_no_delegated_capability() {
        let actor = Actor::Retailer { id: Uuid::new_v4() };
        assert!(!actor.can(|p| p.can_place_orders));
        assert_eq!(actor.effective_wholesaler_id(), None);
        assert_eq!(actor.role(), Role::Retailer);
    }

    #[test]
    fn gst_number_shape() {
        assert!(validate_gst_number("27AAPFU0939F1ZV").is_ok());
        assert!(validate_gst_number("27AAPFU0939F1Z").is_err());
        assert!(validate_gst_number("27AAPFU0939F1Z-").is_err());
    }
}
