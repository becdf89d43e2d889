// src/common/error.rs

use std::collections::HashMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::middleware::i18n::Locale;

// Nosso tipo de erro de domínio, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("{0} não encontrado")]
    NotFound(&'static str),

    #[error("Acesso negado: {0}")]
    Forbidden(String),

    #[error("Conflito: {0}")]
    Conflict(String),

    #[error("Quantidade {requested} abaixo do pedido mínimo ({moq})")]
    BelowMinimumOrder { moq: i32, requested: i32 },

    #[error("Estoque insuficiente: {requested} solicitados, {available} disponíveis")]
    InsufficientStock { available: i32, requested: i32 },

    #[error("Produto inativo")]
    ProductInactive,

    #[error("Carrinho vazio")]
    EmptyCart,

    #[error("Sem conexão aprovada com o atacadista")]
    NotConnected,

    #[error("Transição inválida: {0}")]
    InvalidStateTransition(String),

    #[error("GSTIN inválido")]
    InvalidGstNumber,

    #[error("Serviço externo indisponível: {0}")]
    UpstreamUnavailable(String),

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

/// O corpo de erro que efetivamente vai para o cliente.
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self)).into_response()
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::InvalidGstNumber => StatusCode::BAD_REQUEST,
            AppError::BelowMinimumOrder { .. }
            | AppError::InsufficientStock { .. }
            | AppError::ProductInactive
            | AppError::EmptyCart => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::EmailAlreadyExists
            | AppError::Conflict(_)
            | AppError::InvalidStateTransition(_) => StatusCode::CONFLICT,
            AppError::InvalidCredentials | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) | AppError::NotConnected => StatusCode::FORBIDDEN,
            AppError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Código estável para o cliente distinguir o tipo de erro.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION",
            AppError::EmailAlreadyExists => "EMAIL_ALREADY_EXISTS",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::InvalidToken => "INVALID_TOKEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::Conflict(_) => "CONFLICT",
            AppError::BelowMinimumOrder { .. } | AppError::InsufficientStock { .. } => {
                "INVALID_QUANTITY"
            }
            AppError::ProductInactive => "PRODUCT_INACTIVE",
            AppError::EmptyCart => "EMPTY_CART",
            AppError::NotConnected => "NOT_CONNECTED",
            AppError::InvalidStateTransition(_) => "INVALID_STATE_TRANSITION",
            AppError::InvalidGstNumber => "INVALID_GST_NUMBER",
            AppError::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
            _ => "INTERNAL",
        }
    }

    fn message(&self, lang: &str) -> String {
        let pt = lang == "pt";
        match self {
            AppError::ValidationError(_) if pt => "Um ou mais campos são inválidos.".into(),
            AppError::ValidationError(_) => "One or more fields are invalid.".into(),
            AppError::EmailAlreadyExists if pt => "Este e-mail já está em uso.".into(),
            AppError::EmailAlreadyExists => "This e-mail is already in use.".into(),
            AppError::InvalidCredentials if pt => "E-mail ou senha inválidos.".into(),
            AppError::InvalidCredentials => "Invalid e-mail or password.".into(),
            AppError::InvalidToken if pt => {
                "Token de autenticação inválido ou ausente.".into()
            }
            AppError::InvalidToken => "Missing or invalid authentication token.".into(),
            AppError::NotFound(what) if pt => format!("{what} não encontrado."),
            AppError::NotFound(what) => format!("{what} not found."),
            AppError::Forbidden(reason) if pt => format!("Acesso negado: {reason}."),
            AppError::Forbidden(reason) => format!("Forbidden: {reason}."),
            AppError::Conflict(reason) => reason.clone(),
            AppError::BelowMinimumOrder { moq, requested } if pt => {
                format!("A quantidade {requested} está abaixo do pedido mínimo de {moq}.")
            }
            AppError::BelowMinimumOrder { moq, requested } => {
                format!("Quantity {requested} is below the minimum order quantity of {moq}.")
            }
            AppError::InsufficientStock { available, requested } if pt => format!(
                "Estoque insuficiente: {requested} solicitados, {available} disponíveis."
            ),
            AppError::InsufficientStock { available, requested } => {
                format!("Insufficient stock: {requested} requested, {available} available.")
            }
            AppError::ProductInactive if pt => "O produto não está ativo.".into(),
            AppError::ProductInactive => "The product is not active.".into(),
            AppError::EmptyCart if pt => "O carrinho está vazio.".into(),
            AppError::EmptyCart => "The cart is empty.".into(),
            AppError::NotConnected if pt => {
                "Não existe conexão aprovada entre atacadista e varejista.".into()
            }
            AppError::NotConnected => {
                "There is no approved connection between wholesaler and retailer.".into()
            }
            AppError::InvalidStateTransition(reason) => reason.clone(),
            AppError::InvalidGstNumber if pt => "O GSTIN informado é inválido.".into(),
            AppError::InvalidGstNumber => "The GST number is invalid.".into(),
            AppError::UpstreamUnavailable(_) if pt => {
                "Serviço externo indisponível no momento.".into()
            }
            AppError::UpstreamUnavailable(_) => "External service is unavailable.".into(),
            _ if pt => "Ocorreu um erro inesperado.".into(),
            _ => "An unexpected error occurred.".into(),
        }
    }

    /// Converte o erro de domínio no corpo de resposta, no idioma do cliente.
    pub fn to_api_error(&self, locale: &Locale) -> ApiError {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Erro Interno do Servidor: {}", self);
        }

        let details = match self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::ValidationError(errors) => {
                let mut fields = HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    fields.insert(field.to_string(), messages);
                }
                Some(json!({ "code": self.code(), "fields": fields }))
            }
            _ => Some(json!({ "code": self.code() })),
        };

        ApiError {
            status,
            error: self.message(&locale.0),
            details,
        }
    }
}

// Rotas sem extrator de idioma caem no inglês.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default()).into_response()
    }
}

/// Converte violações de unicidade em `Conflict`, o resto segue como erro de banco.
pub fn conflict_on_unique(e: sqlx::Error, message: impl FnOnce() -> String) -> AppError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            return AppError::Conflict(message());
        }
    }
    AppError::DatabaseError(e)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt() -> Locale {
        Locale("pt".into())
    }

    #[test]
    fn quantity_errors_share_a_code_but_not_a_variant() {
        let below = AppError::BelowMinimumOrder { moq: 10, requested: 5 };
        let stock = AppError::InsufficientStock { available: 3, requested: 5 };
        assert_eq!(below.code(), "INVALID_QUANTITY");
        assert_eq!(stock.code(), "INVALID_QUANTITY");
        assert_eq!(below.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_ne!(below.to_api_error(&pt()).error, stock.to_api_error(&pt()).error);
    }

    #[test]
    fn status_mapping() {
        assert_eq!(AppError::NotFound("Pedido").status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::NotConnected.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::InvalidStateTransition("x".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(AppError::EmptyCart.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            AppError::UpstreamUnavailable("gst".into()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn messages_follow_the_locale() {
        let err = AppError::EmptyCart;
        assert_eq!(err.to_api_error(&pt()).error, "O carrinho está vazio.");
        assert_eq!(err.to_api_error(&Locale::default()).error, "The cart is empty.");
    }

    #[test]
    fn internal_details_are_not_leaked() {
        let err = AppError::InternalServerError(anyhow::anyhow!("segredo"));
        let body = err.to_api_error(&Locale::default());
        assert_eq!(body.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.error.contains("segredo"));
    }
}
