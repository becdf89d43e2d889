// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::auth::Actor,
};

/// Guarda das rotas protegidas: valida o Bearer, resolve o `Actor` uma única
/// vez e o deixa nas extensions da requisição.
pub async fn auth_guard(
    State(app_state): State<AppState>,
    locale: Locale,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let bearer = request
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or_else(|| AppError::InvalidToken.to_api_error(&locale))?;

    let actor = app_state
        .auth_service
        .resolve_actor(bearer.token())
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    tracing::debug!("🔐 Requisição autenticada como {:?} {}", actor.role(), actor.id());

    request.extensions_mut().insert(actor);
    Ok(next.run(request).await)
}

// Extrator para obter o ator autenticado diretamente nos handlers
#[derive(Debug, Clone)]
pub struct AuthenticatedActor(pub Actor);

impl<S> FromRequestParts<S> for AuthenticatedActor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Actor>()
            .cloned()
            .map(AuthenticatedActor)
            .ok_or(AppError::InvalidToken)
    }
}
