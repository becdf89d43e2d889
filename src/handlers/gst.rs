// src/handlers/gst.rs

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::auth::validate_gst_number,
    services::gst::GstVerification,
};

// GET /api/gst/verify/{gst_number}
#[utoipa::path(
    get,
    path = "/api/gst/verify/{gst_number}",
    tag = "GST",
    responses(
        (status = 200, description = "Resultado da verificação (ou aviso de modo manual)", body = GstVerification),
        (status = 400, description = "GSTIN mal formado")
    ),
    params(("gst_number" = String, Path, description = "GSTIN com 15 caracteres"))
)]
pub async fn verify_gst(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(gst_number): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    // Formato inválido nem chega ao colaborador externo
    validate_gst_number(&gst_number).map_err(|_| AppError::InvalidGstNumber.to_api_error(&locale))?;

    let verification = app_state.gst_service.verify(&gst_number).await;
    Ok(Json(verification))
}
