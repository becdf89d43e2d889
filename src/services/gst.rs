// src/services/gst.rs

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::common::error::AppError;

pub const MANUAL_ENTRY_ADVISORY: &str =
    "GST verification is unavailable right now; please enter business details manually.";

/// Resultado da verificação de um GSTIN.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GstVerification {
    pub is_valid: bool,
    pub business_name: Option<String>,
    pub owner_name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
    pub status: Option<String>,
    /// Preenchido quando a verificação foi pulada (modo manual)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Colaborador externo de verificação. Erros aqui são sempre `UpstreamUnavailable`.
#[async_trait]
pub trait GstVerifier: Send + Sync {
    async fn verify(&self, gst_number: &str) -> Result<GstVerification, AppError>;
}

#[derive(Debug, Clone)]
pub struct HttpGstVerifier {
    base_url: String,
    api_key: Option<String>,
    http: Client,
}

impl HttpGstVerifier {
    pub fn new(base_url: String, api_key: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url,
            api_key,
            http,
        })
    }
}

#[async_trait]
impl GstVerifier for HttpGstVerifier {
    async fn verify(&self, gst_number: &str) -> Result<GstVerification, AppError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), gst_number);

        let mut request = self.http.get(&url);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::UpstreamUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::UpstreamUnavailable(format!(
                "gst lookup failed with status {status}: {text}"
            )));
        }

        response
            .json::<GstVerification>()
            .await
            .map_err(|e| AppError::UpstreamUnavailable(e.to_string()))
    }
}

/// Fachada que nunca bloqueia o cadastro por indisponibilidade do colaborador.
#[derive(Clone)]
pub struct GstService {
    verifier: Option<Arc<dyn GstVerifier>>,
}

impl GstService {
    pub fn new(verifier: Option<Arc<dyn GstVerifier>>) -> Self {
        Self { verifier }
    }

    pub async fn verify(&self, gst_number: &str) -> GstVerification {
        let Some(verifier) = &self.verifier else {
            return Self::manual_entry();
        };

        match verifier.verify(gst_number).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("⚠️ Verificação de GST indisponível ({}), seguindo em modo manual.", e);
                Self::manual_entry()
            }
        }
    }

    fn manual_entry() -> GstVerification {
        GstVerification {
            is_valid: true,
            message: Some(MANUAL_ENTRY_ADVISORY.to_string()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Down;

    #[async_trait]
    impl GstVerifier for Down {
        async fn verify(&self, _gst_number: &str) -> Result<GstVerification, AppError> {
            Err(AppError::UpstreamUnavailable("timeout".into()))
        }
    }

    struct Rejects;

    #[async_trait]
    impl GstVerifier for Rejects {
        async fn verify(&self, _gst_number: &str) -> Result<GstVerification, AppError> {
            Ok(GstVerification {
                is_valid: false,
                status: Some("Cancelled".into()),
                ..Default::default()
            })
        }
    }

    #[tokio::test]
    async fn unavailable_collaborator_degrades_to_manual_entry() {
        let service = GstService::new(Some(Arc::new(Down)));
        let result = service.verify("27AAPFU0939F1ZV").await;
        assert!(result.is_valid);
        assert_eq!(result.message.as_deref(), Some(MANUAL_ENTRY_ADVISORY));
    }

    #[tokio::test]
    async fn missing_collaborator_degrades_to_manual_entry() {
        let result = GstService::new(None).verify("27AAPFU0939F1ZV").await;
        assert!(result.is_valid);
        assert!(result.message.is_some());
    }

    #[tokio::test]
    async fn explicit_rejection_is_passed_through() {
        let service = GstService::new(Some(Arc::new(Rejects)));
        let result = service.verify("27AAPFU0939F1ZV").await;
        assert!(!result.is_valid);
        assert!(result.message.is_none());
    }
}
