// src/middleware/i18n.rs

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

const SUPPORTED: &[&str] = &["en", "pt"];

// Extrator de idioma a partir do Accept-Language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale(pub String);

impl Default for Locale {
    fn default() -> Self {
        Locale("en".to_string())
    }
}

impl Locale {
    pub fn from_header(header_str: &str) -> Self {
        // "pt-BR" -> negociado para "pt"; idiomas não suportados caem no padrão
        accept_language::intersection(header_str, SUPPORTED)
            .into_iter()
            .next()
            .map(Locale)
            .or_else(|| {
                accept_language::parse(header_str)
                    .first()
                    .and_then(|tag| tag.split('-').next())
                    .filter(|lang| SUPPORTED.contains(lang))
                    .map(|lang| Locale(lang.to_string()))
            })
            .unwrap_or_default()
    }
}

impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let locale = parts
            .headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|header_value| header_value.to_str().ok())
            .map(Locale::from_header)
            .unwrap_or_default();

        Ok(locale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regional_tags_fall_back_to_language() {
        assert_eq!(Locale::from_header("pt-BR,pt;q=0.9"), Locale("pt".into()));
        assert_eq!(Locale::from_header("pt-BR"), Locale("pt".into()));
    }

    #[test]
    fn unsupported_languages_use_default() {
        assert_eq!(Locale::from_header("de-DE"), Locale::default());
        assert_eq!(Locale::from_header(""), Locale::default());
    }
}
