// src/middleware/i18n.rs

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

use crate::common::i18n::DEFAULT_LANG;

// Idioma preferido do cliente, lido do header Accept-Language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale(pub String);

impl Default for Locale {
    fn default() -> Self {
        Locale(DEFAULT_LANG.to_string())
    }
}

impl Locale {
    fn from_header(value: &str) -> Option<Self> {
        accept_language::parse(value)
            .first()
            // "pt-BR" -> "pt"
            .map(|tag| tag.split('-').next().unwrap_or(tag).to_lowercase())
            .filter(|lang| !lang.is_empty())
            .map(Locale)
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
            .and_then(|value| value.to_str().ok())
            .and_then(Locale::from_header)
            .unwrap_or_default();

        Ok(locale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(accept_language: Option<&str>) -> Locale {
        let mut builder = Request::builder();
        if let Some(value) = accept_language {
            builder = builder.header(header::ACCEPT_LANGUAGE, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        Locale::from_request_parts(&mut parts, &()).await.unwrap()
    }

    #[tokio::test]
    async fn picks_primary_language_of_highest_quality_tag() {
        assert_eq!(extract(Some("pt-BR,pt;q=0.9,en;q=0.8")).await, Locale("pt".into()));
        assert_eq!(extract(Some("en;q=0.5, pt-PT;q=0.9")).await, Locale("pt".into()));
    }

    #[tokio::test]
    async fn falls_back_to_default_language() {
        assert_eq!(extract(None).await, Locale::default());
        assert_eq!(extract(Some("")).await, Locale::default());
    }
}
