use axum::{
    body::Body as AxumBody,
    http::{header, Request},
    middleware::Next,
    response::Response,
};

/// Picks the first `Accept-Language` entry we ship translations for.
fn negotiate_locale(accept_language: Option<&str>) -> String {
    let available = rust_i18n::available_locales!();
    accept_language
        .unwrap_or_default()
        .split(',')
        .filter_map(|entry| entry.split(';').next())
        .map(|tag| tag.trim().to_lowercase())
        .filter_map(|tag| tag.split('-').next().map(str::to_string))
        .find(|lang| available.iter().any(|locale| *locale == lang.as_str()))
        .unwrap_or_else(|| "en".to_string())
}

pub async fn i18n_middleware(req: Request<AxumBody>, next: Next) -> Response {
    let locale = negotiate_locale(
        req.headers()
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|v| v.to_str().ok()),
    );
    rust_i18n::set_locale(&locale);

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negotiate_locale() {
        assert_eq!(negotiate_locale(Some("ru-RU,ru;q=0.9,en;q=0.8")), "ru");
        assert_eq!(negotiate_locale(Some("de-DE,en;q=0.5")), "en");
        assert_eq!(negotiate_locale(Some("fr")), "en");
        assert_eq!(negotiate_locale(None), "en");
    }
}
