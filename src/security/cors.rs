//! Cross-origin resource sharing policy.
//!
//! Any origin is accepted outside production. In production only the
//! configured origins are, and an empty list rejects every cross-origin call.

use std::time::Duration;

use axum::http::{header, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::ServiceConfig;

const PREFLIGHT_MAX_AGE: Duration = Duration::from_secs(12 * 60 * 60);

/// Build the CORS layer for `config`.
pub fn cors_layer(config: &ServiceConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::ORIGIN, header::CONTENT_TYPE, header::AUTHORIZATION])
        .expose_headers([header::CONTENT_LENGTH])
        .allow_credentials(false)
        .max_age(PREFLIGHT_MAX_AGE);

    if !config.environment.is_production() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring malformed CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, routing::get, Router};
    use tower::ServiceExt;

    use crate::config::Environment;

    fn app(config: &ServiceConfig) -> Router {
        Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(cors_layer(config))
    }

    fn preflight(origin: &str) -> Request<Body> {
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_any_origin_outside_production() {
        let config = ServiceConfig::default();
        let response = app(&config)
            .oneshot(preflight("https://example.com"))
            .await
            .unwrap();

        let headers = response.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers[header::ACCESS_CONTROL_MAX_AGE], "43200");
        assert!(headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).is_none());
    }

    #[tokio::test]
    async fn test_production_uses_configured_origins() {
        let mut config = ServiceConfig::default();
        config.environment = Environment::Production;
        config.security.cors_allowed_origins = vec!["https://shop.example.com".into()];

        let allowed = app(&config)
            .oneshot(preflight("https://shop.example.com"))
            .await
            .unwrap();
        assert_eq!(
            allowed.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://shop.example.com"
        );

        let denied = app(&config)
            .oneshot(preflight("https://evil.example.com"))
            .await
            .unwrap();
        assert!(denied
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }
}
