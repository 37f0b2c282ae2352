//! `Cache-Control` response headers.
//!
//! Public catalog and CMS routes are cacheable by browsers and CDNs for a
//! short time; authenticated routes are marked `no-store`.

use axum::http::{HeaderValue, header::CACHE_CONTROL};
use tower_http::set_header::SetResponseHeaderLayer;

/// `Cache-Control: public, max-age=<seconds>`, unless the handler already set one.
pub fn cache_control_public(max_age: u64) -> SetResponseHeaderLayer<HeaderValue> {
    let value = HeaderValue::from_str(&format!("public, max-age={max_age}"))
        .unwrap_or_else(|_| HeaderValue::from_static("no-cache"));
    SetResponseHeaderLayer::if_not_present(CACHE_CONTROL, value)
}

/// `Cache-Control: no-store`, unless the handler already set one.
pub fn no_store() -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::if_not_present(CACHE_CONTROL, HeaderValue::from_static("no-store"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, http::Request, routing::get};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_public_header_applied() {
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(cache_control_public(60));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(
            response.headers().get(CACHE_CONTROL).unwrap(),
            "public, max-age=60"
        );
    }

    #[tokio::test]
    async fn test_handler_header_wins() {
        let app = Router::new()
            .route(
                "/",
                get(|| async { ([(CACHE_CONTROL, "private")], "ok") }),
            )
            .layer(no_store());

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.headers().get(CACHE_CONTROL).unwrap(), "private");
    }
}
