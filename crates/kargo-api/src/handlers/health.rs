//! Health probe

use crate::handlers::ok;
use actix_web::HttpResponse;
use serde_json::json;

/// GET /health — liveness only; no dependencies are touched.
pub async fn health() -> HttpResponse {
    ok(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn test_health_shape() {
        let response = health().await;
        let bytes = to_bytes(response.into_body()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], serde_json::json!(true));
        assert_eq!(body["data"]["status"], serde_json::json!("ok"));
    }
}
