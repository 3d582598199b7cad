use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;

use crate::application::MonitoringService;

use super::handlers::{
    chart_handler, health_handler, latest_handler, report_handler, stats_handler, status_handler,
    AppState,
};

pub fn create_router(monitoring_service: Arc<MonitoringService>) -> Router {
    let state = AppState { monitoring_service };

    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/latest", get(latest_handler))
        .route("/api/report", get(report_handler))
        .route("/api/stats", get(stats_handler))
        .route("/api/status", get(status_handler))
        .route("/api/chart/{column}", get(chart_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::adapters::MemoryStorage;
    use crate::application::monitoring::tests::{service_with, ScriptedSource};

    fn service() -> Arc<MonitoringService> {
        Arc::new(service_with(ScriptedSource::new(vec![]), Arc::new(MemoryStorage::new())))
    }

    async fn get(router: Router, uri: &str) -> (StatusCode, String) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8_lossy(&body).to_string())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get(create_router(service()), "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("healthy"));
    }

    #[tokio::test]
    async fn test_empty_store_is_not_found() {
        let service = service();
        for uri in ["/api/latest", "/api/report", "/api/stats", "/api/chart/cpu"] {
            let (status, _) = get(create_router(service.clone()), uri).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_endpoints_after_cycle() {
        let service = service();
        service.run_cycle().await.unwrap();

        let (status, body) = get(create_router(service.clone()), "/api/report").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("CPU: 12.0%"));

        let (status, body) = get(create_router(service.clone()), "/api/latest").await;
        assert_eq!(status, StatusCode::OK);
        let sample: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(sample["network_total_bytes"], 7_890);

        let (status, body) = get(create_router(service.clone()), "/api/stats").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("\"count\":1"));

        let (status, body) = get(create_router(service.clone()), "/api/chart/disk").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.starts_with("<svg"));
    }

    #[tokio::test]
    async fn test_unknown_chart_column() {
        let (status, _) = get(create_router(service()), "/api/chart/swap").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_status_is_live() {
        let service = service();
        let (status, body) = get(create_router(service.clone()), "/api/status").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.starts_with("📊 Server status:"));
        assert!(service.latest().await.is_none());
    }
}
