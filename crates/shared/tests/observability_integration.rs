//! 可观测性模块集成测试
//!
//! 测试 metrics 记录函数和 HTTP 中间件的行为。

mod metrics_tests {
    use sponsor_shared::observability::metrics::{
        record_email_enqueued, record_email_sent, record_http_request, record_mutation,
        record_transition,
    };

    #[test]
    fn test_record_http_request() {
        record_http_request("GET", "/api/admin/conferences/{short_title}/sponsors", 200, 0.05);
        record_http_request("POST", "/api/conferences/{short_title}/sponsorships", 400, 0.01);
        record_http_request("DELETE", "/api/admin/conferences/{short_title}/sponsors/{id}", 409, 0.02);
    }

    #[test]
    fn test_record_domain_metrics() {
        for state in ["to_contact", "contacted", "unconfirmed", "confirmed", "canceled"] {
            record_transition(state);
        }
        record_mutation("create", "success");
        record_mutation("update", "invalid");
        record_email_enqueued();
        record_email_sent("failed");
    }
}

mod middleware_tests {
    use axum::{Router, body::Body, http::Request, middleware, routing::get};
    use sponsor_shared::observability::middleware::{RequestId, http_tracing, request_id};
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route(
                "/echo",
                get(|axum::Extension(id): axum::Extension<RequestId>| async move {
                    id.as_str().to_string()
                }),
            )
            .layer(middleware::from_fn(http_tracing))
            .layer(middleware::from_fn(request_id))
    }

    #[tokio::test]
    async fn test_request_id_is_propagated() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/echo")
                    .header("x-request-id", "req-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()["x-request-id"], "req-42");
    }

    #[tokio::test]
    async fn test_request_id_is_generated_when_missing() {
        let response = app()
            .oneshot(Request::builder().uri("/echo").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let id = response.headers()["x-request-id"].to_str().unwrap();
        assert!(uuid::Uuid::parse_str(id).is_ok());
    }
}
