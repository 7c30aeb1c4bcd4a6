//! Router assembly: route tables, auth middleware wiring and the shared
//! tower layers (tracing, CORS, body limit, rate limiting).

use axum::{
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::handlers::AppState;
use crate::{auth, handlers, loan_handlers, payment_handlers, reports};

/// Serves the OpenAPI specification YAML file.
async fn serve_openapi_spec() -> impl IntoResponse {
    match tokio::fs::read_to_string("openapi.yml").await {
        Ok(content) => (
            StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "text/yaml")],
            content,
        )
            .into_response(),
        Err(_) => (StatusCode::NOT_FOUND, "OpenAPI spec not found").into_response(),
    }
}

/// Serves the Swagger UI HTML page, pointed at the served OpenAPI spec.
async fn serve_swagger_ui() -> impl IntoResponse {
    let html = r#"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Prestamos API - Swagger UI</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css">
    <style>
        body { margin: 0; padding: 0; }
    </style>
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-standalone-preset.js"></script>
    <script>
        window.onload = function() {
            window.ui = SwaggerUIBundle({
                url: "/api-docs/openapi.yml",
                dom_id: '#swagger-ui',
                deepLinking: true,
                presets: [
                    SwaggerUIBundle.presets.apis,
                    SwaggerUIStandalonePreset
                ],
                layout: "StandaloneLayout"
            });
        };
    </script>
</body>
</html>
"#;
    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "text/html; charset=utf-8")],
        html,
    )
}

/// Builds the full application router.
///
/// Three tiers: unthrottled health/docs routes, the public auth routes behind
/// a strict per-IP rate limit (login and register are brute-forceable), and
/// the business routes behind the session middleware plus a looser limit.
pub fn build_router(app_state: Arc<AppState>) -> Router {
    // Business routes: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .unwrap(),
    );

    // Auth routes: 2 requests/second per IP, burst of 5
    let auth_governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(2)
            .burst_size(5)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .unwrap(),
    );

    // Business routes behind the session-cookie middleware
    let protected_routes = Router::new()
        .route("/api/user", get(auth::current_user))
        .route("/api/logout", post(auth::logout))
        .route(
            "/api/clientes",
            get(handlers::list_clientes).post(handlers::create_cliente),
        )
        .route(
            "/api/clientes/:id",
            get(handlers::get_cliente)
                .put(handlers::update_cliente)
                .delete(handlers::delete_cliente),
        )
        .route(
            "/api/cobradores",
            get(handlers::list_cobradores).post(handlers::create_cobrador),
        )
        .route(
            "/api/cobradores/:id",
            put(handlers::update_cobrador).delete(handlers::delete_cobrador),
        )
        .route(
            "/api/notas",
            get(handlers::list_notas).post(handlers::create_nota),
        )
        .route("/api/notas/:id", delete(handlers::delete_nota))
        .route(
            "/api/caja",
            get(handlers::list_caja).post(handlers::create_movimiento_caja),
        )
        .route(
            "/api/calcular-prestamo",
            post(loan_handlers::calcular_prestamo),
        )
        .route(
            "/api/prestamos",
            get(loan_handlers::list_prestamos).post(loan_handlers::create_prestamo),
        )
        .route(
            "/api/prestamos/:id",
            get(loan_handlers::get_prestamo)
                .put(loan_handlers::update_prestamo)
                .delete(loan_handlers::delete_prestamo),
        )
        .route(
            "/api/prestamos/:id/cronograma",
            get(loan_handlers::cronograma),
        )
        .route(
            "/api/prestamos/:id/pagos",
            get(loan_handlers::pagos_de_prestamo),
        )
        .route(
            "/api/pagos",
            get(payment_handlers::list_pagos).post(payment_handlers::registrar_pago),
        )
        .route("/api/pagos/:id", delete(payment_handlers::delete_pago))
        .route("/api/estadisticas", get(reports::estadisticas))
        .route("/api/cobros-dia", get(reports::cobros_dia))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            auth::require_auth,
        ))
        .layer(
            ServiceBuilder::new()
                // Request size limit: 1MB max payload
                .layer(RequestBodyLimitLayer::new(1024 * 1024))
                .layer(GovernorLayer {
                    config: governor_conf,
                }),
        );

    // Public auth entry points, rate limited harder than the business routes
    let auth_routes = Router::new()
        .route("/api/register", post(auth::register))
        .route("/api/login", post(auth::login))
        .route("/api/debug/reset-password", post(auth::debug_reset_password))
        .route(
            "/api/debug/bootstrap-admin",
            post(auth::debug_bootstrap_admin),
        )
        .layer(GovernorLayer {
            config: auth_governor_conf,
        });

    Router::new()
        .route("/health", get(handlers::health))
        .route("/docs", get(serve_swagger_ui))
        .route("/api-docs/openapi.yml", get(serve_openapi_spec))
        .merge(auth_routes)
        .merge(protected_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
