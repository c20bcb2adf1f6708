// Biblioteca do painel JusGestante
// Expõe módulos para uso em testes e no binário

pub mod config;
pub mod handlers;
pub mod reports;
pub mod services;
pub mod utils;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

// AppState é definido aqui para ser compartilhado
pub struct AppState {
    pub settings: config::Settings,
    pub bitrix: bitrix::BitrixClient,
    pub connections: config::ConnectionResolver,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health checks
        .route("/health", get(handlers::health_check))
        .route("/status", get(handlers::status_check))

        // Configuração da conexão
        .route(
            "/api/connection",
            get(handlers::get_connection)
                .post(handlers::save_connection)
                .delete(handlers::reset_connection),
        )
        .route("/api/connection/test", post(handlers::test_connection))

        // Relatórios
        .route("/api/reports/pendencias", get(handlers::pendencias_report))

        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
