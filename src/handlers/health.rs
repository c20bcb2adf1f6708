use axum::{extract::State, response::Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::config::Resolution;
use crate::utils::logging::*;
use crate::AppState;

pub async fn health_check() -> Json<Value> {
    log_health_check();

    Json(json!({
        "status": "healthy",
        "service": "jusgestante-painel",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Situação da conexão sem tocar no Bitrix24
pub async fn status_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    log_health_check();

    let connection = match state.connections.resolve().await {
        Resolution::Ready { source, .. } => json!({ "status": "configured", "source": source }),
        Resolution::NeedsToken(_) => json!({ "status": "needs_token" }),
        Resolution::Unconfigured => json!({ "status": "not_configured" }),
    };

    Json(json!({
        "service": "jusgestante-painel",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "environment": std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string()),
        "bitrix": {
            "domain": state.settings.bitrix.domain,
            "connection": connection,
            "secret_configured": state.connections.has_secret(),
            "use_secret": state.connections.use_secret()
        },
        "cache": {
            "path": state.settings.cache.path,
            "read_only": state.connections.cache_file().is_read_only()
        }
    }))
}
