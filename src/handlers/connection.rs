//! Endpoints da configuração de conexão
//!
//! Espelham a tela de configuração: consultar, salvar, testar e reconfigurar.

use axum::{extract::State, response::Json};
use bitrix::{body_preview, BitrixError};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::time::Instant;

use crate::config::{ConnectionResolver, ConnectionSource, Resolution, SetupForm};
use crate::services::deal_loader::CONFIG_MISSING_NOTICE;
use crate::utils::logging::*;
use crate::utils::{AppError, AppResult};
use crate::AppState;

/// Visão pública da resolução; URLs sempre mascaradas
fn connection_view(resolution: &Resolution, resolver: &ConnectionResolver) -> Value {
    let mut view = match resolution {
        Resolution::Ready { config, source } => json!({
            "configured": true,
            "needs_token": false,
            "source": source,
            "account_name": config.account_name,
            "api_type": config.api_variant,
            "api_name": config.api_variant.display_name(),
            "urls": config.redacted_urls()
        }),
        Resolution::NeedsToken(cached) => json!({
            "configured": false,
            "needs_token": true,
            "source": ConnectionSource::DiskCache,
            "account_name": cached.account_name,
            "api_type": cached.api_type,
            "api_name": cached.api_type.display_name(),
            "message": format!("Informe o token da conta {} para concluir a conexão.", cached.account_name)
        }),
        Resolution::Unconfigured => json!({
            "configured": false,
            "needs_token": false,
            "message": CONFIG_MISSING_NOTICE
        }),
    };

    view["secret_configured"] = json!(resolver.has_secret());
    view["use_secret"] = json!(resolver.use_secret());
    view
}

pub async fn get_connection(State(state): State<Arc<AppState>>) -> Json<Value> {
    log_request_received("/api/connection", "GET");

    let resolution = state.connections.resolve().await;
    Json(connection_view(&resolution, &state.connections))
}

pub async fn save_connection(
    State(state): State<Arc<AppState>>,
    Json(form): Json<SetupForm>,
) -> AppResult<Json<Value>> {
    let start_time = Instant::now();
    log_request_received("/api/connection", "POST");

    let outcome = state.connections.submit_form(&form).await.map_err(|e| {
        log_validation_error("connection", &e.to_string());
        AppError::from(e)
    })?;

    let resolution = state.connections.resolve().await;
    let mut view = connection_view(&resolution, &state.connections);
    view["persisted"] = json!(outcome.persisted);
    view["message"] = json!("Configuração salva com sucesso!");

    log_request_processed("/api/connection", 200, start_time.elapsed().as_millis() as u64);
    Ok(Json(view))
}

/// "Reconfigurar Conexão"
pub async fn reset_connection(State(state): State<Arc<AppState>>) -> Json<Value> {
    log_request_received("/api/connection", "DELETE");

    let removed = state.connections.reset().await;
    log_info("🔄 Conexão Bitrix24 descartada; aguardando nova configuração");

    Json(json!({
        "reset": true,
        "cache_removed": removed,
        "message": CONFIG_MISSING_NOTICE
    }))
}

/// "Testar Conexão": um GET na URL de teste da variante ativa
pub async fn test_connection(State(state): State<Arc<AppState>>) -> AppResult<Json<Value>> {
    let start_time = Instant::now();
    log_request_received("/api/connection/test", "POST");

    let config = match state.connections.resolve().await {
        Resolution::Ready { config, .. } => config,
        Resolution::NeedsToken(cached) => {
            return Err(AppError::NotConfigured(format!(
                "Informe o token da conta {} antes de testar a conexão.",
                cached.account_name
            )))
        }
        Resolution::Unconfigured => {
            return Err(AppError::NotConfigured(CONFIG_MISSING_NOTICE.to_string()))
        }
    };

    let test_url = config.test_url();
    let probe = state.bitrix.probe(&test_url).await.map_err(|e: BitrixError| {
        log_bitrix_api_error("test_connection", e.status(), &config.redact(&e.to_string()));
        AppError::from(e)
    })?;

    let success = probe.is_success();
    if success {
        log_info(&format!("✅ Conexão com {} OK ({})", config.account_name, config.api_variant));
    } else {
        log_warning(&format!("⚠️ Teste de conexão retornou status {}", probe.status));
    }

    let message = if success {
        "Conexão com Bitrix24 estabelecida com sucesso!".to_string()
    } else {
        format!("Erro ao conectar com Bitrix24: status {}", probe.status)
    };

    log_request_processed("/api/connection/test", 200, start_time.elapsed().as_millis() as u64);

    Ok(Json(json!({
        "success": success,
        "status": probe.status,
        "url": config.redact(&test_url),
        "body": config.redact(body_preview(&probe.body)),
        "message": message
    })))
}
