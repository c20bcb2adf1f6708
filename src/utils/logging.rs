use tracing::{debug, error, info, warn};

pub fn log_request_received(endpoint: &str, method: &str) {
    info!("Request received: {} {}", method, endpoint);
}

pub fn log_request_processed(endpoint: &str, status: u16, duration_ms: u64) {
    info!("Request processed: {} - Status: {} - Duration: {}ms",
          endpoint, status, duration_ms);
}

pub fn log_bitrix_api_error(resource: &str, status: Option<u16>, error: &str) {
    error!("Bitrix24 API error: {} - Status: {:?} - Error: {}", resource, status, error);
}

pub fn log_config_loaded(env: &str) {
    info!("Configuration loaded successfully for environment: {}", env);
}

pub fn log_server_startup(port: u16) {
    info!("🚀 JusGestante painel server starting on port {}", port);
}

pub fn log_server_ready(port: u16) {
    info!("✅ Server ready and listening on http://0.0.0.0:{}", port);
}

pub fn log_health_check() {
    debug!("Health check requested");
}

pub fn log_connection_resolved(source: &str, account: &str, api: &str) {
    info!("🔗 Conexão Bitrix24 resolvida via {}: conta={} api={}", source, account, api);
}

pub fn log_simulated_fallback(reason: &str, rows: usize) {
    warn!("⚠️ Usando {} linhas de dados simulados: {}", rows, reason);
}

pub fn log_validation_error(field: &str, message: &str) {
    warn!("Validation error: {} - {}", field, message);
}

pub fn log_info(message: &str) {
    info!("{}", message);
}

pub fn log_error(message: &str) {
    error!("{}", message);
}

pub fn log_warning(message: &str) {
    warn!("{}", message);
}
