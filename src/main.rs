/// Painel JusGestante: API do relatório de Pendências
///
/// Arquitetura:
/// - Conexão com o Bitrix24 resolvida por precedência (segredo > sessão > disco > formulário)
/// - Cada pedido de relatório faz no máximo dois GETs sequenciais ao Bitrix24
/// - Sem conexão ou com falha, o relatório usa dados simulados e avisa o front-end

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use jusgestante_painel::{build_router, AppState, config, services, utils};

use config::{ConnectionCacheFile, ConnectionResolver, Resolution, Settings};
use utils::logging::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 🔧 Carregar variáveis de ambiente do arquivo .env (se existir)
    let dotenv_loaded = dotenvy::dotenv().is_ok();

    // Inicializar tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if dotenv_loaded {
        tracing::info!("✅ Arquivo .env carregado com sucesso");
    } else {
        // Em produção (Cloud Run), não existe .env - variáveis vêm do ambiente
        tracing::debug!("Arquivo .env não encontrado - usando variáveis de ambiente do sistema");
    }

    // Carregar configurações
    let settings = Settings::new()
        .map_err(|e| anyhow::anyhow!("Failed to load settings: {}", e))?;

    log_config_loaded(&std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string()));

    if settings.cache.read_only {
        log_info("ℹ️ Hospedagem somente leitura: conexão mantida apenas em memória");
    }

    // ✅ URL do webhook via Secret Manager (release) ou variável de ambiente
    let secret_manager = services::SecretManagerService::new(&settings.bitrix).await?;
    let webhook_url = secret_manager.get_bitrix_webhook_url().await;

    let bitrix_client = bitrix::BitrixClient::with_timeouts(
        settings.bitrix.timeout_seconds,
        settings.bitrix.connect_timeout_seconds,
    )?;

    let connections = ConnectionResolver::new(
        settings.bitrix.domain.clone(),
        webhook_url,
        ConnectionCacheFile::new(&settings.cache.path, settings.cache.read_only),
    );

    match connections.resolve().await {
        Resolution::Ready { config, source } => log_connection_resolved(
            &format!("{:?}", source),
            &config.account_name,
            config.api_variant.display_name(),
        ),
        Resolution::NeedsToken(cached) => log_warning(&format!(
            "⚠️ Conta {} encontrada em {}, mas o token precisa ser informado",
            cached.account_name, settings.cache.path
        )),
        Resolution::Unconfigured => log_warning("⚠️ Nenhuma conexão Bitrix24 configurada; relatórios usarão dados simulados"),
    }

    let port = settings.server.port;
    let bind_addr = format!("{}:{}", settings.server.host, port);

    // Inicializar estado da aplicação
    let app_state = Arc::new(AppState {
        settings,
        bitrix: bitrix_client,
        connections,
    });

    let app = build_router(app_state);

    log_server_startup(port);
    let listener = TcpListener::bind(&bind_addr).await?;
    log_server_ready(port);

    // Graceful shutdown com signal handling
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log_info("🛑 Server shut down gracefully");
    Ok(())
}

/// Signal handler para graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log_error(&format!("failed to install Ctrl+C handler: {}", e));
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log_error(&format!("failed to install signal handler: {}", e));
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            log_info("🛑 Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            log_info("🛑 Received SIGTERM, shutting down gracefully...");
        }
    }
}
