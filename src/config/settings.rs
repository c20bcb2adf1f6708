use serde::{Deserialize, Serialize};
use config::{Config, ConfigError, Environment, File};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub bitrix: BitrixSettings,
    pub cache: CacheSettings,
    pub report: ReportSettings,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BitrixSettings {
    pub domain: String,
    pub timeout_seconds: u64,
    pub connect_timeout_seconds: u64,
    pub webhook_secret_name: String,  // Nome do segredo no Secret Manager
    pub webhook_env_var: String,  // Variável de ambiente com a URL do webhook
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CacheSettings {
    pub path: String,
    pub read_only: bool,  // Hospedagem sem escrita em disco
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReportSettings {
    pub pendencias_field: String,
    pub data_marcada_field: String,
    pub simulated_rows: usize,
    pub max_simulated_rows: usize,
    pub simulated_seed: u64,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let mut builder = Self::defaults(Config::builder())?
            // Arquivo de configuração base
            .add_source(File::with_name("config/default").required(false))
            // Arquivo específico do ambiente
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(Environment::with_prefix("PAINEL").separator("__"));

        // Cloud Run define PORT e não garante escrita persistente em disco
        if let Ok(port) = std::env::var("PORT") {
            builder = builder.set_override("server.port", port)?;
        }
        if std::env::var("K_SERVICE").is_ok() {
            builder = builder.set_override("cache.read_only", true)?;
        }

        let s = builder.build()?;

        s.try_deserialize()
    }

    /// Valores usados quando nenhum arquivo de configuração existe
    fn defaults(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        builder
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("bitrix.domain", bitrix::DEFAULT_DOMAIN)?
            .set_default("bitrix.timeout_seconds", 30)?
            .set_default("bitrix.connect_timeout_seconds", 5)?
            .set_default("bitrix.webhook_secret_name", "bitrix-webhook-url")?
            .set_default("bitrix.webhook_env_var", "BITRIX_WEBHOOK_URL")?
            .set_default("cache.path", "data/connection_config.json")?
            .set_default("cache.read_only", false)?
            .set_default("report.pendencias_field", "UF_CRM_PENDENCIAS")?
            .set_default("report.data_marcada_field", "UF_CRM_DATA_MARCADA")?
            .set_default("report.simulated_rows", 50)?
            .set_default("report.max_simulated_rows", 1000)?
            .set_default("report.simulated_seed", 42)
    }

    /// Configuração fixa para testes (sem arquivos nem variáveis de ambiente)
    pub fn for_tests(cache_path: &str) -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            bitrix: BitrixSettings {
                domain: bitrix::DEFAULT_DOMAIN.to_string(),
                timeout_seconds: 5,
                connect_timeout_seconds: 2,
                webhook_secret_name: "bitrix-webhook-url".to_string(),
                webhook_env_var: "BITRIX_WEBHOOK_URL".to_string(),
            },
            cache: CacheSettings {
                path: cache_path.to_string(),
                read_only: false,
            },
            report: ReportSettings {
                pendencias_field: "UF_CRM_PENDENCIAS".to_string(),
                data_marcada_field: "UF_CRM_DATA_MARCADA".to_string(),
                simulated_rows: 50,
                max_simulated_rows: 1000,
                simulated_seed: 42,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_deserialize() {
        let settings: Settings = Settings::defaults(Config::builder())
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.bitrix.domain, "bitrix24.com.br");
        assert_eq!(settings.report.pendencias_field, "UF_CRM_PENDENCIAS");
        assert!(!settings.cache.read_only);
    }
}
