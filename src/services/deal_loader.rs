//! Carga da tabela de negócios
//!
//! BI Connector: `crm_deal` + `crm_deal_uf` em sequência, unidos por
//! `ID = DEAL_ID`. REST: só `crm.deal.list`. Sem conexão, com erro ou sem
//! linhas, a carga cai para dados simulados e marca o resultado.

use crate::config::settings::ReportSettings;
use crate::config::Resolution;
use crate::reports::{simulated, PendingFields};
use crate::utils::logging::{log_bitrix_api_error, log_simulated_fallback};
use bitrix::{ApiVariant, BitrixClient, ConnectionConfig, Table, CRM_DEAL, CRM_DEAL_UF};

/// Linhas geradas quando o usuário pede dados simulados explicitamente
pub const EXPLICIT_SIMULATED_ROWS: usize = 100;

pub const CONFIG_MISSING_NOTICE: &str =
    "Configuração não encontrada. Configure a conexão na página principal.";

const DEAL_ID_COLUMN: &str = "DEAL_ID";

/// URLs de onde os negócios serão lidos
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DealSources {
    pub api_variant: ApiVariant,
    pub deals_url: String,
    /// Só no BI Connector
    pub custom_fields_url: Option<String>,
}

impl DealSources {
    pub fn from_connection(config: &ConnectionConfig) -> Option<Self> {
        let deals_url = config.url(CRM_DEAL)?.to_string();
        let custom_fields_url = match config.api_variant {
            ApiVariant::BiConnector => config.url(CRM_DEAL_UF).map(str::to_string),
            ApiVariant::Rest => None,
        };

        Some(Self {
            api_variant: config.api_variant,
            deals_url,
            custom_fields_url,
        })
    }
}

/// Origem dos dados de um pedido de relatório
#[derive(Debug, Clone)]
pub enum DealOrigin {
    Live(DealSources),
    Offline { reason: String },
}

impl DealOrigin {
    pub fn from_resolution(resolution: &Resolution) -> Self {
        match resolution {
            Resolution::Ready { config, .. } => match DealSources::from_connection(config) {
                Some(sources) => DealOrigin::Live(sources),
                None => DealOrigin::Offline {
                    reason: "Conexão sem URL de negócios".to_string(),
                },
            },
            Resolution::NeedsToken(cached) => DealOrigin::Offline {
                reason: format!(
                    "Informe o token da conta {} ({}) para carregar dados reais.",
                    cached.account_name,
                    cached.api_type.display_name()
                ),
            },
            Resolution::Unconfigured => DealOrigin::Offline {
                reason: CONFIG_MISSING_NOTICE.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub force_simulated: bool,
    pub simulated_rows: Option<usize>,
}

/// Resultado bruto da busca ao Bitrix24
#[derive(Debug, Clone, Default)]
pub struct DealFetch {
    pub table: Table,
    pub notices: Vec<String>,
    pub error: Option<String>,
}

/// Tabela final entregue ao relatório
#[derive(Debug, Clone)]
pub struct DealData {
    pub table: Table,
    pub simulated: bool,
    pub notices: Vec<String>,
}

/// Busca os negócios e, no BI Connector, junta os campos personalizados
pub async fn fetch_deals(client: &BitrixClient, sources: &DealSources, fields: &PendingFields) -> DealFetch {
    let deals = client.fetch_table(&sources.deals_url).await;
    if let Some(error) = deals.error {
        log_bitrix_api_error(CRM_DEAL, deals.status, &error);
        return DealFetch {
            error: Some(format!("Não foi possível obter dados do CRM Deal: {}", error)),
            ..DealFetch::default()
        };
    }

    let mut table = deals.table;
    let mut notices = Vec::new();

    if let Some(url) = &sources.custom_fields_url {
        let custom = client.fetch_table(url).await;

        match custom.error {
            Some(error) => {
                log_bitrix_api_error(CRM_DEAL_UF, custom.status, &error);
                notices.push(format!(
                    "Campos personalizados indisponíveis ({}); usando apenas os negócios.",
                    error
                ));
            }
            None if !custom.table.has_column(DEAL_ID_COLUMN) => {
                notices.push(format!(
                    "A tabela {} não tem a coluna {}; usando apenas os negócios.",
                    CRM_DEAL_UF, DEAL_ID_COLUMN
                ));
            }
            None => {
                let reduced = custom.table.select(&[
                    DEAL_ID_COLUMN,
                    fields.pendencias.as_str(),
                    fields.data_marcada.as_str(),
                ]);
                let joined = table.inner_join(&reduced, "ID", DEAL_ID_COLUMN);
                tracing::debug!(
                    "Join crm_deal x crm_deal_uf: {} x {} -> {} linhas",
                    table.len(),
                    reduced.len(),
                    joined.len()
                );
                table = joined;
            }
        }
    }

    for field in [fields.pendencias.as_str(), fields.data_marcada.as_str()] {
        if table.ensure_column(field, "") {
            tracing::warn!("⚠️ Coluna {} ausente nos dados do Bitrix24", field);
            notices.push(format!(
                "A coluna {} não está disponível nos dados. Usando coluna vazia.",
                field
            ));
        }
    }

    DealFetch {
        table,
        notices,
        error: None,
    }
}

/// Carrega os negócios aplicando a política de dados simulados
pub async fn load_deal_data(
    client: &BitrixClient,
    origin: &DealOrigin,
    options: &LoadOptions,
    settings: &ReportSettings,
) -> DealData {
    let fields = PendingFields::from_settings(settings);

    if options.force_simulated {
        let rows = options.simulated_rows.unwrap_or(EXPLICIT_SIMULATED_ROWS);
        return simulated_data(rows, settings, &fields, Vec::new(), "solicitado pelo usuário");
    }

    let fallback_rows = options.simulated_rows.unwrap_or(settings.simulated_rows);

    let sources = match origin {
        DealOrigin::Live(sources) => sources,
        DealOrigin::Offline { reason } => {
            return simulated_data(fallback_rows, settings, &fields, vec![reason.clone()], reason);
        }
    };

    let fetch = fetch_deals(client, sources, &fields).await;

    if let Some(error) = fetch.error {
        let mut notices = fetch.notices;
        notices.push(error.clone());
        return simulated_data(fallback_rows, settings, &fields, notices, &error);
    }

    if fetch.table.is_empty() {
        let mut notices = fetch.notices;
        notices.push("O Bitrix24 não retornou negócios.".to_string());
        return simulated_data(fallback_rows, settings, &fields, notices, "resposta sem linhas");
    }

    tracing::info!(
        "📥 {} negócios carregados via {}",
        fetch.table.len(),
        sources.api_variant
    );

    DealData {
        table: fetch.table,
        simulated: false,
        notices: fetch.notices,
    }
}

fn simulated_data(
    rows: usize,
    settings: &ReportSettings,
    fields: &PendingFields,
    notices: Vec<String>,
    reason: &str,
) -> DealData {
    let rows = rows.min(settings.max_simulated_rows);
    log_simulated_fallback(reason, rows);

    DealData {
        table: simulated::generate(rows, settings.simulated_seed, fields),
        simulated: true,
        notices,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CachedConnection, ConnectionSource, Settings};
    use httpmock::prelude::*;
    use serde_json::json;

    fn report_settings() -> ReportSettings {
        Settings::for_tests("unused.json").report
    }

    fn bi_sources(server: &MockServer) -> DealSources {
        DealSources {
            api_variant: ApiVariant::BiConnector,
            deals_url: server.url("/pbi.php?token=t&table=crm_deal"),
            custom_fields_url: Some(server.url("/pbi.php?token=t&table=crm_deal_uf")),
        }
    }

    #[test]
    fn test_sources_per_variant() {
        let bi = ConnectionConfig::new("conta", "tok", ApiVariant::BiConnector);
        let sources = DealSources::from_connection(&bi).unwrap();
        assert!(sources.deals_url.ends_with("&table=crm_deal"));
        assert!(sources.custom_fields_url.unwrap().ends_with("&table=crm_deal_uf"));

        let rest = ConnectionConfig::new("conta", "1/tok", ApiVariant::Rest);
        let sources = DealSources::from_connection(&rest).unwrap();
        assert!(sources.deals_url.ends_with("/crm.deal.list"));
        assert_eq!(sources.custom_fields_url, None);
    }

    #[test]
    fn test_origin_from_resolution() {
        assert!(matches!(
            DealOrigin::from_resolution(&Resolution::Unconfigured),
            DealOrigin::Offline { ref reason } if reason == CONFIG_MISSING_NOTICE
        ));

        let needs_token = Resolution::NeedsToken(CachedConnection {
            account_name: "conta".to_string(),
            api_type: ApiVariant::Rest,
        });
        assert!(matches!(DealOrigin::from_resolution(&needs_token), DealOrigin::Offline { .. }));

        let ready = Resolution::Ready {
            config: ConnectionConfig::new("conta", "tok", ApiVariant::BiConnector),
            source: ConnectionSource::Session,
        };
        assert!(matches!(DealOrigin::from_resolution(&ready), DealOrigin::Live(_)));
    }

    #[tokio::test]
    async fn test_biconnector_join_keeps_matching_deals() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/pbi.php").query_param("table", "crm_deal");
                then.status(200).json_body(json!([
                    ["ID", "TITLE", "CATEGORY_ID", "STAGE_ID"],
                    ["1", "Negócio 1", "0", "C0:NEW"],
                    ["2", "Negócio 2", "2", "C2:PREPARATION"],
                    ["3", "Negócio 3", "2", "C2:NEW"]
                ]));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/pbi.php").query_param("table", "crm_deal_uf");
                then.status(200).json_body(json!([
                    ["DEAL_ID", "UF_CRM_PENDENCIAS", "UF_CRM_DATA_MARCADA", "UF_CRM_OUTRO"],
                    ["2", "Pendência contrato", "2023-05-10 10:00", "x"],
                    ["3", "", "", "y"],
                    ["4", "Pendência pagamento", "", "z"]
                ]));
            })
            .await;

        let client = BitrixClient::new().unwrap();
        let fetch = fetch_deals(&client, &bi_sources(&server), &PendingFields::default()).await;

        assert!(fetch.error.is_none());
        assert!(fetch.notices.is_empty());
        let ids: Vec<_> = fetch.table.column_values("ID").into_iter().flatten().collect();
        assert_eq!(ids, ["2", "3"]);
        assert!(fetch.table.has_column("UF_CRM_PENDENCIAS"));
        assert!(!fetch.table.has_column("UF_CRM_OUTRO"));
    }

    #[tokio::test]
    async fn test_custom_fields_failure_keeps_deals() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/pbi.php").query_param("table", "crm_deal");
                then.status(200).json_body(json!([["ID", "TITLE"], ["1", "Negócio 1"]]));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/pbi.php").query_param("table", "crm_deal_uf");
                then.status(500).body("erro interno");
            })
            .await;

        let client = BitrixClient::new().unwrap();
        let fetch = fetch_deals(&client, &bi_sources(&server), &PendingFields::default()).await;

        assert!(fetch.error.is_none());
        assert_eq!(fetch.table.len(), 1);
        // Aviso do crm_deal_uf + duas colunas criadas vazias
        assert_eq!(fetch.notices.len(), 3);
        assert_eq!(fetch.table.row(0).unwrap().get("UF_CRM_PENDENCIAS"), Some(""));
    }

    #[tokio::test]
    async fn test_rest_records_get_empty_pending_columns() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/rest/1/tok/crm.deal.list");
                then.status(200).json_body(json!({
                    "result": [
                        {"ID": "10", "TITLE": "Negócio 10", "CATEGORY_ID": "2"},
                        {"ID": "11", "TITLE": "Negócio 11", "CATEGORY_ID": "0", "STAGE_ID": "C0:NEW"}
                    ],
                    "total": 2
                }));
            })
            .await;

        let sources = DealSources {
            api_variant: ApiVariant::Rest,
            deals_url: server.url("/rest/1/tok/crm.deal.list"),
            custom_fields_url: None,
        };
        let client = BitrixClient::new().unwrap();
        let data = load_deal_data(
            &client,
            &DealOrigin::Live(sources),
            &LoadOptions::default(),
            &report_settings(),
        )
        .await;

        assert!(!data.simulated);
        assert_eq!(data.table.len(), 2);
        assert!(data.table.has_column("STAGE_ID"));
        assert!(data.table.has_column("UF_CRM_DATA_MARCADA"));
        assert_eq!(data.notices.len(), 2);
    }

    #[tokio::test]
    async fn test_deal_failure_falls_back_to_simulated() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/pbi.php");
                then.status(401).body("NO_AUTH_FOUND");
            })
            .await;

        let client = BitrixClient::new().unwrap();
        let settings = report_settings();
        let data = load_deal_data(
            &client,
            &DealOrigin::Live(bi_sources(&server)),
            &LoadOptions::default(),
            &settings,
        )
        .await;

        assert!(data.simulated);
        assert_eq!(data.table.len(), settings.simulated_rows);
        assert!(data.notices.iter().any(|n| n.contains("401")));
    }

    #[tokio::test]
    async fn test_empty_response_falls_back_to_simulated() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/pbi.php").query_param("table", "crm_deal");
                then.status(200).json_body(json!([]));
            })
            .await;

        let sources = DealSources {
            custom_fields_url: None,
            ..bi_sources(&server)
        };
        let client = BitrixClient::new().unwrap();
        let data = load_deal_data(
            &client,
            &DealOrigin::Live(sources),
            &LoadOptions::default(),
            &report_settings(),
        )
        .await;

        assert!(data.simulated);
    }

    #[tokio::test]
    async fn test_offline_and_forced_simulation() {
        let client = BitrixClient::new().unwrap();
        let settings = report_settings();

        let offline = DealOrigin::from_resolution(&Resolution::Unconfigured);
        let data = load_deal_data(&client, &offline, &LoadOptions::default(), &settings).await;
        assert!(data.simulated);
        assert_eq!(data.table.len(), 50);
        assert_eq!(data.notices, [CONFIG_MISSING_NOTICE]);

        let forced = LoadOptions {
            force_simulated: true,
            simulated_rows: None,
        };
        let data = load_deal_data(&client, &offline, &forced, &settings).await;
        assert_eq!(data.table.len(), EXPLICIT_SIMULATED_ROWS);

        let capped = LoadOptions {
            force_simulated: true,
            simulated_rows: Some(1_000_000),
        };
        let data = load_deal_data(&client, &offline, &capped, &settings).await;
        assert_eq!(data.table.len(), settings.max_simulated_rows);
    }
}
