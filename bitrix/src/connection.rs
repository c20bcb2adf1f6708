//! Modelo de conexão com o Bitrix24
//!
//! O Bitrix24 expõe duas APIs mutuamente exclusivas para leitura de negócios:
//!
//! - **REST (webhook)**: `https://{conta}.{domínio}/rest/{token}/{método}`
//! - **BI Connector**: `https://{conta}.{domínio}/bitrix/tools/biconnector/pbi.php?token={token}&table={tabela}`
//!
//! Ambas carregam a credencial na própria URL. Toda URL exibida em log ou
//! devolvida pela API passa por [`redact_url`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Domínio padrão das contas brasileiras do Bitrix24
pub const DEFAULT_DOMAIN: &str = "bitrix24.com.br";

/// Recurso lógico: lista de negócios
pub const CRM_DEAL: &str = "crm_deal";
/// Recurso lógico: descrição dos campos de negócio (REST)
pub const CRM_DEAL_FIELDS: &str = "crm_deal_fields";
/// Recurso lógico: tabela de campos personalizados (BI Connector)
pub const CRM_DEAL_UF: &str = "crm_deal_uf";

const BICONNECTOR_PATH: &str = "/bitrix/tools/biconnector/pbi.php";

static REST_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/rest/(?:\d+/)?[^/?#]+").expect("static regex"));
static QUERY_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([?&]token=)[^&#]+").expect("static regex"));

// O domínio é comparado depois da captura, então os padrões valem para qualquer domínio
static BI_WEBHOOK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://([A-Za-z0-9][A-Za-z0-9-]*)\.([^/?#]+)/bitrix/tools/biconnector/pbi\.php\?(?:[^#]*&)?token=([^&#]+)")
        .expect("static regex")
});
static REST_WEBHOOK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://([A-Za-z0-9][A-Za-z0-9-]*)\.([^/?#]+)/rest/([^?#]+)").expect("static regex")
});

/// Variante de API usada para falar com o Bitrix24
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiVariant {
    Rest,
    #[serde(alias = "bi_connector")]
    BiConnector,
}

impl ApiVariant {
    /// Converte o valor do formulário/arquivo (case-insensitive)
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "rest" => Some(Self::Rest),
            "biconnector" | "bi_connector" | "bi-connector" => Some(Self::BiConnector),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rest => "rest",
            Self::BiConnector => "biconnector",
        }
    }

    /// Nome legível para a interface
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Rest => "REST API",
            Self::BiConnector => "BI Connector",
        }
    }
}

impl fmt::Display for ApiVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Configuração de conexão ativa
///
/// O token nunca é serializado; para expor a conexão use [`ConnectionConfig::redacted_urls`].
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub account_name: String,
    pub api_variant: ApiVariant,
    token: String,
    domain: String,
    urls: BTreeMap<String, String>,
}

impl ConnectionConfig {
    /// Monta a conexão no domínio padrão
    pub fn new(account_name: impl Into<String>, token: impl Into<String>, api_variant: ApiVariant) -> Self {
        Self::with_domain(account_name, token, api_variant, DEFAULT_DOMAIN)
    }

    pub fn with_domain(
        account_name: impl Into<String>,
        token: impl Into<String>,
        api_variant: ApiVariant,
        domain: impl Into<String>,
    ) -> Self {
        let account_name = account_name.into().trim().to_string();
        let token = token.into().trim().to_string();
        let domain = domain.into();
        let urls = build_urls(&domain, &account_name, &token, api_variant);

        Self {
            account_name,
            api_variant,
            token,
            domain,
            urls,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Mapa recurso lógico → URL (com credencial)
    pub fn urls(&self) -> &BTreeMap<String, String> {
        &self.urls
    }

    pub fn url(&self, resource: &str) -> Option<&str> {
        self.urls.get(resource).map(String::as_str)
    }

    /// URL usada pelo teste de conexão
    pub fn test_url(&self) -> String {
        let base = base_url(&self.domain, &self.account_name, &self.token, self.api_variant);
        match self.api_variant {
            ApiVariant::Rest => format!("{}/profile", base),
            ApiVariant::BiConnector => format!("{}&table=b_user", base),
        }
    }

    /// Mesmo mapa de [`ConnectionConfig::urls`], com o token mascarado
    pub fn redacted_urls(&self) -> BTreeMap<String, String> {
        self.urls
            .iter()
            .map(|(name, url)| (name.clone(), self.redact(url)))
            .collect()
    }

    /// Mascara o token desta conexão em qualquer texto (URL, corpo de erro)
    ///
    /// Só as posições onde o token aparece numa URL são trocadas: depois de
    /// `/rest/` e depois de `token=`. O resto do texto fica intacto mesmo
    /// quando o token é curto.
    pub fn redact(&self, text: &str) -> String {
        if self.token.is_empty() {
            return redact_url(text);
        }
        let masked = text
            .replace(&format!("/rest/{}", self.token), "/rest/***")
            .replace(&format!("token={}", self.token), "token=***");
        redact_url(&masked)
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("account_name", &self.account_name)
            .field("api_variant", &self.api_variant)
            .field("token", &"<redacted>")
            .field("domain", &self.domain)
            .finish()
    }
}

fn base_url(domain: &str, account_name: &str, token: &str, variant: ApiVariant) -> String {
    match variant {
        ApiVariant::Rest => format!("https://{}.{}/rest/{}", account_name, domain, token),
        ApiVariant::BiConnector => format!(
            "https://{}.{}{}?token={}",
            account_name, domain, BICONNECTOR_PATH, token
        ),
    }
}

/// Monta o mapa de recursos para (conta, token, variante)
///
/// Função pura: mesmas entradas produzem sempre o mesmo mapa.
pub fn build_urls(
    domain: &str,
    account_name: &str,
    token: &str,
    variant: ApiVariant,
) -> BTreeMap<String, String> {
    let base = base_url(domain, account_name, token, variant);
    let mut urls = BTreeMap::new();

    match variant {
        ApiVariant::Rest => {
            urls.insert(CRM_DEAL.to_string(), format!("{}/crm.deal.list", base));
            urls.insert(CRM_DEAL_FIELDS.to_string(), format!("{}/crm.deal.fields", base));
        }
        ApiVariant::BiConnector => {
            urls.insert(CRM_DEAL.to_string(), format!("{}&table=crm_deal", base));
            urls.insert(CRM_DEAL_UF.to_string(), format!("{}&table=crm_deal_uf", base));
        }
    }

    urls
}

/// Classifica uma URL de webhook vinda do cofre de segredos
///
/// Retorna `None` quando a URL não pertence a `domain` ou não segue nenhum
/// dos dois formatos. Para REST, segmentos finais com ponto
/// (`crm.deal.list.json`) são tratados como nome de método e descartados.
pub fn parse_webhook_url(url: &str, domain: &str) -> Option<ConnectionConfig> {
    let url = url.trim();

    if let Some(caps) = BI_WEBHOOK_RE.captures(url) {
        if !caps.get(2)?.as_str().eq_ignore_ascii_case(domain) {
            return None;
        }
        let account = caps.get(1)?.as_str();
        let token = caps.get(3)?.as_str();
        return Some(ConnectionConfig::with_domain(account, token, ApiVariant::BiConnector, domain));
    }

    let caps = REST_WEBHOOK_RE.captures(url)?;
    if !caps.get(2)?.as_str().eq_ignore_ascii_case(domain) {
        return None;
    }
    let account = caps.get(1)?.as_str();
    let token = caps
        .get(3)?
        .as_str()
        .split('/')
        .filter(|segment| !segment.is_empty() && !segment.contains('.'))
        .collect::<Vec<_>>()
        .join("/");

    if token.is_empty() {
        return None;
    }

    Some(ConnectionConfig::with_domain(account, token, ApiVariant::Rest, domain))
}

/// Mascara credenciais conhecidas em URLs do Bitrix24
pub fn redact_url(url: &str) -> String {
    let masked = QUERY_TOKEN_RE.replace_all(url, "${1}***");
    REST_TOKEN_RE.replace_all(&masked, "/rest/***").into_owned()
}
