//! Configuración leída del entorno (y de `.env` vía `dotenvy`).
//!
//! | Variable | Uso | Por defecto |
//! |---|---|---|
//! | `BIND_ADDR` | dirección del servidor | `0.0.0.0:3000` |
//! | `VERIFY_TOKEN` | verificación del webhook | obligatoria |
//! | `WHATSAPP_TOKEN` | token de la Cloud API | obligatoria |
//! | `PHONE_NUMBER_ID` | número emisor | obligatoria |
//! | `GRAPH_API_URL` | base de la Cloud API | `https://graph.facebook.com/v21.0` |
//! | `SEARCH_API_URL` | backend de cotizaciones | `http://127.0.0.1:5000` |
//! | `SECRET_TOKEN` | credencial para `/search` | obligatoria |
//! | `MAX_MEDICATIONS` | tamaño máximo de la lista | `4` |
//! | `SEARCH_TIMEOUT_SECS` | tiempo máximo de la búsqueda | `30` |
//! | `WHATSAPP_TIMEOUT_SECS` | tiempo máximo por envío a la Cloud API | `10` |
//! | `SESSION_TTL_MINS` | inactividad antes de descartar una sesión | `30` |

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::bot_logic::medications::MAXIMO_MEDICAMENTOS;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("falta la variable de entorno {0}")]
    Falta(&'static str),
    #[error("valor inválido para {variable}: {valor:?}")]
    Invalida { variable: &'static str, valor: String },
}

#[derive(Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub verify_token: String,
    pub whatsapp_token: String,
    pub phone_number_id: String,
    pub graph_api_url: String,
    pub search_api_url: String,
    pub secret_token: String,
    pub max_medications: usize,
    pub search_timeout: Duration,
    pub whatsapp_timeout: Duration,
    pub session_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Permite probar sin tocar el entorno del proceso.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let obligatoria = |k: &'static str| lookup(k).filter(|v| !v.is_empty()).ok_or(ConfigError::Falta(k));
        let opcional = |k: &'static str, defecto: &str| lookup(k).unwrap_or_else(|| defecto.to_string());

        let max_medications: usize = parsear("MAX_MEDICATIONS", opcional("MAX_MEDICATIONS", &MAXIMO_MEDICAMENTOS.to_string()))?;
        if max_medications == 0 {
            return Err(ConfigError::Invalida { variable: "MAX_MEDICATIONS", valor: "0".to_string() });
        }

        Ok(Config {
            bind_addr: parsear("BIND_ADDR", opcional("BIND_ADDR", "0.0.0.0:3000"))?,
            verify_token: obligatoria("VERIFY_TOKEN")?,
            whatsapp_token: obligatoria("WHATSAPP_TOKEN")?,
            phone_number_id: obligatoria("PHONE_NUMBER_ID")?,
            graph_api_url: opcional("GRAPH_API_URL", "https://graph.facebook.com/v21.0"),
            search_api_url: opcional("SEARCH_API_URL", "http://127.0.0.1:5000"),
            secret_token: obligatoria("SECRET_TOKEN")?,
            max_medications,
            search_timeout: Duration::from_secs(parsear("SEARCH_TIMEOUT_SECS", opcional("SEARCH_TIMEOUT_SECS", "30"))?),
            whatsapp_timeout: Duration::from_secs(parsear("WHATSAPP_TIMEOUT_SECS", opcional("WHATSAPP_TIMEOUT_SECS", "10"))?),
            session_ttl: Duration::from_secs(60 * parsear::<u64>("SESSION_TTL_MINS", opcional("SESSION_TTL_MINS", "30"))?),
        })
    }
}

fn parsear<T: FromStr>(variable: &'static str, valor: String) -> Result<T, ConfigError> {
    valor.trim().parse().map_err(|_| ConfigError::Invalida { variable, valor })
}
