use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::bot_logic::models::PharmacyResult;
use crate::bot_logic::quote::QuoteRequest;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("error de red: {0}")]
    Network(#[from] reqwest::Error),
    #[error("el servicio de búsqueda respondió {0}")]
    Status(StatusCode),
    #[error("respuesta ilegible: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Cliente del backend de cotizaciones. Una petición por cotización, sin reintentos.
#[derive(Clone)]
pub struct SearchClient {
    base_url: String,
    client: Client,
}

impl SearchClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(SearchClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// `GET /search?name=...&token=...`
    pub async fn buscar(&self, peticion: &QuoteRequest) -> Result<Vec<PharmacyResult>, FetchError> {
        let url = format!("{}/search", self.base_url);
        debug!(name = peticion.name(), "consultando farmacias");

        let respuesta = self.client.get(url).query(&peticion.query()).send().await?;
        let status = respuesta.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let cuerpo = respuesta.bytes().await?;
        let elementos: Vec<Value> = serde_json::from_slice(&cuerpo)?;

        // Un elemento mal formado no tumba toda la cotización
        let farmacias = elementos
            .into_iter()
            .filter_map(|v| match serde_json::from_value::<PharmacyResult>(v) {
                Ok(f) => Some(f),
                Err(e) => {
                    warn!(error = %e, "farmacia descartada");
                    None
                }
            })
            .collect();
        Ok(farmacias)
    }
}
