use std::time::Duration;

use reqwest::Client;
use serde_json::json;
use tracing::warn;

use crate::bot_logic::Respuesta;

#[derive(Debug, thiserror::Error)]
pub enum WhatsAppError {
    #[error("no se pudo contactar a la API de WhatsApp: {0}")]
    Network(#[from] reqwest::Error),
    #[error("la API de WhatsApp respondió {status}: {cuerpo}")]
    Rechazado { status: reqwest::StatusCode, cuerpo: String },
}

/// Cliente saliente de la Cloud API.
#[derive(Clone)]
pub struct WhatsAppClient {
    messages_url: String,
    token: String,
    client: Client,
}

impl WhatsAppClient {
    /// Cada envío tiene su propio tiempo máximo: una Cloud API lenta no debe frenar el chat.
    pub fn new(base_url: &str, phone_number_id: &str, token: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(WhatsAppClient {
            messages_url: format!("{}/{}/messages", base_url.trim_end_matches('/'), phone_number_id),
            token: token.to_string(),
            client: Client::builder().timeout(timeout).build()?,
        })
    }

    /// Envía una respuesta del bot. Un fallo se registra y no se propaga.
    pub async fn enviar(&self, telefono: &str, respuesta: &Respuesta) {
        let resultado = match respuesta {
            Respuesta::Texto(texto) => self.enviar_texto(telefono, texto).await,
            Respuesta::Botones { texto, botones } => self.enviar_botones(telefono, texto, botones).await,
            Respuesta::Lista { titulo, cuerpo, boton, opciones } => {
                self.enviar_lista(telefono, titulo, cuerpo, boton, opciones).await
            }
        };
        if let Err(e) = resultado {
            warn!(telefono, error = %e, "mensaje no entregado");
        }
    }

    pub async fn enviar_texto(&self, telefono: &str, texto: &str) -> Result<(), WhatsAppError> {
        self.llamar_meta(json!({
            "messaging_product": "whatsapp", "to": telefono,
            "type": "text", "text": { "body": texto }
        }))
        .await
    }

    pub async fn enviar_botones(&self, telefono: &str, texto: &str, botones: &[String]) -> Result<(), WhatsAppError> {
        let buttons_json: Vec<serde_json::Value> = botones
            .iter()
            .map(|b| json!({ "type": "reply", "reply": { "id": b, "title": b } }))
            .collect();

        self.llamar_meta(json!({
            "messaging_product": "whatsapp", "to": telefono,
            "type": "interactive",
            "interactive": {
                "type": "button",
                "body": { "text": texto },
                "action": { "buttons": buttons_json }
            }
        }))
        .await
    }

    pub async fn enviar_lista(
        &self,
        telefono: &str,
        titulo: &str,
        cuerpo: &str,
        boton: &str,
        opciones: &[String],
    ) -> Result<(), WhatsAppError> {
        let rows: Vec<serde_json::Value> = opciones.iter().map(|op| json!({ "id": op, "title": op })).collect();

        self.llamar_meta(json!({
            "messaging_product": "whatsapp", "to": telefono, "type": "interactive",
            "interactive": {
                "type": "list",
                "header": { "type": "text", "text": titulo },
                "body": { "text": cuerpo },
                "action": { "button": boton, "sections": [{ "title": "Opciones", "rows": rows }] }
            }
        }))
        .await
    }

    async fn llamar_meta(&self, body: serde_json::Value) -> Result<(), WhatsAppError> {
        let respuesta = self
            .client
            .post(&self.messages_url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        let status = respuesta.status();
        if !status.is_success() {
            let cuerpo = respuesta.text().await.unwrap_or_default();
            return Err(WhatsAppError::Rechazado { status, cuerpo });
        }
        Ok(())
    }
}
