use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{bot_logic, AppState};

#[derive(Deserialize)]
pub struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    pub mode: String,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: String,
    #[serde(rename = "hub.challenge")]
    pub challenge: String,
}

pub fn verificar_webhook(params: VerifyQuery, token_esperado: &str) -> Result<String, (StatusCode, &'static str)> {
    if params.mode == "subscribe" && params.verify_token == token_esperado {
        return Ok(params.challenge);
    }
    warn!(mode = %params.mode, "verificación de webhook rechazada");
    Err((StatusCode::FORBIDDEN, "Token inválido"))
}

pub async fn recibir_mensaje(app: &AppState, payload: Value) -> &'static str {
    // Los avisos de estado (entregado, leído) no traen "messages"
    let Some(msg) = payload["entry"][0]["changes"][0]["value"]["messages"][0].as_object() else {
        debug!("evento sin mensajes ignorado");
        return "EVENT_RECEIVED";
    };

    let telefono = msg.get("from").and_then(Value::as_str).unwrap_or("");
    let texto_usuario = extraer_texto(msg);

    if !telefono.is_empty() {
        bot_logic::procesar(app, telefono, &texto_usuario).await;
    }

    "EVENT_RECEIVED"
}

/// Texto escrito, título del botón o de la fila elegida.
fn extraer_texto(msg: &serde_json::Map<String, Value>) -> String {
    if let Some(t) = msg.get("text") {
        return t["body"].as_str().unwrap_or("").to_string();
    }

    if let Some(i) = msg.get("interactive") {
        if let Some(b) = i.get("button_reply") {
            return b["title"].as_str().unwrap_or("").to_string();
        }
        if let Some(l) = i.get("list_reply") {
            return l["title"].as_str().unwrap_or("").to_string();
        }
    }

    String::new()
}

// --- MANEJADORES AXUM ---

pub async fn handle_verify_webhook(
    State(app): State<AppState>,
    Query(params): Query<VerifyQuery>,
) -> Result<String, (StatusCode, &'static str)> {
    verificar_webhook(params, &app.verify_token)
}

pub async fn handle_recibir_mensaje(State(app): State<AppState>, Json(payload): Json<Value>) -> &'static str {
    recibir_mensaje(&app, payload).await
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::Request;
    use axum::Router;
    use http_body_util::BodyExt;
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::search::SearchClient;
    use crate::sessions::SessionStore;
    use crate::whatsapp::WhatsAppClient;

    fn app() -> AppState {
        // Nadie escucha en estos puertos: los envíos fallan y solo se registran
        AppState {
            sesiones: SessionStore::new(4),
            whatsapp: WhatsAppClient::new("http://127.0.0.1:9", "PHONE", "tok", Duration::from_secs(1)).unwrap(),
            search: SearchClient::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap(),
            secret_token: "s3cr3t".to_string(),
            verify_token: "verificar".to_string(),
        }
    }

    fn router(app: AppState) -> Router {
        crate::router(app)
    }

    async fn cuerpo(respuesta: axum::response::Response) -> String {
        let bytes = respuesta.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn verificacion_devuelve_el_challenge() {
        let req = Request::get("/webhook?hub.mode=subscribe&hub.verify_token=verificar&hub.challenge=1158201444")
            .body(Body::empty())
            .unwrap();

        let respuesta = router(app()).oneshot(req).await.unwrap();

        assert_eq!(respuesta.status(), StatusCode::OK);
        assert_eq!(cuerpo(respuesta).await, "1158201444");
    }

    #[tokio::test]
    async fn verificacion_con_token_incorrecto_es_403() {
        let req = Request::get("/webhook?hub.mode=subscribe&hub.verify_token=otro&hub.challenge=1")
            .body(Body::empty())
            .unwrap();

        let respuesta = router(app()).oneshot(req).await.unwrap();

        assert_eq!(respuesta.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn mensaje_entrante_crea_sesion() {
        let app = app();
        let payload = json!({
            "entry": [{ "changes": [{ "value": { "messages": [{
                "from": "593991234567",
                "type": "interactive",
                "interactive": { "type": "button_reply", "button_reply": { "id": "Agregar", "title": "Agregar" } }
            }]}}]}]
        });
        let req = Request::post("/webhook")
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string()))
            .unwrap();

        let respuesta = router(app.clone()).oneshot(req).await.unwrap();

        assert_eq!(respuesta.status(), StatusCode::OK);
        assert_eq!(cuerpo(respuesta).await, "EVENT_RECEIVED");
        let estado = app.sesiones.si_existe("593991234567", |s| s.estado).await;
        assert_eq!(estado, Some(bot_logic::states::UserState::EsperandoNombre));
    }

    #[tokio::test]
    async fn evento_de_estado_se_ignora() {
        let app = app();
        let payload = json!({ "entry": [{ "changes": [{ "value": { "statuses": [{ "status": "read" }] } }] }] });

        assert_eq!(recibir_mensaje(&app, payload).await, "EVENT_RECEIVED");
        assert_eq!(app.sesiones.len().await, 0);
    }

    #[test]
    fn extrae_texto_de_lista() {
        let msg = json!({ "interactive": { "list_reply": { "id": "2. Suero", "title": "2. Suero" } } });
        assert_eq!(extraer_texto(msg.as_object().unwrap()), "2. Suero");

        let msg = json!({ "text": { "body": "Ibuprofeno" } });
        assert_eq!(extraer_texto(msg.as_object().unwrap()), "Ibuprofeno");
    }
}
