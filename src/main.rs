mod bot_logic;
mod config;
mod search;
mod sessions;
mod whatsapp;

#[cfg(test)]
mod test_support;

use axum::{
    routing::{get, post},
    Router,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;
use search::SearchClient;
use sessions::SessionStore;
use whatsapp::WhatsAppClient;

/// Estado compartido por los manejadores del webhook.
#[derive(Clone)]
pub struct AppState {
    pub sesiones: SessionStore,
    pub whatsapp: WhatsAppClient,
    pub search: SearchClient,
    pub secret_token: String,
    pub verify_token: String,
}

pub fn router(app: AppState) -> Router {
    Router::new()
        .route("/webhook", get(whatsapp::handle_verify_webhook))
        .route("/webhook", post(whatsapp::handle_recibir_mensaje))
        .with_state(app)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "medifacil=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let app = AppState {
        sesiones: SessionStore::new(config.max_medications),
        whatsapp: WhatsAppClient::new(
            &config.graph_api_url,
            &config.phone_number_id,
            &config.whatsapp_token,
            config.whatsapp_timeout,
        )?,
        search: SearchClient::new(&config.search_api_url, config.search_timeout)?,
        secret_token: config.secret_token.clone(),
        verify_token: config.verify_token.clone(),
    };

    app.sesiones.lanzar_limpieza(config.session_ttl);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("🚀 Servidor Medifácil corriendo en http://{}", config.bind_addr);
    info!(search = %config.search_api_url, max = config.max_medications, "configuración cargada");

    axum::serve(listener, router(app)).await?;
    Ok(())
}
