// Módulos
pub mod client;
pub mod webhook;

pub use client::WhatsAppClient;

// Re-exportar funciones manejadoras de webhook
pub use webhook::{handle_recibir_mensaje, handle_verify_webhook};
