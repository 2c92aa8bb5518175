// Módulos
pub mod formato;
pub mod medications;
pub mod models;
pub mod pharmacy;
pub mod quote;
pub mod states;

use tracing::{debug, error, info};
use uuid::Uuid;

use crate::search::FetchError;
use crate::AppState;
use self::models::PharmacyResult;
use self::quote::QuoteRequest;

/// Lo que el bot le contesta al usuario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Respuesta {
    Texto(String),
    Botones { texto: String, botones: Vec<String> },
    Lista { titulo: String, cuerpo: String, boton: String, opciones: Vec<String> },
}

impl Respuesta {
    pub fn botones<I, S>(texto: impl Into<String>, botones: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Respuesta::Botones {
            texto: texto.into(),
            botones: botones.into_iter().map(Into::into).collect(),
        }
    }
}

/// Búsqueda pendiente de lanzar para una pantalla de cotización.
#[derive(Debug)]
pub struct Busqueda {
    pub visita: Uuid,
    pub peticion: QuoteRequest,
}

/// Resultado de atender un mensaje.
#[derive(Debug)]
pub struct Salida {
    pub respuestas: Vec<Respuesta>,
    pub busqueda: Option<Busqueda>,
}

impl Salida {
    pub fn con(respuestas: Vec<Respuesta>) -> Self {
        Salida { respuestas, busqueda: None }
    }
}

pub async fn procesar(app: &AppState, telefono: &str, entrada: &str) {
    let salida = app
        .sesiones
        .con_sesion(telefono, |sesion| {
            let salida = pharmacy::atender(sesion, entrada, &app.secret_token);
            info!(telefono, estado = %sesion.estado, entrada, "🤖 mensaje atendido");
            salida
        })
        .await;

    for respuesta in &salida.respuestas {
        app.whatsapp.enviar(telefono, respuesta).await;
    }

    if let Some(busqueda) = salida.busqueda {
        lanzar_cotizacion(app, telefono, busqueda).await;
    }
}

/// Una sola búsqueda por visita. La tarea queda en manos de la pantalla:
/// si la pantalla se cierra antes de la respuesta, la tarea se aborta.
async fn lanzar_cotizacion(app: &AppState, telefono: &str, busqueda: Busqueda) {
    let Busqueda { visita, peticion } = busqueda;

    // Se lanza con la sesión tomada: la tarea no puede completar antes de quedar adjunta
    let lanzada = app
        .sesiones
        .si_existe(telefono, |sesion| {
            let Some(pantalla) = sesion.cotizacion_abierta(visita) else {
                return false;
            };
            let tarea_app = app.clone();
            let tarea_telefono = telefono.to_string();
            let tarea = tokio::spawn(async move {
                let respuesta = tarea_app.search.buscar(&peticion).await;
                completar_cotizacion(&tarea_app, &tarea_telefono, visita, respuesta).await;
            });
            pantalla.adjuntar_tarea(tarea.abort_handle());
            true
        })
        .await
        .unwrap_or(false);

    if !lanzada {
        debug!(telefono, %visita, "cotización no lanzada: la pantalla ya se cerró");
    }
}

async fn completar_cotizacion(
    app: &AppState,
    telefono: &str,
    visita: Uuid,
    respuesta: Result<Vec<PharmacyResult>, FetchError>,
) {
    match &respuesta {
        Ok(farmacias) => info!(telefono, resultados = farmacias.len(), "✅ cotización recibida"),
        Err(e) => error!(telefono, error = %e, "❌ falló la cotización"),
    }

    let respuestas = app
        .sesiones
        .si_existe(telefono, |sesion| pharmacy::recibir_cotizacion(sesion, visita, respuesta))
        .await
        .flatten();

    let Some(respuestas) = respuestas else {
        debug!(telefono, %visita, "cotización descartada: la pantalla ya no existe");
        return;
    };

    for respuesta in &respuestas {
        app.whatsapp.enviar(telefono, respuesta).await;
    }
}
