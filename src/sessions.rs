//! Sesiones de chat en memoria. Nada sobrevive a un reinicio del proceso.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::Instant;
use tracing::info;
use uuid::Uuid;

use crate::bot_logic::medications::MedicationList;
use crate::bot_logic::models::Presentation;
use crate::bot_logic::quote::QuoteView;
use crate::bot_logic::states::UserState;

/// Campos del formulario de alta mientras el usuario los va enviando.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Borrador {
    pub nombre: Option<String>,
    pub presentacion: Option<Presentation>,
}

/// Pantalla de cotización abierta. Al soltarla se aborta la búsqueda en curso.
#[derive(Debug)]
pub struct PantallaCotizacion {
    pub visita: Uuid,
    pub vista: QuoteView,
    tarea: Option<AbortHandle>,
}

impl PantallaCotizacion {
    pub fn new() -> Self {
        PantallaCotizacion {
            visita: Uuid::new_v4(),
            vista: QuoteView::Loading,
            tarea: None,
        }
    }

    pub fn adjuntar_tarea(&mut self, tarea: AbortHandle) {
        self.tarea = Some(tarea);
    }

    /// La búsqueda ya respondió; cerrar la pantalla deja de abortar la tarea.
    pub fn liberar_tarea(&mut self) {
        self.tarea = None;
    }
}

impl Drop for PantallaCotizacion {
    fn drop(&mut self) {
        if let Some(tarea) = self.tarea.take() {
            tarea.abort();
        }
    }
}

#[derive(Debug)]
pub struct Session {
    pub estado: UserState,
    pub borrador: Borrador,
    pub medicamentos: MedicationList,
    pub cotizacion: Option<PantallaCotizacion>,
    ultima_actividad: Instant,
}

impl Session {
    pub fn new(max_medicamentos: usize) -> Self {
        Session {
            estado: UserState::Inicio,
            borrador: Borrador::default(),
            medicamentos: MedicationList::new(max_medicamentos),
            cotizacion: None,
            ultima_actividad: Instant::now(),
        }
    }

    /// ¿La pantalla de cotización con esta visita sigue abierta?
    pub fn cotizacion_abierta(&mut self, visita: Uuid) -> Option<&mut PantallaCotizacion> {
        self.cotizacion.as_mut().filter(|p| p.visita == visita)
    }
}

#[derive(Clone)]
pub struct SessionStore {
    sesiones: Arc<Mutex<HashMap<String, Session>>>,
    max_medicamentos: usize,
}

impl SessionStore {
    pub fn new(max_medicamentos: usize) -> Self {
        SessionStore {
            sesiones: Arc::new(Mutex::new(HashMap::new())),
            max_medicamentos,
        }
    }

    /// Ejecuta `f` sobre la sesión del teléfono, creándola si no existe.
    pub async fn con_sesion<R>(&self, telefono: &str, f: impl FnOnce(&mut Session) -> R) -> R {
        let mut sesiones = self.sesiones.lock().await;
        let sesion = sesiones
            .entry(telefono.to_string())
            .or_insert_with(|| Session::new(self.max_medicamentos));
        sesion.ultima_actividad = Instant::now();
        f(sesion)
    }

    /// Como `con_sesion`, pero sin crear ni refrescar la sesión.
    pub async fn si_existe<R>(&self, telefono: &str, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        let mut sesiones = self.sesiones.lock().await;
        sesiones.get_mut(telefono).map(f)
    }

    /// Descarta sesiones sin actividad en `ttl`. Devuelve cuántas se eliminaron.
    pub async fn purgar_inactivas(&self, ttl: Duration) -> usize {
        let mut sesiones = self.sesiones.lock().await;
        let antes = sesiones.len();
        sesiones.retain(|_, s| s.ultima_actividad.elapsed() < ttl);
        antes - sesiones.len()
    }

    pub async fn len(&self) -> usize {
        self.sesiones.lock().await.len()
    }

    /// Limpieza periódica de chats inactivos en segundo plano.
    pub fn lanzar_limpieza(&self, ttl: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let periodo = ttl.clamp(Duration::from_secs(1), Duration::from_secs(60));
            let mut intervalo = tokio::time::interval(periodo);
            loop {
                intervalo.tick().await;
                let purgadas = store.purgar_inactivas(ttl).await;
                if purgadas > 0 {
                    let activas = store.len().await;
                    info!(purgadas, activas, "🧹 sesiones inactivas descartadas");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn crea_la_sesion_al_primer_mensaje() {
        let store = SessionStore::new(4);
        assert!(store.si_existe("593999", |_| ()).await.is_none());

        let estado = store.con_sesion("593999", |s| s.estado).await;

        assert_eq!(estado, UserState::Inicio);
        assert_eq!(store.len().await, 1);
        assert_eq!(store.si_existe("593999", |s| s.medicamentos.max()).await, Some(4));
    }

    #[tokio::test]
    async fn purga_solo_las_inactivas() {
        let store = SessionStore::new(4);
        store.con_sesion("a", |_| ()).await;
        store.con_sesion("b", |_| ()).await;

        assert_eq!(store.purgar_inactivas(Duration::from_secs(3600)).await, 0);
        assert_eq!(store.purgar_inactivas(Duration::ZERO).await, 2);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn limpieza_en_segundo_plano_descarta_inactivas() {
        let store = SessionStore::new(4);
        store.con_sesion("a", |_| ()).await;

        let limpieza = store.lanzar_limpieza(Duration::ZERO);
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(store.len().await, 0);
        limpieza.abort();
    }

    #[tokio::test]
    async fn soltar_la_pantalla_aborta_la_busqueda() {
        let tarea = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
        });
        let mut pantalla = PantallaCotizacion::new();
        pantalla.adjuntar_tarea(tarea.abort_handle());

        drop(pantalla);

        let resultado = tarea.await;
        assert!(resultado.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn tarea_liberada_sobrevive_al_cierre() {
        let tarea = tokio::spawn(async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            "enviado"
        });
        let mut pantalla = PantallaCotizacion::new();
        pantalla.adjuntar_tarea(tarea.abort_handle());

        pantalla.liberar_tarea();
        drop(pantalla);

        assert_eq!(tarea.await.unwrap(), "enviado");
    }

    #[test]
    fn visita_distinta_no_coincide() {
        let mut sesion = Session::new(4);
        sesion.cotizacion = Some(PantallaCotizacion::new());
        let visita = sesion.cotizacion.as_ref().unwrap().visita;

        assert!(sesion.cotizacion_abierta(visita).is_some());
        assert!(sesion.cotizacion_abierta(Uuid::new_v4()).is_none());
    }
}
