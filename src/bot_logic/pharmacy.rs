//! Conversación: lista de medicamentos y pantalla de cotización.
//!
//! Todo aquí es síncrono y no hace red. `atender` muta la sesión y devuelve
//! qué responder; si hay que cotizar, devuelve la petición y el shell en
//! `bot_logic::procesar` lanza la búsqueda.

use std::fmt;

use tracing::debug;
use uuid::Uuid;

use super::formato;
use super::medications::{validate_name, MedicationListError};
use super::models::{PharmacyResult, Presentation};
use super::quote::{QuoteRequest, QuoteView, RankedQuote};
use super::states::UserState;
use super::{Busqueda, Respuesta, Salida};
use crate::sessions::{Borrador, PantallaCotizacion, Session};

const AGREGAR: &str = "Agregar";
const VER_LISTA: &str = "Ver Lista";
const COTIZAR: &str = "Cotizar";
const QUITAR: &str = "Quitar";
const ORDENAR: &str = "Ordenar";
const REGRESAR: &str = "Regresar";
const CANCELAR: &str = "Cancelar";

fn es(entrada: &str, opcion: &str) -> bool {
    entrada.eq_ignore_ascii_case(opcion)
}

pub fn bienvenida(sesion: &Session) -> Respuesta {
    let texto = format!(
        "¡Hola! Bienvenido a *Medifácil* 💊\nCotiza hasta {} medicamentos en las farmacias del Norte de Quito.\nSelecciona una opción:",
        sesion.medicamentos.max()
    );
    Respuesta::botones(texto, botones_menu(sesion))
}

/// "Cotizar" solo aparece cuando la lista tiene algo.
fn botones_menu(sesion: &Session) -> Vec<&'static str> {
    if sesion.medicamentos.is_empty() {
        vec![AGREGAR, VER_LISTA]
    } else {
        vec![AGREGAR, VER_LISTA, COTIZAR]
    }
}

fn menu(sesion: &Session) -> Respuesta {
    let texto = format!(
        "¿Qué deseas hacer? ({}/{} medicamentos)",
        sesion.medicamentos.len(),
        sesion.medicamentos.max()
    );
    Respuesta::botones(texto, botones_menu(sesion))
}

fn volver_al_menu(sesion: &mut Session, aviso: impl fmt::Display) -> Salida {
    sesion.estado = UserState::Inicio;
    sesion.borrador = Borrador::default();
    Salida::con(vec![Respuesta::Texto(aviso.to_string()), menu(sesion)])
}

fn botones_presentacion(texto: &str) -> Respuesta {
    Respuesta::botones(texto, Presentation::TODAS.iter().map(Presentation::as_str))
}

fn botones_cotizacion() -> Respuesta {
    Respuesta::botones("Toca *Ordenar* para cambiar el orden por precio.", [ORDENAR, REGRESAR])
}

pub fn atender(sesion: &mut Session, entrada: &str, token: &str) -> Salida {
    let entrada = entrada.trim();

    // Comandos globales: empezar de cero
    if es(entrada, "hola") || es(entrada, "inicio") {
        *sesion = Session::new(sesion.medicamentos.max());
        return Salida::con(vec![bienvenida(sesion)]);
    }

    if sesion.estado.en_formulario() && es(entrada, CANCELAR) {
        return volver_al_menu(sesion, "Listo, no se agregó nada.");
    }

    match sesion.estado {
        UserState::Inicio => atender_menu(sesion, entrada, token),
        UserState::EsperandoNombre => {
            let nombre = match validate_name(entrada) {
                Ok(nombre) => nombre,
                Err(e) => return Salida::con(vec![Respuesta::Texto(e.to_string())]),
            };
            sesion.borrador.nombre = Some(nombre.to_string());
            sesion.estado = UserState::EsperandoPresentacion;
            Salida::con(vec![botones_presentacion("¿Qué presentación necesitas?")])
        }
        UserState::EsperandoPresentacion => match entrada.parse::<Presentation>() {
            Ok(presentacion) => {
                sesion.borrador.presentacion = Some(presentacion);
                sesion.estado = UserState::EsperandoCantidad;
                Salida::con(vec![Respuesta::Texto(
                    "¿Cuántas unidades? Responde con un número (ej. 1)".to_string(),
                )])
            }
            Err(_) => Salida::con(vec![botones_presentacion("Elige una de las opciones:")]),
        },
        UserState::EsperandoCantidad => atender_cantidad(sesion, entrada),
        UserState::EsperandoQuitar => atender_quitar(sesion, entrada),
        UserState::Cotizando => {
            if es(entrada, REGRESAR) {
                sesion.cotizacion = None;
                return volver_al_menu(sesion, "Cotización cancelada.");
            }
            Salida::con(vec![Respuesta::botones(
                "⏳ Seguimos buscando precios...",
                [REGRESAR],
            )])
        }
        UserState::Cotizacion => atender_cotizacion(sesion, entrada),
    }
}

fn atender_menu(sesion: &mut Session, entrada: &str, token: &str) -> Salida {
    if es(entrada, AGREGAR) {
        if let Err(e) = sesion.medicamentos.ensure_capacity() {
            return volver_al_menu(sesion, e);
        }
        sesion.borrador = Borrador::default();
        sesion.estado = UserState::EsperandoNombre;
        return Salida::con(vec![Respuesta::Texto(
            "✍️ Escribe el nombre del medicamento (o *Cancelar*):".to_string(),
        )]);
    }

    if es(entrada, VER_LISTA) {
        let texto = formato::lista(&sesion.medicamentos);
        if sesion.medicamentos.is_empty() {
            return Salida::con(vec![Respuesta::Texto(texto), menu(sesion)]);
        }
        let mut botones = vec![QUITAR, AGREGAR, COTIZAR];
        if sesion.medicamentos.is_full() {
            botones.retain(|b| *b != AGREGAR);
        }
        // El cuerpo de un mensaje con botones es corto; la lista va aparte
        return Salida::con(vec![Respuesta::Texto(texto), Respuesta::botones("¿Qué quieres hacer?", botones)]);
    }

    if es(entrada, QUITAR) {
        if sesion.medicamentos.is_empty() {
            return volver_al_menu(sesion, "Tu lista está vacía.");
        }
        sesion.estado = UserState::EsperandoQuitar;
        return Salida::con(vec![Respuesta::Lista {
            titulo: "🗑️ Quitar".to_string(),
            cuerpo: "¿Cuál medicamento quieres quitar?".to_string(),
            boton: "Ver".to_string(),
            opciones: formato::opciones_quitar(&sesion.medicamentos),
        }]);
    }

    if es(entrada, COTIZAR) {
        let peticion = match QuoteRequest::build(&sesion.medicamentos, token) {
            Ok(p) => p,
            Err(e) => return volver_al_menu(sesion, e),
        };
        let pantalla = PantallaCotizacion::new();
        let visita = pantalla.visita;
        sesion.cotizacion = Some(pantalla);
        sesion.estado = UserState::Cotizando;
        return Salida {
            respuestas: vec![Respuesta::Texto("⏳ Buscando precios en farmacias...".to_string())],
            busqueda: Some(Busqueda { visita, peticion }),
        };
    }

    Salida::con(vec![bienvenida(sesion)])
}

fn atender_cantidad(sesion: &mut Session, entrada: &str) -> Salida {
    let nombre = sesion.borrador.nombre.clone().unwrap_or_default();
    let presentacion = sesion.borrador.presentacion.unwrap_or_default();

    match sesion.medicamentos.add_from_input(&nombre, presentacion, entrada) {
        Ok(()) => {
            let agregado = sesion
                .medicamentos
                .items()
                .last()
                .map(formato::linea_medicamento)
                .unwrap_or_default();
            volver_al_menu(sesion, format!("✅ *{}* agregado.", agregado))
        }
        // Se queda esperando una cantidad válida
        Err(e @ MedicationListError::InvalidQuantity) => Salida::con(vec![Respuesta::Texto(e.to_string())]),
        Err(MedicationListError::EmptyName) => {
            sesion.borrador = Borrador::default();
            sesion.estado = UserState::EsperandoNombre;
            Salida::con(vec![Respuesta::Texto(
                "✍️ Escribe el nombre del medicamento (o *Cancelar*):".to_string(),
            )])
        }
        Err(e) => volver_al_menu(sesion, e),
    }
}

/// Acepta "2" o la fila elegida "2. Ibuprofeno". Posiciones base 1.
fn posicion(entrada: &str) -> Option<usize> {
    let digitos: String = entrada.chars().take_while(|c| c.is_ascii_digit()).collect();
    digitos.parse::<usize>().ok().and_then(|n| n.checked_sub(1))
}

fn atender_quitar(sesion: &mut Session, entrada: &str) -> Salida {
    if es(entrada, CANCELAR) {
        return volver_al_menu(sesion, "No se quitó nada.");
    }

    let Some(indice) = posicion(entrada) else {
        return volver_al_menu(sesion, "Ese elemento ya no está en la lista.");
    };

    match sesion.medicamentos.remove(indice) {
        Ok(med) => volver_al_menu(sesion, format!("🗑️ Quitaste *{}*.", formato::linea_medicamento(&med))),
        Err(_) => volver_al_menu(sesion, "Ese elemento ya no está en la lista."),
    }
}

fn atender_cotizacion(sesion: &mut Session, entrada: &str) -> Salida {
    if es(entrada, REGRESAR) {
        sesion.cotizacion = None;
        sesion.estado = UserState::Inicio;
        return Salida::con(vec![menu(sesion)]);
    }

    let Some(pantalla) = sesion.cotizacion.as_mut() else {
        sesion.estado = UserState::Inicio;
        return Salida::con(vec![menu(sesion)]);
    };

    if es(entrada, ORDENAR) {
        pantalla.vista.toggle();
    }

    match &pantalla.vista {
        QuoteView::Loaded(quote) => Salida::con(mostrar_cotizacion(quote)),
        _ => Salida::con(vec![botones_cotizacion()]),
    }
}

fn mostrar_cotizacion(quote: &RankedQuote) -> Vec<Respuesta> {
    let mut respuestas: Vec<Respuesta> = formato::cotizacion(quote).into_iter().map(Respuesta::Texto).collect();
    respuestas.push(botones_cotizacion());
    respuestas
}

/// Aplica el resultado de la búsqueda si la pantalla de esa visita sigue abierta.
/// `None` significa que el usuario ya se fue y la respuesta se descarta.
pub fn recibir_cotizacion<E: fmt::Display>(
    sesion: &mut Session,
    visita: Uuid,
    respuesta: Result<Vec<PharmacyResult>, E>,
) -> Option<Vec<Respuesta>> {
    let pantalla = sesion.cotizacion_abierta(visita)?;
    if !pantalla.vista.resolve(respuesta) {
        return None;
    }
    pantalla.liberar_tarea();

    let cargada = match &pantalla.vista {
        QuoteView::Loaded(quote) => Some(mostrar_cotizacion(quote)),
        QuoteView::Failed(motivo) => {
            debug!(%motivo, %visita, "pantalla de cotización fallida");
            None
        }
        QuoteView::Loading => return None,
    };

    match cargada {
        Some(respuestas) => {
            sesion.estado = UserState::Cotizacion;
            Some(respuestas)
        }
        None => {
            // Sin reintento: volver a cotizar es una visita nueva
            sesion.cotizacion = None;
            let salida = volver_al_menu(
                sesion,
                "❌ No pudimos obtener la cotización en este momento. Intenta de nuevo más tarde.",
            );
            Some(salida.respuestas)
        }
    }
}
