use rust_decimal::{Decimal, RoundingStrategy};

use super::medications::MedicationList;
use super::models::{Medication, PharmacyResult};
use super::quote::RankedQuote;

/// Límite de caracteres de un mensaje de texto en WhatsApp.
pub const LIMITE_MENSAJE: usize = 4096;
/// Límite del título de una fila en un list message.
const LIMITE_FILA: usize = 24;

pub const AVISO_PRECIOS: &str = "⚠️ *Importante:* Los precios son referenciales, tomados de las páginas web de las principales farmacias del Norte de Quito.";
pub const ETIQUETA_ORDEN: &str = "Precio: Menor a Mayor";
const SEPARADOR: &str = "━━━━━━━━━━━━━━━";

pub fn linea_medicamento(med: &Medication) -> String {
    format!("{} {}(s) - {}", med.quantity, med.presentation, med.name)
}

pub fn lista(medicamentos: &MedicationList) -> String {
    if medicamentos.is_empty() {
        return "🧾 Tu lista está vacía. Usa *Agregar* para empezar.".to_string();
    }

    let mut res = format!("🧾 *Tu lista ({}/{}):*\n", medicamentos.len(), medicamentos.max());
    res.push_str(SEPARADOR);
    res.push('\n');
    for (i, med) in medicamentos.iter().enumerate() {
        res.push_str(&format!("{}. {}\n", i + 1, linea_medicamento(med)));
    }
    res
}

/// Filas "1. Nombre" para elegir qué quitar.
pub fn opciones_quitar(medicamentos: &MedicationList) -> Vec<String> {
    medicamentos
        .iter()
        .enumerate()
        .map(|(i, med)| {
            let fila = format!("{}. {}", i + 1, med.name);
            fila.chars().take(LIMITE_FILA).collect()
        })
        .collect()
}

pub fn precio(valor: Decimal) -> String {
    let redondeado = valor.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("${:.2}", redondeado)
}

pub fn tarjeta_farmacia(farmacia: &PharmacyResult) -> String {
    let mut res = format!("🏥 *{}*\n", farmacia.name);
    if !farmacia.location.is_empty() {
        res.push_str(&format!("📍 {}\n", farmacia.location));
    }
    res.push_str(&format!("💰 *Total: {}*\n", precio(farmacia.total())));
    res.push_str(&format!(
        "_Encontrados {} de {} medicamentos_\n",
        farmacia.found_count(),
        farmacia.products.len()
    ));

    for producto in &farmacia.products {
        let detalle = match (producto.found, producto.price) {
            (true, Some(p)) => precio(p),
            (true, None) => "Precio no informado".to_string(),
            (false, _) => "No disponible".to_string(),
        };
        res.push_str(&format!("• {}: {}\n", producto.name, detalle));
        if let Some(link) = producto.link.as_deref().filter(|l| !l.is_empty()) {
            res.push_str(&format!("  🔗 {}\n", link));
        }
    }

    if !farmacia.link.is_empty() {
        res.push_str(&format!("🔗 {}\n", farmacia.link));
    }
    res
}

/// Cotización completa, ya partida en mensajes que caben en WhatsApp.
pub fn cotizacion(quote: &RankedQuote) -> Vec<String> {
    let mut encabezado = format!("{}\n\n", AVISO_PRECIOS);
    encabezado.push_str(&format!("{} {}\n", ETIQUETA_ORDEN, quote.order().flecha()));
    encabezado.push_str(&format!("*{} Resultados*", quote.len()));
    if quote.is_empty() {
        encabezado.push_str("\n\nNo encontramos farmacias con esos medicamentos.");
    }

    let mut bloques = vec![encabezado];
    bloques.extend(quote.pharmacies().map(tarjeta_farmacia));
    partir_en_mensajes(bloques, LIMITE_MENSAJE)
}

/// Agrupa bloques en mensajes de hasta `limite` caracteres sin cortar un bloque,
/// salvo que el bloque solo ya no quepa.
pub fn partir_en_mensajes(bloques: Vec<String>, limite: usize) -> Vec<String> {
    let mut mensajes: Vec<String> = Vec::new();
    let mut actual = String::new();

    for bloque in bloques {
        let separador = if actual.is_empty() { 0 } else { 2 };
        if actual.chars().count() + separador + bloque.chars().count() > limite && !actual.is_empty() {
            mensajes.push(std::mem::take(&mut actual));
        }

        if bloque.chars().count() > limite {
            let chars: Vec<char> = bloque.chars().collect();
            mensajes.extend(chars.chunks(limite).map(|c| c.iter().collect::<String>()));
            continue;
        }

        if !actual.is_empty() {
            actual.push_str("\n\n");
        }
        actual.push_str(&bloque);
    }

    if !actual.is_empty() {
        mensajes.push(actual);
    }
    mensajes
}
