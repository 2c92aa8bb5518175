use std::fmt;

use rust_decimal::Decimal;

use super::medications::MedicationList;
use super::models::PharmacyResult;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuoteError {
    #[error("Agrega al menos un medicamento antes de cotizar")]
    EmptyList,
}

/// Consulta única hacia `GET /search`.
#[derive(Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    name: String,
    token: String,
}

impl QuoteRequest {
    /// Une los términos "nombre presentación" con coma, en el orden de la lista.
    pub fn build(medications: &MedicationList, token: &str) -> Result<Self, QuoteError> {
        if medications.is_empty() {
            return Err(QuoteError::EmptyList);
        }

        let name = medications
            .iter()
            .map(|m| m.search_term())
            .collect::<Vec<_>>()
            .join(",");

        Ok(QuoteRequest { name, token: token.to_string() })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parámetros de la URL: `name` y `token`.
    pub fn query(&self) -> [(&'static str, &str); 2] {
        [("name", self.name.as_str()), ("token", self.token.as_str())]
    }
}

// El token no debe terminar en los logs
impl fmt::Debug for QuoteRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuoteRequest")
            .field("name", &self.name)
            .field("token", &"***")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

impl SortOrder {
    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::Ascending,
        }
    }

    pub fn flecha(self) -> &'static str {
        match self {
            SortOrder::Ascending => "⬆️",
            SortOrder::Descending => "⬇️",
        }
    }
}

/// Posiciones de `results` ordenadas por total. Estable: los empates conservan el orden de entrada.
fn ordenar_indices(results: &[PharmacyResult], order: SortOrder) -> Vec<usize> {
    let totales: Vec<Decimal> = results.iter().map(PharmacyResult::total).collect();
    let mut indices: Vec<usize> = (0..results.len()).collect();
    match order {
        SortOrder::Ascending => indices.sort_by(|&a, &b| totales[a].cmp(&totales[b])),
        SortOrder::Descending => indices.sort_by(|&a, &b| totales[b].cmp(&totales[a])),
    }
    indices
}

pub fn sort_by_total(results: &[PharmacyResult], order: SortOrder) -> Vec<PharmacyResult> {
    ordenar_indices(results, order)
        .into_iter()
        .map(|i| results[i].clone())
        .collect()
}

/// Resultado de la cotización con su orden actual. Siempre se reordena desde
/// la respuesta original, nunca se invierte.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedQuote {
    results: Vec<PharmacyResult>,
    order: SortOrder,
    ordenadas: Vec<PharmacyResult>,
}

impl RankedQuote {
    pub fn new(results: Vec<PharmacyResult>) -> Self {
        let order = SortOrder::default();
        let ordenadas = sort_by_total(&results, order);
        RankedQuote { results, order, ordenadas }
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    pub fn toggle(&mut self) {
        self.order = self.order.toggled();
        self.ordenadas = sort_by_total(&self.results, self.order);
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn pharmacies(&self) -> impl Iterator<Item = &PharmacyResult> {
        self.ordenadas.iter()
    }
}

/// Estado de la pantalla de cotización.
#[derive(Debug, Clone, PartialEq)]
pub enum QuoteView {
    Loading,
    Loaded(RankedQuote),
    Failed(String),
}

impl QuoteView {
    /// Aplica la respuesta de la búsqueda. Solo tiene efecto desde `Loading`.
    pub fn resolve<E: fmt::Display>(&mut self, respuesta: Result<Vec<PharmacyResult>, E>) -> bool {
        if !matches!(self, QuoteView::Loading) {
            return false;
        }
        *self = match respuesta {
            Ok(results) => QuoteView::Loaded(RankedQuote::new(results)),
            Err(e) => QuoteView::Failed(e.to_string()),
        };
        true
    }

    /// Cambia la dirección del orden. Solo tiene efecto con resultados cargados.
    pub fn toggle(&mut self) -> bool {
        match self {
            QuoteView::Loaded(quote) => {
                quote.toggle();
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::bot_logic::models::{Medication, Presentation, Product};

    fn farmacia(name: &str, total: i64) -> PharmacyResult {
        PharmacyResult {
            name: name.to_string(),
            location: "Quito".to_string(),
            link: String::new(),
            products: vec![Product {
                name: "X".to_string(),
                found: true,
                price: Some(Decimal::from(total)),
                link: None,
            }],
        }
    }

    fn nombres<'a>(it: impl Iterator<Item = &'a PharmacyResult>) -> Vec<&'a str> {
        it.map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn construye_termino_en_orden_de_la_lista() {
        let mut lista = MedicationList::default();
        lista.add(Medication::new("Ibuprofeno", Presentation::Tabletas, 2)).unwrap();
        lista.add(Medication::new("Suero", Presentation::Gotas, 1)).unwrap();

        let peticion = QuoteRequest::build(&lista, "secreto").unwrap();

        assert_eq!(peticion.name(), "Ibuprofeno Tabletas,Suero Gotas");
        assert_eq!(peticion.query(), [("name", "Ibuprofeno Tabletas,Suero Gotas"), ("token", "secreto")]);
    }

    #[test]
    fn lista_vacia_no_construye_peticion() {
        assert_eq!(
            QuoteRequest::build(&MedicationList::default(), "secreto"),
            Err(QuoteError::EmptyList)
        );
    }

    #[test]
    fn debug_no_expone_el_token() {
        let mut lista = MedicationList::default();
        lista.add(Medication::new("Ibuprofeno", Presentation::Tabletas, 1)).unwrap();
        let peticion = QuoteRequest::build(&lista, "super-secreto").unwrap();
        assert!(!format!("{:?}", peticion).contains("super-secreto"));
    }

    #[test]
    fn orden_ascendente_es_estable() {
        let entrada = vec![farmacia("a10", 10), farmacia("b5", 5), farmacia("c10", 10), farmacia("d0", 0)];

        let ordenadas = sort_by_total(&entrada, SortOrder::Ascending);

        assert_eq!(nombres(ordenadas.iter()), vec!["d0", "b5", "a10", "c10"]);
    }

    #[test]
    fn orden_descendente_es_estable() {
        let entrada = vec![farmacia("a10", 10), farmacia("b5", 5), farmacia("c10", 10), farmacia("d0", 0)];

        let ordenadas = sort_by_total(&entrada, SortOrder::Descending);

        assert_eq!(nombres(ordenadas.iter()), vec!["a10", "c10", "b5", "d0"]);
    }

    #[test]
    fn toggle_reordena_en_lugar_de_invertir() {
        let entrada = vec![farmacia("a0", 0), farmacia("b7", 7), farmacia("c0", 0)];
        let mut cotizacion = RankedQuote::new(entrada);

        assert_eq!(cotizacion.order(), SortOrder::Descending);
        assert_eq!(nombres(cotizacion.pharmacies()), vec!["b7", "a0", "c0"]);

        cotizacion.toggle();
        assert_eq!(cotizacion.order(), SortOrder::Ascending);
        // Invertir habría dado c0, a0, b7
        assert_eq!(nombres(cotizacion.pharmacies()), vec!["a0", "c0", "b7"]);

        cotizacion.toggle();
        assert_eq!(cotizacion.order(), SortOrder::Descending);
        assert_eq!(nombres(cotizacion.pharmacies()), vec!["b7", "a0", "c0"]);
    }

    #[test]
    fn ordenar_no_modifica_productos() {
        let entrada = vec![farmacia("a", 3), farmacia("b", 9)];
        let cotizacion = RankedQuote::new(entrada.clone());
        let primera = cotizacion.pharmacies().next().unwrap();
        assert_eq!(primera, &entrada[1]);
        assert_eq!(cotizacion.len(), 2);
    }

    #[test]
    fn precios_enormes_se_ordenan_sin_fallar() {
        let enorme = Decimal::from_str("50000000000000000000000000000").unwrap();
        let gigante = PharmacyResult {
            products: vec![
                Product { name: "A".into(), found: true, price: Some(enorme), link: None },
                Product { name: "B".into(), found: true, price: Some(enorme), link: None },
            ],
            ..farmacia("gigante", 0)
        };

        let cotizacion = RankedQuote::new(vec![farmacia("normal", 3), gigante]);

        assert_eq!(nombres(cotizacion.pharmacies()), vec!["gigante", "normal"]);
    }

    #[test]
    fn vista_pasa_de_cargando_a_cargada() {
        let mut vista = QuoteView::Loading;
        assert!(!vista.toggle());

        assert!(vista.resolve::<String>(Ok(vec![farmacia("a", 1)])));
        assert!(matches!(vista, QuoteView::Loaded(_)));
        assert!(vista.toggle());

        // Una segunda respuesta no pisa la primera
        assert!(!vista.resolve::<String>(Ok(vec![])));
        match &vista {
            QuoteView::Loaded(q) => assert_eq!(q.len(), 1),
            otro => panic!("estado inesperado: {:?}", otro),
        }
    }

    #[test]
    fn vista_fallida_es_terminal() {
        let mut vista = QuoteView::Loading;
        assert!(vista.resolve::<&str>(Err("timeout")));
        assert_eq!(vista, QuoteView::Failed("timeout".to_string()));
        assert!(!vista.toggle());
        assert!(!vista.resolve::<&str>(Ok(vec![])));
    }
}
