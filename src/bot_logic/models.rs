use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Forma farmacéutica que el usuario elige al agregar un medicamento.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Presentation {
    #[default]
    Tabletas,
    Gotas,
    Otros,
}

impl Presentation {
    pub const TODAS: [Presentation; 3] = [Presentation::Tabletas, Presentation::Gotas, Presentation::Otros];

    pub fn as_str(&self) -> &'static str {
        match self {
            Presentation::Tabletas => "Tabletas",
            Presentation::Gotas => "Gotas",
            Presentation::Otros => "Otros",
        }
    }
}

impl fmt::Display for Presentation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Presentation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tabletas" => Ok(Presentation::Tabletas),
            "gotas" => Ok(Presentation::Gotas),
            "otros" => Ok(Presentation::Otros),
            _ => Err(format!("Presentación desconocida: {}", s)),
        }
    }
}

/// Una línea de la lista: lo que el usuario quiere cotizar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Medication {
    pub name: String,
    pub presentation: Presentation,
    pub quantity: u32,
}

impl Medication {
    pub fn new(name: impl Into<String>, presentation: Presentation, quantity: u32) -> Self {
        Medication {
            name: name.into(),
            presentation,
            quantity,
        }
    }

    /// Término de búsqueda: `"<nombre> <presentación>"`.
    pub fn search_term(&self) -> String {
        // La coma separa términos en `name=`; una coma dentro del nombre partiría el medicamento en dos
        format!("{} {}", self.name.replace(',', " "), self.presentation)
    }
}

/// Producto dentro del resultado de una farmacia.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Product {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub found: bool,
    #[serde(default, deserialize_with = "precio_flexible")]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub link: Option<String>,
}

/// Respuesta de una farmacia a la cotización.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PharmacyResult {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub products: Vec<Product>,
}

impl PharmacyResult {
    /// Suma de precios de los productos encontrados; un precio ausente cuenta como 0.
    /// Satura en los extremos de `Decimal` en lugar de desbordar.
    pub fn total(&self) -> Decimal {
        self.products
            .iter()
            .filter(|p| p.found)
            .map(|p| p.price.unwrap_or(Decimal::ZERO))
            .fold(Decimal::ZERO, |acc, precio| {
                acc.checked_add(precio).unwrap_or(if precio.is_sign_negative() {
                    Decimal::MIN
                } else {
                    Decimal::MAX
                })
            })
    }

    pub fn found_count(&self) -> usize {
        self.products.iter().filter(|p| p.found).count()
    }
}

/// Acepta número, texto numérico ("3.50", "$3.50"), null o basura (se toma como ausente).
fn precio_flexible<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let valor = Option::<Value>::deserialize(deserializer)?;
    Ok(match valor {
        Some(Value::Number(n)) => Decimal::from_str(&n.to_string())
            .ok()
            .or_else(|| n.as_f64().and_then(Decimal::from_f64)),
        Some(Value::String(s)) => Decimal::from_str(s.trim().trim_start_matches('$')).ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn total_ignora_no_encontrados_y_precios_nulos() {
        let farmacia: PharmacyResult = serde_json::from_str(
            r#"{
                "name": "Fybeca", "location": "Norte", "link": "https://fybeca.com",
                "products": [
                    {"name": "A", "found": true, "price": 3.5},
                    {"name": "B", "found": false, "price": null},
                    {"name": "C", "found": true, "price": null}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(farmacia.total(), dec("3.5"));
        assert_eq!(farmacia.found_count(), 2);
        assert_eq!(farmacia.products.len(), 3);
    }

    #[test]
    fn precio_de_producto_no_encontrado_no_suma() {
        let farmacia = PharmacyResult {
            name: "X".into(),
            location: String::new(),
            link: String::new(),
            products: vec![Product { name: "A".into(), found: false, price: Some(dec("9.99")), link: None }],
        };
        assert_eq!(farmacia.total(), Decimal::ZERO);
    }

    #[test]
    fn total_enorme_satura_en_lugar_de_desbordar() {
        let farmacia: PharmacyResult = serde_json::from_str(
            r#"{
                "name": "Gigante",
                "products": [
                    {"name": "A", "found": true, "price": "50000000000000000000000000000"},
                    {"name": "B", "found": true, "price": "50000000000000000000000000000"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(farmacia.total(), Decimal::MAX);
    }

    #[test]
    fn precio_acepta_texto_y_descarta_basura() {
        let productos: Vec<Product> = serde_json::from_str(
            r#"[
                {"name": "A", "found": true, "price": "2.25"},
                {"name": "B", "found": true, "price": "$1.10"},
                {"name": "C", "found": true, "price": "N/A"},
                {"name": "D", "found": true}
            ]"#,
        )
        .unwrap();

        assert_eq!(productos[0].price, Some(dec("2.25")));
        assert_eq!(productos[1].price, Some(dec("1.10")));
        assert_eq!(productos[2].price, None);
        assert_eq!(productos[3].price, None);
    }

    #[test]
    fn campos_faltantes_usan_valores_por_defecto() {
        let farmacia: PharmacyResult = serde_json::from_str(r#"{"name": "Cruz Azul"}"#).unwrap();
        assert!(farmacia.products.is_empty());
        assert!(farmacia.link.is_empty());
        assert_eq!(farmacia.total(), Decimal::ZERO);
    }

    #[test]
    fn presentacion_desde_texto() {
        assert_eq!("gotas".parse::<Presentation>(), Ok(Presentation::Gotas));
        assert_eq!(" Tabletas ".parse::<Presentation>(), Ok(Presentation::Tabletas));
        assert!("jarabe".parse::<Presentation>().is_err());
        assert_eq!(Presentation::default(), Presentation::Tabletas);
    }

    #[test]
    fn termino_de_busqueda_no_contiene_comas() {
        let med = Medication::new("Paracetamol, 500mg", Presentation::Tabletas, 1);
        assert_eq!(med.search_term(), "Paracetamol  500mg Tabletas");
    }
}
