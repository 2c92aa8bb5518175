use std::sync::LazyLock;

use regex::Regex;

use super::models::{Medication, Presentation};

/// Capacidad observada en la app original.
pub const MAXIMO_MEDICAMENTOS: usize = 4;

/// En caracteres. Mantiene la lista dentro de los límites de los mensajes de WhatsApp.
pub const LARGO_MAXIMO_NOMBRE: usize = 100;

static SOLO_DIGITOS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+$").expect("regex válida"));

/// Motivos por los que la lista rechaza un cambio. El texto se muestra tal cual al usuario.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MedicationListError {
    #[error("Solo puedes agregar hasta {max} opciones. Borra alguna antes de continuar")]
    CapacityExceeded { max: usize },
    #[error("La cantidad debe ser mayor a 0")]
    InvalidQuantity,
    #[error("El nombre del medicamento no puede estar vacío")]
    EmptyName,
    #[error("El nombre del medicamento no puede pasar de {max} caracteres")]
    NameTooLong { max: usize },
    #[error("No existe el elemento {index} en la lista ({len} elementos)")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Lista ordenada y acotada de medicamentos por cotizar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MedicationList {
    items: Vec<Medication>,
    max: usize,
}

impl Default for MedicationList {
    fn default() -> Self {
        Self::new(MAXIMO_MEDICAMENTOS)
    }
}

impl MedicationList {
    pub fn new(max: usize) -> Self {
        MedicationList { items: Vec::with_capacity(max), max }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.max
    }

    pub fn items(&self) -> &[Medication] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &Medication> {
        self.items.iter()
    }

    /// Falla con `CapacityExceeded` si ya no cabe nada más.
    pub fn ensure_capacity(&self) -> Result<(), MedicationListError> {
        if self.is_full() {
            return Err(MedicationListError::CapacityExceeded { max: self.max });
        }
        Ok(())
    }

    /// Agrega al final. La lista no cambia si se rechaza.
    pub fn add(&mut self, medication: Medication) -> Result<(), MedicationListError> {
        let name = validate_name(&medication.name)?;
        if medication.quantity == 0 {
            return Err(MedicationListError::InvalidQuantity);
        }
        self.ensure_capacity()?;

        let name = name.to_string();
        self.items.push(Medication { name, ..medication });
        Ok(())
    }

    /// Igual que `add`, pero la cantidad llega como texto del usuario.
    pub fn add_from_input(
        &mut self,
        name: &str,
        presentation: Presentation,
        quantity: &str,
    ) -> Result<(), MedicationListError> {
        let quantity = parse_quantity(quantity)?;
        self.add(Medication::new(name, presentation, quantity))
    }

    /// Quita por posición (base 0). Fuera de rango no toca la lista.
    pub fn remove(&mut self, index: usize) -> Result<Medication, MedicationListError> {
        if index >= self.items.len() {
            return Err(MedicationListError::IndexOutOfRange { index, len: self.items.len() });
        }
        Ok(self.items.remove(index))
    }
}

/// Nombre recortado, no vacío y de largo acotado.
pub fn validate_name(input: &str) -> Result<&str, MedicationListError> {
    let name = input.trim();
    if name.is_empty() {
        return Err(MedicationListError::EmptyName);
    }
    if name.chars().count() > LARGO_MAXIMO_NOMBRE {
        return Err(MedicationListError::NameTooLong { max: LARGO_MAXIMO_NOMBRE });
    }
    Ok(name)
}

/// Entero positivo, solo dígitos.
pub fn parse_quantity(input: &str) -> Result<u32, MedicationListError> {
    let input = input.trim();
    if !SOLO_DIGITOS.is_match(input) {
        return Err(MedicationListError::InvalidQuantity);
    }
    match input.parse::<u32>() {
        Ok(0) | Err(_) => Err(MedicationListError::InvalidQuantity),
        Ok(n) => Ok(n),
    }
}
