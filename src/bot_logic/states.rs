use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserState {
    // Pantalla principal
    #[default]
    Inicio,

    // Formulario para agregar
    EsperandoNombre,
    EsperandoPresentacion,
    EsperandoCantidad,

    // Lista
    EsperandoQuitar,

    // Cotización
    Cotizando,
    Cotizacion,
}

impl UserState {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserState::Inicio => "INICIO",
            UserState::EsperandoNombre => "ESPERANDO_NOMBRE",
            UserState::EsperandoPresentacion => "ESPERANDO_PRESENTACION",
            UserState::EsperandoCantidad => "ESPERANDO_CANTIDAD",
            UserState::EsperandoQuitar => "ESPERANDO_QUITAR",
            UserState::Cotizando => "COTIZANDO",
            UserState::Cotizacion => "COTIZACION",
        }
    }

    /// Estados del formulario de alta.
    pub fn en_formulario(&self) -> bool {
        matches!(
            self,
            UserState::EsperandoNombre | UserState::EsperandoPresentacion | UserState::EsperandoCantidad
        )
    }
}

impl fmt::Display for UserState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INICIO" => Ok(UserState::Inicio),
            "ESPERANDO_NOMBRE" => Ok(UserState::EsperandoNombre),
            "ESPERANDO_PRESENTACION" => Ok(UserState::EsperandoPresentacion),
            "ESPERANDO_CANTIDAD" => Ok(UserState::EsperandoCantidad),
            "ESPERANDO_QUITAR" => Ok(UserState::EsperandoQuitar),
            "COTIZANDO" => Ok(UserState::Cotizando),
            "COTIZACION" => Ok(UserState::Cotizacion),
            _ => Err(format!("Estado desconocido: {}", s)),
        }
    }
}
