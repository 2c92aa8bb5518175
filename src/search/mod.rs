// Módulos
pub mod client;

pub use client::{FetchError, SearchClient};
