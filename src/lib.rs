//! GDM: motor de reglas de contenido para productos de tienda.
//!
//! Las reglas seleccionan productos por alcance (categorías, etiquetas,
//! atributos, precio, título) y modifican sus descripciones, título, precio,
//! galería y estado destacado al renderizar.
//!
//! # Arquitectura
//!
//! * `gdm_core`: errores, configuración, logging y deserialización tolerante
//! * `gdm_protocol`: modelo de producto y formato de precios
//! * `gdm_rules`: almacén, evaluación, composición, campos personalizados y API admin
//! * `gdm_cron`: planificador que abre y cierra las ventanas de activación

pub use gdm_core;
pub use gdm_cron;
pub use gdm_protocol;
pub use gdm_rules;

pub use gdm_protocol::catalog::{Currency, Product, ProductBuilder};
pub use gdm_rules::{RenderOutcome, Rule, RuleEngine, RuleStore, Slot};

/// Versión del formato de reglas almacenadas.
pub const RULE_FORMAT_VERSION: &str = "1.0";

/// Comprueba si un documento de reglas es compatible con este motor.
pub fn verify_format_compatibility(version: &str) -> bool {
    version.split('.').next() == RULE_FORMAT_VERSION.split('.').next()
}
