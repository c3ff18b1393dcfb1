use std::io;

use thiserror::Error;

/// Result type used across the GDM core crate.
pub type Result<T> = std::result::Result<T, GdmError>;

/// Canonical error representation shared by all crates.
#[derive(Debug, Error)]
pub enum GdmError {
    #[error("Error de E/S: {0}")]
    IoError(#[from] io::Error),

    #[error("Error de serialización: {0}")]
    SerializationError(String),

    #[error("Error de deserialización: {0}")]
    DeserializationError(String),

    #[error("Regla no encontrada: {0}")]
    RuleNotFound(String),

    #[error("Error de validación: {0}")]
    ValidationError(String),

    #[error("Error general: {0}")]
    GeneralError(String),

    #[error("Error de configuración: {0}")]
    ConfigError(String),

    #[error("Error de transporte: {0}")]
    TransportError(String),
}

impl From<serde_json::Error> for GdmError {
    fn from(err: serde_json::Error) -> Self {
        GdmError::DeserializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for GdmError {
    fn from(err: serde_yaml::Error) -> Self {
        GdmError::DeserializationError(err.to_string())
    }
}

impl From<anyhow::Error> for GdmError {
    fn from(err: anyhow::Error) -> Self {
        GdmError::GeneralError(err.to_string())
    }
}

/// Dedicated configuration error used by the configuration module.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Variable de entorno obligatoria ausente: {0}")]
    MissingEnvVar(String),

    #[error("Valor inválido para la variable de entorno {key}: {value}")]
    InvalidEnvVar { key: String, value: String },

    #[error("Error interno: {0}")]
    Internal(String),
}

impl From<ConfigError> for GdmError {
    fn from(value: ConfigError) -> Self {
        GdmError::ConfigError(value.to_string())
    }
}
