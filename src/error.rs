use std::path::PathBuf;

use thiserror::Error;

use crate::pin::PinId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("No pin with id {0}")]
    PinNotFound(PinId),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("A pin dialog is already open")]
    DialogBusy,
    #[error("No pin dialog is open")]
    NotOpen,
    #[error("The pin dialog is not editing an existing pin")]
    NotEditing,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid pin JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Pin file must contain a JSON array")]
    NotAnArray,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Overlay opacity must be within 0.0..=1.0, got {0}")]
    Opacity(f32),
}
