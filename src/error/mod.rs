//! Error handling for hydrofabric.
//!
//! This module provides:
//! - [`HfError`]: The main error enum for all hydrofabric operations
//! - [`ErrorCode`]: Standardized error codes for machine parsing
//! - [`StructuredError`]: Rich error type with suggestion and context, used by JSON output

mod codes;

use std::io;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use codes::ErrorCode;

/// Main error type for hydrofabric operations.
#[derive(Error, Debug)]
pub enum HfError {
    #[error("Invalid mask: {0}")]
    InvalidMask(String),

    #[error("Layer not found: {0}")]
    LayerNotFound(String),

    #[error("Failed to read layer '{layer}': {reason}")]
    LayerRead { layer: String, reason: String },

    #[error("Unsupported coordinate transform from {from} to {to}")]
    UnsupportedTransform { from: String, to: String },

    #[error("Geometry error: {0}")]
    Geometry(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Missing required config: {0}")]
    MissingConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl HfError {
    pub(crate) fn layer_read(layer: &str, reason: impl std::fmt::Display) -> Self {
        Self::LayerRead {
            layer: layer.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Get the error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidMask(_) => ErrorCode::InvalidMask,
            Self::LayerNotFound(_) => ErrorCode::LayerNotFound,
            Self::LayerRead { .. } => ErrorCode::LayerReadError,
            Self::UnsupportedTransform { .. } => ErrorCode::UnsupportedTransform,
            Self::Geometry(_) => ErrorCode::GeometryError,
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::SerializationError,
            Self::Config(_) => ErrorCode::ConfigInvalid,
            Self::MissingConfig(_) => ErrorCode::ConfigMissingRequired,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
        }
    }

    /// Get context information for this error as JSON.
    #[must_use]
    pub fn context(&self) -> Option<Value> {
        match self {
            Self::InvalidMask(reason) => Some(serde_json::json!({ "reason": reason })),
            Self::LayerNotFound(layer) => Some(serde_json::json!({ "layer": layer })),
            Self::LayerRead { layer, reason } => {
                Some(serde_json::json!({ "layer": layer, "reason": reason }))
            }
            Self::UnsupportedTransform { from, to } => {
                Some(serde_json::json!({ "from": from, "to": to }))
            }
            Self::MissingConfig(key) => Some(serde_json::json!({ "config_key": key })),
            _ => None,
        }
    }

    /// Convert this error to a structured error.
    #[must_use]
    pub fn to_structured(&self) -> StructuredError {
        StructuredError::from_hf_error(self)
    }
}

/// A structured error with machine-readable code, suggestion, and context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// The error code (e.g., "INVALID_MASK")
    pub code: ErrorCode,

    /// The numeric error code (e.g., 101)
    pub numeric_code: u16,

    /// Human-readable error message
    pub message: String,

    /// Actionable suggestion for recovery
    pub suggestion: String,

    /// Additional context for debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,

    /// Whether the user can fix this by changing inputs
    pub recoverable: bool,

    /// Error category (e.g., "mask", "layer", "config")
    pub category: String,
}

impl StructuredError {
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            numeric_code: code.numeric(),
            suggestion: code.suggestion().to_string(),
            context: None,
            recoverable: code.is_recoverable(),
            category: code.category().to_string(),
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn from_hf_error(err: &HfError) -> Self {
        let mut structured = Self::new(err.code(), err.to_string());
        structured.context = err.context();
        structured
    }

    #[must_use]
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }
}

impl std::fmt::Display for StructuredError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl From<&HfError> for StructuredError {
    fn from(err: &HfError) -> Self {
        Self::from_hf_error(err)
    }
}

/// Result type alias using HfError.
pub type Result<T> = std::result::Result<T, HfError>;
