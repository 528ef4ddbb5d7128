/// Convenience result type used across psd2scene.
pub type ConvertResult<T> = Result<T, ConvertError>;

/// Top-level error taxonomy used by conversion APIs.
///
/// Only [`ConvertError::Document`] aborts a whole conversion; every other class is caught at
/// the layer boundary and reported through [`crate::Diagnostics`].
#[derive(thiserror::Error, Debug)]
pub enum ConvertError {
    /// Invalid user-provided options or data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Malformed document structure.
    #[error("document error: {0}")]
    Document(String),

    /// A scene-engine operation was rejected or failed.
    #[error("engine error: {0}")]
    Engine(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ConvertError {
    /// Build a [`ConvertError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`ConvertError::Document`] value.
    pub fn document(msg: impl Into<String>) -> Self {
        Self::Document(msg.into())
    }

    /// Build a [`ConvertError::Engine`] value.
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine(msg.into())
    }

    /// Build a [`ConvertError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Return `true` for errors that must abort the whole conversion.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Document(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
