//! Error types for container access and field decoding.
//!
//! All fallible functions in this crate return [`Result<T>`], which uses [`Error`]
//! as the error type.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading, decoding or writing a serialized file.
#[derive(Error, Debug)]
pub enum Error {
    /// Filesystem or stream I/O failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// `rabex` could not parse or serialize the container.
    #[error("Serialized file error: {0}")]
    Container(String),

    /// The metadata is self-inconsistent (object ranges, type trees).
    #[error("Malformed metadata: {0}")]
    MalformedMetadata(String),

    /// No layout is available to decode objects of this class.
    #[error("No layout for class {class} in Unity {unity_version}: {reason}")]
    MissingLayout {
        unity_version: String,
        class: String,
        reason: String,
    },

    /// An object's bytes do not match the layout used to decode it.
    #[error("Failed to decode field '{field}': {reason}")]
    Decode { field: String, reason: String },

    /// A field lookup by path failed.
    #[error("Field not found: {0}")]
    FieldNotFound(String),

    /// A value was assigned to a field of an incompatible primitive type.
    #[error("Type mismatch for field '{field}': expected {expected}")]
    TypeMismatch { field: String, expected: String },

    /// An integer value does not fit the field's primitive width.
    #[error("Value {value} out of range for field '{field}' ({type_name})")]
    OutOfRange {
        field: String,
        type_name: String,
        value: i128,
    },

    /// An object with this path id does not exist in the file.
    #[error("Object not found: path id {0}")]
    ObjectNotFound(i64),
}

impl Error {
    pub(crate) fn decode(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Decode {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedMetadata(reason.into())
    }

    pub(crate) fn container(error: impl std::fmt::Display) -> Self {
        Self::Container(error.to_string())
    }
}
