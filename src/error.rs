//! Error types shared across the crate.
//!
//! Failures come in two levels. Fatal conditions (malformed geometry, use of an
//! uninitialized resource, unreadable shader files, driver failures) are returned
//! as [`Error`] and stop the frame loop. Warning-level conditions (a negative
//! ambient value, a wrong-typed light handed to the scene) are logged with
//! `log::warn!` and the offending operation is dropped.

use std::path::PathBuf;

/// Convenience alias used by every fallible operation in the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while validating mesh input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    /// The position array was empty.
    #[error("vertices can't be empty")]
    EmptyVertices,
    /// The index array was empty.
    #[error("indices can't be empty")]
    EmptyIndices,
    /// The position array does not hold whole `(x, y, z)` triples.
    #[error("vertex array length {len} is not a multiple of 3")]
    MisalignedVertices { len: usize },
    /// A per-vertex attribute array does not match the vertex count.
    #[error("{attribute} array has {actual} floats, expected {expected}")]
    AttributeLength {
        attribute: &'static str,
        expected: usize,
        actual: usize,
    },
    /// An index points past the last vertex.
    #[error("index {index} references vertex past the end (vertex count {vertex_count})")]
    IndexOutOfRange { index: u32, vertex_count: usize },
    /// A procedural sphere was requested with fewer than 3 steps.
    #[error("sphere resolution must be at least 3, got {0}")]
    SphereResolution(u32),
    /// A procedural sphere was requested with a non-positive radius.
    #[error("sphere radius must be positive, got {0}")]
    SphereRadius(f32),
}

/// The crate-wide error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed mesh input.
    #[error("invalid geometry: {0}")]
    Geometry(#[from] GeometryError),

    /// A resource was used before its initialization step ran.
    #[error("{0} must be initialized before use")]
    NotInitialized(&'static str),

    /// A handle does not name anything the owner knows about.
    #[error("unknown {kind} handle {index}")]
    InvalidHandle { kind: &'static str, index: usize },

    /// The scene refused to add something; the reason is logged as a warning.
    #[error("scene rejected {0}")]
    Rejected(&'static str),

    /// A shader source file could not be read.
    #[error("failed to read shader '{}': {source}", path.display())]
    ShaderRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An image file could not be decoded.
    #[error("failed to decode image '{}': {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The GPU driver refused to create or compile something.
    #[error("GPU error: {0}")]
    Gpu(String),

    /// The window/context provider failed.
    #[error("window error: {0}")]
    Window(String),
}

impl Error {
    pub(crate) fn invalid_handle(kind: &'static str, index: usize) -> Self {
        Error::InvalidHandle { kind, index }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_error_converts_into_crate_error() {
        let err: Error = GeometryError::SphereResolution(2).into();
        assert!(matches!(err, Error::Geometry(GeometryError::SphereResolution(2))));
        assert_eq!(
            err.to_string(),
            "invalid geometry: sphere resolution must be at least 3, got 2"
        );
    }

    #[test]
    fn rejected_error_names_the_body() {
        assert_eq!(Error::Rejected("moon").to_string(), "scene rejected moon");
    }

    #[test]
    fn shader_read_error_names_the_path() {
        let err = Error::ShaderRead {
            path: PathBuf::from("shaders/missing.wgsl"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(err.to_string().contains("shaders/missing.wgsl"));
    }
}
