use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Entry point the vertex stage must export.
pub const VERTEX_ENTRY: &str = "vs_main";

/// Entry point the fragment stage must export.
pub const FRAGMENT_ENTRY: &str = "fs_main";

/// WGSL source for a vertex/fragment program.
///
/// Both stages declare the same `Uniforms` block at group 0 so that named
/// uniforms written through a backend reach either stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderSource {
    label: String,
    vertex: String,
    fragment: String,
}

impl ShaderSource {
    pub fn from_wgsl(label: &str, vertex: &str, fragment: &str) -> Self {
        Self {
            label: label.to_owned(),
            vertex: vertex.to_owned(),
            fragment: fragment.to_owned(),
        }
    }

    /// Reads both stages from disk.
    pub fn from_files(vertex: impl AsRef<Path>, fragment: impl AsRef<Path>) -> Result<Self> {
        let vertex = vertex.as_ref();
        let fragment = fragment.as_ref();
        Ok(Self {
            label: format!("{} + {}", vertex.display(), fragment.display()),
            vertex: read_stage(vertex)?,
            fragment: read_stage(fragment)?,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn vertex(&self) -> &str {
        &self.vertex
    }

    pub fn fragment(&self) -> &str {
        &self.fragment
    }
}

fn read_stage(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| Error::ShaderRead {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_stage_is_a_read_error() {
        let err = ShaderSource::from_files("no/such.vert.wgsl", "no/such.frag.wgsl").unwrap_err();
        match err {
            Error::ShaderRead { path, .. } => assert_eq!(path, Path::new("no/such.vert.wgsl")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bundled_planet_shaders_load() {
        let source = ShaderSource::from_files(
            concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/planet.vert.wgsl"),
            concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/planet.frag.wgsl"),
        )
        .unwrap();
        assert!(source.vertex().contains(VERTEX_ENTRY));
        assert!(source.fragment().contains(FRAGMENT_ENTRY));
    }
}
