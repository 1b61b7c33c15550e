//! The seam between the scene graph and whatever executes draw calls.
//!
//! Scene code never touches wgpu directly. It uploads geometry, compiles
//! shaders, pushes named uniforms and issues indexed draws through the
//! [`Backend`] trait. Two implementations ship with the crate:
//!
//! - [`MeshPass`](crate::mesh_pass::MeshPass) records draws into a wgpu render pass
//! - [`HeadlessBackend`] records every call in memory, which is what the tests use
//!
//! Handles returned by a backend ([`GeometryId`], [`TextureId`], [`ShaderId`])
//! are only meaningful to the backend that issued them.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::mesh::Vertex;
use crate::shader::ShaderSource;
use crate::texture::{TextureImage, TextureOptions};
use crate::uniforms::{UniformSink, UniformValue};

/// Handle to vertex/index buffers owned by a backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GeometryId(pub(crate) usize);

/// Handle to a texture owned by a backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureId(pub(crate) usize);

/// Handle to a compiled shader program owned by a backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShaderId(pub(crate) usize);

impl GeometryId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl TextureId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl ShaderId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// GPU operations the scene graph needs.
///
/// Uniform writes go to the program selected by the last [`use_shader`](Backend::use_shader)
/// call and persist until overwritten, matching GL program state.
pub trait Backend: UniformSink {
    /// Uploads interleaved vertices and indices.
    ///
    /// Passing the handle from a previous upload replaces that geometry in place
    /// instead of allocating a new slot.
    fn upload_geometry(
        &mut self,
        slot: Option<GeometryId>,
        vertices: &[Vertex],
        indices: &[u32],
    ) -> Result<GeometryId>;

    /// Uploads a decoded image with the given sampling options.
    fn upload_texture(&mut self, image: &TextureImage, options: TextureOptions) -> Result<TextureId>;

    /// Compiles and links a vertex/fragment pair.
    fn create_shader(&mut self, source: &ShaderSource) -> Result<ShaderId>;

    /// Makes `shader` the target of subsequent uniform writes and draws.
    fn use_shader(&mut self, shader: ShaderId) -> Result<()>;

    /// Binds `texture` to a texture unit for subsequent draws.
    fn bind_texture(&mut self, unit: u32, texture: TextureId) -> Result<()>;

    /// Draws `index_count` indices of `geometry` as triangles with the active program.
    fn draw_indexed(&mut self, geometry: GeometryId, index_count: u32) -> Result<()>;
}

/// One call observed by a [`HeadlessBackend`].
#[derive(Clone, Debug, PartialEq)]
pub enum BackendCall {
    UploadGeometry {
        geometry: GeometryId,
        vertex_count: usize,
        index_count: usize,
    },
    UploadTexture {
        texture: TextureId,
        width: u32,
        height: u32,
    },
    CreateShader {
        shader: ShaderId,
        label: String,
    },
    UseShader(ShaderId),
    SetUniform {
        shader: ShaderId,
        name: String,
        value: UniformValue,
    },
    BindTexture {
        unit: u32,
        texture: TextureId,
    },
    Draw {
        shader: ShaderId,
        geometry: GeometryId,
        index_count: u32,
    },
}

/// A backend that keeps everything in memory.
///
/// Nothing is rendered. Every call is appended to a log that tests can inspect,
/// and uniform values are tracked per program so the state a draw would see can
/// be queried afterwards.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    calls: Vec<BackendCall>,
    geometry: Vec<usize>,
    textures: Vec<(u32, u32)>,
    programs: Vec<HashMap<String, UniformValue>>,
    current: Option<ShaderId>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call observed so far, in order.
    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Number of geometry uploads, including in-place replacements.
    pub fn upload_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, BackendCall::UploadGeometry { .. }))
            .count()
    }

    /// Number of distinct geometry slots allocated.
    pub fn geometry_count(&self) -> usize {
        self.geometry.len()
    }

    /// Draw calls observed so far.
    pub fn draws(&self) -> impl Iterator<Item = &BackendCall> {
        self.calls
            .iter()
            .filter(|call| matches!(call, BackendCall::Draw { .. }))
    }

    /// The value last stored under `name` in `shader`.
    pub fn uniform(&self, shader: ShaderId, name: &str) -> Option<UniformValue> {
        self.programs.get(shader.0)?.get(name).copied()
    }

    pub fn active_shader(&self) -> Option<ShaderId> {
        self.current
    }
}

impl UniformSink for HeadlessBackend {
    fn set_uniform(&mut self, name: &str, value: UniformValue) {
        let Some(shader) = self.current else {
            log::warn!("uniform '{name}' set with no active shader program");
            return;
        };
        if let Some(program) = self.programs.get_mut(shader.0) {
            program.insert(name.to_owned(), value);
        }
        self.calls.push(BackendCall::SetUniform {
            shader,
            name: name.to_owned(),
            value,
        });
    }
}

impl Backend for HeadlessBackend {
    fn upload_geometry(
        &mut self,
        slot: Option<GeometryId>,
        vertices: &[Vertex],
        indices: &[u32],
    ) -> Result<GeometryId> {
        let geometry = match slot {
            Some(id) => {
                let stored = self
                    .geometry
                    .get_mut(id.0)
                    .ok_or_else(|| Error::invalid_handle("geometry", id.0))?;
                *stored = indices.len();
                id
            }
            None => {
                self.geometry.push(indices.len());
                GeometryId(self.geometry.len() - 1)
            }
        };
        self.calls.push(BackendCall::UploadGeometry {
            geometry,
            vertex_count: vertices.len(),
            index_count: indices.len(),
        });
        Ok(geometry)
    }

    fn upload_texture(&mut self, image: &TextureImage, _options: TextureOptions) -> Result<TextureId> {
        self.textures.push((image.width(), image.height()));
        let texture = TextureId(self.textures.len() - 1);
        self.calls.push(BackendCall::UploadTexture {
            texture,
            width: image.width(),
            height: image.height(),
        });
        Ok(texture)
    }

    fn create_shader(&mut self, source: &ShaderSource) -> Result<ShaderId> {
        self.programs.push(HashMap::new());
        let shader = ShaderId(self.programs.len() - 1);
        self.calls.push(BackendCall::CreateShader {
            shader,
            label: source.label().to_owned(),
        });
        Ok(shader)
    }

    fn use_shader(&mut self, shader: ShaderId) -> Result<()> {
        if shader.0 >= self.programs.len() {
            return Err(Error::invalid_handle("shader", shader.0));
        }
        self.current = Some(shader);
        self.calls.push(BackendCall::UseShader(shader));
        Ok(())
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) -> Result<()> {
        if texture.0 >= self.textures.len() {
            return Err(Error::invalid_handle("texture", texture.0));
        }
        self.calls.push(BackendCall::BindTexture { unit, texture });
        Ok(())
    }

    fn draw_indexed(&mut self, geometry: GeometryId, index_count: u32) -> Result<()> {
        let shader = self.current.ok_or(Error::NotInitialized("shader program"))?;
        let uploaded = self
            .geometry
            .get(geometry.0)
            .ok_or_else(|| Error::invalid_handle("geometry", geometry.0))?;
        if index_count as usize > *uploaded {
            return Err(Error::Gpu(format!(
                "draw of {index_count} indices exceeds the {uploaded} uploaded"
            )));
        }
        self.calls.push(BackendCall::Draw {
            shader,
            geometry,
            index_count,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uniforms::names;

    fn triangle() -> (Vec<Vertex>, Vec<u32>) {
        let vertex = Vertex::new([0.0; 3], [1.0; 4], [0.0; 2], [0.0, 0.0, 1.0]);
        (vec![vertex; 3], vec![0, 1, 2])
    }

    #[test]
    fn reupload_into_slot_keeps_the_handle() {
        let mut backend = HeadlessBackend::new();
        let (vertices, indices) = triangle();

        let first = backend.upload_geometry(None, &vertices, &indices).unwrap();
        let second = backend.upload_geometry(Some(first), &vertices, &indices).unwrap();

        assert_eq!(first, second);
        assert_eq!(backend.geometry_count(), 1);
        assert_eq!(backend.upload_count(), 2);
    }

    #[test]
    fn uniforms_are_tracked_per_program() {
        let mut backend = HeadlessBackend::new();
        let a = backend.create_shader(&ShaderSource::from_wgsl("a", "", "")).unwrap();
        let b = backend.create_shader(&ShaderSource::from_wgsl("b", "", "")).unwrap();

        backend.use_shader(a).unwrap();
        backend.set_float(names::SHININESS, 4.0);
        backend.use_shader(b).unwrap();
        backend.set_float(names::SHININESS, 16.0);

        assert_eq!(backend.uniform(a, names::SHININESS), Some(UniformValue::Float(4.0)));
        assert_eq!(backend.uniform(b, names::SHININESS), Some(UniformValue::Float(16.0)));
    }

    #[test]
    fn draw_requires_an_active_program() {
        let mut backend = HeadlessBackend::new();
        let (vertices, indices) = triangle();
        let geometry = backend.upload_geometry(None, &vertices, &indices).unwrap();

        let err = backend.draw_indexed(geometry, 3).unwrap_err();
        assert!(matches!(err, Error::NotInitialized(_)));
    }

    #[test]
    fn unknown_handles_are_rejected() {
        let mut backend = HeadlessBackend::new();
        assert!(backend.use_shader(ShaderId(3)).is_err());
        assert!(backend.bind_texture(0, TextureId(0)).is_err());
        assert!(backend.upload_geometry(Some(GeometryId(1)), &[], &[]).is_err());
    }
}
