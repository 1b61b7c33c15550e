//! Triangle meshes and their GPU vertex format.
//!
//! A [`Mesh`] keeps its attributes in separate flat arrays (positions, colors,
//! texture coordinates and normals) plus a triangle index list. When it is
//! uploaded, the attributes are interleaved into [`Vertex`] records.
//!
//! # Vertex Layout
//!
//! Each [`Vertex`] is 12 floats (48 bytes):
//!
//! | Attribute | Format    | Offset | Shader Location |
//! |-----------|-----------|--------|-----------------|
//! | position  | Float32x3 | 0      | 0               |
//! | color     | Float32x4 | 12     | 1               |
//! | uv        | Float32x2 | 28     | 2               |
//! | normal    | Float32x3 | 36     | 3               |
//!
//! # Spheres
//!
//! [`Mesh::unit_sphere`] builds the latitude/longitude sphere every planet is
//! drawn with:
//!
//! ```
//! use orrery::{Mesh, Vec3};
//!
//! let sphere = Mesh::unit_sphere(16, 1.0, Vec3::ZERO).unwrap();
//! assert_eq!(sphere.vertex_count(), 17 * 17);
//! assert_eq!(sphere.index_count(), 6 * 16 * 16);
//! ```

use std::f32::consts::PI;

use glam::{Vec3, Vec4};

use crate::backend::{Backend, GeometryId};
use crate::error::{Error, GeometryError, Result};

/// Floats per interleaved vertex.
pub const FLOATS_PER_VERTEX: usize = 12;

/// Default vertex color when none is supplied.
pub const DEFAULT_COLOR: [f32; 4] = [1.0; 4];

/// The interleaved vertex record uploaded to the GPU.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
    pub uv: [f32; 2],
    pub normal: [f32; 3],
}

impl Vertex {
    /// Vertex buffer layout matching the `VertexInput` struct of the planet shaders.
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            // position
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            // color
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x4,
            },
            // uv
            wgpu::VertexAttribute {
                offset: 28,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x2,
            },
            // normal
            wgpu::VertexAttribute {
                offset: 36,
                shader_location: 3,
                format: wgpu::VertexFormat::Float32x3,
            },
        ],
    };

    pub const fn new(position: [f32; 3], color: [f32; 4], uv: [f32; 2], normal: [f32; 3]) -> Self {
        Self {
            position,
            color,
            uv,
            normal,
        }
    }
}

/// Triangle geometry with per-vertex attributes.
///
/// A mesh starts out CPU-only. [`Mesh::init_gpu_geometry`] uploads it through a
/// [`Backend`]; later calls re-upload into the same GPU slot. Cloning a mesh
/// copies the attributes but not the upload, so the clone has to be uploaded
/// on its own.
#[derive(Debug)]
pub struct Mesh {
    positions: Vec<f32>,
    colors: Vec<f32>,
    uvs: Vec<f32>,
    normals: Vec<f32>,
    indices: Vec<u32>,
    geometry: Option<GeometryId>,
}

impl Clone for Mesh {
    fn clone(&self) -> Self {
        Self {
            positions: self.positions.clone(),
            colors: self.colors.clone(),
            uvs: self.uvs.clone(),
            normals: self.normals.clone(),
            indices: self.indices.clone(),
            geometry: None,
        }
    }
}

impl Mesh {
    /// Builds a mesh from flat attribute arrays.
    ///
    /// `vertices` holds `(x, y, z)` triples. Any of `colors` (4 floats per
    /// vertex), `uvs` (2) or `normals` (3) may be empty, in which case they are
    /// filled with white, `(0, 0)` and `(0, 0, 0)` respectively.
    ///
    /// # Errors
    ///
    /// Returns a [`GeometryError`] if `vertices` or `indices` is empty, if
    /// `vertices` is not a whole number of triples, if a non-empty attribute
    /// array has the wrong length, or if an index points past the last vertex.
    pub fn new(
        vertices: Vec<f32>,
        indices: Vec<u32>,
        colors: Vec<f32>,
        uvs: Vec<f32>,
        normals: Vec<f32>,
    ) -> std::result::Result<Self, GeometryError> {
        if vertices.is_empty() {
            return Err(GeometryError::EmptyVertices);
        }
        if indices.is_empty() {
            return Err(GeometryError::EmptyIndices);
        }
        if vertices.len() % 3 != 0 {
            return Err(GeometryError::MisalignedVertices {
                len: vertices.len(),
            });
        }

        let vertex_count = vertices.len() / 3;
        let colors = attribute_or_default(colors, "color", vertex_count, &DEFAULT_COLOR)?;
        let uvs = attribute_or_default(uvs, "uv", vertex_count, &[0.0; 2])?;
        let normals = attribute_or_default(normals, "normal", vertex_count, &[0.0; 3])?;

        if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(GeometryError::IndexOutOfRange {
                index,
                vertex_count,
            });
        }

        Ok(Self {
            positions: vertices,
            colors,
            uvs,
            normals,
            indices,
            geometry: None,
        })
    }

    /// Builds a mesh from positions and indices only.
    pub fn from_positions(
        vertices: Vec<f32>,
        indices: Vec<u32>,
    ) -> std::result::Result<Self, GeometryError> {
        Self::new(vertices, indices, Vec::new(), Vec::new(), Vec::new())
    }

    /// Generates a latitude/longitude sphere.
    ///
    /// `resolution` is the number of steps in both directions, giving
    /// `(resolution + 1)²` vertices and `6 · resolution²` indices. Normals point
    /// away from `center` and have unit length. Texture coordinates run from
    /// `(0, 0)` at the north pole seam to `(1, 1)` at the south pole.
    ///
    /// # Errors
    ///
    /// [`GeometryError::SphereResolution`] if `resolution < 3`,
    /// [`GeometryError::SphereRadius`] if `radius` is not a positive number.
    pub fn unit_sphere(
        resolution: u32,
        radius: f32,
        center: Vec3,
    ) -> std::result::Result<Self, GeometryError> {
        if resolution < 3 {
            return Err(GeometryError::SphereResolution(resolution));
        }
        if !(radius > 0.0 && radius.is_finite()) {
            return Err(GeometryError::SphereRadius(radius));
        }
        Ok(Self::sphere(resolution, radius, center))
    }

    /// Sphere generator behind [`Mesh::unit_sphere`], for already validated input.
    pub(crate) fn sphere(resolution: u32, radius: f32, center: Vec3) -> Self {
        let steps = resolution as usize;
        let vertex_count = (steps + 1) * (steps + 1);

        let mut positions = Vec::with_capacity(vertex_count * 3);
        let mut uvs = Vec::with_capacity(vertex_count * 2);
        let mut normals = Vec::with_capacity(vertex_count * 3);

        for i in 0..=resolution {
            let phi = i as f32 * PI / resolution as f32;
            for j in 0..=resolution {
                let theta = j as f32 * 2.0 * PI / resolution as f32;
                let direction =
                    Vec3::new(theta.sin() * phi.sin(), phi.cos(), theta.cos() * phi.sin());
                let position = center + direction * radius;

                positions.extend_from_slice(&position.to_array());
                normals.extend_from_slice(&direction.normalize().to_array());
                uvs.push(j as f32 / resolution as f32);
                uvs.push(i as f32 / resolution as f32);
            }
        }

        let mut indices = Vec::with_capacity(6 * steps * steps);
        for i in 0..resolution {
            for j in 0..resolution {
                let first = i * (resolution + 1) + j;
                let second = first + resolution + 1;

                indices.extend_from_slice(&[first, second, first + 1]);
                indices.extend_from_slice(&[second, second + 1, first + 1]);
            }
        }

        Self {
            positions,
            colors: DEFAULT_COLOR.repeat(vertex_count),
            uvs,
            normals,
            indices,
            geometry: None,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    pub fn colors(&self) -> &[f32] {
        &self.colors
    }

    pub fn uvs(&self) -> &[f32] {
        &self.uvs
    }

    pub fn normals(&self) -> &[f32] {
        &self.normals
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Paints every vertex with one RGBA color.
    ///
    /// Takes effect on the GPU at the next [`Mesh::init_gpu_geometry`].
    pub fn set_uniform_color(&mut self, color: Vec4) {
        for rgba in self.colors.chunks_exact_mut(4) {
            rgba.copy_from_slice(&color.to_array());
        }
    }

    /// Interleaves the attribute arrays into upload order.
    pub fn interleaved(&self) -> Vec<Vertex> {
        self.positions
            .chunks_exact(3)
            .zip(self.colors.chunks_exact(4))
            .zip(self.uvs.chunks_exact(2))
            .zip(self.normals.chunks_exact(3))
            .map(|(((p, c), uv), n)| {
                Vertex::new(
                    [p[0], p[1], p[2]],
                    [c[0], c[1], c[2], c[3]],
                    [uv[0], uv[1]],
                    [n[0], n[1], n[2]],
                )
            })
            .collect()
    }

    /// Uploads the mesh, reusing its GPU slot if it already has one.
    pub fn init_gpu_geometry(&mut self, backend: &mut dyn Backend) -> Result<()> {
        let geometry = backend.upload_geometry(self.geometry, &self.interleaved(), &self.indices)?;
        log::debug!(
            "uploaded mesh ({} vertices, {} indices) to {:?}",
            self.vertex_count(),
            self.index_count(),
            geometry
        );
        self.geometry = Some(geometry);
        Ok(())
    }

    pub fn is_uploaded(&self) -> bool {
        self.geometry.is_some()
    }

    pub fn geometry(&self) -> Option<GeometryId> {
        self.geometry
    }

    /// Issues one indexed draw of every index with the active program.
    ///
    /// # Errors
    ///
    /// [`Error::NotInitialized`] if the mesh was never uploaded.
    pub fn render(&self, backend: &mut dyn Backend) -> Result<()> {
        let geometry = self.geometry.ok_or(Error::NotInitialized("mesh GPU geometry"))?;
        backend.draw_indexed(geometry, self.indices.len() as u32)
    }

    /// Human-readable dump of the attribute arrays.
    pub fn describe(&self) -> String {
        let mut out = format!(
            "Mesh: {} vertices, {} indices, uploaded: {}\n",
            self.vertex_count(),
            self.index_count(),
            self.is_uploaded()
        );
        for (name, values, width) in [
            ("positions", &self.positions[..], 3),
            ("colors", &self.colors[..], 4),
            ("uvs", &self.uvs[..], 2),
            ("normals", &self.normals[..], 3),
        ] {
            out.push_str(name);
            out.push(':');
            for chunk in values.chunks(width) {
                out.push_str(&format!(" {chunk:?}"));
            }
            out.push('\n');
        }
        out.push_str(&format!("indices: {:?}\n", self.indices));
        out
    }
}

fn attribute_or_default(
    values: Vec<f32>,
    attribute: &'static str,
    vertex_count: usize,
    default: &[f32],
) -> std::result::Result<Vec<f32>, GeometryError> {
    let expected = vertex_count * default.len();
    if values.is_empty() {
        return Ok(default.repeat(vertex_count));
    }
    if values.len() != expected {
        return Err(GeometryError::AttributeLength {
            attribute,
            expected,
            actual: values.len(),
        });
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HeadlessBackend;
    use approx::assert_relative_eq;

    fn triangle() -> Mesh {
        Mesh::from_positions(vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0], vec![0, 1, 2]).unwrap()
    }

    #[test]
    fn missing_attributes_get_defaults() {
        let mesh = triangle();
        assert_eq!(mesh.colors(), &[1.0; 12]);
        assert_eq!(mesh.uvs(), &[0.0; 6]);
        assert_eq!(mesh.normals(), &[0.0; 9]);
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(
            Mesh::from_positions(vec![], vec![0]).unwrap_err(),
            GeometryError::EmptyVertices
        );
        assert_eq!(
            Mesh::from_positions(vec![0.0; 3], vec![]).unwrap_err(),
            GeometryError::EmptyIndices
        );
        assert_eq!(
            Mesh::from_positions(vec![0.0; 4], vec![0]).unwrap_err(),
            GeometryError::MisalignedVertices { len: 4 }
        );
        assert_eq!(
            Mesh::from_positions(vec![0.0; 6], vec![0, 1, 2]).unwrap_err(),
            GeometryError::IndexOutOfRange {
                index: 2,
                vertex_count: 2
            }
        );
        assert_eq!(
            Mesh::new(vec![0.0; 6], vec![0, 1], vec![1.0; 4], vec![], vec![]).unwrap_err(),
            GeometryError::AttributeLength {
                attribute: "color",
                expected: 8,
                actual: 4
            }
        );
    }

    #[test]
    fn sphere_counts_follow_resolution() {
        for resolution in [3, 8, 32] {
            let sphere = Mesh::unit_sphere(resolution, 1.0, Vec3::ZERO).unwrap();
            let r = resolution as usize;
            assert_eq!(sphere.vertex_count(), (r + 1) * (r + 1));
            assert_eq!(sphere.index_count(), 6 * r * r);
            assert!(sphere.indices().iter().all(|&i| (i as usize) < sphere.vertex_count()));
        }
    }

    #[test]
    fn sphere_rejects_bad_parameters() {
        assert_eq!(
            Mesh::unit_sphere(2, 1.0, Vec3::ZERO).unwrap_err(),
            GeometryError::SphereResolution(2)
        );
        assert_eq!(
            Mesh::unit_sphere(8, 0.0, Vec3::ZERO).unwrap_err(),
            GeometryError::SphereRadius(0.0)
        );
    }

    #[test]
    fn sphere_vertices_sit_on_the_surface_with_outward_normals() {
        let center = Vec3::new(1.0, -2.0, 0.5);
        let sphere = Mesh::unit_sphere(12, 2.0, center).unwrap();

        for (p, n) in sphere.positions().chunks(3).zip(sphere.normals().chunks(3)) {
            let offset = Vec3::from_slice(p) - center;
            let normal = Vec3::from_slice(n);
            assert_relative_eq!(offset.length(), 2.0, epsilon = 1e-5);
            assert_relative_eq!(normal.length(), 1.0, epsilon = 1e-5);
            assert!(normal.abs_diff_eq(offset / 2.0, 1e-5));
        }
    }

    #[test]
    fn sphere_starts_at_the_north_pole() {
        let sphere = Mesh::unit_sphere(4, 1.0, Vec3::ZERO).unwrap();
        let first = Vec3::from_slice(&sphere.positions()[..3]);
        assert!(first.abs_diff_eq(Vec3::Y, 1e-6));
        assert_eq!(&sphere.uvs()[..2], &[0.0, 0.0]);
    }

    #[test]
    fn uniform_color_repaints_every_vertex() {
        let mut mesh = triangle();
        mesh.set_uniform_color(Vec4::new(0.2, 0.4, 0.6, 1.0));
        for rgba in mesh.colors().chunks(4) {
            assert_eq!(rgba, &[0.2, 0.4, 0.6, 1.0]);
        }
        assert_eq!(mesh.interleaved()[1].color, [0.2, 0.4, 0.6, 1.0]);
    }

    #[test]
    fn interleaved_has_twelve_floats_per_vertex() {
        let mesh = triangle();
        let vertices = mesh.interleaved();
        let floats: &[f32] = bytemuck::cast_slice(&vertices);
        assert_eq!(floats.len(), mesh.vertex_count() * FLOATS_PER_VERTEX);
        assert_eq!(&floats[FLOATS_PER_VERTEX..FLOATS_PER_VERTEX + 3], &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn render_before_upload_fails() {
        let mesh = triangle();
        let mut backend = HeadlessBackend::new();
        assert!(matches!(mesh.render(&mut backend), Err(Error::NotInitialized(_))));
    }

    #[test]
    fn reupload_keeps_the_slot_and_clone_does_not_share_it() {
        let mut mesh = triangle();
        let mut backend = HeadlessBackend::new();

        mesh.init_gpu_geometry(&mut backend).unwrap();
        let slot = mesh.geometry();
        mesh.init_gpu_geometry(&mut backend).unwrap();

        assert_eq!(mesh.geometry(), slot);
        assert_eq!(backend.geometry_count(), 1);
        assert!(!mesh.clone().is_uploaded());
    }
}
