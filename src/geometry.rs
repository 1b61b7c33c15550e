//! Owned mesh storage with a lazily built shared sphere.
//!
//! Every planet is drawn with the same unit sphere. Rather than a process-wide
//! singleton, the sphere lives in the [`GeometryCache`] owned by a
//! [`Scene`](crate::scene::Scene): the first call to
//! [`GeometryCache::shared_sphere`] builds it, later calls hand out the same
//! [`MeshId`], and [`GeometryCache::ensure_uploaded`] uploads each mesh at most
//! once no matter how many entities reference it.

use glam::Vec3;

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::mesh::Mesh;

/// Resolution of the shared planet sphere.
pub const SHARED_SPHERE_RESOLUTION: u32 = 32;

/// Handle to a mesh stored in a [`GeometryCache`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshId(pub(crate) usize);

impl MeshId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct GeometryCache {
    meshes: Vec<Mesh>,
    shared_sphere: Option<MeshId>,
}

impl GeometryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes ownership of a mesh and returns its handle.
    pub fn add(&mut self, mesh: Mesh) -> MeshId {
        self.meshes.push(mesh);
        MeshId(self.meshes.len() - 1)
    }

    pub fn get(&self, id: MeshId) -> Result<&Mesh> {
        self.meshes
            .get(id.0)
            .ok_or_else(|| Error::invalid_handle("mesh", id.0))
    }

    pub fn get_mut(&mut self, id: MeshId) -> Result<&mut Mesh> {
        self.meshes
            .get_mut(id.0)
            .ok_or_else(|| Error::invalid_handle("mesh", id.0))
    }

    pub fn contains(&self, id: MeshId) -> bool {
        id.0 < self.meshes.len()
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// The unit sphere shared by every planet, built on first request.
    pub fn shared_sphere(&mut self) -> MeshId {
        if let Some(id) = self.shared_sphere {
            return id;
        }
        let id = self.add(Mesh::sphere(SHARED_SPHERE_RESOLUTION, 1.0, Vec3::ZERO));
        log::debug!("built shared sphere ({SHARED_SPHERE_RESOLUTION} steps) as {id:?}");
        self.shared_sphere = Some(id);
        id
    }

    pub fn is_shared_sphere(&self, id: MeshId) -> bool {
        self.shared_sphere == Some(id)
    }

    /// Uploads `id` unless it already lives on the GPU.
    ///
    /// Returns whether an upload happened.
    pub fn ensure_uploaded(&mut self, id: MeshId, backend: &mut dyn Backend) -> Result<bool> {
        let mesh = self.get_mut(id)?;
        if mesh.is_uploaded() {
            return Ok(false);
        }
        mesh.init_gpu_geometry(backend)?;
        Ok(true)
    }

    /// Drops every mesh, the shared sphere included.
    ///
    /// Handles issued before the reset are invalid afterwards.
    pub fn reset(&mut self) {
        self.meshes.clear();
        self.shared_sphere = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HeadlessBackend;

    #[test]
    fn shared_sphere_is_built_once() {
        let mut cache = GeometryCache::new();
        let first = cache.shared_sphere();
        let second = cache.shared_sphere();

        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
        let sphere = cache.get(first).unwrap();
        let r = SHARED_SPHERE_RESOLUTION as usize;
        assert_eq!(sphere.vertex_count(), (r + 1) * (r + 1));
    }

    #[test]
    fn ensure_uploaded_uploads_at_most_once() {
        let mut cache = GeometryCache::new();
        let mut backend = HeadlessBackend::new();
        let sphere = cache.shared_sphere();

        assert!(cache.ensure_uploaded(sphere, &mut backend).unwrap());
        assert!(!cache.ensure_uploaded(sphere, &mut backend).unwrap());
        assert_eq!(backend.upload_count(), 1);
    }

    #[test]
    fn reset_forgets_the_shared_sphere() {
        let mut cache = GeometryCache::new();
        let sphere = cache.shared_sphere();
        cache.reset();

        assert!(cache.is_empty());
        assert!(!cache.is_shared_sphere(sphere));
        assert!(matches!(cache.get(sphere), Err(Error::InvalidHandle { .. })));
    }
}
