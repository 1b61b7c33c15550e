use glam::Mat4;

use crate::backend::{Backend, ShaderId, TextureId};
use crate::error::{Error, Result};
use crate::geometry::{GeometryCache, MeshId};
use crate::material::{Material, MaterialId};
use crate::planet::{Planet, PlanetFrame};
use crate::uniforms::{DIFFUSE_TEXTURE_UNIT, UniformSink, names};

/// Handle to an entity stored in a [`Scene`](crate::scene::Scene).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EntityId(pub(crate) usize);

impl EntityId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// What drives an entity's model matrix.
#[derive(Clone, Debug, PartialEq)]
pub enum EntityKind {
    /// A fixed model matrix.
    Simple { model: Mat4 },
    /// A planet recomputed every update.
    Planet(Planet),
}

/// A drawable object: mesh, material, shader program and optional texture.
#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
    mesh: MeshId,
    material: MaterialId,
    shader: ShaderId,
    texture: Option<TextureId>,
    kind: EntityKind,
}

impl Entity {
    pub fn new(mesh: MeshId, material: MaterialId, shader: ShaderId, model: Mat4) -> Self {
        Self {
            mesh,
            material,
            shader,
            texture: None,
            kind: EntityKind::Simple { model },
        }
    }

    pub fn planet(mesh: MeshId, material: MaterialId, shader: ShaderId, planet: Planet) -> Self {
        Self {
            mesh,
            material,
            shader,
            texture: None,
            kind: EntityKind::Planet(planet),
        }
    }

    pub fn with_texture(mut self, texture: TextureId) -> Self {
        self.texture = Some(texture);
        self
    }

    pub fn mesh(&self) -> MeshId {
        self.mesh
    }

    pub fn material(&self) -> MaterialId {
        self.material
    }

    pub fn shader(&self) -> ShaderId {
        self.shader
    }

    pub fn texture(&self) -> Option<TextureId> {
        self.texture
    }

    pub fn kind(&self) -> &EntityKind {
        &self.kind
    }

    pub fn as_planet(&self) -> Option<&Planet> {
        match &self.kind {
            EntityKind::Planet(planet) => Some(planet),
            EntityKind::Simple { .. } => None,
        }
    }

    pub fn as_planet_mut(&mut self) -> Option<&mut Planet> {
        match &mut self.kind {
            EntityKind::Planet(planet) => Some(planet),
            EntityKind::Simple { .. } => None,
        }
    }

    pub fn model(&self) -> Result<Mat4> {
        match &self.kind {
            EntityKind::Simple { model } => Ok(*model),
            EntityKind::Planet(planet) => planet.model(),
        }
    }

    /// Replaces the model matrix of a simple entity. Planets ignore this with a warning.
    pub fn set_model(&mut self, model: Mat4) {
        match &mut self.kind {
            EntityKind::Simple { model: current } => *current = model,
            EntityKind::Planet(_) => log::warn!("planet model matrices are driven by update"),
        }
    }

    /// Uploads the mesh (once) and points `diffuseTexture` at its texture unit.
    pub fn initialize(&self, geometry: &mut GeometryCache, backend: &mut dyn Backend) -> Result<()> {
        geometry.ensure_uploaded(self.mesh, backend)?;
        if self.texture.is_some() {
            backend.use_shader(self.shader)?;
            backend.set_int(names::DIFFUSE_TEXTURE, DIFFUSE_TEXTURE_UNIT as i32);
        }
        Ok(())
    }

    /// Advances a planet to `time`. Simple entities don't move.
    pub fn update(&mut self, time: f32, center: Option<&PlanetFrame>) -> Result<()> {
        match &mut self.kind {
            EntityKind::Simple { .. } => Ok(()),
            EntityKind::Planet(planet) => planet.update(time, center),
        }
    }

    /// Pushes per-entity uniforms and draws the mesh.
    ///
    /// Camera and light uniforms are expected to be set already; see
    /// [`Scene::render_frame`](crate::scene::Scene::render_frame).
    pub fn render(
        &self,
        geometry: &GeometryCache,
        materials: &[Material],
        backend: &mut dyn Backend,
    ) -> Result<()> {
        let material = materials
            .get(self.material.0)
            .ok_or_else(|| Error::invalid_handle("material", self.material.0))?;

        backend.use_shader(self.shader)?;
        backend.set_mat4(names::MODEL, self.model()?);
        backend.set_bool(names::HAS_TEXTURE, self.texture.is_some());
        material.apply_to_shader(backend);
        if let Some(texture) = self.texture {
            backend.bind_texture(DIFFUSE_TEXTURE_UNIT, texture)?;
        }
        geometry.get(self.mesh)?.render(backend)
    }
}

/// Lookup of entity model matrices by handle.
pub trait ModelSource {
    fn model_of(&self, id: EntityId) -> Result<Mat4>;
}

impl ModelSource for [Entity] {
    fn model_of(&self, id: EntityId) -> Result<Mat4> {
        self.get(id.0)
            .ok_or_else(|| Error::invalid_handle("entity", id.0))?
            .model()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendCall, HeadlessBackend};
    use crate::shader::ShaderSource;
    use crate::texture::{TextureImage, TextureOptions};
    use crate::uniforms::UniformValue;

    fn setup() -> (GeometryCache, Vec<Material>, HeadlessBackend, ShaderId) {
        let mut backend = HeadlessBackend::new();
        let shader = backend.create_shader(&ShaderSource::from_wgsl("planet", "", "")).unwrap();
        (GeometryCache::new(), vec![Material::default()], backend, shader)
    }

    #[test]
    fn render_before_initialize_fails() {
        let (mut geometry, materials, mut backend, shader) = setup();
        let sphere = geometry.shared_sphere();
        let entity = Entity::new(sphere, MaterialId(0), shader, Mat4::IDENTITY);

        let err = entity.render(&geometry, &materials, &mut backend).unwrap_err();
        assert!(matches!(err, Error::NotInitialized(_)));
    }

    #[test]
    fn render_pushes_model_material_and_draws() {
        let (mut geometry, materials, mut backend, shader) = setup();
        let sphere = geometry.shared_sphere();
        let model = Mat4::from_translation(glam::Vec3::X);
        let entity = Entity::new(sphere, MaterialId(0), shader, model);

        entity.initialize(&mut geometry, &mut backend).unwrap();
        entity.render(&geometry, &materials, &mut backend).unwrap();

        assert_eq!(backend.uniform(shader, names::MODEL), Some(UniformValue::Mat4(model)));
        assert_eq!(backend.uniform(shader, names::HAS_TEXTURE), Some(UniformValue::Bool(false)));
        assert_eq!(backend.uniform(shader, names::SHININESS), Some(UniformValue::Float(10.0)));
        assert_eq!(backend.draws().count(), 1);
    }

    #[test]
    fn textured_entity_binds_unit_zero() {
        let (mut geometry, materials, mut backend, shader) = setup();
        let image = TextureImage::from_rgb("white", 1, 1, vec![255; 3]).unwrap();
        let texture = backend.upload_texture(&image, TextureOptions::default()).unwrap();
        let sphere = geometry.shared_sphere();
        let entity = Entity::new(sphere, MaterialId(0), shader, Mat4::IDENTITY).with_texture(texture);

        entity.initialize(&mut geometry, &mut backend).unwrap();
        assert_eq!(backend.uniform(shader, names::DIFFUSE_TEXTURE), Some(UniformValue::Int(0)));

        entity.render(&geometry, &materials, &mut backend).unwrap();
        assert!(backend.calls().contains(&BackendCall::BindTexture { unit: 0, texture }));
        assert_eq!(backend.uniform(shader, names::HAS_TEXTURE), Some(UniformValue::Bool(true)));
    }

    #[test]
    fn entities_sharing_a_mesh_upload_it_once() {
        let (mut geometry, _, mut backend, shader) = setup();
        let sphere = geometry.shared_sphere();
        let a = Entity::new(sphere, MaterialId(0), shader, Mat4::IDENTITY);
        let b = Entity::new(sphere, MaterialId(0), shader, Mat4::IDENTITY);

        a.initialize(&mut geometry, &mut backend).unwrap();
        b.initialize(&mut geometry, &mut backend).unwrap();
        assert_eq!(backend.upload_count(), 1);
    }

    #[test]
    fn model_lookup_by_handle() {
        let (mut geometry, _, _, shader) = setup();
        let sphere = geometry.shared_sphere();
        let entities = vec![Entity::new(sphere, MaterialId(0), shader, Mat4::from_scale(glam::Vec3::splat(2.0)))];

        assert_eq!(entities.model_of(EntityId(0)).unwrap(), Mat4::from_scale(glam::Vec3::splat(2.0)));
        assert!(matches!(entities.model_of(EntityId(4)), Err(Error::InvalidHandle { .. })));
    }
}
