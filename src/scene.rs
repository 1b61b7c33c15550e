//! The scene graph: entities, lights, materials, meshes and a camera.
//!
//! A [`Scene`] owns everything it draws and hands out index handles
//! ([`EntityId`], [`MaterialId`], [`MeshId`]). Planets refer to the body they
//! orbit and lights to the entity they follow by handle, so the scene is the
//! only place those links are resolved.
//!
//! # Update Order
//!
//! [`Scene::update`] visits entities in insertion order. A planet can only be
//! set to orbit an entity that is already in the scene, so a center is always
//! updated before the bodies that orbit it within one tick.
//!
//! # Rendering
//!
//! [`Scene::render_frame`] computes the view and projection matrices once,
//! then for each entity selects its program, pushes camera and light uniforms,
//! and lets the entity push its own uniforms and draw.

use glam::Vec3;

use crate::backend::{Backend, ShaderId};
use crate::camera::Camera;
use crate::entity::{Entity, EntityId, EntityKind};
use crate::error::{Error, Result};
use crate::geometry::{GeometryCache, MeshId};
use crate::light::{Light, LightAnchor, LightKind};
use crate::material::{Material, MaterialId};
use crate::mesh::Mesh;
use crate::planet::{OrbitCenter, Planet, PlanetFrame};
use crate::uniforms::{MAX_DIRECTIONAL_LIGHTS, MAX_POINT_LIGHTS, UniformSink, names};

#[derive(Debug, Default)]
pub struct Scene {
    camera: Camera,
    geometry: GeometryCache,
    materials: Vec<Material>,
    entities: Vec<Entity>,
    point_lights: Vec<Light>,
    directional_lights: Vec<Light>,
}

impl Scene {
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            ..Self::default()
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
    }

    pub fn geometry(&self) -> &GeometryCache {
        &self.geometry
    }

    pub fn geometry_mut(&mut self) -> &mut GeometryCache {
        &mut self.geometry
    }

    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshId {
        self.geometry.add(mesh)
    }

    /// The unit sphere shared by every planet.
    pub fn shared_sphere(&mut self) -> MeshId {
        self.geometry.shared_sphere()
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.push(material);
        MaterialId(self.materials.len() - 1)
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0)
    }

    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(id.0)
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id.0)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id.0)
    }

    pub fn point_lights(&self) -> &[Light] {
        &self.point_lights
    }

    pub fn directional_lights(&self) -> &[Light] {
        &self.directional_lights
    }

    /// Adds an entity and returns its handle.
    ///
    /// Entities naming an unknown mesh or material, or planets orbiting
    /// anything but a planet already in the scene, are dropped with a warning.
    pub fn add_entity(&mut self, entity: Entity) -> Option<EntityId> {
        if !self.geometry.contains(entity.mesh()) {
            log::warn!("dropping entity with unknown mesh {:?}", entity.mesh());
            return None;
        }
        if self.material(entity.material()).is_none() {
            log::warn!("dropping entity with unknown material {:?}", entity.material());
            return None;
        }
        if let Some(center) = entity.as_planet().and_then(Planet::orbit_center) {
            if self.entity(center).and_then(Entity::as_planet).is_none() {
                log::warn!("dropping planet orbiting {center:?}, which is not a planet in this scene");
                return None;
            }
        }

        self.entities.push(entity);
        Some(EntityId(self.entities.len() - 1))
    }

    /// Adds a planet drawn with `mesh`.
    pub fn add_planet(
        &mut self,
        mesh: MeshId,
        material: MaterialId,
        shader: ShaderId,
        planet: Planet,
    ) -> Option<EntityId> {
        self.add_entity(Entity::planet(mesh, material, shader, planet))
    }

    /// Adds a planet with a point light of `light_color` at its center.
    pub fn add_sun(
        &mut self,
        mesh: MeshId,
        material: MaterialId,
        shader: ShaderId,
        planet: Planet,
        light_color: Vec3,
    ) -> Option<EntityId> {
        let sun = self.add_planet(mesh, material, shader, planet)?;
        self.add_point_light(Light::attached(LightKind::Point, sun, Vec3::ZERO, light_color));
        Some(sun)
    }

    /// Files a light under its kind.
    pub fn add_light(&mut self, light: Light) -> bool {
        match light.kind() {
            LightKind::Point => self.add_point_light(light),
            LightKind::Directional => self.add_directional_light(light),
        }
    }

    pub fn add_point_light(&mut self, light: Light) -> bool {
        if light.kind() != LightKind::Point {
            log::warn!("ignoring non-point light passed as a point light");
            return false;
        }
        if !self.accepts_anchor(&light) {
            return false;
        }
        if self.point_lights.len() >= MAX_POINT_LIGHTS {
            log::warn!("more than {MAX_POINT_LIGHTS} point lights, extras won't reach the shader");
        }
        self.point_lights.push(light);
        true
    }

    pub fn add_directional_light(&mut self, light: Light) -> bool {
        if light.kind() != LightKind::Directional {
            log::warn!("ignoring non-directional light passed as a directional light");
            return false;
        }
        if !self.accepts_anchor(&light) {
            return false;
        }
        if self.directional_lights.len() >= MAX_DIRECTIONAL_LIGHTS {
            log::warn!(
                "more than {MAX_DIRECTIONAL_LIGHTS} directional lights, extras won't reach the shader"
            );
        }
        self.directional_lights.push(light);
        true
    }

    fn accepts_anchor(&self, light: &Light) -> bool {
        match light.anchor() {
            LightAnchor::Entity(id) if self.entity(id).is_none() => {
                log::warn!("ignoring light attached to unknown entity {id:?}");
                false
            }
            _ => true,
        }
    }

    /// The current frame of a planet, for use as an orbit center.
    pub fn orbit_center(&self, id: EntityId) -> Result<OrbitCenter> {
        Ok(OrbitCenter {
            entity: id,
            frame: self.planet_frame(id)?,
        })
    }

    fn planet_frame(&self, id: EntityId) -> Result<PlanetFrame> {
        let entity = self
            .entity(id)
            .ok_or_else(|| Error::invalid_handle("entity", id.0))?;
        entity
            .as_planet()
            .ok_or_else(|| Error::invalid_handle("planet", id.0))?
            .frame()
    }

    /// Uploads every entity's mesh and sets up texture units.
    pub fn initialize_all(&mut self, backend: &mut dyn Backend) -> Result<()> {
        for entity in &self.entities {
            entity.initialize(&mut self.geometry, backend)?;
        }
        log::info!(
            "initialized {} entities over {} meshes",
            self.entities.len(),
            self.geometry.len()
        );
        Ok(())
    }

    /// Advances every entity to `time`, in insertion order.
    pub fn update(&mut self, time: f32) -> Result<()> {
        for index in 0..self.entities.len() {
            self.update_index(index, time)?;
        }
        Ok(())
    }

    /// Advances one entity, reading its orbit center's current frame.
    pub fn update_entity(&mut self, id: EntityId, time: f32) -> Result<()> {
        if id.0 >= self.entities.len() {
            return Err(Error::invalid_handle("entity", id.0));
        }
        self.update_index(id.0, time)
    }

    fn update_index(&mut self, index: usize, time: f32) -> Result<()> {
        let center = match self.entities[index].kind() {
            EntityKind::Planet(planet) => match planet.orbit_center() {
                Some(center) => Some(self.planet_frame(center)?),
                None => None,
            },
            EntityKind::Simple { .. } => None,
        };
        self.entities[index].update(time, center.as_ref())
    }

    /// Draws every entity with the scene's camera and lights.
    pub fn render_frame(&self, backend: &mut dyn Backend) -> Result<()> {
        let view = self.camera.view_matrix();
        let projection = self.camera.projection_matrix();
        let eye = self.camera.position();
        let point_count = self.point_lights.len().min(MAX_POINT_LIGHTS);
        let directional_count = self.directional_lights.len().min(MAX_DIRECTIONAL_LIGHTS);

        for entity in &self.entities {
            backend.use_shader(entity.shader())?;
            backend.set_mat4(names::VIEW, view);
            backend.set_mat4(names::PROJECTION, projection);
            backend.set_vec3(names::CAMERA_POSITION, eye);

            backend.set_int(names::POINT_LIGHT_COUNT, point_count as i32);
            for (i, light) in self.point_lights.iter().take(point_count).enumerate() {
                let prefix = format!("{}[{i}]", names::POINT_LIGHTS);
                light.send_to_shader(backend, &prefix, self.entities.as_slice())?;
            }
            backend.set_int(names::DIRECTIONAL_LIGHT_COUNT, directional_count as i32);
            for (i, light) in self.directional_lights.iter().take(directional_count).enumerate() {
                let prefix = format!("{}[{i}]", names::DIRECTIONAL_LIGHTS);
                light.send_to_shader(backend, &prefix, self.entities.as_slice())?;
            }

            entity.render(&self.geometry, &self.materials, backend)?;
        }
        Ok(())
    }

    pub fn describe(&self) -> String {
        format!(
            "Scene: {} entities, {} meshes, {} materials, {} point / {} directional lights\n{}",
            self.entities.len(),
            self.geometry.len(),
            self.materials.len(),
            self.point_lights.len(),
            self.directional_lights.len(),
            self.camera.describe()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendCall, HeadlessBackend};
    use crate::planet::{Orbit, Spin};
    use crate::shader::ShaderSource;
    use crate::uniforms::UniformValue;
    use glam::Mat4;

    fn scene_with_shader() -> (Scene, HeadlessBackend, ShaderId, MaterialId) {
        let mut backend = HeadlessBackend::new();
        let shader = backend.create_shader(&ShaderSource::from_wgsl("planet", "", "")).unwrap();
        let mut scene = Scene::new(Camera::new());
        let material = scene.add_material(Material::default());
        (scene, backend, shader, material)
    }

    #[test]
    fn rejects_entities_with_unknown_handles() {
        let (mut scene, _, shader, material) = scene_with_shader();
        let sphere = scene.shared_sphere();

        assert!(scene.add_entity(Entity::new(MeshId(9), material, shader, Mat4::IDENTITY)).is_none());
        assert!(scene.add_entity(Entity::new(sphere, MaterialId(9), shader, Mat4::IDENTITY)).is_none());

        let center = OrbitCenter {
            entity: EntityId(5),
            frame: Planet::root(1.0, Spin::none(), Vec3::ZERO).frame().unwrap(),
        };
        let stray = Planet::orbiting(1.0, Spin::none(), Orbit::new(1.0, Vec3::Y, 2.0), &center);
        assert!(scene.add_planet(sphere, material, shader, stray).is_none());
        assert!(scene.entities().is_empty());
    }

    #[test]
    fn lights_are_filed_by_kind() {
        let (mut scene, _, _, _) = scene_with_shader();
        let point = Light::point(Vec3::ZERO, Vec3::ONE);
        let directional = Light::directional(Vec3::Y, Vec3::ONE);

        assert!(!scene.add_point_light(directional));
        assert!(!scene.add_directional_light(point));
        assert!(scene.add_light(point));
        assert!(scene.add_light(directional));
        assert_eq!(scene.point_lights().len(), 1);
        assert_eq!(scene.directional_lights().len(), 1);

        let dangling = Light::attached(LightKind::Point, EntityId(3), Vec3::ZERO, Vec3::ONE);
        assert!(!scene.add_point_light(dangling));
    }

    #[test]
    fn sun_brings_its_own_light() {
        let (mut scene, _, shader, material) = scene_with_shader();
        let sphere = scene.shared_sphere();
        let sun = scene
            .add_sun(sphere, material, shader, Planet::root(2.0, Spin::none(), Vec3::ZERO), Vec3::ONE)
            .unwrap();

        assert_eq!(scene.point_lights().len(), 1);
        assert_eq!(scene.point_lights()[0].anchor(), LightAnchor::Entity(sun));
    }

    #[test]
    fn orbit_center_requires_an_initialized_planet() {
        let (mut scene, _, shader, material) = scene_with_shader();
        let sphere = scene.shared_sphere();
        let rock = scene.add_entity(Entity::new(sphere, material, shader, Mat4::IDENTITY)).unwrap();
        let blank = scene.add_planet(sphere, material, shader, Planet::new()).unwrap();

        assert!(matches!(scene.orbit_center(rock), Err(Error::InvalidHandle { kind: "planet", .. })));
        assert!(matches!(scene.orbit_center(blank), Err(Error::NotInitialized(_))));
        assert!(matches!(scene.orbit_center(EntityId(7)), Err(Error::InvalidHandle { .. })));
    }

    #[test]
    fn render_frame_sends_camera_and_lights_before_each_draw() {
        let (mut scene, mut backend, shader, material) = scene_with_shader();
        let sphere = scene.shared_sphere();
        scene.add_sun(sphere, material, shader, Planet::root(1.0, Spin::none(), Vec3::ZERO), Vec3::ONE);
        scene.add_light(Light::directional(Vec3::Y, Vec3::splat(0.2)));
        scene.initialize_all(&mut backend).unwrap();
        scene.update(0.0).unwrap();

        scene.render_frame(&mut backend).unwrap();

        let camera = scene.camera();
        assert_eq!(backend.uniform(shader, names::VIEW), Some(UniformValue::Mat4(camera.view_matrix())));
        assert_eq!(backend.uniform(shader, names::CAMERA_POSITION), Some(UniformValue::Vec3(camera.position())));
        assert_eq!(backend.uniform(shader, names::POINT_LIGHT_COUNT), Some(UniformValue::Int(1)));
        assert_eq!(backend.uniform(shader, names::DIRECTIONAL_LIGHT_COUNT), Some(UniformValue::Int(1)));
        assert_eq!(
            backend.uniform(shader, "directionalLights[0].color"),
            Some(UniformValue::Vec3(Vec3::splat(0.2)))
        );

        let last = backend.calls().last().unwrap();
        assert!(matches!(last, BackendCall::Draw { index_count, .. } if *index_count as usize == scene.geometry().get(sphere).unwrap().index_count()));
    }

    #[test]
    fn light_count_is_capped() {
        let (mut scene, mut backend, shader, material) = scene_with_shader();
        let sphere = scene.shared_sphere();
        scene.add_entity(Entity::new(sphere, material, shader, Mat4::IDENTITY));
        for _ in 0..MAX_POINT_LIGHTS + 2 {
            scene.add_light(Light::point(Vec3::ZERO, Vec3::ONE));
        }
        scene.initialize_all(&mut backend).unwrap();
        scene.render_frame(&mut backend).unwrap();

        assert_eq!(
            backend.uniform(shader, names::POINT_LIGHT_COUNT),
            Some(UniformValue::Int(MAX_POINT_LIGHTS as i32))
        );
        let overflow = format!("pointLights[{MAX_POINT_LIGHTS}].color");
        assert_eq!(backend.uniform(shader, &overflow), None);
    }

    #[test]
    fn render_before_initialize_fails() {
        let (mut scene, mut backend, shader, material) = scene_with_shader();
        let sphere = scene.shared_sphere();
        scene.add_entity(Entity::new(sphere, material, shader, Mat4::IDENTITY));
        assert!(matches!(scene.render_frame(&mut backend), Err(Error::NotInitialized(_))));
    }
}
