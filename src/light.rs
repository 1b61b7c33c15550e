use glam::{Mat4, Vec3};

use crate::entity::{EntityId, ModelSource};
use crate::error::Result;
use crate::uniforms::{UniformSink, light_uniform_name};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LightKind {
    Point,
    Directional,
}

/// Where a light takes its model matrix from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LightAnchor {
    /// Follows an entity, e.g. the sun a point light sits in.
    Entity(EntityId),
    /// A fixed matrix.
    Fixed(Mat4),
}

/// A light source.
///
/// `position` is expressed in the anchor's model space. For a directional
/// light it is the direction the light comes from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Light {
    kind: LightKind,
    position: Vec3,
    color: Vec3,
    anchor: LightAnchor,
}

impl Light {
    pub fn new(kind: LightKind, position: Vec3, color: Vec3, anchor: LightAnchor) -> Self {
        Self {
            kind,
            position,
            color,
            anchor,
        }
    }

    /// A point light at `position` in world space.
    pub fn point(position: Vec3, color: Vec3) -> Self {
        Self::new(LightKind::Point, position, color, LightAnchor::Fixed(Mat4::IDENTITY))
    }

    /// A directional light shining from `direction`.
    pub fn directional(direction: Vec3, color: Vec3) -> Self {
        Self::new(LightKind::Directional, direction, color, LightAnchor::Fixed(Mat4::IDENTITY))
    }

    /// A light that follows `entity`.
    pub fn attached(kind: LightKind, entity: EntityId, position: Vec3, color: Vec3) -> Self {
        Self::new(kind, position, color, LightAnchor::Entity(entity))
    }

    pub fn kind(&self) -> LightKind {
        self.kind
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn color(&self) -> Vec3 {
        self.color
    }

    pub fn anchor(&self) -> LightAnchor {
        self.anchor
    }

    pub fn set_color(&mut self, color: Vec3) {
        self.color = color;
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Current model matrix, read from the anchor entity if there is one.
    pub fn model<S: ModelSource + ?Sized>(&self, entities: &S) -> Result<Mat4> {
        match self.anchor {
            LightAnchor::Entity(id) => entities.model_of(id),
            LightAnchor::Fixed(model) => Ok(model),
        }
    }

    /// Pushes `{prefix}.position`, `{prefix}.color` and `{prefix}.model`.
    ///
    /// `prefix` is the light's slot in the shader, such as `pointLights[0]`.
    pub fn send_to_shader<U, S>(&self, uniforms: &mut U, prefix: &str, entities: &S) -> Result<()>
    where
        U: UniformSink + ?Sized,
        S: ModelSource + ?Sized,
    {
        let model = self.model(entities)?;
        uniforms.set_vec3(&light_uniform_name(prefix, "position"), self.position);
        uniforms.set_vec3(&light_uniform_name(prefix, "color"), self.color);
        uniforms.set_mat4(&light_uniform_name(prefix, "model"), model);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Backend, HeadlessBackend, ShaderId};
    use crate::entity::Entity;
    use crate::error::Error;
    use crate::geometry::MeshId;
    use crate::material::MaterialId;
    use crate::shader::ShaderSource;
    use crate::uniforms::UniformValue;

    #[test]
    fn attached_light_follows_its_entity() {
        let model = Mat4::from_translation(Vec3::new(3.0, 0.0, 0.0));
        let entities = vec![Entity::new(MeshId(0), MaterialId(0), ShaderId(0), model)];
        let light = Light::attached(LightKind::Point, EntityId(0), Vec3::ZERO, Vec3::ONE);

        assert_eq!(light.model(entities.as_slice()).unwrap(), model);
    }

    #[test]
    fn missing_anchor_is_an_error() {
        let entities: Vec<Entity> = Vec::new();
        let light = Light::attached(LightKind::Point, EntityId(2), Vec3::ZERO, Vec3::ONE);
        assert!(matches!(
            light.model(entities.as_slice()),
            Err(Error::InvalidHandle { kind: "entity", index: 2 })
        ));
    }

    #[test]
    fn sends_three_prefixed_uniforms() {
        let mut backend = HeadlessBackend::new();
        let shader = backend.create_shader(&ShaderSource::from_wgsl("planet", "", "")).unwrap();
        backend.use_shader(shader).unwrap();

        let light = Light::point(Vec3::new(1.0, 2.0, 3.0), Vec3::new(1.0, 0.9, 0.8));
        light.send_to_shader(&mut backend, "pointLights[1]", &[] as &[Entity]).unwrap();

        assert_eq!(
            backend.uniform(shader, "pointLights[1].position"),
            Some(UniformValue::Vec3(Vec3::new(1.0, 2.0, 3.0)))
        );
        assert_eq!(
            backend.uniform(shader, "pointLights[1].color"),
            Some(UniformValue::Vec3(Vec3::new(1.0, 0.9, 0.8)))
        );
        assert_eq!(
            backend.uniform(shader, "pointLights[1].model"),
            Some(UniformValue::Mat4(Mat4::IDENTITY))
        );
    }
}
