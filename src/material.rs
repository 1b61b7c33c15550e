use glam::Vec3;

use crate::uniforms::{UniformSink, names};

/// Handle to a material stored in a [`Scene`](crate::scene::Scene).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MaterialId(pub(crate) usize);

impl MaterialId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Phong lighting coefficients.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    ambient: Vec3,
    diffuse: f32,
    specular: f32,
    shininess: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            ambient: Vec3::ZERO,
            diffuse: 1.0,
            specular: 1.0,
            shininess: 10.0,
        }
    }
}

impl Material {
    /// Creates a material. A negative ambient component is rejected with a
    /// warning and the ambient term falls back to zero.
    pub fn new(ambient: Vec3, diffuse: f32, specular: f32, shininess: f32) -> Self {
        let mut material = Self {
            diffuse,
            specular,
            shininess,
            ..Self::default()
        };
        material.set_ambient(ambient);
        material
    }

    pub fn ambient(&self) -> Vec3 {
        self.ambient
    }

    pub fn diffuse(&self) -> f32 {
        self.diffuse
    }

    pub fn specular(&self) -> f32 {
        self.specular
    }

    pub fn shininess(&self) -> f32 {
        self.shininess
    }

    /// Replaces the ambient term. Returns `false` and keeps the old value if any
    /// component is negative.
    pub fn set_ambient(&mut self, ambient: Vec3) -> bool {
        if ambient.min_element() < 0.0 {
            log::warn!("ignoring negative ambient {ambient}");
            return false;
        }
        self.ambient = ambient;
        true
    }

    /// Pushes `fAmbient`, `fDiffuse`, `fSpecular` and `fShininess` to the active program.
    pub fn apply_to_shader<U: UniformSink + ?Sized>(&self, uniforms: &mut U) {
        uniforms.set_vec3(names::AMBIENT, self.ambient);
        uniforms.set_float(names::DIFFUSE, self.diffuse);
        uniforms.set_float(names::SPECULAR, self.specular);
        uniforms.set_float(names::SHININESS, self.shininess);
    }
}
