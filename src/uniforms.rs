//! Named shader uniforms and the CPU-side block they are packed into.
//!
//! Scene code talks to shaders the way a GL program would: it pushes values
//! under fixed names (`modelMat`, `fAmbient`, `pointLights[2].color`, ...)
//! through a [`UniformSink`]. The wgpu backend stores those values in a
//! [`UniformBlock`], a `#[repr(C)]` struct whose layout matches the `Uniforms`
//! struct declared in `shaders/planet.vert.wgsl` and `shaders/planet.frag.wgsl`.
//!
//! # Block Layout
//!
//! | Field                  | WGSL type            | Offset |
//! |------------------------|----------------------|--------|
//! | `modelMat`             | `mat4x4<f32>`        | 0      |
//! | `viewMat`              | `mat4x4<f32>`        | 64     |
//! | `projMat`              | `mat4x4<f32>`        | 128    |
//! | `camPos`               | `vec3<f32>`          | 192    |
//! | `fDiffuse`             | `f32`                | 204    |
//! | `fAmbient`             | `vec3<f32>`          | 208    |
//! | `fSpecular`            | `f32`                | 220    |
//! | `fShininess`           | `f32`                | 224    |
//! | `hasTexture`           | `u32`                | 228    |
//! | `diffuseTexture`       | `u32`                | 232    |
//! | `nbPointLights`        | `u32`                | 236    |
//! | `nbDirectionalLights`  | `u32`                | 240    |
//! | `pointLights`          | `array<Light, 8>`    | 256    |
//! | `directionalLights`    | `array<Light, 4>`    | 1024   |

use glam::{Mat4, Vec3};

/// Size of the point light array declared by the shaders.
pub const MAX_POINT_LIGHTS: usize = 8;

/// Size of the directional light array declared by the shaders.
pub const MAX_DIRECTIONAL_LIGHTS: usize = 4;

/// Texture unit the diffuse texture is bound to.
pub const DIFFUSE_TEXTURE_UNIT: u32 = 0;

/// Uniform names shared with the shader interface.
pub mod names {
    pub const MODEL: &str = "modelMat";
    pub const VIEW: &str = "viewMat";
    pub const PROJECTION: &str = "projMat";
    pub const CAMERA_POSITION: &str = "camPos";
    pub const AMBIENT: &str = "fAmbient";
    pub const DIFFUSE: &str = "fDiffuse";
    pub const SPECULAR: &str = "fSpecular";
    pub const SHININESS: &str = "fShininess";
    pub const HAS_TEXTURE: &str = "hasTexture";
    pub const DIFFUSE_TEXTURE: &str = "diffuseTexture";
    pub const POINT_LIGHT_COUNT: &str = "NB_POINT_LIGHTS";
    pub const DIRECTIONAL_LIGHT_COUNT: &str = "NB_DIRECTIONAL_LIGHTS";
    pub const POINT_LIGHTS: &str = "pointLights";
    pub const DIRECTIONAL_LIGHTS: &str = "directionalLights";
}

/// A value pushed to a named uniform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Bool(bool),
    Float(f32),
    Vec3(Vec3),
    Mat4(Mat4),
}

/// Anything that accepts named uniform values for the active shader program.
pub trait UniformSink {
    /// Store `value` under `name` in the currently active program.
    fn set_uniform(&mut self, name: &str, value: UniformValue);

    fn set_int(&mut self, name: &str, value: i32) {
        self.set_uniform(name, UniformValue::Int(value));
    }

    fn set_bool(&mut self, name: &str, value: bool) {
        self.set_uniform(name, UniformValue::Bool(value));
    }

    fn set_float(&mut self, name: &str, value: f32) {
        self.set_uniform(name, UniformValue::Float(value));
    }

    fn set_vec3(&mut self, name: &str, value: Vec3) {
        self.set_uniform(name, UniformValue::Vec3(value));
    }

    fn set_mat4(&mut self, name: &str, value: Mat4) {
        self.set_uniform(name, UniformValue::Mat4(value));
    }
}

/// One light entry in the shader's light arrays.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    pub position: [f32; 3],
    _pad0: f32,
    pub color: [f32; 3],
    _pad1: f32,
    pub model: [[f32; 4]; 4],
}

/// Everything a draw call reads from group 0.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct UniformBlock {
    pub model: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub camera_position: [f32; 3],
    pub diffuse: f32,
    pub ambient: [f32; 3],
    pub specular: f32,
    pub shininess: f32,
    pub has_texture: u32,
    pub diffuse_texture: u32,
    pub point_light_count: u32,
    pub directional_light_count: u32,
    _pad: [u32; 3],
    pub point_lights: [LightUniform; MAX_POINT_LIGHTS],
    pub directional_lights: [LightUniform; MAX_DIRECTIONAL_LIGHTS],
}

impl Default for UniformBlock {
    fn default() -> Self {
        let identity = Mat4::IDENTITY.to_cols_array_2d();
        Self {
            model: identity,
            view: identity,
            projection: identity,
            ..bytemuck::Zeroable::zeroed()
        }
    }
}

/// The field of a light array entry a uniform name refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LightField {
    Position,
    Color,
    Model,
}

impl UniformBlock {
    /// Byte size of the block as seen by the GPU.
    pub const SIZE: u64 = std::mem::size_of::<UniformBlock>() as u64;

    /// Writes a named value into the block.
    ///
    /// Returns `false` when the name is unknown, the array index is past the
    /// declared size, or the value has the wrong type. Those writes are
    /// dropped, the same way GL ignores a uniform location of -1.
    pub fn apply(&mut self, name: &str, value: UniformValue) -> bool {
        use UniformValue as V;

        match (name, value) {
            (names::MODEL, V::Mat4(m)) => self.model = m.to_cols_array_2d(),
            (names::VIEW, V::Mat4(m)) => self.view = m.to_cols_array_2d(),
            (names::PROJECTION, V::Mat4(m)) => self.projection = m.to_cols_array_2d(),
            (names::CAMERA_POSITION, V::Vec3(v)) => self.camera_position = v.to_array(),
            (names::AMBIENT, V::Vec3(v)) => self.ambient = v.to_array(),
            (names::AMBIENT, V::Float(f)) => self.ambient = [f; 3],
            (names::DIFFUSE, V::Float(f)) => self.diffuse = f,
            (names::SPECULAR, V::Float(f)) => self.specular = f,
            (names::SHININESS, V::Float(f)) => self.shininess = f,
            (names::HAS_TEXTURE, V::Bool(b)) => self.has_texture = b as u32,
            (names::HAS_TEXTURE, V::Int(i)) => self.has_texture = (i != 0) as u32,
            (names::DIFFUSE_TEXTURE, V::Int(i)) if i >= 0 => self.diffuse_texture = i as u32,
            (names::POINT_LIGHT_COUNT, V::Int(i)) if i >= 0 => {
                self.point_light_count = (i as u32).min(MAX_POINT_LIGHTS as u32)
            }
            (names::DIRECTIONAL_LIGHT_COUNT, V::Int(i)) if i >= 0 => {
                self.directional_light_count = (i as u32).min(MAX_DIRECTIONAL_LIGHTS as u32)
            }
            _ => return self.apply_light(name, value),
        }
        true
    }

    fn apply_light(&mut self, name: &str, value: UniformValue) -> bool {
        let Some((array, index, field)) = parse_light_name(name) else {
            return false;
        };

        let slot = match array {
            names::POINT_LIGHTS => self.point_lights.get_mut(index),
            names::DIRECTIONAL_LIGHTS => self.directional_lights.get_mut(index),
            _ => None,
        };
        let Some(slot) = slot else {
            return false;
        };

        match (field, value) {
            (LightField::Position, UniformValue::Vec3(v)) => slot.position = v.to_array(),
            (LightField::Color, UniformValue::Vec3(v)) => slot.color = v.to_array(),
            (LightField::Model, UniformValue::Mat4(m)) => slot.model = m.to_cols_array_2d(),
            _ => return false,
        }
        true
    }
}

/// Splits `pointLights[3].color` into `("pointLights", 3, Color)`.
fn parse_light_name(name: &str) -> Option<(&str, usize, LightField)> {
    let (head, field) = name.split_once("].")?;
    let (array, index) = head.split_once('[')?;
    let index = index.parse().ok()?;
    let field = match field {
        "position" => LightField::Position,
        "color" => LightField::Color,
        "model" => LightField::Model,
        _ => return None,
    };
    Some((array, index, field))
}

/// Uniform name for one field of a light array entry.
pub fn light_uniform_name(prefix: &str, field: &str) -> String {
    format!("{prefix}.{field}")
}
