//! # Orrery
//!
//! **A small real-time solar system on a hierarchical orbit scene graph.**
//!
//! Planets spin about their own axis and orbit other planets; moons orbit
//! planets that orbit a sun. Each frame the [`Scene`] advances every body,
//! then draws it with Phong lighting from point and directional lights.
//!
//! ## Quick Start
//!
//! ```no_run
//! use orrery::*;
//!
//! fn main() -> Result<()> {
//!     run(AppConfig::default(), |ctx| {
//!         let shader = ctx.load_default_shader()?;
//!         let mut scene = Scene::new(Camera::new().at(0.0, 10.0, 30.0).with_clip(0.1, 200.0));
//!         let sphere = scene.shared_sphere();
//!         let glow = scene.add_material(Material::new(Vec3::new(1.0, 0.9, 0.3), 0.0, 0.0, 1.0));
//!
//!         let sun = scene
//!             .add_sun(sphere, glow, shader, Planet::root(2.0, Spin::new(0.1, Vec3::Y), Vec3::ZERO), Vec3::ONE)
//!             .ok_or(Error::Rejected("sun"))?;
//!         let plain = scene.add_material(Material::default());
//!         let center = scene.orbit_center(sun)?;
//!         let earth = Planet::orbiting(0.5, Spin::new(1.0, Vec3::Y), Orbit::new(0.3, Vec3::Y, 10.0), &center);
//!         scene.add_planet(sphere, plain, shader, earth);
//!         Ok(scene)
//!     })
//! }
//! ```
//!
//! ## Testing Without a GPU
//!
//! Everything that talks to the GPU goes through the [`Backend`] trait.
//! [`HeadlessBackend`] records every call instead, so scenes can be updated
//! and rendered in plain unit tests.

mod app;
mod backend;
mod camera;
mod entity;
mod error;
mod geometry;
mod gpu;
mod input;
mod light;
mod material;
mod mesh;
mod mesh_pass;
mod planet;
pub mod scene;
mod shader;
mod texture;
pub mod uniforms;

pub use app::{AppConfig, SetupContext, run};
pub use backend::{Backend, BackendCall, GeometryId, HeadlessBackend, ShaderId, TextureId};
pub use camera::{Camera, CameraMovement, MAX_FOV, MIN_FOV, ProjectionKind};
pub use entity::{Entity, EntityId, EntityKind, ModelSource};
pub use error::{Error, GeometryError, Result};
pub use geometry::{GeometryCache, MeshId, SHARED_SPHERE_RESOLUTION};
pub use gpu::GpuContext;
pub use input::Input;
pub use light::{Light, LightAnchor, LightKind};
pub use material::{Material, MaterialId};
pub use mesh::{DEFAULT_COLOR, FLOATS_PER_VERTEX, Mesh, Vertex};
pub use mesh_pass::MeshPass;
pub use planet::{Orbit, OrbitCenter, Planet, PlanetFrame, Spin};
pub use scene::Scene;
pub use shader::ShaderSource;
pub use texture::{Filtering, Texture, TextureImage, TextureOptions, Wrapping};
pub use uniforms::{UniformBlock, UniformSink, UniformValue};

// Re-export glam types for convenience
pub use glam::{Mat4, Quat, Vec3, Vec4};
