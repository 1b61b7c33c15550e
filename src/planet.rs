//! Spinning, orbiting bodies.
//!
//! A [`Planet`] is either a root body such as a sun, spinning at the origin, or
//! orbits another planet. Its model matrix is rebuilt from scratch on every
//! [`Planet::update`]:
//!
//! ```text
//! local = S(size) · R(spin.speed · t, spin.axis)
//! root:     model = local
//! orbiting: model = center.model
//!                 · R(-center.spin.speed · t, center.spin.axis)
//!                 · R(orbit.speed · t, orbit.axis)
//!                 · T(orbit.radius, 0, 0)
//!                 · local
//! ```
//!
//! The counter-rotation cancels the center's own spin so a satellite's orbit
//! is not dragged around by its parent's rotation. The center's scale is kept,
//! which makes `size` and `orbit.radius` relative to the parent.
//!
//! The center is referred to by [`EntityId`]; the caller resolves it and
//! passes its current [`PlanetFrame`] in. Updating a child before its parent
//! in the same tick leaves the child one tick behind.

use glam::{Mat4, Vec3};

use crate::entity::EntityId;
use crate::error::{Error, Result};

/// Rotation of a body about its own axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Spin {
    speed: f32,
    axis: Vec3,
}

impl Spin {
    /// `speed` in radians per unit of time. A zero axis falls back to +Y with a warning.
    pub fn new(speed: f32, axis: Vec3) -> Self {
        Self {
            speed,
            axis: unit_axis(axis),
        }
    }

    pub fn none() -> Self {
        Self::new(0.0, Vec3::Y)
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn axis(&self) -> Vec3 {
        self.axis
    }

    pub fn rotation(&self, time: f32) -> Mat4 {
        Mat4::from_axis_angle(self.axis, self.speed * time)
    }
}

/// Circular path around a center body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Orbit {
    speed: f32,
    axis: Vec3,
    radius: f32,
}

impl Orbit {
    pub fn new(speed: f32, axis: Vec3, radius: f32) -> Self {
        Self {
            speed,
            axis: unit_axis(axis),
            radius,
        }
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn axis(&self) -> Vec3 {
        self.axis
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    fn transform(&self, time: f32) -> Mat4 {
        Mat4::from_axis_angle(self.axis, self.speed * time)
            * Mat4::from_translation(Vec3::new(self.radius, 0.0, 0.0))
    }
}

fn unit_axis(axis: Vec3) -> Vec3 {
    axis.try_normalize().unwrap_or_else(|| {
        log::warn!("degenerate rotation axis {axis}, using +Y");
        Vec3::Y
    })
}

/// Snapshot of a planet that children orbit around.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlanetFrame {
    pub model: Mat4,
    pub spin: Spin,
}

impl PlanetFrame {
    pub fn position(&self) -> Vec3 {
        self.model.w_axis.truncate()
    }
}

/// The body a planet orbits, as seen when the orbit is set up.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrbitCenter {
    pub entity: EntityId,
    pub frame: PlanetFrame,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Motion {
    size: f32,
    spin: Spin,
    orbit: Option<(Orbit, EntityId)>,
}

/// A spinning body, optionally orbiting another one.
///
/// Created uninitialized; every accessor other than [`Planet::is_initialized`]
/// fails with [`Error::NotInitialized`] until one of the `init_*` methods runs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Planet {
    motion: Option<Motion>,
    model: Mat4,
}

impl Planet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a body that orbits nothing at `position`.
    ///
    /// The position only holds until the first [`Planet::update`], which
    /// spins the body about the origin.
    pub fn init_root(&mut self, size: f32, spin: Spin, position: Vec3) {
        self.motion = Some(Motion {
            size,
            spin,
            orbit: None,
        });
        self.model = Mat4::from_translation(position) * Mat4::from_scale(Vec3::splat(size));
    }

    /// Places a body on an orbit around `center`, starting `radius` along +X from it.
    pub fn init_orbiting(&mut self, size: f32, spin: Spin, orbit: Orbit, center: &OrbitCenter) {
        let start = center.frame.position() + Vec3::new(orbit.radius, 0.0, 0.0);
        self.motion = Some(Motion {
            size,
            spin,
            orbit: Some((orbit, center.entity)),
        });
        self.model = Mat4::from_translation(start) * Mat4::from_scale(Vec3::splat(size));
    }

    /// Convenience constructor for [`Planet::init_root`].
    pub fn root(size: f32, spin: Spin, position: Vec3) -> Self {
        let mut planet = Self::new();
        planet.init_root(size, spin, position);
        planet
    }

    /// Convenience constructor for [`Planet::init_orbiting`].
    pub fn orbiting(size: f32, spin: Spin, orbit: Orbit, center: &OrbitCenter) -> Self {
        let mut planet = Self::new();
        planet.init_orbiting(size, spin, orbit, center);
        planet
    }

    pub fn is_initialized(&self) -> bool {
        self.motion.is_some()
    }

    fn motion(&self) -> Result<&Motion> {
        self.motion.as_ref().ok_or(Error::NotInitialized("planet"))
    }

    pub fn size(&self) -> Result<f32> {
        Ok(self.motion()?.size)
    }

    pub fn spin(&self) -> Result<Spin> {
        Ok(self.motion()?.spin)
    }

    pub fn orbit(&self) -> Result<Option<Orbit>> {
        Ok(self.motion()?.orbit.map(|(orbit, _)| orbit))
    }

    /// Entity this planet orbits, if any. `None` for uninitialized planets too.
    pub fn orbit_center(&self) -> Option<EntityId> {
        self.motion.and_then(|m| m.orbit).map(|(_, center)| center)
    }

    pub fn model(&self) -> Result<Mat4> {
        self.motion()?;
        Ok(self.model)
    }

    /// World position, the model matrix applied to the origin.
    pub fn position(&self) -> Result<Vec3> {
        Ok(self.model()?.w_axis.truncate())
    }

    pub fn frame(&self) -> Result<PlanetFrame> {
        Ok(PlanetFrame {
            model: self.model()?,
            spin: self.spin()?,
        })
    }

    /// Recomputes the model matrix for time `time`.
    ///
    /// `center` must be the current frame of the orbit center for an orbiting
    /// planet and is ignored for a root body.
    ///
    /// # Errors
    ///
    /// [`Error::NotInitialized`] if the planet was never initialized, or if it
    /// orbits something and `center` is `None`.
    pub fn update(&mut self, time: f32, center: Option<&PlanetFrame>) -> Result<()> {
        let motion = *self.motion()?;
        let local = Mat4::from_scale(Vec3::splat(motion.size)) * motion.spin.rotation(time);

        self.model = match motion.orbit {
            None => local,
            Some((orbit, _)) => {
                let center = center.ok_or(Error::NotInitialized("orbit center"))?;
                center.model
                    * Mat4::from_axis_angle(center.spin.axis, -center.spin.speed * time)
                    * orbit.transform(time)
                    * local
            }
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sun() -> Planet {
        Planet::root(1.0, Spin::new(0.01, Vec3::Y), Vec3::ZERO)
    }

    fn center(planet: &Planet) -> OrbitCenter {
        OrbitCenter {
            entity: EntityId(0),
            frame: planet.frame().unwrap(),
        }
    }

    #[test]
    fn uninitialized_planet_rejects_everything() {
        let mut planet = Planet::new();
        assert!(!planet.is_initialized());
        assert!(matches!(planet.model(), Err(Error::NotInitialized(_))));
        assert!(matches!(planet.size(), Err(Error::NotInitialized(_))));
        assert!(matches!(planet.update(1.0, None), Err(Error::NotInitialized(_))));
        assert_eq!(planet.orbit_center(), None);
    }

    #[test]
    fn root_planet_spins_at_the_origin() {
        let mut planet = Planet::root(2.0, Spin::new(1.0, Vec3::Y), Vec3::new(5.0, 0.0, 0.0));
        assert!(planet.position().unwrap().abs_diff_eq(Vec3::new(5.0, 0.0, 0.0), 1e-6));

        planet.update(0.5, None).unwrap();

        assert!(planet.position().unwrap().abs_diff_eq(Vec3::ZERO, 1e-6));
        let expected = Mat4::from_scale(Vec3::splat(2.0)) * Mat4::from_rotation_y(0.5);
        assert!(planet.model().unwrap().abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn repeated_update_with_same_time_is_stable() {
        let mut sun = sun();
        sun.update(1.0, None).unwrap();
        let first = sun.model().unwrap();
        sun.update(1.0, None).unwrap();
        assert_eq!(sun.model().unwrap(), first);

        let mut earth = Planet::orbiting(0.5, Spin::new(2.0, Vec3::X), Orbit::new(0.01, Vec3::Y, 10.0), &center(&sun));
        let frame = sun.frame().unwrap();
        earth.update(1.0, Some(&frame)).unwrap();
        let first = earth.model().unwrap();
        earth.update(1.0, Some(&frame)).unwrap();
        assert_eq!(earth.model().unwrap(), first);
    }

    #[test]
    fn orbiting_planet_starts_at_radius_along_x() {
        let sun = sun();
        let earth = Planet::orbiting(0.5, Spin::none(), Orbit::new(0.01, Vec3::Y, 10.0), &center(&sun));
        assert!(earth.position().unwrap().abs_diff_eq(Vec3::new(10.0, 0.0, 0.0), 1e-6));
        assert_eq!(earth.orbit_center(), Some(EntityId(0)));
    }

    #[test]
    fn orbit_distance_is_radius_times_center_scale() {
        let mut sun = sun();
        let mut earth = Planet::orbiting(0.5, Spin::new(0.01, Vec3::Y), Orbit::new(0.01, Vec3::Y, 10.0), &center(&sun));

        for t in [1.0, 25.0, 400.0] {
            sun.update(t, None).unwrap();
            earth.update(t, Some(&sun.frame().unwrap())).unwrap();
            let distance = earth.position().unwrap().distance(sun.position().unwrap());
            assert_relative_eq!(distance, 10.0, epsilon = 1e-3);
        }
    }

    #[test]
    fn center_spin_does_not_drag_the_orbit() {
        let mut sun = Planet::root(1.0, Spin::new(3.0, Vec3::Y), Vec3::ZERO);
        let mut earth = Planet::orbiting(1.0, Spin::none(), Orbit::new(0.0, Vec3::Y, 5.0), &center(&sun));

        sun.update(0.7, None).unwrap();
        earth.update(0.7, Some(&sun.frame().unwrap())).unwrap();

        assert!(earth.position().unwrap().abs_diff_eq(Vec3::new(5.0, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn orbiting_planet_needs_its_center() {
        let sun = sun();
        let mut earth = Planet::orbiting(0.5, Spin::none(), Orbit::new(0.01, Vec3::Y, 10.0), &center(&sun));
        assert!(matches!(earth.update(1.0, None), Err(Error::NotInitialized(_))));
    }

    #[test]
    fn degenerate_axis_falls_back_to_y() {
        assert_eq!(Spin::new(1.0, Vec3::ZERO).axis(), Vec3::Y);
        assert_eq!(Orbit::new(1.0, Vec3::new(0.0, 0.0, 2.0), 1.0).axis(), Vec3::Z);
    }
}
