//! Look-at camera producing view and projection matrices.
//!
//! The camera is described by an eye position, a target point and an up
//! vector, plus a vertical field of view, aspect ratio and clip planes.
//!
//! ```
//! use orrery::Camera;
//!
//! let camera = Camera::new()
//!     .at(0.0, 10.0, 30.0)
//!     .looking_at(0.0, 0.0, 0.0)
//!     .with_fov(40.0)
//!     .with_clip(0.1, 200.0);
//!
//! let view_proj = camera.projection_matrix() * camera.view_matrix();
//! # let _ = view_proj;
//! ```

use glam::{Mat4, Vec3};

/// Smallest vertical field of view, in degrees.
pub const MIN_FOV: f32 = 1.0;

/// Largest vertical field of view, in degrees.
pub const MAX_FOV: f32 = 45.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProjectionKind {
    #[default]
    Perspective,
    Orthographic,
}

/// Direction of a keyboard camera move, relative to the view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CameraMovement {
    Left,
    Right,
    Up,
    Down,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    position: Vec3,
    target: Vec3,
    up: Vec3,
    fov: f32, // degrees
    ratio: f32,
    near: f32,
    far: f32,
    speed: f32,
    projection: ProjectionKind,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 3.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov: MAX_FOV,
            ratio: 1.0,
            near: 0.1,
            far: 100.0,
            speed: 10.0,
            projection: ProjectionKind::Perspective,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(mut self, x: f32, y: f32, z: f32) -> Self {
        self.position = Vec3::new(x, y, z);
        self
    }

    pub fn looking_at(mut self, target_x: f32, target_y: f32, target_z: f32) -> Self {
        self.target = Vec3::new(target_x, target_y, target_z);
        self
    }

    pub fn with_up(mut self, up: Vec3) -> Self {
        self.up = up;
        self
    }

    /// Sets the vertical field of view in degrees, clamped to `[MIN_FOV, MAX_FOV]`.
    pub fn with_fov(mut self, fov_degrees: f32) -> Self {
        self.set_fov(fov_degrees);
        self
    }

    pub fn with_ratio(mut self, ratio: f32) -> Self {
        self.set_ratio(ratio);
        self
    }

    pub fn with_clip(mut self, near: f32, far: f32) -> Self {
        self.set_clip(near, far);
        self
    }

    /// Units per second for [`Camera::travel`].
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_projection(mut self, projection: ProjectionKind) -> Self {
        self.projection = projection;
        self
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    pub fn near(&self) -> f32 {
        self.near
    }

    pub fn far(&self) -> f32 {
        self.far
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn projection(&self) -> ProjectionKind {
        self.projection
    }

    pub fn move_to(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn set_target(&mut self, target: Vec3) {
        self.target = target;
    }

    pub fn set_up(&mut self, up: Vec3) {
        self.up = up;
    }

    pub fn set_fov(&mut self, fov_degrees: f32) {
        self.fov = fov_degrees.clamp(MIN_FOV, MAX_FOV);
    }

    /// Sets the aspect ratio. Non-positive values are rejected with a warning.
    pub fn set_ratio(&mut self, ratio: f32) -> bool {
        if !(ratio > 0.0) {
            log::warn!("ignoring camera aspect ratio {ratio}");
            return false;
        }
        self.ratio = ratio;
        true
    }

    /// Sets the clip planes. Rejected with a warning unless `0 < near < far`.
    pub fn set_clip(&mut self, near: f32, far: f32) -> bool {
        if !(near > 0.0 && far > near) {
            log::warn!("ignoring camera clip planes near={near} far={far}");
            return false;
        }
        self.near = near;
        self.far = far;
        true
    }

    pub fn set_projection(&mut self, projection: ProjectionKind) {
        self.projection = projection;
    }

    /// Unit vector from the eye to the target.
    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize_or_zero()
    }

    pub fn right(&self) -> Vec3 {
        self.forward().cross(self.up).normalize_or_zero()
    }

    /// Up vector re-orthogonalized against the view direction.
    pub fn orthogonal_up(&self) -> Vec3 {
        self.right().cross(self.forward()).normalize_or_zero()
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        let fov = self.fov.to_radians();
        match self.projection {
            ProjectionKind::Perspective => Mat4::perspective_rh(fov, self.ratio, self.near, self.far),
            ProjectionKind::Orthographic => {
                let half_height = (fov / 2.0).tan() * self.position.distance(self.target);
                let half_width = half_height * self.ratio;
                Mat4::orthographic_rh(
                    -half_width,
                    half_width,
                    -half_height,
                    half_height,
                    self.near,
                    self.far,
                )
            }
        }
    }

    /// Slides the eye and target together across the view plane.
    pub fn travel(&mut self, direction: CameraMovement, dt: f32) {
        let step = self.speed * dt;
        let offset = match direction {
            CameraMovement::Left => -self.right(),
            CameraMovement::Right => self.right(),
            CameraMovement::Up => self.orthogonal_up(),
            CameraMovement::Down => -self.orthogonal_up(),
        } * step;
        self.position += offset;
        self.target += offset;
    }

    /// Narrows the field of view for positive scroll, widens it for negative.
    pub fn zoom(&mut self, scroll: f32) {
        self.set_fov(self.fov - scroll);
    }

    pub fn describe(&self) -> String {
        format!(
            "Camera: position {} target {} up {} fov {:.1} ratio {:.3} clip [{}, {}] {:?}",
            self.position,
            self.target,
            self.up,
            self.fov,
            self.ratio,
            self.near,
            self.far,
            self.projection
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn fov_is_clamped() {
        let mut camera = Camera::new().with_fov(90.0);
        assert_eq!(camera.fov(), MAX_FOV);
        camera.set_fov(0.2);
        assert_eq!(camera.fov(), MIN_FOV);
        camera.set_fov(30.0);
        assert_eq!(camera.fov(), 30.0);
    }

    #[test]
    fn zoom_stays_in_range() {
        let mut camera = Camera::new().with_fov(10.0);
        camera.zoom(3.0);
        assert_eq!(camera.fov(), 7.0);
        camera.zoom(100.0);
        assert_eq!(camera.fov(), MIN_FOV);
        camera.zoom(-100.0);
        assert_eq!(camera.fov(), MAX_FOV);
    }

    #[test]
    fn invalid_ratio_and_clip_are_ignored() {
        let mut camera = Camera::new();
        assert!(!camera.set_ratio(0.0));
        assert!(!camera.set_ratio(-1.5));
        assert_eq!(camera.ratio(), 1.0);
        assert!(!camera.set_clip(1.0, 0.5));
        assert_eq!((camera.near(), camera.far()), (0.1, 100.0));
    }

    #[test]
    fn view_matrix_puts_the_target_in_front() {
        let camera = Camera::new().at(0.0, 0.0, 10.0).looking_at(0.0, 0.0, 0.0);
        let target_in_view = camera.view_matrix().transform_point3(Vec3::ZERO);
        assert!(target_in_view.abs_diff_eq(Vec3::new(0.0, 0.0, -10.0), 1e-5));
    }

    #[test]
    fn perspective_maps_near_plane_to_zero_depth() {
        let camera = Camera::new().with_clip(1.0, 50.0);
        let clip = camera.projection_matrix() * glam::Vec4::new(0.0, 0.0, -1.0, 1.0);
        assert_relative_eq!(clip.z / clip.w, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn travel_moves_eye_and_target_together() {
        let mut camera = Camera::new().at(0.0, 0.0, 5.0).with_speed(2.0);
        camera.travel(CameraMovement::Right, 0.5);
        assert!(camera.position().abs_diff_eq(Vec3::new(1.0, 0.0, 5.0), 1e-5));
        assert!(camera.target().abs_diff_eq(Vec3::new(1.0, 0.0, 0.0), 1e-5));

        camera.travel(CameraMovement::Up, 1.0);
        assert_relative_eq!(camera.position().y, 2.0, epsilon = 1e-5);
    }
}
