//! Perspective camera shared by the scene render pass and camera-aware effects.

use std::f32::consts::{FRAC_PI_4, PI};

use glam::{Mat4, Vec3};

/// Smallest angle kept between the view direction and the up axis when orbiting.
const POLE_MARGIN: f32 = 0.01;
/// Extra distance applied by [`Camera::look_at_box`] around the framed sphere.
const FRAME_PADDING: f32 = 1.1;

/// A perspective camera looking at a target point.
///
/// The render pass updates [`aspect_ratio`](Self::aspect_ratio) when the
/// composer is resized.
#[derive(Debug, Clone)]
pub struct Camera {
    /// Eye position in world space.
    pub position: Vec3,
    /// Point the camera looks at.
    pub target: Vec3,
    /// Up vector.
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov: f32,
    /// Width over height.
    pub aspect_ratio: f32,
    /// Near clip distance.
    pub near: f32,
    /// Far clip distance.
    pub far: f32,
}

impl Camera {
    /// Creates a camera three units in front of the origin, looking at it.
    #[must_use]
    pub fn new(aspect_ratio: f32) -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 3.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov: FRAC_PI_4,
            aspect_ratio,
            near: 0.01,
            far: 1000.0,
        }
    }

    /// Places the camera at `position` looking at `target`.
    #[must_use]
    pub fn looking_at(mut self, position: Vec3, target: Vec3) -> Self {
        self.position = position;
        self.target = target;
        self
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio;
    }

    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect_ratio, self.near, self.far)
    }

    /// Projection times view, as uploaded to the scene shader.
    #[must_use]
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Rotates the eye around the target by `yaw` (about the up axis) and
    /// `pitch` (towards the poles), keeping the distance.
    pub fn orbit(&mut self, yaw: f32, pitch: f32) {
        let offset = self.position - self.target;
        let distance = offset.length();
        if distance <= f32::EPSILON {
            return;
        }

        let azimuth = offset.x.atan2(offset.z) - yaw;
        let polar = ((offset.y / distance).clamp(-1.0, 1.0).acos() - pitch)
            .clamp(POLE_MARGIN, PI - POLE_MARGIN);
        let (sin_polar, cos_polar) = polar.sin_cos();
        let (sin_azimuth, cos_azimuth) = azimuth.sin_cos();
        self.position = self.target
            + distance * Vec3::new(sin_polar * sin_azimuth, cos_polar, sin_polar * cos_azimuth);
    }

    /// Frames an axis-aligned box: targets its center and backs off along +Z
    /// until the bounding sphere fits the vertical field of view.
    pub fn look_at_box(&mut self, min: Vec3, max: Vec3) {
        let center = (min + max) * 0.5;
        let radius = ((max - min).length() * 0.5).max(1e-3);
        let distance = FRAME_PADDING * radius / (self.fov * 0.5).sin();

        self.target = center;
        self.position = center + Vec3::Z * distance;
        self.near = ((distance - radius) * 0.5).max(radius * 1e-3);
        self.far = distance + radius * 4.0;
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(16.0 / 9.0)
    }
}
