//! Camera with a mutable projection and a world transform.

use crate::math::{self, Mat4};

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Projection matrix. The pipeline jitters this for the scene pass and
    /// restores it before returning.
    pub projection: Mat4,
    /// Camera-to-world transform.
    pub world: Mat4,
    pub near: f32,
    pub far: f32,
    fov_y: f32,
}

impl Camera {
    /// Perspective camera at the origin looking down -Z. `fov_y_degrees` is vertical.
    pub fn perspective(fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        let fov_y = fov_y_degrees.to_radians();
        Self {
            projection: math::perspective(fov_y, aspect, near, far),
            world: math::IDENTITY,
            near,
            far,
            fov_y,
        }
    }

    /// Rebuild the projection for a new viewport aspect ratio.
    pub fn set_aspect(&mut self, aspect: f32) {
        self.projection = math::perspective(self.fov_y, aspect, self.near, self.far);
    }

    pub fn look_at(&mut self, eye: [f32; 3], target: [f32; 3]) {
        self.world = math::look_at(eye, target, [0.0, 1.0, 0.0]);
    }

    /// World-to-camera transform.
    pub fn view(&self) -> Mat4 {
        math::inverse(&self.world).unwrap_or(math::IDENTITY)
    }

    pub fn inverse_projection(&self) -> Mat4 {
        math::inverse(&self.projection).unwrap_or(math::IDENTITY)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::perspective(60.0, 1.0, 0.1, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_inverts_world() {
        let mut camera = Camera::default();
        camera.look_at([3.0, 2.0, 6.0], [0.0, 0.0, 0.0]);
        let product = math::mul(&camera.view(), &camera.world);
        for (a, b) in product.iter().zip(math::IDENTITY.iter()) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn set_aspect_keeps_vertical_fov() {
        let mut camera = Camera::perspective(60.0, 1.0, 0.1, 50.0);
        let vertical = camera.projection[5];
        camera.set_aspect(2.0);
        assert_eq!(camera.projection[5], vertical);
        assert!((camera.projection[0] - vertical / 2.0).abs() < 1e-6);
    }

    #[test]
    fn inverse_projection_round_trips() {
        let camera = Camera::default();
        let product = math::mul(&camera.projection, &camera.inverse_projection());
        for (a, b) in product.iter().zip(math::IDENTITY.iter()) {
            assert!((a - b).abs() < 1e-4);
        }
    }
}
