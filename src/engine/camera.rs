use glam::Mat4;
use serde::Serialize;

use crate::engine::config::CameraConfig;
use crate::engine::graphics::primitives::Transform;

/// Perspective camera.
///
/// Pose uses the same conventions as scene nodes: position plus X-then-Y-then-Z Euler
/// rotation. The camera looks down its local -Z.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PerspectiveCamera {
    pub fov_y_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
    pub rotation: [f32; 3],
}

impl Default for PerspectiveCamera {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default(), 1.0)
    }
}

impl PerspectiveCamera {
    pub fn from_config(config: &CameraConfig, aspect: f32) -> Self {
        Self {
            fov_y_degrees: config.fov_y_degrees,
            aspect,
            near: config.near,
            far: config.far,
            position: config.position,
            rotation: [0.0; 3],
        }
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    fn pose(&self) -> Transform {
        Transform {
            position: self.position,
            rotation: self.rotation,
            scale: [1.0; 3],
        }
    }

    /// World -> view. Inverse of the camera's rigid pose.
    pub fn view(&self) -> Mat4 {
        self.pose().model().inverse()
    }

    /// Right-handed projection, Vulkan clip space (depth 0..1, +Y down).
    pub fn proj(&self) -> Mat4 {
        let mut p = Mat4::perspective_rh(
            self.fov_y_degrees.to_radians(),
            self.aspect,
            self.near,
            self.far,
        );
        p.y_axis.y = -p.y_axis.y;
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::Vec4;

    #[test]
    fn view_moves_world_opposite_to_camera() {
        let mut cam = PerspectiveCamera::default();
        cam.position = [-3.0, 0.0, 30.0];

        let p = cam.view() * Vec4::new(-3.0, 0.0, 20.0, 1.0);
        assert_relative_eq!(p.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(p.z, -10.0, epsilon = 1e-5);
    }

    #[test]
    fn point_in_front_projects_inside_depth_range() {
        let cam = PerspectiveCamera {
            position: [0.0, 0.0, 10.0],
            ..PerspectiveCamera::default()
        };

        let clip = cam.proj() * cam.view() * Vec4::new(0.0, 1.0, 0.0, 1.0);
        let ndc = clip / clip.w;
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
        // Vulkan NDC: world "up" ends up at negative y.
        assert!(ndc.y < 0.0);
    }

    #[test]
    fn aspect_ignores_degenerate_sizes() {
        let mut cam = PerspectiveCamera::default();
        cam.set_aspect(1600, 800);
        assert_eq!(cam.aspect, 2.0);
        cam.set_aspect(1600, 0);
        assert_eq!(cam.aspect, 2.0);
    }
}
