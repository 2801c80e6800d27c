//! Small value types shared by the scene graph and the renderer.

use glam::{Mat4, Quat, Vec3};
use serde::Serialize;

/// Position / Euler rotation / scale.
///
/// Rotation is in radians, applied X then Y then Z (intrinsic), i.e. `R = Rx * Ry * Rz`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Transform {
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            rotation: [0.0; 3],
            scale: [1.0; 3],
        }
    }
}

impl Transform {
    #[cfg(test)]
    pub fn at(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: [x, y, z],
            ..Self::default()
        }
    }

    pub fn rotation_quat(&self) -> Quat {
        let [x, y, z] = self.rotation;
        Quat::from_rotation_x(x) * Quat::from_rotation_y(y) * Quat::from_rotation_z(z)
    }

    /// Column-major `T * R * S`.
    pub fn model(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::from(self.scale),
            self.rotation_quat(),
            Vec3::from(self.position),
        )
    }

    /// Add per-axis deltas to the rotation.
    pub fn rotate_by(&mut self, dx: f32, dy: f32, dz: f32) {
        self.rotation[0] += dx;
        self.rotation[1] += dy;
        self.rotation[2] += dz;
    }
}

/// Linear RGB in 0..1.
pub type Rgb = [f32; 3];

/// Convert a `0xRRGGBB` literal into linear-ish 0..1 floats.
pub fn rgb_hex(hex: u32) -> Rgb {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ]
}

/// CPU-side mesh identity (index into `RenderAssets`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CpuMeshHandle(pub u32);

/// Renderer-owned GPU mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u32);

/// Renderer-owned GPU texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

/// Shading model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Shading {
    /// Lit by the scene's point and ambient lights.
    Standard,
    /// Unlit; outputs the base colour (times the colour map).
    Basic,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Material {
    pub shading: Shading,
    pub color: Rgb,
    /// Colour map, by path.
    pub map: Option<String>,
    /// Tangent-space normal map, by path. Ignored for `Basic`.
    pub normal_map: Option<String>,
}

impl Material {
    pub fn standard(color: Rgb) -> Self {
        Self {
            shading: Shading::Standard,
            color,
            map: None,
            normal_map: None,
        }
    }

    pub fn basic(color: Rgb) -> Self {
        Self {
            shading: Shading::Basic,
            color,
            map: None,
            normal_map: None,
        }
    }

    pub fn with_map(mut self, path: impl Into<String>) -> Self {
        self.map = Some(path.into());
        self
    }

    pub fn with_normal_map(mut self, path: impl Into<String>) -> Self {
        self.normal_map = Some(path.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn hex_colors() {
        assert_eq!(rgb_hex(0xffffff), [1.0, 1.0, 1.0]);
        let tomato = rgb_hex(0xff6347);
        assert_relative_eq!(tomato[0], 1.0);
        assert_relative_eq!(tomato[1], 99.0 / 255.0);
        assert_relative_eq!(tomato[2], 71.0 / 255.0);
    }

    #[test]
    fn model_places_translation_in_last_column() {
        let t = Transform::at(2.0, 0.0, -5.0);
        let m = t.model();
        assert_eq!(m.w_axis.truncate(), Vec3::new(2.0, 0.0, -5.0));
        assert_eq!(m.x_axis.truncate(), Vec3::X);
    }

    #[test]
    fn euler_order_is_x_then_y_then_z() {
        let mut t = Transform::default();
        t.rotate_by(0.3, -0.7, 1.1);

        let expected = Mat4::from_rotation_x(0.3)
            * Mat4::from_rotation_y(-0.7)
            * Mat4::from_rotation_z(1.1);
        let got = t.model();

        for (a, b) in got.to_cols_array().iter().zip(expected.to_cols_array().iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-5);
        }
    }
}
