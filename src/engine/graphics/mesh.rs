//! CPU-side procedural mesh generation.
//!
//! These meshes are authoring / staging data. The renderer uploads them into GPU
//! vertex/index buffers and hands back a `MeshHandle`.

use std::f32::consts::{PI, TAU};

use glam::Vec3;
use vulkano::buffer::BufferContents;
use vulkano::pipeline::graphics::vertex_input::Vertex;

/// Vertex format shared by every scene mesh.
///
/// - `pos`: object-space position
/// - `normal`: object-space unit normal
/// - `uv`: 0..1, v pointing up the image (flipped when sampling)
#[derive(BufferContents, Vertex, Debug, Clone, Copy, Default, PartialEq)]
#[repr(C)]
pub struct CpuVertex {
    #[format(R32G32B32_SFLOAT)]
    pub pos: [f32; 3],
    #[format(R32G32B32_SFLOAT)]
    pub normal: [f32; 3],
    #[format(R32G32_SFLOAT)]
    pub uv: [f32; 2],
}

/// CPU-side mesh data: an indexed triangle list.
#[derive(Debug, Clone)]
pub struct CpuMesh {
    pub vertices: Vec<CpuVertex>,
    pub indices_u32: Vec<u32>,
}

impl CpuMesh {
    pub fn new(vertices: Vec<CpuVertex>, indices_u32: Vec<u32>) -> Self {
        Self {
            vertices,
            indices_u32,
        }
    }

    pub fn index_count(&self) -> u32 {
        self.indices_u32.len() as u32
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }
}

/// Procedural mesh constructors.
///
/// Triangles are counter-clockwise when seen from outside the shape.
pub struct MeshFactory;

impl MeshFactory {
    /// Torus in the XY plane around the Z axis.
    ///
    /// `radius` is the distance from the center to the middle of the tube.
    pub fn torus(radius: f32, tube: f32, radial_segments: u32, tubular_segments: u32) -> CpuMesh {
        let radial = radial_segments.max(2);
        let tubular = tubular_segments.max(3);

        let mut vertices = Vec::with_capacity(((radial + 1) * (tubular + 1)) as usize);
        for j in 0..=radial {
            let v = j as f32 / radial as f32 * TAU;
            for i in 0..=tubular {
                let u = i as f32 / tubular as f32 * TAU;

                let pos = Vec3::new(
                    (radius + tube * v.cos()) * u.cos(),
                    (radius + tube * v.cos()) * u.sin(),
                    tube * v.sin(),
                );
                let center = Vec3::new(radius * u.cos(), radius * u.sin(), 0.0);
                let normal = (pos - center).normalize_or_zero();

                vertices.push(CpuVertex {
                    pos: pos.to_array(),
                    normal: normal.to_array(),
                    uv: [i as f32 / tubular as f32, j as f32 / radial as f32],
                });
            }
        }

        let row = tubular + 1;
        let mut indices = Vec::with_capacity((radial * tubular * 6) as usize);
        for j in 1..=radial {
            for i in 1..=tubular {
                let a = row * j + i - 1;
                let b = row * (j - 1) + i - 1;
                let c = row * (j - 1) + i;
                let d = row * j + i;
                indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }

        CpuMesh::new(vertices, indices)
    }

    /// UV sphere centered at the origin.
    ///
    /// The pole rows are degenerate rings; their zero-area triangles are skipped.
    pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> CpuMesh {
        let width = width_segments.max(3);
        let height = height_segments.max(2);

        let mut vertices = Vec::with_capacity(((width + 1) * (height + 1)) as usize);
        for iy in 0..=height {
            let v = iy as f32 / height as f32;
            for ix in 0..=width {
                let u = ix as f32 / width as f32;

                let dir = Vec3::new(
                    -(u * TAU).cos() * (v * PI).sin(),
                    (v * PI).cos(),
                    (u * TAU).sin() * (v * PI).sin(),
                );

                vertices.push(CpuVertex {
                    pos: (dir * radius).to_array(),
                    normal: dir.normalize_or_zero().to_array(),
                    uv: [u, 1.0 - v],
                });
            }
        }

        let row = width + 1;
        let mut indices = Vec::new();
        for iy in 0..height {
            for ix in 0..width {
                let a = iy * row + ix + 1;
                let b = iy * row + ix;
                let c = (iy + 1) * row + ix;
                let d = (iy + 1) * row + ix + 1;

                if iy != 0 {
                    indices.extend_from_slice(&[a, b, d]);
                }
                if iy != height - 1 {
                    indices.extend_from_slice(&[b, c, d]);
                }
            }
        }

        CpuMesh::new(vertices, indices)
    }

    /// Axis-aligned box centered at the origin, one quad per face so each face gets its
    /// own normal and a full 0..1 UV square.
    pub fn cuboid(width: f32, height: f32, depth: f32) -> CpuMesh {
        let half = Vec3::new(width, height, depth) * 0.5;

        // (normal, u axis); v = normal x u, so u x v == normal.
        let faces = [
            (Vec3::X, Vec3::NEG_Z),
            (Vec3::NEG_X, Vec3::Z),
            (Vec3::Y, Vec3::X),
            (Vec3::NEG_Y, Vec3::X),
            (Vec3::Z, Vec3::X),
            (Vec3::NEG_Z, Vec3::NEG_X),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);

        for (n, u) in faces {
            let v = n.cross(u);
            let base = vertices.len() as u32;

            for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                let pos = (n + u * su + v * sv) * half;
                vertices.push(CpuVertex {
                    pos: pos.to_array(),
                    normal: n.to_array(),
                    uv: [(su + 1.0) * 0.5, (sv + 1.0) * 0.5],
                });
            }

            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        CpuMesh::new(vertices, indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_indices_in_range(mesh: &CpuMesh) {
        let n = mesh.vertex_count();
        assert!(mesh.indices_u32.iter().all(|&i| i < n));
        assert_eq!(mesh.indices_u32.len() % 3, 0);
    }

    fn face_normal(mesh: &CpuMesh, tri: usize) -> Vec3 {
        let idx = &mesh.indices_u32[tri * 3..tri * 3 + 3];
        let p = |i: u32| Vec3::from(mesh.vertices[i as usize].pos);
        (p(idx[1]) - p(idx[0])).cross(p(idx[2]) - p(idx[0]))
    }

    #[test]
    fn torus_counts_and_extent() {
        let m = MeshFactory::torus(10.0, 3.0, 16, 100);
        assert_eq!(m.vertex_count(), 17 * 101);
        assert_eq!(m.index_count(), 16 * 100 * 6);
        assert_indices_in_range(&m);

        for v in &m.vertices {
            let p = Vec3::from(v.pos);
            let ring = (p.x * p.x + p.y * p.y).sqrt();
            assert!(ring >= 7.0 - 1e-3 && ring <= 13.0 + 1e-3);
            assert!(p.z.abs() <= 3.0 + 1e-4);
            assert_relative_eq!(Vec3::from(v.normal).length(), 1.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn sphere_counts_radius_and_winding() {
        let m = MeshFactory::sphere(3.0, 32, 32);
        assert_eq!(m.vertex_count(), 33 * 33);
        // Pole rows contribute one triangle per segment instead of two.
        assert_eq!(m.index_count(), (32 * 32 * 2 - 2 * 32) * 3);
        assert_indices_in_range(&m);

        for v in &m.vertices {
            assert_relative_eq!(Vec3::from(v.pos).length(), 3.0, epsilon = 1e-4);
        }

        // Outward-facing triangles.
        for tri in 0..(m.index_count() as usize / 3) {
            let idx = m.indices_u32[tri * 3] as usize;
            let outward = Vec3::from(m.vertices[idx].pos);
            assert!(face_normal(&m, tri).dot(outward) > 0.0);
        }
    }

    #[test]
    fn cuboid_faces_point_outward() {
        let m = MeshFactory::cuboid(3.0, 3.0, 3.0);
        assert_eq!(m.vertex_count(), 24);
        assert_eq!(m.index_count(), 36);
        assert_indices_in_range(&m);

        for v in &m.vertices {
            for c in v.pos {
                assert_relative_eq!(c.abs(), 1.5, epsilon = 1e-6);
            }
        }

        for tri in 0..12 {
            let n = Vec3::from(m.vertices[m.indices_u32[tri * 3] as usize].normal);
            assert!(face_normal(&m, tri).dot(n) > 0.0);
        }
    }
}
