use glam::Mat4;

use crate::engine::camera::PerspectiveCamera;
use crate::engine::graphics::primitives::{CpuMeshHandle, Material, Rgb};
use crate::engine::scene::{NodeKind, SceneGraph};

/// CPU-side per-instance payload (becomes one row of the GPU instance buffer).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Instance {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
}

/// A contiguous run of instances sharing one mesh and one material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawBatch {
    pub mesh: CpuMeshHandle,
    /// Index into `VisualWorld::materials`.
    pub material: usize,
    pub start: u32,
    pub count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position_ws: [f32; 3],
    pub color: Rgb,
    pub intensity: f32,
}

/// Renderer-friendly snapshot of the scene for one frame.
///
/// Rebuilt from the scene graph every frame; instances are laid out in batch order so each
/// `DrawBatch` maps to one instanced draw.
#[derive(Debug, Default)]
pub struct VisualWorld {
    instances: Vec<Instance>,
    batches: Vec<DrawBatch>,
    materials: Vec<Material>,
    point_lights: Vec<PointLight>,
    ambient: Rgb,
    view: Mat4,
    proj: Mat4,
    camera_position: [f32; 3],
    background: Option<String>,
}

impl VisualWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_scene(graph: &SceneGraph, camera: &PerspectiveCamera) -> Self {
        let mut vw = Self::new();
        vw.sync(graph, camera);
        vw
    }

    /// Rebuild from `graph`, reusing allocations.
    pub fn sync(&mut self, graph: &SceneGraph, camera: &PerspectiveCamera) {
        self.instances.clear();
        self.batches.clear();
        self.materials.clear();
        self.point_lights.clear();
        self.ambient = [0.0; 3];

        // (mesh, material index) -> instances, in first-seen order.
        let mut groups: Vec<((CpuMeshHandle, usize), Vec<Instance>)> = Vec::new();

        for (_, node) in graph.iter() {
            match &node.kind {
                NodeKind::Mesh { mesh, material } => {
                    let material_idx = match self.materials.iter().position(|m| m == material) {
                        Some(i) => i,
                        None => {
                            self.materials.push(material.clone());
                            self.materials.len() - 1
                        }
                    };

                    let [r, g, b] = material.color;
                    let instance = Instance {
                        model: node.transform.model().to_cols_array_2d(),
                        color: [r, g, b, 1.0],
                    };

                    let key = (*mesh, material_idx);
                    match groups.iter_mut().find(|(k, _)| *k == key) {
                        Some((_, list)) => list.push(instance),
                        None => groups.push((key, vec![instance])),
                    }
                }
                NodeKind::PointLight { color, intensity } => {
                    self.point_lights.push(PointLight {
                        position_ws: node.transform.position,
                        color: *color,
                        intensity: *intensity,
                    });
                }
                NodeKind::AmbientLight { color, intensity } => {
                    for (acc, c) in self.ambient.iter_mut().zip(color.iter()) {
                        *acc += c * intensity;
                    }
                }
            }
        }

        for ((mesh, material), list) in groups {
            let start = self.instances.len() as u32;
            let count = list.len() as u32;
            self.instances.extend(list);
            self.batches.push(DrawBatch {
                mesh,
                material,
                start,
                count,
            });
        }

        self.view = camera.view();
        self.proj = camera.proj();
        self.camera_position = camera.position;
        self.background = graph.background.clone();
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    pub fn draw_batches(&self) -> &[DrawBatch] {
        &self.batches
    }

    pub fn material(&self, idx: usize) -> Option<&Material> {
        self.materials.get(idx)
    }

    pub fn point_lights(&self) -> &[PointLight] {
        &self.point_lights
    }

    pub fn ambient(&self) -> Rgb {
        self.ambient
    }

    pub fn camera_view(&self) -> [[f32; 4]; 4] {
        self.view.to_cols_array_2d()
    }

    pub fn camera_proj(&self) -> [[f32; 4]; 4] {
        self.proj.to_cols_array_2d()
    }

    pub fn camera_position(&self) -> [f32; 3] {
        self.camera_position
    }

    pub fn background(&self) -> Option<&str> {
        self.background.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::SceneConfig;
    use crate::engine::graphics::primitives::Shading;
    use crate::engine::scene::Node;
    use crate::engine::scene::init::build_scene;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn stock_scene_batches() {
        let ctx = build_scene(&SceneConfig::default(), &mut StdRng::seed_from_u64(1));
        let vw = VisualWorld::from_scene(&ctx.graph, &ctx.camera);

        // torus, stars, avatar, moon
        let batches = vw.draw_batches();
        assert_eq!(batches.len(), 4);
        assert_eq!(vw.instances().len(), 203);

        let counts: Vec<u32> = batches.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![1, 200, 1, 1]);

        // Ranges tile the instance buffer.
        let mut next = 0;
        for b in batches {
            assert_eq!(b.start, next);
            next += b.count;
        }

        let avatar = vw.material(batches[2].material).unwrap();
        assert_eq!(avatar.shading, Shading::Basic);

        assert_eq!(vw.point_lights().len(), 1);
        assert_eq!(vw.point_lights()[0].position_ws, [5.0, 5.0, 5.0]);
        assert_eq!(vw.ambient(), [1.0, 1.0, 1.0]);
        assert_eq!(vw.background(), Some("assets/space.jpg"));
    }

    #[test]
    fn instances_carry_node_transforms_and_camera_matrices() {
        let mut ctx = build_scene(&SceneConfig::default(), &mut StdRng::seed_from_u64(1));
        ctx.camera.position = [0.0, 0.0, 12.0];
        let vw = VisualWorld::from_scene(&ctx.graph, &ctx.camera);

        let moon_batch = vw.draw_batches()[3];
        let moon = vw.instances()[moon_batch.start as usize];
        assert_eq!(moon.model[3], [-10.0, 0.0, 30.0, 1.0]);

        assert_eq!(vw.camera_view(), ctx.camera.view().to_cols_array_2d());
        assert_eq!(vw.camera_proj(), ctx.camera.proj().to_cols_array_2d());
        assert_eq!(vw.camera_position(), [0.0, 0.0, 12.0]);
    }

    #[test]
    fn interleaved_nodes_still_group_by_mesh_and_material() {
        let mut g = SceneGraph::new();
        let red = Material::standard([1.0, 0.0, 0.0]);
        let blue = Material::standard([0.0, 0.0, 1.0]);

        g.add(Node::mesh("a", CpuMeshHandle(0), red.clone()));
        g.add(Node::mesh("b", CpuMeshHandle(1), red.clone()));
        g.add(Node::mesh("c", CpuMeshHandle(0), red.clone()));
        g.add(Node::mesh("d", CpuMeshHandle(0), blue));

        let vw = VisualWorld::from_scene(&g, &PerspectiveCamera::default());
        let b = vw.draw_batches();
        assert_eq!(b.len(), 3);
        assert_eq!((b[0].mesh, b[0].count), (CpuMeshHandle(0), 2));
        assert_eq!((b[1].mesh, b[1].count), (CpuMeshHandle(1), 1));
        assert_eq!(b[0].material, b[1].material);
        assert_ne!(b[0].material, b[2].material);
        assert_eq!(vw.ambient(), [0.0; 3]);
        assert!(vw.background().is_none());
    }
}
