//! Retained scene graph.
//!
//! A flat slotmap of nodes. The scene never nests objects, so there is no parent/child
//! topology; draw order is insertion order.

pub mod init;

use serde::Serialize;
use slotmap::{SlotMap, new_key_type};

use crate::engine::graphics::primitives::{CpuMeshHandle, Material, Rgb, Transform};

new_key_type! {
    pub struct NodeKey;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum NodeKind {
    Mesh {
        mesh: CpuMeshHandle,
        material: Material,
    },
    /// Omnidirectional light at the node's position.
    PointLight { color: Rgb, intensity: f32 },
    /// Uniform light on every surface.
    AmbientLight { color: Rgb, intensity: f32 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub name: String,
    pub transform: Transform,
    pub kind: NodeKind,
}

impl Node {
    pub fn mesh(name: impl Into<String>, mesh: CpuMeshHandle, material: Material) -> Self {
        Self {
            name: name.into(),
            transform: Transform::default(),
            kind: NodeKind::Mesh { mesh, material },
        }
    }

    pub fn point_light(name: impl Into<String>, color: Rgb, intensity: f32) -> Self {
        Self {
            name: name.into(),
            transform: Transform::default(),
            kind: NodeKind::PointLight { color, intensity },
        }
    }

    pub fn ambient_light(name: impl Into<String>, color: Rgb, intensity: f32) -> Self {
        Self {
            name: name.into(),
            transform: Transform::default(),
            kind: NodeKind::AmbientLight { color, intensity },
        }
    }

    pub fn with_position(mut self, x: f32, y: f32, z: f32) -> Self {
        self.transform.position = [x, y, z];
        self
    }
}

#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: SlotMap<NodeKey, Node>,
    order: Vec<NodeKey>,
    /// Texture drawn behind everything, by path.
    pub background: Option<String>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: Node) -> NodeKey {
        let key = self.nodes.insert(node);
        self.order.push(key);
        key
    }

    pub fn get(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(key)
    }

    pub fn transform_mut(&mut self, key: NodeKey) -> Option<&mut Transform> {
        self.nodes.get_mut(key).map(|n| &mut n.transform)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Nodes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeKey, &Node)> {
        self.order
            .iter()
            .filter_map(|&k| self.nodes.get(k).map(|n| (k, n)))
    }

    #[cfg(test)]
    pub fn find_by_name(&self, name: &str) -> Option<NodeKey> {
        self.iter().find(|(_, n)| n.name == name).map(|(k, _)| k)
    }
}
