use crate::engine::camera::PerspectiveCamera;
use crate::engine::graphics::RenderAssets;
use crate::engine::graphics::primitives::Transform;
use crate::engine::scene::{NodeKey, SceneGraph};

/// Keys of the nodes the controller animates.
#[derive(Debug, Clone, Copy)]
pub struct AnimatedNodes {
    pub torus: NodeKey,
    pub avatar: NodeKey,
    pub moon: NodeKey,
}

/// Everything the scroll and frame callbacks mutate.
///
/// Owned by the host and lent `&mut` to each callback; callbacks never run concurrently.
#[derive(Debug)]
pub struct SceneContext {
    pub graph: SceneGraph,
    pub camera: PerspectiveCamera,
    pub assets: RenderAssets,
    pub nodes: AnimatedNodes,
    /// Number of `animate` calls so far.
    pub frame: u64,
}

impl SceneContext {
    pub fn torus(&self) -> &Transform {
        self.transform(self.nodes.torus)
    }

    pub fn avatar(&self) -> &Transform {
        self.transform(self.nodes.avatar)
    }

    pub fn moon(&self) -> &Transform {
        self.transform(self.nodes.moon)
    }

    fn transform(&self, key: NodeKey) -> &Transform {
        // Animated nodes are added at build time and never removed.
        &self.graph.get(key).expect("animated node missing").transform
    }

    /// Mutable transform of an animated node. Keys come from `nodes`, so they are always live.
    pub fn transform_mut(&mut self, key: NodeKey) -> &mut Transform {
        self.graph
            .transform_mut(key)
            .expect("animated node missing")
    }
}
