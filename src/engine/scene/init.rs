//! Builds the stock scene: torus, star field, lights, background, avatar cube and moon.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::engine::camera::PerspectiveCamera;
use crate::engine::config::SceneConfig;
use crate::engine::context::{AnimatedNodes, SceneContext};
use crate::engine::graphics::RenderAssets;
use crate::engine::graphics::mesh::MeshFactory;
use crate::engine::graphics::primitives::{Material, rgb_hex};
use crate::engine::scene::{Node, SceneGraph};

const WHITE: u32 = 0xffffff;
const TORUS_COLOR: u32 = 0xff6347;

/// RNG for the star field: fixed when the config carries a seed.
pub fn star_rng(config: &SceneConfig) -> StdRng {
    match config.stars.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Uniform in `[-spread / 2, spread / 2]`.
fn rand_spread(rng: &mut impl Rng, spread: f32) -> f32 {
    let half = spread * 0.5;
    if half <= 0.0 {
        return 0.0;
    }
    rng.gen_range(-half..=half)
}

pub fn build_scene(config: &SceneConfig, rng: &mut impl Rng) -> SceneContext {
    let mut graph = SceneGraph::new();
    let mut assets = RenderAssets::new();

    let camera = PerspectiveCamera::from_config(&config.camera, config.window.aspect());

    let torus_mesh = assets.register_mesh(MeshFactory::torus(10.0, 3.0, 16, 100));
    let torus = graph.add(Node::mesh(
        "torus",
        torus_mesh,
        Material::standard(rgb_hex(TORUS_COLOR)),
    ));

    graph.add(Node::point_light("point_light", rgb_hex(WHITE), 1.0).with_position(5.0, 5.0, 5.0));
    graph.add(Node::ambient_light("ambient_light", rgb_hex(WHITE), 1.0));

    let star_mesh = assets.register_mesh(MeshFactory::sphere(config.stars.radius, 24, 24));
    for i in 0..config.stars.count {
        let x = rand_spread(rng, config.stars.spread);
        let y = rand_spread(rng, config.stars.spread);
        let z = rand_spread(rng, config.stars.spread);
        graph.add(
            Node::mesh(
                format!("star_{i}"),
                star_mesh,
                Material::standard(rgb_hex(WHITE)),
            )
            .with_position(x, y, z),
        );
    }

    graph.background = Some(config.assets.background.clone());

    let avatar_mesh = assets.register_mesh(MeshFactory::cuboid(3.0, 3.0, 3.0));
    let avatar = graph.add(
        Node::mesh(
            "avatar",
            avatar_mesh,
            Material::basic(rgb_hex(WHITE)).with_map(config.assets.avatar.clone()),
        )
        .with_position(2.0, 0.0, -5.0),
    );

    let moon_mesh = assets.register_mesh(MeshFactory::sphere(3.0, 32, 32));
    let moon = graph.add(
        Node::mesh(
            "moon",
            moon_mesh,
            Material::standard(rgb_hex(WHITE))
                .with_map(config.assets.moon.clone())
                .with_normal_map(config.assets.moon_normal.clone()),
        )
        .with_position(-10.0, 0.0, 30.0),
    );

    log::info!(
        "scene built: {} nodes, {} meshes, {} stars",
        graph.len(),
        assets.mesh_count(),
        config.stars.count
    );

    SceneContext {
        graph,
        camera,
        assets,
        nodes: AnimatedNodes {
            torus,
            avatar,
            moon,
        },
        frame: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::graphics::primitives::Shading;
    use crate::engine::scene::NodeKind;

    fn seeded(seed: u64) -> SceneConfig {
        let mut c = SceneConfig::default();
        c.stars.seed = Some(seed);
        c
    }

    fn star_positions(ctx: &SceneContext) -> Vec<[f32; 3]> {
        ctx.graph
            .iter()
            .filter(|(_, n)| n.name.starts_with("star_"))
            .map(|(_, n)| n.transform.position)
            .collect()
    }

    #[test]
    fn stock_layout() {
        let config = seeded(1);
        let ctx = build_scene(&config, &mut star_rng(&config));

        // torus + 2 lights + 200 stars + avatar + moon
        assert_eq!(ctx.graph.len(), 205);
        assert_eq!(ctx.assets.mesh_count(), 4);
        assert_eq!(ctx.graph.background.as_deref(), Some("assets/space.jpg"));

        assert_eq!(ctx.torus().position, [0.0, 0.0, 0.0]);
        assert_eq!(ctx.avatar().position, [2.0, 0.0, -5.0]);
        assert_eq!(ctx.moon().position, [-10.0, 0.0, 30.0]);
        assert_eq!(ctx.camera.position, [-3.0, 0.0, 30.0]);
        assert_eq!(ctx.camera.fov_y_degrees, 75.0);

        let point = ctx.graph.find_by_name("point_light").unwrap();
        assert_eq!(ctx.graph.get(point).unwrap().transform.position, [5.0, 5.0, 5.0]);
    }

    #[test]
    fn materials_match_objects() {
        let config = seeded(1);
        let ctx = build_scene(&config, &mut star_rng(&config));

        let NodeKind::Mesh { material, .. } = &ctx.graph.get(ctx.nodes.avatar).unwrap().kind else {
            panic!("avatar is not a mesh");
        };
        assert_eq!(material.shading, Shading::Basic);
        assert_eq!(material.map.as_deref(), Some("assets/jeff.png"));

        let NodeKind::Mesh { material, .. } = &ctx.graph.get(ctx.nodes.moon).unwrap().kind else {
            panic!("moon is not a mesh");
        };
        assert_eq!(material.shading, Shading::Standard);
        assert_eq!(material.normal_map.as_deref(), Some("assets/normal.jpg"));

        let NodeKind::Mesh { material, .. } = &ctx.graph.get(ctx.nodes.torus).unwrap().kind else {
            panic!("torus is not a mesh");
        };
        assert_eq!(material.color, rgb_hex(TORUS_COLOR));
    }

    #[test]
    fn stars_stay_inside_spread_and_share_a_mesh() {
        let config = seeded(42);
        let ctx = build_scene(&config, &mut star_rng(&config));

        let stars = star_positions(&ctx);
        assert_eq!(stars.len(), 200);
        assert!(stars.iter().flatten().all(|c| (-50.0..=50.0).contains(c)));

        let meshes: std::collections::HashSet<_> = ctx
            .graph
            .iter()
            .filter(|(_, n)| n.name.starts_with("star_"))
            .filter_map(|(_, n)| match n.kind {
                NodeKind::Mesh { mesh, .. } => Some(mesh),
                _ => None,
            })
            .collect();
        assert_eq!(meshes.len(), 1);
    }

    #[test]
    fn same_seed_same_sky() {
        let config = seeded(9);
        let a = build_scene(&config, &mut star_rng(&config));
        let b = build_scene(&config, &mut star_rng(&config));
        assert_eq!(star_positions(&a), star_positions(&b));

        let other = seeded(10);
        let c = build_scene(&other, &mut star_rng(&other));
        assert_ne!(star_positions(&a), star_positions(&c));
    }

    #[test]
    fn star_count_follows_config() {
        let mut config = seeded(3);
        config.stars.count = 0;
        let ctx = build_scene(&config, &mut star_rng(&config));
        assert!(star_positions(&ctx).is_empty());
        assert_eq!(ctx.graph.len(), 5);
    }
}
