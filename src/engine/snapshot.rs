//! Headless run: startup, one scroll, N frames, then dump the camera and node transforms.

use std::io::Write;

use serde::Serialize;

use crate::engine::animation_loop::{AnimationLoop, ManualScheduler};
use crate::engine::camera::PerspectiveCamera;
use crate::engine::config::ScrollConfig;
use crate::engine::context::SceneContext;
use crate::engine::graphics::primitives::Transform;
use crate::engine::user_input::ScrollInput;
use crate::engine::EngineResult;

#[derive(Debug, Serialize)]
pub struct NodeSnapshot {
    pub name: String,
    pub transform: Transform,
}

#[derive(Debug, Serialize)]
pub struct Snapshot {
    pub scroll: f32,
    pub frames: u64,
    pub camera: PerspectiveCamera,
    pub torus: Transform,
    pub avatar: Transform,
    pub moon: Transform,
    pub nodes: Vec<NodeSnapshot>,
}

impl Snapshot {
    pub fn capture(ctx: &SceneContext, scroll: f32) -> Self {
        Self {
            scroll,
            frames: ctx.frame,
            camera: ctx.camera,
            torus: *ctx.torus(),
            avatar: *ctx.avatar(),
            moon: *ctx.moon(),
            nodes: ctx
                .graph
                .iter()
                .map(|(_, n)| NodeSnapshot {
                    name: n.name.clone(),
                    transform: n.transform,
                })
                .collect(),
        }
    }
}

/// Run the startup sequence, scroll once to `scroll` (if it differs from the top) and advance
/// `frames` refreshes.
///
/// `scroll` is clamped to the page like window input is, so the recorded offset is one a user
/// could reach.
pub fn run(ctx: &mut SceneContext, config: &ScrollConfig, scroll: f32, frames: u32) -> Snapshot {
    let mut input = ScrollInput::new(config, 0.0);
    let mut scheduler = ManualScheduler::new();
    AnimationLoop::start(ctx, &mut scheduler, input.offset());

    if let Some(offset) = input.scroll_to(scroll) {
        crate::engine::controller::on_scroll(ctx, offset);
    } else if scroll != input.offset() {
        log::warn!("scroll {scroll} is outside the page, staying at {}", input.offset());
    }

    scheduler.advance_n(ctx, frames);
    log::debug!("snapshot taken after {} frames", scheduler.frames());
    Snapshot::capture(ctx, input.offset())
}

pub fn write_json(snapshot: &Snapshot, out: &mut dyn Write) -> EngineResult<()> {
    serde_json::to_writer_pretty(&mut *out, snapshot)?;
    writeln!(out)?;
    Ok(())
}
