//! Frame scheduling.
//!
//! The per-frame callback reschedules itself through a `FrameScheduler` rather than talking
//! to the window directly, so the same callback runs under winit and under the
//! synchronous `ManualScheduler` used by tests and headless snapshots.

use crate::engine::context::SceneContext;
use crate::engine::controller;

/// A callback run once on the next display refresh.
pub type FrameCallback = fn(&mut SceneContext, &mut dyn FrameScheduler);

pub trait FrameScheduler {
    /// Run `callback` once on the next frame. Each request yields exactly one invocation.
    fn request_next_frame(&mut self, callback: FrameCallback);
}

/// Scheduler that only advances when told to.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    pending: Vec<FrameCallback>,
    frames: u64,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Callbacks waiting for the next `advance`.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Number of `advance` calls so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Simulate one refresh: run the callbacks that were due when this was called.
    ///
    /// Callbacks requested while running land in the next frame. Returns how many ran.
    pub fn advance(&mut self, ctx: &mut SceneContext) -> usize {
        let due = std::mem::take(&mut self.pending);
        let ran = due.len();
        for callback in due {
            callback(ctx, self);
        }
        self.frames += 1;
        ran
    }

    pub fn advance_n(&mut self, ctx: &mut SceneContext, frames: u32) {
        for _ in 0..frames {
            self.advance(ctx);
        }
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_next_frame(&mut self, callback: FrameCallback) {
        self.pending.push(callback);
    }
}

pub struct AnimationLoop;

impl AnimationLoop {
    /// Startup sequence: one scroll pass with the current offset, then the first frame,
    /// which schedules every frame after it.
    pub fn start(ctx: &mut SceneContext, scheduler: &mut dyn FrameScheduler, scroll_offset: f32) {
        controller::on_scroll(ctx, scroll_offset);
        controller::animate(ctx, scheduler);
        log::debug!("animation loop started at scroll offset {scroll_offset}");
    }
}
