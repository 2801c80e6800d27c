use std::sync::Arc;

use crate::engine::animation_loop::{AnimationLoop, FrameCallback, FrameScheduler};
use crate::engine::config::{SceneConfig, WindowConfig};
use crate::engine::context::SceneContext;
use crate::engine::controller;
use crate::engine::graphics::{Renderer, VisualWorld};
use crate::engine::user_input::ScrollInput;
use crate::engine::{EngineError, EngineResult};

use winit::application::ApplicationHandler;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowAttributes, WindowId};

/// winit wrapper (ApplicationHandler style).
pub struct Windowing;

impl Windowing {
    /// Open the window and run until it is closed.
    ///
    /// The startup scroll pass and first frame run here, before the event loop, so the first
    /// redraw already has work queued.
    pub fn run_app(
        mut ctx: SceneContext,
        renderer: Renderer,
        config: &SceneConfig,
    ) -> EngineResult<()> {
        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Wait);

        let scroll = ScrollInput::new(&config.scroll, config.window.height as f32);
        let mut scheduler = WindowScheduler::default();
        AnimationLoop::start(&mut ctx, &mut scheduler, scroll.offset());
        let visual_world = VisualWorld::from_scene(&ctx.graph, &ctx.camera);

        let mut app = App {
            window_config: config.window.clone(),
            window: None,
            ctx,
            renderer,
            scroll,
            scheduler,
            visual_world,
            error: None,
        };

        event_loop.run_app(&mut app)?;

        match app.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Frame scheduler backed by winit redraw requests.
///
/// Callbacks queue up until the next `RedrawRequested`; each request also asks the window for
/// a redraw so the queue gets drained.
#[derive(Default)]
pub struct WindowScheduler {
    window: Option<Arc<Window>>,
    pending: Vec<FrameCallback>,
}

impl WindowScheduler {
    fn attach(&mut self, window: Arc<Window>) {
        if !self.pending.is_empty() {
            window.request_redraw();
        }
        self.window = Some(window);
    }

    /// Take the callbacks due this frame. Anything they request lands in the next one.
    fn take_due(&mut self) -> Vec<FrameCallback> {
        std::mem::take(&mut self.pending)
    }
}

impl FrameScheduler for WindowScheduler {
    fn request_next_frame(&mut self, callback: FrameCallback) {
        self.pending.push(callback);
        if let Some(w) = &self.window {
            w.request_redraw();
        }
    }
}

struct App {
    window_config: WindowConfig,
    window: Option<Arc<Window>>,
    ctx: SceneContext,
    renderer: Renderer,
    scroll: ScrollInput,
    scheduler: WindowScheduler,
    visual_world: VisualWorld,
    /// First fatal error; reported by `run_app` once the loop exits.
    error: Option<EngineError>,
}

impl App {
    fn fail(&mut self, event_loop: &ActiveEventLoop, e: EngineError) {
        log::error!("{e}");
        if self.error.is_none() {
            self.error = Some(e);
        }
        event_loop.exit();
    }

    fn create_window(&mut self, event_loop: &ActiveEventLoop) -> EngineResult<()> {
        let attrs: WindowAttributes = Window::default_attributes()
            .with_title(self.window_config.title.clone())
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.window_config.width as f64,
                self.window_config.height as f64,
            ));

        let window = Arc::new(event_loop.create_window(attrs)?);

        self.renderer
            .init_for_window(&window)
            .map_err(EngineError::renderer)?;

        let size = window.inner_size();
        self.ctx.camera.set_aspect(size.width, size.height);
        self.scroll.set_viewport_height(size.height as f32);

        log::info!(
            "window created ({}x{}), {} scene nodes",
            size.width,
            size.height,
            self.ctx.graph.len()
        );

        self.scheduler.attach(window.clone());
        self.window = Some(window);
        Ok(())
    }

    fn redraw(&mut self) -> EngineResult<()> {
        for callback in self.scheduler.take_due() {
            callback(&mut self.ctx, &mut self.scheduler);
        }

        self.visual_world.sync(&self.ctx.graph, &self.ctx.camera);

        if let Some(w) = &self.window {
            w.pre_present_notify();
        }

        self.renderer
            .render(&self.visual_world, &mut self.ctx.assets)
            .map_err(EngineError::renderer)
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        if let Err(e) = self.create_window(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),

            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key: Key::Named(NamedKey::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => event_loop.exit(),

            WindowEvent::Resized(size) => {
                self.ctx.camera.set_aspect(size.width, size.height);
                self.scroll.set_viewport_height(size.height as f32);
                self.renderer.resize(size);
                if let Some(w) = &self.window {
                    w.request_redraw();
                }
            }

            WindowEvent::RedrawRequested => {
                if let Err(e) = self.redraw() {
                    self.fail(event_loop, e);
                }
            }

            other => {
                if let Some(offset) = self.scroll.handle_window_event(&other) {
                    log::trace!("scroll offset {offset}");
                    controller::on_scroll(&mut self.ctx, offset);
                    if let Some(w) = &self.window {
                        w.request_redraw();
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::scene::init::build_scene;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn window_scheduler_queues_until_taken() {
        let mut config = SceneConfig::default();
        config.stars.count = 0;
        let mut ctx = build_scene(&config, &mut StdRng::seed_from_u64(3));

        let mut scheduler = WindowScheduler::default();
        AnimationLoop::start(&mut ctx, &mut scheduler, 0.0);
        assert_eq!(scheduler.pending.len(), 1);

        let due = scheduler.take_due();
        assert!(scheduler.pending.is_empty());
        for callback in due {
            callback(&mut ctx, &mut scheduler);
        }

        // The frame callback re-queued itself once.
        assert_eq!(scheduler.pending.len(), 1);
        assert_eq!(ctx.frame, 2);
    }
}
