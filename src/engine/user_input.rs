//! Scroll input (winit -> page offset).
//!
//! The window has no document to scroll, so `ScrollInput` keeps a virtual page position and
//! reports it the way a page's bounding-rect top reads: 0 at the top, negative once
//! scrolled down, bounded by how tall the page is.

use winit::event::{ElementState, KeyEvent, MouseScrollDelta, WindowEvent};
use winit::keyboard::{Key, NamedKey};

use crate::engine::config::ScrollConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct ScrollInput {
    offset: f32,
    max_scroll_px: f32,
    line_height_px: f32,
    /// One page step (PageUp/PageDown/Space); tracks the window height.
    page_step_px: f32,
}

impl ScrollInput {
    pub fn new(config: &ScrollConfig, viewport_height_px: f32) -> Self {
        Self {
            offset: 0.0,
            max_scroll_px: config.max_scroll_px.max(0.0),
            line_height_px: config.line_height_px,
            page_step_px: viewport_height_px,
        }
    }

    /// Current page top, in `[-max_scroll_px, 0]`.
    pub fn offset(&self) -> f32 {
        self.offset
    }

    pub fn set_viewport_height(&mut self, height_px: f32) {
        self.page_step_px = height_px;
    }

    /// Move the page by `delta_px` (positive scrolls toward the top).
    ///
    /// Returns the new offset only if it moved; a page already pinned at either end does not
    /// produce a scroll event.
    pub fn scroll_by(&mut self, delta_px: f32) -> Option<f32> {
        self.scroll_to(self.offset + delta_px)
    }

    pub fn scroll_to(&mut self, offset: f32) -> Option<f32> {
        if !offset.is_finite() {
            return None;
        }

        let clamped = offset.clamp(-self.max_scroll_px, 0.0);
        if clamped == self.offset {
            return None;
        }

        self.offset = clamped;
        Some(clamped)
    }

    /// Feed a winit event. Returns the new offset when the event scrolled the page.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> Option<f32> {
        match event {
            WindowEvent::MouseWheel { delta, .. } => self.scroll_by(self.wheel_delta_px(delta)),

            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key,
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => self.handle_key(logical_key),

            _ => None,
        }
    }

    /// Wheel motion in pixels. Line deltas are multiplied by the line height; y is positive
    /// for a wheel rolled away from the user.
    fn wheel_delta_px(&self, delta: &MouseScrollDelta) -> f32 {
        match delta {
            MouseScrollDelta::LineDelta(_, y) => *y * self.line_height_px,
            MouseScrollDelta::PixelDelta(pos) => pos.y as f32,
        }
    }

    fn handle_key(&mut self, key: &Key) -> Option<f32> {
        let Key::Named(named) = key else {
            return None;
        };

        match named {
            NamedKey::ArrowDown => self.scroll_by(-self.line_height_px),
            NamedKey::ArrowUp => self.scroll_by(self.line_height_px),
            NamedKey::PageDown | NamedKey::Space => self.scroll_by(-self.page_step_px),
            NamedKey::PageUp => self.scroll_by(self.page_step_px),
            NamedKey::Home => self.scroll_to(0.0),
            NamedKey::End => self.scroll_to(-self.max_scroll_px),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalPosition;

    fn input() -> ScrollInput {
        ScrollInput::new(
            &ScrollConfig {
                line_height_px: 40.0,
                max_scroll_px: 1000.0,
            },
            600.0,
        )
    }

    #[test]
    fn starts_at_top() {
        assert_eq!(input().offset(), 0.0);
    }

    #[test]
    fn scrolling_down_decreases_offset() {
        let mut s = input();
        assert_eq!(s.scroll_by(-120.0), Some(-120.0));
        assert_eq!(s.scroll_by(-3.0 * 40.0), Some(-240.0));
        assert_eq!(s.scroll_by(40.0), Some(-200.0));
    }

    #[test]
    fn clamps_to_page_bounds_and_reports_no_motion_at_edges() {
        let mut s = input();
        assert_eq!(s.scroll_by(50.0), None);
        assert_eq!(s.offset(), 0.0);

        assert_eq!(s.scroll_by(-5000.0), Some(-1000.0));
        assert_eq!(s.scroll_by(-10.0), None);
        assert_eq!(s.offset(), -1000.0);
    }

    #[test]
    fn non_finite_deltas_are_ignored() {
        let mut s = input();
        assert_eq!(s.scroll_by(f32::NAN), None);
        assert_eq!(s.scroll_to(f32::NEG_INFINITY), None);
        assert_eq!(s.offset(), 0.0);
    }

    #[test]
    fn wheel_lines_and_pixels_scroll_the_page() {
        let mut s = input();
        let line_down = MouseScrollDelta::LineDelta(0.0, -1.0);
        assert_eq!(s.wheel_delta_px(&line_down), -40.0);
        assert_eq!(s.scroll_by(s.wheel_delta_px(&line_down)), Some(-40.0));

        let mut s = input();
        let pixels_down = MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, -120.0));
        assert_eq!(s.scroll_by(s.wheel_delta_px(&pixels_down)), Some(-120.0));
    }

    #[test]
    fn wheel_up_at_top_is_not_a_scroll() {
        let mut s = input();
        let line_up = MouseScrollDelta::LineDelta(0.0, 2.0);
        assert_eq!(s.wheel_delta_px(&line_up), 80.0);
        assert_eq!(s.scroll_by(s.wheel_delta_px(&line_up)), None);
        assert_eq!(s.offset(), 0.0);
    }

    #[test]
    fn keys_step_by_line_page_and_jump_to_ends() {
        let mut s = input();
        assert_eq!(s.handle_key(&Key::Named(NamedKey::ArrowDown)), Some(-40.0));
        assert_eq!(s.handle_key(&Key::Named(NamedKey::PageDown)), Some(-640.0));
        assert_eq!(s.handle_key(&Key::Named(NamedKey::ArrowUp)), Some(-600.0));
        assert_eq!(s.handle_key(&Key::Named(NamedKey::End)), Some(-1000.0));
        assert_eq!(s.handle_key(&Key::Named(NamedKey::End)), None);
        assert_eq!(s.handle_key(&Key::Named(NamedKey::Home)), Some(0.0));
        assert_eq!(s.handle_key(&Key::Character("j".into())), None);
    }

    #[test]
    fn page_step_follows_viewport() {
        let mut s = input();
        s.set_viewport_height(250.0);
        assert_eq!(s.handle_key(&Key::Named(NamedKey::Space)), Some(-250.0));
    }
}
