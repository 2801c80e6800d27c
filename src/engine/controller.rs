//! Scroll and per-frame transforms.
//!
//! Both callbacks only add to or overwrite transform values; neither reads what the other
//! wrote, so their relative order does not matter.

use crate::engine::animation_loop::FrameScheduler;
use crate::engine::context::SceneContext;

/// Camera Z per pixel of scroll offset.
pub const CAMERA_Z_PER_PX: f32 = -0.01;
/// Camera X per pixel of scroll offset.
pub const CAMERA_X_PER_PX: f32 = -0.0002;
/// Camera yaw per pixel of scroll offset.
pub const CAMERA_YAW_PER_PX: f32 = -0.0002;

/// Moon spin added per scroll event.
pub const MOON_SCROLL_SPIN: [f32; 3] = [0.05, 0.075, 0.05];
/// Avatar spin added per scroll event (Y and Z).
pub const AVATAR_SCROLL_SPIN: f32 = 0.01;

/// Torus spin added per frame.
pub const TORUS_FRAME_SPIN: [f32; 3] = [0.01, 0.005, 0.01];
/// Moon X spin added per frame.
pub const MOON_FRAME_SPIN_X: f32 = 0.005;

/// Apply a scroll event. `offset` is the page top in pixels (0 at the top, negative below).
///
/// Camera pose is a pure function of `offset`. The moon and avatar spins are increments,
/// so they accumulate per event regardless of direction: scrolling down and back up leaves
/// them turned further, not restored.
pub fn on_scroll(ctx: &mut SceneContext, offset: f32) {
    let [mx, my, mz] = MOON_SCROLL_SPIN;
    let moon = ctx.nodes.moon;
    ctx.transform_mut(moon).rotate_by(mx, my, mz);

    let avatar = ctx.nodes.avatar;
    ctx.transform_mut(avatar)
        .rotate_by(0.0, AVATAR_SCROLL_SPIN, AVATAR_SCROLL_SPIN);

    ctx.camera.position[2] = offset * CAMERA_Z_PER_PX;
    ctx.camera.position[0] = offset * CAMERA_X_PER_PX;
    ctx.camera.rotation[1] = offset * CAMERA_YAW_PER_PX;
}

/// One animation frame. Requests the next frame first, then advances the spins.
pub fn animate(ctx: &mut SceneContext, scheduler: &mut dyn FrameScheduler) {
    scheduler.request_next_frame(animate);

    let [tx, ty, tz] = TORUS_FRAME_SPIN;
    let torus = ctx.nodes.torus;
    ctx.transform_mut(torus).rotate_by(tx, ty, tz);

    let moon = ctx.nodes.moon;
    ctx.transform_mut(moon).rotate_by(MOON_FRAME_SPIN_X, 0.0, 0.0);

    ctx.frame += 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::animation_loop::ManualScheduler;
    use crate::engine::config::SceneConfig;
    use crate::engine::scene::init::build_scene;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn ctx() -> SceneContext {
        build_scene(&SceneConfig::default(), &mut StdRng::seed_from_u64(0))
    }

    #[test]
    fn camera_follows_scroll_offset() {
        let mut ctx = ctx();

        on_scroll(&mut ctx, 1000.0);
        assert_relative_eq!(ctx.camera.position[2], -10.0, epsilon = 1e-5);
        assert_relative_eq!(ctx.camera.position[0], -0.2, epsilon = 1e-6);
        assert_relative_eq!(ctx.camera.rotation[1], -0.2, epsilon = 1e-6);

        on_scroll(&mut ctx, -2500.0);
        assert_relative_eq!(ctx.camera.position[2], 25.0, epsilon = 1e-4);
        assert_relative_eq!(ctx.camera.position[0], 0.5, epsilon = 1e-6);
        assert_relative_eq!(ctx.camera.rotation[1], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn scroll_leaves_camera_y_and_other_axes_alone() {
        let mut ctx = ctx();
        ctx.camera.position[1] = 4.0;
        ctx.camera.rotation = [0.3, 0.0, 0.7];

        on_scroll(&mut ctx, -300.0);
        assert_eq!(ctx.camera.position[1], 4.0);
        assert_eq!(ctx.camera.rotation[0], 0.3);
        assert_eq!(ctx.camera.rotation[2], 0.7);
    }

    #[test]
    fn scroll_spins_accumulate_independent_of_offset() {
        let mut ctx = ctx();

        on_scroll(&mut ctx, -800.0);
        on_scroll(&mut ctx, 0.0);

        // Down and back up again: camera is restored, the spins are not.
        assert_eq!(ctx.camera.position[2], 0.0);
        let avatar = ctx.avatar().rotation;
        assert_relative_eq!(avatar[0], 0.0);
        assert_relative_eq!(avatar[1], 0.02, epsilon = 1e-6);
        assert_relative_eq!(avatar[2], 0.02, epsilon = 1e-6);

        let moon = ctx.moon().rotation;
        assert_relative_eq!(moon[0], 0.10, epsilon = 1e-6);
        assert_relative_eq!(moon[1], 0.15, epsilon = 1e-6);
        assert_relative_eq!(moon[2], 0.10, epsilon = 1e-6);
    }

    #[test]
    fn scroll_does_not_touch_torus_or_positions() {
        let mut ctx = ctx();
        on_scroll(&mut ctx, -1234.0);

        assert_eq!(ctx.torus().rotation, [0.0; 3]);
        assert_eq!(ctx.moon().position, [-10.0, 0.0, 30.0]);
        assert_eq!(ctx.avatar().position, [2.0, 0.0, -5.0]);
    }

    #[test]
    fn frame_spins_torus_and_moon() {
        let mut ctx = ctx();
        let mut s = ManualScheduler::new();

        animate(&mut ctx, &mut s);
        assert_eq!(ctx.torus().rotation, [0.01, 0.005, 0.01]);
        assert_eq!(ctx.moon().rotation, [0.005, 0.0, 0.0]);
        assert_eq!(ctx.avatar().rotation, [0.0; 3]);
    }

    #[test]
    fn hundred_frames_turn_torus_about_one_radian() {
        let mut ctx = ctx();
        let mut s = ManualScheduler::new();

        animate(&mut ctx, &mut s);
        s.advance_n(&mut ctx, 99);

        assert_eq!(ctx.frame, 100);
        let torus = ctx.torus().rotation;
        assert_relative_eq!(torus[0], 1.0, epsilon = 1e-4);
        assert_relative_eq!(torus[1], 0.5, epsilon = 1e-4);
        assert_relative_eq!(torus[2], 1.0, epsilon = 1e-4);
        assert_relative_eq!(ctx.moon().rotation[0], 0.5, epsilon = 1e-4);
    }

    #[test]
    fn each_frame_schedules_exactly_one_more() {
        let mut ctx = ctx();
        let mut s = ManualScheduler::new();

        animate(&mut ctx, &mut s);
        assert_eq!(s.pending(), 1);

        for expected in 2..=10 {
            assert_eq!(s.advance(&mut ctx), 1);
            assert_eq!(s.pending(), 1);
            assert_eq!(ctx.frame, expected);
        }
    }

    #[test]
    fn scroll_and_frame_spins_on_the_moon_add_up() {
        let mut ctx = ctx();
        let mut s = ManualScheduler::new();

        on_scroll(&mut ctx, 0.0);
        animate(&mut ctx, &mut s);
        assert_relative_eq!(ctx.moon().rotation[0], 0.055, epsilon = 1e-6);
    }
}
