//! Scenes and their lifecycle.
//!
//! Responsibilities:
//! - the `Scene` hook contract (load/update/draw/resize/unload)
//! - explicit registration of scene types, including exactly one default
//! - the state machine that keeps at most one scene active

mod lifecycle;
mod registry;

pub use lifecycle::{SceneLifecycle, SceneState};
pub use registry::{SceneId, SceneRegistry};

use crate::coords::Viewport;
use crate::core::SceneCtx;
use crate::error::RenderError;

/// A screen of the application.
///
/// Per-frame hooks are only called while the scene is active. Every hook may
/// queue a scene switch or exit through `ctx`; the request is applied right
/// after the hook returns.
pub trait Scene: 'static {
    /// Called once when the scene becomes active. Create drawables here.
    fn load(&mut self, ctx: &mut SceneCtx) -> anyhow::Result<()> {
        let _ = ctx;
        Ok(())
    }

    /// Called once per frame before `draw`. `dt` is in seconds.
    fn update(&mut self, ctx: &mut SceneCtx, dt: f64) {
        let _ = (ctx, dt);
    }

    /// Called once per frame between clear and present. Drawables are
    /// composited in the order they are drawn.
    fn draw(&mut self, ctx: &mut SceneCtx, dt: f64, fps: f64) -> Result<(), RenderError> {
        let _ = (ctx, dt, fps);
        Ok(())
    }

    /// Called after the viewport changed; drawables have already adapted.
    fn resize(&mut self, ctx: &mut SceneCtx, viewport: Viewport) {
        let _ = (ctx, viewport);
    }

    /// Called once when the scene is replaced or the host stops.
    fn unload(&mut self, ctx: &mut SceneCtx) -> anyhow::Result<()> {
        let _ = ctx;
        Ok(())
    }
}
