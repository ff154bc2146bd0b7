//! Engine core: the scene-facing context and the per-frame driver.
//!
//! `Engine` is platform-agnostic. The winit host in `window` feeds it ticks
//! and resizes; tests drive it directly against a recording backend.

mod ctx;
mod engine;

pub use ctx::{SceneCtx, WindowRequest};
pub use engine::Engine;
