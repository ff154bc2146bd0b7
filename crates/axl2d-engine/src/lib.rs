//! axl2d engine crate.
//!
//! A small 2D engine: textured and solid quads positioned in logical pixels,
//! a viewport broadcast that keeps their geometry in sync with the window,
//! scenes with an explicit lifecycle, and a wgpu backend hosted in a winit
//! window.

pub mod broadcast;
pub mod coords;
pub mod core;
pub mod device;
pub mod drawable;
pub mod error;
pub mod logging;
pub mod paint;
pub mod render;
pub mod scene;
pub mod time;
pub mod transform;
pub mod window;

pub use crate::coords::{Rect, Vec2, Viewport};
pub use crate::core::{Engine, SceneCtx, WindowRequest};
pub use crate::drawable::{Drawable, DrawableKind, PixelFeed, QuadDesc, SpriteManager};
pub use crate::error::{ConfigError, EngineError, LifecycleError, RenderError};
pub use crate::paint::Color;
pub use crate::render::{FilterMode, RenderContext, TextureOptions, WrapMode};
pub use crate::scene::{Scene, SceneId, SceneRegistry, SceneState};
pub use crate::transform::Transform2D;
pub use crate::window::{Host, HostConfig, StopHandle};
