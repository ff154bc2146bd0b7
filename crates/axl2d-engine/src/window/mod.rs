//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and Window, wires them to the GPU backend and
//! drives the engine from window events.

mod config;
mod runtime;

pub use config::{HostConfig, LogicalSize};
pub use runtime::{Host, StopHandle};
