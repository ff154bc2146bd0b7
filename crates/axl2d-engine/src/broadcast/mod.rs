//! Viewport broadcast.
//!
//! The host reports window resizes to a single `ViewportTracker`; every live
//! subscriber is updated synchronously, before the next frame is drawn.

mod tracker;

pub use tracker::{Subscription, ViewportListener, ViewportTracker};
