//! Time subsystem.
//!
//! - one `FrameClock` per render loop; `tick()` once per frame
//! - `FramePacer` schedules redraws under an optional frame-rate cap

mod frame_clock;

pub use frame_clock::{frame_rate, FrameClock, FramePacer, FrameTime};
