use std::time::{Duration, Instant};

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Time elapsed since the previous tick, in seconds.
    pub dt: f64,

    /// Monotonic timestamp taken at the tick.
    pub now: Instant,

    /// Monotonic frame counter.
    pub frame_index: u64,
}

impl FrameTime {
    /// Instantaneous frame rate, `ceil(1 / dt)`.
    #[inline]
    pub fn frame_rate(&self) -> f64 {
        frame_rate(self.dt)
    }
}

/// `ceil(1 / dt)`; zero for a non-positive delta.
#[inline]
pub fn frame_rate(dt: f64) -> f64 {
    if dt > 0.0 { (1.0 / dt).ceil() } else { 0.0 }
}

/// Produces clamped `FrameTime` snapshots for the render loop.
///
/// Delta time is clamped so a debugger pause or a minimized window does not
/// hand the scene a multi-second step.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    /// Creates a clock with custom delta-time clamps.
    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        Self {
            last: Instant::now(),
            frame_index: 0,
            dt_min,
            dt_max,
        }
    }

    /// Resets the baseline, e.g. after the GPU context comes up.
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    /// Advances the clock and returns a new `FrameTime`.
    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> FrameTime {
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(self.dt_min, self.dt_max);

        self.last = now;

        let ft = FrameTime {
            dt: dt.as_secs_f64(),
            now,
            frame_index: self.frame_index,
        };

        self.frame_index = self.frame_index.wrapping_add(1);
        ft
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks when the next frame is due under an optional frame-rate cap.
#[derive(Debug, Clone)]
pub struct FramePacer {
    interval: Option<Duration>,
    next_due: Instant,
}

impl FramePacer {
    /// `None` or `Some(0)` disables pacing.
    pub fn new(max_frame_rate: Option<u32>) -> Self {
        let interval = max_frame_rate
            .filter(|&fps| fps > 0)
            .map(|fps| Duration::from_secs_f64(1.0 / fps as f64));
        Self { interval, next_due: Instant::now() }
    }

    /// `Some(deadline)` when a cap is configured.
    pub fn next_due(&self) -> Option<Instant> {
        self.interval.map(|_| self.next_due)
    }

    /// Whether a frame should be produced at `now`.
    pub fn is_due(&self, now: Instant) -> bool {
        self.interval.is_none() || now >= self.next_due
    }

    /// Records that a frame was produced at `now`.
    pub fn frame_started(&mut self, now: Instant) {
        if let Some(interval) = self.interval {
            self.next_due = now + interval;
        }
    }
}
