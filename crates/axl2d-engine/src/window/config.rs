pub use winit::dpi::LogicalSize;

use crate::device::GpuInit;
use crate::paint::Color;

/// Window and render-loop configuration.
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Window title; the frame-rate readout is appended to it.
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    pub clear_color: Color,

    /// Redraw cap. `None` redraws as fast as the surface allows.
    pub max_frame_rate: Option<u32>,
    pub resizable: bool,
    pub gpu: GpuInit,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            title: "axl2d".to_string(),
            initial_size: LogicalSize::new(500.0, 500.0),
            clear_color: Color::CYAN,
            max_frame_rate: Some(120),
            resizable: true,
            gpu: GpuInit::default(),
        }
    }
}
