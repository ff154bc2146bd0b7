//! Window surface and wgpu device.
//!
//! `Gpu` owns the device, queue and the configured surface of one window.
//! Frames are acquired as [`GpuFrame`]s and handed back for presentation;
//! acquisition failures are classified into a [`SurfaceErrorAction`].

mod context;
mod init;
mod surface;

pub use context::{Gpu, GpuFrame, SurfaceErrorAction};
pub use init::GpuInit;
