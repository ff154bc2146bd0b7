use std::cell::RefCell;
use std::rc::Rc;

use crate::broadcast::ViewportTracker;
use crate::coords::Viewport;
use crate::error::RenderError;

use super::backend::GpuBackend;

struct Inner {
    backend: RefCell<Option<Box<dyn GpuBackend>>>,
    tracker: ViewportTracker,
}

/// Explicit handle to the GPU backend and the viewport broadcast.
///
/// Cheap to clone; every drawable and scene context holds one. The backend is
/// installed once the window and device exist, so GPU access before that
/// fails with [`RenderError::ContextUnavailable`].
#[derive(Clone)]
pub struct RenderContext {
    inner: Rc<Inner>,
}

impl RenderContext {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            inner: Rc::new(Inner {
                backend: RefCell::new(None),
                tracker: ViewportTracker::new(viewport),
            }),
        }
    }

    /// Installs the backend, replacing any previous one.
    pub fn install(&self, backend: Box<dyn GpuBackend>) {
        *self.inner.backend.borrow_mut() = Some(backend);
        log::debug!("GPU backend installed");
    }

    /// Removes the backend. Later GPU access fails as before creation.
    pub fn shutdown(&self) -> Option<Box<dyn GpuBackend>> {
        let backend = self.inner.backend.borrow_mut().take();
        if backend.is_some() {
            log::debug!("GPU backend released");
        }
        backend
    }

    pub fn is_ready(&self) -> bool {
        self.inner.backend.borrow().is_some()
    }

    /// Runs `f` against the backend.
    ///
    /// Calls must not nest: the backend is exclusively borrowed for the
    /// duration of `f`.
    pub fn with_gpu<R>(&self, f: impl FnOnce(&mut dyn GpuBackend) -> R) -> Result<R, RenderError> {
        let mut slot = self
            .inner
            .backend
            .try_borrow_mut()
            .map_err(|_| RenderError::ContextBusy)?;
        let backend = slot.as_deref_mut().ok_or(RenderError::ContextUnavailable)?;
        Ok(f(backend))
    }

    #[inline]
    pub fn viewport(&self) -> Viewport {
        self.inner.tracker.current()
    }

    #[inline]
    pub fn tracker(&self) -> &ViewportTracker {
        &self.inner.tracker
    }
}

impl std::fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderContext")
            .field("ready", &self.is_ready())
            .field("viewport", &self.viewport())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::recording::{GpuCall, RecordingBackend};

    #[test]
    fn gpu_access_before_install_fails() {
        let ctx = RenderContext::new(Viewport::new(100.0, 100.0));
        assert!(!ctx.is_ready());
        let err = ctx.with_gpu(|gpu| gpu.create_geometry()).unwrap_err();
        assert!(matches!(err, RenderError::ContextUnavailable));
    }

    #[test]
    fn nested_access_is_rejected() {
        let ctx = RenderContext::new(Viewport::new(100.0, 100.0));
        let (backend, _log) = RecordingBackend::new();
        ctx.install(Box::new(backend));

        let inner = ctx.with_gpu(|_| ctx.with_gpu(|_| ())).unwrap();
        assert!(matches!(inner, Err(RenderError::ContextBusy)));
    }

    #[test]
    fn shutdown_releases_backend() {
        let ctx = RenderContext::new(Viewport::new(100.0, 100.0));
        let (backend, log) = RecordingBackend::new();
        ctx.install(Box::new(backend));
        ctx.with_gpu(|gpu| gpu.resize(10, 10)).unwrap();
        assert_eq!(log.calls(), vec![GpuCall::Resize(10, 10)]);

        assert!(ctx.shutdown().is_some());
        assert!(!ctx.is_ready());
        assert!(ctx.shutdown().is_none());
    }
}
