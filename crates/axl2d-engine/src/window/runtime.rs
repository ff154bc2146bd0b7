use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::ThreadId;
use std::time::Instant;

use anyhow::{Context, Result};
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop, EventLoopProxy};
use winit::window::{Window, WindowId};

use crate::coords::Viewport;
use crate::core::{Engine, WindowRequest};
use crate::device::Gpu;
use crate::error::ConfigError;
use crate::render::{RenderContext, WgpuBackend};
use crate::scene::{Scene, SceneRegistry};
use crate::time::{FrameClock, FramePacer};

use super::config::HostConfig;

static HOST_CLAIMED: AtomicBool = AtomicBool::new(false);

/// Process-wide single-host claim, released on drop.
#[derive(Debug)]
struct HostClaim(());

impl HostClaim {
    fn acquire() -> Result<Self, ConfigError> {
        HOST_CLAIMED
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| HostClaim(()))
            .map_err(|_| ConfigError::HostAlreadyRegistered)
    }
}

impl Drop for HostClaim {
    fn drop(&mut self) {
        HOST_CLAIMED.store(false, Ordering::Release);
    }
}

/// Closed flag of the event loop, plus the thread the loop runs on.
#[derive(Debug)]
struct ClosedState {
    closed: Mutex<bool>,
    cv: Condvar,
    loop_thread: ThreadId,
}

impl ClosedState {
    fn new(loop_thread: ThreadId) -> Self {
        Self {
            closed: Mutex::new(false),
            cv: Condvar::new(),
            loop_thread,
        }
    }

    /// Waiting on the loop's own thread would never return.
    fn can_wait(&self) -> bool {
        std::thread::current().id() != self.loop_thread
    }

    fn mark(&self) {
        let mut closed = self.closed.lock().unwrap_or_else(|e| e.into_inner());
        *closed = true;
        self.cv.notify_all();
    }

    fn wait(&self) {
        let mut closed = self.closed.lock().unwrap_or_else(|e| e.into_inner());
        while !*closed {
            closed = self.cv.wait(closed).unwrap_or_else(|e| e.into_inner());
        }
    }
}

/// Marks the loop closed when the host goes away, whether or not it ran.
struct ClosedGuard(Arc<ClosedState>);

impl Drop for ClosedGuard {
    fn drop(&mut self) {
        self.0.mark();
    }
}

#[derive(Debug, Copy, Clone)]
enum HostEvent {
    Stop,
}

/// Stops a running host from another thread.
///
/// Scenes run on the loop thread and should call `SceneCtx::exit` instead.
#[derive(Clone)]
pub struct StopHandle {
    proxy: EventLoopProxy<HostEvent>,
    closed: Arc<ClosedState>,
}

impl StopHandle {
    /// Asks the loop to stop and blocks until it has closed.
    ///
    /// Called on the loop thread itself it only queues the stop and returns.
    pub fn stop(&self) {
        if self.proxy.send_event(HostEvent::Stop).is_err() {
            log::debug!("stop requested after the event loop closed");
        }
        if !self.closed.can_wait() {
            log::warn!("stop called on the event loop thread; not waiting for close");
            return;
        }
        self.closed.wait();
    }
}

impl std::fmt::Debug for StopHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StopHandle").finish_non_exhaustive()
    }
}

/// Owns the window, the event loop and the scene registry.
///
/// Only one host may exist per process. Scenes are registered before
/// [`Host::run`], which blocks the calling thread until the window closes.
pub struct Host {
    config: HostConfig,
    registry: SceneRegistry,
    event_loop: EventLoop<HostEvent>,
    closed: ClosedGuard,
    _claim: HostClaim,
}

impl Host {
    pub fn new(config: HostConfig) -> Result<Self> {
        let claim = HostClaim::acquire()?;

        let event_loop = EventLoop::<HostEvent>::with_user_event()
            .build()
            .context("failed to create winit EventLoop")?;

        Ok(Self {
            config,
            registry: SceneRegistry::new(),
            event_loop,
            closed: ClosedGuard(Arc::new(ClosedState::new(std::thread::current().id()))),
            _claim: claim,
        })
    }

    pub fn register<T: Scene + Default>(&mut self) -> Result<&mut Self, ConfigError> {
        self.registry.register::<T>()?;
        Ok(self)
    }

    /// Registers the scene activated at startup.
    pub fn register_default<T: Scene + Default>(&mut self) -> Result<&mut Self, ConfigError> {
        self.registry.register_default::<T>()?;
        Ok(self)
    }

    pub fn register_with<T: Scene>(
        &mut self,
        factory: impl Fn() -> T + 'static,
    ) -> Result<&mut Self, ConfigError> {
        self.registry.register_with(factory)?;
        Ok(self)
    }

    pub fn register_default_with<T: Scene>(
        &mut self,
        factory: impl Fn() -> T + 'static,
    ) -> Result<&mut Self, ConfigError> {
        self.registry.register_default_with(factory)?;
        Ok(self)
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            proxy: self.event_loop.create_proxy(),
            closed: Arc::clone(&self.closed.0),
        }
    }

    /// Runs the render loop until the window closes, a scene exits or a
    /// [`StopHandle`] stops it.
    pub fn run(self) -> Result<()> {
        let Host {
            config,
            registry,
            event_loop,
            closed: _closed,
            _claim,
        } = self;

        registry
            .default_scene()
            .context("scene registration is invalid")?;

        let size = config.initial_size;
        let render = RenderContext::new(Viewport::new(size.width as f32, size.height as f32));
        let engine = Engine::new(registry, render, config.clear_color);

        let mut app = HostApp::new(config, engine);
        event_loop
            .run_app(&mut app)
            .context("winit event loop terminated with error")?;

        match app.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

struct HostApp {
    config: HostConfig,
    engine: Engine,
    window: Option<Arc<Window>>,
    clock: FrameClock,
    pacer: FramePacer,
    last_fps: Option<f64>,
    stopped: bool,
    error: Option<anyhow::Error>,
}

impl HostApp {
    fn new(config: HostConfig, engine: Engine) -> Self {
        let pacer = FramePacer::new(config.max_frame_rate);
        Self {
            config,
            engine,
            window: None,
            clock: FrameClock::new(),
            pacer,
            last_fps: None,
            stopped: false,
            error: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size)
            .with_resizable(self.config.resizable);

        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("failed to create window")?,
        );
        self.window = Some(Arc::clone(&window));

        let gpu = pollster::block_on(Gpu::new(Arc::clone(&window), self.config.gpu.clone()))
            .context("GPU initialization failed")?;
        let backend = WgpuBackend::new(gpu).context("failed to create quad pipeline")?;
        self.engine.render_context().install(Box::new(backend));

        let size = window.inner_size();
        self.engine
            .resize(logical_viewport(&window, size), size.width, size.height)?;
        self.engine.start()?;
        self.apply_window_requests()?;

        self.clock.reset();
        window.request_redraw();
        Ok(())
    }

    fn redraw(&mut self) -> Result<()> {
        let ft = self.clock.tick();
        self.engine.update(ft.dt)?;

        self.apply_window_requests()?;

        if let Some(fps) = self.engine.render_frame(ft.dt)? {
            if self.last_fps != Some(fps) {
                self.last_fps = Some(fps);
                if let Some(window) = &self.window {
                    window.set_title(&format!("{} | FPS: {fps}", self.config.title));
                }
            }
        }
        self.apply_window_requests()
    }

    fn apply_window_requests(&mut self) -> Result<()> {
        for request in self.engine.take_window_requests() {
            match request {
                WindowRequest::Title(title) => {
                    self.config.title = title;
                    // Forces the readout to be rewritten under the new title.
                    self.last_fps = None;
                    if let Some(window) = &self.window {
                        window.set_title(&self.config.title);
                    }
                }
                WindowRequest::Size { width, height } => {
                    let Some(window) = self.window.clone() else {
                        continue;
                    };
                    // `Some` means the size was applied synchronously and no
                    // `Resized` event follows.
                    if let Some(size) = window.request_inner_size(LogicalSize::new(width, height)) {
                        self.resized(size)?;
                    }
                }
                WindowRequest::MaxFrameRate(rate) => {
                    self.config.max_frame_rate = rate;
                    self.pacer = FramePacer::new(rate);
                }
            }
        }
        Ok(())
    }

    fn resized(&mut self, size: PhysicalSize<u32>) -> Result<()> {
        let Some(window) = self.window.clone() else {
            return Ok(());
        };
        let viewport = logical_viewport(&window, size);
        self.engine
            .resize(viewport, size.width, size.height)
            .context("resize failed")?;
        self.apply_window_requests()?;
        window.request_redraw();
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        if self.error.is_none() {
            self.error = Some(err);
        }
        self.shutdown(event_loop);
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if !self.stopped {
            self.stopped = true;
            log::info!("stopping host");
            if let Err(e) = self.engine.stop() {
                log::error!("scene failed to stop cleanly: {e}");
            }
            self.window = None;
        }
        event_loop.exit();
    }
}

impl ApplicationHandler<HostEvent> for HostApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || self.stopped {
            return;
        }
        if let Err(e) = self.init(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: HostEvent) {
        match event {
            HostEvent::Stop => self.shutdown(event_loop),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.stopped {
            return;
        }

        match event {
            WindowEvent::CloseRequested => self.shutdown(event_loop),

            WindowEvent::Resized(size) => {
                if let Err(e) = self.resized(size) {
                    self.fail(event_loop, e);
                }
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                let Some(size) = self.window.as_ref().map(|w| w.inner_size()) else {
                    return;
                };
                if let Err(e) = self.resized(size) {
                    self.fail(event_loop, e);
                }
            }

            WindowEvent::RedrawRequested => {
                if let Err(e) = self.redraw() {
                    self.fail(event_loop, e);
                    return;
                }
                if self.engine.exit_requested() {
                    self.shutdown(event_loop);
                }
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.stopped {
            event_loop.exit();
            return;
        }
        let Some(window) = &self.window else {
            return;
        };

        let now = Instant::now();
        if self.pacer.is_due(now) {
            self.pacer.frame_started(now);
            window.request_redraw();
        }

        match self.pacer.next_due() {
            Some(deadline) => event_loop.set_control_flow(ControlFlow::WaitUntil(deadline)),
            None => event_loop.set_control_flow(ControlFlow::Wait),
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        log::debug!("event loop exiting");
    }
}

fn logical_viewport(window: &Window, size: PhysicalSize<u32>) -> Viewport {
    let logical = size.to_logical::<f64>(window.scale_factor());
    Viewport::new(logical.width as f32, logical.height as f32)
}
