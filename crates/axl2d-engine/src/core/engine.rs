use crate::coords::Viewport;
use crate::error::{EngineError, LifecycleError, RenderError};
use crate::paint::Color;
use crate::render::RenderContext;
use crate::scene::{Scene, SceneId, SceneLifecycle, SceneRegistry, SceneState};
use crate::time::frame_rate;

use super::ctx::{SceneCommand, SceneCtx, WindowRequest};

/// Drives the active scene and the GPU backend, one frame at a time.
///
/// Every entry point applies the requests scenes queued on their
/// [`SceneCtx`] before returning.
pub struct Engine {
    ctx: SceneCtx,
    registry: SceneRegistry,
    lifecycle: SceneLifecycle,
    clear_color: Color,
    exit_requested: bool,
    window_requests: Vec<WindowRequest>,
    draw_errors: DrawErrorLog,
}

/// Keeps a scene that fails the same way every frame from flooding the log.
#[derive(Debug, Default)]
struct DrawErrorLog {
    last: Option<String>,
}

impl DrawErrorLog {
    /// `Error` the first time a message shows up, `Debug` while it repeats.
    fn level_for(&mut self, message: String) -> log::Level {
        if self.last.as_deref() == Some(message.as_str()) {
            log::Level::Debug
        } else {
            self.last = Some(message);
            log::Level::Error
        }
    }

    fn clear(&mut self) {
        self.last = None;
    }
}

impl Engine {
    pub fn new(registry: SceneRegistry, render: RenderContext, clear_color: Color) -> Self {
        Self {
            ctx: SceneCtx::new(render),
            registry,
            lifecycle: SceneLifecycle::new(),
            clear_color,
            exit_requested: false,
            window_requests: Vec::new(),
            draw_errors: DrawErrorLog::default(),
        }
    }

    /// Activates the single default scene.
    pub fn start(&mut self) -> Result<(), EngineError> {
        let id = self
            .registry
            .default_scene()
            .map_err(LifecycleError::from)?;
        log::info!("starting with default scene `{id}`");
        self.change_scene_to(id)
    }

    pub fn change_scene<T: Scene>(&mut self) -> Result<(), EngineError> {
        self.change_scene_to(SceneId::of::<T>())
    }

    pub fn change_scene_to(&mut self, id: SceneId) -> Result<(), EngineError> {
        self.lifecycle
            .change_scene(&self.registry, id, &mut self.ctx)?;
        self.apply()
    }

    /// Applies queued scene requests until none are left.
    fn apply(&mut self) -> Result<(), EngineError> {
        loop {
            let commands = self.ctx.take_commands();
            if commands.is_empty() {
                return Ok(());
            }

            for cmd in commands {
                match cmd {
                    SceneCommand::ChangeScene(id) => {
                        self.draw_errors.clear();
                        self.lifecycle
                            .change_scene(&self.registry, id, &mut self.ctx)?;
                    }
                    SceneCommand::Exit => {
                        log::info!("exit requested by scene");
                        self.exit_requested = true;
                    }
                    SceneCommand::SetClearColor(color) => self.clear_color = color,
                    SceneCommand::Window(request) => {
                        log::debug!("scene requested {request:?}");
                        self.window_requests.push(request);
                    }
                }
            }
        }
    }

    /// Runs the active scene's `update` hook.
    pub fn update(&mut self, dt: f64) -> Result<(), EngineError> {
        self.lifecycle.update(&mut self.ctx, dt);
        self.apply()
    }

    /// Renders one frame and returns its frame-rate readout.
    ///
    /// `Ok(None)` when nothing was presented: no GPU context yet, or the
    /// surface asked to skip this frame. Errors from the scene's draw hook are
    /// logged and the frame is still presented; an error repeating frame after
    /// frame is logged at `error` once and at `debug` afterwards.
    pub fn render_frame(&mut self, dt: f64) -> Result<Option<f64>, EngineError> {
        let render = self.ctx.render().clone();
        if !render.is_ready() {
            return Ok(None);
        }

        let clear = self.clear_color;
        let started = render.with_gpu(|gpu| -> Result<bool, RenderError> {
            if !gpu.begin_frame()? {
                return Ok(false);
            }
            gpu.use_program();
            gpu.clear(clear);
            Ok(true)
        })??;

        if !started {
            log::debug!("frame skipped by surface");
            return Ok(None);
        }

        let fps = frame_rate(dt);
        match self.lifecycle.draw(&mut self.ctx, dt, fps) {
            Ok(()) => self.draw_errors.clear(),
            Err(e) => {
                let level = self.draw_errors.level_for(e.to_string());
                log::log!(level, "scene draw failed: {e}");
            }
        }

        render.with_gpu(|gpu| gpu.end_frame())??;
        self.apply()?;
        Ok(Some(fps))
    }

    /// Resizes the surface, broadcasts the logical viewport, then tells the
    /// active scene. A zero-area viewport only resizes the surface.
    pub fn resize(
        &mut self,
        viewport: Viewport,
        physical_width: u32,
        physical_height: u32,
    ) -> Result<(), EngineError> {
        let render = self.ctx.render().clone();
        match render.with_gpu(|gpu| gpu.resize(physical_width, physical_height)) {
            Ok(()) | Err(RenderError::ContextUnavailable) => {}
            Err(e) => return Err(e.into()),
        }

        if !viewport.is_valid() {
            log::debug!("zero-area viewport, drawing deferred");
            return Ok(());
        }

        let notified = render.tracker().resize(viewport);
        log::debug!(
            "viewport {}x{} sent to {notified} listeners",
            viewport.width,
            viewport.height
        );

        self.lifecycle.resize(&mut self.ctx, viewport);
        self.apply()
    }

    /// Unloads the active scene, then releases the backend.
    pub fn stop(&mut self) -> Result<(), EngineError> {
        let stopped = self.lifecycle.stop(&mut self.ctx);
        self.ctx.take_commands();
        self.ctx.render().shutdown();
        stopped.map_err(EngineError::from)
    }

    #[inline]
    pub fn state(&self) -> SceneState {
        self.lifecycle.state()
    }

    #[inline]
    pub fn current_scene(&self) -> Option<SceneId> {
        self.lifecycle.current()
    }

    /// Window changes queued by scenes since the last call.
    pub fn take_window_requests(&mut self) -> Vec<WindowRequest> {
        std::mem::take(&mut self.window_requests)
    }

    /// Whether a scene asked the host to exit.
    #[inline]
    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    #[inline]
    pub fn render_context(&self) -> &RenderContext {
        self.ctx.render()
    }

    #[inline]
    pub fn clear_color(&self) -> Color {
        self.clear_color
    }

    pub fn set_clear_color(&mut self, color: Color) {
        self.clear_color = color;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drawable::{Drawable, QuadDesc};
    use crate::error::ConfigError;
    use crate::render::recording::{CallLog, GpuCall, RecordingBackend};

    #[derive(Default)]
    struct Boxes {
        quads: Vec<Drawable>,
        frames: u32,
    }

    impl Scene for Boxes {
        fn load(&mut self, ctx: &mut SceneCtx) -> anyhow::Result<()> {
            for x in [0.0, 100.0] {
                let desc = QuadDesc::new((x, 0.0), (100.0, 100.0)).with_tint(Color::RED);
                self.quads.push(Drawable::solid(ctx.render(), desc));
            }
            Ok(())
        }

        fn draw(&mut self, ctx: &mut SceneCtx, _dt: f64, _fps: f64) -> Result<(), RenderError> {
            for quad in &mut self.quads {
                quad.draw()?;
            }
            self.frames += 1;
            if self.frames == 2 {
                ctx.change_scene::<Empty>();
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct Empty;

    impl Scene for Empty {
        fn update(&mut self, ctx: &mut SceneCtx, _dt: f64) {
            ctx.exit();
        }
    }

    /// Restyles the window on load and cannot be unloaded.
    #[derive(Default)]
    struct Styled;

    impl Scene for Styled {
        fn load(&mut self, ctx: &mut SceneCtx) -> anyhow::Result<()> {
            ctx.set_clear_color(Color::RED);
            ctx.set_title("styled");
            ctx.set_window_size(640.0, 480.0);
            ctx.set_max_frame_rate(Some(30));
            Ok(())
        }

        fn draw(&mut self, _ctx: &mut SceneCtx, _dt: f64, _fps: f64) -> Result<(), RenderError> {
            Err(RenderError::ContextUnavailable)
        }

        fn resize(&mut self, ctx: &mut SceneCtx, _viewport: Viewport) {
            ctx.change_scene::<Empty>();
        }

        fn unload(&mut self, _ctx: &mut SceneCtx) -> anyhow::Result<()> {
            anyhow::bail!("styled scene refuses to unload")
        }
    }

    fn styled_engine() -> (Engine, CallLog) {
        let mut registry = SceneRegistry::new();
        registry.register_default::<Styled>().unwrap();
        registry.register::<Empty>().unwrap();

        let (backend, log) = RecordingBackend::new();
        let render = RenderContext::new(Viewport::new(200.0, 200.0));
        render.install(Box::new(backend));
        (Engine::new(registry, render, Color::CYAN), log)
    }

    fn engine(backend: Option<RecordingBackend>) -> Engine {
        let mut registry = SceneRegistry::new();
        registry.register_default::<Boxes>().unwrap();
        registry.register::<Empty>().unwrap();

        let render = RenderContext::new(Viewport::new(200.0, 200.0));
        if let Some(backend) = backend {
            render.install(Box::new(backend));
        }
        Engine::new(registry, render, Color::CYAN)
    }

    fn frame_calls(log: &CallLog) -> Vec<GpuCall> {
        log.calls()
            .into_iter()
            .filter(|c| !matches!(c, GpuCall::CreateGeometry(_) | GpuCall::UploadGeometry(..)))
            .collect()
    }

    #[test]
    fn frame_runs_in_order() {
        let (backend, log) = RecordingBackend::new();
        let mut engine = engine(Some(backend));
        engine.start().unwrap();

        assert_eq!(engine.render_frame(0.25).unwrap(), Some(4.0));

        let calls = frame_calls(&log);
        assert_eq!(
            calls[..3],
            [GpuCall::BeginFrame, GpuCall::UseProgram, GpuCall::Clear(Color::CYAN)]
        );
        assert_eq!(log.count(|c| matches!(c, GpuCall::DrawQuad { .. })), 2);
        assert_eq!(calls.last(), Some(&GpuCall::EndFrame));
    }

    #[test]
    fn frame_is_skipped_without_context() {
        let mut engine = engine(None);
        engine.start().unwrap();
        assert_eq!(engine.render_frame(0.016).unwrap(), None);
        assert_eq!(engine.state(), SceneState::Active);
    }

    #[test]
    fn frame_is_skipped_when_surface_is_not_ready() {
        let (backend, log) = RecordingBackend::skipping_frames();
        let mut engine = engine(Some(backend));
        engine.start().unwrap();

        assert_eq!(engine.render_frame(0.016).unwrap(), None);
        assert_eq!(log.count(|c| matches!(c, GpuCall::DrawQuad { .. })), 0);
        assert_eq!(log.count(|c| *c == GpuCall::EndFrame), 0);
    }

    #[test]
    fn scene_requested_switch_is_applied_after_the_frame() {
        let (backend, log) = RecordingBackend::new();
        let mut engine = engine(Some(backend));
        engine.start().unwrap();

        engine.render_frame(0.016).unwrap();
        assert_eq!(engine.current_scene(), Some(SceneId::of::<Boxes>()));

        engine.render_frame(0.016).unwrap();
        assert_eq!(engine.current_scene(), Some(SceneId::of::<Empty>()));
        // Boxes dropped its quads on the way out.
        assert_eq!(log.count(|c| matches!(c, GpuCall::DeleteGeometry(_))), 2);

        assert!(!engine.exit_requested());
        engine.update(0.016).unwrap();
        assert!(engine.exit_requested());
    }

    #[test]
    fn resize_reaches_backend_and_drawables() {
        let (backend, log) = RecordingBackend::new();
        let mut engine = engine(Some(backend));
        engine.start().unwrap();

        engine.resize(Viewport::new(400.0, 400.0), 800, 800).unwrap();
        assert_eq!(engine.render_context().viewport(), Viewport::new(400.0, 400.0));
        assert_eq!(log.count(|c| *c == GpuCall::Resize(800, 800)), 1);

        engine.resize(Viewport::new(0.0, 400.0), 0, 800).unwrap();
        assert_eq!(engine.render_context().viewport(), Viewport::new(400.0, 400.0));
    }

    #[test]
    fn scene_restyles_clear_color_and_window() {
        let (mut engine, log) = styled_engine();
        engine.start().unwrap();
        assert_eq!(engine.clear_color(), Color::RED);

        engine.render_frame(0.016).unwrap();
        assert_eq!(log.count(|c| *c == GpuCall::Clear(Color::RED)), 1);
        assert_eq!(log.count(|c| *c == GpuCall::Clear(Color::CYAN)), 0);

        assert_eq!(
            engine.take_window_requests(),
            vec![
                WindowRequest::Title("styled".into()),
                WindowRequest::Size {
                    width: 640.0,
                    height: 480.0,
                },
                WindowRequest::MaxFrameRate(Some(30)),
            ]
        );
        assert!(engine.take_window_requests().is_empty());
    }

    #[test]
    fn failing_draw_still_presents_every_frame() {
        let (mut engine, log) = styled_engine();
        engine.start().unwrap();

        for _ in 0..3 {
            assert!(engine.render_frame(0.016).unwrap().is_some());
        }
        assert_eq!(log.count(|c| *c == GpuCall::EndFrame), 3);
        assert_eq!(engine.state(), SceneState::Active);
    }

    #[test]
    fn repeated_draw_error_is_demoted() {
        let mut errors = DrawErrorLog::default();
        assert_eq!(errors.level_for("boom".into()), log::Level::Error);
        assert_eq!(errors.level_for("boom".into()), log::Level::Debug);
        assert_eq!(errors.level_for("other".into()), log::Level::Error);

        errors.clear();
        assert_eq!(errors.level_for("other".into()), log::Level::Error);
    }

    #[test]
    fn switch_requested_from_resize_surfaces_unload_failure() {
        let (mut engine, _log) = styled_engine();
        engine.start().unwrap();

        let err = engine.resize(Viewport::new(300.0, 300.0), 300, 300).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Lifecycle(LifecycleError::Unload { scene: "Styled", .. })
        ));
        assert_eq!(engine.state(), SceneState::Stopped);
    }

    #[test]
    fn start_without_default_fails() {
        let mut engine = Engine::new(
            SceneRegistry::new(),
            RenderContext::new(Viewport::new(10.0, 10.0)),
            Color::BLACK,
        );
        let err = engine.start().unwrap_err();
        assert!(matches!(
            err,
            EngineError::Lifecycle(LifecycleError::Config(ConfigError::NoDefaultScene))
        ));
    }

    #[test]
    fn stop_unloads_and_releases_backend() {
        let (backend, log) = RecordingBackend::new();
        let mut engine = engine(Some(backend));
        engine.start().unwrap();
        engine.render_frame(0.016).unwrap();

        engine.stop().unwrap();
        assert_eq!(engine.state(), SceneState::Stopped);
        assert!(!engine.render_context().is_ready());
        assert_eq!(log.count(|c| matches!(c, GpuCall::DeleteGeometry(_))), 2);
    }
}
