use crate::coords::Viewport;
use crate::paint::Color;
use crate::render::RenderContext;
use crate::scene::{Scene, SceneId};

/// Context handed to every scene hook.
///
/// Requests are buffered and applied by the engine after the current hook
/// returns, so a scene never re-enters the lifecycle from inside itself.
pub struct SceneCtx {
    render: RenderContext,
    commands: Vec<SceneCommand>,
}

/// Window change a scene asked for. Drained by the host between frames.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowRequest {
    /// New base title; the frame-rate readout is appended to it.
    Title(String),
    /// New inner size in logical pixels.
    Size { width: f64, height: f64 },
    /// New redraw cap. `None` uncaps.
    MaxFrameRate(Option<u32>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SceneCommand {
    ChangeScene(SceneId),
    Exit,
    SetClearColor(Color),
    Window(WindowRequest),
}

impl SceneCtx {
    pub(crate) fn new(render: RenderContext) -> Self {
        Self {
            render,
            commands: Vec::new(),
        }
    }

    /// Handle used to create drawables and reach the GPU.
    #[inline]
    pub fn render(&self) -> &RenderContext {
        &self.render
    }

    /// Current logical viewport.
    #[inline]
    pub fn viewport(&self) -> Viewport {
        self.render.viewport()
    }

    /// Queues a switch to scene `T`.
    pub fn change_scene<T: Scene>(&mut self) {
        self.commands.push(SceneCommand::ChangeScene(SceneId::of::<T>()));
    }

    /// Queues a host exit.
    pub fn exit(&mut self) {
        self.commands.push(SceneCommand::Exit);
    }

    /// Background colour used from the next frame on.
    pub fn set_clear_color(&mut self, color: Color) {
        self.commands.push(SceneCommand::SetClearColor(color));
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.commands.push(SceneCommand::Window(WindowRequest::Title(title.into())));
    }

    /// Requests a new inner window size in logical pixels. The platform may
    /// refuse or adjust it; scenes learn the outcome through `resize`.
    pub fn set_window_size(&mut self, width: f64, height: f64) {
        self.commands.push(SceneCommand::Window(WindowRequest::Size { width, height }));
    }

    pub fn set_max_frame_rate(&mut self, max_frame_rate: Option<u32>) {
        self.commands.push(SceneCommand::Window(WindowRequest::MaxFrameRate(max_frame_rate)));
    }

    pub(crate) fn take_commands(&mut self) -> Vec<SceneCommand> {
        std::mem::take(&mut self.commands)
    }
}
