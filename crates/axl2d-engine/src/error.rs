//! Engine error types.
//!
//! Configuration errors are fatal at startup. Render errors are fatal to the
//! operation that raised them; the render loop logs them and keeps running.

use thiserror::Error;

use crate::drawable::DecodeError;
use crate::render::ShaderStage;
use crate::scene::SceneState;

/// Startup configuration problems.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no default scene registered")]
    NoDefaultScene,

    #[error("more than one default scene registered: {}", .0.join(", "))]
    MultipleDefaultScenes(Vec<&'static str>),

    #[error("scene `{0}` is not registered")]
    SceneNotRegistered(&'static str),

    #[error("scene `{0}` is already registered")]
    DuplicateScene(&'static str),

    #[error("a host is already registered in this process")]
    HostAlreadyRegistered,
}

/// GPU resource and draw errors.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("GPU context has not been created yet")]
    ContextUnavailable,

    #[error("GPU context is already in use by the caller")]
    ContextBusy,

    #[error("failed to decode sprite `{key}`")]
    Decode {
        key: String,
        #[source]
        source: DecodeError,
    },

    #[error("sprite `{key}` failed to load earlier and cannot be drawn")]
    Unusable { key: String },

    #[error("{stage} shader failed to compile:\n{message}")]
    ShaderCompile { stage: ShaderStage, message: String },

    #[error("drawable has been disposed")]
    Disposed,

    #[error("unknown geometry handle")]
    UnknownGeometry,

    #[error("unknown texture handle")]
    UnknownTexture,

    #[error("a pixel source is already active for this drawable")]
    SourceAlreadyActive,

    #[error("drawable does not have a dynamic texture")]
    NotDynamic,

    #[error("sprite key `{0}` is already in use")]
    DuplicateKey(String),

    #[error("no sprite registered under `{0}`")]
    UnknownSprite(String),

    #[error("pixel buffer has {actual} bytes, expected {expected}")]
    PixelBufferSize { expected: usize, actual: usize },

    #[error("draw issued outside of a frame")]
    FrameNotStarted,

    #[error("surface lost and could not be recovered")]
    SurfaceLost,
}

/// Error returned by a scene hook.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Scene lifecycle failures.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("cannot change scene while {0:?}")]
    IllegalTransition(SceneState),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("scene `{scene}` failed to load")]
    Load {
        scene: &'static str,
        #[source]
        source: BoxedError,
    },

    #[error("scene `{scene}` failed to unload")]
    Unload {
        scene: &'static str,
        #[source]
        source: BoxedError,
    },
}

/// Anything the engine can fail with while driving frames.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}
