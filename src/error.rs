use std::io;

use crate::math::MathError;
use crate::renderer::RendererError;
use crate::scene::SceneError;
use crate::transform::TransformError;
use crate::window::WindowError;

/// # Error
///
/// Any error produced by the engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid math input.
    #[error("math error: {0}")]
    Math(#[from] MathError),

    /// Invalid transform operation.
    #[error("transform error: {0}")]
    Transform(#[from] TransformError),

    /// Invalid scene operation or scene document.
    #[error("scene error: {0}")]
    Scene(#[from] SceneError),

    /// Window creation failed.
    #[error("window error: {0}")]
    Window(#[from] WindowError),

    /// Renderer resource failure.
    #[error("renderer error: {0}")]
    Renderer(#[from] RendererError),

    /// A global logger is already installed.
    #[error("logger error: {0}")]
    Logger(#[from] log::SetLoggerError),

    /// File system failure.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}
