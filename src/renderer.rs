//! # Renderer
//!
//! Backend-agnostic rendering. A [RendererApi] implementation talks to the GPU; everything in this
//! module above it (commands, quad batching, shader sources) is CPU-side bookkeeping.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use glam::Mat4;
use glam::Vec3;
use glam::Vec4;

/// Quads drawn per batch before the renderer flushes.
pub const DEFAULT_MAX_QUADS: usize = 10_000;

const QUAD_CORNERS: [Vec3; 4] = [
    Vec3::new(-0.5, -0.5, 0.0),
    Vec3::new(0.5, -0.5, 0.0),
    Vec3::new(0.5, 0.5, 0.0),
    Vec3::new(-0.5, 0.5, 0.0),
];

const QUAD_INDICES: [u32; 6] = [0, 1, 2, 2, 3, 0];

/// # Renderer Error
#[derive(Debug, thiserror::Error)]
pub enum RendererError {
    /// The shader source has no `#type` section.
    #[error("shader {0} has no #type section")]
    MissingShaderType(String),
    /// A `#type` section names a stage that does not exist.
    #[error("unknown shader type {0}")]
    UnknownShaderType(String),
    /// A shader file could not be read.
    #[error("failed to read shader: {0}")]
    Io(#[from] std::io::Error),
}

/// # Renderer API
///
/// Contract implemented by a graphics backend.
pub trait RendererApi {
    /// Prepares the backend for drawing.
    fn init(&mut self);

    /// Sets the viewport rectangle in framebuffer pixels.
    fn set_viewport(&mut self, x: u32, y: u32, width: u32, height: u32);

    /// Sets the color used by [RendererApi::clear].
    fn set_clear_color(&mut self, color: Vec4);

    /// Clears the framebuffer.
    fn clear(&mut self);

    /// Draws the first `index_count` indices of the vertex array.
    fn draw_indexed(&mut self, vertex_array: &VertexArray, index_count: u32);
}

/// # Quad Vertex
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct QuadVertex {
    /// Clip-space position.
    pub position: Vec4,
    /// Linear RGBA color.
    pub color: Vec4,
}

/// # Vertex Array
///
/// Vertices and the indices that reference them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VertexArray {
    vertices: Vec<QuadVertex>,
    indices: Vec<u32>,
}

impl VertexArray {
    /// Returns an empty vertex array.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the vertices.
    pub fn vertices(&self) -> &[QuadVertex] {
        &self.vertices
    }

    /// Returns the indices.
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Returns the number of indices.
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// Appends a quad made of the four given vertices.
    pub fn push_quad(&mut self, vertices: [QuadVertex; 4]) {
        let base = self.vertices.len() as u32;
        self.vertices.extend(vertices);
        self.indices
            .extend(QUAD_INDICES.iter().map(|index| base + index));
    }

    /// Removes every vertex and index.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
    }

    /// Returns true if the array has no indices.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// # Render Command
///
/// Thin front for the active [RendererApi].
pub struct RenderCommand {
    api: Box<dyn RendererApi>,
}

impl RenderCommand {
    /// Returns a command front for the backend.
    pub fn new(api: Box<dyn RendererApi>) -> Self {
        Self { api }
    }

    /// Initializes the backend.
    pub fn init(&mut self) {
        self.api.init();
    }

    /// Sets the viewport.
    pub fn set_viewport(&mut self, x: u32, y: u32, width: u32, height: u32) {
        self.api.set_viewport(x, y, width, height);
    }

    /// Sets the clear color.
    pub fn set_clear_color(&mut self, color: Vec4) {
        self.api.set_clear_color(color);
    }

    /// Clears the framebuffer.
    pub fn clear(&mut self) {
        self.api.clear();
    }

    /// Draws `index_count` indices of the vertex array. Zero draws every index.
    pub fn draw_indexed(&mut self, vertex_array: &VertexArray, index_count: u32) {
        let count = if index_count == 0 {
            vertex_array.index_count()
        } else {
            index_count.min(vertex_array.index_count())
        };

        self.api.draw_indexed(vertex_array, count);
    }
}

/// # Render Stats
///
/// Counters since the last [Renderer::reset_stats].
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct RenderStats {
    /// Number of draw calls issued.
    pub draw_calls: u32,
    /// Number of quads submitted.
    pub quad_count: u32,
}

impl RenderStats {
    /// Returns the number of vertices submitted.
    pub fn vertex_count(&self) -> u32 {
        self.quad_count * 4
    }

    /// Returns the number of indices submitted.
    pub fn index_count(&self) -> u32 {
        self.quad_count * 6
    }
}

/// # Renderer
///
/// Batches quads between [Renderer::begin_scene] and [Renderer::end_scene] and submits them through
/// a [RenderCommand].
pub struct Renderer {
    command: RenderCommand,
    batch: VertexArray,
    view_projection: Mat4,
    max_quads: usize,
    viewport: (u32, u32),
    stats: RenderStats,
}

impl Renderer {
    /// Returns a renderer drawing through the backend.
    pub fn new(api: Box<dyn RendererApi>) -> Self {
        Self {
            command: RenderCommand::new(api),
            batch: VertexArray::new(),
            view_projection: Mat4::IDENTITY,
            max_quads: DEFAULT_MAX_QUADS,
            viewport: (0, 0),
            stats: RenderStats::default(),
        }
    }

    /// Sets the number of quads per batch. Values below one are treated as one.
    pub fn with_max_quads(mut self, max_quads: usize) -> Self {
        self.max_quads = max_quads.max(1);
        self
    }

    /// Initializes the backend.
    pub fn init(&mut self) {
        log::debug!("Initializing renderer");
        self.command.init();
    }

    /// Resizes the viewport to the window.
    pub fn on_window_resize(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
        self.command.set_viewport(0, 0, width, height);
    }

    /// Returns the last viewport size.
    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    /// Sets the clear color.
    pub fn set_clear_color(&mut self, color: Vec4) {
        self.command.set_clear_color(color);
    }

    /// Clears the framebuffer.
    pub fn clear(&mut self) {
        self.command.clear();
    }

    /// Starts a batch drawn with the given view projection matrix.
    pub fn begin_scene(&mut self, view_projection: Mat4) {
        self.view_projection = view_projection;
        self.batch.clear();
    }

    /// Submits a unit quad transformed by the matrix.
    pub fn draw_quad(&mut self, transform: &Mat4, color: Vec4) {
        if self.batch.vertices().len() / 4 >= self.max_quads {
            self.flush();
        }

        let matrix = self.view_projection * *transform;
        self.batch.push_quad(QUAD_CORNERS.map(|corner| QuadVertex {
            position: matrix * corner.extend(1.0),
            color,
        }));
        self.stats.quad_count += 1;
    }

    /// Flushes the remaining quads.
    pub fn end_scene(&mut self) {
        self.flush();
    }

    fn flush(&mut self) {
        if self.batch.is_empty() {
            return;
        }

        self.command.draw_indexed(&self.batch, 0);
        self.stats.draw_calls += 1;
        self.batch.clear();
    }

    /// Returns the counters since the last reset.
    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    /// Resets the counters.
    pub fn reset_stats(&mut self) {
        self.stats = RenderStats::default();
    }
}

/// # Null Renderer API
///
/// Backend that draws nothing. Calls are logged at trace level and counted.
#[derive(Clone, Debug, Default)]
pub struct NullRendererApi {
    initialized: bool,
    viewport: (u32, u32, u32, u32),
    clear_color: Vec4,
    clears: u32,
    draw_calls: u32,
    indices_drawn: u64,
}

impl NullRendererApi {
    /// Returns a backend that has not been initialized.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true once [RendererApi::init] was called.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Returns the last viewport rectangle.
    pub fn viewport(&self) -> (u32, u32, u32, u32) {
        self.viewport
    }

    /// Returns the last clear color.
    pub fn clear_color(&self) -> Vec4 {
        self.clear_color
    }

    /// Returns the number of clears.
    pub fn clears(&self) -> u32 {
        self.clears
    }

    /// Returns the number of draw calls.
    pub fn draw_calls(&self) -> u32 {
        self.draw_calls
    }

    /// Returns the total number of indices drawn.
    pub fn indices_drawn(&self) -> u64 {
        self.indices_drawn
    }
}

impl RendererApi for NullRendererApi {
    fn init(&mut self) {
        log::trace!("Null renderer initialized");
        self.initialized = true;
    }

    fn set_viewport(&mut self, x: u32, y: u32, width: u32, height: u32) {
        log::trace!("Viewport set to {width}x{height} at ({x}, {y})");
        self.viewport = (x, y, width, height);
    }

    fn set_clear_color(&mut self, color: Vec4) {
        self.clear_color = color;
    }

    fn clear(&mut self) {
        self.clears += 1;
    }

    fn draw_indexed(&mut self, _vertex_array: &VertexArray, index_count: u32) {
        log::trace!("Drawing {index_count} indices");
        self.draw_calls += 1;
        self.indices_drawn += u64::from(index_count);
    }
}

/// # Shader Stage
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum ShaderStage {
    /// Vertex stage.
    Vertex,
    /// Fragment stage, also accepted as `pixel`.
    Fragment,
}

impl ShaderStage {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "vertex" => Some(Self::Vertex),
            "fragment" | "pixel" => Some(Self::Fragment),
            _ => None,
        }
    }
}

/// # Shader
///
/// Named shader program source. A single file holds every stage, each introduced by a
/// `#type <stage>` line.
#[derive(Clone, Debug, PartialEq)]
pub struct Shader {
    name: String,
    sources: BTreeMap<ShaderStage, String>,
}

impl Shader {
    /// Returns a shader from separate vertex and fragment sources.
    pub fn new(name: impl Into<String>, vertex: &str, fragment: &str) -> Self {
        let mut sources = BTreeMap::new();
        sources.insert(ShaderStage::Vertex, vertex.to_string());
        sources.insert(ShaderStage::Fragment, fragment.to_string());

        Self {
            name: name.into(),
            sources,
        }
    }

    /// Parses a combined source.
    pub fn from_source(name: impl Into<String>, source: &str) -> Result<Self, RendererError> {
        let name = name.into();
        let mut sources = BTreeMap::new();
        let mut current: Option<(ShaderStage, String)> = None;

        for line in source.lines() {
            if let Some(stage) = line.trim_start().strip_prefix("#type") {
                let stage = stage.trim();
                let stage = ShaderStage::parse(stage)
                    .ok_or_else(|| RendererError::UnknownShaderType(stage.to_string()))?;

                if let Some((previous, text)) = current.replace((stage, String::new())) {
                    sources.insert(previous, text);
                }
            } else if let Some((_, text)) = current.as_mut() {
                text.push_str(line);
                text.push('\n');
            }
        }

        match current {
            Some((stage, text)) => {
                sources.insert(stage, text);
            }
            None => return Err(RendererError::MissingShaderType(name)),
        }

        Ok(Self { name, sources })
    }

    /// Reads and parses a combined source file. The shader is named after the file stem.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RendererError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self::from_source(name, &source)
    }

    /// Returns the shader name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the source of the stage.
    pub fn source(&self, stage: ShaderStage) -> Option<&str> {
        self.sources.get(&stage).map(String::as_str)
    }
}

/// # Shader Library
///
/// Shaders keyed by name.
#[derive(Clone, Debug, Default)]
pub struct ShaderLibrary {
    shaders: BTreeMap<String, Shader>,
}

impl ShaderLibrary {
    /// Returns an empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the shader under its own name. Returns false and keeps the existing shader if the name
    /// is taken.
    pub fn add(&mut self, shader: Shader) -> bool {
        if self.exists(shader.name()) {
            log::warn!("Shader {} already exists", shader.name());
            return false;
        }

        self.shaders.insert(shader.name().to_string(), shader);
        true
    }

    /// Loads the shader file and adds it. Returns the shader name.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<String, RendererError> {
        let shader = Shader::load(path)?;
        let name = shader.name().to_string();
        self.add(shader);
        Ok(name)
    }

    /// Returns the shader with the given name.
    pub fn get(&self, name: &str) -> Option<&Shader> {
        self.shaders.get(name)
    }

    /// Returns true if a shader with the given name exists.
    pub fn exists(&self, name: &str) -> bool {
        self.shaders.contains_key(name)
    }
}
