use afterglow_common::Color;

/// Errors raised by the GPU layer and the pipeline built on it.
#[derive(Debug, thiserror::Error)]
pub enum RendererError {
    /// Misuse that will not fix itself: mismatched dimensions, aliased
    /// read/write targets, sampling a multisampled target.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The GPU cannot provide a requested sample count or format.
    #[error("unsupported by GPU: {0}")]
    Unsupported(String),

    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("render target '{0}' sampled before it was drawn at its current size")]
    UnpopulatedTarget(&'static str),

    #[error("surface error: {0}")]
    SurfaceError(String),

    #[error("no suitable GPU adapter found")]
    AdapterNotFound,

    #[error("device error: {0}")]
    DeviceError(String),

    #[error("submission failed: {0}")]
    Submission(String),
}

impl From<wgpu::SurfaceError> for RendererError {
    fn from(e: wgpu::SurfaceError) -> Self {
        RendererError::SurfaceError(e.to_string())
    }
}

impl From<wgpu::RequestDeviceError> for RendererError {
    fn from(e: wgpu::RequestDeviceError) -> Self {
        RendererError::DeviceError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RendererError>;

/// Physical pixel dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicalSize {
    pub width: u32,
    pub height: u32,
}

impl PhysicalSize {
    /// Zero-sized surfaces are clamped to 1x1.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

/// Linear RGBA in 0.0-1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Parse a config hex string, falling back to `fallback` when malformed.
    pub fn from_hex_or(hex: &str, fallback: Rgba) -> Self {
        Color::from_hex(hex).map(Rgba::from).unwrap_or(fallback)
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub(crate) fn to_wgpu(self) -> wgpu::Color {
        wgpu::Color {
            r: f64::from(self.r),
            g: f64::from(self.g),
            b: f64::from(self.b),
            a: f64::from(self.a),
        }
    }
}

impl From<Color> for Rgba {
    fn from(c: Color) -> Self {
        let [r, g, b, a] = c.to_unit_rgba();
        Self { r, g, b, a }
    }
}

/// Handle to a render target owned by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetId(pub(crate) u64);

/// Handle to an uploaded mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshId(pub(crate) u64);

/// Handle to an uploaded cube map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CubeMapId(pub(crate) u64);

/// Color attachment formats the pipeline allocates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetFormat {
    Rgba8Unorm,
    Rgba16Float,
    /// Single-channel float, not filterable.
    R32Float,
}

impl TargetFormat {
    pub fn is_filterable(&self) -> bool {
        !matches!(self, TargetFormat::R32Float)
    }

    pub(crate) fn to_wgpu(self) -> wgpu::TextureFormat {
        match self {
            TargetFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
            TargetFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
            TargetFormat::R32Float => wgpu::TextureFormat::R32Float,
        }
    }
}

/// Everything a backend needs to allocate a render target.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetDescriptor {
    pub label: &'static str,
    pub width: u32,
    pub height: u32,
    pub sample_count: u32,
    pub color_formats: Vec<TargetFormat>,
    pub depth: bool,
}

impl TargetDescriptor {
    /// Single-sampled, single `Rgba16Float` attachment, no depth.
    pub fn color(label: &'static str, size: PhysicalSize) -> Self {
        Self {
            label,
            width: size.width,
            height: size.height,
            sample_count: 1,
            color_formats: vec![TargetFormat::Rgba16Float],
            depth: false,
        }
    }

    pub fn with_samples(mut self, sample_count: u32) -> Self {
        self.sample_count = sample_count;
        self
    }

    pub fn with_depth(mut self) -> Self {
        self.depth = true;
        self
    }

    pub fn with_formats(mut self, formats: Vec<TargetFormat>) -> Self {
        self.color_formats = formats;
        self
    }

    pub fn size(&self) -> PhysicalSize {
        PhysicalSize {
            width: self.width,
            height: self.height,
        }
    }

    /// Same configuration at a new size.
    pub fn resized(&self, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..self.clone()
        }
    }
}

/// One color attachment of a render target, as a sampling source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureRef {
    pub target: TargetId,
    pub attachment: usize,
}

/// Where a pass writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    Target(TargetId),
    /// The presentation surface acquired by `begin_frame`.
    Present,
}

/// What the backend can do. Anything short of `advanced` runs the direct path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    /// Float render targets, multisampling and multiple render targets.
    pub advanced: bool,
    /// Highest supported multisample count for `Rgba16Float`.
    pub max_samples: u32,
    pub max_texture_dimension: u32,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            advanced: true,
            max_samples: 4,
            max_texture_dimension: 8192,
        }
    }
}
