pub mod camera;
pub mod chain;
pub mod effects;
pub mod gbuffer;
pub mod gpu;
pub mod math;
pub mod perf;
pub mod pipeline;
pub mod scene;
pub mod target;
pub mod temporal;

pub use camera::Camera;
pub use chain::EffectChain;
pub use effects::{Background, Bloom, Effect, Ssao, Ssr, ToneMapping, Vignette};
pub use gbuffer::AuxiliaryGeometryBuffer;
pub use gpu::{GpuBackend, GpuContext, RecordingBackend, RendererError, WgpuBackend};
pub use perf::FrameTimer;
pub use pipeline::{FramePath, FramePipeline, FrameReport};
pub use scene::{DrawItem, MeshData, Scene, StaticScene};
pub use target::{RenderTarget, TargetSet};
pub use temporal::{AccumulationState, TemporalAccumulator};
