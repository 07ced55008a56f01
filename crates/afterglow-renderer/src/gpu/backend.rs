use super::pass::{FullscreenPass, ScenePass};
use super::types::{
    Capabilities, CubeMapId, Destination, MeshId, PhysicalSize, Result, Rgba, TargetDescriptor,
    TargetId,
};
use crate::scene::MeshData;

/// The GPU operations the pipeline is written against.
///
/// Commands are recorded in call order and submitted together by
/// [`end_frame`](GpuBackend::end_frame), which also presents. Targets
/// are owned by the backend and addressed by [`TargetId`].
pub trait GpuBackend {
    fn capabilities(&self) -> &Capabilities;

    /// Acquire the presentation surface for this tick.
    fn begin_frame(&mut self) -> Result<()>;

    /// Submit everything recorded since `begin_frame` and present.
    fn end_frame(&mut self) -> Result<()>;

    /// Drop recorded commands and release the surface without presenting.
    fn abort_frame(&mut self);

    fn resize_surface(&mut self, size: PhysicalSize);

    /// Fails with `Unsupported` for sample counts or formats the GPU lacks
    /// and `ResourceExhausted` when memory runs out.
    fn create_target(&mut self, desc: &TargetDescriptor) -> Result<TargetId>;

    fn destroy_target(&mut self, id: TargetId);

    fn upload_mesh(&mut self, mesh: &MeshData) -> Result<MeshId>;

    /// Six square faces in +X, -X, +Y, -Y, +Z, -Z order, RGBA8.
    fn upload_cubemap(&mut self, size: u32, faces: &[Vec<u8>; 6]) -> Result<CubeMapId>;

    /// Clear every attachment of `dest` (color to `color`, depth to far).
    fn clear(&mut self, dest: Destination, color: Rgba) -> Result<()>;

    fn draw_fullscreen(&mut self, pass: &FullscreenPass<'_>) -> Result<()>;

    fn draw_scene(&mut self, pass: &ScenePass<'_>) -> Result<()>;

    /// Resolve a multisampled target into a single-sampled one of equal size.
    fn resolve(&mut self, source: TargetId, destination: TargetId) -> Result<()>;
}
