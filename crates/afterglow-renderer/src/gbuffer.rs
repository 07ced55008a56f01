//! Auxiliary geometry buffer: view-space normal + gloss and linear depth.

use crate::camera::Camera;
use crate::gpu::{
    GpuBackend, PhysicalSize, Result, Rgba, SceneMode, ScenePass, TargetDescriptor, TargetFormat,
    TextureRef,
};
use crate::scene::RenderList;
use crate::target::{RenderTarget, StagedTargets, TargetSet};

/// Attachment 0: `Rgba16Float` view normal (xyz) and gloss (w).
/// Attachment 1: `R32Float` positive view-space depth, 0 where nothing was drawn.
pub struct AuxiliaryGeometryBuffer {
    targets: TargetSet,
}

impl AuxiliaryGeometryBuffer {
    pub fn new(backend: &mut dyn GpuBackend, size: PhysicalSize) -> Result<Self> {
        let desc = TargetDescriptor::color("geometry", size)
            .with_formats(vec![TargetFormat::Rgba16Float, TargetFormat::R32Float])
            .with_depth();
        Ok(Self {
            targets: TargetSet::allocate(backend, vec![desc])?,
        })
    }

    fn target(&self) -> Result<&RenderTarget> {
        self.targets.at(0)
    }

    /// Re-render the opaque geometry of `list`.
    pub fn update(
        &mut self,
        backend: &mut dyn GpuBackend,
        list: &RenderList,
        camera: &Camera,
    ) -> Result<()> {
        let target = self.targets.at_mut(0)?;
        backend.draw_scene(&ScenePass {
            label: "geometry",
            output: target.destination(),
            clear: Rgba::TRANSPARENT,
            camera,
            list,
            mode: SceneMode::Geometry,
        })?;
        target.mark_written();
        Ok(())
    }

    pub fn is_populated(&self) -> bool {
        self.target().map(RenderTarget::is_written).unwrap_or(false)
    }

    pub fn normals(&self) -> Result<TextureRef> {
        self.target()?.attachment(0)
    }

    pub fn depth(&self) -> Result<TextureRef> {
        self.target()?.attachment(1)
    }

    pub fn size(&self) -> Option<PhysicalSize> {
        self.targets.size()
    }

    /// Forget the contents so nothing reads a stale buffer.
    pub fn invalidate(&mut self) {
        self.targets.invalidate();
    }

    pub(crate) fn targets(&self) -> &TargetSet {
        &self.targets
    }

    pub(crate) fn commit(&mut self, staged: StagedTargets, backend: &mut dyn GpuBackend) {
        self.targets.commit(staged, backend);
    }

    pub fn destroy(self, backend: &mut dyn GpuBackend) {
        self.targets.destroy(backend);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{RecordingBackend, RendererError};

    const SIZE: PhysicalSize = PhysicalSize {
        width: 8,
        height: 8,
    };

    #[test]
    fn unpopulated_until_updated() {
        let mut backend = RecordingBackend::new();
        let mut gbuffer = AuxiliaryGeometryBuffer::new(&mut backend, SIZE).unwrap();
        assert!(!gbuffer.is_populated());
        assert!(matches!(
            gbuffer.normals(),
            Err(RendererError::UnpopulatedTarget("geometry"))
        ));

        gbuffer
            .update(&mut backend, &RenderList::default(), &Camera::default())
            .unwrap();
        assert!(gbuffer.is_populated());
        assert_eq!(backend.content(gbuffer.normals().unwrap()), Some("normals"));
        assert_eq!(backend.content(gbuffer.depth().unwrap()), Some("depth"));
        assert_eq!(backend.frame_counts().geometry_draws, 1);
    }

    #[test]
    fn invalidate_forgets_contents() {
        let mut backend = RecordingBackend::new();
        let mut gbuffer = AuxiliaryGeometryBuffer::new(&mut backend, SIZE).unwrap();
        gbuffer
            .update(&mut backend, &RenderList::default(), &Camera::default())
            .unwrap();
        gbuffer.invalidate();
        assert!(!gbuffer.is_populated());
    }
}
