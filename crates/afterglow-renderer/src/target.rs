//! Render targets and their population state.
//!
//! A [`RenderTarget`] may only be sampled after something has drawn into it
//! at its current size. [`TargetSet`] groups targets that are resized
//! together and supports staging a resize so a failed allocation leaves the
//! previous targets untouched.

use crate::gpu::{
    Destination, GpuBackend, PhysicalSize, RendererError, Result, TargetDescriptor, TargetId,
    TextureRef,
};

#[derive(Debug)]
pub struct RenderTarget {
    id: TargetId,
    desc: TargetDescriptor,
    written: bool,
}

impl RenderTarget {
    pub fn new(backend: &mut dyn GpuBackend, desc: TargetDescriptor) -> Result<Self> {
        let id = backend.create_target(&desc)?;
        Ok(Self {
            id,
            desc,
            written: false,
        })
    }

    pub fn id(&self) -> TargetId {
        self.id
    }

    pub fn descriptor(&self) -> &TargetDescriptor {
        &self.desc
    }

    pub fn label(&self) -> &'static str {
        self.desc.label
    }

    pub fn size(&self) -> PhysicalSize {
        self.desc.size()
    }

    pub fn sample_count(&self) -> u32 {
        self.desc.sample_count
    }

    pub fn is_written(&self) -> bool {
        self.written
    }

    pub fn destination(&self) -> Destination {
        Destination::Target(self.id)
    }

    /// First color attachment as a sampling source.
    pub fn texture(&self) -> Result<TextureRef> {
        self.attachment(0)
    }

    /// Fails for multisampled targets, missing attachments and targets not
    /// drawn since they were (re)allocated.
    pub fn attachment(&self, index: usize) -> Result<TextureRef> {
        if self.desc.sample_count > 1 {
            return Err(RendererError::Configuration(format!(
                "'{}' is multisampled; resolve it before sampling",
                self.desc.label
            )));
        }
        if index >= self.desc.color_formats.len() {
            return Err(RendererError::Configuration(format!(
                "'{}' has no attachment {index}",
                self.desc.label
            )));
        }
        if !self.written {
            return Err(RendererError::UnpopulatedTarget(self.desc.label));
        }
        Ok(TextureRef {
            target: self.id,
            attachment: index,
        })
    }

    pub fn mark_written(&mut self) {
        self.written = true;
    }

    pub fn invalidate(&mut self) {
        self.written = false;
    }

    /// Reallocate at a new size with the same configuration. Equal sizes are
    /// a no-op; otherwise the replacement is allocated before the old
    /// storage is released, so a failure leaves `self` intact.
    pub fn resize(
        &mut self,
        backend: &mut dyn GpuBackend,
        width: u32,
        height: u32,
    ) -> Result<bool> {
        if self.desc.width == width && self.desc.height == height {
            return Ok(false);
        }
        let replacement = RenderTarget::new(backend, self.desc.resized(width, height))?;
        let old = std::mem::replace(self, replacement);
        old.destroy(backend);
        Ok(true)
    }

    pub fn destroy(self, backend: &mut dyn GpuBackend) {
        backend.destroy_target(self.id);
    }
}

/// Check the resolve contract, then resolve and mark `dst` written.
pub fn resolve(
    backend: &mut dyn GpuBackend,
    src: &RenderTarget,
    dst: &mut RenderTarget,
) -> Result<()> {
    if src.sample_count() <= 1 || dst.sample_count() != 1 {
        return Err(RendererError::Configuration(format!(
            "resolve needs multisampled '{}' and single-sampled '{}'",
            src.label(),
            dst.label()
        )));
    }
    if src.size() != dst.size() {
        return Err(RendererError::Configuration(format!(
            "resolve '{}' {}x{} into '{}' {}x{}",
            src.label(),
            src.size().width,
            src.size().height,
            dst.label(),
            dst.size().width,
            dst.size().height
        )));
    }
    if !src.is_written() {
        return Err(RendererError::UnpopulatedTarget(src.label()));
    }
    backend.resolve(src.id(), dst.id())?;
    dst.mark_written();
    Ok(())
}

/// Replacement targets allocated by [`TargetSet::stage_resize`], not yet swapped in.
#[derive(Debug)]
#[must_use = "staged targets must be committed or discarded"]
pub struct StagedTargets {
    targets: Option<Vec<RenderTarget>>,
}

impl StagedTargets {
    pub fn discard(self, backend: &mut dyn GpuBackend) {
        for target in self.targets.into_iter().flatten() {
            target.destroy(backend);
        }
    }
}

/// Targets that always share one size.
#[derive(Debug, Default)]
pub struct TargetSet {
    targets: Vec<RenderTarget>,
}

impl TargetSet {
    /// Allocate every descriptor, or none of them.
    pub fn allocate(backend: &mut dyn GpuBackend, descs: Vec<TargetDescriptor>) -> Result<Self> {
        let mut targets = Vec::with_capacity(descs.len());
        for desc in descs {
            match RenderTarget::new(backend, desc) {
                Ok(t) => targets.push(t),
                Err(e) => {
                    for t in targets {
                        t.destroy(backend);
                    }
                    return Err(e);
                }
            }
        }
        Ok(Self { targets })
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&RenderTarget> {
        self.targets.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut RenderTarget> {
        self.targets.get_mut(index)
    }

    /// Index into the set. Effects index their own fixed layouts, so a miss
    /// is a configuration fault rather than a panic.
    pub fn at(&self, index: usize) -> Result<&RenderTarget> {
        self.targets.get(index).ok_or_else(|| {
            RendererError::Configuration(format!("target set has no slot {index}"))
        })
    }

    pub fn at_mut(&mut self, index: usize) -> Result<&mut RenderTarget> {
        self.targets.get_mut(index).ok_or_else(|| {
            RendererError::Configuration(format!("target set has no slot {index}"))
        })
    }

    /// Borrow one target for reading and a different one for writing.
    pub fn pair_mut(
        &mut self,
        read: usize,
        write: usize,
    ) -> Result<(&RenderTarget, &mut RenderTarget)> {
        if read == write || read >= self.targets.len() || write >= self.targets.len() {
            return Err(RendererError::Configuration(format!(
                "cannot read slot {read} while writing slot {write}"
            )));
        }
        if read < write {
            let (head, tail) = self.targets.split_at_mut(write);
            Ok((&head[read], &mut tail[0]))
        } else {
            let (head, tail) = self.targets.split_at_mut(read);
            Ok((&tail[0], &mut head[write]))
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &RenderTarget> {
        self.targets.iter()
    }

    pub fn contains(&self, id: TargetId) -> bool {
        self.targets.iter().any(|t| t.id() == id)
    }

    pub fn size(&self) -> Option<PhysicalSize> {
        self.targets.first().map(RenderTarget::size)
    }

    /// Allocate replacements at the new size without touching the live set.
    pub fn stage_resize(
        &self,
        backend: &mut dyn GpuBackend,
        width: u32,
        height: u32,
    ) -> Result<StagedTargets> {
        if self.size() == Some(PhysicalSize { width, height }) || self.targets.is_empty() {
            return Ok(StagedTargets { targets: None });
        }
        let descs = self
            .targets
            .iter()
            .map(|t| t.descriptor().resized(width, height))
            .collect();
        let staged = TargetSet::allocate(backend, descs)?;
        Ok(StagedTargets {
            targets: Some(staged.targets),
        })
    }

    /// Swap staged replacements in and release the old storage. Returns
    /// whether anything changed.
    pub fn commit(&mut self, staged: StagedTargets, backend: &mut dyn GpuBackend) -> bool {
        match staged.targets {
            Some(targets) => {
                for old in std::mem::replace(&mut self.targets, targets) {
                    old.destroy(backend);
                }
                true
            }
            None => false,
        }
    }

    /// Stage and commit in one step.
    pub fn resize(
        &mut self,
        backend: &mut dyn GpuBackend,
        width: u32,
        height: u32,
    ) -> Result<bool> {
        let staged = self.stage_resize(backend, width, height)?;
        Ok(self.commit(staged, backend))
    }

    pub fn invalidate(&mut self) {
        for target in &mut self.targets {
            target.invalidate();
        }
    }

    pub fn destroy(self, backend: &mut dyn GpuBackend) {
        for target in self.targets {
            target.destroy(backend);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{RecordingBackend, Rgba};

    fn size(w: u32, h: u32) -> PhysicalSize {
        PhysicalSize::new(w, h)
    }

    #[test]
    fn unwritten_target_cannot_be_sampled() {
        let mut backend = RecordingBackend::new();
        let mut target =
            RenderTarget::new(&mut backend, TargetDescriptor::color("temp", size(4, 4))).unwrap();
        assert!(matches!(
            target.texture(),
            Err(RendererError::UnpopulatedTarget("temp"))
        ));
        target.mark_written();
        assert_eq!(target.texture().unwrap().target, target.id());
    }

    #[test]
    fn multisampled_target_cannot_be_sampled() {
        let mut backend = RecordingBackend::new();
        let mut target = RenderTarget::new(
            &mut backend,
            TargetDescriptor::color("msaa", size(4, 4)).with_samples(4),
        )
        .unwrap();
        target.mark_written();
        assert!(matches!(target.texture(), Err(RendererError::Configuration(_))));
    }

    #[test]
    fn resize_reallocates_and_unpopulates() {
        let mut backend = RecordingBackend::new();
        let desc = TargetDescriptor::color("scene", size(4, 4))
            .with_samples(4)
            .with_depth();
        let mut target = RenderTarget::new(&mut backend, desc).unwrap();
        target.mark_written();
        let old = target.id();

        assert!(target.resize(&mut backend, 800, 600).unwrap());
        assert_ne!(target.id(), old);
        assert_eq!(target.size(), size(800, 600));
        assert_eq!(target.sample_count(), 4);
        assert!(target.descriptor().depth);
        assert!(!target.is_written());
        assert_eq!(backend.live_targets(), 1);
    }

    #[test]
    fn resize_to_same_size_is_noop() {
        let mut backend = RecordingBackend::new();
        let mut target =
            RenderTarget::new(&mut backend, TargetDescriptor::color("t", size(8, 8))).unwrap();
        target.mark_written();
        let id = target.id();
        assert!(!target.resize(&mut backend, 8, 8).unwrap());
        assert!(!target.resize(&mut backend, 8, 8).unwrap());
        assert_eq!(target.id(), id);
        assert!(target.is_written());
    }

    #[test]
    fn failed_resize_keeps_old_target() {
        let mut backend = RecordingBackend::new();
        let mut target =
            RenderTarget::new(&mut backend, TargetDescriptor::color("t", size(8, 8))).unwrap();
        target.mark_written();
        backend.fail_allocations_after(0);
        assert!(matches!(
            target.resize(&mut backend, 16, 16),
            Err(RendererError::ResourceExhausted(_))
        ));
        assert_eq!(target.size(), size(8, 8));
        assert!(target.is_written());
    }

    #[test]
    fn resolve_validates_then_marks_written() {
        let mut backend = RecordingBackend::new();
        let mut msaa = RenderTarget::new(
            &mut backend,
            TargetDescriptor::color("msaa", size(8, 8)).with_samples(4),
        )
        .unwrap();
        let mut single =
            RenderTarget::new(&mut backend, TargetDescriptor::color("single", size(8, 8))).unwrap();
        let mut small =
            RenderTarget::new(&mut backend, TargetDescriptor::color("small", size(4, 4))).unwrap();

        backend.clear(msaa.destination(), Rgba::BLACK).unwrap();
        msaa.mark_written();

        assert!(matches!(
            resolve(&mut backend, &msaa, &mut small),
            Err(RendererError::Configuration(_))
        ));
        assert!(matches!(
            resolve(&mut backend, &single, &mut small),
            Err(RendererError::Configuration(_))
        ));

        resolve(&mut backend, &msaa, &mut single).unwrap();
        assert!(single.is_written());
        assert_eq!(backend.content(single.texture().unwrap()), Some("clear"));
    }

    #[test]
    fn set_allocation_is_all_or_nothing() {
        let mut backend = RecordingBackend::new();
        backend.fail_allocations_after(1);
        let result = TargetSet::allocate(
            &mut backend,
            vec![
                TargetDescriptor::color("a", size(4, 4)),
                TargetDescriptor::color("b", size(4, 4)),
            ],
        );
        assert!(result.is_err());
        assert_eq!(backend.live_targets(), 0);
    }

    #[test]
    fn staged_resize_only_lands_on_commit() {
        let mut backend = RecordingBackend::new();
        let mut set = TargetSet::allocate(
            &mut backend,
            vec![
                TargetDescriptor::color("ping", size(4, 4)),
                TargetDescriptor::color("pong", size(4, 4)),
            ],
        )
        .unwrap();

        let staged = set.stage_resize(&mut backend, 32, 16).unwrap();
        assert_eq!(set.size(), Some(size(4, 4)));
        assert_eq!(backend.live_targets(), 4);

        assert!(set.commit(staged, &mut backend));
        assert_eq!(set.size(), Some(size(32, 16)));
        assert!(set.iter().all(|t| t.size() == size(32, 16)));
        assert_eq!(backend.live_targets(), 2);
    }

    #[test]
    fn discarded_stage_releases_targets() {
        let mut backend = RecordingBackend::new();
        let descs = vec![TargetDescriptor::color("a", size(4, 4))];
        let set = TargetSet::allocate(&mut backend, descs).unwrap();
        let staged = set.stage_resize(&mut backend, 8, 8).unwrap();
        staged.discard(&mut backend);
        assert_eq!(backend.live_targets(), 1);
        assert_eq!(set.size(), Some(size(4, 4)));
    }

    #[test]
    fn pair_mut_rejects_aliasing() {
        let mut backend = RecordingBackend::new();
        let mut set = TargetSet::allocate(
            &mut backend,
            vec![
                TargetDescriptor::color("a", size(4, 4)),
                TargetDescriptor::color("b", size(4, 4)),
            ],
        )
        .unwrap();
        assert!(set.pair_mut(0, 0).is_err());
        let (read, write) = set.pair_mut(1, 0).unwrap();
        assert_ne!(read.id(), write.id());
        assert_eq!(read.label(), "b");
        assert_eq!(write.label(), "a");
    }
}
