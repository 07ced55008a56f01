//! CPU-side backend that records commands instead of drawing.
//!
//! Each target attachment carries a symbolic description of what was last
//! drawn into it (`"vignette(bloom(...))"`), so pass ordering and aliasing can
//! be checked without a GPU. Failure injection covers the capability and
//! allocation error paths.

use std::collections::HashMap;

use super::backend::GpuBackend;
use super::pass::{
    validate_fullscreen, Binding, BlendMode, FullscreenPass, LoadAction, Program, SceneMode,
    ScenePass,
};
use super::types::{
    Capabilities, CubeMapId, Destination, MeshId, PhysicalSize, RendererError, Result, Rgba,
    TargetDescriptor, TargetId, TextureRef,
};
use crate::scene::MeshData;

/// A recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Clear {
        dest: Destination,
    },
    Fullscreen {
        label: &'static str,
        program: Program,
        output: Destination,
        blend: BlendMode,
    },
    Scene {
        label: &'static str,
        output: Destination,
        mode: SceneMode,
        items: usize,
    },
    Resolve {
        source: TargetId,
        destination: TargetId,
    },
}

/// Per-category call counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    /// Shaded scene passes.
    pub scene_draws: usize,
    /// Geometry-mode scene passes (auxiliary buffer fills).
    pub geometry_draws: usize,
    /// Full-screen passes into offscreen targets.
    pub offscreen_passes: usize,
    /// Full-screen passes into the presentation surface.
    pub present_passes: usize,
    pub resolves: usize,
    pub clears: usize,
    pub allocations: usize,
    pub presents: usize,
}

impl CallCounts {
    /// Scene, effect and resolve work, excluding the final composite.
    pub fn offscreen_work(&self) -> usize {
        self.scene_draws + self.geometry_draws + self.offscreen_passes + self.resolves
    }

    fn add(&mut self, other: &CallCounts) {
        self.scene_draws += other.scene_draws;
        self.geometry_draws += other.geometry_draws;
        self.offscreen_passes += other.offscreen_passes;
        self.present_passes += other.present_passes;
        self.resolves += other.resolves;
        self.clears += other.clears;
        self.allocations += other.allocations;
        self.presents += other.presents;
    }
}

#[derive(Debug)]
struct RecordedTarget {
    desc: TargetDescriptor,
    contents: Vec<String>,
}

/// Records every call; see the module docs.
#[derive(Debug)]
pub struct RecordingBackend {
    capabilities: Capabilities,
    next_id: u64,
    targets: HashMap<TargetId, RecordedTarget>,
    meshes: usize,
    cubemaps: usize,
    surface: PhysicalSize,
    presented: String,
    in_frame: bool,
    commands: Vec<Command>,
    frame: CallCounts,
    finished: CallCounts,
    allocation_budget: Option<usize>,
    fail_next_begin: bool,
    fail_next_submit: bool,
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::with_capabilities(Capabilities::default())
    }
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            next_id: 1,
            targets: HashMap::new(),
            meshes: 0,
            cubemaps: 0,
            surface: PhysicalSize::new(1, 1),
            presented: String::new(),
            in_frame: false,
            commands: Vec::new(),
            frame: CallCounts::default(),
            finished: CallCounts::default(),
            allocation_budget: None,
            fail_next_begin: false,
            fail_next_submit: false,
        }
    }

    /// A backend without float targets or multisampling.
    pub fn basic() -> Self {
        Self::with_capabilities(Capabilities {
            advanced: false,
            max_samples: 1,
            ..Capabilities::default()
        })
    }

    /// Counts since the last `begin_frame` (or creation).
    pub fn frame_counts(&self) -> CallCounts {
        self.frame
    }

    /// Counts over the backend's whole life.
    pub fn total_counts(&self) -> CallCounts {
        let mut total = self.finished;
        total.add(&self.frame);
        total
    }

    /// Commands recorded since the last `begin_frame`.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Symbolic contents of one attachment.
    pub fn content(&self, texture: TextureRef) -> Option<&str> {
        self.targets
            .get(&texture.target)?
            .contents
            .get(texture.attachment)
            .map(String::as_str)
    }

    /// Symbolic contents of the presentation surface.
    pub fn presented(&self) -> &str {
        &self.presented
    }

    pub fn surface_size(&self) -> PhysicalSize {
        self.surface
    }

    pub fn live_targets(&self) -> usize {
        self.targets.len()
    }

    pub fn descriptor(&self, id: TargetId) -> Option<&TargetDescriptor> {
        self.targets.get(&id).map(|t| &t.desc)
    }

    /// Allow `n` more allocations, then fail every one after with
    /// `ResourceExhausted`.
    pub fn fail_allocations_after(&mut self, n: usize) {
        self.allocation_budget = Some(n);
    }

    pub fn clear_allocation_limit(&mut self) {
        self.allocation_budget = None;
    }

    pub fn fail_next_begin_frame(&mut self) {
        self.fail_next_begin = true;
    }

    pub fn fail_next_submit(&mut self) {
        self.fail_next_submit = true;
    }

    fn target(&self, id: TargetId) -> Result<&RecordedTarget> {
        self.targets
            .get(&id)
            .ok_or_else(|| RendererError::Configuration(format!("unknown target {id:?}")))
    }

    fn read(&self, binding: &Binding) -> Result<String> {
        match binding {
            Binding::CubeMap(_) => Ok("cube".to_string()),
            Binding::Texture(tex) => {
                let target = self.target(tex.target)?;
                if target.desc.sample_count > 1 {
                    return Err(RendererError::Configuration(format!(
                        "'{}' is multisampled and cannot be sampled",
                        target.desc.label
                    )));
                }
                let content = target.contents.get(tex.attachment).ok_or_else(|| {
                    RendererError::Configuration(format!(
                        "'{}' has no attachment {}",
                        target.desc.label, tex.attachment
                    ))
                })?;
                if content.is_empty() {
                    return Err(RendererError::UnpopulatedTarget(target.desc.label));
                }
                Ok(content.clone())
            }
        }
    }

    fn check_present(&self, label: &str) -> Result<()> {
        if self.in_frame {
            Ok(())
        } else {
            Err(RendererError::SurfaceError(format!("{label}: no frame in flight")))
        }
    }
}

impl GpuBackend for RecordingBackend {
    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    fn begin_frame(&mut self) -> Result<()> {
        if std::mem::take(&mut self.fail_next_begin) {
            return Err(RendererError::SurfaceError("surface lost".into()));
        }
        let frame = std::mem::take(&mut self.frame);
        self.finished.add(&frame);
        self.commands.clear();
        self.in_frame = true;
        Ok(())
    }

    fn end_frame(&mut self) -> Result<()> {
        self.check_present("end_frame")?;
        self.in_frame = false;
        if std::mem::take(&mut self.fail_next_submit) {
            return Err(RendererError::Submission("device lost".into()));
        }
        self.frame.presents += 1;
        Ok(())
    }

    fn abort_frame(&mut self) {
        self.in_frame = false;
    }

    fn resize_surface(&mut self, size: PhysicalSize) {
        self.surface = size;
    }

    fn create_target(&mut self, desc: &TargetDescriptor) -> Result<TargetId> {
        let samples = desc.sample_count;
        if samples == 0 || !samples.is_power_of_two() || samples > self.capabilities.max_samples {
            return Err(RendererError::Unsupported(format!(
                "{}: {samples}x multisampling",
                desc.label
            )));
        }
        if desc.color_formats.is_empty() {
            return Err(RendererError::Configuration(format!(
                "{}: no color attachments",
                desc.label
            )));
        }
        let max = self.capabilities.max_texture_dimension;
        if desc.width > max || desc.height > max {
            return Err(RendererError::ResourceExhausted(format!(
                "{}: {}x{} exceeds {max}",
                desc.label, desc.width, desc.height
            )));
        }
        if let Some(budget) = self.allocation_budget.as_mut() {
            if *budget == 0 {
                return Err(RendererError::ResourceExhausted(format!(
                    "{}: allocation refused",
                    desc.label
                )));
            }
            *budget -= 1;
        }

        let id = TargetId(self.next_id);
        self.next_id += 1;
        self.targets.insert(
            id,
            RecordedTarget {
                desc: desc.clone(),
                contents: vec![String::new(); desc.color_formats.len()],
            },
        );
        self.frame.allocations += 1;
        Ok(id)
    }

    fn destroy_target(&mut self, id: TargetId) {
        self.targets.remove(&id);
    }

    fn upload_mesh(&mut self, _mesh: &MeshData) -> Result<MeshId> {
        self.meshes += 1;
        Ok(MeshId(self.meshes as u64))
    }

    fn upload_cubemap(&mut self, size: u32, faces: &[Vec<u8>; 6]) -> Result<CubeMapId> {
        let expected = (size as usize) * (size as usize) * 4;
        if faces.iter().any(|f| f.len() != expected) {
            return Err(RendererError::Configuration(format!(
                "cube faces must be {expected} bytes"
            )));
        }
        self.cubemaps += 1;
        Ok(CubeMapId(self.cubemaps as u64))
    }

    fn clear(&mut self, dest: Destination, _color: Rgba) -> Result<()> {
        match dest {
            Destination::Present => {
                self.check_present("clear")?;
                self.presented = "clear".into();
            }
            Destination::Target(id) => {
                let target = self
                    .targets
                    .get_mut(&id)
                    .ok_or_else(|| RendererError::Configuration(format!("unknown target {id:?}")))?;
                for content in &mut target.contents {
                    *content = "clear".into();
                }
            }
        }
        self.frame.clears += 1;
        self.commands.push(Command::Clear { dest });
        Ok(())
    }

    fn draw_fullscreen(&mut self, pass: &FullscreenPass<'_>) -> Result<()> {
        validate_fullscreen(pass)?;

        let inputs = pass
            .inputs
            .iter()
            .map(|b| self.read(b))
            .collect::<Result<Vec<_>>>()?;
        let drawn = format!("{}({})", pass.program.name(), inputs.join(","));

        let slot: &mut String = match pass.output {
            Destination::Present => {
                self.check_present(pass.label)?;
                self.frame.present_passes += 1;
                &mut self.presented
            }
            Destination::Target(id) => {
                let target = self
                    .targets
                    .get_mut(&id)
                    .ok_or_else(|| RendererError::Configuration(format!("unknown target {id:?}")))?;
                if target.contents.len() != 1 || target.desc.sample_count != 1 {
                    return Err(RendererError::Configuration(format!(
                        "{}: full-screen output '{}' must be a single-sampled single attachment",
                        pass.label, target.desc.label
                    )));
                }
                self.frame.offscreen_passes += 1;
                &mut target.contents[0]
            }
        };

        let base = match pass.load {
            LoadAction::Clear(_) => "clear".to_string(),
            LoadAction::Load => slot.clone(),
        };
        *slot = match pass.state.blend {
            BlendMode::Replace => drawn,
            BlendMode::Alpha => format!("over({base},{drawn})"),
            BlendMode::Additive => format!("add({base},{drawn})"),
            BlendMode::Mix(_) => format!("mix({base},{drawn})"),
        };

        self.commands.push(Command::Fullscreen {
            label: pass.label,
            program: pass.program,
            output: pass.output,
            blend: pass.state.blend,
        });
        Ok(())
    }

    fn draw_scene(&mut self, pass: &ScenePass<'_>) -> Result<()> {
        let written: Vec<String> = match pass.mode {
            SceneMode::Shaded => vec!["scene".into()],
            SceneMode::Geometry => vec!["normals".into(), "depth".into()],
        };

        match pass.output {
            Destination::Present => {
                if pass.mode == SceneMode::Geometry {
                    return Err(RendererError::Configuration(
                        "geometry pass cannot target the surface".into(),
                    ));
                }
                self.check_present(pass.label)?;
                self.presented = "scene".into();
            }
            Destination::Target(id) => {
                let target = self
                    .targets
                    .get_mut(&id)
                    .ok_or_else(|| RendererError::Configuration(format!("unknown target {id:?}")))?;
                if target.contents.len() != written.len() {
                    return Err(RendererError::Configuration(format!(
                        "{}: '{}' has {} attachments, {:?} writes {}",
                        pass.label,
                        target.desc.label,
                        target.contents.len(),
                        pass.mode,
                        written.len()
                    )));
                }
                target.contents = written;
            }
        }

        match pass.mode {
            SceneMode::Shaded => self.frame.scene_draws += 1,
            SceneMode::Geometry => self.frame.geometry_draws += 1,
        }
        self.commands.push(Command::Scene {
            label: pass.label,
            output: pass.output,
            mode: pass.mode,
            items: pass.list.len(),
        });
        Ok(())
    }

    fn resolve(&mut self, source: TargetId, destination: TargetId) -> Result<()> {
        let src = self.target(source)?;
        let dst = self.target(destination)?;
        if src.desc.sample_count <= 1 || dst.desc.sample_count != 1 {
            return Err(RendererError::Configuration(format!(
                "resolve needs multisampled '{}' into single-sampled '{}'",
                src.desc.label, dst.desc.label
            )));
        }
        if src.desc.size() != dst.desc.size() || src.desc.color_formats != dst.desc.color_formats
        {
            return Err(RendererError::Configuration(format!(
                "resolve '{}' {}x{} into '{}' {}x{}: shapes differ",
                src.desc.label,
                src.desc.width,
                src.desc.height,
                dst.desc.label,
                dst.desc.width,
                dst.desc.height
            )));
        }

        let contents = src.contents.clone();
        if let Some(dst) = self.targets.get_mut(&destination) {
            dst.contents = contents;
        }
        self.frame.resolves += 1;
        self.commands.push(Command::Resolve {
            source,
            destination,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::PassState;

    fn color_target(backend: &mut RecordingBackend, label: &'static str) -> TargetId {
        backend
            .create_target(&TargetDescriptor::color(label, PhysicalSize::new(8, 8)))
            .unwrap()
    }

    fn copy(backend: &mut RecordingBackend, from: TargetId, to: TargetId) -> Result<()> {
        let inputs = [Binding::Texture(TextureRef {
            target: from,
            attachment: 0,
        })];
        backend.draw_fullscreen(&FullscreenPass {
            label: "copy",
            program: Program::Copy,
            inputs: &inputs,
            uniforms: &[0; 16],
            output: Destination::Target(to),
            load: LoadAction::Load,
            state: PassState::REPLACE,
        })
    }

    #[test]
    fn rejects_sample_counts_above_capability() {
        let mut backend = RecordingBackend::new();
        let desc = TargetDescriptor::color("msaa", PhysicalSize::new(8, 8)).with_samples(8);
        let err = backend.create_target(&desc).unwrap_err();
        assert!(matches!(err, RendererError::Unsupported(_)));
    }

    #[test]
    fn allocation_budget_runs_out() {
        let mut backend = RecordingBackend::new();
        backend.fail_allocations_after(1);
        color_target(&mut backend, "a");
        let err = backend
            .create_target(&TargetDescriptor::color("b", PhysicalSize::new(8, 8)))
            .unwrap_err();
        assert!(matches!(err, RendererError::ResourceExhausted(_)));
        assert_eq!(backend.live_targets(), 1);
    }

    #[test]
    fn reading_unwritten_target_fails() {
        let mut backend = RecordingBackend::new();
        let a = color_target(&mut backend, "a");
        let b = color_target(&mut backend, "b");
        let err = copy(&mut backend, a, b).unwrap_err();
        assert!(matches!(err, RendererError::UnpopulatedTarget("a")));
    }

    #[test]
    fn contents_follow_pass_order() {
        let mut backend = RecordingBackend::new();
        let a = color_target(&mut backend, "a");
        let b = color_target(&mut backend, "b");
        let c = color_target(&mut backend, "c");
        backend.clear(Destination::Target(a), Rgba::BLACK).unwrap();
        copy(&mut backend, a, b).unwrap();
        copy(&mut backend, b, c).unwrap();
        let content = backend.content(TextureRef {
            target: c,
            attachment: 0,
        });
        assert_eq!(content, Some("copy(copy(clear))"));
        assert_eq!(backend.frame_counts().offscreen_passes, 2);
    }

    #[test]
    fn resolve_rejects_size_mismatch() {
        let mut backend = RecordingBackend::new();
        let desc = TargetDescriptor::color("msaa", PhysicalSize::new(8, 8)).with_samples(4);
        let msaa = backend.create_target(&desc).unwrap();
        let small = backend
            .create_target(&TargetDescriptor::color("small", PhysicalSize::new(4, 4)))
            .unwrap();
        let err = backend.resolve(msaa, small).unwrap_err();
        assert!(matches!(err, RendererError::Configuration(_)));
    }

    #[test]
    fn present_requires_frame_in_flight() {
        let mut backend = RecordingBackend::new();
        let err = backend
            .clear(Destination::Present, Rgba::BLACK)
            .unwrap_err();
        assert!(matches!(err, RendererError::SurfaceError(_)));

        backend.begin_frame().unwrap();
        backend.clear(Destination::Present, Rgba::BLACK).unwrap();
        backend.end_frame().unwrap();
        assert_eq!(backend.frame_counts().presents, 1);
    }

    #[test]
    fn injected_submit_failure_skips_present() {
        let mut backend = RecordingBackend::new();
        backend.fail_next_submit();
        backend.begin_frame().unwrap();
        assert!(matches!(backend.end_frame(), Err(RendererError::Submission(_))));
        assert_eq!(backend.frame_counts().presents, 0);

        backend.begin_frame().unwrap();
        backend.end_frame().unwrap();
        assert_eq!(backend.total_counts().presents, 1);
    }

    #[test]
    fn begin_frame_resets_frame_counts() {
        let mut backend = RecordingBackend::new();
        backend.begin_frame().unwrap();
        backend.clear(Destination::Present, Rgba::BLACK).unwrap();
        backend.end_frame().unwrap();
        backend.begin_frame().unwrap();
        assert_eq!(backend.frame_counts(), CallCounts::default());
        assert_eq!(backend.total_counts().clears, 1);
    }
}
