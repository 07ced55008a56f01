use afterglow_config::schema::{EffectKind, FinalFilter};

use super::state::{FramePipeline, Offscreen, Settings, RESOLVED, SCENE};
use super::{FramePath, FrameReport};
use crate::camera::Camera;
use crate::chain::EffectChain;
use crate::effects::{Effect, EffectContext};
use crate::gbuffer::AuxiliaryGeometryBuffer;
use crate::gpu::uniforms::CopyUniforms;
use crate::gpu::{
    Binding, Destination, FullscreenPass, GpuBackend, LoadAction, PassState, PhysicalSize,
    Program, RendererError, Result, Rgba, SceneMode, ScenePass, TextureRef,
};
use crate::scene::Scene;
use crate::target::{self, RenderTarget, TargetSet};

/// The chain output of one sample.
struct Drawn<'a> {
    target: &'a RenderTarget,
    gbuffer_updated: bool,
    effects_applied: usize,
}

impl<B: GpuBackend> FramePipeline<B> {
    /// Run one tick and present it.
    ///
    /// `camera.projection` is jittered for the scene pass and restored before
    /// this returns, on success or failure. A failed tick presents nothing
    /// and restarts accumulation; the next tick runs normally.
    pub fn render(&mut self, scene: &dyn Scene, camera: &mut Camera) -> Result<FrameReport> {
        self.track_changes(scene, camera);

        if let Err(e) = self.backend.begin_frame() {
            tracing::warn!(error = %e, "frame skipped");
            return Err(e);
        }

        let result = match self.offscreen.as_mut() {
            None => draw_simple(&mut self.backend, &self.settings, scene, camera),
            Some(offscreen) => {
                offscreen.draw(&mut self.backend, &self.settings, self.size, scene, camera)
            }
        };
        let report = match result {
            Ok(report) => report,
            Err(e) => {
                self.backend.abort_frame();
                self.frame_failed(&e);
                return Err(e);
            }
        };
        if let Err(e) = self.backend.end_frame() {
            self.frame_failed(&e);
            return Err(e);
        }

        tracing::debug!(
            path = ?report.path,
            effects = report.effects_applied,
            gbuffer = report.gbuffer_updated,
            "frame presented"
        );
        Ok(report)
    }

    /// Restart accumulation when the camera or the scene moved since the
    /// previous tick.
    fn track_changes(&mut self, scene: &dyn Scene, camera: &Camera) {
        let key = (camera.projection, camera.world);
        let revision = scene.revision();
        let camera_moved = self.last_camera.is_some_and(|last| last != key);
        let scene_changed = self.last_revision.is_some_and(|last| last != revision);
        if camera_moved || scene_changed {
            tracing::debug!(camera_moved, scene_changed, "image inputs changed");
            self.mark_dirty();
        }
        self.last_camera = Some(key);
        self.last_revision = Some(revision);
    }

    fn frame_failed(&mut self, error: &RendererError) {
        tracing::error!(%error, "frame failed");
        // Whatever reached the GPU this tick is unknown; start over.
        self.mark_dirty();
    }
}

impl Offscreen {
    pub(super) fn draw(
        &mut self,
        backend: &mut dyn GpuBackend,
        settings: &Settings,
        size: PhysicalSize,
        scene: &dyn Scene,
        camera: &mut Camera,
    ) -> Result<FrameReport> {
        if settings.temporal && self.accumulator.is_finished() {
            let texture = self.accumulator.output()?;
            composite(backend, settings.final_filter, size, texture)?;
            return Ok(FrameReport {
                path: FramePath::Cached,
                gbuffer_updated: false,
                effects_applied: 0,
                texture: Some(texture),
            });
        }

        let sample = if settings.temporal {
            self.accumulator.frame_index().unwrap_or(0)
        } else {
            0
        };

        let original = camera.projection;
        if settings.temporal {
            self.accumulator
                .jitter_projection(camera, size.width, size.height);
        }
        let drawn = draw_sample(
            backend,
            &mut self.core,
            &mut self.chain,
            &mut self.gbuffer,
            &mut self.effects,
            settings,
            scene,
            camera,
            sample,
        );
        camera.projection = original;
        let drawn = drawn?;

        let (path, texture) = if settings.temporal {
            let texture = self.accumulator.sample(backend, drawn.target)?;
            (FramePath::Accumulated { sample }, texture)
        } else {
            (FramePath::Direct, drawn.target.texture()?)
        };
        composite(backend, settings.final_filter, size, texture)?;

        Ok(FrameReport {
            path,
            gbuffer_updated: drawn.gbuffer_updated,
            effects_applied: drawn.effects_applied,
            texture: Some(texture),
        })
    }
}

/// Scene pass, resolve and effect chain for one (possibly jittered) sample.
#[allow(clippy::too_many_arguments)]
fn draw_sample<'a>(
    backend: &mut dyn GpuBackend,
    core: &'a mut TargetSet,
    chain: &'a mut EffectChain,
    gbuffer: &mut AuxiliaryGeometryBuffer,
    effects: &mut [Box<dyn Effect>],
    settings: &Settings,
    scene: &dyn Scene,
    camera: &Camera,
    sample: u32,
) -> Result<Drawn<'a>> {
    let list = scene.render_list(camera);

    let needs_gbuffer = effects
        .iter()
        .any(|e| e.is_enabled() && e.requires_auxiliary_buffer());
    if needs_gbuffer {
        gbuffer.update(backend, &list, camera)?;
    }

    // The background effect supplies the base color behind the scene.
    let background = effects
        .iter()
        .any(|e| e.kind() == EffectKind::Background && e.is_enabled());
    let clear = if background {
        Rgba::TRANSPARENT
    } else {
        settings.clear_color
    };

    let scene_target = core.at_mut(SCENE)?;
    backend.draw_scene(&ScenePass {
        label: "scene",
        output: scene_target.destination(),
        clear,
        camera,
        list: &list,
        mode: SceneMode::Shaded,
    })?;
    scene_target.mark_written();

    let input_slot = if core.len() > RESOLVED {
        let (source, resolved) = core.pair_mut(SCENE, RESOLVED)?;
        target::resolve(backend, source, resolved)?;
        RESOLVED
    } else {
        SCENE
    };
    let input = core.at(input_slot)?;

    let mut ctx = EffectContext {
        backend,
        gbuffer: needs_gbuffer.then_some(&*gbuffer),
        frame_index: sample,
        upstream_varies: false,
    };
    let output = chain.run(&mut ctx, camera, effects, input)?;
    Ok(Drawn {
        target: output.target,
        gbuffer_updated: needs_gbuffer,
        effects_applied: output.applied,
    })
}

/// Direct scene render to the surface, no post-processing.
fn draw_simple(
    backend: &mut dyn GpuBackend,
    settings: &Settings,
    scene: &dyn Scene,
    camera: &Camera,
) -> Result<FrameReport> {
    let list = scene.render_list(camera);
    backend.draw_scene(&ScenePass {
        label: "direct",
        output: Destination::Present,
        clear: settings.clear_color,
        camera,
        list: &list,
        mode: SceneMode::Shaded,
    })?;
    Ok(FrameReport::simple())
}

/// Final pass onto the presentation surface.
fn composite(
    backend: &mut dyn GpuBackend,
    filter: FinalFilter,
    size: PhysicalSize,
    texture: TextureRef,
) -> Result<()> {
    let program = match filter {
        FinalFilter::Copy => Program::Copy,
        FinalFilter::Fxaa => Program::Fxaa,
    };
    let uniforms = CopyUniforms::new(size, 1.0);
    backend.draw_fullscreen(&FullscreenPass {
        label: "composite",
        program,
        inputs: &[Binding::Texture(texture)],
        uniforms: bytemuck::bytes_of(&uniforms),
        output: Destination::Present,
        load: LoadAction::Clear(Rgba::BLACK),
        state: PassState::REPLACE,
    })
}
