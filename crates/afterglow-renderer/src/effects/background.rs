//! Solid color or environment cube behind the scene.

use std::any::Any;

use afterglow_config::schema::{BackgroundConfig, EffectKind, EffectsConfig};

use super::{Effect, EffectContext};
use crate::camera::Camera;
use crate::gpu::uniforms::CopyUniforms;
use crate::gpu::{
    Binding, CubeMapId, FullscreenPass, LoadAction, PassState, Program, Result, Rgba,
};
use crate::math::Mat4;
use crate::target::RenderTarget;

/// `SkyboxUniforms` in `skybox.wgsl`.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct SkyboxUniforms {
    inverse_projection: Mat4,
    camera_world: Mat4,
}

/// Establishes the base image: clears `output` to a color or draws the
/// environment, then composites the input over it by its alpha.
pub struct Background {
    enabled: bool,
    color: Rgba,
    environment: Option<CubeMapId>,
}

impl Background {
    pub fn new(config: &BackgroundConfig) -> Self {
        Self {
            enabled: config.enabled,
            color: Rgba::from_hex_or(&config.color, Rgba::BLACK),
            environment: None,
        }
    }

    /// Use a solid color. Drops any environment.
    pub fn set_color(&mut self, color: Rgba) {
        self.color = Rgba { a: 1.0, ..color };
        self.environment = None;
    }

    pub fn set_environment(&mut self, cube: CubeMapId) {
        self.environment = Some(cube);
    }

    /// Back to opaque black with no environment.
    pub fn clear_environment(&mut self) {
        self.color = Rgba::BLACK;
        self.environment = None;
    }

    pub fn color(&self) -> Rgba {
        self.color
    }

    pub fn environment(&self) -> Option<CubeMapId> {
        self.environment
    }

    /// Draw the backdrop into `output`, then `input` over it when given.
    pub fn render(
        &self,
        ctx: &mut EffectContext<'_>,
        camera: &Camera,
        input: Option<&RenderTarget>,
        output: &mut RenderTarget,
    ) -> Result<()> {
        match self.environment {
            Some(cube) => {
                let mut camera_world = camera.world;
                camera_world[12..15].fill(0.0);
                let uniforms = SkyboxUniforms {
                    inverse_projection: camera.inverse_projection(),
                    camera_world,
                };
                ctx.backend.draw_fullscreen(&FullscreenPass {
                    label: "skybox",
                    program: Program::Skybox,
                    inputs: &[Binding::CubeMap(cube)],
                    uniforms: bytemuck::bytes_of(&uniforms),
                    output: output.destination(),
                    load: LoadAction::Clear(self.color),
                    state: PassState::REPLACE,
                })?;
            }
            None => ctx.backend.clear(output.destination(), self.color)?,
        }
        output.mark_written();

        if let Some(input) = input {
            let uniforms = CopyUniforms::new(output.size(), 1.0);
            ctx.backend.draw_fullscreen(&FullscreenPass {
                label: "background composite",
                program: Program::Copy,
                inputs: &[Binding::Texture(input.texture()?)],
                uniforms: bytemuck::bytes_of(&uniforms),
                output: output.destination(),
                load: LoadAction::Load,
                state: PassState::ALPHA,
            })?;
        }
        Ok(())
    }
}

impl Effect for Background {
    fn kind(&self) -> EffectKind {
        EffectKind::Background
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn apply(
        &mut self,
        ctx: &mut EffectContext<'_>,
        camera: &Camera,
        input: &RenderTarget,
        output: &mut RenderTarget,
    ) -> Result<()> {
        self.render(ctx, camera, Some(input), output)
    }

    fn configure(&mut self, config: &EffectsConfig) {
        self.enabled = config.background.enabled;
        let color = Rgba::from_hex_or(&config.background.color, Rgba::BLACK);
        // A new configured color replaces the environment, same as `set_color`.
        if color != self.color {
            self.set_color(color);
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{ctx, io, run_once};
    use super::*;
    use crate::gpu::{Command, RecordingBackend};

    #[test]
    fn composites_input_over_clear() {
        let mut backend = RecordingBackend::new();
        let (input, mut output) = io(&mut backend);
        let mut bg = Background::new(&BackgroundConfig::default());
        run_once(&mut bg, &mut backend, None, 0, &input, &mut output);
        assert_eq!(
            backend.content(output.texture().unwrap()),
            Some("over(clear,copy(clear))")
        );
    }

    #[test]
    fn environment_draws_skybox() {
        let mut backend = RecordingBackend::new();
        let (_, mut output) = io(&mut backend);
        let mut bg = Background::new(&BackgroundConfig::default());
        bg.set_environment(CubeMapId(1));
        let camera = Camera::default();
        let mut context = ctx(&mut backend, None, 0);
        bg.render(&mut context, &camera, None, &mut output).unwrap();
        assert_eq!(
            backend.content(output.texture().unwrap()),
            Some("skybox(cube)")
        );
        assert!(matches!(
            backend.commands().last(),
            Some(Command::Fullscreen {
                program: Program::Skybox,
                ..
            })
        ));
    }

    #[test]
    fn set_color_drops_environment() {
        let mut bg = Background::new(&BackgroundConfig::default());
        bg.set_environment(CubeMapId(4));
        bg.set_color(Rgba::new(0.2, 0.4, 0.6, 0.0));
        assert_eq!(bg.environment(), None);
        assert_eq!(bg.color(), Rgba::new(0.2, 0.4, 0.6, 1.0));
        bg.clear_environment();
        assert_eq!(bg.color(), Rgba::BLACK);
    }

    #[test]
    fn configure_reads_hex_color() {
        let mut bg = Background::new(&BackgroundConfig::default());
        let mut config = EffectsConfig::default();
        config.background.enabled = true;
        config.background.color = "#ffffff".into();
        bg.configure(&config);
        assert!(bg.is_enabled());
        assert_eq!(bg.color(), Rgba::WHITE);
    }

    #[test]
    fn configure_with_new_color_drops_environment() {
        let mut bg = Background::new(&BackgroundConfig::default());
        let mut config = EffectsConfig::default();
        config.background.color = "#ff0000".into();

        bg.set_environment(CubeMapId(2));
        bg.configure(&EffectsConfig::default());
        assert_eq!(bg.environment(), Some(CubeMapId(2)));

        bg.configure(&config);
        assert_eq!(bg.environment(), None);
        assert_eq!(bg.color(), Rgba::new(1.0, 0.0, 0.0, 1.0));
    }
}
