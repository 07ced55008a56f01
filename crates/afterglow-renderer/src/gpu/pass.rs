//! Pass descriptors handed to a [`GpuBackend`](super::GpuBackend).
//!
//! Every pass carries its complete pipeline state. Nothing set by one pass
//! survives into the next, so an effect can never inherit a blend mode from
//! its predecessor in the chain.

use super::types::{CubeMapId, Destination, RendererError, Result, Rgba, TargetId, TextureRef};
use crate::camera::Camera;
use crate::scene::RenderList;

/// How a program reads one of its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// 2D texture sampled through the linear sampler.
    Filterable,
    /// 2D float texture read with `textureLoad` only.
    Unfilterable,
    Cube,
}

/// Full-screen shader programs.
///
/// Bindings are laid out as: uniforms at 0, the linear sampler at 1, then
/// inputs from 2 upward in the order [`Program::inputs`] lists them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Program {
    Copy,
    Fxaa,
    /// Bloom bright pass.
    LuminosityHighPass,
    GaussianBlurH,
    GaussianBlurV,
    BloomComposite,
    Ssao,
    Ssr,
    EdgeAwareBlurH,
    EdgeAwareBlurV,
    MultiplyBlend,
    AdditiveBlend,
    ToneMapping,
    Vignette,
    Skybox,
}

impl Program {
    pub fn inputs(&self) -> &'static [InputKind] {
        use InputKind::*;
        match self {
            Program::Copy
            | Program::Fxaa
            | Program::LuminosityHighPass
            | Program::GaussianBlurH
            | Program::GaussianBlurV
            | Program::ToneMapping
            | Program::Vignette => &[Filterable],
            Program::BloomComposite | Program::MultiplyBlend | Program::AdditiveBlend => {
                &[Filterable, Filterable]
            }
            Program::Ssao => &[Filterable, Unfilterable],
            Program::Ssr | Program::EdgeAwareBlurH | Program::EdgeAwareBlurV => {
                &[Filterable, Filterable, Unfilterable]
            }
            Program::Skybox => &[Cube],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Program::Copy => "copy",
            Program::Fxaa => "fxaa",
            Program::LuminosityHighPass => "threshold",
            Program::GaussianBlurH => "blur_h",
            Program::GaussianBlurV => "blur_v",
            Program::BloomComposite => "bloom",
            Program::Ssao => "ssao",
            Program::Ssr => "ssr",
            Program::EdgeAwareBlurH => "edge_blur_h",
            Program::EdgeAwareBlurV => "edge_blur_v",
            Program::MultiplyBlend => "multiply",
            Program::AdditiveBlend => "additive",
            Program::ToneMapping => "tone_mapping",
            Program::Vignette => "vignette",
            Program::Skybox => "skybox",
        }
    }
}

/// A texture or cube map bound as a program input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Texture(TextureRef),
    CubeMap(CubeMapId),
}

impl Binding {
    fn target(&self) -> Option<TargetId> {
        match self {
            Binding::Texture(t) => Some(t.target),
            Binding::CubeMap(_) => None,
        }
    }
}

/// Output blend equation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BlendMode {
    /// Overwrite destination.
    Replace,
    /// Source-over using source alpha.
    Alpha,
    Additive,
    /// `src * weight + dst * (1 - weight)` on every channel.
    Mix(f32),
}

impl BlendMode {
    /// Pipeline-cache discriminant; `Mix` weight is a dynamic blend constant.
    pub(crate) fn key(&self) -> u8 {
        match self {
            BlendMode::Replace => 0,
            BlendMode::Alpha => 1,
            BlendMode::Additive => 2,
            BlendMode::Mix(_) => 3,
        }
    }
}

/// Pipeline state for a pass. Depth testing is always off for full-screen passes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassState {
    pub blend: BlendMode,
}

impl PassState {
    pub const REPLACE: Self = Self {
        blend: BlendMode::Replace,
    };
    pub const ALPHA: Self = Self {
        blend: BlendMode::Alpha,
    };

    pub fn mix(weight: f32) -> Self {
        Self {
            blend: BlendMode::Mix(weight),
        }
    }
}

/// What happens to the destination before the pass draws.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoadAction {
    Clear(Rgba),
    Load,
}

/// A full-screen triangle draw.
#[derive(Debug, Clone, Copy)]
pub struct FullscreenPass<'a> {
    pub label: &'static str,
    pub program: Program,
    pub inputs: &'a [Binding],
    /// Raw bytes of the program's uniform block.
    pub uniforms: &'a [u8],
    pub output: Destination,
    pub load: LoadAction,
    pub state: PassState,
}

/// How the scene is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneMode {
    /// Lit color into attachment 0, opaque then transparent.
    Shaded,
    /// Opaque geometry only: view normal + gloss into attachment 0, linear
    /// depth into attachment 1.
    Geometry,
}

/// A render-list draw.
#[derive(Debug, Clone, Copy)]
pub struct ScenePass<'a> {
    pub label: &'static str,
    pub output: Destination,
    pub clear: Rgba,
    pub camera: &'a Camera,
    pub list: &'a RenderList,
    pub mode: SceneMode,
}

/// Reject passes the GPU would choke on before they reach a backend.
pub fn validate_fullscreen(pass: &FullscreenPass<'_>) -> Result<()> {
    let expected = pass.program.inputs();
    if pass.inputs.len() != expected.len() {
        return Err(RendererError::Configuration(format!(
            "{}: program {} takes {} inputs, got {}",
            pass.label,
            pass.program.name(),
            expected.len(),
            pass.inputs.len()
        )));
    }

    for (binding, kind) in pass.inputs.iter().zip(expected) {
        let matches = matches!(
            (binding, kind),
            (Binding::CubeMap(_), InputKind::Cube)
                | (Binding::Texture(_), InputKind::Filterable | InputKind::Unfilterable)
        );
        if !matches {
            return Err(RendererError::Configuration(format!(
                "{}: binding {binding:?} does not fit {kind:?}",
                pass.label
            )));
        }
    }

    if let Destination::Target(out) = pass.output {
        if pass.inputs.iter().any(|b| b.target() == Some(out)) {
            return Err(RendererError::Configuration(format!(
                "{}: reads and writes the same target",
                pass.label
            )));
        }
    }

    if let BlendMode::Mix(w) = pass.state.blend {
        if !(0.0..=1.0).contains(&w) {
            return Err(RendererError::Configuration(format!(
                "{}: mix weight {w} outside [0, 1]",
                pass.label
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tex(id: u64) -> Binding {
        Binding::Texture(TextureRef {
            target: TargetId(id),
            attachment: 0,
        })
    }

    fn pass<'a>(
        program: Program,
        inputs: &'a [Binding],
        output: Destination,
    ) -> FullscreenPass<'a> {
        FullscreenPass {
            label: "test",
            program,
            inputs,
            uniforms: &[0; 16],
            output,
            load: LoadAction::Load,
            state: PassState::REPLACE,
        }
    }

    #[test]
    fn accepts_well_formed_pass() {
        let inputs = [tex(1)];
        let p = pass(Program::Copy, &inputs, Destination::Present);
        assert!(validate_fullscreen(&p).is_ok());
    }

    #[test]
    fn rejects_wrong_input_count() {
        let inputs = [tex(1)];
        let p = pass(Program::BloomComposite, &inputs, Destination::Present);
        let err = validate_fullscreen(&p).unwrap_err();
        assert!(matches!(err, RendererError::Configuration(_)));
    }

    #[test]
    fn rejects_aliased_read_write() {
        let inputs = [tex(7)];
        let p = pass(Program::Vignette, &inputs, Destination::Target(TargetId(7)));
        let err = validate_fullscreen(&p).unwrap_err();
        assert!(err.to_string().contains("same target"));
    }

    #[test]
    fn rejects_texture_where_cube_expected() {
        let inputs = [tex(1)];
        let p = pass(Program::Skybox, &inputs, Destination::Target(TargetId(2)));
        assert!(validate_fullscreen(&p).is_err());
    }

    #[test]
    fn rejects_out_of_range_mix_weight() {
        let inputs = [tex(1)];
        let mut p = pass(Program::Copy, &inputs, Destination::Target(TargetId(2)));
        p.state = PassState::mix(1.5);
        assert!(validate_fullscreen(&p).is_err());
    }

    #[test]
    fn every_program_has_at_least_one_input() {
        for program in [
            Program::Copy,
            Program::Fxaa,
            Program::LuminosityHighPass,
            Program::GaussianBlurH,
            Program::GaussianBlurV,
            Program::BloomComposite,
            Program::Ssao,
            Program::Ssr,
            Program::EdgeAwareBlurH,
            Program::EdgeAwareBlurV,
            Program::MultiplyBlend,
            Program::AdditiveBlend,
            Program::ToneMapping,
            Program::Vignette,
            Program::Skybox,
        ] {
            assert!(!program.inputs().is_empty(), "{}", program.name());
        }
    }
}
