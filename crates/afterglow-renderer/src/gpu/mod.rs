//! GPU abstraction: the [`GpuBackend`] trait, pass descriptors, and the two
//! backends (wgpu for windows, recording for headless runs and tests).

mod backend;
mod pass;
mod recording;
mod types;
pub mod uniforms;
mod wgpu_backend;

pub use backend::*;
pub use pass::*;
pub use recording::*;
pub use types::*;
pub use wgpu_backend::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renderer_error_adapter_not_found_display() {
        let err = RendererError::AdapterNotFound;
        assert_eq!(err.to_string(), "no suitable GPU adapter found");
    }

    #[test]
    fn renderer_error_configuration_display() {
        let err = RendererError::Configuration("800x600 vs 640x480".to_string());
        assert_eq!(err.to_string(), "configuration error: 800x600 vs 640x480");
    }

    #[test]
    fn renderer_error_unpopulated_display() {
        let err = RendererError::UnpopulatedTarget("accumulation");
        assert_eq!(
            err.to_string(),
            "render target 'accumulation' sampled before it was drawn at its current size"
        );
    }

    #[test]
    fn physical_size_clamps_zero() {
        let size = PhysicalSize::new(0, 0);
        assert_eq!((size.width, size.height), (1, 1));
    }

    #[test]
    fn rgba_from_hex_falls_back() {
        assert_eq!(Rgba::from_hex_or("nope", Rgba::WHITE), Rgba::WHITE);
        let c = Rgba::from_hex_or("#ff0000", Rgba::BLACK);
        assert_eq!(c, Rgba::new(1.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn descriptor_resized_keeps_configuration() {
        let desc = TargetDescriptor::color("scene", PhysicalSize::new(4, 4))
            .with_samples(4)
            .with_depth();
        let bigger = desc.resized(800, 600);
        assert_eq!(bigger.size(), PhysicalSize::new(800, 600));
        assert_eq!(bigger.sample_count, 4);
        assert!(bigger.depth);
        assert_eq!(bigger.label, "scene");
    }
}
