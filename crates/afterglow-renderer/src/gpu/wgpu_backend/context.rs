use std::sync::Arc;
use winit::window::Window;

use crate::gpu::types::{Capabilities, PhysicalSize, RendererError};

/// Device, queue and configured surface for one window.
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub surface: wgpu::Surface<'static>,
    pub surface_config: wgpu::SurfaceConfiguration,
    pub size: PhysicalSize,
    pub capabilities: Capabilities,
}

impl GpuContext {
    /// Create instance, surface, adapter and device, then configure the
    /// surface and query what the adapter can do for the post-processing path.
    pub async fn new(window: Arc<Window>) -> Result<Self, RendererError> {
        let inner = window.inner_size();
        let size = PhysicalSize::new(inner.width, inner.height);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let surface = instance
            .create_surface(window)
            .map_err(|e| RendererError::SurfaceError(e.to_string()))?;

        let adapter = match instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface: Some(&surface),
            })
            .await
        {
            Some(a) => a,
            None => {
                tracing::warn!("no hardware GPU adapter found, trying software fallback");
                instance
                    .request_adapter(&wgpu::RequestAdapterOptions {
                        power_preference: wgpu::PowerPreference::LowPower,
                        force_fallback_adapter: true,
                        compatible_surface: Some(&surface),
                    })
                    .await
                    .ok_or(RendererError::AdapterNotFound)?
            }
        };

        let info = adapter.get_info();
        tracing::info!(
            "GPU adapter: {} ({:?}, {:?})",
            info.name,
            info.device_type,
            info.backend,
        );

        let capabilities = query_capabilities(&adapter);
        tracing::info!(
            advanced = capabilities.advanced,
            max_samples = capabilities.max_samples,
            "adapter capabilities"
        );

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("afterglow device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default().using_resolution(adapter.limits()),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await?;

        // Tone mapping produces display-referred values, so prefer a
        // non-sRGB surface to avoid a second transfer curve.
        let surface_caps = surface.get_capabilities(&adapter);
        let format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .unwrap_or(wgpu::TextureFormat::Bgra8Unorm);
        tracing::info!("surface format: {format:?}");

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode: wgpu::PresentMode::Fifo,
            desired_maximum_frame_latency: 2,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
        };
        surface.configure(&device, &surface_config);

        let capabilities = Capabilities {
            max_texture_dimension: device.limits().max_texture_dimension_2d,
            ..capabilities
        };

        Ok(Self {
            device,
            queue,
            surface,
            surface_config,
            size,
            capabilities,
        })
    }

    /// Reconfigure the surface after a window resize.
    pub fn resize(&mut self, size: PhysicalSize) {
        self.size = size;
        self.surface_config.width = size.width;
        self.surface_config.height = size.height;
        self.surface.configure(&self.device, &self.surface_config);
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.surface_config.format
    }
}

fn query_capabilities(adapter: &wgpu::Adapter) -> Capabilities {
    let features = adapter.get_texture_format_features(wgpu::TextureFormat::Rgba16Float);
    let max_samples = [8, 4, 2]
        .into_iter()
        .find(|&n| features.flags.sample_count_supported(n))
        .unwrap_or(1);

    let renderable = features
        .allowed_usages
        .contains(wgpu::TextureUsages::RENDER_ATTACHMENT);
    let resolvable = features
        .flags
        .contains(wgpu::TextureFormatFeatureFlags::MULTISAMPLE_RESOLVE);

    Capabilities {
        advanced: renderable && resolvable && max_samples > 1,
        max_samples,
        max_texture_dimension: adapter.limits().max_texture_dimension_2d,
    }
}
