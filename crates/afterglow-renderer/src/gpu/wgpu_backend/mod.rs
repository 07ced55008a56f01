//! [`GpuBackend`] on top of wgpu.

mod context;
mod pipelines;
mod scene;
mod targets;

pub use context::GpuContext;

use std::collections::HashMap;
use std::sync::Arc;

use wgpu::util::DeviceExt;
use winit::window::Window;

use self::pipelines::FullscreenPipelines;
use self::scene::{SceneOutput, ScenePipelines};
use self::targets::{GpuMesh, GpuTarget};
use super::backend::GpuBackend;
use super::pass::{validate_fullscreen, Binding, BlendMode, FullscreenPass, LoadAction, ScenePass};
use super::types::{
    Capabilities, CubeMapId, Destination, MeshId, PhysicalSize, RendererError, Result, Rgba,
    TargetDescriptor, TargetId,
};
use crate::scene::MeshData;

/// Renders into a window surface through wgpu.
///
/// One command encoder is open between `begin_frame` and `end_frame`; every
/// pass is recorded into it and submitted in a single batch.
pub struct WgpuBackend {
    ctx: GpuContext,
    targets: HashMap<TargetId, GpuTarget>,
    meshes: HashMap<MeshId, GpuMesh>,
    cubemaps: HashMap<CubeMapId, wgpu::TextureView>,
    fullscreen: FullscreenPipelines,
    scene: ScenePipelines,
    surface_depth: wgpu::TextureView,
    encoder: Option<wgpu::CommandEncoder>,
    frame: Option<(wgpu::SurfaceTexture, wgpu::TextureView)>,
    next_id: u64,
}

impl WgpuBackend {
    pub async fn new(window: Arc<Window>) -> Result<Self> {
        let ctx = GpuContext::new(window).await?;
        let fullscreen = FullscreenPipelines::new(&ctx.device);
        let scene = ScenePipelines::new(&ctx.device);
        let surface_depth = targets::surface_depth(&ctx.device, ctx.size.width, ctx.size.height);
        Ok(Self {
            ctx,
            targets: HashMap::new(),
            meshes: HashMap::new(),
            cubemaps: HashMap::new(),
            fullscreen,
            scene,
            surface_depth,
            encoder: None,
            frame: None,
            next_id: 1,
        })
    }

    pub fn context(&self) -> &GpuContext {
        &self.ctx
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn acquire(&mut self) -> Result<wgpu::SurfaceTexture> {
        match self.ctx.surface.get_current_texture() {
            Ok(frame) => Ok(frame),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::debug!("surface lost or outdated, reconfiguring");
                let size = self.ctx.size;
                self.ctx.resize(size);
                Ok(self.ctx.surface.get_current_texture()?)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn target(&self, id: TargetId) -> Result<&GpuTarget> {
        self.targets
            .get(&id)
            .ok_or_else(|| RendererError::Configuration(format!("unknown target {id:?}")))
    }

    /// Format of the single-sampled, single-attachment surface a full-screen pass writes.
    fn fullscreen_format(&self, dest: Destination, label: &str) -> Result<wgpu::TextureFormat> {
        match dest {
            Destination::Present => Ok(self.ctx.format()),
            Destination::Target(id) => {
                let target = self.target(id)?;
                if target.desc.sample_count != 1 || target.formats.len() != 1 {
                    return Err(RendererError::Configuration(format!(
                        "{label}: output '{}' must be single-sampled with one attachment",
                        target.desc.label
                    )));
                }
                Ok(target.formats[0])
            }
        }
    }

    fn with_encoder<T>(
        &mut self,
        record: impl FnOnce(&mut Self, &mut wgpu::CommandEncoder) -> Result<T>,
    ) -> Result<T> {
        let mut encoder = self
            .encoder
            .take()
            .ok_or_else(|| RendererError::Submission("no frame in progress".into()))?;
        let result = record(self, &mut encoder);
        self.encoder = Some(encoder);
        result
    }
}

fn present_view<'a>(
    frame: &'a Option<(wgpu::SurfaceTexture, wgpu::TextureView)>,
) -> Result<&'a wgpu::TextureView> {
    frame
        .as_ref()
        .map(|(_, view)| view)
        .ok_or_else(|| RendererError::Submission("surface not acquired".into()))
}

impl GpuBackend for WgpuBackend {
    fn capabilities(&self) -> &Capabilities {
        &self.ctx.capabilities
    }

    fn begin_frame(&mut self) -> Result<()> {
        if self.encoder.is_some() {
            tracing::warn!("begin_frame with a frame in progress, discarding it");
            self.abort_frame();
        }
        let frame = self.acquire()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.frame = Some((frame, view));
        self.encoder = Some(
            self.ctx
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("frame encoder"),
                }),
        );
        Ok(())
    }

    fn end_frame(&mut self) -> Result<()> {
        let encoder = self
            .encoder
            .take()
            .ok_or_else(|| RendererError::Submission("end_frame without begin_frame".into()))?;
        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        if let Some((frame, _)) = self.frame.take() {
            frame.present();
        }
        Ok(())
    }

    fn abort_frame(&mut self) {
        self.encoder = None;
        self.frame = None;
    }

    fn resize_surface(&mut self, size: PhysicalSize) {
        self.ctx.resize(size);
        self.surface_depth = targets::surface_depth(&self.ctx.device, size.width, size.height);
    }

    fn create_target(&mut self, desc: &TargetDescriptor) -> Result<TargetId> {
        let caps = &self.ctx.capabilities;
        if !desc.sample_count.is_power_of_two() || desc.sample_count > caps.max_samples {
            return Err(RendererError::Unsupported(format!(
                "{}: {} samples (max {})",
                desc.label, desc.sample_count, caps.max_samples
            )));
        }
        if desc.width > caps.max_texture_dimension || desc.height > caps.max_texture_dimension {
            return Err(RendererError::ResourceExhausted(format!(
                "{}: {}x{} exceeds {}",
                desc.label, desc.width, desc.height, caps.max_texture_dimension
            )));
        }
        if desc.color_formats.is_empty() {
            return Err(RendererError::Configuration(format!(
                "{}: target needs at least one color attachment",
                desc.label
            )));
        }

        let device = &self.ctx.device;
        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let target = GpuTarget::new(device, desc);
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(RendererError::ResourceExhausted(format!("{}: {err}", desc.label)));
        }

        let id = TargetId(self.next_id());
        tracing::debug!(
            label = desc.label,
            width = desc.width,
            height = desc.height,
            samples = desc.sample_count,
            "allocated render target"
        );
        self.targets.insert(id, target);
        Ok(id)
    }

    fn destroy_target(&mut self, id: TargetId) {
        self.targets.remove(&id);
    }

    fn upload_mesh(&mut self, mesh: &MeshData) -> Result<MeshId> {
        let gpu = GpuMesh::new(&self.ctx.device, mesh)?;
        let id = MeshId(self.next_id());
        self.meshes.insert(id, gpu);
        Ok(id)
    }

    fn upload_cubemap(&mut self, size: u32, faces: &[Vec<u8>; 6]) -> Result<CubeMapId> {
        let view = targets::create_cubemap(&self.ctx.device, &self.ctx.queue, size, faces)?;
        let id = CubeMapId(self.next_id());
        self.cubemaps.insert(id, view);
        Ok(id)
    }

    fn clear(&mut self, dest: Destination, color: Rgba) -> Result<()> {
        self.with_encoder(|this, encoder| {
            let (views, depth): (Vec<&wgpu::TextureView>, Option<&wgpu::TextureView>) = match dest
            {
                Destination::Present => {
                    (vec![present_view(&this.frame)?], Some(&this.surface_depth))
                }
                Destination::Target(id) => {
                    let target = this.target(id)?;
                    (target.views.iter().collect(), target.depth.as_ref())
                }
            };
            let color_attachments: Vec<_> = views
                .into_iter()
                .enumerate()
                .map(|(i, view)| {
                    let clear = if i == 0 { color } else { Rgba::TRANSPARENT };
                    Some(wgpu::RenderPassColorAttachment {
                        view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(clear.to_wgpu()),
                            store: wgpu::StoreOp::Store,
                        },
                    })
                })
                .collect();
            encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("clear"),
                color_attachments: &color_attachments,
                depth_stencil_attachment: depth.map(|view| {
                    wgpu::RenderPassDepthStencilAttachment {
                        view,
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(1.0),
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            Ok(())
        })
    }

    fn draw_fullscreen(&mut self, pass: &FullscreenPass<'_>) -> Result<()> {
        validate_fullscreen(pass)?;
        let format = self.fullscreen_format(pass.output, pass.label)?;
        self.fullscreen
            .prepare(&self.ctx.device, pass.program, format, pass.state.blend);

        self.with_encoder(|this, encoder| {
            let device = &this.ctx.device;

            let mut views = Vec::with_capacity(pass.inputs.len());
            for binding in pass.inputs {
                let view = match binding {
                    Binding::Texture(tex) => {
                        let target = this.target(tex.target)?;
                        if target.desc.sample_count != 1 {
                            return Err(RendererError::Configuration(format!(
                                "{}: cannot sample multisampled target '{}'",
                                pass.label, target.desc.label
                            )));
                        }
                        target.views.get(tex.attachment).ok_or_else(|| {
                            RendererError::Configuration(format!(
                                "{}: '{}' has no attachment {}",
                                pass.label, target.desc.label, tex.attachment
                            ))
                        })?
                    }
                    Binding::CubeMap(id) => this.cubemaps.get(id).ok_or_else(|| {
                        RendererError::Configuration(format!("{}: unknown cube map", pass.label))
                    })?,
                };
                views.push(view);
            }

            // Uniform blocks are padded to 16 bytes, and an empty block still binds.
            let mut uniforms = pass.uniforms.to_vec();
            let padded = uniforms.len().max(16).next_multiple_of(16);
            uniforms.resize(padded, 0);
            let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(pass.label),
                contents: &uniforms,
                usage: wgpu::BufferUsages::UNIFORM,
            });

            let layout = this
                .fullscreen
                .bind_group_layout(pass.program)
                .ok_or_else(|| RendererError::Configuration("pipeline not prepared".into()))?;
            let pipeline = this
                .fullscreen
                .get(pass.program, format, pass.state.blend)
                .ok_or_else(|| RendererError::Configuration("pipeline not prepared".into()))?;

            let mut entries = vec![
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&this.fullscreen.linear_sampler),
                },
            ];
            for (i, view) in views.iter().enumerate() {
                entries.push(wgpu::BindGroupEntry {
                    binding: 2 + i as u32,
                    resource: wgpu::BindingResource::TextureView(view),
                });
            }
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(pass.label),
                layout,
                entries: &entries,
            });

            let output = match pass.output {
                Destination::Present => present_view(&this.frame)?,
                Destination::Target(id) => &this.target(id)?.views[0],
            };
            let load = match pass.load {
                LoadAction::Clear(color) => wgpu::LoadOp::Clear(color.to_wgpu()),
                LoadAction::Load => wgpu::LoadOp::Load,
            };

            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(pass.label),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: output,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            render_pass.set_pipeline(pipeline);
            if let BlendMode::Mix(weight) = pass.state.blend {
                let w = weight as f64;
                render_pass.set_blend_constant(wgpu::Color {
                    r: w,
                    g: w,
                    b: w,
                    a: w,
                });
            }
            render_pass.set_bind_group(0, &bind_group, &[]);
            render_pass.draw(0..3, 0..1);
            Ok(())
        })
    }

    fn draw_scene(&mut self, pass: &ScenePass<'_>) -> Result<()> {
        self.with_encoder(|this, encoder| {
            let output = match pass.output {
                Destination::Present => SceneOutput {
                    views: std::slice::from_ref(present_view(&this.frame)?),
                    format: this.ctx.surface_config.format,
                    samples: 1,
                    depth: &this.surface_depth,
                },
                Destination::Target(id) => {
                    let target = this.targets.get(&id).ok_or_else(|| {
                        RendererError::Configuration(format!("unknown target {id:?}"))
                    })?;
                    let depth = target.depth.as_ref().ok_or_else(|| {
                        RendererError::Configuration(format!(
                            "{}: scene target '{}' has no depth buffer",
                            pass.label, target.desc.label
                        ))
                    })?;
                    SceneOutput {
                        views: &target.views,
                        format: target.formats[0],
                        samples: target.desc.sample_count,
                        depth,
                    }
                }
            };
            this.scene.record(
                &this.ctx.device,
                encoder,
                &this.meshes,
                output,
                pass.label,
                pass.clear,
                pass.camera,
                pass.list,
                pass.mode,
            )
        })
    }

    fn resolve(&mut self, source: TargetId, destination: TargetId) -> Result<()> {
        self.with_encoder(|this, encoder| {
            let src = this.target(source)?;
            let dst = this.target(destination)?;
            if src.desc.sample_count == 1 || dst.desc.sample_count != 1 {
                return Err(RendererError::Configuration(format!(
                    "resolve '{}' -> '{}' needs multisampled source and single-sampled destination",
                    src.desc.label, dst.desc.label
                )));
            }
            if src.desc.size() != dst.desc.size() || src.formats != dst.formats {
                return Err(RendererError::Configuration(format!(
                    "resolve '{}' -> '{}' with mismatched size or formats",
                    src.desc.label, dst.desc.label
                )));
            }

            let color_attachments: Vec<_> = src
                .views
                .iter()
                .zip(&dst.views)
                .map(|(view, resolve)| {
                    Some(wgpu::RenderPassColorAttachment {
                        view,
                        resolve_target: Some(resolve),
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })
                })
                .collect();
            encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("resolve"),
                color_attachments: &color_attachments,
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            Ok(())
        })
    }
}
