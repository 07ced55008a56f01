//! Render-list drawing for the shaded and geometry scene passes.

use std::collections::HashMap;

use wgpu::util::DeviceExt;

use super::targets::{GpuMesh, DEPTH_FORMAT};
use crate::camera::Camera;
use crate::gpu::pass::SceneMode;
use crate::gpu::types::{MeshId, RendererError, Rgba};
use crate::math::Mat4;
use crate::scene::{DrawItem, RenderList, Vertex};

/// Per-draw uniforms matching `SceneUniforms` in `scene.wgsl`.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct SceneUniforms {
    model: Mat4,
    view: Mat4,
    projection: Mat4,
    color: [f32; 4],
    /// x = gloss, yzw unused.
    params: [f32; 4],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct SceneKey {
    mode: SceneMode,
    transparent: bool,
    format: wgpu::TextureFormat,
    samples: u32,
}

/// Color attachments and depth of one scene pass.
pub(super) struct SceneOutput<'a> {
    pub views: &'a [wgpu::TextureView],
    pub format: wgpu::TextureFormat,
    pub samples: u32,
    pub depth: &'a wgpu::TextureView,
}

pub(super) struct ScenePipelines {
    module: wgpu::ShaderModule,
    bind_group_layout: wgpu::BindGroupLayout,
    layout: wgpu::PipelineLayout,
    pipelines: HashMap<SceneKey, wgpu::RenderPipeline>,
}

impl ScenePipelines {
    pub fn new(device: &wgpu::Device) -> Self {
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("scene shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../../shaders/scene.wgsl").into()),
        });
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("scene bind group layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: std::num::NonZeroU64::new(
                        std::mem::size_of::<SceneUniforms>() as u64,
                    ),
                },
                count: None,
            }],
        });
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        Self {
            module,
            bind_group_layout,
            layout,
            pipelines: HashMap::new(),
        }
    }

    fn prepare(&mut self, device: &wgpu::Device, key: SceneKey) {
        if self.pipelines.contains_key(&key) {
            return;
        }

        let geometry_targets = [
            Some(wgpu::ColorTargetState {
                format: wgpu::TextureFormat::Rgba16Float,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            }),
            Some(wgpu::ColorTargetState {
                format: wgpu::TextureFormat::R32Float,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            }),
        ];
        let shaded_target = [Some(wgpu::ColorTargetState {
            format: key.format,
            blend: key
                .transparent
                .then_some(wgpu::BlendState::ALPHA_BLENDING),
            write_mask: wgpu::ColorWrites::ALL,
        })];
        let (entry, targets): (&str, &[Option<wgpu::ColorTargetState>]) = match key.mode {
            SceneMode::Shaded => ("fs_shaded", &shaded_target),
            SceneMode::Geometry => ("fs_geometry", &geometry_targets),
        };

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(entry),
            layout: Some(&self.layout),
            vertex: wgpu::VertexState {
                module: &self.module,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::LAYOUT],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &self.module,
                entry_point: Some(entry),
                targets,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                cull_mode: (!key.transparent).then_some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: !key.transparent,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: key.samples,
                ..Default::default()
            },
            multiview: None,
            cache: None,
        });
        self.pipelines.insert(key, pipeline);
    }

    /// Record one scene pass into `encoder`.
    #[allow(clippy::too_many_arguments)]
    pub fn record(
        &mut self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        meshes: &HashMap<MeshId, GpuMesh>,
        output: SceneOutput<'_>,
        label: &str,
        clear: Rgba,
        camera: &Camera,
        list: &RenderList,
        mode: SceneMode,
    ) -> Result<(), RendererError> {
        let expected = match mode {
            SceneMode::Shaded => 1,
            SceneMode::Geometry => 2,
        };
        if output.views.len() != expected {
            return Err(RendererError::Configuration(format!(
                "{label}: {mode:?} pass writes {expected} attachments, target has {}",
                output.views.len()
            )));
        }

        let opaque_key = SceneKey {
            mode,
            transparent: false,
            format: output.format,
            samples: output.samples,
        };
        let transparent_key = SceneKey {
            transparent: true,
            ..opaque_key
        };
        self.prepare(device, opaque_key);
        if mode == SceneMode::Shaded && !list.transparent.is_empty() {
            self.prepare(device, transparent_key);
        }

        let view = camera.view();
        let mut batches: Vec<(&wgpu::RenderPipeline, Vec<(wgpu::BindGroup, &GpuMesh)>)> =
            Vec::with_capacity(2);
        let mut batch = |key: SceneKey, items: &[DrawItem]| -> Result<(), RendererError> {
            let Some(pipeline) = self.pipelines.get(&key) else {
                return Ok(());
            };
            let mut draws = Vec::with_capacity(items.len());
            for item in items {
                let mesh = meshes.get(&item.mesh).ok_or_else(|| {
                    RendererError::Configuration(format!("{label}: unknown mesh {:?}", item.mesh))
                })?;
                let uniforms = SceneUniforms {
                    model: item.model,
                    view,
                    projection: camera.projection,
                    color: item.color.to_array(),
                    params: [item.gloss, 0.0, 0.0, 0.0],
                };
                let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("scene uniforms"),
                    contents: bytemuck::bytes_of(&uniforms),
                    usage: wgpu::BufferUsages::UNIFORM,
                });
                let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("scene bind group"),
                    layout: &self.bind_group_layout,
                    entries: &[wgpu::BindGroupEntry {
                        binding: 0,
                        resource: buffer.as_entire_binding(),
                    }],
                });
                draws.push((bind_group, mesh));
            }
            batches.push((pipeline, draws));
            Ok(())
        };

        batch(opaque_key, &list.opaque)?;
        if mode == SceneMode::Shaded {
            batch(transparent_key, &list.transparent)?;
        }

        let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment<'_>>> = output
            .views
            .iter()
            .enumerate()
            .map(|(i, view)| {
                let clear = if i == 0 { clear } else { Rgba::TRANSPARENT };
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

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &color_attachments,
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: output.depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Discard,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        for (pipeline, draws) in &batches {
            pass.set_pipeline(pipeline);
            for (bind_group, mesh) in draws {
                pass.set_bind_group(0, bind_group, &[]);
                pass.set_vertex_buffer(0, mesh.vertices.slice(..));
                pass.set_index_buffer(mesh.indices.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..mesh.index_count, 0, 0..1);
            }
        }
        Ok(())
    }
}
