//! Lazily built full-screen pipelines, keyed by program, output format and
//! blend equation.

use std::collections::HashMap;

use crate::gpu::pass::{BlendMode, InputKind, Program};

const FULLSCREEN: &str = include_str!("../../shaders/fullscreen.wgsl");
const COPY: &str = include_str!("../../shaders/copy.wgsl");
const BLOOM: &str = include_str!("../../shaders/bloom.wgsl");
const SSAO: &str = include_str!("../../shaders/ssao.wgsl");
const SSR: &str = include_str!("../../shaders/ssr.wgsl");
const EDGE_BLUR: &str = include_str!("../../shaders/edge_blur.wgsl");
const BLEND: &str = include_str!("../../shaders/blend.wgsl");
const GRADE: &str = include_str!("../../shaders/grade.wgsl");
const SKYBOX: &str = include_str!("../../shaders/skybox.wgsl");

/// Shader module and fragment entry point for a program.
fn shader_for(program: Program) -> (&'static str, &'static str, &'static str) {
    match program {
        Program::Copy => ("copy", COPY, "fs_copy"),
        Program::Fxaa => ("copy", COPY, "fs_fxaa"),
        Program::LuminosityHighPass => ("bloom", BLOOM, "fs_threshold"),
        Program::GaussianBlurH => ("bloom", BLOOM, "fs_blur_h"),
        Program::GaussianBlurV => ("bloom", BLOOM, "fs_blur_v"),
        Program::BloomComposite => ("bloom", BLOOM, "fs_composite"),
        Program::Ssao => ("ssao", SSAO, "fs_ssao"),
        Program::Ssr => ("ssr", SSR, "fs_ssr"),
        Program::EdgeAwareBlurH => ("edge_blur", EDGE_BLUR, "fs_blur_h"),
        Program::EdgeAwareBlurV => ("edge_blur", EDGE_BLUR, "fs_blur_v"),
        Program::MultiplyBlend => ("blend", BLEND, "fs_multiply"),
        Program::AdditiveBlend => ("blend", BLEND, "fs_additive"),
        Program::ToneMapping => ("grade", GRADE, "fs_tone_mapping"),
        Program::Vignette => ("grade", GRADE, "fs_vignette"),
        Program::Skybox => ("skybox", SKYBOX, "fs_skybox"),
    }
}

fn blend_state(blend: BlendMode) -> Option<wgpu::BlendState> {
    let equal = |src, dst| {
        let component = wgpu::BlendComponent {
            src_factor: src,
            dst_factor: dst,
            operation: wgpu::BlendOperation::Add,
        };
        wgpu::BlendState {
            color: component,
            alpha: component,
        }
    };
    match blend {
        BlendMode::Replace => None,
        BlendMode::Alpha => Some(wgpu::BlendState::ALPHA_BLENDING),
        BlendMode::Additive => Some(equal(wgpu::BlendFactor::One, wgpu::BlendFactor::One)),
        BlendMode::Mix(_) => Some(equal(
            wgpu::BlendFactor::Constant,
            wgpu::BlendFactor::OneMinusConstant,
        )),
    }
}

type PipelineKey = (Program, wgpu::TextureFormat, u8);

pub(super) struct FullscreenPipelines {
    modules: HashMap<&'static str, wgpu::ShaderModule>,
    layouts: HashMap<Program, (wgpu::BindGroupLayout, wgpu::PipelineLayout)>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    pub linear_sampler: wgpu::Sampler,
}

impl FullscreenPipelines {
    pub fn new(device: &wgpu::Device) -> Self {
        let linear_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("post linear sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        Self {
            modules: HashMap::new(),
            layouts: HashMap::new(),
            pipelines: HashMap::new(),
            linear_sampler,
        }
    }

    /// Build whatever is missing for this combination. Must precede
    /// [`get`](Self::get) and [`bind_group_layout`](Self::bind_group_layout).
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        program: Program,
        format: wgpu::TextureFormat,
        blend: BlendMode,
    ) {
        let key = (program, format, blend.key());
        if self.pipelines.contains_key(&key) {
            return;
        }

        let (module_name, source, entry) = shader_for(program);
        let module: &wgpu::ShaderModule = self.modules.entry(module_name).or_insert_with(|| {
            tracing::debug!("compiling {module_name} shader");
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(module_name),
                source: wgpu::ShaderSource::Wgsl(format!("{FULLSCREEN}\n{source}").into()),
            })
        });

        let (_, pipeline_layout): &(wgpu::BindGroupLayout, wgpu::PipelineLayout) = self
            .layouts
            .entry(program)
            .or_insert_with(|| create_layouts(device, program));

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(program.name()),
            layout: Some(pipeline_layout),
            vertex: wgpu::VertexState {
                module,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module,
                entry_point: Some(entry),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: blend_state(blend),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });
        self.pipelines.insert(key, pipeline);
    }

    pub fn get(
        &self,
        program: Program,
        format: wgpu::TextureFormat,
        blend: BlendMode,
    ) -> Option<&wgpu::RenderPipeline> {
        self.pipelines.get(&(program, format, blend.key()))
    }

    pub fn bind_group_layout(&self, program: Program) -> Option<&wgpu::BindGroupLayout> {
        self.layouts.get(&program).map(|(bgl, _)| bgl)
    }
}

fn create_layouts(
    device: &wgpu::Device,
    program: Program,
) -> (wgpu::BindGroupLayout, wgpu::PipelineLayout) {
    let mut entries = vec![
        wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        },
        wgpu::BindGroupLayoutEntry {
            binding: 1,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        },
    ];

    for (i, kind) in program.inputs().iter().enumerate() {
        let (filterable, view_dimension) = match kind {
            InputKind::Filterable => (true, wgpu::TextureViewDimension::D2),
            InputKind::Unfilterable => (false, wgpu::TextureViewDimension::D2),
            InputKind::Cube => (true, wgpu::TextureViewDimension::Cube),
        };
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: 2 + i as u32,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable },
                view_dimension,
                multisampled: false,
            },
            count: None,
        });
    }

    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(program.name()),
        entries: &entries,
    });
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(program.name()),
        bind_group_layouts: &[&bind_group_layout],
        push_constant_ranges: &[],
    });
    (bind_group_layout, pipeline_layout)
}
