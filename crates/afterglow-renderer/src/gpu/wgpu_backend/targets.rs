//! Texture, mesh and cube map storage for [`WgpuBackend`](super::WgpuBackend).

use wgpu::util::DeviceExt;

use crate::gpu::types::{RendererError, TargetDescriptor};
use crate::scene::{MeshData, Vertex};

pub(super) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// One allocated render target.
pub(super) struct GpuTarget {
    pub desc: TargetDescriptor,
    pub formats: Vec<wgpu::TextureFormat>,
    pub views: Vec<wgpu::TextureView>,
    pub depth: Option<wgpu::TextureView>,
    // Views keep their textures alive, but holding them makes ownership explicit.
    _textures: Vec<wgpu::Texture>,
}

impl GpuTarget {
    pub fn new(device: &wgpu::Device, desc: &TargetDescriptor) -> Self {
        let size = wgpu::Extent3d {
            width: desc.width.max(1),
            height: desc.height.max(1),
            depth_or_array_layers: 1,
        };

        let mut textures = Vec::with_capacity(desc.color_formats.len() + 1);
        let mut views = Vec::with_capacity(desc.color_formats.len());
        let mut formats = Vec::with_capacity(desc.color_formats.len());

        for format in &desc.color_formats {
            let format = format.to_wgpu();
            let mut usage = wgpu::TextureUsages::RENDER_ATTACHMENT;
            if desc.sample_count == 1 {
                usage |= wgpu::TextureUsages::TEXTURE_BINDING;
            }
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some(desc.label),
                size,
                mip_level_count: 1,
                sample_count: desc.sample_count,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage,
                view_formats: &[],
            });
            views.push(texture.create_view(&wgpu::TextureViewDescriptor::default()));
            formats.push(format);
            textures.push(texture);
        }

        let depth = desc.depth.then(|| {
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some(desc.label),
                size,
                mip_level_count: 1,
                sample_count: desc.sample_count,
                dimension: wgpu::TextureDimension::D2,
                format: DEPTH_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            textures.push(texture);
            view
        });

        Self {
            desc: desc.clone(),
            formats,
            views,
            depth,
            _textures: textures,
        }
    }
}

/// Depth buffer matching the presentation surface, for the direct path.
pub(super) fn surface_depth(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    device
        .create_texture(&wgpu::TextureDescriptor {
            label: Some("surface depth"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        })
        .create_view(&wgpu::TextureViewDescriptor::default())
}

pub(super) struct GpuMesh {
    pub vertices: wgpu::Buffer,
    pub indices: wgpu::Buffer,
    pub index_count: u32,
}

impl GpuMesh {
    pub fn new(device: &wgpu::Device, mesh: &MeshData) -> Result<Self, RendererError> {
        if mesh.indices.is_empty() || mesh.vertices.is_empty() {
            return Err(RendererError::Configuration("mesh has no geometry".into()));
        }
        let vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("mesh vertices"),
            contents: bytemuck::cast_slice::<Vertex, u8>(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("mesh indices"),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Ok(Self {
            vertices,
            indices,
            index_count: mesh.indices.len() as u32,
        })
    }
}

/// Upload six RGBA8 faces as a cube texture and return its cube view.
pub(super) fn create_cubemap(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    size: u32,
    faces: &[Vec<u8>; 6],
) -> Result<wgpu::TextureView, RendererError> {
    let face_bytes = (size as usize) * (size as usize) * 4;
    if size == 0 || faces.iter().any(|f| f.len() != face_bytes) {
        return Err(RendererError::Configuration(format!(
            "cube faces must be {face_bytes} bytes each"
        )));
    }

    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("environment cube"),
        size: wgpu::Extent3d {
            width: size,
            height: size,
            depth_or_array_layers: 6,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    for (layer, face) in faces.iter().enumerate() {
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: 0,
                    y: 0,
                    z: layer as u32,
                },
                aspect: wgpu::TextureAspect::All,
            },
            face,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(size * 4),
                rows_per_image: Some(size),
            },
            wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
        );
    }

    Ok(texture.create_view(&wgpu::TextureViewDescriptor {
        label: Some("environment cube view"),
        dimension: Some(wgpu::TextureViewDimension::Cube),
        ..Default::default()
    }))
}
