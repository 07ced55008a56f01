//! Uniform blocks shared by several passes.
//!
//! Each struct mirrors a WGSL uniform struct and is padded to a multiple of
//! 16 bytes.

use super::types::PhysicalSize;

/// `CopyUniforms` in `copy.wgsl`, used by copy and FXAA.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CopyUniforms {
    /// xy = 1 / resolution, z = opacity.
    pub params: [f32; 4],
}

impl CopyUniforms {
    pub fn new(size: PhysicalSize, opacity: f32) -> Self {
        let [tx, ty] = texel(size);
        Self {
            params: [tx, ty, opacity, 0.0],
        }
    }
}

/// `BlendUniforms` in `blend.wgsl`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BlendUniforms {
    /// x = strength of the blended layer.
    pub params: [f32; 4],
}

impl BlendUniforms {
    pub fn strength(strength: f32) -> Self {
        Self {
            params: [strength, 0.0, 0.0, 0.0],
        }
    }
}

/// `EdgeBlurUniforms` in `edge_blur.wgsl`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct EdgeBlurUniforms {
    /// x = radius in texels, y = depth falloff.
    pub params: [f32; 4],
    /// xy = 1 / resolution, zw = resolution.
    pub texel: [f32; 4],
}

impl EdgeBlurUniforms {
    pub fn new(size: PhysicalSize, radius: f32, depth_falloff: f32) -> Self {
        Self {
            params: [radius, depth_falloff, 0.0, 0.0],
            texel: texel_and_size(size),
        }
    }
}

pub fn texel(size: PhysicalSize) -> [f32; 2] {
    [1.0 / size.width as f32, 1.0 / size.height as f32]
}

/// `[1/w, 1/h, w, h]`
pub fn texel_and_size(size: PhysicalSize) -> [f32; 4] {
    let [tx, ty] = texel(size);
    [tx, ty, size.width as f32, size.height as f32]
}

// =============================================================================
// Tests
// =============================================================================
