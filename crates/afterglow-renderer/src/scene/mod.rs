//! What the pipeline needs from a scene: a render list per camera and a
//! revision counter that changes whenever the image would.

mod mesh;

pub use mesh::{MeshData, Vertex};

use crate::camera::Camera;
use crate::gpu::{MeshId, Rgba};
use crate::math::Mat4;

/// One mesh instance.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawItem {
    pub mesh: MeshId,
    pub model: Mat4,
    pub color: Rgba,
    /// Reflectivity written to the auxiliary buffer, 0 for matte.
    pub gloss: f32,
}

/// Opaque items are drawn first with depth writes; transparent items follow
/// blended, and are left out of the auxiliary geometry pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderList {
    pub opaque: Vec<DrawItem>,
    pub transparent: Vec<DrawItem>,
}

impl RenderList {
    pub fn len(&self) -> usize {
        self.opaque.len() + self.transparent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.opaque.is_empty() && self.transparent.is_empty()
    }
}

/// A drawable scene owned outside the pipeline.
pub trait Scene {
    fn render_list(&self, camera: &Camera) -> RenderList;

    /// Bumped by the owner on every change that alters the rendered image.
    fn revision(&self) -> u64;
}

/// A fixed list of items, split by the alpha of their color.
#[derive(Debug, Clone, Default)]
pub struct StaticScene {
    items: Vec<DrawItem>,
    revision: u64,
}

impl StaticScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: DrawItem) {
        self.items.push(item);
        self.revision += 1;
    }

    pub fn items_mut(&mut self) -> &mut [DrawItem] {
        self.revision += 1;
        &mut self.items
    }
}

impl Scene for StaticScene {
    fn render_list(&self, _camera: &Camera) -> RenderList {
        let (transparent, opaque): (Vec<_>, Vec<_>) =
            self.items.iter().cloned().partition(|i| i.color.a < 1.0);
        RenderList {
            opaque,
            transparent,
        }
    }

    fn revision(&self) -> u64 {
        self.revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::IDENTITY;

    fn item(alpha: f32) -> DrawItem {
        DrawItem {
            mesh: MeshId(1),
            model: IDENTITY,
            color: Rgba::new(1.0, 1.0, 1.0, alpha),
            gloss: 0.0,
        }
    }

    #[test]
    fn static_scene_splits_by_alpha() {
        let mut scene = StaticScene::new();
        scene.push(item(1.0));
        scene.push(item(0.5));
        scene.push(item(1.0));

        let list = scene.render_list(&Camera::default());
        assert_eq!(list.opaque.len(), 2);
        assert_eq!(list.transparent.len(), 1);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn mutation_bumps_revision() {
        let mut scene = StaticScene::new();
        scene.push(item(1.0));
        let before = scene.revision();
        scene.items_mut()[0].gloss = 0.5;
        assert!(scene.revision() > before);
    }

    #[test]
    fn empty_list() {
        assert!(RenderList::default().is_empty());
    }
}
