//! A ground plane with a ring of cubes, and an orbiting camera.

use std::f32::consts::TAU;

use afterglow_renderer::gpu::{GpuBackend, Result, Rgba};
use afterglow_renderer::math;
use afterglow_renderer::{Camera, DrawItem, MeshData, StaticScene};

const CUBES: usize = 8;
const RING_RADIUS: f32 = 3.0;
const ORBIT_RADIUS: f32 = 9.0;
const ORBIT_HEIGHT: f32 = 4.0;

/// Upload the demo meshes and lay them out.
pub fn build(backend: &mut dyn GpuBackend) -> Result<StaticScene> {
    let plane = backend.upload_mesh(&MeshData::plane(20.0))?;
    let cube = backend.upload_mesh(&MeshData::cube())?;

    let mut scene = StaticScene::new();
    scene.push(DrawItem {
        mesh: plane,
        model: math::IDENTITY,
        color: Rgba::new(0.55, 0.55, 0.6, 1.0),
        gloss: 0.6,
    });

    for i in 0..CUBES {
        let angle = i as f32 / CUBES as f32 * TAU;
        let (x, z) = (angle.cos() * RING_RADIUS, angle.sin() * RING_RADIUS);
        let model = math::mul(
            &math::translate(x, 0.5 + (i % 3) as f32 * 0.25, z),
            &math::rotate_y(angle),
        );
        // Every fourth cube is translucent to exercise the blended pass.
        let alpha = if i % 4 == 3 { 0.5 } else { 1.0 };
        scene.push(DrawItem {
            mesh: cube,
            model,
            color: Rgba::new(0.9, 0.35 + 0.08 * i as f32, 0.2, alpha),
            gloss: 0.0,
        });
    }

    tracing::info!(items = CUBES + 1, "demo scene built");
    Ok(scene)
}

/// Camera on a circle around the origin.
pub struct Orbit {
    pub angle: f32,
}

impl Orbit {
    pub fn new() -> Self {
        Self { angle: 0.6 }
    }

    pub fn eye(&self) -> [f32; 3] {
        [
            self.angle.cos() * ORBIT_RADIUS,
            ORBIT_HEIGHT,
            self.angle.sin() * ORBIT_RADIUS,
        ]
    }

    pub fn apply(&self, camera: &mut Camera) {
        camera.look_at(self.eye(), [0.0, 0.5, 0.0]);
    }

    pub fn rotate(&mut self, delta: f32, camera: &mut Camera) {
        self.angle = (self.angle + delta).rem_euclid(TAU);
        self.apply(camera);
    }
}
