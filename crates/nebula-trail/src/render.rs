//! Turns a trail's live samples into one quad per segment.

use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
use nebula_render::{
    DrawBackend, FailureLatch, Geometry, PipelineStage, ProgramId, RenderBridge, RenderTarget,
    Uniform, UniformSet,
};

use crate::buffer::{TrailBuffer, TrailPoint};

/// Segments shorter than this many pixels are not drawn.
const MIN_SEGMENT_LENGTH: f32 = 1e-3;

/// Draws trails. Holds the parameters shared by every trail draw.
#[derive(Debug)]
pub struct TrailRenderer {
    shared: UniformSet,
    time: f32,
    latch: FailureLatch,
}

impl Default for TrailRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TrailRenderer {
    pub fn new() -> Self {
        Self {
            shared: UniformSet::new().with(Uniform::NebulaColor, Vec3::ONE),
            time: 0.0,
            latch: FailureLatch::new("trail draw"),
        }
    }

    /// Parameters applied to every trail; the nebula writes its tint here.
    pub fn shared_uniforms(&self) -> &UniformSet {
        &self.shared
    }

    pub fn shared_uniforms_mut(&mut self) -> &mut UniformSet {
        &mut self.shared
    }

    /// Advance the animation clock used by the wave and flame variants.
    pub fn advance(&mut self, dt: f32) {
        self.time += dt;
    }

    /// Draw `buffer`'s live span to the screen. Fewer than two samples draw nothing.
    pub fn render(
        &mut self,
        buffer: &TrailBuffer,
        bridge: &dyn RenderBridge,
        backend: &mut dyn DrawBackend,
    ) {
        if buffer.len() < 2 {
            return;
        }
        let view = bridge.view_matrix();
        let zoom = bridge.zoom();
        let screen = bridge.screen_size();
        let program = ProgramId::Trail(buffer.shader());

        let points: Vec<&TrailPoint> = buffer.points().collect();
        for pair in points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if a.color[3] <= 0.0 && b.color[3] <= 0.0 {
                continue;
            }
            let p1 = bridge.game_to_screen(a.position);
            let p2 = bridge.game_to_screen(b.position);
            let thick = 0.5 * (a.thickness + b.thickness) * zoom;
            if segment_off_screen(p1, p2, thick, screen) {
                continue;
            }
            let delta = p2 - p1;
            let length = delta.length();
            if length < MIN_SEGMENT_LENGTH {
                continue;
            }
            let angle = delta.y.atan2(delta.x);
            let projection = view
                * Mat4::from_scale_rotation_translation(
                    Vec3::new(length, thick, 1.0),
                    Quat::from_rotation_z(angle),
                    p1.extend(0.0),
                )
                * Mat4::from_translation(Vec3::new(0.0, -0.5, 0.0));

            let uniforms = self.shared.merged(
                &UniformSet::new()
                    .with(Uniform::Projection, projection)
                    .with(Uniform::Color1, faded(a))
                    .with(Uniform::Color2, faded(b))
                    .with(Uniform::Ages, Vec2::new(a.t, b.t))
                    .with(Uniform::Thickness, thick)
                    .with(Uniform::Length, length)
                    .with(Uniform::TrailSeed, buffer.seed())
                    .with(Uniform::TrailTime, self.time),
            );
            let stage = PipelineStage::new(program, uniforms);
            let drawn = self.latch.check(backend.draw(
                RenderTarget::Screen,
                &stage,
                Geometry::UnitQuad,
            ));
            if !drawn {
                return;
            }
        }
    }
}

fn faded(p: &TrailPoint) -> Vec4 {
    let [r, g, b, a] = p.color;
    Vec4::new(r, g, b, a * p.t.clamp(0.0, 1.0))
}

fn segment_off_screen(p1: Vec2, p2: Vec2, thick: f32, screen: Vec2) -> bool {
    let lo = p1.min(p2) - Vec2::splat(thick);
    let hi = p1.max(p2) + Vec2::splat(thick);
    hi.x < 0.0 || hi.y < 0.0 || lo.x > screen.x || lo.y > screen.y
}
