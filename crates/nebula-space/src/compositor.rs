//! Draws the nebula: background fog, puffs, and the fog-of-war overlay.
//!
//! The fog shaders are expensive and low-frequency, so they render into an
//! off-screen target at a fraction of the native resolution and are blitted
//! up to the screen. When the effective scale is 1 or the target cannot be
//! allocated, they draw straight to the screen instead.

use glam::{Mat4, Vec2, Vec3};
use nebula_render::{
    DrawBackend, FailureLatch, Geometry, PipelineStage, ProgramId, RenderBridge, RenderTarget,
    TargetId, Uniform, UniformSet, hsv_to_rgb,
};

use crate::field::NebulaField;

/// Scale and target size a resize was computed for.
#[derive(Clone, Copy, Debug, PartialEq)]
struct ResizeKey {
    scale: f32,
    dims: (u32, u32),
}

fn is_valid_scale(scale: f32) -> bool {
    scale.is_finite() && scale > 0.0
}

#[derive(Debug)]
pub struct NebulaCompositor {
    scale_setting: f32,
    brightness: f32,
    last_resize: Option<ResizeKey>,
    render_scale: f32,
    dims: (u32, u32),
    target: Option<TargetId>,
    background: UniformSet,
    overlay: UniformSet,
    puff: UniformSet,
    blit: UniformSet,
    latch: FailureLatch,
}

impl NebulaCompositor {
    /// `scale_setting` is the configured downscale factor for the fog
    /// passes; `brightness` multiplies their output.
    ///
    /// A scale that is not finite and positive is replaced by 1.
    pub fn new(scale_setting: f32, brightness: f32) -> Self {
        let scale_setting = if is_valid_scale(scale_setting) {
            scale_setting
        } else {
            log::warn!("Invalid nebula render scale {scale_setting}, using 1");
            1.0
        };
        Self {
            scale_setting,
            brightness,
            last_resize: None,
            render_scale: 1.0,
            dims: (0, 0),
            target: None,
            background: UniformSet::new(),
            overlay: UniformSet::new(),
            puff: UniformSet::new().with(Uniform::NebulaColor, Vec3::ONE),
            blit: UniformSet::new()
                .with(
                    Uniform::Projection,
                    Mat4::orthographic_rh(0.0, 1.0, 0.0, 1.0, -1.0, 1.0),
                )
                .with(Uniform::Color, glam::Vec4::ONE),
            latch: FailureLatch::new("nebula draw"),
        }
    }

    /// Match the off-screen target to the current screen.
    ///
    /// Returns `false` when nothing changed since the last call.
    pub fn resize(&mut self, backend: &mut dyn DrawBackend, bridge: &dyn RenderBridge) -> bool {
        let mut scale = self.scale_setting * bridge.display_scale();
        if !is_valid_scale(scale) {
            scale = self.scale_setting;
        }
        let (nw, nh) = bridge.native_size();
        let dims = (
            ((nw as f32 / scale).round() as u32).max(1),
            ((nh as f32 / scale).round() as u32).max(1),
        );
        let key = ResizeKey { scale, dims };
        if self.last_resize == Some(key) {
            return false;
        }
        self.last_resize = Some(key);

        if let Some(old) = self.target.take() {
            backend.destroy_target(old);
        }
        self.render_scale = scale;
        self.dims = dims;
        if scale != 1.0 {
            match backend.create_target(dims.0, dims.1) {
                Ok(id) => self.target = Some(id),
                Err(err) => {
                    log::warn!("Nebula falling back to direct rendering: {err}");
                    self.render_scale = 1.0;
                    self.dims = (nw, nh);
                }
            }
        }

        let (w, h) = (self.dims.0 as f32, self.dims.1 as f32);
        let projection = Mat4::from_translation(Vec3::new(-w / 2.0, -h / 2.0, 0.0))
            * Mat4::from_scale(Vec3::new(w, h, 1.0));
        self.background.set(Uniform::Projection, projection);
        self.overlay.set(Uniform::Projection, projection);
        log::debug!(
            "Nebula target {}x{} at scale {} ({})",
            self.dims.0,
            self.dims.1,
            self.render_scale,
            if self.is_buffered() { "buffered" } else { "direct" }
        );
        true
    }

    /// Whether fog passes go through the off-screen target.
    pub fn is_buffered(&self) -> bool {
        self.target.is_some()
    }

    pub fn render_scale(&self) -> f32 {
        self.render_scale
    }

    pub fn target_size(&self) -> (u32, u32) {
        self.dims
    }

    pub fn target(&self) -> Option<TargetId> {
        self.target
    }

    pub fn brightness(&self) -> f32 {
        self.brightness
    }

    pub fn set_brightness(&mut self, brightness: f32) {
        self.brightness = brightness;
    }

    pub fn background_uniforms(&self) -> &UniformSet {
        &self.background
    }

    pub fn overlay_uniforms(&self) -> &UniformSet {
        &self.overlay
    }

    pub fn puff_uniforms(&self) -> &UniformSet {
        &self.puff
    }

    fn fog_target(&self) -> RenderTarget {
        match self.target {
            Some(id) => RenderTarget::Offscreen(id),
            None => RenderTarget::Screen,
        }
    }

    /// Draw one fog program over the whole fog target, blitting if buffered.
    fn draw_fog(
        &mut self,
        backend: &mut dyn DrawBackend,
        program: ProgramId,
        uniforms: UniformSet,
        clear: [f32; 4],
    ) {
        let target = self.fog_target();
        if let RenderTarget::Offscreen(_) = target
            && !self.latch.check(backend.clear(target, clear))
        {
            return;
        }
        let stage = PipelineStage::new(program, uniforms);
        if !self
            .latch
            .check(backend.draw(target, &stage, Geometry::UnitQuad))
        {
            return;
        }
        if let Some(id) = self.target {
            let blit = PipelineStage::new(ProgramId::TextureBlit, self.blit.clone()).with_texture(id);
            self.latch
                .check(backend.draw(RenderTarget::Screen, &blit, Geometry::UnitQuad));
        }
    }

    /// Advance the nebula clock and draw the background fog.
    pub fn render_background(
        &mut self,
        dt: f32,
        field: &mut NebulaField,
        bridge: &dyn RenderBridge,
        backend: &mut dyn DrawBackend,
    ) {
        field.advance(dt);
        let uniforms = self.background.merged(
            &UniformSet::new()
                .with(
                    Uniform::EddyScale,
                    field.turbulence() * bridge.zoom() / self.render_scale,
                )
                .with(Uniform::Time, field.time())
                .with(Uniform::Brightness, self.brightness),
        );
        self.draw_fog(
            backend,
            ProgramId::NebulaBackground,
            uniforms,
            [0.0, 0.0, 0.0, 1.0],
        );
    }

    /// Draw one puff layer: the back layer when `before_player`, else the front.
    pub fn render_puffs(
        &mut self,
        before_player: bool,
        field: &NebulaField,
        bridge: &dyn RenderBridge,
        backend: &mut dyn DrawBackend,
    ) {
        if bridge.main_menu_open() {
            return;
        }
        let zoom = bridge.zoom();
        let screen = bridge.screen_size();
        let view = bridge.view_matrix();
        let origin = bridge.gui_offset() - Vec2::splat(field.margin());
        let time = field.time() / 1.5;

        for puff in field.puffs() {
            if puff.is_behind_player() != before_player {
                continue;
            }
            let pos = puff.position + origin;
            let s = puff.radius * zoom;
            if pos.x + s < 0.0 || pos.x - s > screen.x || pos.y + s < 0.0 || pos.y - s > screen.y
            {
                continue;
            }
            let projection = view
                * Mat4::from_translation(pos.extend(0.0))
                * Mat4::from_scale(Vec3::new(s, s, 1.0));
            let uniforms = self.puff.merged(
                &UniformSet::new()
                    .with(Uniform::Projection, projection)
                    .with(Uniform::Time, time)
                    .with(Uniform::Seed, puff.seed),
            );
            let stage = PipelineStage::new(ProgramId::NebulaPuff, uniforms);
            if !self.latch.check(backend.draw(
                RenderTarget::Screen,
                &stage,
                Geometry::CenteredQuad,
            )) {
                return;
            }
        }
    }

    /// Apply pending camera motion to the puffs, draw the front puff layer,
    /// then the fog-of-war overlay.
    ///
    /// The clock only advances in the background pass, so `_dt` is unused.
    pub fn render_overlay(
        &mut self,
        _dt: f32,
        field: &mut NebulaField,
        bridge: &dyn RenderBridge,
        backend: &mut dyn DrawBackend,
    ) {
        let displacement = field.take_displacement();
        field.advance_puffs(displacement);
        self.render_puffs(false, field, bridge, backend);

        let zoom = bridge.zoom();
        let uniforms = self.overlay.merged(
            &UniformSet::new()
                .with(
                    Uniform::Horizon,
                    field.view_radius() * zoom / self.render_scale,
                )
                .with(
                    Uniform::EddyScale,
                    field.turbulence() * zoom / self.render_scale,
                )
                .with(Uniform::Time, field.time())
                .with(Uniform::Brightness, self.brightness)
                .with(Uniform::Center, bridge.gui_offset() / self.render_scale),
        );
        self.draw_fog(
            backend,
            ProgramId::NebulaOverlay,
            uniforms,
            [0.0, 0.0, 0.0, 0.0],
        );
    }

    /// Background fog followed by the back puff layer.
    pub fn render(
        &mut self,
        dt: f32,
        field: &mut NebulaField,
        bridge: &dyn RenderBridge,
        backend: &mut dyn DrawBackend,
    ) {
        self.render_background(dt, field, bridge, backend);
        self.render_puffs(true, field, bridge, backend);
    }

    /// Configure `field` for a new system and push its colours into every
    /// program, including the trail tint in `trail_tint`.
    pub fn prep(
        &mut self,
        field: &mut NebulaField,
        trail_tint: &mut UniformSet,
        density: f32,
        volatility: f32,
        hue: f32,
    ) {
        field.configure(density, volatility, hue);
        self.background
            .set(Uniform::Hue, hue)
            .set(Uniform::Volatility, volatility);
        self.overlay.set(Uniform::Hue, hue);
        trail_tint.set(
            Uniform::NebulaColor,
            Vec3::from(hsv_to_rgb(hue * 360.0, 0.7, 1.0)),
        );
        self.puff.set(
            Uniform::NebulaColor,
            Vec3::from(hsv_to_rgb(hue * 360.0, 0.95, 1.0)),
        );
    }

    /// Release the off-screen target. The next resize allocates afresh.
    pub fn exit(&mut self, backend: &mut dyn DrawBackend) {
        if let Some(id) = self.target.take() {
            backend.destroy_target(id);
        }
        self.last_resize = None;
    }
}
