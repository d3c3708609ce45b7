//! Per-system effects context: the trails and the nebula a star system owns.

use glam::Vec2;
use nebula_config::Config;
use nebula_render::{DrawBackend, RenderBridge};
use nebula_space::{NebulaCompositor, NebulaField};
use nebula_trail::{
    TrailError, TrailHandle, TrailMode, TrailRegistry, TrailRenderer, TrailSpec, TrailStyle,
};
use tracing::{debug, info};

/// Everything the effects layer keeps between frames.
///
/// Per frame, call [`simulate`](Self::simulate) for each fixed step, then the
/// render passes in order: background, back puffs, trails, overlay.
pub struct SystemEffects {
    registry: TrailRegistry,
    renderer: TrailRenderer,
    field: NebulaField,
    compositor: NebulaCompositor,
}

impl SystemEffects {
    pub fn new(config: &Config, screen: Vec2, seed: u64) -> Self {
        Self {
            registry: TrailRegistry::new(config.trail.sample_interval, seed),
            renderer: TrailRenderer::new(),
            field: NebulaField::new(screen, config.nebula.puff_margin, seed.rotate_left(32)),
            compositor: NebulaCompositor::new(
                config.nebula.render_scale,
                config.nebula.brightness,
            ),
        }
    }

    pub fn trail_create(&mut self, spec: &TrailSpec) -> Result<TrailHandle, TrailError> {
        let handle = self.registry.create(spec)?;
        debug!("Created trail {} ({})", handle.id(), spec.name);
        Ok(handle)
    }

    pub fn trail_sample(&mut self, handle: TrailHandle, position: Vec2, style: TrailStyle) {
        self.registry.sample(handle, position, style);
    }

    pub fn trail_sample_mode(&mut self, handle: TrailHandle, position: Vec2, mode: TrailMode) {
        self.registry.sample_mode(handle, position, mode);
    }

    /// Drop the caller's reference; the trail fades out before it is reaped.
    pub fn trail_remove(&mut self, handle: TrailHandle) {
        self.registry.remove(handle);
    }

    /// Set up the nebula for a newly entered system.
    pub fn nebula_prep(&mut self, density: f32, volatility: f32, hue: f32) {
        self.compositor.prep(
            &mut self.field,
            self.renderer.shared_uniforms_mut(),
            density,
            volatility,
            hue,
        );
        info!(
            "Nebula prepared: density {:.0}, volatility {:.2}, hue {:.2}, {} puffs",
            self.field.density(),
            self.field.volatility(),
            self.field.hue(),
            self.field.puffs().len()
        );
    }

    /// Whether the current system has any nebula; nebula-only trails draw
    /// only then.
    pub fn in_nebula(&self) -> bool {
        self.field.density() > 0.0
    }

    pub fn nebula_view_radius(&self) -> f32 {
        self.field.view_radius()
    }

    /// Queue camera motion for the puffs; applied by the overlay pass.
    pub fn nebula_move_puffs(&mut self, dx: f32, dy: f32) {
        self.field.displace(dx, dy);
    }

    /// One fixed step of trail ageing and visibility tracking.
    pub fn simulate(&mut self, dt: f32, bridge: &dyn RenderBridge) {
        self.registry.tick(dt);
        self.renderer.advance(dt);
        self.field.set_screen_size(bridge.screen_size());
        self.field.update_visibility(bridge.visibility_modifier());
    }

    /// Background fog. Reallocates the off-screen target first if the view
    /// changed size.
    pub fn render_background(
        &mut self,
        dt: f32,
        bridge: &dyn RenderBridge,
        backend: &mut dyn DrawBackend,
    ) {
        self.compositor.resize(backend, bridge);
        self.compositor
            .render_background(dt, &mut self.field, bridge, backend);
    }

    pub fn render_puffs(
        &mut self,
        before_player: bool,
        bridge: &dyn RenderBridge,
        backend: &mut dyn DrawBackend,
    ) {
        self.compositor
            .render_puffs(before_player, &self.field, bridge, backend);
    }

    pub fn render_trails(
        &mut self,
        in_nebula: bool,
        bridge: &dyn RenderBridge,
        backend: &mut dyn DrawBackend,
    ) {
        self.registry
            .render_all(in_nebula, &mut self.renderer, bridge, backend);
    }

    pub fn render_overlay(
        &mut self,
        dt: f32,
        bridge: &dyn RenderBridge,
        backend: &mut dyn DrawBackend,
    ) {
        self.compositor.resize(backend, bridge);
        self.compositor
            .render_overlay(dt, &mut self.field, bridge, backend);
    }

    /// Every pass in draw order for one frame covering `dt` seconds.
    pub fn render_frame(
        &mut self,
        dt: f32,
        in_nebula: bool,
        bridge: &dyn RenderBridge,
        backend: &mut dyn DrawBackend,
    ) {
        self.compositor.resize(backend, bridge);
        self.compositor
            .render(dt, &mut self.field, bridge, backend);
        self.render_trails(in_nebula, bridge, backend);
        self.render_overlay(dt, bridge, backend);
    }

    /// Leave the system: drop every trail and release the nebula target.
    pub fn exit(&mut self, backend: &mut dyn DrawBackend) {
        self.registry.clear();
        self.compositor.exit(backend);
    }

    pub fn registry(&self) -> &TrailRegistry {
        &self.registry
    }

    pub fn field(&self) -> &NebulaField {
        &self.field
    }

    pub fn compositor(&self) -> &NebulaCompositor {
        &self.compositor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nebula_render::{
        Command, ProgramId, RecordingBackend, RenderTarget, TrailShader, Uniform, ViewState,
    };
    use nebula_trail::StyleSpec;

    fn effects(view: &ViewState) -> SystemEffects {
        SystemEffects::new(&Config::default(), view.screen, 7)
    }

    fn spec() -> TrailSpec {
        TrailSpec::new("test", 1.0, StyleSpec::color([1.0, 0.5, 0.2, 1.0]))
    }

    #[test]
    fn test_frame_pass_order() {
        let view = ViewState::new(800, 600);
        let mut fx = effects(&view);
        fx.nebula_prep(100.0, 0.0, 0.5);
        let h = fx.trail_create(&spec()).unwrap();
        fx.trail_sample(h, Vec2::new(0.0, 0.0), TrailStyle::new([1.0; 4], 2.0));
        fx.trail_sample(h, Vec2::new(40.0, 0.0), TrailStyle::new([1.0; 4], 2.0));

        let mut backend = RecordingBackend::new();
        fx.render_frame(1.0 / 60.0, true, &view, &mut backend);

        let sequence = backend.program_sequence();
        let first = |p: ProgramId| sequence.iter().position(|&q| q == p);
        let background = first(ProgramId::NebulaBackground).unwrap();
        let trail = first(ProgramId::Trail(TrailShader::Default)).unwrap();
        let overlay = first(ProgramId::NebulaOverlay).unwrap();
        assert!(background < trail && trail < overlay);
    }

    #[test]
    fn test_prep_tints_trails() {
        let view = ViewState::new(800, 600);
        let mut fx = effects(&view);
        fx.nebula_prep(0.0, 0.0, 0.0);
        let h = fx.trail_create(&spec()).unwrap();
        fx.trail_sample(h, Vec2::new(0.0, 0.0), TrailStyle::new([1.0; 4], 2.0));
        fx.trail_sample(h, Vec2::new(40.0, 0.0), TrailStyle::new([1.0; 4], 2.0));
        let mut backend = RecordingBackend::new();
        fx.render_trails(true, &view, &mut backend);
        let stage = backend.draws().next().unwrap().1;
        let tint = stage.uniforms.get_vec3(Uniform::NebulaColor).unwrap();
        // hue 0 at saturation 0.7: full red, 30% green and blue.
        assert!((tint.x - 1.0).abs() < 1e-5);
        assert!((tint.y - 0.3).abs() < 1e-5);
        assert!((tint.z - 0.3).abs() < 1e-5);
    }

    #[test]
    fn test_simulate_tracks_visibility() {
        let mut view = ViewState::new(800, 600);
        view.visibility_modifier = Some(2.0);
        let mut fx = effects(&view);
        fx.nebula_prep(0.0, 0.0, 0.3);
        fx.simulate(1.0 / 60.0, &view);
        assert_eq!(fx.nebula_view_radius(), 2000.0);
    }

    #[test]
    fn test_removed_trail_fades_then_reaped() {
        let view = ViewState::new(800, 600);
        let mut fx = effects(&view);
        let h = fx.trail_create(&spec()).unwrap();
        fx.trail_sample_mode(h, Vec2::ZERO, TrailMode::Idle);
        fx.trail_remove(h);
        assert_eq!(fx.registry().len(), 1);
        for _ in 0..3 {
            fx.simulate(0.5, &view);
        }
        assert!(fx.registry().is_empty());
    }

    #[test]
    fn test_moved_puffs_applied_by_overlay() {
        let view = ViewState::new(800, 600);
        let mut fx = effects(&view);
        fx.nebula_prep(200.0, 0.0, 0.5);
        fx.nebula_move_puffs(3.0, -2.0);
        assert_eq!(fx.field().pending_displacement(), Vec2::new(3.0, -2.0));
        let mut backend = RecordingBackend::new();
        fx.render_overlay(0.0, &view, &mut backend);
        assert_eq!(fx.field().pending_displacement(), Vec2::ZERO);
    }

    #[test]
    fn test_in_nebula_follows_density() {
        let view = ViewState::new(800, 600);
        let mut fx = effects(&view);
        fx.nebula_prep(0.0, 0.0, 0.5);
        assert!(!fx.in_nebula());
        fx.nebula_prep(250.0, 0.0, 0.5);
        assert!(fx.in_nebula());
    }

    #[test]
    fn test_exit_drops_trails_and_target() {
        let view = ViewState::new(800, 600);
        let mut fx = effects(&view);
        fx.trail_create(&spec()).unwrap();
        let mut backend = RecordingBackend::new();
        fx.render_background(0.0, &view, &mut backend);
        assert!(fx.compositor().is_buffered());
        assert_eq!(backend.live_targets(), 1);

        fx.exit(&mut backend);
        assert!(fx.registry().is_empty());
        assert_eq!(backend.live_targets(), 0);
    }

    #[test]
    fn test_background_clears_offscreen_target() {
        let view = ViewState::new(800, 600);
        let mut fx = effects(&view);
        let mut backend = RecordingBackend::new();
        fx.render_background(0.0, &view, &mut backend);
        let target = fx.compositor().target().unwrap();
        assert!(matches!(
            backend.commands().first(),
            Some(Command::Clear { target: RenderTarget::Offscreen(t), .. }) if *t == target
        ));
    }
}
