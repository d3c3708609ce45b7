//! Windowless run: drives the effects against the recording backend and
//! reports what would have been drawn.

use nebula_render::{DrawBackend, ProgramId, RecordingBackend, RenderTarget, ViewState};
use nebula_trail::TrailCatalog;
use rustc_hash::FxHashMap;
use tracing::{info, warn};

use crate::effects::SystemEffects;
use crate::game_loop::{FIXED_DT, GameLoop};
use crate::scene::DemoScene;
use crate::{AppError, SceneSettings};

/// Totals gathered over a headless run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HeadlessReport {
    pub frames: u32,
    pub steps: u64,
    pub draws: usize,
    pub draws_by_program: FxHashMap<ProgramId, usize>,
    pub peak_trails: usize,
    pub buffered: bool,
    pub view_radius: f32,
}

/// Simulate the configured number of frames at a steady 60 Hz.
pub fn run_headless(
    settings: &SceneSettings,
    catalog: &TrailCatalog,
) -> Result<HeadlessReport, AppError> {
    let window = &settings.config.window;
    let mut view = ViewState::new(window.width, window.height)
        .with_display_scale(window.display_scale);
    let mut backend = RecordingBackend::new();
    let mut effects = SystemEffects::new(&settings.config, view.screen, settings.seed);
    effects.nebula_prep(settings.density, settings.volatility, settings.hue);
    let mut scene = DemoScene::new(catalog, settings.ships, settings.seed, &mut effects)?;
    let mut game_loop = GameLoop::new();
    let mut report = HeadlessReport::default();

    for _ in 0..settings.headless_frames() {
        backend.clear_commands();
        let mut failure = None;
        let frame = game_loop.step(FIXED_DT, |dt, _| {
            let dt = dt as f32;
            if failure.is_none()
                && let Err(e) = scene.update(dt, &mut effects, &mut view)
            {
                failure = Some(e);
            }
            effects.simulate(dt, &view);
        });
        if let Some(e) = failure {
            return Err(e.into());
        }

        if let Err(e) = backend.clear(RenderTarget::Screen, [0.0, 0.0, 0.0, 1.0]) {
            warn!("Screen clear failed: {e}");
        }
        let in_nebula = effects.in_nebula();
        effects.render_frame(frame.simulated as f32, in_nebula, &view, &mut backend);

        report.frames += 1;
        report.steps += u64::from(frame.steps);
        report.peak_trails = report.peak_trails.max(effects.registry().len());
        for (_, stage, _) in backend.draws() {
            report.draws += 1;
            *report.draws_by_program.entry(stage.program).or_default() += 1;
        }
    }

    report.buffered = effects.compositor().is_buffered();
    report.view_radius = effects.nebula_view_radius();
    scene.release(&mut effects);
    effects.exit(&mut backend);

    info!(
        "Headless run: {} frames, {} draws, peak {} trails, {} ship jumps",
        report.frames,
        report.draws,
        report.peak_trails,
        scene.jumps()
    );
    Ok(report)
}
