//! Windowed demo: winit event handling around the wgpu draw backend.

use std::sync::Arc;

use nebula_config::Config;
use nebula_render::{
    DrawBackend, RenderContext, RenderTarget, SurfaceError, ViewState, WgpuBackend,
    init_render_context_blocking,
};
use nebula_trail::TrailCatalog;
use tracing::{error, info, instrument, warn};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::effects::SystemEffects;
use crate::game_loop::GameLoop;
use crate::scene::DemoScene;
use crate::{AppError, SceneSettings};

const SCREEN_CLEAR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

pub fn window_attributes_from_config(config: &Config) -> WindowAttributes {
    WindowAttributes::default()
        .with_title(config.window.title.clone())
        .with_inner_size(winit::dpi::LogicalSize::new(
            f64::from(config.window.width),
            f64::from(config.window.height),
        ))
}

/// Point `view` at a window of `physical` pixels at `scale_factor`.
///
/// Effects draw in logical pixels; the compositor sizes its target from the
/// physical size.
pub fn fit_view(view: &mut ViewState, physical: PhysicalSize<u32>, scale_factor: f64) {
    let scale = (scale_factor as f32).max(f32::EPSILON);
    view.native = (physical.width.max(1), physical.height.max(1));
    view.display_scale = scale;
    view.screen = glam::Vec2::new(
        view.native.0 as f32 / scale,
        view.native.1 as f32 / scale,
    );
}

struct EffectsApp {
    settings: SceneSettings,
    window: Option<Arc<Window>>,
    gpu: Option<RenderContext>,
    backend: Option<WgpuBackend>,
    view: ViewState,
    effects: SystemEffects,
    scene: DemoScene,
    game_loop: GameLoop,
    frames: u32,
    error: Option<AppError>,
}

impl EffectsApp {
    fn new(settings: SceneSettings, catalog: &TrailCatalog) -> Result<Self, AppError> {
        let window = &settings.config.window;
        let view = ViewState::new(window.width, window.height);
        let mut effects = SystemEffects::new(&settings.config, view.screen, settings.seed);
        effects.nebula_prep(settings.density, settings.volatility, settings.hue);
        let scene = DemoScene::new(catalog, settings.ships, settings.seed, &mut effects)?;
        Ok(Self {
            settings,
            window: None,
            gpu: None,
            backend: None,
            view,
            effects,
            scene,
            game_loop: GameLoop::new(),
            frames: 0,
            error: None,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: AppError) {
        error!("{err}");
        self.error = Some(err);
        event_loop.exit();
    }

    fn resize(&mut self, physical: PhysicalSize<u32>, scale_factor: f64) {
        fit_view(&mut self.view, physical, scale_factor);
        if let Some(gpu) = &mut self.gpu {
            gpu.resize(physical.width, physical.height);
        }
        info!(
            "Resized to {}x{} (scale {:.2})",
            physical.width, physical.height, scale_factor
        );
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let scene = &mut self.scene;
        let effects = &mut self.effects;
        let view = &mut self.view;
        let mut failure = None;
        let frame = self.game_loop.tick(|dt, _| {
            let dt = dt as f32;
            if failure.is_none()
                && let Err(e) = scene.update(dt, effects, view)
            {
                failure = Some(e);
            }
            effects.simulate(dt, view);
        });
        if let Some(e) = failure {
            self.fail(event_loop, e.into());
            return;
        }

        let (Some(gpu), Some(backend)) = (&mut self.gpu, &mut self.backend) else {
            return;
        };
        let surface_texture = match gpu.acquire_frame() {
            Ok(texture) => texture,
            Err(SurfaceError::Lost) => {
                gpu.resize(self.view.native.0, self.view.native.1);
                return;
            }
            Err(SurfaceError::OutOfMemory) => {
                error!("GPU out of memory");
                event_loop.exit();
                return;
            }
            Err(SurfaceError::Timeout) => {
                warn!("Surface timeout, skipping frame");
                return;
            }
        };
        let screen = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        if let Err(e) = backend.clear(RenderTarget::Screen, SCREEN_CLEAR) {
            warn!("Screen clear failed: {e}");
        }
        let in_nebula = self.effects.in_nebula();
        self.effects
            .render_frame(frame.simulated as f32, in_nebula, &self.view, backend);
        backend.flush(&screen);
        surface_texture.present();

        self.frames += 1;
        if self
            .settings
            .frames
            .is_some_and(|limit| self.frames >= limit)
        {
            info!("Rendered {} frames, exiting", self.frames);
            event_loop.exit();
        }
    }

    fn on_key(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent) {
        if event.state != ElementState::Pressed || event.repeat {
            return;
        }
        match &event.logical_key {
            Key::Named(NamedKey::Escape) => event_loop.exit(),
            Key::Character(c) if c.eq_ignore_ascii_case("m") => {
                self.view.main_menu_open = !self.view.main_menu_open;
                info!("Main menu open: {}", self.view.main_menu_open);
            }
            _ => {}
        }
    }
}

impl ApplicationHandler for EffectsApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let attrs = window_attributes_from_config(&self.settings.config);
        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                self.fail(event_loop, e.into());
                return;
            }
        };

        match init_render_context_blocking(window.clone(), self.settings.config.window.vsync) {
            Ok(gpu) => {
                self.backend = Some(WgpuBackend::new(&gpu.device, &gpu.queue, gpu.format()));
                self.gpu = Some(gpu);
            }
            Err(e) => {
                self.fail(event_loop, e.into());
                return;
            }
        }
        self.resize(window.inner_size(), window.scale_factor());
        window.request_redraw();
        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested, shutting down");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                let scale = self.window.as_ref().map_or(1.0, |w| w.scale_factor());
                self.resize(size, scale);
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                if let Some(size) = self.window.as_ref().map(|w| w.inner_size()) {
                    self.resize(size, scale_factor);
                }
            }
            WindowEvent::KeyboardInput { event, .. } => self.on_key(event_loop, &event),
            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.scene.release(&mut self.effects);
        if let Some(backend) = &mut self.backend {
            self.effects.exit(backend);
        }
    }
}

/// Open a window and run the demo until it is closed or the frame limit hits.
#[instrument(skip_all)]
pub fn run_windowed(settings: SceneSettings, catalog: &TrailCatalog) -> Result<(), AppError> {
    let event_loop = EventLoop::new()?;
    let mut app = EffectsApp::new(settings, catalog)?;
    event_loop.run_app(&mut app)?;
    match app.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
