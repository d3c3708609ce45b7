//! Trail and nebula effects demo.
//!
//! Loads settings, sets up logging, then drives [`effects::SystemEffects`]
//! either headless against the recording backend or in a window.

pub mod effects;
pub mod game_loop;
pub mod headless;
pub mod platform;
pub mod scene;
pub mod window;

use nebula_config::{CliArgs, Config, ConfigError};
use nebula_render::RenderContextError;
use nebula_trail::{TrailCatalog, TrailError};
use tracing::info;

use crate::platform::{PlatformDirs, PlatformError};

/// Frames simulated by a headless run without `--frames`.
pub const DEFAULT_HEADLESS_FRAMES: u32 = 600;

/// Ships flying in the demo scene.
pub const DEFAULT_SHIPS: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Platform(#[from] PlatformError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("trail catalog: {0}")]
    Trail(#[from] TrailError),
    #[error("GPU initialization failed: {0}")]
    Render(#[from] RenderContextError),
    #[error("window creation failed: {0}")]
    Window(#[from] winit::error::OsError),
    #[error("event loop failed: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
}

/// Settings plus the nebula the demo system starts with.
#[derive(Clone, Debug)]
pub struct SceneSettings {
    pub config: Config,
    pub density: f32,
    pub volatility: f32,
    pub hue: f32,
    /// Frame limit; headless runs fall back to [`DEFAULT_HEADLESS_FRAMES`].
    pub frames: Option<u32>,
    pub ships: usize,
    pub seed: u64,
}

impl SceneSettings {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            density: 300.0,
            volatility: 0.0,
            hue: 0.6,
            frames: None,
            ships: DEFAULT_SHIPS,
            seed: 0x5eed,
        }
    }

    pub fn from_args(config: Config, args: &CliArgs) -> Self {
        let defaults = Self::new(config);
        Self {
            density: args.density.unwrap_or(defaults.density),
            volatility: args.volatility.unwrap_or(defaults.volatility),
            hue: args.hue.unwrap_or(defaults.hue),
            frames: args.frames,
            ..defaults
        }
    }

    pub fn headless_frames(&self) -> u32 {
        self.frames.unwrap_or(DEFAULT_HEADLESS_FRAMES)
    }
}

/// Trail kinds from `path`, or the built-in set.
pub fn load_catalog(path: Option<&std::path::Path>) -> Result<TrailCatalog, TrailError> {
    match path {
        Some(path) => {
            info!("Loading trail catalog from {}", path.display());
            TrailCatalog::load(path)
        }
        None => TrailCatalog::from_ron_str(scene::BUILTIN_CATALOG),
    }
}

/// Resolve directories, load config, start logging and run the demo.
pub fn run(args: &CliArgs) -> Result<(), AppError> {
    let dirs = PlatformDirs::resolve_and_create(args.config.as_deref())?;
    let mut config = Config::load_or_create(&dirs.config_dir)?;
    config.apply_cli_overrides(args);

    nebula_log::init_logging(Some(&dirs.log_dir), cfg!(debug_assertions), Some(&config));
    info!("Config directory: {}", dirs.config_dir.display());

    let catalog = load_catalog(dirs.catalog_path(config.trail.catalog.as_deref()).as_deref())?;
    info!("{} trail kinds available", catalog.len());

    let settings = SceneSettings::from_args(config, args);
    if args.windowed {
        window::run_windowed(settings, &catalog)
    } else {
        let report = headless::run_headless(&settings, &catalog)?;
        for (program, count) in &report.draws_by_program {
            info!("{program:?}: {count} draws");
        }
        Ok(())
    }
}
