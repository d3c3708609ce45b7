//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Command-line arguments for the effects demo.
///
/// Settings flags override values loaded from `config.ron`; scene flags pick
/// the nebula the demo starts in.
#[derive(Parser, Debug, Default)]
#[command(name = "nebula-effects", about = "Trail and nebula effects demo")]
pub struct CliArgs {
    /// Window width.
    #[arg(long)]
    pub width: Option<u32>,

    /// Window height.
    #[arg(long)]
    pub height: Option<u32>,

    /// Downscale factor of the off-screen nebula target.
    #[arg(long)]
    pub nebula_scale: Option<f32>,

    /// Nebula brightness multiplier.
    #[arg(long)]
    pub brightness: Option<f32>,

    /// Nebula density, 0 to 1000.
    #[arg(long)]
    pub density: Option<f32>,

    /// Nebula volatility.
    #[arg(long)]
    pub volatility: Option<f32>,

    /// Nebula hue, 0 to 1.
    #[arg(long)]
    pub hue: Option<f32>,

    /// Frames to simulate in a headless run.
    #[arg(long)]
    pub frames: Option<u32>,

    /// Open a window instead of running headless.
    #[arg(long)]
    pub windowed: bool,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(w) = args.width {
            self.window.width = w;
        }
        if let Some(h) = args.height {
            self.window.height = h;
        }
        if let Some(scale) = args.nebula_scale {
            self.nebula.render_scale = scale;
        }
        if let Some(brightness) = args.brightness {
            self.nebula.brightness = brightness;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
