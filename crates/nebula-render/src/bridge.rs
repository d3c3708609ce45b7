//! What the effects layer needs to know about the camera, screen and player.

use glam::{Mat4, Vec2};

/// Read-only view of host state consumed by trails and the nebula.
///
/// The host supplies one of these per frame. Effects never reach into global
/// state; everything they read about the world comes through here.
pub trait RenderBridge {
    /// Current camera zoom factor (screen pixels per world unit).
    fn zoom(&self) -> f32;

    /// World position at the centre of the screen.
    fn camera_position(&self) -> Vec2;

    /// Offset of the playable area caused by GUI panels, in screen pixels.
    fn gui_offset(&self) -> Vec2;

    /// Logical screen size in pixels.
    fn screen_size(&self) -> Vec2;

    /// Native framebuffer size in physical pixels.
    fn native_size(&self) -> (u32, u32);

    /// Physical pixels per logical pixel.
    fn display_scale(&self) -> f32;

    /// Player sensor modifier for nebula visibility, if a player exists.
    fn visibility_modifier(&self) -> Option<f32>;

    /// Whether the main menu covers the screen.
    fn main_menu_open(&self) -> bool;

    /// Convert a world position to screen pixels.
    fn game_to_screen(&self, world: Vec2) -> Vec2 {
        (world - self.camera_position()) * self.zoom() + self.screen_size() * 0.5
    }

    /// Orthographic projection mapping screen pixels to clip space.
    fn view_matrix(&self) -> Mat4 {
        let size = self.screen_size();
        Mat4::orthographic_rh(0.0, size.x, 0.0, size.y, -1.0, 1.0)
    }
}

/// Plain snapshot implementation of [`RenderBridge`].
#[derive(Clone, Debug, PartialEq)]
pub struct ViewState {
    pub zoom: f32,
    pub camera: Vec2,
    pub gui_offset: Vec2,
    pub screen: Vec2,
    pub native: (u32, u32),
    pub display_scale: f32,
    pub visibility_modifier: Option<f32>,
    pub main_menu_open: bool,
}

impl ViewState {
    /// A view of a `width`×`height` screen at zoom 1 with the camera at the origin.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            zoom: 1.0,
            camera: Vec2::ZERO,
            gui_offset: Vec2::ZERO,
            screen: Vec2::new(width as f32, height as f32),
            native: (width, height),
            display_scale: 1.0,
            visibility_modifier: None,
            main_menu_open: false,
        }
    }

    /// Same view at a different display scale; native size follows.
    pub fn with_display_scale(mut self, scale: f32) -> Self {
        self.display_scale = scale;
        self.native = (
            (self.screen.x * scale).round() as u32,
            (self.screen.y * scale).round() as u32,
        );
        self
    }
}

impl RenderBridge for ViewState {
    fn zoom(&self) -> f32 {
        self.zoom
    }

    fn camera_position(&self) -> Vec2 {
        self.camera
    }

    fn gui_offset(&self) -> Vec2 {
        self.gui_offset
    }

    fn screen_size(&self) -> Vec2 {
        self.screen
    }

    fn native_size(&self) -> (u32, u32) {
        self.native
    }

    fn display_scale(&self) -> f32 {
        self.display_scale
    }

    fn visibility_modifier(&self) -> Option<f32> {
        self.visibility_modifier
    }

    fn main_menu_open(&self) -> bool {
        self.main_menu_open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn test_game_to_screen_centres_camera() {
        let mut view = ViewState::new(800, 600);
        view.camera = Vec2::new(100.0, 50.0);
        assert_eq!(view.game_to_screen(Vec2::new(100.0, 50.0)), Vec2::new(400.0, 300.0));
    }

    #[test]
    fn test_game_to_screen_applies_zoom() {
        let mut view = ViewState::new(800, 600);
        view.zoom = 2.0;
        assert_eq!(view.game_to_screen(Vec2::new(10.0, -5.0)), Vec2::new(420.0, 290.0));
    }

    #[test]
    fn test_view_matrix_maps_screen_corners_to_clip() {
        let view = ViewState::new(800, 600);
        let m = view.view_matrix();
        let lo = m * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let hi = m * Vec4::new(800.0, 600.0, 0.0, 1.0);
        assert!((lo.x + 1.0).abs() < 1e-5 && (lo.y + 1.0).abs() < 1e-5);
        assert!((hi.x - 1.0).abs() < 1e-5 && (hi.y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_display_scale_updates_native_size() {
        let view = ViewState::new(640, 480).with_display_scale(2.0);
        assert_eq!(view.native_size(), (1280, 960));
        assert_eq!(view.display_scale(), 2.0);
    }
}
