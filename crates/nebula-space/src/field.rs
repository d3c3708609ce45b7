//! Simulation state of the nebula around the current system.
//!
//! Holds the parameters the nebula shaders are driven with and a field of
//! drifting puffs. Puffs live on a playfield larger than the screen by a
//! margin on every side and wrap around its edges as the camera moves.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Densest possible nebula. Visibility drops to zero here.
pub const MAX_DENSITY: f32 = 1000.0;

/// One drifting cloud sprite.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NebulaPuff {
    /// Position on the playfield, in pixels.
    pub position: Vec2,
    /// Parallax factor. 1 moves with the player plane; below 1 is behind it,
    /// above 1 in front of it.
    pub height: f32,
    /// Radius in pixels at zoom 1.
    pub radius: f32,
    /// Shader phase offsets.
    pub seed: Vec2,
}

impl NebulaPuff {
    /// Drawn in the back pass, under ships.
    pub fn is_behind_player(&self) -> bool {
        self.height <= 1.0
    }
}

#[derive(Debug)]
pub struct NebulaField {
    hue: f32,
    density: f32,
    volatility: f32,
    turbulence: f32,
    view_radius: f32,
    visibility_modifier: f32,
    time_rate: f32,
    time: f32,
    displacement: Vec2,
    margin: f32,
    playfield: Vec2,
    puffs: Vec<NebulaPuff>,
    rng: ChaCha8Rng,
}

impl NebulaField {
    /// An empty field for a screen of `screen` pixels. Puffs spawn up to
    /// `margin` pixels beyond each edge.
    ///
    /// The shader clock starts at a random point in `(-1000, 0]` so
    /// separate sessions do not animate identically.
    pub fn new(screen: Vec2, margin: f32, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let time = -1000.0 * rng.random::<f32>();
        let mut field = Self {
            hue: 0.0,
            density: 0.0,
            volatility: 0.0,
            turbulence: 0.0,
            view_radius: MAX_DENSITY,
            visibility_modifier: 1.0,
            time_rate: 0.0,
            time,
            displacement: Vec2::ZERO,
            margin,
            playfield: Vec2::ZERO,
            puffs: Vec::new(),
            rng,
        };
        field.set_screen_size(screen);
        field
    }

    /// Set up the field for a new system and re-seed every puff.
    pub fn configure(&mut self, density: f32, volatility: f32, hue: f32) {
        let clamped = if density.is_nan() {
            0.0
        } else {
            density.clamp(0.0, MAX_DENSITY)
        };
        if clamped != density {
            log::warn!("Nebula density {density} out of range, using {clamped}");
        }
        self.density = clamped;
        self.volatility = volatility;
        self.hue = hue;
        self.time_rate = (2.0 * clamped + 200.0) / 10_000.0;
        self.turbulence = 15_000.0 / clamped.max(1.0).cbrt();
        self.time = 0.0;
        self.recompute_view_radius();
        self.seed_puffs();
        log::debug!(
            "Nebula configured: density {clamped}, volatility {volatility}, hue {hue}, {} puffs",
            self.puffs.len()
        );
    }

    fn seed_puffs(&mut self) {
        let count = (self.density / 2.0).floor() as usize;
        let playfield = self.playfield;
        let rng = &mut self.rng;
        self.puffs = (0..count)
            .map(|_| NebulaPuff {
                position: Vec2::new(
                    playfield.x * rng.random::<f32>(),
                    playfield.y * rng.random::<f32>(),
                ),
                radius: rng.random_range(10..=32) as f32,
                height: rng.random::<f32>() + 0.2,
                seed: Vec2::new(
                    rng.random::<f32>() * 2000.0 - 1000.0,
                    rng.random::<f32>() * 2000.0 - 1000.0,
                ),
            })
            .collect();
    }

    /// Recompute visibility from the player's sensor modifier; `None`
    /// (no player) counts as 1.
    pub fn update_visibility(&mut self, modifier: Option<f32>) {
        self.visibility_modifier = modifier.unwrap_or(1.0);
        self.recompute_view_radius();
    }

    fn recompute_view_radius(&mut self) {
        self.view_radius = (MAX_DENSITY - self.density) * self.visibility_modifier;
    }

    /// How far the player can see through the fog, in world units.
    pub fn view_radius(&self) -> f32 {
        self.view_radius
    }

    /// Move the shader clock forward by `dt` seconds of game time.
    pub fn advance(&mut self, dt: f32) {
        self.time += dt * self.time_rate;
    }

    /// Record camera motion to be applied to the puffs on the next overlay pass.
    pub fn displace(&mut self, dx: f32, dy: f32) {
        self.displacement += Vec2::new(dx, dy);
    }

    /// Return and reset the pending displacement.
    pub fn take_displacement(&mut self) -> Vec2 {
        std::mem::take(&mut self.displacement)
    }

    pub fn pending_displacement(&self) -> Vec2 {
        self.displacement
    }

    /// Shift every puff by `displacement` scaled by its height, wrapping
    /// around the playfield.
    pub fn advance_puffs(&mut self, displacement: Vec2) {
        let playfield = self.playfield;
        for puff in &mut self.puffs {
            let moved = puff.position + displacement * puff.height;
            puff.position = Vec2::new(wrap(moved.x, playfield.x), wrap(moved.y, playfield.y));
        }
    }

    /// Resize the playfield to `screen` plus the margin on every side.
    pub fn set_screen_size(&mut self, screen: Vec2) {
        self.playfield = screen + Vec2::splat(2.0 * self.margin);
    }

    pub fn hue(&self) -> f32 {
        self.hue
    }

    pub fn density(&self) -> f32 {
        self.density
    }

    pub fn volatility(&self) -> f32 {
        self.volatility
    }

    /// Length scale of the fog eddies, in world units.
    pub fn turbulence(&self) -> f32 {
        self.turbulence
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn time_rate(&self) -> f32 {
        self.time_rate
    }

    pub fn margin(&self) -> f32 {
        self.margin
    }

    pub fn playfield(&self) -> Vec2 {
        self.playfield
    }

    pub fn puffs(&self) -> &[NebulaPuff] {
        &self.puffs
    }
}

/// Wrap `v` into `[0, size)`.
fn wrap(v: f32, size: f32) -> f32 {
    if size <= 0.0 {
        return 0.0;
    }
    let w = v.rem_euclid(size);
    // rem_euclid can round up to `size` for tiny negative inputs.
    if w >= size { 0.0 } else { w }
}
