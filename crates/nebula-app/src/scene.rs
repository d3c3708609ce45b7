//! Demo scene: a handful of ships circling a drifting camera, leaving trails.

use glam::Vec2;
use nebula_render::ViewState;
use nebula_trail::{TrailCatalog, TrailError, TrailHandle, TrailMode, TrailSpec};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::effects::SystemEffects;

/// Trail kinds used when no catalog file is configured.
pub const BUILTIN_CATALOG: &str = r#"[
    (
        name: "engine",
        ttl: 1.2,
        thickness: 6.0,
        shader: Flame,
        idle: (color: (1.0, 0.55, 0.2, 0.8)),
        afterburn: Some((color: (1.0, 0.8, 0.4, 1.0), thickness: Some(10.0))),
        jump: Some((color: (0.6, 0.8, 1.0, 1.0), thickness: Some(3.0))),
    ),
    (
        name: "ion",
        ttl: 0.8,
        thickness: 3.0,
        shader: Pulse,
        idle: (color: (0.3, 0.6, 1.0, 0.7)),
        glow: Some((color: (0.5, 0.8, 1.0, 1.0))),
    ),
    (
        name: "wave",
        ttl: 2.0,
        thickness: 4.0,
        shader: Wave,
        idle: (color: (0.7, 1.0, 0.6, 0.6)),
    ),
    (
        name: "nebula-wake",
        ttl: 3.0,
        thickness: 12.0,
        shader: Nebula,
        idle: (color: (0.9, 0.9, 1.0, 0.5)),
        nebula_only: true,
    ),
]"#;

/// Seconds a ship flies before jumping out and being replaced.
const SHIP_LIFETIME: f32 = 8.0;

/// Camera drift in world units per second.
const CAMERA_DRIFT: Vec2 = Vec2::new(40.0, 15.0);

struct Ship {
    trail: TrailHandle,
    spec: usize,
    orbit_radius: f32,
    angular_speed: f32,
    phase: f32,
    age: f32,
}

impl Ship {
    fn position(&self, center: Vec2) -> Vec2 {
        let angle = self.phase + self.angular_speed * self.age;
        center + Vec2::new(angle.cos(), angle.sin()) * self.orbit_radius
    }

    fn mode(&self) -> TrailMode {
        if self.age > SHIP_LIFETIME - 0.5 {
            TrailMode::Jump
        } else if (self.age % 3.0) < 1.0 {
            TrailMode::Afterburn
        } else {
            TrailMode::Idle
        }
    }
}

/// Ships flying loops around the camera. Each owns one trail.
pub struct DemoScene {
    specs: Vec<TrailSpec>,
    ships: Vec<Ship>,
    rng: ChaCha8Rng,
    jumps: u64,
}

impl DemoScene {
    /// Spawn `ship_count` ships using kinds from `catalog` in turn.
    pub fn new(
        catalog: &TrailCatalog,
        ship_count: usize,
        seed: u64,
        effects: &mut SystemEffects,
    ) -> Result<Self, TrailError> {
        let mut scene = Self {
            specs: catalog.iter().cloned().collect(),
            ships: Vec::with_capacity(ship_count),
            rng: ChaCha8Rng::seed_from_u64(seed),
            jumps: 0,
        };
        if scene.specs.is_empty() {
            return Ok(scene);
        }
        for i in 0..ship_count {
            let ship = scene.spawn(i % scene.specs.len(), effects)?;
            scene.ships.push(ship);
        }
        Ok(scene)
    }

    fn spawn(&mut self, spec: usize, effects: &mut SystemEffects) -> Result<Ship, TrailError> {
        let trail = effects.trail_create(&self.specs[spec])?;
        Ok(Ship {
            trail,
            spec,
            orbit_radius: self.rng.random_range(80.0f32..320.0),
            angular_speed: self.rng.random_range(0.6f32..1.8) * self.random_sign(),
            phase: self.rng.random_range(0.0f32..std::f32::consts::TAU),
            age: self.rng.random_range(0.0f32..SHIP_LIFETIME * 0.5),
        })
    }

    fn random_sign(&mut self) -> f32 {
        if self.rng.random::<bool>() { 1.0 } else { -1.0 }
    }

    /// One fixed step: drift the camera, fly the ships, sample their trails.
    ///
    /// Ships past their lifetime release their trail, which fades out on its
    /// own, and are replaced.
    pub fn update(
        &mut self,
        dt: f32,
        effects: &mut SystemEffects,
        view: &mut ViewState,
    ) -> Result<(), TrailError> {
        let step = CAMERA_DRIFT * dt;
        view.camera += step;
        effects.nebula_move_puffs(-step.x * view.zoom, -step.y * view.zoom);

        for i in 0..self.ships.len() {
            let ship = &mut self.ships[i];
            ship.age += dt;
            if ship.age >= SHIP_LIFETIME {
                effects.trail_remove(ship.trail);
                let spec = (ship.spec + 1) % self.specs.len();
                let replacement = self.spawn(spec, effects)?;
                debug!(
                    "Ship {i} jumped out, trail {} fading",
                    self.ships[i].trail.id()
                );
                self.ships[i] = Ship {
                    age: 0.0,
                    ..replacement
                };
                self.jumps += 1;
                continue;
            }
            let position = ship.position(view.camera);
            if effects.registry().sample_due(ship.trail) {
                effects.trail_sample_mode(ship.trail, position, ship.mode());
            }
        }
        Ok(())
    }

    /// Release every ship's trail.
    pub fn release(&mut self, effects: &mut SystemEffects) {
        for ship in self.ships.drain(..) {
            effects.trail_remove(ship.trail);
        }
    }

    pub fn ship_count(&self) -> usize {
        self.ships.len()
    }

    /// Ships replaced so far.
    pub fn jumps(&self) -> u64 {
        self.jumps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nebula_config::Config;

    fn setup(ships: usize) -> (SystemEffects, DemoScene, ViewState) {
        let view = ViewState::new(800, 600);
        let mut effects = SystemEffects::new(&Config::default(), view.screen, 3);
        let catalog = TrailCatalog::from_ron_str(BUILTIN_CATALOG).unwrap();
        let scene = DemoScene::new(&catalog, ships, 11, &mut effects).unwrap();
        (effects, scene, view)
    }

    #[test]
    fn test_builtin_catalog_parses() {
        let catalog = TrailCatalog::from_ron_str(BUILTIN_CATALOG).unwrap();
        assert_eq!(catalog.len(), 4);
        assert!(catalog.get("nebula-wake").unwrap().nebula_only);
    }

    #[test]
    fn test_one_trail_per_ship() {
        let (effects, scene, _) = setup(6);
        assert_eq!(scene.ship_count(), 6);
        assert_eq!(effects.registry().len(), 6);
    }

    #[test]
    fn test_update_samples_trails_and_moves_camera() {
        let (mut effects, mut scene, mut view) = setup(3);
        for _ in 0..30 {
            scene.update(1.0 / 60.0, &mut effects, &mut view).unwrap();
            effects.simulate(1.0 / 60.0, &view);
        }
        assert!(view.camera.x > 0.0);
        assert!(effects.field().pending_displacement().x < 0.0);
        let sampled = effects
            .registry()
            .iter()
            .filter(|(_, buffer)| !buffer.is_empty())
            .count();
        assert_eq!(sampled, 3);
    }

    #[test]
    fn test_ships_jump_and_old_trails_fade() {
        let (mut effects, mut scene, mut view) = setup(2);
        let dt = 1.0 / 60.0;
        for _ in 0..(60.0 * SHIP_LIFETIME) as usize + 10 {
            scene.update(dt, &mut effects, &mut view).unwrap();
            effects.simulate(dt, &view);
        }
        assert_eq!(scene.jumps(), 2);
        assert_eq!(scene.ship_count(), 2);
        // Old trails outlive their ships only by their ttl.
        for _ in 0..(60.0 * 4.0) as usize {
            effects.simulate(dt, &view);
        }
        assert_eq!(effects.registry().len(), 2);
    }

    #[test]
    fn test_release_lets_every_trail_fade() {
        let (mut effects, mut scene, view) = setup(4);
        scene.release(&mut effects);
        effects.simulate(0.1, &view);
        assert!(effects.registry().is_empty());
    }

    #[test]
    fn test_empty_catalog_spawns_nothing() {
        let view = ViewState::new(800, 600);
        let mut effects = SystemEffects::new(&Config::default(), view.screen, 3);
        let scene = DemoScene::new(&TrailCatalog::new(), 5, 1, &mut effects).unwrap();
        assert_eq!(scene.ship_count(), 0);
    }
}
