//! Procedural nebula: the simulated puff field and the compositor that
//! draws fog, puffs and the fog-of-war overlay.

pub mod compositor;
pub mod field;

pub use compositor::NebulaCompositor;
pub use field::{MAX_DENSITY, NebulaField, NebulaPuff};
