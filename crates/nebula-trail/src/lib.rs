//! Fading motion trails: ring-buffered samples, a registry that owns them,
//! and a renderer that draws them as ribbons.

pub mod buffer;
pub mod error;
pub mod registry;
pub mod render;
pub mod spec;

pub use buffer::{MIN_SAMPLE_INTERVAL, TrailBuffer, TrailPoint, round_capacity};
pub use error::TrailError;
pub use registry::{TrailHandle, TrailRegistry};
pub use render::TrailRenderer;
pub use spec::{StyleSpec, TrailCatalog, TrailMode, TrailSpec, TrailStyle};
