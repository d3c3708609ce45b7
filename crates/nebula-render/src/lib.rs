//! Drawing seam for 2D effects: pipeline stages, render targets, the host
//! bridge, and a wgpu implementation.

pub mod backend;
pub mod bridge;
pub mod color;
pub mod gpu;
pub mod recording;
pub mod shaders;
pub mod stage;
pub mod wgpu_backend;

pub use backend::{DrawBackend, FailureLatch, RenderError, RenderTarget, TargetId};
pub use bridge::{RenderBridge, ViewState};
pub use color::hsv_to_rgb;
pub use gpu::{RenderContext, RenderContextError, SurfaceError, init_render_context_blocking};
pub use recording::{Command, RecordingBackend};
pub use stage::{
    Geometry, PipelineStage, ProgramId, TrailShader, UNIFORM_SLOTS, Uniform, UniformSet,
    UniformValue,
};
pub use wgpu_backend::WgpuBackend;
