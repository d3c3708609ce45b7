//! The drawing seam between the effects layer and a graphics API.

use std::fmt;

use crate::stage::{Geometry, PipelineStage};

/// Handle to an off-screen render target owned by a [`DrawBackend`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub u32);

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "target#{}", self.0)
    }
}

/// Where a draw or clear lands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderTarget {
    /// The presented frame.
    Screen,
    /// An off-screen target previously returned by [`DrawBackend::create_target`].
    Offscreen(TargetId),
}

/// Errors reported by a [`DrawBackend`].
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("could not allocate a {width}x{height} render target")]
    ResourceExhausted { width: u32, height: u32 },
    #[error("render target {0} does not exist")]
    UnknownTarget(TargetId),
    #[error("graphics backend error: {0}")]
    Backend(String),
}

/// Minimal drawing interface used by trails and the nebula.
///
/// Every draw is self-contained: the stage names the program and carries all
/// of its uniforms, so implementations never depend on earlier calls having
/// bound anything.
pub trait DrawBackend {
    /// Allocate an off-screen colour target of the given size.
    fn create_target(&mut self, width: u32, height: u32) -> Result<TargetId, RenderError>;

    /// Release a target. Unknown ids are ignored.
    fn destroy_target(&mut self, id: TargetId);

    /// Clear `target` to `color` (premultiplied RGBA).
    fn clear(&mut self, target: RenderTarget, color: [f32; 4]) -> Result<(), RenderError>;

    /// Draw `geometry` into `target` with `stage`.
    fn draw(
        &mut self,
        target: RenderTarget,
        stage: &PipelineStage,
        geometry: Geometry,
    ) -> Result<(), RenderError>;
}

/// Reports the first failure of a recurring operation and stays quiet after.
///
/// Draw calls repeat every frame; a broken program would otherwise flood the
/// log with one identical error per frame.
#[derive(Debug)]
pub struct FailureLatch {
    label: &'static str,
    reported: bool,
}

impl FailureLatch {
    pub const fn new(label: &'static str) -> Self {
        Self {
            label,
            reported: false,
        }
    }

    /// Log `result`'s error the first time one is seen; return whether it succeeded.
    pub fn check(&mut self, result: Result<(), RenderError>) -> bool {
        match result {
            Ok(()) => true,
            Err(err) => {
                if !self.reported {
                    log::error!("{} failed: {err}", self.label);
                    self.reported = true;
                }
                false
            }
        }
    }

    /// Whether a failure has already been reported.
    pub fn has_reported(&self) -> bool {
        self.reported
    }
}
