//! A [`DrawBackend`] that records commands instead of drawing them.
//!
//! Used by headless runs and by tests that inspect what an effect drew.

use rustc_hash::FxHashMap;

use crate::backend::{DrawBackend, RenderError, RenderTarget, TargetId};
use crate::stage::{Geometry, PipelineStage, ProgramId};

/// One recorded backend call.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Clear {
        target: RenderTarget,
        color: [f32; 4],
    },
    Draw {
        target: RenderTarget,
        stage: PipelineStage,
        geometry: Geometry,
    },
}

/// Records every clear and draw, and tracks live off-screen targets.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    commands: Vec<Command>,
    targets: FxHashMap<TargetId, (u32, u32)>,
    next_id: u32,
    allocations: usize,
    /// When set, every `create_target` call fails with `ResourceExhausted`.
    pub fail_allocations: bool,
    /// When set, every `draw` call fails.
    pub fail_draws: bool,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Drop recorded commands, keeping targets alive.
    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    /// Number of successful `create_target` calls so far.
    pub fn allocation_count(&self) -> usize {
        self.allocations
    }

    pub fn live_targets(&self) -> usize {
        self.targets.len()
    }

    pub fn target_size(&self, id: TargetId) -> Option<(u32, u32)> {
        self.targets.get(&id).copied()
    }

    /// Every recorded draw, in order.
    pub fn draws(&self) -> impl Iterator<Item = (&RenderTarget, &PipelineStage, Geometry)> {
        self.commands.iter().filter_map(|c| match c {
            Command::Draw {
                target,
                stage,
                geometry,
            } => Some((target, stage, *geometry)),
            Command::Clear { .. } => None,
        })
    }

    /// Recorded draws that used `program`.
    pub fn draws_for(&self, program: ProgramId) -> Vec<&PipelineStage> {
        self.draws()
            .filter(|(_, stage, _)| stage.program == program)
            .map(|(_, stage, _)| stage)
            .collect()
    }

    /// Programs of every recorded draw, in order.
    pub fn program_sequence(&self) -> Vec<ProgramId> {
        self.draws().map(|(_, stage, _)| stage.program).collect()
    }
}

impl DrawBackend for RecordingBackend {
    fn create_target(&mut self, width: u32, height: u32) -> Result<TargetId, RenderError> {
        if self.fail_allocations || width == 0 || height == 0 {
            return Err(RenderError::ResourceExhausted { width, height });
        }
        let id = TargetId(self.next_id);
        self.next_id += 1;
        self.allocations += 1;
        self.targets.insert(id, (width, height));
        Ok(id)
    }

    fn destroy_target(&mut self, id: TargetId) {
        self.targets.remove(&id);
    }

    fn clear(&mut self, target: RenderTarget, color: [f32; 4]) -> Result<(), RenderError> {
        if let RenderTarget::Offscreen(id) = target
            && !self.targets.contains_key(&id)
        {
            return Err(RenderError::UnknownTarget(id));
        }
        self.commands.push(Command::Clear { target, color });
        Ok(())
    }

    fn draw(
        &mut self,
        target: RenderTarget,
        stage: &PipelineStage,
        geometry: Geometry,
    ) -> Result<(), RenderError> {
        if self.fail_draws {
            return Err(RenderError::Backend(format!(
                "draw with {:?} rejected",
                stage.program
            )));
        }
        if let RenderTarget::Offscreen(id) = target
            && !self.targets.contains_key(&id)
        {
            return Err(RenderError::UnknownTarget(id));
        }
        if let Some(id) = stage.texture
            && !self.targets.contains_key(&id)
        {
            return Err(RenderError::UnknownTarget(id));
        }
        self.commands.push(Command::Draw {
            target,
            stage: stage.clone(),
            geometry,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::UniformSet;

    #[test]
    fn test_targets_are_tracked() {
        let mut backend = RecordingBackend::new();
        let a = backend.create_target(64, 32).unwrap();
        let b = backend.create_target(16, 16).unwrap();
        assert_ne!(a, b);
        assert_eq!(backend.live_targets(), 2);
        assert_eq!(backend.target_size(a), Some((64, 32)));
        backend.destroy_target(a);
        assert_eq!(backend.live_targets(), 1);
        assert_eq!(backend.allocation_count(), 2);
    }

    #[test]
    fn test_failed_allocation() {
        let mut backend = RecordingBackend::new();
        backend.fail_allocations = true;
        assert!(matches!(
            backend.create_target(10, 10),
            Err(RenderError::ResourceExhausted {
                width: 10,
                height: 10
            })
        ));
        assert_eq!(backend.allocation_count(), 0);
    }

    #[test]
    fn test_draw_into_destroyed_target_fails() {
        let mut backend = RecordingBackend::new();
        let id = backend.create_target(4, 4).unwrap();
        backend.destroy_target(id);
        let stage = PipelineStage::new(ProgramId::NebulaPuff, UniformSet::new());
        let result = backend.draw(RenderTarget::Offscreen(id), &stage, Geometry::UnitQuad);
        assert!(matches!(result, Err(RenderError::UnknownTarget(_))));
        assert!(backend.commands().is_empty());
    }

    #[test]
    fn test_draws_for_filters_by_program() {
        let mut backend = RecordingBackend::new();
        let puff = PipelineStage::new(ProgramId::NebulaPuff, UniformSet::new());
        backend
            .draw(RenderTarget::Screen, &puff, Geometry::CenteredQuad)
            .unwrap();
        backend
            .clear(RenderTarget::Screen, [0.0, 0.0, 0.0, 1.0])
            .unwrap();
        backend
            .draw(RenderTarget::Screen, &puff, Geometry::CenteredQuad)
            .unwrap();
        assert_eq!(backend.draws_for(ProgramId::NebulaPuff).len(), 2);
        assert!(backend.draws_for(ProgramId::TextureBlit).is_empty());
        assert_eq!(backend.commands().len(), 3);
    }
}
