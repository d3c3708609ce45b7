//! Pipeline stages: a shader program paired with the uniform values it is drawn with.
//!
//! Nothing in the effects layer tracks a "currently bound program". Each draw
//! carries a complete [`PipelineStage`] value and the backend binds whatever
//! it needs for that one call.

use glam::{Mat4, Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::backend::TargetId;

/// Number of `vec4<f32>` slots in a packed uniform block (256 bytes).
pub const UNIFORM_SLOTS: usize = 16;

/// Shader variants available to trails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrailShader {
    /// Plain colour ribbon with a soft edge.
    #[default]
    Default,
    /// Brightness pulses travelling along the ribbon.
    Pulse,
    /// Ribbon whose edge wobbles sideways.
    Wave,
    /// Turbulent exhaust flame.
    Flame,
    /// Ribbon tinted by the surrounding nebula colour.
    Nebula,
}

impl TrailShader {
    /// Every variant, in pipeline creation order.
    pub const ALL: [TrailShader; 5] = [
        TrailShader::Default,
        TrailShader::Pulse,
        TrailShader::Wave,
        TrailShader::Flame,
        TrailShader::Nebula,
    ];
}

/// Identifies one shader program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProgramId {
    /// Animated nebula background fog.
    NebulaBackground,
    /// Fog-of-war overlay hiding what lies beyond the view radius.
    NebulaOverlay,
    /// A single drifting nebula puff.
    NebulaPuff,
    /// One segment of a trail ribbon.
    Trail(TrailShader),
    /// Copies an off-screen target onto the current target.
    TextureBlit,
}

impl ProgramId {
    /// Slot layout of this program's uniform block.
    ///
    /// Uniforms are packed in this order, each occupying one `vec4` slot
    /// (four for a matrix). Uniforms missing from a set are left zeroed.
    pub fn layout(self) -> &'static [Uniform] {
        match self {
            ProgramId::NebulaBackground => &[
                Uniform::Projection,
                Uniform::EddyScale,
                Uniform::Time,
                Uniform::Brightness,
                Uniform::Hue,
                Uniform::Volatility,
            ],
            ProgramId::NebulaOverlay => &[
                Uniform::Projection,
                Uniform::Horizon,
                Uniform::EddyScale,
                Uniform::Time,
                Uniform::Brightness,
                Uniform::Hue,
                Uniform::Center,
            ],
            ProgramId::NebulaPuff => &[
                Uniform::Projection,
                Uniform::Time,
                Uniform::Seed,
                Uniform::NebulaColor,
            ],
            ProgramId::Trail(_) => &[
                Uniform::Projection,
                Uniform::Color1,
                Uniform::Color2,
                Uniform::Ages,
                Uniform::Thickness,
                Uniform::Length,
                Uniform::TrailSeed,
                Uniform::TrailTime,
                Uniform::NebulaColor,
            ],
            ProgramId::TextureBlit => &[Uniform::Projection, Uniform::Color],
        }
    }

    /// Whether the program samples a source texture.
    pub fn samples_texture(self) -> bool {
        matches!(self, ProgramId::TextureBlit)
    }
}

/// Named shader parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Uniform {
    Projection,
    Time,
    Brightness,
    EddyScale,
    Horizon,
    Hue,
    Volatility,
    Center,
    NebulaColor,
    Seed,
    Color,
    Color1,
    Color2,
    Ages,
    Thickness,
    Length,
    TrailSeed,
    TrailTime,
}

/// A single uniform value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
}

impl UniformValue {
    /// Number of `vec4` slots this value occupies when packed.
    pub fn slots(&self) -> usize {
        match self {
            UniformValue::Mat4(_) => 4,
            _ => 1,
        }
    }

    fn write_slots(&self, out: &mut [[f32; 4]]) {
        match *self {
            UniformValue::Float(v) => out[0] = [v, 0.0, 0.0, 0.0],
            UniformValue::Vec2(v) => out[0] = [v.x, v.y, 0.0, 0.0],
            UniformValue::Vec3(v) => out[0] = [v.x, v.y, v.z, 0.0],
            UniformValue::Vec4(v) => out[0] = v.to_array(),
            UniformValue::Mat4(m) => {
                let cols = m.to_cols_array_2d();
                out[..4].copy_from_slice(&cols);
            }
        }
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<Vec2> for UniformValue {
    fn from(v: Vec2) -> Self {
        UniformValue::Vec2(v)
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        UniformValue::Vec3(v)
    }
}

impl From<Vec4> for UniformValue {
    fn from(v: Vec4) -> Self {
        UniformValue::Vec4(v)
    }
}

impl From<Mat4> for UniformValue {
    fn from(m: Mat4) -> Self {
        UniformValue::Mat4(m)
    }
}

/// An ordered set of uniform values. Setting an existing uniform replaces it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UniformSet {
    values: Vec<(Uniform, UniformValue)>,
}

impl UniformSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `uniform` to `value`, replacing any previous value.
    pub fn set(&mut self, uniform: Uniform, value: impl Into<UniformValue>) -> &mut Self {
        let value = value.into();
        match self.values.iter_mut().find(|(u, _)| *u == uniform) {
            Some(slot) => slot.1 = value,
            None => self.values.push((uniform, value)),
        }
        self
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, uniform: Uniform, value: impl Into<UniformValue>) -> Self {
        self.set(uniform, value);
        self
    }

    pub fn get(&self, uniform: Uniform) -> Option<UniformValue> {
        self.values
            .iter()
            .find(|(u, _)| *u == uniform)
            .map(|(_, v)| *v)
    }

    /// Scalar value of `uniform`, if it is set to a float.
    pub fn get_f32(&self, uniform: Uniform) -> Option<f32> {
        match self.get(uniform)? {
            UniformValue::Float(v) => Some(v),
            _ => None,
        }
    }

    /// Matrix value of `uniform`, if it is set to a matrix.
    pub fn get_mat4(&self, uniform: Uniform) -> Option<Mat4> {
        match self.get(uniform)? {
            UniformValue::Mat4(m) => Some(m),
            _ => None,
        }
    }

    /// Three-component value of `uniform`, if it is set to a `Vec3`.
    pub fn get_vec3(&self, uniform: Uniform) -> Option<Vec3> {
        match self.get(uniform)? {
            UniformValue::Vec3(v) => Some(v),
            _ => None,
        }
    }

    /// A copy of `self` with every value of `overrides` applied on top.
    pub fn merged(&self, overrides: &UniformSet) -> UniformSet {
        let mut out = self.clone();
        for (uniform, value) in &overrides.values {
            out.set(*uniform, *value);
        }
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Uniform, UniformValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Pack into `vec4` slots following `layout`.
    ///
    /// Values that would overflow [`UNIFORM_SLOTS`] are dropped with a warning.
    pub fn pack(&self, layout: &[Uniform]) -> [[f32; 4]; UNIFORM_SLOTS] {
        let mut out = [[0.0; 4]; UNIFORM_SLOTS];
        let mut cursor = 0;
        for uniform in layout {
            let width = match self.get(*uniform) {
                Some(value) => value.slots(),
                None if *uniform == Uniform::Projection => 4,
                None => 1,
            };
            if cursor + width > UNIFORM_SLOTS {
                log::warn!("uniform {uniform:?} does not fit the {UNIFORM_SLOTS}-slot block");
                break;
            }
            if let Some(value) = self.get(*uniform) {
                value.write_slots(&mut out[cursor..cursor + width]);
            }
            cursor += width;
        }
        out
    }
}

/// Geometry drawn by a stage. Both shapes are four-vertex triangle strips.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Geometry {
    /// The unit square `[0,1]²`.
    UnitQuad,
    /// The square `[-1,1]²`, centred on the origin.
    CenteredQuad,
}

impl Geometry {
    /// Strip vertices in draw order.
    pub fn vertices(self) -> [[f32; 2]; 4] {
        match self {
            Geometry::UnitQuad => [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]],
            Geometry::CenteredQuad => [[-1.0, -1.0], [1.0, -1.0], [-1.0, 1.0], [1.0, 1.0]],
        }
    }

    /// Offset of this shape's first vertex in a shared vertex buffer holding
    /// both shapes back to back.
    pub fn first_vertex(self) -> u32 {
        match self {
            Geometry::UnitQuad => 0,
            Geometry::CenteredQuad => 4,
        }
    }
}

/// A program, the uniforms to draw it with, and an optional source texture.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineStage {
    pub program: ProgramId,
    pub uniforms: UniformSet,
    pub texture: Option<TargetId>,
}

impl PipelineStage {
    pub fn new(program: ProgramId, uniforms: UniformSet) -> Self {
        Self {
            program,
            uniforms,
            texture: None,
        }
    }

    /// Sample `texture` while drawing this stage.
    pub fn with_texture(mut self, texture: TargetId) -> Self {
        self.texture = Some(texture);
        self
    }

    /// Pack the stage's uniforms with its program's layout.
    pub fn packed_uniforms(&self) -> [[f32; 4]; UNIFORM_SLOTS] {
        self.uniforms.pack(self.program.layout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_replaces_existing_value() {
        let mut set = UniformSet::new();
        set.set(Uniform::Time, 1.0);
        set.set(Uniform::Time, 2.0);
        assert_eq!(set.len(), 1);
        assert_eq!(set.get_f32(Uniform::Time), Some(2.0));
    }

    #[test]
    fn test_merged_overrides_take_precedence() {
        let base = UniformSet::new()
            .with(Uniform::Hue, 0.3)
            .with(Uniform::Time, 1.0);
        let frame = UniformSet::new().with(Uniform::Time, 5.0);
        let merged = base.merged(&frame);
        assert_eq!(merged.get_f32(Uniform::Hue), Some(0.3));
        assert_eq!(merged.get_f32(Uniform::Time), Some(5.0));
        // The base set is untouched.
        assert_eq!(base.get_f32(Uniform::Time), Some(1.0));
    }

    #[test]
    fn test_pack_places_matrix_in_first_four_slots() {
        let m = Mat4::from_translation(Vec3::new(3.0, 4.0, 0.0));
        let set = UniformSet::new()
            .with(Uniform::Projection, m)
            .with(Uniform::Brightness, 0.75)
            .with(Uniform::Time, 9.0)
            .with(Uniform::EddyScale, 2.0);
        let packed = set.pack(ProgramId::NebulaBackground.layout());
        assert_eq!(packed[3], [3.0, 4.0, 0.0, 1.0]);
        assert_eq!(packed[4][0], 2.0); // eddy scale
        assert_eq!(packed[5][0], 9.0); // time
        assert_eq!(packed[6][0], 0.75); // brightness
    }

    #[test]
    fn test_missing_uniforms_pack_as_zero() {
        let set = UniformSet::new().with(Uniform::Time, 1.5);
        let packed = set.pack(ProgramId::NebulaPuff.layout());
        assert_eq!(packed[0], [0.0; 4]);
        assert_eq!(packed[4][0], 1.5);
        assert_eq!(packed[5], [0.0; 4]);
    }

    #[test]
    fn test_every_layout_fits_the_uniform_block() {
        let mut programs = vec![
            ProgramId::NebulaBackground,
            ProgramId::NebulaOverlay,
            ProgramId::NebulaPuff,
            ProgramId::TextureBlit,
        ];
        programs.extend(TrailShader::ALL.iter().map(|s| ProgramId::Trail(*s)));
        for program in programs {
            let slots: usize = program
                .layout()
                .iter()
                .map(|u| if *u == Uniform::Projection { 4 } else { 1 })
                .sum();
            assert!(slots <= UNIFORM_SLOTS, "{program:?} needs {slots} slots");
        }
    }

    #[test]
    fn test_only_blit_samples_a_texture() {
        assert!(ProgramId::TextureBlit.samples_texture());
        assert!(!ProgramId::NebulaPuff.samples_texture());
        assert!(!ProgramId::Trail(TrailShader::Flame).samples_texture());
    }

    #[test]
    fn test_geometry_offsets_do_not_overlap() {
        assert_eq!(Geometry::UnitQuad.first_vertex(), 0);
        assert_eq!(Geometry::CenteredQuad.first_vertex(), 4);
        assert_eq!(Geometry::CenteredQuad.vertices()[0], [-1.0, -1.0]);
    }
}
