//! Trail specs: immutable per-kind settings loaded once at startup.

use std::path::Path;

use nebula_render::TrailShader;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::TrailError;

/// Thickness used when a spec omits one.
pub const DEFAULT_THICKNESS: f32 = 1.0;

/// Resolved colour and thickness of one sample.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrailStyle {
    pub color: [f32; 4],
    pub thickness: f32,
}

impl TrailStyle {
    pub const fn new(color: [f32; 4], thickness: f32) -> Self {
        Self { color, thickness }
    }

    /// Whether drawing with this style would show nothing.
    pub fn is_transparent(&self) -> bool {
        self.color[3] <= 0.0
    }
}

/// Emitter state selecting which style a sample is drawn with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrailMode {
    #[default]
    Idle,
    Glow,
    Afterburn,
    Jump,
}

/// A style as written in a spec; thickness falls back to the spec default.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StyleSpec {
    pub color: [f32; 4],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thickness: Option<f32>,
}

impl StyleSpec {
    pub const fn color(color: [f32; 4]) -> Self {
        Self {
            color,
            thickness: None,
        }
    }

    pub const fn with_thickness(color: [f32; 4], thickness: f32) -> Self {
        Self {
            color,
            thickness: Some(thickness),
        }
    }
}

fn default_thickness() -> f32 {
    DEFAULT_THICKNESS
}

/// Everything that makes one kind of trail look the way it does.
///
/// Styles other than `idle` may be omitted and then reuse `idle`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrailSpec {
    pub name: String,
    /// Seconds a sample stays visible.
    pub ttl: f32,
    #[serde(default = "default_thickness")]
    pub thickness: f32,
    #[serde(default)]
    pub shader: TrailShader,
    pub idle: StyleSpec,
    #[serde(default)]
    pub glow: Option<StyleSpec>,
    #[serde(default)]
    pub afterburn: Option<StyleSpec>,
    #[serde(default)]
    pub jump: Option<StyleSpec>,
    /// Only drawn while the player is inside a nebula.
    #[serde(default)]
    pub nebula_only: bool,
}

impl TrailSpec {
    /// A spec with a single idle style and defaults for everything else.
    pub fn new(name: impl Into<String>, ttl: f32, idle: StyleSpec) -> Self {
        Self {
            name: name.into(),
            ttl,
            thickness: DEFAULT_THICKNESS,
            shader: TrailShader::Default,
            idle,
            glow: None,
            afterburn: None,
            jump: None,
            nebula_only: false,
        }
    }

    /// Check that the spec can be drawn.
    pub fn validate(&self) -> Result<(), TrailError> {
        let invalid = |reason: String| TrailError::InvalidSpec {
            name: self.name.clone(),
            reason,
        };
        if !self.ttl.is_finite() || self.ttl <= 0.0 {
            return Err(invalid(format!("ttl must be positive, got {}", self.ttl)));
        }
        if !self.thickness.is_finite() || self.thickness < 0.0 {
            return Err(invalid(format!(
                "thickness must be non-negative, got {}",
                self.thickness
            )));
        }
        for (mode, style) in self.style_specs() {
            if let Some(t) = style.thickness
                && (!t.is_finite() || t < 0.0)
            {
                return Err(invalid(format!("{mode:?} thickness must be non-negative, got {t}")));
            }
            if style.color.iter().any(|c| !c.is_finite() || !(0.0..=1.0).contains(c)) {
                return Err(invalid(format!(
                    "{mode:?} colour channels must lie in [0, 1], got {:?}",
                    style.color
                )));
            }
        }
        Ok(())
    }

    fn style_specs(&self) -> [(TrailMode, &StyleSpec); 4] {
        [
            (TrailMode::Idle, &self.idle),
            (TrailMode::Glow, self.glow.as_ref().unwrap_or(&self.idle)),
            (
                TrailMode::Afterburn,
                self.afterburn.as_ref().unwrap_or(&self.idle),
            ),
            (TrailMode::Jump, self.jump.as_ref().unwrap_or(&self.idle)),
        ]
    }

    /// Resolved style for `mode`.
    pub fn style(&self, mode: TrailMode) -> TrailStyle {
        let spec = match mode {
            TrailMode::Idle => &self.idle,
            TrailMode::Glow => self.glow.as_ref().unwrap_or(&self.idle),
            TrailMode::Afterburn => self.afterburn.as_ref().unwrap_or(&self.idle),
            TrailMode::Jump => self.jump.as_ref().unwrap_or(&self.idle),
        };
        TrailStyle::new(spec.color, spec.thickness.unwrap_or(self.thickness))
    }
}

/// Name-indexed collection of validated specs.
#[derive(Debug, Default)]
pub struct TrailCatalog {
    specs: Vec<TrailSpec>,
    by_name: FxHashMap<String, usize>,
}

impl TrailCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and add `spec`. Names must be unique.
    pub fn insert(&mut self, spec: TrailSpec) -> Result<(), TrailError> {
        spec.validate()?;
        if self.by_name.contains_key(&spec.name) {
            return Err(TrailError::DuplicateName(spec.name));
        }
        self.by_name.insert(spec.name.clone(), self.specs.len());
        self.specs.push(spec);
        Ok(())
    }

    /// Parse a RON list of specs.
    pub fn from_ron_str(source: &str) -> Result<Self, TrailError> {
        let specs: Vec<TrailSpec> = ron::from_str(source).map_err(TrailError::ParseError)?;
        let mut catalog = Self::new();
        for spec in specs {
            catalog.insert(spec)?;
        }
        log::debug!("Loaded {} trail specs", catalog.len());
        Ok(catalog)
    }

    /// Read and parse a RON catalog file.
    pub fn load(path: &Path) -> Result<Self, TrailError> {
        let contents = std::fs::read_to_string(path).map_err(TrailError::ReadError)?;
        Self::from_ron_str(&contents)
    }

    pub fn get(&self, name: &str) -> Option<&TrailSpec> {
        self.by_name.get(name).map(|&i| &self.specs[i])
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Specs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &TrailSpec> {
        self.specs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

    #[test]
    fn test_valid_spec_passes() {
        let spec = TrailSpec::new("exhaust", 1.5, StyleSpec::color(WHITE));
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let spec = TrailSpec::new("bad", 0.0, StyleSpec::color(WHITE));
        let err = spec.validate().unwrap_err();
        assert!(matches!(err, TrailError::InvalidSpec { ref name, .. } if name == "bad"));
    }

    #[test]
    fn test_nan_ttl_rejected() {
        let spec = TrailSpec::new("bad", f32::NAN, StyleSpec::color(WHITE));
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_negative_thickness_rejected() {
        let mut spec = TrailSpec::new("bad", 1.0, StyleSpec::color(WHITE));
        spec.glow = Some(StyleSpec::with_thickness(WHITE, -2.0));
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_out_of_range_colour_rejected() {
        let spec = TrailSpec::new("bad", 1.0, StyleSpec::color([1.5, 0.0, 0.0, 1.0]));
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_omitted_thickness_inherits_default() {
        let mut spec = TrailSpec::new("t", 1.0, StyleSpec::color(WHITE));
        spec.thickness = 3.0;
        spec.afterburn = Some(StyleSpec::with_thickness([1.0, 0.5, 0.0, 1.0], 6.0));
        assert_eq!(spec.style(TrailMode::Idle).thickness, 3.0);
        assert_eq!(spec.style(TrailMode::Afterburn).thickness, 6.0);
    }

    #[test]
    fn test_omitted_modes_reuse_idle() {
        let spec = TrailSpec::new("t", 1.0, StyleSpec::color([0.2, 0.4, 0.6, 0.8]));
        assert_eq!(spec.style(TrailMode::Jump), spec.style(TrailMode::Idle));
        assert_eq!(spec.style(TrailMode::Glow).color, [0.2, 0.4, 0.6, 0.8]);
    }

    #[test]
    fn test_catalog_from_ron() {
        let source = r#"[
            (
                name: "ion",
                ttl: 0.8,
                thickness: 2.0,
                shader: Pulse,
                idle: (color: (0.3, 0.6, 1.0, 0.7)),
                afterburn: Some((color: (0.6, 0.8, 1.0, 1.0), thickness: Some(4.0))),
            ),
            (
                name: "nebula-wake",
                ttl: 2.0,
                idle: (color: (0.8, 0.8, 1.0, 0.4)),
                nebula_only: true,
            ),
        ]"#;
        let catalog = TrailCatalog::from_ron_str(source).unwrap();
        assert_eq!(catalog.len(), 2);
        let ion = catalog.get("ion").unwrap();
        assert_eq!(ion.shader, TrailShader::Pulse);
        assert_eq!(ion.style(TrailMode::Afterburn).thickness, 4.0);
        assert_eq!(ion.style(TrailMode::Idle).thickness, 2.0);
        let wake = catalog.get("nebula-wake").unwrap();
        assert!(wake.nebula_only);
        assert_eq!(wake.thickness, DEFAULT_THICKNESS);
        assert!(catalog.get("missing").is_none());
    }

    #[test]
    fn test_catalog_rejects_duplicates() {
        let mut catalog = TrailCatalog::new();
        catalog
            .insert(TrailSpec::new("a", 1.0, StyleSpec::color(WHITE)))
            .unwrap();
        let err = catalog
            .insert(TrailSpec::new("a", 2.0, StyleSpec::color(WHITE)))
            .unwrap_err();
        assert!(matches!(err, TrailError::DuplicateName(ref n) if n == "a"));
    }

    #[test]
    fn test_catalog_rejects_invalid_entry() {
        let source = r#"[(name: "x", ttl: -1.0, idle: (color: (1.0, 1.0, 1.0, 1.0)))]"#;
        assert!(matches!(
            TrailCatalog::from_ron_str(source),
            Err(TrailError::InvalidSpec { .. })
        ));
    }

    #[test]
    fn test_catalog_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trails.ron");
        std::fs::write(&path, r#"[(name: "f", ttl: 1.0, idle: (color: (1.0, 0.5, 0.0, 1.0)))]"#)
            .unwrap();
        let catalog = TrailCatalog::load(&path).unwrap();
        assert!(catalog.get("f").is_some());
    }

    #[test]
    fn test_catalog_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = TrailCatalog::load(&dir.path().join("nope.ron"));
        assert!(matches!(result, Err(TrailError::ReadError(_))));
    }
}
