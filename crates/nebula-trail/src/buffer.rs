//! Fixed-capacity ring of trail samples.
//!
//! The read and write indices only ever grow; slots are addressed with
//! `index & (capacity - 1)`. The live span is `read..write` and never holds
//! more than `capacity` points.

use glam::Vec2;
use nebula_render::TrailShader;

use crate::spec::{TrailSpec, TrailStyle};

/// One recorded position of a trail emitter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrailPoint {
    pub position: Vec2,
    pub color: [f32; 4],
    /// Remaining life, 1 when sampled and 0 at expiry.
    pub t: f32,
    pub thickness: f32,
}

impl TrailPoint {
    const EMPTY: TrailPoint = TrailPoint {
        position: Vec2::ZERO,
        color: [0.0; 4],
        t: 0.0,
        thickness: 0.0,
    };
}

/// Shortest sample interval a ring is sized for, in seconds.
pub const MIN_SAMPLE_INTERVAL: f32 = 1e-3;

/// Smallest power of two that is at least `n` (and at least 1).
pub fn round_capacity(n: usize) -> usize {
    n.max(1).next_power_of_two()
}

#[derive(Debug)]
pub struct TrailBuffer {
    ttl: f32,
    shader: TrailShader,
    nebula_only: bool,
    points: Box<[TrailPoint]>,
    read: usize,
    write: usize,
    refcount: u32,
    seed: f32,
    since_sample: f32,
}

impl TrailBuffer {
    /// Ring sized to hold every sample taken at `sample_interval` over the
    /// spec's lifetime, plus one. Intervals below [`MIN_SAMPLE_INTERVAL`]
    /// are clamped up to it.
    pub fn new(spec: &TrailSpec, sample_interval: f32, seed: f32) -> Self {
        let interval = if sample_interval.is_finite() && sample_interval > 0.0 {
            sample_interval.max(MIN_SAMPLE_INTERVAL)
        } else {
            spec.ttl
        };
        let needed = (spec.ttl / interval).ceil() as usize + 1;
        Self::with_capacity(spec, round_capacity(needed), seed)
    }

    /// Ring with an explicit capacity, rounded up to a power of two.
    pub fn with_capacity(spec: &TrailSpec, capacity: usize, seed: f32) -> Self {
        let capacity = round_capacity(capacity);
        Self {
            ttl: spec.ttl,
            shader: spec.shader,
            nebula_only: spec.nebula_only,
            points: vec![TrailPoint::EMPTY; capacity].into_boxed_slice(),
            read: 0,
            write: 0,
            refcount: 0,
            seed,
            since_sample: 0.0,
        }
    }

    #[inline]
    fn mask(&self) -> usize {
        self.points.len() - 1
    }

    #[inline]
    fn at(&self, index: usize) -> &TrailPoint {
        &self.points[index & self.mask()]
    }

    /// Record the emitter at `position`. Evicts the oldest sample when full.
    pub fn sample(&mut self, position: Vec2, style: TrailStyle) {
        let mask = self.mask();
        self.points[self.write & mask] = TrailPoint {
            position,
            color: style.color,
            t: 1.0,
            thickness: style.thickness,
        };
        self.write += 1;
        if self.write - self.read > self.points.len() {
            self.read += 1;
        }
        self.since_sample = 0.0;
    }

    /// Age every live sample by `dt` seconds and drop expired ones.
    ///
    /// A sample that reaches exactly zero survives this call and goes on the
    /// next one.
    pub fn advance(&mut self, dt: f32) {
        let rel = dt / self.ttl;
        let mask = self.mask();
        for i in self.read..self.write {
            self.points[i & mask].t -= rel;
        }
        // Samples are written in order, so expired ones sit at the front.
        while self.read < self.write && self.points[self.read & mask].t < 0.0 {
            self.read += 1;
        }
        self.since_sample += dt;
    }

    pub fn retain(&mut self) {
        self.refcount += 1;
    }

    /// Drop one reference. Extra calls do nothing.
    pub fn remove(&mut self) {
        self.refcount = self.refcount.saturating_sub(1);
    }

    pub fn refcount(&self) -> u32 {
        self.refcount
    }

    /// No references left and nothing left to draw.
    pub fn is_reclaimable(&self) -> bool {
        self.refcount == 0 && self.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.read == self.write
    }

    pub fn len(&self) -> usize {
        self.write - self.read
    }

    pub fn capacity(&self) -> usize {
        self.points.len()
    }

    pub fn read_index(&self) -> usize {
        self.read
    }

    pub fn write_index(&self) -> usize {
        self.write
    }

    /// Live samples, oldest first.
    pub fn points(&self) -> impl ExactSizeIterator<Item = &TrailPoint> + '_ {
        (self.read..self.write).map(move |i| self.at(i))
    }

    /// Oldest live sample.
    pub fn front(&self) -> Option<&TrailPoint> {
        (!self.is_empty()).then(|| self.at(self.read))
    }

    /// Newest live sample.
    pub fn back(&self) -> Option<&TrailPoint> {
        (!self.is_empty()).then(|| self.at(self.write - 1))
    }

    pub fn ttl(&self) -> f32 {
        self.ttl
    }

    pub fn shader(&self) -> TrailShader {
        self.shader
    }

    pub fn nebula_only(&self) -> bool {
        self.nebula_only
    }

    /// Per-instance random value in `[0, 1)` fed to the trail shader.
    pub fn seed(&self) -> f32 {
        self.seed
    }

    /// Seconds since the last sample.
    pub fn since_sample(&self) -> f32 {
        self.since_sample
    }
}
