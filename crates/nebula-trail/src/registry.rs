//! Owner of every live trail.
//!
//! Emitters hold [`TrailHandle`]s; the registry holds the buffers. A trail
//! whose last reference is dropped keeps fading and is reclaimed by
//! [`TrailRegistry::tick`] once its final sample expires.

use glam::Vec2;
use nebula_render::{DrawBackend, RenderBridge};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::buffer::{MIN_SAMPLE_INTERVAL, TrailBuffer};
use crate::error::TrailError;
use crate::render::TrailRenderer;
use crate::spec::{TrailMode, TrailSpec, TrailStyle};

/// Opaque reference to a trail in a [`TrailRegistry`].
///
/// Ids are never reused, so a handle to a reclaimed trail stays stale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrailHandle(u64);

impl TrailHandle {
    pub fn id(self) -> u64 {
        self.0
    }
}

struct Entry {
    handle: TrailHandle,
    buffer: TrailBuffer,
    styles: [TrailStyle; 4],
}

pub struct TrailRegistry {
    // Sorted by handle; handles are issued in increasing order.
    entries: Vec<Entry>,
    next_id: u64,
    sample_interval: f32,
    rng: ChaCha8Rng,
}

impl TrailRegistry {
    pub fn new(sample_interval: f32, seed: u64) -> Self {
        let sample_interval = if sample_interval > 0.0 && sample_interval < MIN_SAMPLE_INTERVAL {
            log::warn!(
                "Trail sample interval {sample_interval} too short, using {MIN_SAMPLE_INTERVAL}"
            );
            MIN_SAMPLE_INTERVAL
        } else {
            sample_interval
        };
        Self {
            entries: Vec::new(),
            next_id: 1,
            sample_interval,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Build a trail for `spec`, already retained once for the caller.
    pub fn create(&mut self, spec: &TrailSpec) -> Result<TrailHandle, TrailError> {
        spec.validate()?;
        let seed: f32 = self.rng.random();
        let mut buffer = TrailBuffer::new(spec, self.sample_interval, seed);
        buffer.retain();
        let handle = TrailHandle(self.next_id);
        self.next_id += 1;
        log::debug!(
            "Created trail {} '{}' (capacity {})",
            handle.0,
            spec.name,
            buffer.capacity()
        );
        self.entries.push(Entry {
            handle,
            buffer,
            styles: [
                spec.style(TrailMode::Idle),
                spec.style(TrailMode::Glow),
                spec.style(TrailMode::Afterburn),
                spec.style(TrailMode::Jump),
            ],
        });
        Ok(handle)
    }

    fn index(&self, handle: TrailHandle) -> Option<usize> {
        self.entries
            .binary_search_by_key(&handle, |e| e.handle)
            .ok()
    }

    fn entry_mut(&mut self, handle: TrailHandle, op: &str) -> Option<&mut Entry> {
        match self.index(handle) {
            Some(i) => Some(&mut self.entries[i]),
            None => {
                log::warn!("Trail {op} ignored: handle {} is stale", handle.0);
                None
            }
        }
    }

    /// Record a sample with an explicit style.
    pub fn sample(&mut self, handle: TrailHandle, position: Vec2, style: TrailStyle) {
        if let Some(entry) = self.entry_mut(handle, "sample") {
            entry.buffer.sample(position, style);
        }
    }

    /// Record a sample using the spec's style for `mode`.
    pub fn sample_mode(&mut self, handle: TrailHandle, position: Vec2, mode: TrailMode) {
        if let Some(entry) = self.entry_mut(handle, "sample") {
            let style = entry.styles[mode as usize];
            entry.buffer.sample(position, style);
        }
    }

    pub fn retain(&mut self, handle: TrailHandle) {
        if let Some(entry) = self.entry_mut(handle, "retain") {
            entry.buffer.retain();
        }
    }

    /// Release one reference. The trail fades out and is reclaimed later.
    pub fn remove(&mut self, handle: TrailHandle) {
        if let Some(entry) = self.entry_mut(handle, "remove") {
            entry.buffer.remove();
        }
    }

    /// Age every trail, then drop the ones nobody references that have emptied.
    pub fn tick(&mut self, dt: f32) {
        for entry in &mut self.entries {
            entry.buffer.advance(dt);
        }
        let before = self.entries.len();
        self.entries.retain(|e| !e.buffer.is_reclaimable());
        let reaped = before - self.entries.len();
        if reaped > 0 {
            log::trace!("Reclaimed {reaped} trails");
        }
    }

    /// Draw every trail visible in the current environment.
    pub fn render_all(
        &self,
        in_nebula: bool,
        renderer: &mut TrailRenderer,
        bridge: &dyn RenderBridge,
        backend: &mut dyn DrawBackend,
    ) {
        for entry in &self.entries {
            if entry.buffer.nebula_only() && !in_nebula {
                continue;
            }
            renderer.render(&entry.buffer, bridge, backend);
        }
    }

    /// Drop every trail regardless of references.
    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            log::debug!("Clearing {} trails", self.entries.len());
        }
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, handle: TrailHandle) -> Option<&TrailBuffer> {
        self.index(handle).map(|i| &self.entries[i].buffer)
    }

    /// Live trails in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (TrailHandle, &TrailBuffer)> {
        self.entries.iter().map(|e| (e.handle, &e.buffer))
    }

    pub fn sample_interval(&self) -> f32 {
        self.sample_interval
    }

    /// Whether `handle`'s trail has gone at least one sample interval
    /// without a sample.
    pub fn sample_due(&self, handle: TrailHandle) -> bool {
        self.get(handle)
            .is_some_and(|b| b.is_empty() || b.since_sample() >= self.sample_interval)
    }
}
