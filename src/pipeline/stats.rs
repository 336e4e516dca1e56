//! Cross-stage throughput and drop counters.

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam::utils::CachePadded;

/// Shared pipeline counters; each stage touches its own cache line.
#[derive(Default)]
pub struct PipelineStats {
    frames_captured: CachePadded<AtomicU64>,
    frames_dropped: CachePadded<AtomicU64>,
    frames_inferred: CachePadded<AtomicU64>,
    frames_decimated: CachePadded<AtomicU64>,
    results_dropped: CachePadded<AtomicU64>,
    overlays_rendered: CachePadded<AtomicU64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub frames_captured: u64,
    pub frames_dropped: u64,
    pub frames_inferred: u64,
    pub frames_decimated: u64,
    pub results_dropped: u64,
    pub overlays_rendered: u64,
}

impl PipelineStats {
    pub fn frame_captured(&self) {
        self.frames_captured.fetch_add(1, Ordering::Relaxed);
    }

    /// A frame publish hit a full channel and the new frame was discarded.
    pub fn frame_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frame_inferred(&self) {
        self.frames_inferred.fetch_add(1, Ordering::Relaxed);
    }

    /// A frame was skipped by the decimation factor, without inference.
    pub fn frame_decimated(&self) {
        self.frames_decimated.fetch_add(1, Ordering::Relaxed);
    }

    /// A result publish hit a full channel and the new result was discarded.
    pub fn result_dropped(&self) {
        self.results_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn overlay_rendered(&self) {
        self.overlays_rendered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_captured: self.frames_captured.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            frames_inferred: self.frames_inferred.load(Ordering::Relaxed),
            frames_decimated: self.frames_decimated.load(Ordering::Relaxed),
            results_dropped: self.results_dropped.load(Ordering::Relaxed),
            overlays_rendered: self.overlays_rendered.load(Ordering::Relaxed),
        }
    }
}
