//! Adaptive COPY threshold

use std::sync::atomic::{AtomicUsize, Ordering};

/// Batch size at or above which the COPY path is used
///
/// In adaptive mode the threshold doubles when batches run far above it and
/// halves when they run well below it, bounded by `[min, max]`.
#[derive(Debug)]
pub struct AdaptiveThreshold {
    current: AtomicUsize,
    min: usize,
    max: usize,
    adaptive: bool,
}

impl AdaptiveThreshold {
    pub fn new(initial: usize, min: usize, max: usize, adaptive: bool) -> Self {
        let min = min.max(1);
        let max = max.max(min);
        Self {
            current: AtomicUsize::new(initial.clamp(min, max)),
            min,
            max,
            adaptive,
        }
    }

    pub fn current(&self) -> usize {
        self.current.load(Ordering::Relaxed)
    }

    /// Records a batch of `size` rows and returns the threshold that applied to it
    pub fn observe(&self, size: usize) -> usize {
        if !self.adaptive {
            return self.current();
        }

        let (min, max) = (self.min, self.max);
        let previous = self
            .current
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |t| {
                if size > t.saturating_mul(4) && t < max {
                    Some(t.saturating_mul(2).min(max))
                } else if size < t / 2 && t > min {
                    Some((t / 2).max(min))
                } else {
                    None
                }
            })
            .unwrap_or_else(|unchanged| unchanged);

        let updated = self.current();
        if updated != previous {
            tracing::debug!(batch_size = size, previous, updated, "Adjusted COPY threshold");
        }
        previous
    }
}
