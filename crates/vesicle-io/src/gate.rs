//! Admission control for the segmentation backend.
//!
//! A counting semaphore: at most `capacity` holders of a [`Permit`] at
//! once, one per accelerator device. Everything else in a stage runs
//! without it.

use parking_lot::{Condvar, Mutex};
use vesicle_pipeline::{GrayImage, MaskGenerator, MaskRecord, PipelineError};

/// Counting semaphore over a fixed number of slots.
#[derive(Debug)]
pub struct Gate {
    free: Mutex<usize>,
    released: Condvar,
    capacity: usize,
}

impl Gate {
    /// A gate with `capacity` slots (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            free: Mutex::new(capacity),
            released: Condvar::new(),
            capacity,
        }
    }

    /// Total slots.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Block until a slot is free and take it. The slot is returned when
    /// the permit drops.
    pub fn acquire(&self) -> Permit<'_> {
        let mut free = self.free.lock();
        while *free == 0 {
            self.released.wait(&mut free);
        }
        *free -= 1;
        Permit { gate: self }
    }

    fn release(&self) {
        *self.free.lock() += 1;
        self.released.notify_one();
    }
}

/// A held slot of a [`Gate`].
#[derive(Debug)]
pub struct Permit<'a> {
    gate: &'a Gate,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}

/// A backend whose every inference holds a slot of a [`Gate`].
#[derive(Debug)]
pub struct Gated<'a, G> {
    gate: &'a Gate,
    inner: &'a G,
}

impl<'a, G: MaskGenerator> Gated<'a, G> {
    /// Wrap `inner` behind `gate`.
    #[must_use]
    pub const fn new(gate: &'a Gate, inner: &'a G) -> Self {
        Self { gate, inner }
    }
}

impl<G: MaskGenerator> MaskGenerator for Gated<'_, G> {
    fn generate(&self, image: &GrayImage) -> Result<Vec<MaskRecord>, PipelineError> {
        let _permit = self.gate.acquire();
        self.inner.generate(image)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[test]
    fn never_exceeds_capacity() {
        let gate = Gate::new(2);
        let inside = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    let _permit = gate.acquire();
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(5));
                    inside.fetch_sub(1, Ordering::SeqCst);
                });
            }
        });

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(inside.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn zero_capacity_means_one() {
        let gate = Gate::new(0);
        assert_eq!(gate.capacity(), 1);
        drop(gate.acquire());
        drop(gate.acquire());
    }
}
