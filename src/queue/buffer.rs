//! Two storage areas that trade roles once per pass.
//!
//! The generation counter decides which area is active: `generation % 2` is the
//! active slot, the other one is staging. Appends hold the counter's read lock
//! only long enough to push into staging, so concurrent appenders never wait on
//! each other beyond the staging area's own mutex. [`DoubleBuffer::swap`] is the
//! only operation taking the write lock.

use parking_lot::{Mutex, RwLock};
use std::mem;

pub(crate) struct DoubleBuffer<B> {
    areas: [Mutex<B>; 2],
    generation: RwLock<u64>,
}

fn active_slot(generation: u64) -> usize {
    (generation % 2) as usize
}

fn staging_slot(generation: u64) -> usize {
    ((generation + 1) % 2) as usize
}

impl<B: Default> DoubleBuffer<B> {
    pub fn new() -> Self {
        Self {
            areas: [Mutex::new(B::default()), Mutex::new(B::default())],
            generation: RwLock::new(0),
        }
    }

    /// Run `f` against the staging area.
    ///
    /// `f` must not call back into this buffer.
    pub fn with_staging<R>(&self, f: impl FnOnce(&mut B) -> R) -> R {
        let generation = self.generation.read();
        let mut area = self.areas[staging_slot(*generation)].lock();
        f(&mut area)
    }

    /// Promote staging to active and check its contents out.
    ///
    /// The area that was active before becomes the new staging area. Its
    /// contents were checked out by the previous swap, so it starts empty apart
    /// from whatever has been handed back through [`Self::with_staging`].
    pub fn swap(&self) -> (u64, B) {
        let mut generation = self.generation.write();
        *generation += 1;
        let contents = mem::take(&mut *self.areas[active_slot(*generation)].lock());
        (*generation, contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_appends_land_in_next_generation() {
        let buffer: DoubleBuffer<Vec<u32>> = DoubleBuffer::new();
        buffer.with_staging(|area| area.push(1));
        buffer.with_staging(|area| area.push(2));

        let (generation, active) = buffer.swap();
        assert_eq!(generation, 1);
        assert_eq!(active, vec![1, 2]);

        // Appended after the swap: invisible to the checked-out generation
        buffer.with_staging(|area| area.push(3));
        let (generation, active) = buffer.swap();
        assert_eq!(generation, 2);
        assert_eq!(active, vec![3]);

        let (_, active) = buffer.swap();
        assert!(active.is_empty());
    }

    #[test]
    fn test_roles_alternate() {
        assert_eq!(active_slot(1), 1);
        assert_eq!(staging_slot(1), 0);
        assert_eq!(active_slot(2), 0);
        assert_eq!(staging_slot(2), 1);
    }

    #[test]
    fn test_concurrent_appends_and_swaps_lose_nothing() {
        let buffer: Arc<DoubleBuffer<Vec<u32>>> = Arc::new(DoubleBuffer::new());
        let writers: Vec<_> = (0..8)
            .map(|w| {
                let buffer = Arc::clone(&buffer);
                thread::spawn(move || {
                    for i in 0..500 {
                        buffer.with_staging(|area| area.push(w * 1000 + i));
                    }
                })
            })
            .collect();

        let mut seen = Vec::new();
        while writers.iter().any(|w| !w.is_finished()) {
            seen.extend(buffer.swap().1);
        }
        for writer in writers {
            writer.join().unwrap();
        }
        // Two more swaps drain both areas
        seen.extend(buffer.swap().1);
        seen.extend(buffer.swap().1);

        seen.sort_unstable();
        let mut expected: Vec<u32> = (0..8).flat_map(|w| (0..500).map(move |i| w * 1000 + i)).collect();
        expected.sort_unstable();
        assert_eq!(seen, expected);
    }
}
