use std::num::NonZeroUsize;

use futures::FutureExt;
use tokio::task::JoinHandle;
use tracing::error;

/// Handle to a unit of work occupying a slot.
pub trait InFlight {
    /// Non-blocking completion check.
    fn is_finished(&self) -> bool;

    /// Consumes a finished handle. `slot` is only used for reporting.
    fn release(self, slot: usize) -> Outcome;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Failed,
}

impl<T> InFlight for JoinHandle<T> {
    #[inline]
    fn is_finished(&self) -> bool {
        JoinHandle::is_finished(self)
    }

    fn release(self, slot: usize) -> Outcome {
        // The task is finished, so this never has to wait.
        match self.now_or_never() {
            Some(Ok(_)) | None => Outcome::Completed,
            Some(Err(err)) => {
                error!(slot, "query task did not complete: {err}");
                Outcome::Failed
            }
        }
    }
}

/// Fixed set of query stream slots, each free or holding one in-flight handle.
#[derive(Debug)]
pub struct SlotPool<H: InFlight> {
    slots: Box<[Option<H>]>,
}

impl<H: InFlight> SlotPool<H> {
    pub fn new(size: NonZeroUsize) -> Self {
        Self {
            slots: (0..size.get()).map(|_| None).collect(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_occupied(&self, index: usize) -> bool {
        self.slots[index].is_some()
    }

    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    #[inline]
    pub fn is_idle(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// First free slot, scanning from zero.
    pub fn find_free_slot(&self) -> Option<usize> {
        self.slots.iter().position(Option::is_none)
    }

    /// # Panics
    /// If `index` is out of range.
    pub fn mark_occupied(&mut self, index: usize, handle: H) {
        debug_assert!(!self.is_occupied(index), "slot {index} is already occupied");
        self.slots[index] = Some(handle);
    }

    /// Frees the slot if its handle has finished. Never waits.
    ///
    /// Returns `Some` with the outcome of the released handle, `None` if the
    /// slot is free or still running.
    pub fn poll_release(&mut self, index: usize) -> Option<Outcome> {
        let finished = self.slots[index]
            .as_ref()
            .is_some_and(|handle| handle.is_finished());

        if !finished {
            return None;
        }

        self.slots[index].take().map(|handle| handle.release(index))
    }

    /// Frees the slot if its handle has finished; `true` if it was released.
    #[inline]
    pub fn poll_and_release(&mut self, index: usize) -> bool {
        self.poll_release(index).is_some()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        num::NonZeroUsize,
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
    };

    use super::{InFlight, Outcome, SlotPool};

    #[derive(Debug, Clone, Default)]
    struct Flag(Arc<AtomicBool>);

    impl Flag {
        fn finish(&self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    impl InFlight for Flag {
        fn is_finished(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }

        fn release(self, _slot: usize) -> Outcome {
            Outcome::Completed
        }
    }

    fn pool(size: usize) -> SlotPool<Flag> {
        SlotPool::new(NonZeroUsize::new(size).unwrap())
    }

    #[test]
    fn test_find_free_slot_scans_from_zero() {
        let mut pool = pool(3);
        assert_eq!(pool.len(), 3);
        assert!(pool.is_idle());
        assert_eq!(pool.find_free_slot(), Some(0));

        pool.mark_occupied(0, Flag::default());
        assert_eq!(pool.find_free_slot(), Some(1));

        pool.mark_occupied(1, Flag::default());
        pool.mark_occupied(2, Flag::default());
        assert_eq!(pool.find_free_slot(), None);
        assert_eq!(pool.occupied(), 3);
    }

    #[test]
    fn test_poll_and_release_only_frees_finished() {
        let mut pool = pool(2);
        let first = Flag::default();
        let second = Flag::default();

        pool.mark_occupied(0, first.clone());
        pool.mark_occupied(1, second.clone());

        assert!(!pool.poll_and_release(0));
        assert!(pool.is_occupied(0));

        second.finish();
        assert!(pool.poll_and_release(1));
        assert!(!pool.is_occupied(1));
        assert_eq!(pool.find_free_slot(), Some(1));

        // Already free.
        assert!(!pool.poll_and_release(1));

        first.finish();
        assert_eq!(pool.poll_release(0), Some(Outcome::Completed));
        assert!(pool.is_idle());
    }

    #[test]
    fn test_slots_are_reused_lowest_first() {
        let mut pool = pool(3);
        let flags = (0..3).map(|_| Flag::default()).collect::<Vec<_>>();

        flags
            .iter()
            .enumerate()
            .for_each(|(index, flag)| pool.mark_occupied(index, flag.clone()));

        flags[2].finish();
        flags[1].finish();
        (0..3).for_each(|index| {
            pool.poll_and_release(index);
        });

        assert_eq!(pool.find_free_slot(), Some(1));
        assert_eq!(pool.occupied(), 1);
    }

    #[tokio::test]
    async fn test_join_handle_panic_is_reported_as_failed() {
        let mut pool = SlotPool::new(NonZeroUsize::new(1).unwrap());

        let handle = tokio::task::spawn_blocking(|| panic!("engine blew up"));
        pool.mark_occupied(0, handle);

        let outcome = loop {
            if let Some(outcome) = pool.poll_release(0) {
                break outcome;
            }
            tokio::task::yield_now().await;
        };

        assert_eq!(outcome, Outcome::Failed);
        assert!(pool.is_idle());
    }
}
