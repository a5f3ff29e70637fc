extern crate num_traits;

use std::ops::AddAssign;

use num_traits::Unsigned;

/// Monotonic counter used for run bookkeeping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Counter<T>(T)
where
    T: Copy + Unsigned + AddAssign;

impl<T> Counter<T>
where
    T: Copy + Unsigned + AddAssign,
{
    #[inline]
    pub fn increment(&mut self) {
        self.0 += T::one();
    }

    #[inline]
    pub fn get(&self) -> T {
        self.0
    }
}
