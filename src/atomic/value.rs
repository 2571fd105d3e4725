use std::fmt;

use super::primitive::{AtomicNumeric, AtomicPrimitive};
use super::sync::Ordering;

/// A lock-free slot holding one primitive value.
///
/// Every read-modify-write operation is a compare-and-swap retry loop on a
/// single machine word, so concurrent mutators never lose updates and readers
/// never observe a torn value. No operation can fail.
///
/// # Examples
///
/// ```rust
/// use cadence::atomic::AtomicValue;
/// use std::sync::Arc;
/// use std::thread;
///
/// let counter = Arc::new(AtomicValue::new(0_u64));
///
/// let handles: Vec<_> = (0..4)
///     .map(|_| {
///         let counter = Arc::clone(&counter);
///         thread::spawn(move || {
///             for _ in 0..1_000 {
///                 counter.increment();
///             }
///         })
///     })
///     .collect();
///
/// for handle in handles {
///     handle.join().unwrap();
/// }
/// assert_eq!(counter.get(), 4_000);
/// ```
pub struct AtomicValue<T: AtomicPrimitive> {
    atom: T::Atom,
}

impl<T: AtomicPrimitive> AtomicValue<T> {
    /// Creates a slot holding `value`.
    #[inline]
    pub fn new(value: T) -> Self {
        Self {
            atom: T::new_atom(value),
        }
    }

    /// Returns the current value.
    #[inline]
    pub fn get(&self) -> T {
        T::load(&self.atom, Ordering::Acquire)
    }

    /// Replaces the current value.
    #[inline]
    pub fn set(&self, value: T) {
        T::store(&self.atom, value, Ordering::Release);
    }

    /// Replaces the current value, returning the previous one.
    #[inline]
    pub fn swap(&self, value: T) -> T {
        T::swap(&self.atom, value, Ordering::AcqRel)
    }

    /// Installs `updated` if the current value equals `expected`.
    ///
    /// Returns `true` when the exchange happened. On `false` the value is
    /// left untouched. Floating-point values are compared bitwise.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cadence::atomic::AtomicValue;
    ///
    /// let flag = AtomicValue::new(false);
    /// assert!(flag.compare_exchange(false, true));
    /// assert!(!flag.compare_exchange(false, true));
    /// assert!(flag.get());
    /// ```
    #[inline]
    pub fn compare_exchange(&self, expected: T, updated: T) -> bool {
        T::compare_exchange(&self.atom, expected, updated, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Applies `function` to the current value until the result is installed
    /// without interference, then returns the installed value.
    ///
    /// `function` may run more than once under contention and must not have
    /// side effects.
    pub fn update<F>(&self, mut function: F) -> T
    where
        F: FnMut(T) -> T,
    {
        let mut current = self.get();
        loop {
            let next = function(current);
            match T::compare_exchange_weak(
                &self.atom,
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return next,
                Err(actual) => current = actual,
            }
        }
    }

    /// Consumes the slot and returns its value.
    #[inline]
    pub fn into_inner(self) -> T {
        self.get()
    }
}

impl<T: AtomicNumeric> AtomicValue<T> {
    /// Adds one and returns the new value.
    #[inline]
    pub fn increment(&self) -> T {
        self.add(T::ONE)
    }

    /// Subtracts one and returns the new value.
    #[inline]
    pub fn decrement(&self) -> T {
        self.update(|current| current.sub_wrapping(T::ONE))
    }

    /// Adds `delta` and returns the new value.
    #[inline]
    pub fn add(&self, delta: T) -> T {
        self.update(|current| current.add_wrapping(delta))
    }
}

impl<T: AtomicPrimitive + Default> Default for AtomicValue<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: AtomicPrimitive> From<T> for AtomicValue<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: AtomicPrimitive + fmt::Debug> fmt::Debug for AtomicValue<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_tuple("AtomicValue")
            .field(&self.get())
            .finish()
    }
}
