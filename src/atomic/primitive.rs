//! Mapping from primitive values to the machine word that stores them.

use super::sync::{
    AtomicBool, AtomicI32, AtomicI64, AtomicIsize, AtomicU8, AtomicU32, AtomicU64, AtomicUsize,
    Ordering,
};

/// A primitive that can live in a single atomic machine word.
///
/// Implemented for the fixed-width integers, `bool`, `f32` and `f64`.
/// Floating-point values are stored as their IEEE-754 bit pattern, so every
/// comparison made by [`AtomicValue`](super::AtomicValue) is a bitwise one.
pub trait AtomicPrimitive: Copy + Send + Sync + 'static {
    /// The atomic word backing this primitive.
    type Atom: Send + Sync;

    /// Creates a backing word holding `value`.
    fn new_atom(value: Self) -> Self::Atom;

    /// Atomically loads the current value.
    fn load(atom: &Self::Atom, order: Ordering) -> Self;

    /// Atomically stores `value`.
    fn store(atom: &Self::Atom, value: Self, order: Ordering);

    /// Atomically replaces the value, returning the previous one.
    fn swap(atom: &Self::Atom, value: Self, order: Ordering) -> Self;

    /// Weak compare-and-swap; may fail spuriously.
    ///
    /// # Errors
    ///
    /// Returns the value actually observed when the exchange did not happen.
    fn compare_exchange_weak(
        atom: &Self::Atom,
        current: Self,
        new: Self,
        success: Ordering,
        failure: Ordering,
    ) -> Result<Self, Self>;

    /// Strong compare-and-swap; fails only if the value differs.
    ///
    /// # Errors
    ///
    /// Returns the value actually observed when the exchange did not happen.
    fn compare_exchange(
        atom: &Self::Atom,
        current: Self,
        new: Self,
        success: Ordering,
        failure: Ordering,
    ) -> Result<Self, Self>;
}

/// A primitive that supports arithmetic through [`AtomicValue`](super::AtomicValue).
///
/// Integer arithmetic wraps on overflow.
pub trait AtomicNumeric: AtomicPrimitive {
    /// The value added by `increment` and subtracted by `decrement`.
    const ONE: Self;

    /// `self + rhs`, wrapping for integers.
    #[must_use]
    fn add_wrapping(self, rhs: Self) -> Self;

    /// `self - rhs`, wrapping for integers.
    #[must_use]
    fn sub_wrapping(self, rhs: Self) -> Self;
}

macro_rules! impl_direct {
    ($($value:ty => $atom:ty),* $(,)?) => {
        $(
            impl AtomicPrimitive for $value {
                type Atom = $atom;

                #[inline]
                fn new_atom(value: Self) -> Self::Atom {
                    <$atom>::new(value)
                }

                #[inline]
                fn load(atom: &Self::Atom, order: Ordering) -> Self {
                    atom.load(order)
                }

                #[inline]
                fn store(atom: &Self::Atom, value: Self, order: Ordering) {
                    atom.store(value, order);
                }

                #[inline]
                fn swap(atom: &Self::Atom, value: Self, order: Ordering) -> Self {
                    atom.swap(value, order)
                }

                #[inline]
                fn compare_exchange_weak(
                    atom: &Self::Atom,
                    current: Self,
                    new: Self,
                    success: Ordering,
                    failure: Ordering,
                ) -> Result<Self, Self> {
                    atom.compare_exchange_weak(current, new, success, failure)
                }

                #[inline]
                fn compare_exchange(
                    atom: &Self::Atom,
                    current: Self,
                    new: Self,
                    success: Ordering,
                    failure: Ordering,
                ) -> Result<Self, Self> {
                    atom.compare_exchange(current, new, success, failure)
                }
            }
        )*
    };
}

macro_rules! impl_integer {
    ($($value:ty),* $(,)?) => {
        $(
            impl AtomicNumeric for $value {
                const ONE: Self = 1;

                #[inline]
                fn add_wrapping(self, rhs: Self) -> Self {
                    self.wrapping_add(rhs)
                }

                #[inline]
                fn sub_wrapping(self, rhs: Self) -> Self {
                    self.wrapping_sub(rhs)
                }
            }
        )*
    };
}

macro_rules! impl_float {
    ($($value:ty => $atom:ty),* $(,)?) => {
        $(
            impl AtomicPrimitive for $value {
                type Atom = $atom;

                #[inline]
                fn new_atom(value: Self) -> Self::Atom {
                    <$atom>::new(value.to_bits())
                }

                #[inline]
                fn load(atom: &Self::Atom, order: Ordering) -> Self {
                    <$value>::from_bits(atom.load(order))
                }

                #[inline]
                fn store(atom: &Self::Atom, value: Self, order: Ordering) {
                    atom.store(value.to_bits(), order);
                }

                #[inline]
                fn swap(atom: &Self::Atom, value: Self, order: Ordering) -> Self {
                    <$value>::from_bits(atom.swap(value.to_bits(), order))
                }

                #[inline]
                fn compare_exchange_weak(
                    atom: &Self::Atom,
                    current: Self,
                    new: Self,
                    success: Ordering,
                    failure: Ordering,
                ) -> Result<Self, Self> {
                    atom.compare_exchange_weak(current.to_bits(), new.to_bits(), success, failure)
                        .map(<$value>::from_bits)
                        .map_err(<$value>::from_bits)
                }

                #[inline]
                fn compare_exchange(
                    atom: &Self::Atom,
                    current: Self,
                    new: Self,
                    success: Ordering,
                    failure: Ordering,
                ) -> Result<Self, Self> {
                    atom.compare_exchange(current.to_bits(), new.to_bits(), success, failure)
                        .map(<$value>::from_bits)
                        .map_err(<$value>::from_bits)
                }
            }

            impl AtomicNumeric for $value {
                const ONE: Self = 1.0;

                #[inline]
                fn add_wrapping(self, rhs: Self) -> Self {
                    self + rhs
                }

                #[inline]
                fn sub_wrapping(self, rhs: Self) -> Self {
                    self - rhs
                }
            }
        )*
    };
}

impl_direct!(
    bool => AtomicBool,
    i32 => AtomicI32,
    i64 => AtomicI64,
    isize => AtomicIsize,
    u8 => AtomicU8,
    u32 => AtomicU32,
    u64 => AtomicU64,
    usize => AtomicUsize,
);

impl_integer!(i32, i64, isize, u8, u32, u64, usize);

impl_float!(f32 => AtomicU32, f64 => AtomicU64);
