//! Lock-free atomic values.
//!
//! [`AtomicValue<T>`] wraps one primitive (integer, `bool` or float) in a
//! single atomic machine word and exposes read, write, increment and
//! compare-and-exchange without any lock. Other components build their flags
//! and counters on it.
//!
//! ```rust
//! use cadence::atomic::AtomicValue;
//!
//! let cycles = AtomicValue::new(0_u64);
//! assert_eq!(cycles.increment(), 1);
//! assert!(cycles.compare_exchange(1, 10));
//! assert_eq!(cycles.get(), 10);
//! ```

mod primitive;
mod sync;
mod value;

pub use primitive::{AtomicNumeric, AtomicPrimitive};
pub use sync::Ordering;
pub use value::AtomicValue;
