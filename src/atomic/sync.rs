//! Backing atomics for [`AtomicValue`](super::AtomicValue).
//!
//! With the `loom` feature the model-checked atomics from `loom` are used so
//! the CAS loops can be explored exhaustively under `loom::model`.

#[cfg(feature = "loom")]
pub use loom::sync::atomic::{
    AtomicBool, AtomicI32, AtomicI64, AtomicIsize, AtomicU8, AtomicU32, AtomicU64, AtomicUsize,
    Ordering,
};

#[cfg(not(feature = "loom"))]
pub use std::sync::atomic::{
    AtomicBool, AtomicI32, AtomicI64, AtomicIsize, AtomicU8, AtomicU32, AtomicU64, AtomicUsize,
    Ordering,
};
