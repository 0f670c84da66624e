//! Small shared building blocks

mod atomic;

pub use atomic::AtomicF64;
