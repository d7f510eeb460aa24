//! Backend implementations.

#[cfg(feature = "memory")]
pub mod memory;
