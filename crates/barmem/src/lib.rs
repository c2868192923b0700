//! Deterministic user-space access to memory-mapped device registers.
//!
//! Driver bring-up and FPGA test benches need to peek and poke a BAR window with
//! predictable access patterns: exactly one 4-byte access per register touch, exact
//! ordering where the hardware cares about it, and bulk copies where it does not.
//! This crate provides:
//!
//! - [`BarHandle`]: open/close lifecycle plus every access operation
//! - [`BarRegion`]: the backend trait a register window implements
//! - [`MmapRegion`]: a real window mapped from a device resource file
//! - [`MockRegion`]: an in-process window for testing without hardware
//!
//! Three access shapes are exposed: single 32-bit words, address ranges (per-word
//! iterative or single block copy), and FIFO streams gated by a hardware fill-level
//! register (checked) or by caller knowledge (`_unchecked`).
//!
//! Everything is synchronous: each operation blocks its caller until the transfer
//! completes or fails. The engine takes no locks; serializing concurrent use of one
//! handle is the caller's job, and the `&mut self` receivers make that structural in
//! safe code.

mod error;
mod fifo;
mod handle;
#[cfg(unix)]
mod mmap;
mod region;

#[cfg(test)]
mod proptests;

pub use error::{BarError, Result};
pub use handle::{BarHandle, MapMode};
#[cfg(unix)]
pub use mmap::MmapRegion;
pub use region::{BarRegion, MockRegion};
