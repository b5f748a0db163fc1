//! A cycle-accounted interpreter core for the PlayStation 1's R3000A (MIPS-I) CPU.
//!
//! This crate owns everything architecturally local to the CPU: the general-purpose
//! and CP0 register files, the load-delay/branch-delay pipeline bookkeeping, the
//! instruction cache, the on-chip scratchpad, and the fetch/execute dispatch loop.
//! Everything else a full PlayStation emulator needs -- the rest of the memory map,
//! DMA, the GPU/SPU, the real GTE math -- is reached through the [`bus::BusInterface`],
//! [`irq::IrqSource`], and [`gte::GteInterface`] trait seams, so a host can wire this
//! core into a larger system without this crate depending on any of it.

pub mod bus;
pub mod cpu;
pub mod error;
pub mod gte;
pub mod irq;
mod num;

pub use cpu::{CpuConfig, R3000};
pub use error::{CoreError, CoreResult};
