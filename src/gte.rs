//! Geometry Transformation Engine contract.
//!
//! The GTE's fixed-point vector math is entirely out of scope for this crate (see the
//! module-level Non-goals); the CPU core only needs to dispatch COP2 instructions to it
//! and stall on the cycle count it reports back.

use bincode::{Decode, Encode};

pub trait GteInterface {
    /// Executes the COP2 instruction and returns the number of cycles it takes,
    /// stalling the dispatcher until the result is ready.
    fn execute(&mut self, instr: u32) -> u32;

    fn read_data(&self, register: u32) -> u32;
    fn write_data(&mut self, register: u32, value: u32);

    fn read_control(&self, register: u32) -> u32;
    fn write_control(&mut self, register: u32, value: u32);

    fn power(&mut self);
}

/// A GTE stand-in with no real geometry math, useful for exercising the CPU core in
/// isolation. Every data/control register behaves as a plain 32-bit latch and every
/// instruction reports a fixed cost.
#[derive(Debug, Clone, Default, Encode, Decode)]
pub struct NullGte {
    data: [u32; 32],
    control: [u32; 32],
}

impl NullGte {
    pub fn new() -> Self {
        Self { data: [0; 32], control: [0; 32] }
    }
}

impl GteInterface for NullGte {
    fn execute(&mut self, _instr: u32) -> u32 {
        // Arbitrary but nonzero so muldiv/GTE interlock tests have something to stall on.
        8
    }

    fn read_data(&self, register: u32) -> u32 {
        self.data[(register & 0x1F) as usize]
    }

    fn write_data(&mut self, register: u32, value: u32) {
        self.data[(register & 0x1F) as usize] = value;
    }

    fn read_control(&self, register: u32) -> u32 {
        self.control[(register & 0x1F) as usize]
    }

    fn write_control(&mut self, register: u32, value: u32) {
        self.control[(register & 0x1F) as usize] = value;
    }

    fn power(&mut self) {
        self.data.fill(0);
        self.control.fill(0);
    }
}
