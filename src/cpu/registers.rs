//! Live pipeline state: general-purpose registers, HI/LO, the PC/branch-delay slot
//! bookkeeping, the pending (delayed) load, and the read-absorb stall pool.

use bincode::{Decode, Encode};

/// Sentinel stored in `ld_which` meaning "no load is currently in flight".
pub const NO_PENDING_LOAD: u32 = 32;

pub const RESET_VECTOR: u32 = 0xBFC0_0000;

#[derive(Debug, Clone, Encode, Decode)]
pub struct Pipeline {
    pub gpr: [u32; 32],
    pub hi: u32,
    pub lo: u32,

    pub pc: u32,
    pub new_pc: u32,
    pub new_pc_mask: u32,

    /// Destination register of the in-flight delayed load, or [`NO_PENDING_LOAD`].
    pub ld_which: u32,
    pub ld_value: u32,
    /// Latency cycles of the in-flight load that the following instruction's own
    /// decode/read-absorb step can hide.
    pub ld_absorb: u8,

    pub read_absorb: [u8; 32],
    /// Extra slot that absorbs `DO_LDS`'s bookkeeping writes when no load is pending
    /// (`ld_which == NO_PENDING_LOAD`), so the real 0..=31 pool is never touched.
    pub read_absorb_dummy: u8,
    pub read_absorb_which: u32,
    /// Register number most recently committed by a delayed load (or 32 if none);
    /// feeds the `(read_fudge >> 4) & 2` timing kludge applied to ordinary bus reads.
    pub read_fudge: u32,

    pub halted: bool,

    /// Absolute timestamps (relative to the owning slice's origin once rebased on
    /// yield, see [`crate::cpu::R3000::run`]) at which the multiplier/divider and the
    /// GTE next become ready.
    pub gte_ts_done: i32,
    pub muldiv_ts_done: i32,
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            gpr: [0; 32],
            hi: 0,
            lo: 0,
            pc: RESET_VECTOR,
            new_pc: 4,
            new_pc_mask: !0,
            ld_which: NO_PENDING_LOAD,
            ld_value: 0,
            ld_absorb: 0,
            read_absorb: [0; 32],
            read_absorb_dummy: 0,
            read_absorb_which: 0,
            read_fudge: 0,
            halted: false,
            gte_ts_done: 0,
            muldiv_ts_done: 0,
        }
    }

    pub fn power(&mut self) {
        *self = Self::new();
    }

    /// LWL/LWR read in-flight load results directly; they are not subject to the
    /// ordinary load delay slot.
    pub fn read_gpr_lwl_lwr(&self, register: u32) -> u32 {
        if self.ld_which == register {
            self.ld_value
        } else {
            self.gpr[register as usize]
        }
    }

    pub fn write_gpr(&mut self, register: u32, value: u32) {
        if register != 0 {
            self.gpr[register as usize] = value;
        }
    }

    /// Queues a load result to be committed at the start of the next instruction
    /// (`commit_pending_load`), rather than writing through immediately.
    pub fn write_gpr_delayed(&mut self, register: u32, value: u32) {
        self.ld_which = register;
        self.ld_value = value;
    }

    /// `DO_LDS`: commits the in-flight delayed load (if any) to the register file and
    /// seeds that register's read-absorb pool from the load's latency. Called as the
    /// first action of every instruction, before it reads its own operands.
    pub fn commit_pending_load(&mut self) {
        let which = self.ld_which;
        let value = self.ld_value;
        let absorb = self.ld_absorb;

        if which < 32 {
            self.write_gpr(which, value);
            self.read_absorb[which as usize] = absorb;
        } else {
            self.read_absorb_dummy = absorb;
        }

        self.read_fudge = which;
        self.read_absorb_which |= which & 0x1F;
        self.ld_which = NO_PENDING_LOAD;
    }

    /// True while the instruction about to execute occupies a branch's delay slot.
    /// `new_pc_mask` is zeroed by [`Pipeline::take_branch`] and
    /// [`Pipeline::redirect_to_exception`] and restored to all-ones by
    /// [`Pipeline::advance_pc`], so a mask with its low bits clear means the previous
    /// instruction queued a redirect that hasn't landed yet.
    pub fn in_branch_delay_slot(&self) -> bool {
        self.new_pc_mask & 0x3 == 0
    }

    /// Commits the normal sequential PC transition and queues `target` to land once
    /// the delay slot instruction finishes. Call instead of [`Pipeline::advance_pc`]
    /// for taken branches and jumps.
    pub fn take_branch(&mut self, target: u32) {
        self.pc = (self.pc & self.new_pc_mask).wrapping_add(self.new_pc);
        self.new_pc = target;
        self.new_pc_mask = 0;
    }

    /// Queues `handler` to land immediately (no delay slot) via the next
    /// [`Pipeline::advance_pc`] call, which every instruction -- including one that
    /// raised an exception -- still performs.
    pub fn redirect_to_exception(&mut self, handler: u32) {
        self.new_pc = handler;
        self.new_pc_mask = 0;
    }

    /// `OpDone`: the default end-of-instruction PC transition. Resolves whatever the
    /// instruction queued (a plain +4, a taken branch's target, or an exception
    /// handler) and resets the queue to the ordinary sequential default.
    pub fn advance_pc(&mut self) {
        self.pc = (self.pc & self.new_pc_mask).wrapping_add(self.new_pc);
        self.new_pc_mask = !0;
        self.new_pc = 4;
    }

    /// The per-instruction read-absorb step: consumes one stall cycle from the pool
    /// left over from a recent load in lieu of advancing the timestamp. Returns
    /// `true` if a cycle was absorbed (timestamp should not be incremented).
    pub fn absorb_or_tick(&mut self) -> bool {
        let which = self.read_absorb_which as usize;
        if which < 32 {
            crate::num::absorb_decrement(&mut self.read_absorb[which])
        } else {
            crate::num::absorb_decrement(&mut self.read_absorb_dummy)
        }
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpr_zero_write_is_discarded() {
        let mut p = Pipeline::new();
        p.write_gpr(0, 0xDEAD_BEEF);
        assert_eq!(p.gpr[0], 0);
    }

    #[test]
    fn delayed_load_not_visible_until_commit() {
        let mut p = Pipeline::new();
        p.write_gpr_delayed(1, 0xDEAD_BEEF);
        assert_eq!(p.gpr[1], 0);
        p.commit_pending_load();
        assert_eq!(p.gpr[1], 0xDEAD_BEEF);
        assert_eq!(p.ld_which, NO_PENDING_LOAD);
    }

    #[test]
    fn taken_branch_lands_one_instruction_later() {
        let mut p = Pipeline::new();
        p.pc = 0x8000_1000;
        p.take_branch(0x8000_2000);
        assert!(p.in_branch_delay_slot());
        // The delay slot instruction executes at the sequential successor address...
        assert_eq!(p.pc, 0x8000_1004);
        // ...and only lands on the branch target once it finishes.
        p.advance_pc();
        assert_eq!(p.pc, 0x8000_2000);
        assert!(!p.in_branch_delay_slot());
    }

    #[test]
    fn exception_redirect_lands_immediately() {
        let mut p = Pipeline::new();
        p.pc = 0x8000_1000;
        p.redirect_to_exception(0x8000_0080);
        p.advance_pc();
        assert_eq!(p.pc, 0x8000_0080);
        assert!(!p.in_branch_delay_slot());
    }

    #[test]
    fn lwl_lwr_sees_in_flight_value() {
        let mut p = Pipeline::new();
        p.write_gpr_delayed(4, 0x1122_3344);
        assert_eq!(p.read_gpr_lwl_lwr(4), 0x1122_3344);
        assert_eq!(p.read_gpr_lwl_lwr(5), 0);
    }
}
