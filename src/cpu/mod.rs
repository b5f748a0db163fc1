//! The R3000A interpreter core: CP0, the instruction cache, the GTE dispatch seam,
//! and the cycle-accounted fetch/execute loop that ties them together.

pub mod cp0;
pub mod debug;
mod disassemble;
pub mod exception;
pub mod icache;
mod instructions;
mod memory;
pub mod registers;
pub mod savestate;

use bincode::{Decode, Encode};

use crate::bus::{BusInterface, FastMap, Scratchpad};
use crate::gte::GteInterface;
use crate::irq::IrqSource;
use cp0::Cp0;
use exception::ExceptionCode;
use icache::ICache;
use registers::Pipeline;

/// BIU bit 11: I-cache enable.
const BIU_ICACHE_ENABLE: u32 = 0x800;

/// The CPU revision PRId reports out of reset. `0x2` is the value real PS1 hardware
/// reports; left configurable so a host can model other R3000A revisions.
const DEFAULT_PRID: u32 = 0x0000_0002;

/// BIOS `putc` trap address/function number: software calls into the KSEG0 B0 table
/// with function 0x3D to print a character in `$a0` to the TTY.
const BIOS_TTY_TRAP_PC: u32 = 0xB0;
const BIOS_TTY_PUTC_FUNCTION: u32 = 0x3D;

/// Host-tunable knobs that do not belong to architectural state.
#[derive(Debug, Clone, Copy, Encode, Decode)]
pub struct CpuConfig {
    pub debug_enabled: bool,
    pub prid: u32,
    pub tty_trap_enabled: bool,
}

impl CpuConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_debug_enabled(mut self, enabled: bool) -> Self {
        self.debug_enabled = enabled;
        self
    }

    pub fn with_prid(mut self, prid: u32) -> Self {
        self.prid = prid;
        self
    }

    pub fn with_tty_trap_enabled(mut self, enabled: bool) -> Self {
        self.tty_trap_enabled = enabled;
        self
    }
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self { debug_enabled: false, prid: DEFAULT_PRID, tty_trap_enabled: false }
    }
}

/// The R3000A core. Generic over the GTE implementation so a host can plug in the
/// real geometry engine, [`crate::gte::NullGte`], or a test double without the core
/// depending on a concrete type.
#[derive(Debug, Clone, Encode, Decode)]
pub struct R3000<G> {
    pipeline: Pipeline,
    cp0: Cp0,
    icache: ICache,
    scratchpad: Scratchpad,
    gte: G,
    biu: u32,
    config: CpuConfig,
}

impl<G: GteInterface + Default> R3000<G> {
    pub fn new() -> Self {
        let mut cpu = Self {
            pipeline: Pipeline::new(),
            cp0: Cp0::new(),
            icache: ICache::new(),
            scratchpad: Scratchpad::new(),
            gte: G::default(),
            biu: 0,
            config: CpuConfig::new(),
        };
        cpu.power();
        cpu
    }
}

impl<G: GteInterface> R3000<G> {
    pub fn power(&mut self) {
        self.pipeline.power();
        self.cp0.power(self.config.prid);
        self.biu = 0;
        self.icache.power(self.biu & BIU_ICACHE_ENABLE != 0);
        self.scratchpad.power();
        self.gte.power();
    }

    /// Applies a new [`CpuConfig`]. `prid` only takes effect on the next [`R3000::power`]
    /// call, since PRId is architectural state snapshotted at reset, not read live.
    pub fn configure(&mut self, config: CpuConfig) {
        self.config = config;
    }

    pub fn pc(&self) -> u32 {
        self.pipeline.pc
    }

    pub fn gpr(&self, register: u32) -> u32 {
        self.pipeline.gpr[(register & 0x1F) as usize]
    }

    pub fn cp0(&self) -> &Cp0 {
        &self.cp0
    }

    pub fn is_halted(&self) -> bool {
        self.pipeline.halted
    }

    pub fn set_halt(&mut self, halted: bool) {
        self.pipeline.halted = halted;
    }

    pub fn biu(&self) -> u32 {
        self.biu
    }

    /// Debug-only register poke: writes `value` into `register` directly, subject to
    /// the same r0-is-hardwired-zero rule as an ordinary instruction write.
    pub fn poke_gpr(&mut self, register: u32, value: u32) {
        self.pipeline.write_gpr(register, value);
    }

    /// `PeekCheckICache`: the cached word for `pc`, without disturbing cache state.
    pub fn peek_check_icache(&self, pc: u32) -> Option<u32> {
        debug::peek_check_icache(&self.icache, pc)
    }

    pub fn set_biu(&mut self, value: u32) {
        let old = self.biu;
        // Bits 6 and 10 are not writable on real hardware.
        self.biu = value & !0x440;
        if (self.biu ^ old) & BIU_ICACHE_ENABLE != 0 {
            self.icache.power(self.biu & BIU_ICACHE_ENABLE != 0);
        }
    }

    /// Runs instructions until `timestamp` reaches `timestamp_end`, reading from and
    /// writing to `bus`/`fast_map` and folding `irq`'s asserted lines into CP0.CAUSE
    /// once per slice, since line state cannot change mid-slice without the host
    /// re-entering this call. Returns the timestamp actually reached, which can land
    /// past `timestamp_end` since an in-flight instruction always runs to completion
    /// before yielding (or an idle-spin hint jumps straight to it, see `idle_hint`
    /// below).
    ///
    /// A halted core still wakes here: if a pending, enabled interrupt is already
    /// latched, `halted` is cleared before the slice runs so the core can take it
    /// immediately, instead of sleeping through it forever.
    ///
    /// `idle_hint` enables the idle-loop-spin optimization: when a taken branch
    /// targets its own address and that address holds a NOP, the core assumes the
    /// program is spinning until the next event and jumps `timestamp` straight to
    /// `timestamp_end` rather than re-simulating the spin one cycle at a time. Hosts
    /// that need cycle-exact behavior even through idle spins (e.g. a debugger single
    /// stepping) should pass `false`.
    pub fn run<B: BusInterface>(
        &mut self,
        bus: &mut B,
        fast_map: &FastMap<'_>,
        irq: &impl IrqSource,
        timestamp_in: i32,
        timestamp_end: i32,
        idle_hint: bool,
    ) -> i32 {
        self.cp0.set_irq_lines(irq.asserted_lines());

        if self.pipeline.halted {
            if self.cp0.interrupt_pending(false) {
                self.pipeline.halted = false;
            } else {
                return timestamp_end;
            }
        }

        let mut timestamp = timestamp_in;
        while timestamp < timestamp_end {
            self.step(bus, fast_map, &mut timestamp, timestamp_end, idle_hint);
            if self.pipeline.halted {
                return timestamp_end;
            }
        }
        timestamp
    }

    fn step<B: BusInterface>(
        &mut self,
        bus: &mut B,
        fast_map: &FastMap<'_>,
        timestamp: &mut i32,
        timestamp_end: i32,
        idle_hint: bool,
    ) {
        let pc = self.pipeline.pc;
        let in_branch_delay_slot = self.pipeline.in_branch_delay_slot();

        if self.config.debug_enabled {
            debug::on_instruction(timestamp, pc);
        }

        if self.config.tty_trap_enabled {
            self.check_tty_trap(pc);
        }

        let opcode = self.fetch(pc, fast_map, timestamp);

        if !self.pipeline.absorb_or_tick() {
            *timestamp += 1;
        }

        // The entire COP2 opcode space and plain SLL (which also covers NOP) are
        // exempt from interrupt preemption: a GTE instruction about to retire, or a
        // NOP, must be allowed to finish rather than be replaced by the interrupt.
        if self.cp0.interrupt_pending(self.pipeline.halted)
            && !is_cop2_opcode(opcode)
            && !is_special_sll(opcode)
        {
            self.pipeline.commit_pending_load();
            let handler = exception::raise(
                &mut self.cp0,
                ExceptionCode::Interrupt,
                pc,
                in_branch_delay_slot,
            );
            self.pipeline.redirect_to_exception(handler);
            self.pipeline.advance_pc();
            return;
        }

        self.pipeline.commit_pending_load();

        match self.execute_opcode(opcode, pc, bus, timestamp) {
            Ok(took_branch) => {
                if took_branch {
                    if self.config.debug_enabled {
                        debug::on_branch_taken(pc, self.pipeline.new_pc);
                    }
                    if idle_hint
                        && self.pipeline.new_pc == pc
                        && fast_map.fetch_word(self.pipeline.new_pc) == 0
                        && *timestamp < timestamp_end
                    {
                        *timestamp = timestamp_end;
                    }
                } else {
                    self.pipeline.advance_pc();
                }
            }
            Err(code) => {
                let handler = exception::raise(&mut self.cp0, code, pc, in_branch_delay_slot);
                self.pipeline.redirect_to_exception(handler);
                self.pipeline.advance_pc();
            }
        }
    }

    /// BIOS debug hook: when control reaches the B0 function table with `$t1` (r9)
    /// set to the `putc` function number, log the character in `$a0` (r4) at debug
    /// level rather than requiring a host to intercept the real I/O port.
    fn check_tty_trap(&self, pc: u32) {
        if pc == BIOS_TTY_TRAP_PC && self.pipeline.gpr[9] == BIOS_TTY_PUTC_FUNCTION {
            let ch = self.pipeline.gpr[4] as u8 as char;
            log::debug!(target: "r3000_core::cpu::tty", "{ch}");
        }
    }

    fn fetch(&mut self, pc: u32, fast_map: &FastMap<'_>, timestamp: &mut i32) -> u32 {
        if self.icache.hit(pc) {
            return self.icache.fetched_word(pc);
        }
        let which = self.pipeline.read_absorb_which as usize & 0x1F;
        self.pipeline.read_absorb[which] = 0;
        self.pipeline.read_absorb_which = 0;
        let icache_enabled = self.biu & BIU_ICACHE_ENABLE != 0;
        let (word, cycles) = self.icache.refill_or_bypass(pc, fast_map, icache_enabled);
        *timestamp += cycles;
        word
    }
}

/// True for the entire COP2 opcode space (MFC2/CFC2/MTC2/CTC2 and every GTE-execute
/// sub-op alike): all of it is exempt from interrupt preemption.
fn is_cop2_opcode(opcode: u32) -> bool {
    opcode >> 26 == 0x12
}

/// True for SLL-funct SPECIAL instructions (funct 0), which includes the literal
/// all-zero NOP encoding: also exempt from interrupt preemption.
fn is_special_sll(opcode: u32) -> bool {
    opcode >> 26 == 0 && opcode & 0x3F == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gte::NullGte;

    #[test]
    fn default_prid_matches_real_hardware() {
        let cpu: R3000<NullGte> = R3000::new();
        assert_eq!(cpu.cp0().read(cp0::REG_PRID), 0x0000_0002);
    }

    #[test]
    fn configured_prid_takes_effect_on_next_power_cycle() {
        let mut cpu: R3000<NullGte> = R3000::new();
        cpu.configure(CpuConfig::new().with_prid(0x1234));
        assert_eq!(cpu.cp0().read(cp0::REG_PRID), 0x0000_0002, "old PRId until repowered");
        cpu.power();
        assert_eq!(cpu.cp0().read(cp0::REG_PRID), 0x1234);
    }
}
