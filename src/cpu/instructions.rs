//! MIPS-I opcode semantics. Each handler reads its operands out of the pipeline,
//! performs the operation, and writes results back through [`Pipeline::write_gpr`]
//! or [`Pipeline::write_gpr_delayed`] as appropriate -- immediate writes for
//! arithmetic/logic, delayed writes for loads.

use crate::bus::{self, BusInterface};
use crate::cpu::cp0;
use crate::cpu::exception::ExceptionCode;
use crate::gte::GteInterface;
use crate::num::U32Ext;

use super::R3000;

fn rs(opcode: u32) -> u32 {
    (opcode >> 21) & 0x1F
}
fn rt(opcode: u32) -> u32 {
    (opcode >> 16) & 0x1F
}
fn rd(opcode: u32) -> u32 {
    (opcode >> 11) & 0x1F
}
fn shamt(opcode: u32) -> u32 {
    (opcode >> 6) & 0x1F
}
fn immediate(opcode: u32) -> i32 {
    (opcode as i16) as i32
}
fn immediate_ze(opcode: u32) -> u32 {
    opcode & 0xFFFF
}
fn target(opcode: u32) -> u32 {
    opcode & 0x03FF_FFFF
}

/// `true` if `Result::Ok` carries a taken branch/jump (the dispatcher must not run
/// its own default end-of-instruction PC advance in that case).
type OpResult = Result<bool, ExceptionCode>;

const NO_BRANCH: OpResult = Ok(false);

impl<G: GteInterface> R3000<G> {
    pub(super) fn execute_opcode<B: BusInterface>(
        &mut self,
        opcode: u32,
        pc: u32,
        bus: &mut B,
        timestamp: &mut i32,
    ) -> OpResult {
        if log::log_enabled!(log::Level::Trace) {
            log::trace!(
                "pc={pc:08X} opcode={opcode:08X}: {}",
                super::disassemble::instruction_str(opcode)
            );
        }

        match opcode >> 26 {
            0x00 => match opcode & 0x3F {
                0x00 => self.op_sll(opcode),
                0x02 => self.op_srl(opcode),
                0x03 => self.op_sra(opcode),
                0x04 => self.op_sllv(opcode),
                0x06 => self.op_srlv(opcode),
                0x07 => self.op_srav(opcode),
                0x08 => self.op_jr(opcode),
                0x09 => self.op_jalr(opcode),
                0x0C => Err(ExceptionCode::Syscall),
                0x0D => Err(ExceptionCode::Breakpoint),
                0x10 => self.op_mfhi(opcode, timestamp),
                0x11 => self.op_mthi(opcode),
                0x12 => self.op_mflo(opcode, timestamp),
                0x13 => self.op_mtlo(opcode),
                0x18 => self.op_mult(opcode, timestamp),
                0x19 => self.op_multu(opcode, timestamp),
                0x1A => self.op_div(opcode, timestamp),
                0x1B => self.op_divu(opcode, timestamp),
                0x20 => self.op_add(opcode),
                0x21 => self.op_addu(opcode),
                0x22 => self.op_sub(opcode),
                0x23 => self.op_subu(opcode),
                0x24 => self.op_and(opcode),
                0x25 => self.op_or(opcode),
                0x26 => self.op_xor(opcode),
                0x27 => self.op_nor(opcode),
                0x2A => self.op_slt(opcode),
                0x2B => self.op_sltu(opcode),
                _ => Err(ExceptionCode::ReservedInstruction),
            },
            0x01 => match rt(opcode) {
                0x10 => self.op_bltzal(opcode),
                0x11 => self.op_bgezal(opcode),
                n if n & 1 == 0 => self.op_bltz(opcode),
                _ => self.op_bgez(opcode),
            },
            0x02 => self.op_j(opcode),
            0x03 => self.op_jal(opcode),
            0x04 => self.op_beq(opcode),
            0x05 => self.op_bne(opcode),
            0x06 => self.op_blez(opcode),
            0x07 => self.op_bgtz(opcode),
            0x08 => self.op_addi(opcode),
            0x09 => self.op_addiu(opcode),
            0x0A => self.op_slti(opcode),
            0x0B => self.op_sltiu(opcode),
            0x0C => self.op_andi(opcode),
            0x0D => self.op_ori(opcode),
            0x0E => self.op_xori(opcode),
            0x0F => self.op_lui(opcode),
            0x10 => self.op_cop0(opcode),
            0x11 | 0x13 => Err(ExceptionCode::CoprocessorUnusable),
            0x12 => self.op_cop2(opcode, timestamp),
            0x20 => self.op_lb(opcode, bus, timestamp),
            0x21 => self.op_lh(opcode, bus, timestamp),
            0x22 => self.op_lwl(opcode, bus, timestamp),
            0x23 => self.op_lw(opcode, bus, timestamp),
            0x24 => self.op_lbu(opcode, bus, timestamp),
            0x25 => self.op_lhu(opcode, bus, timestamp),
            0x26 => self.op_lwr(opcode, bus, timestamp),
            0x28 => self.op_sb(opcode, bus, timestamp),
            0x29 => self.op_sh(opcode, bus, timestamp),
            0x2A => self.op_swl(opcode, bus, timestamp),
            0x2B => self.op_sw(opcode, bus, timestamp),
            0x2E => self.op_swr(opcode, bus, timestamp),
            0x32 => self.op_lwc2(opcode, bus, timestamp),
            0x3A => self.op_swc2(opcode, bus, timestamp),
            _ => Err(ExceptionCode::ReservedInstruction),
        }
    }

    // -- shifts --

    fn op_sll(&mut self, opcode: u32) -> OpResult {
        let value = self.pipeline.gpr[rt(opcode) as usize] << shamt(opcode);
        self.pipeline.write_gpr(rd(opcode), value);
        NO_BRANCH
    }

    fn op_srl(&mut self, opcode: u32) -> OpResult {
        let value = self.pipeline.gpr[rt(opcode) as usize] >> shamt(opcode);
        self.pipeline.write_gpr(rd(opcode), value);
        NO_BRANCH
    }

    fn op_sra(&mut self, opcode: u32) -> OpResult {
        let value = (self.pipeline.gpr[rt(opcode) as usize] as i32) >> shamt(opcode);
        self.pipeline.write_gpr(rd(opcode), value as u32);
        NO_BRANCH
    }

    fn op_sllv(&mut self, opcode: u32) -> OpResult {
        let shift = self.pipeline.gpr[rs(opcode) as usize] & 0x1F;
        let value = self.pipeline.gpr[rt(opcode) as usize] << shift;
        self.pipeline.write_gpr(rd(opcode), value);
        NO_BRANCH
    }

    fn op_srlv(&mut self, opcode: u32) -> OpResult {
        let shift = self.pipeline.gpr[rs(opcode) as usize] & 0x1F;
        let value = self.pipeline.gpr[rt(opcode) as usize] >> shift;
        self.pipeline.write_gpr(rd(opcode), value);
        NO_BRANCH
    }

    fn op_srav(&mut self, opcode: u32) -> OpResult {
        let shift = self.pipeline.gpr[rs(opcode) as usize] & 0x1F;
        let value = (self.pipeline.gpr[rt(opcode) as usize] as i32) >> shift;
        self.pipeline.write_gpr(rd(opcode), value as u32);
        NO_BRANCH
    }

    // -- moves / multiply / divide --

    fn op_mfhi(&mut self, opcode: u32, timestamp: &mut i32) -> OpResult {
        self.stall_for_muldiv(timestamp);
        self.pipeline.write_gpr(rd(opcode), self.pipeline.hi);
        NO_BRANCH
    }

    fn op_mthi(&mut self, opcode: u32) -> OpResult {
        self.pipeline.hi = self.pipeline.gpr[rs(opcode) as usize];
        NO_BRANCH
    }

    fn op_mflo(&mut self, opcode: u32, timestamp: &mut i32) -> OpResult {
        self.stall_for_muldiv(timestamp);
        self.pipeline.write_gpr(rd(opcode), self.pipeline.lo);
        NO_BRANCH
    }

    fn op_mtlo(&mut self, opcode: u32) -> OpResult {
        self.pipeline.lo = self.pipeline.gpr[rs(opcode) as usize];
        NO_BRANCH
    }

    /// Burns cycles until `muldiv_ts_done`, ticking the read-absorb pool the same way
    /// the main loop does, matching the reference core's busy-wait in MFHI/MFLO.
    fn stall_for_muldiv(&mut self, timestamp: &mut i32) {
        while *timestamp < self.pipeline.muldiv_ts_done {
            self.pipeline.absorb_or_tick();
            *timestamp += 1;
        }
    }

    fn op_mult(&mut self, opcode: u32, timestamp: &mut i32) -> OpResult {
        let a = self.pipeline.gpr[rs(opcode) as usize] as i32 as i64;
        let b = self.pipeline.gpr[rt(opcode) as usize] as i32 as i64;
        let result = (a * b) as u64;
        self.pipeline.lo = result as u32;
        self.pipeline.hi = (result >> 32) as u32;
        self.pipeline.muldiv_ts_done = *timestamp + 7;
        NO_BRANCH
    }

    fn op_multu(&mut self, opcode: u32, timestamp: &mut i32) -> OpResult {
        let a = u64::from(self.pipeline.gpr[rs(opcode) as usize]);
        let b = u64::from(self.pipeline.gpr[rt(opcode) as usize]);
        let result = a * b;
        self.pipeline.lo = result as u32;
        self.pipeline.hi = (result >> 32) as u32;
        self.pipeline.muldiv_ts_done = *timestamp + 7;
        NO_BRANCH
    }

    fn op_div(&mut self, opcode: u32, timestamp: &mut i32) -> OpResult {
        let n = self.pipeline.gpr[rs(opcode) as usize] as i32;
        let d = self.pipeline.gpr[rt(opcode) as usize] as i32;
        if d == 0 {
            self.pipeline.lo = if n < 0 { 1 } else { 0xFFFF_FFFF };
            self.pipeline.hi = n as u32;
        } else if n == i32::MIN && d == -1 {
            self.pipeline.lo = 0x8000_0000;
            self.pipeline.hi = 0;
        } else {
            self.pipeline.lo = (n / d) as u32;
            self.pipeline.hi = (n % d) as u32;
        }
        self.pipeline.muldiv_ts_done = *timestamp + 37;
        NO_BRANCH
    }

    fn op_divu(&mut self, opcode: u32, timestamp: &mut i32) -> OpResult {
        let n = self.pipeline.gpr[rs(opcode) as usize];
        let d = self.pipeline.gpr[rt(opcode) as usize];
        if d == 0 {
            self.pipeline.lo = 0xFFFF_FFFF;
            self.pipeline.hi = n;
        } else {
            self.pipeline.lo = n / d;
            self.pipeline.hi = n % d;
        }
        self.pipeline.muldiv_ts_done = *timestamp + 37;
        NO_BRANCH
    }

    // -- ALU --

    fn op_add(&mut self, opcode: u32) -> OpResult {
        let a = self.pipeline.gpr[rs(opcode) as usize];
        let b = self.pipeline.gpr[rt(opcode) as usize];
        let result = a.wrapping_add(b);
        let overflow = (!(a ^ b) & (a ^ result)).sign_bit();
        if overflow {
            return Err(ExceptionCode::Overflow);
        }
        self.pipeline.write_gpr(rd(opcode), result);
        NO_BRANCH
    }

    fn op_addu(&mut self, opcode: u32) -> OpResult {
        let result = self.pipeline.gpr[rs(opcode) as usize]
            .wrapping_add(self.pipeline.gpr[rt(opcode) as usize]);
        self.pipeline.write_gpr(rd(opcode), result);
        NO_BRANCH
    }

    fn op_sub(&mut self, opcode: u32) -> OpResult {
        let a = self.pipeline.gpr[rs(opcode) as usize];
        let b = self.pipeline.gpr[rt(opcode) as usize];
        let result = a.wrapping_sub(b);
        let overflow = ((a ^ b) & (a ^ result)).sign_bit();
        if overflow {
            return Err(ExceptionCode::Overflow);
        }
        self.pipeline.write_gpr(rd(opcode), result);
        NO_BRANCH
    }

    fn op_subu(&mut self, opcode: u32) -> OpResult {
        let result = self.pipeline.gpr[rs(opcode) as usize]
            .wrapping_sub(self.pipeline.gpr[rt(opcode) as usize]);
        self.pipeline.write_gpr(rd(opcode), result);
        NO_BRANCH
    }

    fn op_and(&mut self, opcode: u32) -> OpResult {
        let value =
            self.pipeline.gpr[rs(opcode) as usize] & self.pipeline.gpr[rt(opcode) as usize];
        self.pipeline.write_gpr(rd(opcode), value);
        NO_BRANCH
    }

    fn op_or(&mut self, opcode: u32) -> OpResult {
        let value =
            self.pipeline.gpr[rs(opcode) as usize] | self.pipeline.gpr[rt(opcode) as usize];
        self.pipeline.write_gpr(rd(opcode), value);
        NO_BRANCH
    }

    fn op_xor(&mut self, opcode: u32) -> OpResult {
        let value =
            self.pipeline.gpr[rs(opcode) as usize] ^ self.pipeline.gpr[rt(opcode) as usize];
        self.pipeline.write_gpr(rd(opcode), value);
        NO_BRANCH
    }

    fn op_nor(&mut self, opcode: u32) -> OpResult {
        let value =
            !(self.pipeline.gpr[rs(opcode) as usize] | self.pipeline.gpr[rt(opcode) as usize]);
        self.pipeline.write_gpr(rd(opcode), value);
        NO_BRANCH
    }

    fn op_slt(&mut self, opcode: u32) -> OpResult {
        let a = self.pipeline.gpr[rs(opcode) as usize] as i32;
        let b = self.pipeline.gpr[rt(opcode) as usize] as i32;
        self.pipeline.write_gpr(rd(opcode), u32::from(a < b));
        NO_BRANCH
    }

    fn op_sltu(&mut self, opcode: u32) -> OpResult {
        let a = self.pipeline.gpr[rs(opcode) as usize];
        let b = self.pipeline.gpr[rt(opcode) as usize];
        self.pipeline.write_gpr(rd(opcode), u32::from(a < b));
        NO_BRANCH
    }

    // -- immediate ALU --

    fn op_addi(&mut self, opcode: u32) -> OpResult {
        let a = self.pipeline.gpr[rs(opcode) as usize];
        let imm = immediate(opcode) as u32;
        let result = a.wrapping_add(imm);
        let overflow = (!(a ^ imm) & (a ^ result)).sign_bit();
        if overflow {
            return Err(ExceptionCode::Overflow);
        }
        self.pipeline.write_gpr(rt(opcode), result);
        NO_BRANCH
    }

    fn op_addiu(&mut self, opcode: u32) -> OpResult {
        let result = self.pipeline.gpr[rs(opcode) as usize].wrapping_add(immediate(opcode) as u32);
        self.pipeline.write_gpr(rt(opcode), result);
        NO_BRANCH
    }

    fn op_slti(&mut self, opcode: u32) -> OpResult {
        let a = self.pipeline.gpr[rs(opcode) as usize] as i32;
        self.pipeline.write_gpr(rt(opcode), u32::from(a < immediate(opcode)));
        NO_BRANCH
    }

    fn op_sltiu(&mut self, opcode: u32) -> OpResult {
        let a = self.pipeline.gpr[rs(opcode) as usize];
        self.pipeline.write_gpr(rt(opcode), u32::from(a < immediate(opcode) as u32));
        NO_BRANCH
    }

    fn op_andi(&mut self, opcode: u32) -> OpResult {
        let value = self.pipeline.gpr[rs(opcode) as usize] & immediate_ze(opcode);
        self.pipeline.write_gpr(rt(opcode), value);
        NO_BRANCH
    }

    fn op_ori(&mut self, opcode: u32) -> OpResult {
        let value = self.pipeline.gpr[rs(opcode) as usize] | immediate_ze(opcode);
        self.pipeline.write_gpr(rt(opcode), value);
        NO_BRANCH
    }

    fn op_xori(&mut self, opcode: u32) -> OpResult {
        let value = self.pipeline.gpr[rs(opcode) as usize] ^ immediate_ze(opcode);
        self.pipeline.write_gpr(rt(opcode), value);
        NO_BRANCH
    }

    fn op_lui(&mut self, opcode: u32) -> OpResult {
        self.pipeline.write_gpr(rt(opcode), immediate_ze(opcode) << 16);
        NO_BRANCH
    }

    // -- jumps / branches --

    fn op_j(&mut self, opcode: u32) -> OpResult {
        let base = self.pipeline.pc & 0xF000_0000;
        let dest = base | (target(opcode) << 2);
        self.pipeline.take_branch(dest);
        Ok(true)
    }

    fn op_jal(&mut self, opcode: u32) -> OpResult {
        let return_addr = (self.pipeline.pc & self.pipeline.new_pc_mask)
            .wrapping_add(self.pipeline.new_pc)
            .wrapping_add(4);
        self.pipeline.write_gpr(31, return_addr);
        self.op_j(opcode)
    }

    fn op_jr(&mut self, opcode: u32) -> OpResult {
        let dest = self.pipeline.gpr[rs(opcode) as usize];
        self.pipeline.take_branch(dest);
        Ok(true)
    }

    fn op_jalr(&mut self, opcode: u32) -> OpResult {
        let dest = self.pipeline.gpr[rs(opcode) as usize];
        let return_addr = (self.pipeline.pc & self.pipeline.new_pc_mask)
            .wrapping_add(self.pipeline.new_pc)
            .wrapping_add(4);
        self.pipeline.write_gpr(rd(opcode), return_addr);
        self.pipeline.take_branch(dest);
        Ok(true)
    }

    fn branch_if(&mut self, opcode: u32, taken: bool) -> OpResult {
        if taken {
            let offset = immediate(opcode).wrapping_shl(2) as u32;
            let base = (self.pipeline.pc & self.pipeline.new_pc_mask).wrapping_add(self.pipeline.new_pc);
            self.pipeline.take_branch(base.wrapping_add(offset));
            Ok(true)
        } else {
            NO_BRANCH
        }
    }

    fn op_beq(&mut self, opcode: u32) -> OpResult {
        let taken = self.pipeline.gpr[rs(opcode) as usize] == self.pipeline.gpr[rt(opcode) as usize];
        self.branch_if(opcode, taken)
    }

    fn op_bne(&mut self, opcode: u32) -> OpResult {
        let taken = self.pipeline.gpr[rs(opcode) as usize] != self.pipeline.gpr[rt(opcode) as usize];
        self.branch_if(opcode, taken)
    }

    fn op_blez(&mut self, opcode: u32) -> OpResult {
        let taken = (self.pipeline.gpr[rs(opcode) as usize] as i32) <= 0;
        self.branch_if(opcode, taken)
    }

    fn op_bgtz(&mut self, opcode: u32) -> OpResult {
        let taken = (self.pipeline.gpr[rs(opcode) as usize] as i32) > 0;
        self.branch_if(opcode, taken)
    }

    fn op_bltz(&mut self, opcode: u32) -> OpResult {
        let taken = (self.pipeline.gpr[rs(opcode) as usize] as i32) < 0;
        self.branch_if(opcode, taken)
    }

    fn op_bgez(&mut self, opcode: u32) -> OpResult {
        let taken = (self.pipeline.gpr[rs(opcode) as usize] as i32) >= 0;
        self.branch_if(opcode, taken)
    }

    fn op_bltzal(&mut self, opcode: u32) -> OpResult {
        let taken = (self.pipeline.gpr[rs(opcode) as usize] as i32) < 0;
        let return_addr = (self.pipeline.pc & self.pipeline.new_pc_mask)
            .wrapping_add(self.pipeline.new_pc)
            .wrapping_add(4);
        self.pipeline.write_gpr(31, return_addr);
        self.branch_if(opcode, taken)
    }

    fn op_bgezal(&mut self, opcode: u32) -> OpResult {
        let taken = (self.pipeline.gpr[rs(opcode) as usize] as i32) >= 0;
        let return_addr = (self.pipeline.pc & self.pipeline.new_pc_mask)
            .wrapping_add(self.pipeline.new_pc)
            .wrapping_add(4);
        self.pipeline.write_gpr(31, return_addr);
        self.branch_if(opcode, taken)
    }

    // -- CP0 --

    fn op_cop0(&mut self, opcode: u32) -> OpResult {
        match (opcode >> 21) & 0x1F {
            0x00 => {
                let value = self.cp0.read(rd(opcode));
                self.pipeline.write_gpr_delayed(rt(opcode), value);
                NO_BRANCH
            }
            0x04 => {
                let value = self.pipeline.gpr[rt(opcode) as usize];
                log::debug!("MTC0 {} <- {value:#010X}", cp0_reg_name(rd(opcode)));
                self.cp0.write(rd(opcode), value);
                NO_BRANCH
            }
            0x10 if opcode & 0x3F == 0x10 => {
                self.cp0.rfe();
                NO_BRANCH
            }
            _ => NO_BRANCH,
        }
    }

    // -- CP2 (GTE) --

    /// Stalls `timestamp` to `gte_ts_done` if the GTE is still busy finishing a prior
    /// instruction. Unlike [`R3000::stall_for_muldiv`], this is a direct jump rather
    /// than a tick loop: the GTE has no per-cycle read-absorb interaction to model.
    fn stall_for_gte(&mut self, timestamp: &mut i32) {
        if *timestamp < self.pipeline.gte_ts_done {
            *timestamp = self.pipeline.gte_ts_done;
        }
    }

    fn op_cop2(&mut self, opcode: u32, timestamp: &mut i32) -> OpResult {
        match (opcode >> 21) & 0x1F {
            0x00 => {
                let absorb = (self.pipeline.gte_ts_done - *timestamp).max(0) as u8;
                self.stall_for_gte(timestamp);
                self.pipeline.ld_absorb = absorb;
                let value = self.gte.read_data(rd(opcode));
                self.pipeline.write_gpr_delayed(rt(opcode), value);
            }
            0x02 => {
                let absorb = (self.pipeline.gte_ts_done - *timestamp).max(0) as u8;
                self.stall_for_gte(timestamp);
                self.pipeline.ld_absorb = absorb;
                let value = self.gte.read_control(rd(opcode));
                self.pipeline.write_gpr_delayed(rt(opcode), value);
            }
            0x04 => {
                self.stall_for_gte(timestamp);
                self.gte.write_data(rd(opcode), self.pipeline.gpr[rt(opcode) as usize]);
            }
            0x06 => {
                self.stall_for_gte(timestamp);
                self.gte.write_control(rd(opcode), self.pipeline.gpr[rt(opcode) as usize]);
            }
            _ => {
                self.stall_for_gte(timestamp);
                let cycles = self.gte.execute(opcode);
                self.pipeline.gte_ts_done = *timestamp + cycles as i32;
            }
        }
        NO_BRANCH
    }

    // -- loads / stores --

    fn effective_address(&self, opcode: u32) -> u32 {
        self.pipeline.gpr[rs(opcode) as usize].wrapping_add(immediate(opcode) as u32)
    }

    /// Cycles of load-delay latency a read at `addr` leaves behind for the following
    /// instruction's [`super::registers::Pipeline::absorb_or_tick`] to hide. The
    /// scratchpad is zero-latency; everything reached through the host bus carries a
    /// fixed absorbable cost on top of whatever `timestamp` the bus itself already
    /// advanced for bus-level wait states.
    fn load_absorb_cycles(addr: u32) -> u8 {
        if bus::in_scratchpad_range(bus::decode_address(addr)) {
            0
        } else {
            2
        }
    }

    fn op_lb<B: BusInterface>(&mut self, opcode: u32, bus: &mut B, timestamp: &mut i32) -> OpResult {
        let addr = self.effective_address(opcode);
        let value = self.mem_read8(bus, timestamp, addr) as i8 as i32 as u32;
        self.pipeline.ld_absorb = Self::load_absorb_cycles(addr);
        self.pipeline.write_gpr_delayed(rt(opcode), value);
        NO_BRANCH
    }

    fn op_lbu<B: BusInterface>(&mut self, opcode: u32, bus: &mut B, timestamp: &mut i32) -> OpResult {
        let addr = self.effective_address(opcode);
        let value = self.mem_read8(bus, timestamp, addr);
        self.pipeline.ld_absorb = Self::load_absorb_cycles(addr);
        self.pipeline.write_gpr_delayed(rt(opcode), value);
        NO_BRANCH
    }

    fn op_lh<B: BusInterface>(&mut self, opcode: u32, bus: &mut B, timestamp: &mut i32) -> OpResult {
        let addr = self.effective_address(opcode);
        if addr & 1 != 0 {
            return Err(ExceptionCode::AddressErrorLoad);
        }
        let value = self.mem_read16(bus, timestamp, addr) as i16 as i32 as u32;
        self.pipeline.ld_absorb = Self::load_absorb_cycles(addr);
        self.pipeline.write_gpr_delayed(rt(opcode), value);
        NO_BRANCH
    }

    fn op_lhu<B: BusInterface>(&mut self, opcode: u32, bus: &mut B, timestamp: &mut i32) -> OpResult {
        let addr = self.effective_address(opcode);
        if addr & 1 != 0 {
            return Err(ExceptionCode::AddressErrorLoad);
        }
        let value = self.mem_read16(bus, timestamp, addr);
        self.pipeline.ld_absorb = Self::load_absorb_cycles(addr);
        self.pipeline.write_gpr_delayed(rt(opcode), value);
        NO_BRANCH
    }

    fn op_lw<B: BusInterface>(&mut self, opcode: u32, bus: &mut B, timestamp: &mut i32) -> OpResult {
        let addr = self.effective_address(opcode);
        if addr & 3 != 0 {
            return Err(ExceptionCode::AddressErrorLoad);
        }
        let value = self.mem_read32(bus, timestamp, addr);
        self.pipeline.ld_absorb = Self::load_absorb_cycles(addr);
        self.pipeline.write_gpr_delayed(rt(opcode), value);
        NO_BRANCH
    }

    fn op_sb<B: BusInterface>(&mut self, opcode: u32, bus: &mut B, timestamp: &mut i32) -> OpResult {
        let addr = self.effective_address(opcode);
        let value = self.pipeline.gpr[rt(opcode) as usize];
        self.mem_write8(bus, timestamp, addr, value);
        NO_BRANCH
    }

    fn op_sh<B: BusInterface>(&mut self, opcode: u32, bus: &mut B, timestamp: &mut i32) -> OpResult {
        let addr = self.effective_address(opcode);
        if addr & 1 != 0 {
            return Err(ExceptionCode::AddressErrorStore);
        }
        let value = self.pipeline.gpr[rt(opcode) as usize];
        self.mem_write16(bus, timestamp, addr, value);
        NO_BRANCH
    }

    fn op_sw<B: BusInterface>(&mut self, opcode: u32, bus: &mut B, timestamp: &mut i32) -> OpResult {
        let addr = self.effective_address(opcode);
        if addr & 3 != 0 {
            return Err(ExceptionCode::AddressErrorStore);
        }
        let value = self.pipeline.gpr[rt(opcode) as usize];
        self.mem_write32(bus, timestamp, addr, value);
        NO_BRANCH
    }

    /// LWL: loads the most-significant 1..=4 bytes of the addressed word into the
    /// corresponding high bytes of `rt`, leaving the low bytes untouched. Reads the
    /// in-flight delayed load for `rt` rather than its committed value, so back-to-back
    /// LWL/LWR pairs targeting the same register fuse correctly.
    fn op_lwl<B: BusInterface>(&mut self, opcode: u32, bus: &mut B, timestamp: &mut i32) -> OpResult {
        let addr = self.effective_address(opcode);
        let reg = rt(opcode);
        let fused = self.pipeline.ld_which == reg;
        let current = self.pipeline.read_gpr_lwl_lwr(reg);
        if !fused {
            self.pipeline.commit_pending_load();
        }

        let aligned = addr & !3;
        let value = match addr & 0x3 {
            0 => (current & 0x00FF_FFFF) | (self.mem_read8(bus, timestamp, aligned) << 24),
            1 => (current & 0x0000_FFFF) | (self.mem_read16(bus, timestamp, aligned) << 16),
            2 => (current & 0x0000_00FF) | (self.mem_read24(bus, timestamp, aligned) << 8),
            _ => self.mem_read32(bus, timestamp, aligned),
        };
        self.pipeline.ld_absorb = Self::load_absorb_cycles(aligned);
        self.pipeline.write_gpr_delayed(reg, value);
        NO_BRANCH
    }

    /// LWR: the mirror image of LWL, loading the least-significant bytes.
    fn op_lwr<B: BusInterface>(&mut self, opcode: u32, bus: &mut B, timestamp: &mut i32) -> OpResult {
        let addr = self.effective_address(opcode);
        let reg = rt(opcode);
        let fused = self.pipeline.ld_which == reg;
        let current = self.pipeline.read_gpr_lwl_lwr(reg);
        if !fused {
            self.pipeline.commit_pending_load();
        }

        // Unlike LWL, LWR's sub-word reads use the raw unaligned address directly
        // rather than rounding down to the containing word: the backing stores are
        // plain byte arrays, so a 16/24-bit read at an odd offset already lands on
        // the right bytes.
        let value = match addr & 0x3 {
            0 => self.mem_read32(bus, timestamp, addr),
            1 => (current & 0xFF00_0000) | self.mem_read24(bus, timestamp, addr),
            2 => (current & 0xFFFF_0000) | self.mem_read16(bus, timestamp, addr),
            _ => (current & 0xFFFF_FF00) | self.mem_read8(bus, timestamp, addr),
        };
        self.pipeline.ld_absorb = Self::load_absorb_cycles(addr);
        self.pipeline.write_gpr_delayed(reg, value);
        NO_BRANCH
    }

    fn op_swl<B: BusInterface>(&mut self, opcode: u32, bus: &mut B, timestamp: &mut i32) -> OpResult {
        let addr = self.effective_address(opcode);
        let value = self.pipeline.gpr[rt(opcode) as usize];
        let aligned = addr & !3;
        match addr & 0x3 {
            0 => self.mem_write8(bus, timestamp, aligned, value >> 24),
            1 => self.mem_write16(bus, timestamp, aligned, value >> 16),
            2 => self.mem_write24(bus, timestamp, aligned, value >> 8),
            _ => self.mem_write32(bus, timestamp, aligned, value),
        }
        NO_BRANCH
    }

    fn op_swr<B: BusInterface>(&mut self, opcode: u32, bus: &mut B, timestamp: &mut i32) -> OpResult {
        let addr = self.effective_address(opcode);
        let value = self.pipeline.gpr[rt(opcode) as usize];
        match addr & 0x3 {
            0 => self.mem_write32(bus, timestamp, addr, value),
            1 => self.mem_write24(bus, timestamp, addr, value),
            2 => self.mem_write16(bus, timestamp, addr, value),
            _ => self.mem_write8(bus, timestamp, addr, value),
        }
        NO_BRANCH
    }

    fn op_lwc2<B: BusInterface>(&mut self, opcode: u32, bus: &mut B, timestamp: &mut i32) -> OpResult {
        let addr = self.effective_address(opcode);
        if addr & 3 != 0 {
            return Err(ExceptionCode::AddressErrorLoad);
        }
        self.stall_for_gte(timestamp);
        let value = self.mem_read32(bus, timestamp, addr);
        self.gte.write_data(rt(opcode), value);
        NO_BRANCH
    }

    fn op_swc2<B: BusInterface>(&mut self, opcode: u32, bus: &mut B, timestamp: &mut i32) -> OpResult {
        let addr = self.effective_address(opcode);
        if addr & 3 != 0 {
            return Err(ExceptionCode::AddressErrorStore);
        }
        self.stall_for_gte(timestamp);
        let value = self.gte.read_data(rt(opcode));
        self.mem_write32(bus, timestamp, addr, value);
        NO_BRANCH
    }
}

fn cp0_reg_name(index: u32) -> &'static str {
    match index {
        cp0::REG_BPC => "BPC",
        cp0::REG_BDA => "BDA",
        cp0::REG_TAR => "TAR",
        cp0::REG_DCIC => "DCIC",
        cp0::REG_BADVA => "BadVAddr",
        cp0::REG_BDAM => "BDAM",
        cp0::REG_BPCM => "BPCM",
        cp0::REG_SR => "SR",
        cp0::REG_CAUSE => "CAUSE",
        cp0::REG_EPC => "EPC",
        cp0::REG_PRID => "PRId",
        _ => "?",
    }
}
