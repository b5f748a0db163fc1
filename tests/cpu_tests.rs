//! End-to-end scenarios running real MIPS-I programs through [`R3000::run`], backed
//! by a minimal in-memory [`BusInterface`] rather than any real PlayStation memory
//! map.

use r3000_core::bus::{BusInterface, FastMap};
use r3000_core::gte::NullGte;
use r3000_core::irq::IrqLatch;
use r3000_core::R3000;

struct TestRam {
    data: Vec<u8>,
}

impl TestRam {
    fn new(size: usize) -> Self {
        Self { data: vec![0; size] }
    }
}

impl BusInterface for TestRam {
    fn read8(&mut self, _timestamp: &mut i32, addr: u32) -> u32 {
        u32::from(self.data[addr as usize])
    }

    fn read16(&mut self, _timestamp: &mut i32, addr: u32) -> u32 {
        let a = addr as usize;
        u32::from(u16::from_le_bytes(self.data[a..a + 2].try_into().unwrap()))
    }

    fn read32(&mut self, _timestamp: &mut i32, addr: u32) -> u32 {
        let a = addr as usize;
        u32::from_le_bytes(self.data[a..a + 4].try_into().unwrap())
    }

    fn write8(&mut self, _timestamp: &mut i32, addr: u32, value: u32) {
        self.data[addr as usize] = value as u8;
    }

    fn write16(&mut self, _timestamp: &mut i32, addr: u32, value: u32) {
        let a = addr as usize;
        self.data[a..a + 2].copy_from_slice(&(value as u16).to_le_bytes());
    }

    fn write32(&mut self, _timestamp: &mut i32, addr: u32, value: u32) {
        let a = addr as usize;
        self.data[a..a + 4].copy_from_slice(&value.to_le_bytes());
    }

    fn peek8(&self, addr: u32) -> u32 {
        u32::from(self.data[addr as usize])
    }

    fn peek16(&self, addr: u32) -> u32 {
        let a = addr as usize;
        u32::from(u16::from_le_bytes(self.data[a..a + 2].try_into().unwrap()))
    }

    fn peek32(&self, addr: u32) -> u32 {
        let a = addr as usize;
        u32::from_le_bytes(self.data[a..a + 4].try_into().unwrap())
    }
}

fn addiu(rt: u32, rs: u32, imm: i32) -> u32 {
    (0x09 << 26) | (rs << 21) | (rt << 16) | (imm as u32 & 0xFFFF)
}
fn ori(rt: u32, rs: u32, imm: u32) -> u32 {
    (0x0D << 26) | (rs << 21) | (rt << 16) | (imm & 0xFFFF)
}
fn lui(rt: u32, imm: u32) -> u32 {
    (0x0F << 26) | (rt << 16) | (imm & 0xFFFF)
}
fn add(rd: u32, rs: u32, rt: u32) -> u32 {
    (rs << 21) | (rt << 16) | (rd << 11) | 0x20
}
fn sw(rt: u32, imm: i32, rs: u32) -> u32 {
    (0x2B << 26) | (rs << 21) | (rt << 16) | (imm as u32 & 0xFFFF)
}
fn lw(rt: u32, imm: i32, rs: u32) -> u32 {
    (0x23 << 26) | (rs << 21) | (rt << 16) | (imm as u32 & 0xFFFF)
}
fn lwl(rt: u32, imm: i32, rs: u32) -> u32 {
    (0x22 << 26) | (rs << 21) | (rt << 16) | (imm as u32 & 0xFFFF)
}
fn lwr(rt: u32, imm: i32, rs: u32) -> u32 {
    (0x26 << 26) | (rs << 21) | (rt << 16) | (imm as u32 & 0xFFFF)
}
fn beq(rs: u32, rt: u32, offset_words: i32) -> u32 {
    (0x04 << 26) | (rs << 21) | (rt << 16) | (offset_words as u32 & 0xFFFF)
}
fn syscall() -> u32 {
    0x0C
}
fn mtc0(rt: u32, rd: u32) -> u32 {
    (0x10 << 26) | (0x04 << 21) | (rt << 16) | (rd << 11)
}
fn divu(rs: u32, rt: u32) -> u32 {
    (rs << 21) | (rt << 16) | 0x1B
}
fn mflo(rd: u32) -> u32 {
    (rd << 11) | 0x12
}
fn mfhi(rd: u32) -> u32 {
    (rd << 11) | 0x10
}
fn nop() -> u32 {
    0
}

fn program_bytes(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

const RESET_VECTOR: u32 = 0xBFC0_0000;

#[test]
fn cold_boot_starts_at_reset_vector() {
    let cpu: R3000<NullGte> = R3000::new();
    assert_eq!(cpu.pc(), RESET_VECTOR);
    assert!(!cpu.is_halted());
}

#[test]
fn power_is_idempotent() {
    let mut cpu: R3000<NullGte> = R3000::new();
    let before = cpu.pc();
    cpu.power();
    assert_eq!(cpu.pc(), before);
    assert_eq!(cpu.cp0().sr(), cpu.cp0().sr());
}

/// Runs exactly `words.len()` instructions starting at the reset vector, one
/// [`R3000::run`] call per instruction so a free (absorbed) cycle on one step can
/// never cause the loop to spill into the next instruction early. Used for programs
/// that deliberately fault on their last instruction: any further fetch would land
/// on unmapped memory and stomp the very CP0 state the test wants to inspect.
///
/// The I-cache's `pc >= 0xA000_0000` bypass path indexes [`FastMap`] by the raw
/// (uncached, KSEG1) PC rather than a decoded physical address, so the region is
/// mapped at the reset vector itself.
fn run_exact(words: &[u32], ram_size: usize) -> (R3000<NullGte>, TestRam) {
    let mut cpu: R3000<NullGte> = R3000::new();
    let code = program_bytes(words);

    let mut map = FastMap::empty();
    map.set_region(0, RESET_VECTOR, &code).unwrap();

    let mut bus = TestRam::new(ram_size);
    let irq = IrqLatch::new();

    let mut timestamp = 0;
    for _ in 0..words.len() {
        timestamp = cpu.run(&mut bus, &map, &irq, timestamp, timestamp + 1, false);
    }
    (cpu, bus)
}

/// Runs `words` followed by a harmless infinite self-branch, then lets the CPU spin
/// in that loop for a generous number of extra instructions so every delayed load
/// and read-absorb stall the program set in motion has settled by the time the test
/// inspects state. Used for programs that run to completion rather than fault.
fn run_and_settle(words: &[u32], ram_size: usize) -> (R3000<NullGte>, TestRam) {
    let mut padded = words.to_vec();
    padded.push(beq(0, 0, -1)); // branches to itself
    padded.push(nop());

    let mut cpu: R3000<NullGte> = R3000::new();
    let code = program_bytes(&padded);

    let mut map = FastMap::empty();
    map.set_region(0, RESET_VECTOR, &code).unwrap();

    let mut bus = TestRam::new(ram_size);
    let irq = IrqLatch::new();

    let mut timestamp = 0;
    for _ in 0..padded.len() + 8 {
        timestamp = cpu.run(&mut bus, &map, &irq, timestamp, timestamp + 1, false);
    }
    (cpu, bus)
}

#[test]
fn add_overflow_raises_exception_and_redirects_to_handler() {
    const SR: u32 = 12;
    let words = [
        mtc0(0, SR), // clear SR: BEV=0, IEc=0
        lui(1, 0x7FFF),
        ori(1, 1, 0xFFFF), // r1 = i32::MAX
        addiu(2, 0, 1),    // r2 = 1
        add(3, 1, 2),      // traps: overflow
    ];
    let (cpu, _bus) = run_exact(&words, 0x1000);

    assert_eq!(cpu.pc(), 0x8000_0080);
    assert_eq!((cpu.cp0().cause() >> 2) & 0x1F, 0x0C);
    assert_eq!(cpu.gpr(3), 0, "ADD's destination must not be written on overflow");
}

#[test]
fn branch_delay_exception_corrects_epc_and_sets_bd_bit() {
    let words = [
        beq(0, 0, 1), // always taken; delay slot is the next word
        syscall(),    // executes in the branch's delay slot
    ];
    let (cpu, _bus) = run_exact(&words, 0x1000);

    assert_eq!((cpu.cp0().cause() >> 2) & 0x1F, 0x08);
    assert_eq!(cpu.cp0().cause() & (1 << 31), 1 << 31, "BD bit must be set");

    // EPC should point at the branch itself (the delay slot instruction's address
    // minus 4), not the SYSCALL that actually raised the exception.
    assert_eq!(cpu.cp0().epc(), RESET_VECTOR);
}

#[test]
fn load_delay_slot_hides_value_for_one_instruction() {
    let words = [
        addiu(1, 0, 0x1234), // r1 = 0x1234
        sw(1, 0x400, 0),     // mem[0x400] = 0x1234
        lw(2, 0x400, 0),     // r2 <= delayed load from mem[0x400]
        add(3, 2, 0),        // r3 = r2 (still old value: the load hasn't committed yet)
        add(4, 2, 0),        // r4 = r2 (load has committed by now)
    ];
    let (cpu, _bus) = run_and_settle(&words, 0x1000);

    assert_eq!(cpu.gpr(3), 0, "r2's delayed load must not be visible one instruction later");
    assert_eq!(cpu.gpr(4), 0x1234, "r2's delayed load must be visible two instructions later");
}

#[test]
fn lwl_lwr_assemble_an_unaligned_word() {
    // Bytes [0x401..0x405) spell out 0x88_44_33_22 once read little-endian, built
    // from two adjacent aligned words.
    let words = [
        lui(1, 0x1122),
        ori(1, 1, 0x3344),
        sw(1, 0x400, 0), // mem[0x400..0x404) = 0x1122_3344
        lui(2, 0x5566),
        ori(2, 2, 0x7788),
        sw(2, 0x404, 0), // mem[0x404..0x408) = 0x5566_7788
        lwl(5, 0x404, 0), // address 0x404, case 0: top byte <= mem[0x404] = 0x88
        lwr(5, 0x401, 0), // address 0x401, case 1: low 3 bytes <= mem[0x401..0x404)
        nop(),
    ];
    let (cpu, _bus) = run_and_settle(&words, 0x1000);

    assert_eq!(cpu.gpr(5), 0x8844_3322);
}

#[test]
fn divu_by_zero_and_mflo_stall() {
    let words = [
        addiu(2, 0, 5), // r2 = 5 (dividend)
        divu(2, 1),     // r1 = 0 (divisor): LO = 0xFFFFFFFF, HI = r2
        mflo(3),        // stalls until the divider is ready
        mfhi(4),
    ];
    let (cpu, _bus) = run_exact(&words, 0x1000);

    assert_eq!(cpu.gpr(3), 0xFFFF_FFFF);
    assert_eq!(cpu.gpr(4), 5);
}

#[test]
fn savestate_round_trips_architectural_state() {
    let words = [addiu(1, 0, 0x7E57), addiu(2, 0, 1)];
    let (cpu, _bus) = run_exact(&words, 0x1000);

    let blob = cpu.save_state();
    let restored = R3000::<NullGte>::load_state(&blob).unwrap();

    assert_eq!(restored.pc(), cpu.pc());
    assert_eq!(restored.gpr(1), cpu.gpr(1));
    assert_eq!(restored.gpr(2), cpu.gpr(2));
    assert_eq!(restored.cp0().sr(), cpu.cp0().sr());
}
