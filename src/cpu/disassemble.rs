//! Textual disassembly used by the trace-level logging in [`super::instructions`] and
//! by host debuggers built on [`super::debug`]. Not performance-sensitive; only
//! called when trace logging is actually enabled.

fn rs(opcode: u32) -> u32 {
    (opcode >> 21) & 0x1F
}
fn rt(opcode: u32) -> u32 {
    (opcode >> 16) & 0x1F
}
fn rd(opcode: u32) -> u32 {
    (opcode >> 11) & 0x1F
}
fn sa(opcode: u32) -> u32 {
    (opcode >> 6) & 0x1F
}
fn imm(opcode: u32) -> i32 {
    (opcode as i16) as i32
}
fn imm_ze(opcode: u32) -> u32 {
    opcode & 0xFFFF
}
fn target(opcode: u32) -> u32 {
    opcode & 0x03FF_FFFF
}

pub fn instruction_str(opcode: u32) -> String {
    match opcode >> 26 {
        0x00 => special_str(opcode),
        0x01 => format!("{} R{}, {:+}", bcond_mnemonic(opcode), rs(opcode), imm(opcode) * 4),
        0x02 => format!("J {:#010X}", target(opcode) << 2),
        0x03 => format!("JAL {:#010X}", target(opcode) << 2),
        0x04 => format!("BEQ R{}, R{}, {:+}", rs(opcode), rt(opcode), imm(opcode) * 4),
        0x05 => format!("BNE R{}, R{}, {:+}", rs(opcode), rt(opcode), imm(opcode) * 4),
        0x06 => format!("BLEZ R{}, {:+}", rs(opcode), imm(opcode) * 4),
        0x07 => format!("BGTZ R{}, {:+}", rs(opcode), imm(opcode) * 4),
        0x08 => format!("ADDI R{}, R{}, {}", rt(opcode), rs(opcode), imm(opcode)),
        0x09 => format!("ADDIU R{}, R{}, {}", rt(opcode), rs(opcode), imm(opcode)),
        0x0A => format!("SLTI R{}, R{}, {}", rt(opcode), rs(opcode), imm(opcode)),
        0x0B => format!("SLTIU R{}, R{}, {}", rt(opcode), rs(opcode), imm(opcode)),
        0x0C => format!("ANDI R{}, R{}, {:#06X}", rt(opcode), rs(opcode), imm_ze(opcode)),
        0x0D => format!("ORI R{}, R{}, {:#06X}", rt(opcode), rs(opcode), imm_ze(opcode)),
        0x0E => format!("XORI R{}, R{}, {:#06X}", rt(opcode), rs(opcode), imm_ze(opcode)),
        0x0F => format!("LUI R{}, {:#06X}", rt(opcode), imm_ze(opcode)),
        0x10 => cop0_str(opcode),
        0x11 => "COP1 (unusable)".into(),
        0x12 => cop2_str(opcode),
        0x13 => "COP3 (unusable)".into(),
        0x20 => format!("LB R{}, {}(R{})", rt(opcode), imm(opcode), rs(opcode)),
        0x21 => format!("LH R{}, {}(R{})", rt(opcode), imm(opcode), rs(opcode)),
        0x22 => format!("LWL R{}, {}(R{})", rt(opcode), imm(opcode), rs(opcode)),
        0x23 => format!("LW R{}, {}(R{})", rt(opcode), imm(opcode), rs(opcode)),
        0x24 => format!("LBU R{}, {}(R{})", rt(opcode), imm(opcode), rs(opcode)),
        0x25 => format!("LHU R{}, {}(R{})", rt(opcode), imm(opcode), rs(opcode)),
        0x26 => format!("LWR R{}, {}(R{})", rt(opcode), imm(opcode), rs(opcode)),
        0x28 => format!("SB R{}, {}(R{})", rt(opcode), imm(opcode), rs(opcode)),
        0x29 => format!("SH R{}, {}(R{})", rt(opcode), imm(opcode), rs(opcode)),
        0x2A => format!("SWL R{}, {}(R{})", rt(opcode), imm(opcode), rs(opcode)),
        0x2B => format!("SW R{}, {}(R{})", rt(opcode), imm(opcode), rs(opcode)),
        0x2E => format!("SWR R{}, {}(R{})", rt(opcode), imm(opcode), rs(opcode)),
        0x32 => format!("LWC2 R{}, {}(R{})", rt(opcode), imm(opcode), rs(opcode)),
        0x3A => format!("SWC2 R{}, {}(R{})", rt(opcode), imm(opcode), rs(opcode)),
        _ => format!(".word {opcode:#010X}"),
    }
}

fn special_str(opcode: u32) -> String {
    match opcode & 0x3F {
        0x00 => format!("SLL R{}, R{}, {}", rd(opcode), rt(opcode), sa(opcode)),
        0x02 => format!("SRL R{}, R{}, {}", rd(opcode), rt(opcode), sa(opcode)),
        0x03 => format!("SRA R{}, R{}, {}", rd(opcode), rt(opcode), sa(opcode)),
        0x04 => format!("SLLV R{}, R{}, R{}", rd(opcode), rt(opcode), rs(opcode)),
        0x06 => format!("SRLV R{}, R{}, R{}", rd(opcode), rt(opcode), rs(opcode)),
        0x07 => format!("SRAV R{}, R{}, R{}", rd(opcode), rt(opcode), rs(opcode)),
        0x08 => format!("JR R{}", rs(opcode)),
        0x09 => format!("JALR R{}, R{}", rd(opcode), rs(opcode)),
        0x0C => "SYSCALL".into(),
        0x0D => "BREAK".into(),
        0x10 => format!("MFHI R{}", rd(opcode)),
        0x11 => format!("MTHI R{}", rs(opcode)),
        0x12 => format!("MFLO R{}", rd(opcode)),
        0x13 => format!("MTLO R{}", rs(opcode)),
        0x18 => format!("MULT R{}, R{}", rs(opcode), rt(opcode)),
        0x19 => format!("MULTU R{}, R{}", rs(opcode), rt(opcode)),
        0x1A => format!("DIV R{}, R{}", rs(opcode), rt(opcode)),
        0x1B => format!("DIVU R{}, R{}", rs(opcode), rt(opcode)),
        0x20 => format!("ADD R{}, R{}, R{}", rd(opcode), rs(opcode), rt(opcode)),
        0x21 => format!("ADDU R{}, R{}, R{}", rd(opcode), rs(opcode), rt(opcode)),
        0x22 => format!("SUB R{}, R{}, R{}", rd(opcode), rs(opcode), rt(opcode)),
        0x23 => format!("SUBU R{}, R{}, R{}", rd(opcode), rs(opcode), rt(opcode)),
        0x24 => format!("AND R{}, R{}, R{}", rd(opcode), rs(opcode), rt(opcode)),
        0x25 => format!("OR R{}, R{}, R{}", rd(opcode), rs(opcode), rt(opcode)),
        0x26 => format!("XOR R{}, R{}, R{}", rd(opcode), rs(opcode), rt(opcode)),
        0x27 => format!("NOR R{}, R{}, R{}", rd(opcode), rs(opcode), rt(opcode)),
        0x2A => format!("SLT R{}, R{}, R{}", rd(opcode), rs(opcode), rt(opcode)),
        0x2B => format!("SLTU R{}, R{}, R{}", rd(opcode), rs(opcode), rt(opcode)),
        other => format!(".special {other:#04X}"),
    }
}

fn bcond_mnemonic(opcode: u32) -> &'static str {
    match rt(opcode) {
        0x00 => "BLTZ",
        0x01 => "BGEZ",
        0x10 => "BLTZAL",
        0x11 => "BGEZAL",
        _ => "BCOND?",
    }
}

fn cop0_str(opcode: u32) -> String {
    match (opcode >> 21) & 0x1F {
        0x00 => format!("MFC0 R{}, CP0R{}", rt(opcode), rd(opcode)),
        0x04 => format!("MTC0 R{}, CP0R{}", rt(opcode), rd(opcode)),
        0x10 if opcode & 0x3F == 0x10 => "RFE".into(),
        _ => format!(".cop0 {opcode:#010X}"),
    }
}

fn cop2_str(opcode: u32) -> String {
    match (opcode >> 21) & 0x1F {
        0x00 => format!("MFC2 R{}, CP2D{}", rt(opcode), rd(opcode)),
        0x02 => format!("CFC2 R{}, CP2C{}", rt(opcode), rd(opcode)),
        0x04 => format!("MTC2 R{}, CP2D{}", rt(opcode), rd(opcode)),
        0x06 => format!("CTC2 R{}, CP2C{}", rt(opcode), rd(opcode)),
        _ => format!("GTE {opcode:#010X}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disassembles_sll_nop_as_sll_r0() {
        assert_eq!(instruction_str(0), "SLL R0, R0, 0");
    }

    #[test]
    fn disassembles_addiu() {
        let opcode = (0x09 << 26) | (4 << 21) | (5 << 16) | 0xFFFC;
        assert_eq!(instruction_str(opcode), "ADDIU R5, R4, -4");
    }

    #[test]
    fn disassembles_mtc0() {
        let opcode = (0x10 << 26) | (0x04 << 21) | (8 << 16) | (12 << 11);
        assert_eq!(instruction_str(opcode), "MTC0 R8, CP0R12");
    }
}
