//! Debug/tracing hooks and the breakpoint-classification helper used by frontend
//! memory-watch UIs.
//!
//! Unlike the rest of the core, these hooks are plain `log` trace output rather than
//! host-supplied callbacks: a host that wants programmatic breakpoints can match on
//! `log`'s target/fields, which keeps the core free of `dyn Fn` plumbing for a feature
//! most embeddings never touch.

use super::icache::ICache;

pub(super) fn on_instruction(timestamp: &i32, pc: u32) {
    log::trace!(target: "r3000_core::cpu::debug", "pc={pc:08X} ts={timestamp}");
}

pub(super) fn on_branch_taken(from: u32, to: u32) {
    log::trace!(target: "r3000_core::cpu::debug", "branch {from:08X} -> {to:08X}");
}

/// Which bytes of the addressed word a memory access actually touches. LWL/SWL and
/// LWR/SWR only touch part of the word they address, and the part depends on the
/// byte-within-word misalignment, so a watchpoint implementation needs to know the
/// exact byte range rather than assuming the full `len` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessWidth {
    Byte,
    Half,
    Word,
}

/// Classifies the access an instruction performs, invoking `callback(is_write,
/// address, width)` once per byte/half/word the instruction actually touches. Ordinary
/// loads/stores call back once at their natural width; LWL/SWL call back once per byte,
/// descending from the effective address down to the containing word's base, and
/// LWR/SWR call back once per byte ascending from the effective address up to the
/// containing word's top byte -- matching the sub-range each alignment case transfers.
pub fn check_breakpoints(
    opcode: u32,
    rs_value: i64,
    immediate: i32,
    mut callback: impl FnMut(bool, u32, AccessWidth),
) {
    let is_write = matches!((opcode >> 26) & 0x3F, 0x28 | 0x29 | 0x2A | 0x2B | 0x2E);
    let address = (rs_value as i32).wrapping_add(immediate) as u32;

    match (opcode >> 26) & 0x3F {
        0x20 | 0x24 | 0x28 => callback(is_write, address, AccessWidth::Byte), // LB/LBU/SB
        0x21 | 0x25 | 0x29 => callback(is_write, address, AccessWidth::Half), // LH/LHU/SH
        0x23 | 0x2B => callback(is_write, address, AccessWidth::Word),       // LW/SW
        0x22 | 0x2A => {
            let aligned = address & !3;
            let mut a = address;
            loop {
                callback(is_write, a, AccessWidth::Byte);
                if a == aligned {
                    break;
                }
                a -= 1;
            }
        }
        0x26 | 0x2E => {
            let top = address | 0x3;
            let mut a = address;
            loop {
                callback(is_write, a, AccessWidth::Byte);
                if a == top {
                    break;
                }
                a += 1;
            }
        }
        _ => {}
    }
}

/// `PeekCheckICache`: returns the cached word for `pc` without disturbing cache state,
/// for a host-side disassembly/memory view. `None` if the line's tag doesn't match.
pub fn peek_check_icache(icache: &ICache, pc: u32) -> Option<u32> {
    icache.hit(pc).then(|| icache.fetched_word(pc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_ordinary_word_store() {
        let sw_opcode = 0x2B << 26;
        let mut hits = Vec::new();
        check_breakpoints(sw_opcode, 0x1000, 4, |w, a, width| hits.push((w, a, width)));
        assert_eq!(hits, vec![(true, 0x1004, AccessWidth::Word)]);
    }

    #[test]
    fn lwl_descends_one_byte_per_call_to_the_word_base() {
        let lwl_opcode = 0x22 << 26;
        let mut hits = Vec::new();
        check_breakpoints(lwl_opcode, 0x1001, 0, |w, a, width| hits.push((w, a, width)));
        assert_eq!(
            hits,
            vec![
                (false, 0x1001, AccessWidth::Byte),
                (false, 0x1000, AccessWidth::Byte),
            ]
        );
    }

    #[test]
    fn lwr_ascends_one_byte_per_call_to_the_word_top() {
        let lwr_opcode = 0x26 << 26;
        let mut hits = Vec::new();
        check_breakpoints(lwr_opcode, 0x1001, 0, |w, a, width| hits.push((w, a, width)));
        assert_eq!(
            hits,
            vec![
                (false, 0x1001, AccessWidth::Byte),
                (false, 0x1002, AccessWidth::Byte),
                (false, 0x1003, AccessWidth::Byte),
            ]
        );
    }

    #[test]
    fn peek_check_icache_reports_none_on_miss() {
        let cache = ICache::new();
        assert_eq!(peek_check_icache(&cache, 0x8000_0000), None);
    }
}
