//! 4 KiB / 4-word-line instruction cache model.
//!
//! Each of the 1024 cache lines holds one word plus a tag (`tv`) that doubles as a
//! validity flag: a line is valid only when `tv` equals the PC it was fetched for,
//! with bit 1 used as an explicit invalid marker during refill so partially-filled
//! lines read back as misses until their word is actually loaded.

use bincode::{Decode, Encode};

use crate::bus::FastMap;

const LINE_COUNT: usize = 1024;
const INVALID_BIT: u32 = 0x2;

#[derive(Debug, Clone, Copy, Encode, Decode)]
struct Line {
    tv: u32,
    data: u32,
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct ICache {
    lines: Box<[Line; LINE_COUNT]>,
}

impl ICache {
    pub fn new() -> Self {
        Self { lines: Box::new([Line { tv: 0, data: 0 }; LINE_COUNT]) }
    }

    /// `biu_enabled` is BIU bit 11 (I-cache enable); lines power up tagged invalid,
    /// with bit 0 of `tv` additionally set when the cache starts disabled so a cold
    /// fetch never accidentally tag-matches address 0.
    pub fn power(&mut self, biu_icache_enabled: bool) {
        let disabled_bit = if biu_icache_enabled { 0 } else { 1 };
        for line in self.lines.iter_mut() {
            *line = Line { tv: 0x2 | disabled_bit, data: 0 };
        }
    }

    fn index(pc: u32) -> usize {
        ((pc & 0xFFC) >> 2) as usize
    }

    pub fn hit(&self, pc: u32) -> bool {
        self.lines[Self::index(pc)].tv == pc
    }

    pub fn fetched_word(&self, pc: u32) -> u32 {
        self.lines[Self::index(pc)].data
    }

    /// Forces the 4-word-aligned line group covering `addr` invalid, as a write to the
    /// BIU tag-test register does.
    pub fn tag_test_invalidate(&mut self, addr: u32, biu_icache_enabled: bool) {
        let base = ((addr & 0xFF0) >> 2) as usize;
        let disabled_bit = if biu_icache_enabled { 0 } else { 1 };
        for i in 0..4 {
            self.lines[base + i].tv = INVALID_BIT | disabled_bit;
        }
    }

    /// Writes `value` directly into the cached word covering `addr`, as an IsC store
    /// does when the I-cache is enabled and not in invalidate-only mode.
    pub fn direct_write(&mut self, addr: u32, value: u32) {
        let shift = (addr & 0x3) * 8;
        self.lines[Self::index(addr)].data = value << shift;
    }

    /// Refills (or bypasses) the cache for a fetch at `pc`, returning the fetched
    /// instruction word and the number of cycles the fetch cost. Call only when
    /// [`ICache::hit`] is false. Bypasses (skipping the refill and leaving cache tags
    /// untouched) for KSEG1 addresses or whenever `icache_enabled` is false, so a
    /// disabled cache never serves stale data once re-enabled.
    pub fn refill_or_bypass(&mut self, pc: u32, fast_map: &FastMap<'_>, icache_enabled: bool) -> (u32, i32) {
        if pc >= 0xA000_0000 || !icache_enabled {
            let word = fast_map.fetch_word(pc);
            return (word, 4);
        }

        let line_base = ((pc & 0xFF0) >> 2) as usize;
        let word_base = pc & !0xF;
        for n in 0..4u32 {
            self.lines[line_base + n as usize].tv = word_base | (n * 4) | INVALID_BIT;
        }

        // The real BIU fills from the requested word through the end of the line
        // (a fallthrough switch in the reference core), not from the start of the
        // line: words before the requested one stay tagged invalid.
        let mut cycles = 3;
        let first_word = ((pc & 0xC) >> 2) as usize;
        for n in first_word..4 {
            cycles += 1;
            let word_addr = word_base + (n as u32) * 4;
            let word = fast_map.fetch_word(word_addr);
            self.lines[line_base + n].tv &= !INVALID_BIT;
            self.lines[line_base + n].data = word;
        }

        (self.fetched_word(pc), cycles)
    }
}

impl Default for ICache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapped_ram(words: &[u8]) -> FastMap<'_> {
        let mut map = FastMap::empty();
        map.set_region(0, 0, words).unwrap();
        map
    }

    #[test]
    fn cold_line_misses() {
        let cache = ICache::new();
        assert!(!cache.hit(0x8000_0000));
    }

    #[test]
    fn refill_fills_from_requested_word_to_end_of_line() {
        let ram = [
            0x01, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00, 0x04, 0x00,
            0x00, 0x00,
        ];
        let map = mapped_ram(&ram);
        let mut cache = ICache::new();
        let (word, cycles) = cache.refill_or_bypass(0x8, &map, true);
        assert_eq!(word, 3);
        assert_eq!(cycles, 3 + 2); // base 3 + one tick per word filled (index 2, 3)
        assert!(cache.hit(0x8));
        assert!(cache.hit(0xC));
        assert!(!cache.hit(0x0));
    }

    #[test]
    fn kseg1_bypasses_cache_entirely() {
        let ram = [0x78, 0x56, 0x34, 0x12];
        let map = mapped_ram(&ram);
        let mut cache = ICache::new();
        let (word, cycles) = cache.refill_or_bypass(0xA000_0000, &map, true);
        assert_eq!(word, 0x1234_5678);
        assert_eq!(cycles, 4);
        assert!(!cache.hit(0xA000_0000));
    }

    #[test]
    fn disabled_icache_bypasses_and_leaves_tags_untouched() {
        let ram = [0x78, 0x56, 0x34, 0x12];
        let map = mapped_ram(&ram);
        let mut cache = ICache::new();
        let (word, cycles) = cache.refill_or_bypass(0x8000_0000, &map, false);
        assert_eq!(word, 0x1234_5678);
        assert_eq!(cycles, 4);
        assert!(!cache.hit(0x8000_0000), "a bypassed fetch must never become a cache hit");
    }
}
