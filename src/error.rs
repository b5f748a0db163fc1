//! Host-facing configuration errors.
//!
//! Faults that occur during guest code execution (address errors, overflow, illegal
//! opcodes, ...) are never reported this way -- they become MIPS exceptions. This type
//! only covers programming mistakes made by the host embedding the core.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("FastMap region base {base:08X} is not aligned to the page size ({page_size:#X})")]
    UnalignedFastMapRegion { base: u32, page_size: u32 },
    #[error("savestate blob failed to decode: {0}")]
    SavestateDecode(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
