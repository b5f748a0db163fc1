//! Savestate encode/decode for [`R3000`](super::R3000).
//!
//! The CPU struct already derives `bincode::Encode`/`Decode` field-by-field; this
//! module just wraps that with the fixed-width, little-endian configuration every
//! savestate blob in a host frontend needs to agree on, plus the `CoreError`
//! translation for corrupt/truncated blobs.

use bincode::config::{self, Configuration};

use crate::error::{CoreError, CoreResult};
use crate::gte::GteInterface;

use super::R3000;

fn savestate_config() -> Configuration {
    config::standard()
}

impl<G: GteInterface + bincode::Encode> R3000<G> {
    pub fn save_state(&self) -> Vec<u8> {
        bincode::encode_to_vec(self, savestate_config())
            .expect("encoding to an in-memory Vec<u8> cannot fail")
    }
}

impl<G: GteInterface + bincode::Decode<()>> R3000<G> {
    /// Restores CPU state from a blob produced by [`R3000::save_state`]. Trailing
    /// bytes in `bytes` are not an error -- the GTE implementation's own encoding may
    /// be embedded in the same outer blob by a host frontend that serializes the
    /// whole machine at once.
    pub fn load_state(bytes: &[u8]) -> CoreResult<Self> {
        let (state, _consumed) = bincode::decode_from_slice(bytes, savestate_config())
            .map_err(|err| CoreError::SavestateDecode(err.to_string()))?;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gte::NullGte;

    #[test]
    fn round_trips_through_encode_decode() {
        let mut cpu: R3000<NullGte> = R3000::new();
        cpu.set_biu(0x800);

        let blob = cpu.save_state();
        let restored = R3000::<NullGte>::load_state(&blob).unwrap();

        assert_eq!(restored.pc(), cpu.pc());
        assert_eq!(restored.biu(), cpu.biu());
    }

    #[test]
    fn rejects_truncated_blob() {
        let cpu: R3000<NullGte> = R3000::new();
        let mut blob = cpu.save_state();
        blob.truncate(blob.len() / 2);

        assert!(R3000::<NullGte>::load_state(&blob).is_err());
    }
}
