//! FM voice models, conversions between them and ROM voice matching

pub mod convert;
pub mod estimate;
pub mod opl;
pub mod opll;
pub mod opn;
pub mod table;

pub use estimate::estimate_opll_voice;
pub use opl::{OplSlot, OplVoice};
pub use opll::{OpllSlot, OpllVoice, OPLL_ROM};
pub use opn::{OpnSlot, OpnVoice};
pub use table::{VoiceMapping, VoiceTable};

use std::fmt::Write;

/// Canonical hash of raw voice-defining register bytes: their lowercase hex
pub fn voice_hash(raw: &[u8]) -> String {
    let mut hash = String::with_capacity(raw.len() * 2);
    for b in raw {
        let _ = write!(hash, "{:02x}", b);
    }
    hash
}
