//! 4-operator OPN voices

use crate::converter::buffer::RegisterShadow;

/// One OPN operator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpnSlot {
    pub dt: u8,
    pub ml: u8,
    pub tl: u8,
    pub ks: u8,
    pub ar: u8,
    pub am: u8,
    pub dr: u8,
    pub sr: u8,
    pub sl: u8,
    pub rr: u8,
    pub ssg: u8,
}

/// An OPN voice with slots in operator order S1, S2, S3, S4
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpnVoice {
    pub fb: u8,
    pub con: u8,
    pub ams: u8,
    pub pms: u8,
    pub slots: [OpnSlot; 4],
}

/// Register offset (within a 0x10 group) of operators S1..S4
pub const SLOT_REGISTER_OFFSET: [u8; 4] = [0x00, 0x08, 0x04, 0x0C];

/// Length of a raw voice dump
pub const RAW_VOICE_LEN: usize = 30;

/// Voice-defining registers of one channel.
///
/// Bytes 0-27 are the operator registers 0x30-0x9C in register order, then
/// 0xB0 (feedback/algorithm) and 0xB4 (AMS/PMS, panning masked off).
pub fn raw_voice(regs: &RegisterShadow, port: u8, nch: u8) -> [u8; RAW_VOICE_LEN] {
    let mut raw = [0u8; RAW_VOICE_LEN];
    for (i, addr) in (0x30u8..0xA0).step_by(4).enumerate() {
        raw[i] = regs.value(port, addr + nch);
    }
    raw[28] = regs.value(port, 0xB0 + nch) & 0x3F;
    raw[29] = regs.value(port, 0xB4 + nch) & 0x37;
    raw
}

impl OpnVoice {
    /// Decode a raw voice dump (see [`raw_voice`])
    pub fn from_raw(d: &[u8; RAW_VOICE_LEN]) -> Self {
        let mut slots = [OpnSlot::default(); 4];
        for (slot, offset) in slots.iter_mut().zip(SLOT_REGISTER_OFFSET) {
            let i = (offset >> 2) as usize;
            *slot = OpnSlot {
                dt: (d[i] >> 4) & 7,
                ml: d[i] & 15,
                tl: d[4 + i] & 127,
                ks: (d[8 + i] >> 6) & 3,
                ar: d[8 + i] & 31,
                am: (d[12 + i] >> 7) & 1,
                dr: d[12 + i] & 31,
                sr: d[16 + i] & 31,
                sl: (d[20 + i] >> 4) & 15,
                rr: d[20 + i] & 15,
                ssg: d[24 + i] & 15,
            };
        }
        Self {
            fb: (d[28] >> 3) & 7,
            con: d[28] & 7,
            ams: (d[29] >> 4) & 3,
            pms: d[29] & 7,
            slots,
        }
    }

    /// Register writes (address offset from channel base, data) for one channel
    pub fn registers(&self) -> Vec<(u8, u8)> {
        let mut out = Vec::with_capacity(RAW_VOICE_LEN);
        for (slot, offset) in self.slots.iter().zip(SLOT_REGISTER_OFFSET) {
            out.push((0x30 + offset, (slot.dt << 4) | slot.ml));
            out.push((0x40 + offset, slot.tl));
            out.push((0x50 + offset, (slot.ks << 6) | slot.ar));
            out.push((0x60 + offset, (slot.am << 7) | slot.dr));
            out.push((0x70 + offset, slot.sr));
            out.push((0x80 + offset, (slot.sl << 4) | slot.rr));
            out.push((0x90 + offset, slot.ssg));
        }
        out.push((0xB0, (self.fb << 3) | self.con));
        out
    }

    /// Indices (operator order) of the operators feeding the output
    pub fn carriers(&self) -> &'static [usize] {
        match self.con & 7 {
            0..=3 => &[3],
            4 => &[1, 3],
            5 | 6 => &[1, 2, 3],
            _ => &[0, 1, 2, 3],
        }
    }
}
