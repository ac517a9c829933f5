//! OPL (YM3812, YM3526, Y8950) to YM2413
//!
//! Melodic channels play the ROM program mapped from the channel's voice at
//! key-on; the carrier level becomes the channel volume. The rhythm section
//! maps onto the OPLL rhythm section with the drum levels taken from the
//! operators that produce them.

use std::collections::HashSet;

use super::{destination, ChipWriter};
use crate::chips::{ChipDescriptor, ChipKind};
use crate::converter::buffer::RegisterShadow;
use crate::converter::options::Options;
use crate::converter::voice::convert::opl_to_opll;
use crate::converter::voice::opl::modulator_offset;
use crate::converter::voice::{estimate_opll_voice, voice_hash, OplVoice, VoiceMapping, VoiceTable};
use crate::converter::{Converter, Diagnostics, VoiceReport};
use crate::vgm::{Command, WriteRegister};

pub use super::opn_to_opll::OPTIONS;

/// Program used for voices without a mapping
const DEFAULT_MAPPING: VoiceMapping = VoiceMapping {
    program: 3,
    volume_offset: 0,
    octave_offset: 0,
};

/// Rhythm operator levels as (OPL TL register, OPLL volume register, high nibble)
const RHYTHM_LEVELS: [(u8, u8, bool); 5] = [
    (0x53, 0x36, false), // bass drum carrier
    (0x51, 0x37, true),  // hi-hat
    (0x54, 0x37, false), // snare drum
    (0x52, 0x38, true),  // tom-tom
    (0x55, 0x38, false), // top cymbal
];

pub fn clock_ratio(_from: ChipKind, _to: ChipKind) -> f64 {
    1.0
}

#[derive(Debug, Clone)]
struct ChannelVoice {
    hash: String,
    mapping: VoiceMapping,
}

pub struct OplToOpllConverter {
    from: ChipDescriptor,
    to: ChipDescriptor,
    out: ChipWriter,
    regs: RegisterShadow,
    table: VoiceTable,
    voices: [Option<ChannelVoice>; 9],
    seen: HashSet<String>,
}

impl OplToOpllConverter {
    pub fn new(from: ChipDescriptor, opts: &Options, voices: &VoiceTable) -> Self {
        let to = destination(&from, ChipKind::Ym2413, clock_ratio(from.kind, ChipKind::Ym2413));
        let mut table = voices.clone();
        table.auto_estimate = opts.bool("autoVoiceMap", table.auto_estimate);
        Self {
            from,
            to,
            out: ChipWriter::new(&to),
            regs: RegisterShadow::new(1),
            table,
            voices: std::array::from_fn(|_| None),
            seen: HashSet::new(),
        }
    }

    fn rhythm(&self) -> bool {
        self.regs.value(0, 0xBD) & 0x20 != 0
    }

    /// Voice image of channel `ch`; the carrier level is volume, not timbre
    fn raw_voice(&self, ch: u8) -> [u8; 11] {
        let m = modulator_offset(ch);
        let c = m + 3;
        let r = |addr: u8| self.regs.value(0, addr);
        [
            r(0x20 + m),
            r(0x20 + c),
            r(0x40 + m),
            r(0x40 + c) & 0xC0,
            r(0x60 + m),
            r(0x60 + c),
            r(0x80 + m),
            r(0x80 + c),
            r(0xE0 + m),
            r(0xE0 + c),
            r(0xC0 + ch),
        ]
    }

    fn mapping(&self, ch: u8) -> VoiceMapping {
        self.voices[ch as usize].as_ref().map_or(DEFAULT_MAPPING, |v| v.mapping)
    }

    fn identify_voice(&mut self, ch: u8, diag: &mut dyn Diagnostics) {
        let raw = self.raw_voice(ch);
        let hash = voice_hash(&raw);
        if self.voices[ch as usize].as_ref().is_some_and(|v| v.hash == hash) {
            return;
        }
        let mapping = match self.table.get(&hash) {
            Some(mapping) => mapping,
            None => {
                let estimated = if self.table.auto_estimate {
                    estimate_opll_voice(&OplVoice::from_bytes(&raw))
                } else {
                    None
                };
                let mapping = estimated.unwrap_or(DEFAULT_MAPPING);
                if self.seen.insert(hash.clone()) {
                    diag.voice_estimated(&VoiceReport {
                        chip: self.from.kind,
                        channel: ch,
                        hash: hash.clone(),
                        mapping,
                    });
                }
                mapping
            }
        };
        if !(1..16).contains(&mapping.program) {
            let patch = opl_to_opll(&OplVoice::from_bytes(&raw)).to_bytes();
            for (i, &b) in patch.iter().enumerate() {
                self.out.write(i as u8, b);
            }
        }
        self.voices[ch as usize] = Some(ChannelVoice { hash, mapping });
    }

    fn update_volume(&mut self, ch: u8, diag: &mut dyn Diagnostics) {
        if self.voices[ch as usize].is_none() {
            self.identify_voice(ch, diag);
        }
        let mapping = self.mapping(ch);
        let tl = self.regs.value(0, 0x43 + modulator_offset(ch)) & 0x3F;
        let vol = ((tl >> 2) as i32 + mapping.volume_offset as i32).clamp(0, 15) as u8;
        let program = if (1..16).contains(&mapping.program) {
            mapping.program
        } else {
            0
        };
        self.out.write(0x30 + ch, (program << 4) | vol);
    }

    fn update_rhythm_levels(&mut self) {
        let mut levels = [0u8; 3];
        for (tl_addr, vol_addr, high) in RHYTHM_LEVELS {
            let v = (self.regs.value(0, tl_addr) & 0x3F) >> 2;
            levels[(vol_addr - 0x36) as usize] |= if high { v << 4 } else { v };
        }
        for (i, v) in levels.into_iter().enumerate() {
            self.out.write(0x36 + i as u8, v);
        }
    }

    fn setup_rhythm(&mut self) {
        for (addr, data) in [(0x16, 0x20), (0x17, 0x50), (0x18, 0xC0), (0x26, 0x05), (0x27, 0x05), (0x28, 0x01)] {
            self.out.write(addr, data);
        }
        self.update_rhythm_levels();
    }

    fn write_key_block_fnum(&mut self, ch: u8) {
        // 10-bit F-number to 9 bits; key lands on bit 12, block on bits 9-11
        let blk_fnum = ((self.regs.value(0, 0xB0 + ch) as u16) << 8 | self.regs.value(0, 0xA0 + ch) as u16) >> 1;
        let rhythm_channel = self.rhythm() && ch >= 6;
        let key = u8::from(blk_fnum & 0x1000 != 0 && !rhythm_channel);
        let blk = ((blk_fnum >> 9) & 7) as i32;
        let blk = if rhythm_channel {
            blk
        } else {
            blk + self.mapping(ch).octave_offset as i32
        };
        let fnum = blk_fnum & 0x1FF;
        self.out.write(0x10 + ch, (fnum & 0xFF) as u8);
        self.out.write(0x20 + ch, (key << 4) | ((blk.clamp(0, 7) as u8) << 1) | (fnum >> 8) as u8);
    }

    fn convert_write(&mut self, w: &WriteRegister, diag: &mut dyn Diagnostics) {
        let (a, d) = (w.addr, w.data);
        let prev = self.regs.value(0, a);
        self.regs.set(0, a, d);
        match a {
            0xBD => {
                if d & 0x20 != 0 {
                    self.setup_rhythm();
                }
                self.out.write(0x0E, d & 0x3F);
            }
            0x40..=0x55 => {
                let o = a - 0x40;
                if o & 7 >= 6 {
                    return;
                }
                let ch = (o >> 3) * 3 + (o & 7) % 3;
                if self.rhythm() && ch >= 6 {
                    self.update_rhythm_levels();
                } else if o & 7 >= 3 {
                    self.update_volume(ch, diag);
                }
            }
            0xA0..=0xA8 => self.write_key_block_fnum(a - 0xA0),
            0xB0..=0xB8 => {
                let ch = a - 0xB0;
                let rhythm_channel = self.rhythm() && ch >= 6;
                if d & 0x20 != 0 && prev & 0x20 == 0 && !rhythm_channel {
                    self.identify_voice(ch, diag);
                    self.update_volume(ch, diag);
                }
                self.write_key_block_fnum(ch);
            }
            0xC0..=0xC8 => {
                let ch = a - 0xC0;
                if !(self.rhythm() && ch >= 6) {
                    self.update_volume(ch, diag);
                }
            }
            _ => {}
        }
    }
}

impl Converter for OplToOpllConverter {
    fn source(&self) -> &ChipDescriptor {
        &self.from
    }

    fn destination(&self) -> &ChipDescriptor {
        &self.to
    }

    fn convert(&mut self, cmd: &Command, diag: &mut dyn Diagnostics) -> Vec<Command> {
        match cmd.write_for(self.from.kind, self.from.index) {
            Some(w) => {
                self.convert_write(w, diag);
                self.out.commit()
            }
            None => vec![cmd.clone()],
        }
    }
}
