//! YM2413 to YM2608
//!
//! OPLL channels 1-6 become OPNA FM channels playing the 2-operator patch as
//! a 4-operator voice; the OPLL rhythm section drives the OPNA rhythm
//! sound source. OPLL level key scaling is emulated in the total levels.

use super::{destination, ChipWriter};
use crate::chips::{ChipDescriptor, ChipKind};
use crate::converter::buffer::RegisterShadow;
use crate::converter::voice::convert::opll_to_opn;
use crate::converter::voice::opn::SLOT_REGISTER_OFFSET;
use crate::converter::voice::{OpllVoice, OpnVoice};
use crate::converter::{Converter, Diagnostics};
use crate::vgm::{Command, WriteRegister};

/// Attenuation added by level key scaling at block 7, by F-number top bits
const KSL_TABLE: [u8; 16] = [0, 24, 32, 37, 40, 43, 45, 47, 48, 50, 51, 52, 53, 54, 55, 56];

pub fn clock_ratio(_from: ChipKind, _to: ChipKind) -> f64 {
    2.0
}

#[derive(Debug, Clone, Copy)]
struct Patch {
    opll: OpllVoice,
    opn: OpnVoice,
}

impl Patch {
    fn new(opll: OpllVoice) -> Self {
        Self {
            opn: opll_to_opn(&opll),
            opll,
        }
    }
}

pub struct Ym2413ToYm2608Converter {
    from: ChipDescriptor,
    to: ChipDescriptor,
    out: ChipWriter,
    regs: RegisterShadow,
    user: Patch,
    patches: [Patch; 6],
}

impl Ym2413ToYm2608Converter {
    pub fn new(from: ChipDescriptor) -> Self {
        let to = destination(&from, ChipKind::Ym2608, clock_ratio(from.kind, ChipKind::Ym2608));
        let user = Patch::new(OpllVoice::rom(0));
        Self {
            from,
            to,
            out: ChipWriter::new(&to),
            regs: RegisterShadow::new(1),
            user,
            patches: [user; 6],
        }
    }

    /// OPNA port and channel of OPLL channel `ch` (0-5)
    fn locate(ch: u8) -> (u8, u8) {
        (ch / 3, ch % 3)
    }

    fn blk_fnum(&self, ch: u8) -> u16 {
        ((self.regs.value(0, 0x20 + ch) as u16 & 0x0F) << 8) | self.regs.value(0, 0x10 + ch) as u16
    }

    fn set_slot_volume(&mut self, ch: u8, blk_fnum: u16, volume: u8) {
        let (port, nch) = Self::locate(ch);
        let patch = self.patches[ch as usize];
        let fnum_h = ((blk_fnum >> 5) & 15) as usize;
        let oct = ((blk_fnum >> 9) & 7) as i32;
        let kll = (KSL_TABLE[fnum_h] as i32 - 8 * (7 - oct)).max(0) as u32;
        let tll = |vl: u32, tl: u8, kl: u8| {
            let ksl = if kl > 0 { kll >> (3 - kl) } else { 0 };
            (vl + tl as u32 + ksl).min(127) as u8
        };
        for (i, slot) in patch.opn.slots.iter().enumerate() {
            let (vl, kl) = match i {
                0 => (0, patch.opll.slots[0].kl),
                3 => ((volume as u32) << 2, patch.opll.slots[1].kl),
                _ => (0, 0),
            };
            let addr = 0x40 + SLOT_REGISTER_OFFSET[i] + nch;
            self.out.write_port(port, addr, tll(vl, slot.tl, kl), true);
        }
    }

    fn set_inst_volume(&mut self, ch: u8, iv: u8) {
        let (port, nch) = Self::locate(ch);
        let inst = (iv >> 4) as usize;
        let patch = if inst == 0 {
            self.user
        } else {
            Patch::new(OpllVoice::rom(inst))
        };
        self.patches[ch as usize] = patch;

        let voice = &patch.opn;
        for (addr, data) in voice.registers() {
            // levels are written with key scaling applied
            if (0x40..0x50).contains(&addr) {
                continue;
            }
            self.out.write_port(port, addr + nch, data, true);
        }
        self.out.write_port(port, 0xB4 + nch, 0xC0 | (voice.ams << 4) | voice.pms, true);
        self.set_slot_volume(ch, self.blk_fnum(ch), iv & 0x0F);
    }

    fn write_fnum(&mut self, ch: u8, blk_fnum: u16) {
        let (port, nch) = Self::locate(ch);
        self.out.write_port(port, 0xA4 + nch, (blk_fnum >> 6) as u8, false);
        self.out.write_port(port, 0xA0 + nch, ((blk_fnum << 2) & 0xFF) as u8, false);
    }

    fn convert_write(&mut self, w: &WriteRegister) {
        let (a, d) = (w.addr, w.data);
        let prev = self.regs.value(0, a);
        self.regs.set(0, a, d);
        match a {
            0x00..=0x07 => {
                let mut image = [0u8; 8];
                for (i, b) in image.iter_mut().enumerate() {
                    *b = self.regs.value(0, i as u8);
                }
                self.user = Patch::new(OpllVoice::from_bytes(&image));
                for ch in 0..6 {
                    let iv = self.regs.value(0, 0x30 + ch);
                    if iv >> 4 == 0 {
                        self.set_inst_volume(ch, iv);
                    }
                }
            }
            0x0E => {
                if d & 0x20 != 0 {
                    let rising = !prev & d;
                    let hh = rising & 1;
                    let top = (rising >> 1) & 1;
                    let tom = (rising >> 2) & 1;
                    let sd = (rising >> 3) & 1;
                    let bd = (rising >> 4) & 1;
                    self.out.force(0x10, (tom << 4) | (hh << 3) | (top << 2) | (sd << 1) | bd);
                } else {
                    self.out.force(0x10, 0xFF);
                }
            }
            0x10..=0x15 => {
                let ch = a - 0x10;
                let blk_fnum = self.blk_fnum(ch);
                self.write_fnum(ch, blk_fnum);
                self.set_slot_volume(ch, blk_fnum, self.regs.value(0, 0x30 + ch) & 0x0F);
            }
            0x20..=0x25 => {
                let ch = a - 0x20;
                let blk_fnum = self.blk_fnum(ch);
                self.write_fnum(ch, blk_fnum);
                self.set_slot_volume(ch, blk_fnum, self.regs.value(0, 0x30 + ch) & 0x0F);
                let key = (d >> 4) & 1;
                if key != (prev >> 4) & 1 {
                    let (port, nch) = Self::locate(ch);
                    self.out.force(0x28, (if key != 0 { 0xF0 } else { 0 }) | (port * 4 + nch));
                }
            }
            0x30..=0x35 => self.set_inst_volume(a - 0x30, d),
            0x36 => {
                let bd = 15 - (d & 0x0F);
                self.out.write(0x18, 0xC0 | (bd << 1));
            }
            0x37 => {
                let sd = 15 - (d & 0x0F);
                let hh = 15 - (d >> 4);
                self.out.write(0x19, 0xC0 | (sd << 1));
                self.out.write(0x1B, 0xC0 | hh);
            }
            0x38 => {
                let top = 15 - (d & 0x0F);
                let tom = 15 - (d >> 4);
                self.out.write(0x1A, 0xC0 | (top << 1));
                self.out.write(0x1C, 0xC0 | (tom as f64 * 1.5).round() as u8);
            }
            _ => {}
        }
    }
}

impl Converter for Ym2413ToYm2608Converter {
    fn source(&self) -> &ChipDescriptor {
        &self.from
    }

    fn destination(&self) -> &ChipDescriptor {
        &self.to
    }

    fn initial_commands(&mut self) -> Vec<Command> {
        // LFO on at 6.02 Hz, FM channels 4-6 enabled, rhythm total level
        self.out.force(0x22, 0x0B);
        self.out.force(0x29, 0x80);
        self.out.force(0x11, 0x38);
        for addr in 0x18..=0x1D {
            self.out.force(addr, 0xDF);
        }
        self.out.commit()
    }

    fn convert(&mut self, cmd: &Command, _diag: &mut dyn Diagnostics) -> Vec<Command> {
        match cmd.write_for(ChipKind::Ym2413, self.from.index) {
            Some(w) => {
                self.convert_write(w);
                self.out.commit()
            }
            None => vec![cmd.clone()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::chip::testing::{last, writes};

    fn opll(addr: u8, data: u8) -> Command {
        Command::write(ChipKind::Ym2413, 0, 0, addr, data)
    }

    fn converter() -> Ym2413ToYm2608Converter {
        let from = ChipDescriptor::new(ChipKind::Ym2413, 3579545.0);
        let mut conv = Ym2413ToYm2608Converter::new(from);
        conv.initial_commands();
        conv
    }

    #[test]
    fn test_initial_commands() {
        let from = ChipDescriptor::new(ChipKind::Ym2413, 3579545.0);
        let mut conv = Ym2413ToYm2608Converter::new(from);
        assert_eq!(conv.destination().clock, 7159090.0);
        let init = conv.initial_commands();
        assert_eq!(init.len(), 9);
        assert_eq!(init[0], Command::write(ChipKind::Ym2608, 0, 0, 0x22, 0x0B));
    }

    #[test]
    fn test_frequency_and_key() {
        let mut conv = converter();
        let out = writes(&mut conv, &[opll(0x10, 0x20), opll(0x20, 0x18)]);
        assert_eq!(last(&out, 0, 0xA4), Some(0x20));
        assert_eq!(last(&out, 0, 0xA0), Some(0x80));
        assert_eq!(out.last(), Some(&(0, 0x28, 0xF0)));

        // sixth channel lives on the second port
        let out = writes(&mut conv, &[opll(0x25, 0x10)]);
        assert!(out.contains(&(1, 0xA6, 0x00)));
        assert_eq!(out.last(), Some(&(0, 0x28, 0xF6)));
    }

    #[test]
    fn test_instrument_volume() {
        let mut conv = converter();
        let out = writes(&mut conv, &[opll(0x30, 0x1F)]);
        let violin = opll_to_opn(&OpllVoice::rom(1));
        assert_eq!(last(&out, 0, 0x4C), Some(60 + violin.slots[3].tl));
        assert_eq!(last(&out, 0, 0xB0), Some((violin.fb << 3) | violin.con));
    }

    #[test]
    fn test_rhythm_key_and_levels() {
        let mut conv = converter();
        writes(&mut conv, &[opll(0x0E, 0x20)]);
        assert_eq!(writes(&mut conv, &[opll(0x0E, 0x31)]), vec![(0, 0x10, 0x09)]);
        assert_eq!(writes(&mut conv, &[opll(0x0E, 0x00)]), vec![(0, 0x10, 0xFF)]);
        assert_eq!(writes(&mut conv, &[opll(0x36, 0x03)]), vec![(0, 0x18, 0xD8)]);
        assert_eq!(
            writes(&mut conv, &[opll(0x38, 0x20)]),
            vec![(0, 0x1A, 0xDE), (0, 0x1C, 0xD4)]
        );
    }
}
