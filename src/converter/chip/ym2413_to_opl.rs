//! YM2413 to the OPL family
//!
//! OPLL patches are loaded into the matching OPL channels. In rhythm mode
//! channels 7-9 take the rhythm patches with the per-drum levels, and the
//! OPLL rhythm register maps bit for bit onto 0xBD.

use super::{destination, ChipWriter};
use crate::chips::{ChipDescriptor, ChipKind};
use crate::converter::buffer::RegisterShadow;
use crate::converter::voice::opll::{RHYTHM_BD, RHYTHM_HH_SD, RHYTHM_TOM_CYM};
use crate::converter::voice::{OplSlot, OplVoice, OpllSlot, OpllVoice};
use crate::converter::{Converter, Diagnostics};
use crate::vgm::{Command, WriteRegister};

pub fn clock_ratio(_from: ChipKind, to: ChipKind) -> f64 {
    match to {
        ChipKind::Ymf262 => 4.0,
        _ => 1.0,
    }
}

fn opl_slot(s: &OpllSlot, tl: u8) -> OplSlot {
    OplSlot {
        am: s.am,
        pm: s.pm,
        eg: s.eg,
        kr: s.kr,
        ml: s.ml,
        kl: s.kl,
        tl: tl & 0x3F,
        ar: s.ar,
        dr: s.dr,
        sl: s.sl,
        rr: s.rr,
        ws: u8::from(s.wf != 0),
    }
}

pub struct Ym2413ToOplConverter {
    from: ChipDescriptor,
    to: ChipDescriptor,
    out: ChipWriter,
    regs: RegisterShadow,
    rhythm: bool,
}

impl Ym2413ToOplConverter {
    pub fn new(from: ChipDescriptor, to: ChipKind) -> Self {
        let to = destination(&from, to, clock_ratio(from.kind, to));
        Self {
            from,
            to,
            out: ChipWriter::new(&to),
            regs: RegisterShadow::new(1),
            rhythm: false,
        }
    }

    /// Load `voice` on channel `ch`; levels default to the patch's own
    fn set_voice(&mut self, ch: u8, voice: &OpllVoice, mod_tl: Option<u8>, car_tl: u8, con: u8) {
        let [m, c] = &voice.slots;
        let opl = OplVoice {
            fb: voice.fb,
            con,
            slots: [opl_slot(m, mod_tl.unwrap_or(m.tl)), opl_slot(c, car_tl)],
        };
        let stereo = if self.to.kind == ChipKind::Ymf262 { 0xF0 } else { 0 };
        for (addr, data) in opl.registers(ch) {
            let data = if addr == 0xC0 + ch { stereo | data } else { data };
            self.out.write(addr, data);
        }
    }

    fn update_instrument(&mut self, ch: u8) {
        if self.rhythm && ch >= 6 {
            let level = |v: u8| (v & 0x0F) << 1;
            match ch {
                6 => {
                    let r = self.regs.value(0, 0x36);
                    self.set_voice(6, &OpllVoice::rom(RHYTHM_BD), None, level(r), 0);
                }
                7 => {
                    let r = self.regs.value(0, 0x37);
                    self.set_voice(7, &OpllVoice::rom(RHYTHM_HH_SD), Some(level(r >> 4)), level(r), 1);
                }
                _ => {
                    let r = self.regs.value(0, 0x38);
                    self.set_voice(8, &OpllVoice::rom(RHYTHM_TOM_CYM), Some(level(r >> 4)), level(r), 1);
                }
            }
            return;
        }
        let iv = self.regs.value(0, 0x30 + ch);
        let voice = match iv >> 4 {
            0 => self.user_voice(),
            inst => OpllVoice::rom(inst as usize),
        };
        self.set_voice(ch, &voice, None, (iv & 0x0F) << 2, 0);
    }

    fn user_voice(&self) -> OpllVoice {
        let mut image = [0u8; 8];
        for (i, b) in image.iter_mut().enumerate() {
            *b = self.regs.value(0, i as u8);
        }
        OpllVoice::from_bytes(&image)
    }

    fn update_freq(&mut self, ch: u8) {
        let fl = self.regs.value(0, 0x10 + ch);
        let fh = self.regs.value(0, 0x20 + ch);
        // 9-bit F-number becomes 10 bits; key and block shift up one
        self.out.write(0xB0 + ch, ((fh & 0x1F) << 1) | (fl >> 7));
        self.out.write(0xA0 + ch, (fl & 0x7F) << 1);
    }

    fn convert_write(&mut self, w: &WriteRegister) {
        let (a, d) = (w.addr, w.data);
        self.regs.set(0, a, d);
        match a {
            0x00..=0x07 => {
                for ch in 0..9 {
                    let melodic = !(self.rhythm && ch >= 6);
                    if melodic && self.regs.value(0, 0x30 + ch) >> 4 == 0 {
                        self.update_instrument(ch);
                    }
                }
            }
            0x0E => {
                let rhythm = d & 0x20 != 0;
                if rhythm != self.rhythm {
                    self.rhythm = rhythm;
                    for ch in 6..9 {
                        self.update_instrument(ch);
                    }
                }
                self.out.write(0xBD, 0xC0 | (d & 0x3F));
            }
            0x10..=0x18 => self.update_freq(a - 0x10),
            0x20..=0x28 => self.update_freq(a - 0x20),
            0x30..=0x38 => self.update_instrument(a - 0x30),
            _ => {}
        }
    }
}

impl Converter for Ym2413ToOplConverter {
    fn source(&self) -> &ChipDescriptor {
        &self.from
    }

    fn destination(&self) -> &ChipDescriptor {
        &self.to
    }

    fn initial_commands(&mut self) -> Vec<Command> {
        // waveform select enable
        self.out.force(0x01, 0x20);
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
    use crate::converter::chip::testing::{last, writes, writes0};

    fn opll(addr: u8, data: u8) -> Command {
        Command::write(ChipKind::Ym2413, 0, 0, addr, data)
    }

    fn converter(to: ChipKind) -> Ym2413ToOplConverter {
        Ym2413ToOplConverter::new(ChipDescriptor::new(ChipKind::Ym2413, 3579545.0), to)
    }

    #[test]
    fn test_frequency_widens_fnum() {
        let mut conv = converter(ChipKind::Ym3812);
        assert_eq!(writes0(&mut conv, &[opll(0x10, 0xAC)]), vec![(0xB0, 0x01), (0xA0, 0x58)]);
        assert_eq!(writes0(&mut conv, &[opll(0x20, 0x19)]), vec![(0xB0, 0x33)]);
    }

    #[test]
    fn test_instrument_and_volume() {
        let mut conv = converter(ChipKind::Ymf262);
        assert_eq!(conv.destination().clock, 14318180.0);
        let out = writes(&mut conv, &[opll(0x30, 0x35)]);
        // piano modulator keeps its KSL and level, carrier follows volume
        assert_eq!(last(&out, 0, 0x40), Some(0x99));
        assert_eq!(last(&out, 0, 0x43), Some(20));
        assert_eq!(last(&out, 0, 0xC0), Some(0xF0));
    }

    #[test]
    fn test_rhythm_mode_loads_drum_patches() {
        let mut conv = converter(ChipKind::Ym3812);
        writes(&mut conv, &[opll(0x37, 0x53)]);
        let out = writes(&mut conv, &[opll(0x0E, 0x21)]);
        // hi-hat level on the modulator, snare on the carrier
        assert_eq!(last(&out, 0, 0x51), Some(10));
        assert_eq!(last(&out, 0, 0x54), Some(6));
        assert_eq!(last(&out, 0, 0xC7), Some(1));
        assert_eq!(out.last(), Some(&(0, 0xBD, 0xE1)));
    }

    #[test]
    fn test_user_voice_edit_reloads_channels() {
        let mut conv = converter(ChipKind::Ym3812);
        writes(&mut conv, &[opll(0x30, 0x00)]);
        let out = writes(&mut conv, &[opll(0x00, 0x21)]);
        assert_eq!(last(&out, 0, 0x20), Some(0x21));
    }
}
