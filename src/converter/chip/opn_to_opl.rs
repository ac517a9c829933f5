//! YM2203 to the OPL family
//!
//! Each 4-operator FM channel is split into two 2-operator OPL channels
//! (FM 1-3 on OPL 0-5). The SSG tones play on OPL channels 6-8.

use super::{destination, psg_clock_divider, ChipWriter, PSG_VOLUME_TO_TL};
use crate::chips::{ChipDescriptor, ChipKind, SubModule};
use crate::converter::buffer::RegisterShadow;
use crate::converter::freq::{freq_to_block_fnum, opl_prescaler, psg_freq};
use crate::converter::voice::convert::opn_to_opl;
use crate::converter::voice::opn::raw_voice;
use crate::converter::voice::{OplSlot, OplVoice, OpnVoice};
use crate::converter::{Converter, Diagnostics};
use crate::vgm::{Command, WriteRegister};

pub fn clock_ratio(_from: ChipKind, to: ChipKind) -> f64 {
    match to {
        ChipKind::Ymf262 => 4.0,
        _ => 1.0,
    }
}

fn ssg_slot(ml: u8, tl: u8) -> OplSlot {
    OplSlot {
        eg: 1,
        ml,
        tl,
        ar: 15,
        rr: 15,
        ..Default::default()
    }
}

/// Voice approximating an SSG channel in the given mixer state
fn ssg_voice(tone: bool, noise: bool, tl: u8, np: u8) -> OplVoice {
    let slots = match (tone, noise) {
        (true, _) => [ssg_slot(2, 27), ssg_slot(1, tl)],
        (false, true) => [ssg_slot(np >> 1, np >> 4), ssg_slot(np >> 1, tl)],
        (false, false) => [ssg_slot(2, 27), ssg_slot(1, 63)],
    };
    OplVoice { fb: 7, con: 0, slots }
}

pub struct Ym2203ToOplConverter {
    from: ChipDescriptor,
    to: ChipDescriptor,
    out: ChipWriter,
    regs: RegisterShadow,
    key_on: [bool; 3],
}

impl Ym2203ToOplConverter {
    pub fn new(from: ChipDescriptor, to: ChipKind) -> Self {
        let to = destination(&from, to, clock_ratio(from.kind, to));
        Self {
            from,
            to,
            out: ChipWriter::new(&to),
            regs: RegisterShadow::new(1),
            key_on: [false; 3],
        }
    }

    fn set_voice(&mut self, opl_ch: u8, voice: &OplVoice) {
        for (addr, data) in voice.registers(opl_ch) {
            self.out.write(addr, data);
        }
    }

    fn update_voice(&mut self, ch: u8) {
        let voice = OpnVoice::from_raw(&raw_voice(&self.regs, 0, ch));
        let [a, b] = opn_to_opl(&voice, self.key_on[ch as usize]);
        self.set_voice(ch * 2, &a);
        self.set_voice(ch * 2 + 1, &b);
    }

    fn update_key_block_fnum(&mut self, ch: u8) {
        self.update_voice(ch);
        // 11-bit F-number to 10 bits; block lands on bits 10-12
        let blk_fnum = ((self.regs.value(0, 0xA4 + ch) as u16) << 8 | self.regs.value(0, 0xA0 + ch) as u16) >> 1;
        let dl = (blk_fnum & 0xFF) as u8;
        let key = if self.key_on[ch as usize] { 0x20 } else { 0 };
        let dh = ((blk_fnum >> 8) & 0x1F) as u8 | key;
        for opl_ch in [ch * 2, ch * 2 + 1] {
            self.out.write(0xA0 + opl_ch, dl);
            self.out.write(0xB0 + opl_ch, dh);
        }
    }

    fn update_ssg_voice(&mut self, ch: u8) {
        let mixer = self.regs.value(0, 7);
        let v = self.regs.value(0, 8 + ch);
        let vol = if v & 0x10 != 0 { 0 } else { v & 0x0F };
        let voice = ssg_voice(
            mixer & (1 << ch) == 0,
            mixer & (8 << ch) == 0,
            PSG_VOLUME_TO_TL[vol as usize],
            self.regs.value(0, 6) & 0x1F,
        );
        self.set_voice(6 + ch, &voice);
    }

    fn convert_ssg(&mut self, w: &WriteRegister) {
        self.regs.set(0, w.addr, w.data);
        match w.addr {
            0..=5 => {
                let ch = w.addr >> 1;
                let tp = ((self.regs.value(0, ch * 2 + 1) as u32 & 0x0F) << 8) | self.regs.value(0, ch * 2) as u32;
                let freq = psg_freq(tp, self.from.clock / psg_clock_divider(self.from.kind));
                let (blk, fnum) = freq_to_block_fnum(freq, self.to.clock, opl_prescaler(self.to.kind), 20, 1, 0x3FF);
                self.out.write(0xA6 + ch, (fnum & 0xFF) as u8);
                self.out.write(0xB6 + ch, 0x20 | (blk << 2) | (fnum >> 8) as u8);
            }
            6 | 7 => {
                for ch in 0..3 {
                    self.update_ssg_voice(ch);
                }
            }
            8..=10 => self.update_ssg_voice(w.addr - 8),
            _ => {}
        }
    }

    fn convert_fm(&mut self, w: &WriteRegister) {
        self.regs.set(0, w.addr, w.data);
        let ch = w.addr & 3;
        match w.addr {
            0x28 => {
                let ch = w.data & 3;
                if ch < 3 {
                    self.key_on[ch as usize] = w.data & 0xF0 != 0;
                    self.update_key_block_fnum(ch);
                }
            }
            0x30..=0x9F | 0xB0..=0xB3 if ch < 3 => self.update_voice(ch),
            0xA0..=0xA7 if ch < 3 => self.update_key_block_fnum(ch),
            _ => {}
        }
    }
}

impl Converter for Ym2203ToOplConverter {
    fn source(&self) -> &ChipDescriptor {
        &self.from
    }

    fn destination(&self) -> &ChipDescriptor {
        &self.to
    }

    fn initial_commands(&mut self) -> Vec<Command> {
        self.out.force(0x01, 0x20);
        self.out.force(0xBD, 0x00);
        self.out.commit()
    }

    fn convert(&mut self, cmd: &Command, _diag: &mut dyn Diagnostics) -> Vec<Command> {
        let Some(w) = cmd.write_for(ChipKind::Ym2203, self.from.index) else {
            return vec![cmd.clone()];
        };
        if w.addr < 0x10 {
            if !self.from.includes(SubModule::Ssg) {
                return vec![cmd.clone()];
            }
            self.convert_ssg(w);
        } else {
            if !self.from.includes(SubModule::Fm) {
                return vec![cmd.clone()];
            }
            self.convert_fm(w);
        }
        self.out.commit()
    }
}
