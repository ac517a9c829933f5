//! AY-3-8910 to the OPL family
//!
//! Tone A-C play on OPL channels 0-2 and their noise on channels 3-5, all
//! keyed on permanently and gated by carrier level. On the YMF262 the
//! voices sit on the second register set and use the OPL3 square wave.

use super::{destination, psg_clock_divider, ChipWriter, PSG_VOLUME_TO_TL};
use crate::chips::{ChipDescriptor, ChipKind};
use crate::converter::buffer::RegisterShadow;
use crate::converter::freq::{freq_to_block_fnum, opl_prescaler, psg_freq};
use crate::converter::voice::opl::modulator_offset;
use crate::converter::{Converter, Diagnostics};
use crate::vgm::{Command, WriteRegister};

pub fn clock_ratio(_from: ChipKind, to: ChipKind) -> f64 {
    match to {
        ChipKind::Ymf262 => 8.0,
        _ => 2.0,
    }
}

pub struct Ay8910ToOplConverter {
    from: ChipDescriptor,
    to: ChipDescriptor,
    out: ChipWriter,
    regs: RegisterShadow,
    opl3: bool,
    /// Register set carrying the voices
    port: u8,
}

impl Ay8910ToOplConverter {
    pub fn new(from: ChipDescriptor, to: ChipKind) -> Self {
        let to = destination(&from, to, clock_ratio(from.kind, to));
        let opl3 = to.kind == ChipKind::Ymf262;
        Self {
            from,
            to,
            out: ChipWriter::new(&to),
            regs: RegisterShadow::new(1),
            opl3,
            port: u8::from(opl3),
        }
    }

    fn put(&mut self, addr: u8, data: u8) {
        self.out.write_port(self.port, addr, data, true);
    }

    fn init(&mut self, addr: u8, data: u8) {
        self.out.write_port(self.port, addr, data, false);
    }

    fn update_freq(&mut self, ch: u8) {
        let tp = ((self.regs.value(0, ch * 2 + 1) as u32 & 0x0F) << 8) | self.regs.value(0, ch * 2) as u32;
        let freq = psg_freq(tp, self.from.clock / psg_clock_divider(self.from.kind));
        let (blk, fnum) = freq_to_block_fnum(freq, self.to.clock, opl_prescaler(self.to.kind), 20, 1, 0x3FF);
        self.put(0xB0 + ch, 0x20 | (blk << 2) | (fnum >> 8) as u8);
        self.put(0xA0 + ch, (fnum & 0xFF) as u8);
    }

    fn update_noise_freq(&mut self) {
        let np = (self.regs.value(0, 6) & 0x1F) as u16;
        let fnum = 1024 / (np + 1) - 1;
        for ch in 3..6 {
            self.put(0xB0 + ch, 0x20 | (7 << 2) | (fnum >> 8) as u8);
            self.put(0xA0 + ch, (fnum & 0xFF) as u8);
        }
    }

    fn update_level(&mut self, ch: u8) {
        let mixer = self.regs.value(0, 7);
        let tone = mixer & (1 << ch) == 0;
        let noise = mixer & (8 << ch) == 0;
        let v = self.regs.value(0, 8 + ch);
        let vol = if v & 0x10 != 0 { 0 } else { v & 0x0F };
        let tl = PSG_VOLUME_TO_TL[vol as usize];

        let tone_car = modulator_offset(ch) + 3;
        self.put(0x40 + tone_car, if tone { tl } else { 0x3F });
        let noise_car = modulator_offset(ch + 3) + 3;
        self.put(0x40 + noise_car, if noise { tl } else { 0x3F });
    }

    fn convert_write(&mut self, w: &WriteRegister) -> Vec<Command> {
        self.regs.set(0, w.addr, w.data);
        match w.addr {
            0..=5 => self.update_freq(w.addr >> 1),
            6 => self.update_noise_freq(),
            7 => {
                for ch in 0..3 {
                    self.update_level(ch);
                }
            }
            8..=10 => self.update_level(w.addr - 8),
            _ => {}
        }
        self.out.commit()
    }
}

impl Converter for Ay8910ToOplConverter {
    fn source(&self) -> &ChipDescriptor {
        &self.from
    }

    fn destination(&self) -> &ChipDescriptor {
        &self.to
    }

    fn initial_commands(&mut self) -> Vec<Command> {
        let opl3 = self.opl3;
        if opl3 {
            // waveform select, then OPL3 mode
            self.out.write_port(0, 0x01, 0x20, false);
            self.out.write_port(1, 0x05, 0x01, false);
        }
        for ch in 0..3 {
            let m = modulator_offset(ch);
            let c = m + 3;
            self.init(0x20 + m, 0x02);
            self.init(0x20 + c, if opl3 { 0x04 } else { 0x01 });
            self.init(0x40 + m, 0x1A);
            self.init(0x40 + c, 0x3F);
            self.init(0x60 + m, if opl3 { 0x00 } else { 0xF0 });
            self.init(0x60 + c, 0xF0);
            self.init(0x80 + m, 0x00);
            self.init(0x80 + c, 0x00);
            self.init(0xC0 + ch, if opl3 { 0xFE } else { 0x0E });
            self.init(0xE0 + c, if opl3 { 0x06 } else { 0x00 });
        }
        for ch in 3..6 {
            let m = modulator_offset(ch);
            let c = m + 3;
            self.init(0x20 + m, 0x0F);
            self.init(0x20 + c, 0x0F);
            self.init(0x40 + m, 0x04);
            self.init(0x40 + c, 0x3F);
            self.init(0x60 + m, 0xF0);
            self.init(0x60 + c, 0xF0);
            self.init(0x80 + m, 0x00);
            self.init(0x80 + c, 0x00);
            self.init(0xC0 + ch, if opl3 { 0xFE } else { 0x0E });
            self.init(0xE0 + c, 0x00);
        }
        self.out.commit()
    }

    fn convert(&mut self, cmd: &Command, _diag: &mut dyn Diagnostics) -> Vec<Command> {
        match cmd.write_for(ChipKind::Ay8910, self.from.index) {
            Some(w) => self.convert_write(w),
            None => vec![cmd.clone()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::chip::testing::writes;

    fn ay(addr: u8, data: u8) -> Command {
        Command::write(ChipKind::Ay8910, 0, 0, addr, data)
    }

    #[test]
    fn test_tone_frequency() {
        let from = ChipDescriptor::new(ChipKind::Ay8910, 1789772.5);
        let mut conv = Ay8910ToOplConverter::new(from, ChipKind::Ym3812);
        assert_eq!(conv.destination().clock, 3579545.0);
        conv.initial_commands();
        // period 254: about 440 Hz, block 4 F-number 580
        let out = writes(&mut conv, &[ay(0, 0xFE), ay(1, 0x00)]);
        assert!(out.contains(&(0, 0xB0, 0x32)), "{:x?}", out);
        assert!(out.contains(&(0, 0xA0, 0x44)), "{:x?}", out);
    }

    #[test]
    fn test_mixer_gates_carrier_level() {
        let from = ChipDescriptor::new(ChipKind::Ay8910, 1789772.5);
        let mut conv = Ay8910ToOplConverter::new(from, ChipKind::Ym3812);
        conv.initial_commands();
        assert!(writes(&mut conv, &[ay(7, 0x3E)]).is_empty());
        assert_eq!(writes(&mut conv, &[ay(8, 0x0F)]), vec![(0, 0x43, 0x00)]);
        // envelope mode is treated as silent
        assert_eq!(writes(&mut conv, &[ay(8, 0x10)]), vec![(0, 0x43, 0x3F)]);
    }

    #[test]
    fn test_opl3_uses_second_register_set() {
        let from = ChipDescriptor::new(ChipKind::Ay8910, 1789772.5);
        let mut conv = Ay8910ToOplConverter::new(from, ChipKind::Ymf262);
        assert_eq!(conv.destination().clock, 14318180.0);
        let init = conv.initial_commands();
        assert_eq!(init[0], Command::write(ChipKind::Ymf262, 0, 0, 0x01, 0x20));
        assert_eq!(init[1], Command::write(ChipKind::Ymf262, 0, 1, 0x05, 0x01));
        let out = writes(&mut conv, &[ay(6, 0x03)]);
        assert!(out.iter().all(|(port, _, _)| *port == 1));
        assert!(out.contains(&(1, 0xA3, 0xFF)));
    }
}
