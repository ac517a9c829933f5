//! YM2151 key code shift plus noise and LFO frequency rescaling

use super::ClockStage;
use crate::chips::{ChipDescriptor, ChipKind};
use crate::converter::buffer::{RegisterShadow, WriteBuffer};
use crate::converter::freq::OpmNote;
use crate::converter::{Converter, Diagnostics};
use crate::vgm::{Command, WriteRegister};

pub struct OpmClockConverter {
    stage: ClockStage,
    regs: RegisterShadow,
    buf: WriteBuffer,
    /// Key shift in 1/256 semitones
    key_diff: i32,
    /// LFRQ shift; LFO rate is clock * 2^(LFRQ/16)
    lfo_diff: i32,
}

impl OpmClockConverter {
    pub fn new(from: ChipDescriptor, to_clock: f64) -> Self {
        let stage = ClockStage::new(from, to_clock);
        let octaves = (1.0 / stage.ratio).log2();
        Self {
            stage,
            regs: RegisterShadow::new(1),
            buf: WriteBuffer::new(1),
            key_diff: (12.0 * 256.0 * octaves).round() as i32,
            lfo_diff: (16.0 * octaves).round() as i32,
        }
    }

    fn put(&mut self, w: &WriteRegister, addr: u8, data: u8) {
        self.buf.push(WriteRegister { addr, data, ..*w }, true);
    }

    fn convert_write(&mut self, w: &WriteRegister) -> Vec<Command> {
        if self.stage.is_identity() {
            return vec![Command::Write(*w)];
        }
        self.regs.set(0, w.addr, w.data);
        match w.addr {
            0x28..=0x37 => {
                let ch = w.addr & 7;
                let note = OpmNote {
                    kc: self.regs.value(0, 0x28 + ch),
                    kf: self.regs.value(0, 0x30 + ch),
                }
                .shifted(self.key_diff);
                self.put(w, 0x28 + ch, note.kc);
                self.put(w, 0x30 + ch, note.kf);
            }
            0x0F => {
                // noise period is 32 - NFRQ
                let period = 32 - (w.data & 0x1F) as u32;
                let period = self.stage.scale_period(period, 32).max(1);
                self.put(w, 0x0F, (w.data & 0xE0) | (32 - period) as u8);
            }
            0x18 => {
                let lfrq = (w.data as i32 + self.lfo_diff).clamp(0, 255);
                self.put(w, 0x18, lfrq as u8);
            }
            _ => return vec![Command::Write(*w)],
        }
        self.buf.commit()
    }
}

impl Converter for OpmClockConverter {
    fn source(&self) -> &ChipDescriptor {
        &self.stage.from
    }

    fn destination(&self) -> &ChipDescriptor {
        &self.stage.to
    }

    /// LFRQ shifted from its reset value of 0
    fn initial_commands(&mut self) -> Vec<Command> {
        if self.stage.is_identity() {
            return Vec::new();
        }
        let lfrq = self.lfo_diff.clamp(0, 255) as u8;
        let w = WriteRegister::new(ChipKind::Ym2151, self.stage.from.index, 0, 0x18, lfrq);
        self.buf.push(w, false);
        self.buf.commit()
    }

    fn convert(&mut self, cmd: &Command, _diag: &mut dyn Diagnostics) -> Vec<Command> {
        match cmd.write_for(ChipKind::Ym2151, self.stage.from.index) {
            Some(w) => self.convert_write(w),
            None => vec![cmd.clone()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::NullDiagnostics;

    fn run(conv: &mut OpmClockConverter, addr: u8, data: u8) -> Vec<(u8, u8)> {
        conv.convert(&Command::write(ChipKind::Ym2151, 0, 0, addr, data), &mut NullDiagnostics)
            .into_iter()
            .filter_map(|c| match c {
                Command::Write(w) => Some((w.addr, w.data)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_double_clock_drops_an_octave() {
        let from = ChipDescriptor::new(ChipKind::Ym2151, 3579545.0);
        let mut conv = OpmClockConverter::new(from, 3579545.0 * 2.0);
        assert_eq!(conv.key_diff, -12 * 256);
        let out = run(&mut conv, 0x28, 0x4A);
        assert_eq!(out, vec![(0x28, 0x3A), (0x30, 0x00)]);
    }

    #[test]
    fn test_lowest_key_saturates() {
        let from = ChipDescriptor::new(ChipKind::Ym2151, 3579545.0);
        let mut conv = OpmClockConverter::new(from, 3579545.0 * 2.0);
        let out = run(&mut conv, 0x29, 0x02);
        assert_eq!(out, vec![(0x29, 0x00), (0x31, 0x00)]);
    }

    #[test]
    fn test_initial_lfo_shift() {
        let from = ChipDescriptor::new(ChipKind::Ym2151, 4000000.0);
        let mut conv = OpmClockConverter::new(from, 2000000.0);
        let init: Vec<(u8, u8)> = conv
            .initial_commands()
            .into_iter()
            .filter_map(|c| match c {
                Command::Write(w) => Some((w.addr, w.data)),
                _ => None,
            })
            .collect();
        assert_eq!(init, vec![(0x18, 0x10)]);

        let mut conv = OpmClockConverter::new(from, 4000000.0);
        assert!(conv.initial_commands().is_empty());
    }

    #[test]
    fn test_noise_and_lfo() {
        let from = ChipDescriptor::new(ChipKind::Ym2151, 4000000.0);
        let mut conv = OpmClockConverter::new(from, 2000000.0);
        // period 32 - 16 = 16 halves to 8: NFRQ 24
        assert_eq!(run(&mut conv, 0x0F, 0x90), vec![(0x0F, 0x98)]);
        assert_eq!(run(&mut conv, 0x18, 0x80), vec![(0x18, 0x90)]);
        assert_eq!(run(&mut conv, 0x18, 0xF8), vec![(0x18, 0xFF)]);
        assert_eq!(run(&mut conv, 0x20, 0xC7), vec![(0x20, 0xC7)]);
    }
}
