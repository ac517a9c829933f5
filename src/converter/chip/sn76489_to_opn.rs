//! SN76489 to the OPN family
//!
//! The three tone channels become FM channels 1-3 playing a fixed
//! square-like voice that stays keyed on; volume moves the carrier level.
//! Noise goes to SSG channel C where the chip has an SSG part.

use super::sn76489_to_ay8910::{noise_equivalent_period, ATTENUATION_TO_VOLUME};
use super::{destination, psg_clock_divider, ChipWriter};
use crate::chips::{ChipDescriptor, ChipKind};
use crate::converter::freq::{freq_to_block_fnum, opn_prescaler};
use crate::converter::{Converter, Diagnostics};
use crate::vgm::{Command, WriteRegister};

pub fn clock_ratio(_from: ChipKind, to: ChipKind) -> f64 {
    match to {
        ChipKind::Ym2203 => 1.0,
        _ => 2.0,
    }
}

/// Square voice on operators S1..S4 (register, value) relative to the channel
const SQUARE_VOICE: [(u8, u8); 27] = [
    (0x30, 0x02),
    (0x38, 0x02),
    (0x34, 0x02),
    (0x3C, 0x01),
    (0x40, 0x1E),
    (0x48, 0x20),
    (0x44, 0x30),
    (0x4C, 0x7F),
    (0x50, 0x1F),
    (0x58, 0x1F),
    (0x54, 0x1F),
    (0x5C, 0x1F),
    (0x60, 0x00),
    (0x64, 0x00),
    (0x68, 0x00),
    (0x6C, 0x00),
    (0x70, 0x00),
    (0x74, 0x00),
    (0x78, 0x00),
    (0x7C, 0x00),
    (0x80, 0x00),
    (0x88, 0x00),
    (0x84, 0x00),
    (0x8C, 0x0F),
    (0x90, 0x00),
    (0xB0, 0x3B),
    (0xB4, 0xC0),
];

/// SN76489 attenuation (2 dB steps) as OPN total level (0.75 dB steps)
pub fn attenuation_to_tl(att: u8) -> u8 {
    if att >= 15 {
        0x7F
    } else {
        (att as f64 * 2.0 / 0.75 + 4.0).round() as u8
    }
}

pub struct Sn76489ToOpnConverter {
    from: ChipDescriptor,
    to: ChipDescriptor,
    out: ChipWriter,
    has_ssg: bool,
    /// SSG period units per SN76489 period unit
    ssg_scale: f64,
    period: [u16; 3],
    noise_ctrl: u8,
    latched_ch: usize,
    latched_volume: bool,
}

impl Sn76489ToOpnConverter {
    pub fn new(from: ChipDescriptor, to: ChipKind) -> Self {
        let to = destination(&from, to, clock_ratio(from.kind, to));
        let ssg_clock = to.clock / psg_clock_divider(to.kind);
        Self {
            from,
            to,
            out: ChipWriter::new(&to),
            has_ssg: to.kind != ChipKind::Ym2612,
            ssg_scale: if from.clock > 0.0 {
                2.0 * ssg_clock / from.clock
            } else {
                1.0
            },
            period: [0; 3],
            noise_ctrl: 0,
            latched_ch: 0,
            latched_volume: false,
        }
    }

    fn write_tone(&mut self, ch: usize) {
        let freq = self.from.clock / (32.0 * self.period[ch] as f64);
        let (blk, fnum) = freq_to_block_fnum(freq, self.to.clock, opn_prescaler(self.to.kind), 21, 0, 0x7FF);
        let ch = ch as u8;
        self.out.write_latched(
            0,
            0xA4 + ch,
            (blk << 3) | (fnum >> 8) as u8,
            0xA0 + ch,
            (fnum & 0xFF) as u8,
        );
    }

    fn write_noise_period(&mut self) {
        if self.has_ssg {
            let base = noise_equivalent_period(self.noise_ctrl, self.period[2]) as f64 * self.ssg_scale;
            self.out.write(6, (base.round() as u32).clamp(1, 31) as u8);
        }
    }

    fn write_volume(&mut self, ch: usize, att: u8) {
        if ch < 3 {
            self.out.write(0x4C + ch as u8, attenuation_to_tl(att));
        } else if self.has_ssg {
            self.out.write(10, ATTENUATION_TO_VOLUME[att as usize]);
        }
    }

    fn convert_write(&mut self, w: &WriteRegister) -> Vec<Command> {
        let d = w.data;
        if d & 0x80 != 0 {
            self.latched_ch = ((d >> 5) & 3) as usize;
            self.latched_volume = d & 0x10 != 0;
        }
        let ch = self.latched_ch;
        if self.latched_volume {
            self.write_volume(ch, d & 0x0F);
        } else if ch == 3 {
            self.noise_ctrl = d & 7;
            self.write_noise_period();
        } else {
            self.period[ch] = if d & 0x80 != 0 {
                (self.period[ch] & 0x3F0) | (d & 0x0F) as u16
            } else {
                (((d & 0x3F) as u16) << 4) | (self.period[ch] & 0x0F)
            };
            self.write_tone(ch);
            if ch == 2 && self.noise_ctrl & 3 == 3 {
                self.write_noise_period();
            }
        }
        self.out.commit()
    }
}

impl Converter for Sn76489ToOpnConverter {
    fn source(&self) -> &ChipDescriptor {
        &self.from
    }

    fn destination(&self) -> &ChipDescriptor {
        &self.to
    }

    fn initial_commands(&mut self) -> Vec<Command> {
        if self.has_ssg {
            self.out.force(7, 0x1C);
        }
        for ch in 0..3u8 {
            for (addr, data) in SQUARE_VOICE {
                self.out.force(addr + ch, data);
            }
        }
        for ch in 0..3u8 {
            self.out.force(0x28, 0xF0 | ch);
        }
        self.out.commit()
    }

    fn convert(&mut self, cmd: &Command, _diag: &mut dyn Diagnostics) -> Vec<Command> {
        match cmd.write_for(ChipKind::Sn76489, self.from.index) {
            Some(w) => self.convert_write(w),
            None => vec![cmd.clone()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::chip::testing::{last, writes};
    use crate::converter::freq::opn_freq;

    fn psg(data: u8) -> Command {
        Command::write(ChipKind::Sn76489, 0, 0, 0, data)
    }

    #[test]
    fn test_tone_keeps_pitch() {
        let from = ChipDescriptor::new(ChipKind::Sn76489, 3579545.0);
        let mut conv = Sn76489ToOpnConverter::new(from, ChipKind::Ym2612);
        assert_eq!(conv.destination().clock, 7159090.0);

        // period 254 is about 440 Hz
        let out = writes(&mut conv, &[psg(0x8E), psg(0x0F)]);
        let hi = last(&out, 0, 0xA4).unwrap();
        let lo = last(&out, 0, 0xA0).unwrap();
        let fnum = (((hi & 7) as u16) << 8) | lo as u16;
        let f = opn_freq((hi >> 3) & 7, fnum, 7159090.0, 144.0);
        let expected = 3579545.0 / (32.0 * 254.0);
        assert!((f - expected).abs() < 0.5, "{} {}", f, expected);
    }

    #[test]
    fn test_volume_and_ym2612_noise_is_dropped() {
        let from = ChipDescriptor::new(ChipKind::Sn76489, 3579545.0);
        let mut conv = Sn76489ToOpnConverter::new(from, ChipKind::Ym2612);
        let init = conv.initial_commands();
        assert!(init.iter().all(|c| !matches!(c, Command::Write(w) if w.addr < 0x10)));

        let out = writes(&mut conv, &[psg(0xB3), psg(0xBF), psg(0xE4), psg(0xF0)]);
        assert_eq!(out, vec![(0, 0x4D, 12), (0, 0x4D, 0x7F)]);
    }

    #[test]
    fn test_ym2203_noise_uses_ssg() {
        let from = ChipDescriptor::new(ChipKind::Sn76489, 3579545.0);
        let mut conv = Sn76489ToOpnConverter::new(from, ChipKind::Ym2203);
        let init = conv.initial_commands();
        assert_eq!(init[0], Command::write(ChipKind::Ym2203, 0, 0, 7, 0x1C));

        let out = writes(&mut conv, &[psg(0xE5), psg(0xF2)]);
        assert_eq!(out, vec![(0, 6, 31), (0, 10, 14)]);
    }
}
