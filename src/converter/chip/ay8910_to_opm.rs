//! AY-3-8910 (or the YM2203 SSG) to YM2151
//!
//! Tones play on OPM channels 5-7 with a fixed voice. Noise uses the OPM
//! noise generator, which replaces operator 32 (channel 7, C2).

use super::{destination, psg_clock_divider, ChipWriter};
use crate::chips::{ChipDescriptor, ChipKind};
use crate::converter::buffer::RegisterShadow;
use crate::converter::freq::{freq_to_opm_note, psg_freq};
use crate::converter::options::{OptionKind, OptionSpec, Options};
use crate::converter::{Converter, Diagnostics};
use crate::vgm::{Command, WriteRegister};

pub const OPTIONS: &[OptionSpec] = &[
    OptionSpec {
        key: "whiteNoiseAttenuation",
        kind: OptionKind::Int { min: 0, max: 127 },
        help: "Total level added to the noise operator (default 64, 72 for ym2203)",
    },
    OptionSpec {
        key: "squareWaveAttenuation",
        kind: OptionKind::Int { min: 0, max: 127 },
        help: "Total level added to the tone channels (default 0, 4 for ym2203)",
    },
];

const VOLUME_TO_TL: [u8; 16] = [127, 62, 56, 52, 46, 42, 36, 32, 28, 24, 20, 16, 12, 8, 4, 0];

/// First OPM channel used for the PSG tones
const FIRST_CHANNEL: u8 = 5;

pub fn clock_ratio(from: ChipKind, _to: ChipKind) -> f64 {
    match from {
        ChipKind::Ym2203 => 1.0,
        _ => 2.0,
    }
}

pub struct Ay8910ToOpmConverter {
    from: ChipDescriptor,
    to: ChipDescriptor,
    out: ChipWriter,
    regs: RegisterShadow,
    psg_clock: f64,
    noise_freq: u8,
    white_noise_attenuation: u8,
    square_wave_attenuation: u8,
}

impl Ay8910ToOpmConverter {
    pub fn new(from: ChipDescriptor, opts: &Options) -> Self {
        let to = destination(&from, ChipKind::Ym2151, clock_ratio(from.kind, ChipKind::Ym2151));
        Self::with_destination(from, to, opts)
    }

    /// Converter writing to an already resolved YM2151
    pub fn with_destination(from: ChipDescriptor, to: ChipDescriptor, opts: &Options) -> Self {
        let (noise, square) = match from.kind {
            ChipKind::Ym2203 => (72, 4),
            _ => (64, 0),
        };
        Self {
            from,
            to,
            out: ChipWriter::new(&to),
            regs: RegisterShadow::new(1),
            psg_clock: from.clock / psg_clock_divider(from.kind),
            noise_freq: 0,
            white_noise_attenuation: opts.int("whiteNoiseAttenuation", noise) as u8,
            square_wave_attenuation: opts.int("squareWaveAttenuation", square) as u8,
        }
    }

    fn update_freq(&mut self, ch: u8) {
        let tp = ((self.regs.value(0, ch * 2 + 1) as u32 & 0x0F) << 8) | self.regs.value(0, ch * 2) as u32;
        let note = freq_to_opm_note(psg_freq(tp, self.psg_clock), self.to.clock);
        let opm_ch = FIRST_CHANNEL + ch;
        self.out.write(0x28 + opm_ch, note.kc);
        self.out.write(0x30 + opm_ch, note.kf);
    }

    fn update_noise(&mut self) {
        let mixer = self.regs.value(0, 7);
        let volume = (0..3)
            .filter(|ch| mixer & (8 << ch) == 0)
            .map(|ch| self.regs.value(0, 8 + ch) & 0x0F)
            .max()
            .unwrap_or(0);
        let enable = if volume > 0 { 0x80 } else { 0 };
        self.out.write(0x0F, enable | self.noise_freq);
        let tl = VOLUME_TO_TL[volume as usize] as u16 + self.white_noise_attenuation as u16;
        self.out.write(0x7F, tl.min(127) as u8);
    }

    fn update_tone(&mut self, ch: u8) {
        let tone = self.regs.value(0, 7) & (1 << ch) == 0;
        let tl = if tone {
            let v = self.regs.value(0, 8 + ch);
            let vol = if v & 0x10 != 0 { 0 } else { v & 0x0F };
            (VOLUME_TO_TL[vol as usize] as u16 + self.square_wave_attenuation as u16).min(127) as u8
        } else {
            0x7F
        };
        self.out.write(0x70 + FIRST_CHANNEL + ch, tl);
    }

    fn set_noise_period(&mut self, np: u8) {
        // OPM noise period is 32 - NFRQ at twice the PSG noise unit
        let period = (np.max(1) as f64 * self.to.clock / (2.0 * self.psg_clock)).round();
        self.noise_freq = 32 - period.clamp(1.0, 32.0) as u8;
    }

    /// Convert one PSG register write
    pub fn convert_write(&mut self, w: &WriteRegister) -> Vec<Command> {
        self.regs.set(0, w.addr, w.data);
        match w.addr {
            0..=5 => self.update_freq(w.addr >> 1),
            6 => {
                self.set_noise_period(w.data & 0x1F);
                self.update_noise();
            }
            7 => {
                for ch in 0..3 {
                    self.update_tone(ch);
                }
                self.update_noise();
            }
            8..=10 => {
                self.update_tone(w.addr - 8);
                self.update_noise();
            }
            _ => {}
        }
        self.out.commit()
    }
}

impl Converter for Ay8910ToOpmConverter {
    fn source(&self) -> &ChipDescriptor {
        &self.from
    }

    fn destination(&self) -> &ChipDescriptor {
        &self.to
    }

    fn initial_commands(&mut self) -> Vec<Command> {
        for ch in FIRST_CHANNEL..8 {
            // RL on, FB 7, CON 4
            self.out.force(0x20 + ch, 0xFC);
            self.out.force(0x40 + ch, 0x01);
            self.out.force(0x50 + ch, 0x00);
            self.out.force(0x60 + ch, 0x1B);
            self.out.force(0x70 + ch, 0x7F);
            self.out.force(0x78 + ch, 0x7F);
            self.out.force(0x80 + ch, 0x1F);
            self.out.force(0x90 + ch, 0x1F);
            self.out.force(0x98 + ch, 0x1F);
            self.out.force(0xA0 + ch, 0x00);
            self.out.force(0xB0 + ch, 0x00);
            self.out.force(0xC0 + ch, 0x00);
            self.out.force(0xD0 + ch, 0x00);
            self.out.force(0xE0 + ch, 0x00);
            self.out.force(0xF0 + ch, 0x00);
            self.out.force(0x08, (0x0F << 3) | ch);
        }
        self.out.commit()
    }

    fn convert(&mut self, cmd: &Command, _diag: &mut dyn Diagnostics) -> Vec<Command> {
        match cmd.write_for(self.from.kind, self.from.index) {
            Some(w) if w.port == 0 && w.addr < 0x10 => self.convert_write(w),
            _ => vec![cmd.clone()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::chip::testing::{last, writes, writes0};

    fn ay(addr: u8, data: u8) -> Command {
        Command::write(ChipKind::Ay8910, 0, 0, addr, data)
    }

    fn converter() -> Ay8910ToOpmConverter {
        let from = ChipDescriptor::new(ChipKind::Ay8910, 1789772.5);
        let mut conv = Ay8910ToOpmConverter::new(from, &Options::new());
        conv.initial_commands();
        conv
    }

    #[test]
    fn test_tone_becomes_key_code() {
        let mut conv = converter();
        assert_eq!(conv.destination().clock, 3579545.0);
        let out = writes(&mut conv, &[ay(0, 0xFE), ay(1, 0x00)]);
        // period 254 is A4
        assert_eq!(last(&out, 0, 0x2D), Some(0x4A));
    }

    #[test]
    fn test_noise_enable_and_level() {
        let mut conv = converter();
        writes(&mut conv, &[ay(6, 0x10), ay(7, 0x37)]);
        assert_eq!(writes0(&mut conv, &[ay(8, 0x0C)]), vec![(0x0F, 0x90), (0x7F, 76)]);
    }

    #[test]
    fn test_disabled_tone_is_muted() {
        let mut conv = converter();
        writes(&mut conv, &[ay(7, 0x38)]);
        assert_eq!(writes0(&mut conv, &[ay(9, 0x0F)]), vec![(0x76, 0x00)]);
        assert_eq!(writes0(&mut conv, &[ay(7, 0x3A)]), vec![(0x76, 0x7F)]);
    }
}
