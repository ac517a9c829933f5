//! SN76489 to AY-3-8910
//!
//! Tone channels map one to one. The AY has no separate noise channel, so
//! SN76489 noise shares AY channel C with tone 2; when both are audible the
//! configured [`NoisePolicy`] decides what channel C plays.

use super::{destination, ChipWriter};
use crate::chips::{ChipDescriptor, ChipKind};
use crate::converter::options::{OptionKind, OptionSpec, Options};
use crate::converter::{Converter, Diagnostics};
use crate::vgm::{Command, WriteRegister};

pub const OPTIONS: &[OptionSpec] = &[
    OptionSpec {
        key: "noisePolicy",
        kind: OptionKind::Choice(&["tone", "noise", "mix"]),
        help: "What AY channel C plays when tone 2 and noise sound together (default mix)",
    },
    OptionSpec {
        key: "whiteNoiseAttenuation",
        kind: OptionKind::Int { min: 0, max: 15 },
        help: "Volume steps subtracted from white noise (default 0)",
    },
    OptionSpec {
        key: "periodicNoiseAttenuation",
        kind: OptionKind::Int { min: 0, max: 15 },
        help: "Volume steps subtracted from periodic noise (default 0)",
    },
    OptionSpec {
        key: "periodicNoisePitchShift",
        kind: OptionKind::Int { min: 0, max: 4 },
        help: "Octaves the periodic noise period is raised by (default 0)",
    },
];

/// SN76489 attenuation (0 loudest) as AY volume (15 loudest)
pub const ATTENUATION_TO_VOLUME: [u8; 16] = [15, 14, 14, 13, 12, 12, 11, 10, 10, 9, 8, 8, 7, 6, 6, 0];

/// AY mixer values (register 7, active low)
pub const MIX_TONE: u8 = 0x38;
pub const MIX_NOISE: u8 = 0x1C;
pub const MIX_BOTH: u8 = 0x18;

pub fn clock_ratio(_from: ChipKind, _to: ChipKind) -> f64 {
    0.5
}

/// Channel C resolution when tone 2 and noise are both enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoisePolicy {
    Tone,
    Noise,
    Mix,
}

impl NoisePolicy {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "tone" => Some(NoisePolicy::Tone),
            "noise" => Some(NoisePolicy::Noise),
            "mix" => Some(NoisePolicy::Mix),
            _ => None,
        }
    }
}

/// AY mixer register value for the given channel C sources
pub fn mixer_mask(policy: NoisePolicy, tone_on: bool, noise_on: bool) -> u8 {
    match (tone_on, noise_on, policy) {
        (_, false, _) => MIX_TONE,
        (false, true, _) => MIX_NOISE,
        (true, true, NoisePolicy::Tone) => MIX_TONE,
        (true, true, NoisePolicy::Noise) => MIX_NOISE,
        (true, true, NoisePolicy::Mix) => MIX_BOTH,
    }
}

/// Noise shift period in tone period units: 16, 32, 64 or tone 2's period
pub fn noise_equivalent_period(ctrl: u8, tone2: u16) -> u32 {
    match ctrl & 3 {
        3 => tone2 as u32,
        rate => 16 << rate,
    }
}

pub struct Sn76489ToAy8910Converter {
    from: ChipDescriptor,
    to: ChipDescriptor,
    out: ChipWriter,
    /// AY period units per SN76489 period unit
    scale: f64,
    period: [u16; 3],
    attenuation: [u8; 4],
    noise_ctrl: u8,
    latched_ch: usize,
    latched_volume: bool,
    policy: NoisePolicy,
    white_attenuation: u8,
    periodic_attenuation: u8,
    periodic_shift: u8,
}

impl Sn76489ToAy8910Converter {
    pub fn new(from: ChipDescriptor, opts: &Options) -> Self {
        let to = destination(&from, ChipKind::Ay8910, clock_ratio(from.kind, ChipKind::Ay8910));
        let scale = if from.clock > 0.0 {
            2.0 * to.clock / from.clock
        } else {
            1.0
        };
        Self {
            from,
            to,
            out: ChipWriter::new(&to),
            scale,
            period: [0; 3],
            attenuation: [15; 4],
            noise_ctrl: 0,
            latched_ch: 0,
            latched_volume: false,
            policy: NoisePolicy::from_name(opts.choice("noisePolicy", "mix")).unwrap_or(NoisePolicy::Mix),
            white_attenuation: opts.int("whiteNoiseAttenuation", 0) as u8,
            periodic_attenuation: opts.int("periodicNoiseAttenuation", 0) as u8,
            periodic_shift: opts.int("periodicNoisePitchShift", 0) as u8,
        }
    }

    fn white_noise(&self) -> bool {
        self.noise_ctrl & 4 != 0
    }

    fn write_tone(&mut self, ch: usize) {
        let tp = (self.period[ch] as f64 * self.scale).round().min(0xFFF as f64) as u16;
        self.out.write(ch as u8 * 2, (tp & 0xFF) as u8);
        self.out.write(ch as u8 * 2 + 1, (tp >> 8) as u8);
    }

    fn write_noise_period(&mut self) {
        let base = noise_equivalent_period(self.noise_ctrl, self.period[2]) as f64 * self.scale;
        let mut np = (base.round() as u32).clamp(1, 31);
        if !self.white_noise() {
            np = (np >> self.periodic_shift).max(1);
        }
        self.out.write(6, np as u8);
    }

    fn write_channel_c(&mut self) {
        let tone_on = self.attenuation[2] != 15;
        let noise_on = self.attenuation[3] != 15;
        let mask = mixer_mask(self.policy, tone_on, noise_on);

        let noise_attenuation = if self.white_noise() {
            self.white_attenuation
        } else {
            self.periodic_attenuation
        };
        let tone = ATTENUATION_TO_VOLUME[self.attenuation[2] as usize];
        let noise = ATTENUATION_TO_VOLUME[self.attenuation[3] as usize].saturating_sub(noise_attenuation);
        let volume = match mask {
            MIX_NOISE => noise,
            MIX_BOTH => tone.max(noise),
            _ => tone,
        };
        self.out.write(10, volume);
        self.out.write(7, mask);
    }

    fn write_volume(&mut self, ch: usize) {
        if ch < 2 {
            self.out.write(8 + ch as u8, ATTENUATION_TO_VOLUME[self.attenuation[ch] as usize]);
        } else {
            self.write_channel_c();
        }
    }

    fn set_noise_ctrl(&mut self, ctrl: u8) {
        self.noise_ctrl = ctrl & 7;
        self.write_noise_period();
        self.write_channel_c();
    }

    fn convert_write(&mut self, w: &WriteRegister) -> Vec<Command> {
        let d = w.data;
        if d & 0x80 != 0 {
            self.latched_ch = ((d >> 5) & 3) as usize;
            self.latched_volume = d & 0x10 != 0;
            let ch = self.latched_ch;
            if self.latched_volume {
                self.attenuation[ch] = d & 0x0F;
                self.write_volume(ch);
            } else if ch < 3 {
                self.period[ch] = (self.period[ch] & 0x3F0) | (d & 0x0F) as u16;
                self.write_tone(ch);
            } else {
                self.set_noise_ctrl(d);
            }
        } else {
            let ch = self.latched_ch;
            if self.latched_volume {
                self.attenuation[ch] = d & 0x0F;
                self.write_volume(ch);
            } else if ch < 3 {
                self.period[ch] = (((d & 0x3F) as u16) << 4) | (self.period[ch] & 0x0F);
                self.write_tone(ch);
            } else {
                self.set_noise_ctrl(d);
            }
        }
        if !self.latched_volume && self.latched_ch == 2 && self.noise_ctrl & 3 == 3 {
            self.write_noise_period();
        }
        self.out.commit()
    }
}

impl Converter for Sn76489ToAy8910Converter {
    fn source(&self) -> &ChipDescriptor {
        &self.from
    }

    fn destination(&self) -> &ChipDescriptor {
        &self.to
    }

    fn initial_commands(&mut self) -> Vec<Command> {
        self.out.force(7, MIX_TONE);
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

    fn psg(data: u8) -> Command {
        Command::write(ChipKind::Sn76489, 0, 0, 0, data)
    }

    fn converter(policy: &str) -> Sn76489ToAy8910Converter {
        let raw = vec![("noisePolicy".to_string(), policy.to_string())];
        let opts = Options::validate(&raw, OPTIONS).unwrap();
        Sn76489ToAy8910Converter::new(ChipDescriptor::new(ChipKind::Sn76489, 3579545.0), &opts)
    }

    #[test]
    fn test_mixer_mask_table() {
        use NoisePolicy::*;
        let table = [
            (Tone, false, false, 0x38),
            (Tone, true, false, 0x38),
            (Tone, false, true, 0x1C),
            (Tone, true, true, 0x38),
            (Noise, false, false, 0x38),
            (Noise, true, false, 0x38),
            (Noise, false, true, 0x1C),
            (Noise, true, true, 0x1C),
            (Mix, false, false, 0x38),
            (Mix, true, false, 0x38),
            (Mix, false, true, 0x1C),
            (Mix, true, true, 0x18),
        ];
        for (policy, tone, noise, mask) in table {
            assert_eq!(mixer_mask(policy, tone, noise), mask, "{:?} {} {}", policy, tone, noise);
        }
    }

    #[test]
    fn test_tone_period_and_volume() {
        let mut conv = converter("mix");
        assert_eq!(conv.destination().clock, 1789772.5);
        assert_eq!(conv.initial_commands().len(), 1);

        // tone 1 period 0x1A5, attenuation 2
        let out = writes(&mut conv, &[psg(0xA5), psg(0x1A), psg(0xB2)]);
        assert_eq!(last(&out, 0, 2), Some(0xA5));
        assert_eq!(last(&out, 0, 3), Some(0x01));
        assert_eq!(last(&out, 0, 9), Some(14));
    }

    #[test]
    fn test_noise_shares_channel_c() {
        let mut conv = converter("noise");
        // tone 2 at attenuation 0, white noise rate 0 at attenuation 4
        let out = writes(&mut conv, &[psg(0xD0), psg(0xE4), psg(0xF4)]);
        assert_eq!(last(&out, 0, 7), Some(MIX_NOISE));
        assert_eq!(last(&out, 0, 6), Some(16));
        assert_eq!(last(&out, 0, 10), Some(12));

        // noise off: channel C returns to tone 2
        let out = writes(&mut conv, &[psg(0xFF)]);
        assert_eq!(last(&out, 0, 7), Some(MIX_TONE));
        assert_eq!(last(&out, 0, 10), Some(15));
    }

    #[test]
    fn test_periodic_noise_follows_tone_2() {
        let mut conv = converter("mix");
        // periodic noise clocked by tone 2
        writes(&mut conv, &[psg(0xE3)]);
        let out = writes(&mut conv, &[psg(0xC8), psg(0x01)]);
        assert_eq!(last(&out, 0, 6), Some(24));
    }

    #[test]
    fn test_other_chips_pass_through() {
        let mut conv = converter("tone");
        let cmd = Command::write(ChipKind::Ym2413, 0, 0, 0x10, 0x20);
        assert_eq!(conv.convert(&cmd, &mut crate::converter::NullDiagnostics), vec![cmd]);
    }
}
