//! SN76489 tone period rescaling

use super::ClockStage;
use crate::chips::{ChipDescriptor, ChipKind};
use crate::converter::{Converter, Diagnostics};
use crate::vgm::{Command, WriteRegister};

const MAX_PERIOD: u32 = 0x3FF;

pub struct Sn76489ClockConverter {
    stage: ClockStage,
    period: [u16; 3],
    /// Last emitted latch byte and data byte per tone channel
    out_latch: [Option<u8>; 3],
    out_data: [Option<u8>; 3],
    latched_ch: u8,
    latched_tone: bool,
}

impl Sn76489ClockConverter {
    pub fn new(from: ChipDescriptor, to_clock: f64) -> Self {
        Self {
            stage: ClockStage::new(from, to_clock),
            period: [0; 3],
            out_latch: [None; 3],
            out_data: [None; 3],
            latched_ch: 0,
            latched_tone: true,
        }
    }

    fn encode(&self, ch: usize) -> (u8, u8) {
        let adj = self.stage.scale_period(self.period[ch] as u32, MAX_PERIOD);
        (0x80 | ((ch as u8) << 5) | (adj & 0x0F) as u8, (adj >> 4) as u8)
    }

    fn convert_write(&mut self, w: &WriteRegister) -> Vec<Command> {
        let d = w.data;
        if d & 0x80 != 0 {
            self.latched_ch = (d >> 5) & 3;
            self.latched_tone = d & 0x10 == 0;
            let ch = self.latched_ch as usize;
            if !self.latched_tone || ch >= 3 {
                return vec![Command::Write(*w)];
            }
            self.period[ch] = (self.period[ch] & 0x3F0) | (d & 0x0F) as u16;
            let (latch, data) = self.encode(ch);
            self.out_latch[ch] = Some(latch);
            let mut out = vec![Command::Write(w.with_data(latch))];
            if self.out_data[ch] != Some(data) {
                self.out_data[ch] = Some(data);
                out.push(Command::Write(w.with_data(data)));
            }
            out
        } else {
            let ch = self.latched_ch as usize;
            if !self.latched_tone || ch >= 3 {
                return vec![Command::Write(*w)];
            }
            self.period[ch] = (((d & 0x3F) as u16) << 4) | (self.period[ch] & 0x0F);
            let (latch, data) = self.encode(ch);
            self.out_data[ch] = Some(data);
            let mut out = Vec::with_capacity(2);
            if self.out_latch[ch] != Some(latch) {
                self.out_latch[ch] = Some(latch);
                out.push(Command::Write(w.with_data(latch)));
            }
            out.push(Command::Write(w.with_data(data)));
            out
        }
    }
}

impl Converter for Sn76489ClockConverter {
    fn source(&self) -> &ChipDescriptor {
        &self.stage.from
    }

    fn destination(&self) -> &ChipDescriptor {
        &self.stage.to
    }

    fn convert(&mut self, cmd: &Command, _diag: &mut dyn Diagnostics) -> Vec<Command> {
        match cmd.write_for(ChipKind::Sn76489, self.stage.from.index) {
            Some(w) if !self.stage.is_identity() => self.convert_write(w),
            _ => vec![cmd.clone()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::NullDiagnostics;

    fn psg(data: u8) -> Command {
        Command::write(ChipKind::Sn76489, 0, 0, 0, data)
    }

    fn run(conv: &mut Sn76489ClockConverter, data: &[u8]) -> Vec<u8> {
        data.iter()
            .flat_map(|d| conv.convert(&psg(*d), &mut NullDiagnostics))
            .filter_map(|c| match c {
                Command::Write(w) => Some(w.data),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_double_clock_doubles_period() {
        let from = ChipDescriptor::new(ChipKind::Sn76489, 3579545.0);
        let mut conv = Sn76489ClockConverter::new(from, 7159090.0);
        // channel 1 period 0x0FE
        let out = run(&mut conv, &[0xAE, 0x0F]);
        // low nibble alone gives 0x01C; the full period 0x1FC only changes the data byte
        assert_eq!(out, vec![0xAC, 0x01, 0x1F]);
    }

    #[test]
    fn test_data_before_latch_is_channel_0_tone() {
        let from = ChipDescriptor::new(ChipKind::Sn76489, 3579545.0);
        let mut conv = Sn76489ClockConverter::new(from, 7159090.0);
        let out = run(&mut conv, &[0x08]);
        assert_eq!(out, vec![0x80, 0x10]);
        assert_eq!(conv.period[0], 0x080);
    }

    #[test]
    fn test_period_saturates() {
        let from = ChipDescriptor::new(ChipKind::Sn76489, 3579545.0);
        let mut conv = Sn76489ClockConverter::new(from, 7159090.0);
        let out = run(&mut conv, &[0x8F, 0x3F]);
        assert_eq!(out.last(), Some(&0x3F));
        assert_eq!(conv.period[0], 0x3FF);
    }

    #[test]
    fn test_volume_and_noise_pass_through() {
        let from = ChipDescriptor::new(ChipKind::Sn76489, 3579545.0);
        let mut conv = Sn76489ClockConverter::new(from, 7159090.0);
        assert_eq!(run(&mut conv, &[0x9F, 0xE4, 0xFF]), vec![0x9F, 0xE4, 0xFF]);
    }

    #[test]
    fn test_identity_ratio() {
        let from = ChipDescriptor::new(ChipKind::Sn76489, 3579545.0);
        let mut conv = Sn76489ClockConverter::new(from, 3579545.0);
        assert_eq!(run(&mut conv, &[0x8E, 0x0F]), vec![0x8E, 0x0F]);
    }
}
