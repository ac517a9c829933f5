//! AY-3-8910 tone, noise and envelope period rescaling
//!
//! Also serves as the SSG part of the OPN clock converter, where the writes
//! carry the OPN chip kind.

use super::ClockStage;
use crate::chips::ChipDescriptor;
use crate::converter::buffer::{RegisterShadow, WriteBuffer};
use crate::converter::{Converter, Diagnostics};
use crate::vgm::{Command, WriteRegister};

pub struct Ay8910ClockConverter {
    stage: ClockStage,
    regs: RegisterShadow,
    buf: WriteBuffer,
}

impl Ay8910ClockConverter {
    pub fn new(from: ChipDescriptor, to_clock: f64) -> Self {
        Self {
            stage: ClockStage::new(from, to_clock),
            regs: RegisterShadow::new(1),
            buf: WriteBuffer::new(1),
        }
    }

    /// Rescale one PSG register write
    pub fn convert_write(&mut self, w: &WriteRegister) -> Vec<Command> {
        let addr = w.addr;
        if self.stage.is_identity() || addr >= 16 || w.port != 0 {
            return vec![Command::Write(*w)];
        }
        self.regs.set(0, addr, w.data);
        let put = |buf: &mut WriteBuffer, addr: u8, data: u8| {
            buf.push(WriteRegister { addr, data, ..*w }, true)
        };
        match addr {
            0..=5 => {
                let (al, ah) = (addr & 6, addr | 1);
                let raw = ((self.regs.value(0, ah) as u32 & 0x0F) << 8) | self.regs.value(0, al) as u32;
                let adj = self.stage.scale_period(raw, 0x0FFF);
                put(&mut self.buf, al, (adj & 0xFF) as u8);
                put(&mut self.buf, ah, (adj >> 8) as u8);
            }
            6 => {
                let adj = self.stage.scale_period((w.data & 0x1F) as u32, 0x1F);
                put(&mut self.buf, 6, adj as u8);
            }
            11 | 12 => {
                let raw = ((self.regs.value(0, 12) as u32) << 8) | self.regs.value(0, 11) as u32;
                let adj = self.stage.scale_period(raw, 0xFFFF);
                put(&mut self.buf, 11, (adj & 0xFF) as u8);
                put(&mut self.buf, 12, (adj >> 8) as u8);
            }
            _ => return vec![Command::Write(*w)],
        }
        self.buf.commit()
    }
}

impl Converter for Ay8910ClockConverter {
    fn source(&self) -> &ChipDescriptor {
        &self.stage.from
    }

    fn destination(&self) -> &ChipDescriptor {
        &self.stage.to
    }

    fn convert(&mut self, cmd: &Command, _diag: &mut dyn Diagnostics) -> Vec<Command> {
        match cmd.write_for(self.stage.from.kind, self.stage.from.index) {
            Some(w) => self.convert_write(w),
            None => vec![cmd.clone()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chips::ChipKind;
    use crate::converter::NullDiagnostics;

    fn ay(addr: u8, data: u8) -> Command {
        Command::write(ChipKind::Ay8910, 0, 0, addr, data)
    }

    fn writes(out: Vec<Command>) -> Vec<(u8, u8)> {
        out.into_iter()
            .filter_map(|c| match c {
                Command::Write(w) => Some((w.addr, w.data)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_tone_period_doubles() {
        let from = ChipDescriptor::new(ChipKind::Ay8910, 1789772.5);
        let mut conv = Ay8910ClockConverter::new(from, 3579545.0);
        let mut diag = NullDiagnostics;
        assert_eq!(writes(conv.convert(&ay(2, 0x80), &mut diag)), vec![(2, 0x00), (3, 0x01)]);
        assert_eq!(writes(conv.convert(&ay(3, 0x01), &mut diag)), vec![(3, 0x03)]);
    }

    #[test]
    fn test_noise_and_tone_saturate() {
        let from = ChipDescriptor::new(ChipKind::Ay8910, 1789772.5);
        let mut conv = Ay8910ClockConverter::new(from, 7159090.0);
        let mut diag = NullDiagnostics;
        assert_eq!(writes(conv.convert(&ay(6, 0x10), &mut diag)), vec![(6, 0x1F)]);
        conv.convert(&ay(0, 0xFF), &mut diag);
        let out = writes(conv.convert(&ay(1, 0x0F), &mut diag));
        assert_eq!(out, vec![(0, 0xFF), (1, 0x0F)]);
    }

    #[test]
    fn test_envelope_period_and_other_registers() {
        let from = ChipDescriptor::new(ChipKind::Ay8910, 3579545.0);
        let mut conv = Ay8910ClockConverter::new(from, 1789772.5);
        let mut diag = NullDiagnostics;
        assert_eq!(writes(conv.convert(&ay(12, 0x10), &mut diag)), vec![(11, 0x00), (12, 0x08)]);
        assert_eq!(writes(conv.convert(&ay(7, 0x38), &mut diag)), vec![(7, 0x38)]);
        assert_eq!(writes(conv.convert(&ay(13, 0x0E), &mut diag)), vec![(13, 0x0E)]);
    }
}
