//! YM2413 F-number rescaling

use super::ClockStage;
use crate::chips::{ChipDescriptor, ChipKind};
use crate::converter::buffer::{RegisterShadow, WriteBuffer};
use crate::converter::freq::rescale_block_fnum;
use crate::converter::{Converter, Diagnostics};
use crate::vgm::{Command, WriteRegister};

pub struct OpllClockConverter {
    stage: ClockStage,
    regs: RegisterShadow,
    buf: WriteBuffer,
}

impl OpllClockConverter {
    pub fn new(from: ChipDescriptor, to_clock: f64) -> Self {
        Self {
            stage: ClockStage::new(from, to_clock),
            regs: RegisterShadow::new(1),
            buf: WriteBuffer::new(1),
        }
    }

    fn convert_write(&mut self, w: &WriteRegister) -> Vec<Command> {
        let is_freq = matches!(w.addr, 0x10..=0x18 | 0x20..=0x28);
        if self.stage.is_identity() || !is_freq {
            return vec![Command::Write(*w)];
        }
        self.regs.set(0, w.addr, w.data);
        let ch = w.addr & 0x0F;
        let (al, ah) = (0x10 + ch, 0x20 + ch);
        let hi = self.regs.value(0, ah);
        let fnum = (((hi & 1) as u16) << 8) | self.regs.value(0, al) as u16;
        let (blk, fnum) = rescale_block_fnum((hi >> 1) & 7, fnum, self.stage.ratio, 0x1FF);
        // sustain and key-on bits are kept
        let dh = (hi & 0xF0) | (blk << 1) | (fnum >> 8) as u8;
        self.buf.push(WriteRegister { addr: ah, data: dh, ..*w }, true);
        self.buf.push(
            WriteRegister {
                addr: al,
                data: (fnum & 0xFF) as u8,
                ..*w
            },
            true,
        );
        self.buf.commit()
    }
}

impl Converter for OpllClockConverter {
    fn source(&self) -> &ChipDescriptor {
        &self.stage.from
    }

    fn destination(&self) -> &ChipDescriptor {
        &self.stage.to
    }

    fn convert(&mut self, cmd: &Command, _diag: &mut dyn Diagnostics) -> Vec<Command> {
        match cmd.write_for(ChipKind::Ym2413, self.stage.from.index) {
            Some(w) => self.convert_write(w),
            None => vec![cmd.clone()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::NullDiagnostics;

    fn run(conv: &mut OpllClockConverter, addr: u8, data: u8) -> Vec<(u8, u8)> {
        conv.convert(&Command::write(ChipKind::Ym2413, 0, 0, addr, data), &mut NullDiagnostics)
            .into_iter()
            .filter_map(|c| match c {
                Command::Write(w) => Some((w.addr, w.data)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_rescale_keeps_key_and_dedups() {
        let from = ChipDescriptor::new(ChipKind::Ym2413, 3579545.0);
        let mut conv = OpllClockConverter::new(from, 3579545.0 * 2.0);
        assert_eq!(run(&mut conv, 0x10, 0x80), vec![(0x20, 0x00), (0x10, 0x40)]);
        // key on, block 2, high F-number bit: 0x180 / 2 = 0xC0
        assert_eq!(run(&mut conv, 0x20, 0x15), vec![(0x20, 0x14), (0x10, 0xC0)]);
        // rewriting the same value emits nothing new
        assert!(run(&mut conv, 0x20, 0x15).is_empty());
    }

    #[test]
    fn test_block_never_decreases_with_lower_clock() {
        let from = ChipDescriptor::new(ChipKind::Ym2413, 3579545.0);
        let mut conv = OpllClockConverter::new(from, 3579545.0 / 3.0);
        run(&mut conv, 0x11, 0xFF);
        let out = run(&mut conv, 0x21, 0x0F);
        // block 7 with an overflowing F-number saturates
        assert_eq!(out, vec![(0x21, 0x0F), (0x11, 0xFF)]);
    }

    #[test]
    fn test_identity_passes_everything() {
        let from = ChipDescriptor::new(ChipKind::Ym2413, 3579545.0);
        let mut conv = OpllClockConverter::new(from, 3579545.0);
        assert_eq!(run(&mut conv, 0x20, 0x15), vec![(0x20, 0x15)]);
        assert_eq!(run(&mut conv, 0x20, 0x15), vec![(0x20, 0x15)]);
    }
}
