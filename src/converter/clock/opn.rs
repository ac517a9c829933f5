//! OPN family (YM2203, YM2608, YM2612) F-number rescaling

use super::{Ay8910ClockConverter, ClockStage};
use crate::chips::{ChipDescriptor, ChipKind, SubModule};
use crate::converter::buffer::RegisterShadow;
use crate::converter::freq::rescale_block_fnum;
use crate::converter::{Converter, Diagnostics};
use crate::vgm::{Command, WriteRegister};

pub struct OpnClockConverter {
    stage: ClockStage,
    regs: RegisterShadow,
    /// SSG part of YM2203/YM2608
    ssg: Option<Ay8910ClockConverter>,
}

impl OpnClockConverter {
    pub fn new(from: ChipDescriptor, to_clock: f64) -> Self {
        let ssg = (from.kind != ChipKind::Ym2612 && from.includes(SubModule::Ssg))
            .then(|| Ay8910ClockConverter::new(from, to_clock));
        Self {
            stage: ClockStage::new(from, to_clock),
            regs: RegisterShadow::new(from.kind.ports()),
            ssg,
        }
    }

    fn convert_fm(&mut self, w: &WriteRegister) -> Vec<Command> {
        if self.stage.is_identity() {
            return vec![Command::Write(*w)];
        }
        self.regs.set(w.port, w.addr, w.data);
        if !(0xA0..0xB0).contains(&w.addr) || w.addr & 3 == 3 {
            return vec![Command::Write(*w)];
        }
        // A8-AE hold the channel 3 per-operator frequencies
        let al = 0xA0 + (w.addr & 3) + (w.addr & 8);
        let ah = al + 4;
        let hi = self.regs.value(w.port, ah);
        let fnum = (((hi & 7) as u16) << 8) | self.regs.value(w.port, al) as u16;
        let (blk, fnum) = rescale_block_fnum((hi >> 3) & 7, fnum, self.stage.ratio, 0x7FF);
        vec![
            Command::Write(WriteRegister {
                addr: ah,
                data: (blk << 3) | (fnum >> 8) as u8,
                ..*w
            }),
            Command::Write(WriteRegister {
                addr: al,
                data: (fnum & 0xFF) as u8,
                ..*w
            }),
        ]
    }
}

impl Converter for OpnClockConverter {
    fn source(&self) -> &ChipDescriptor {
        &self.stage.from
    }

    fn destination(&self) -> &ChipDescriptor {
        &self.stage.to
    }

    fn convert(&mut self, cmd: &Command, _diag: &mut dyn Diagnostics) -> Vec<Command> {
        let Some(w) = cmd.write_for(self.stage.from.kind, self.stage.from.index) else {
            return vec![cmd.clone()];
        };
        if w.addr < 0x10 && w.port == 0 {
            return match self.ssg.as_mut() {
                Some(ssg) => ssg.convert_write(w),
                None => vec![cmd.clone()],
            };
        }
        if self.stage.from.includes(SubModule::Fm) {
            self.convert_fm(w)
        } else {
            vec![cmd.clone()]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::NullDiagnostics;

    fn run(conv: &mut OpnClockConverter, writes: &[(u8, u8, u8)]) -> Vec<(u8, u8, u8)> {
        let kind = conv.source().kind;
        writes
            .iter()
            .flat_map(|(p, a, d)| conv.convert(&Command::write(kind, 0, *p, *a, *d), &mut NullDiagnostics))
            .filter_map(|c| match c {
                Command::Write(w) => Some((w.port, w.addr, w.data)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_fnum_rescale_both_ports() {
        let from = ChipDescriptor::new(ChipKind::Ym2612, 7670454.0);
        let mut conv = OpnClockConverter::new(from, 7670454.0 * 2.0);
        let out = run(&mut conv, &[(1, 0xA5, 0x22), (1, 0xA1, 0x6A)]);
        // 0x26A / 2 = 0x135, block 4 unchanged
        assert_eq!(&out[2..], &[(1, 0xA5, 0x21), (1, 0xA1, 0x35)]);
    }

    #[test]
    fn test_lower_clock_raises_block_and_saturates() {
        let from = ChipDescriptor::new(ChipKind::Ym2203, 4000000.0);
        let mut conv = OpnClockConverter::new(from, 2000000.0);
        let out = run(&mut conv, &[(0, 0xA4, 0x1E), (0, 0xA0, 0x00)]);
        // block 3, F-number 0x600 doubled overflows: block 4, 0x600
        assert_eq!(&out[2..], &[(0, 0xA4, 0x26), (0, 0xA0, 0x00)]);

        let out = run(&mut conv, &[(0, 0xA5, 0x3E), (0, 0xA1, 0x00)]);
        assert_eq!(&out[2..], &[(0, 0xA5, 0x3F), (0, 0xA1, 0xFF)]);
    }

    #[test]
    fn test_ssg_part_uses_psg_rescale() {
        let from = ChipDescriptor::new(ChipKind::Ym2203, 4000000.0);
        let mut conv = OpnClockConverter::new(from, 8000000.0);
        assert_eq!(run(&mut conv, &[(0, 0x00, 0x40)]), vec![(0, 0x00, 0x80), (0, 0x01, 0x00)]);

        let fm_only = ChipDescriptor::parse("ym2203.fm", 4000000.0).unwrap();
        let mut conv = OpnClockConverter::new(fm_only, 8000000.0);
        assert_eq!(run(&mut conv, &[(0, 0x00, 0x40)]), vec![(0, 0x00, 0x40)]);
    }

    #[test]
    fn test_other_registers_untouched() {
        let from = ChipDescriptor::new(ChipKind::Ym2612, 7670454.0);
        let mut conv = OpnClockConverter::new(from, 8000000.0);
        assert_eq!(run(&mut conv, &[(0, 0x28, 0xF0)]), vec![(0, 0x28, 0xF0)]);
        assert_eq!(run(&mut conv, &[(0, 0x40, 0x7F)]), vec![(0, 0x40, 0x7F)]);
    }
}
