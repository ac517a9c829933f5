//! OPL family F-number rescaling

use super::ClockStage;
use crate::chips::ChipDescriptor;
use crate::converter::buffer::{RegisterShadow, WriteBuffer};
use crate::converter::freq::rescale_block_fnum;
use crate::converter::{Converter, Diagnostics};
use crate::vgm::{Command, WriteRegister};

pub struct OplClockConverter {
    stage: ClockStage,
    regs: RegisterShadow,
    buf: WriteBuffer,
}

impl OplClockConverter {
    pub fn new(from: ChipDescriptor, to_clock: f64) -> Self {
        let ports = from.kind.ports();
        Self {
            stage: ClockStage::new(from, to_clock),
            regs: RegisterShadow::new(ports),
            buf: WriteBuffer::new(ports),
        }
    }

    fn convert_write(&mut self, w: &WriteRegister) -> Vec<Command> {
        let is_freq = matches!(w.addr, 0xA0..=0xA8 | 0xB0..=0xB8);
        if self.stage.is_identity() || !is_freq {
            return vec![Command::Write(*w)];
        }
        self.regs.set(w.port, w.addr, w.data);
        let al = w.addr & 0xAF;
        let ah = al + 0x10;
        let hi = self.regs.value(w.port, ah);
        let fnum = (((hi & 3) as u16) << 8) | self.regs.value(w.port, al) as u16;
        let (blk, fnum) = rescale_block_fnum((hi >> 2) & 7, fnum, self.stage.ratio, 0x3FF);
        let dh = (hi & 0xE0) | (blk << 2) | (fnum >> 8) as u8;
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

impl Converter for OplClockConverter {
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
