//! Chip-to-chip converters
//!
//! Each converter re-encodes the writes of one source chip for a different
//! destination chip. The destination clock is a fixed multiple of the source
//! clock (see the `clock_ratio` functions); the pipeline inserts a clock
//! stage in front when another destination clock is requested.

pub mod ay8910_to_opl;
pub mod ay8910_to_opm;
pub mod opl_retarget;
pub mod opl_to_opll;
pub mod opn_to_opl;
pub mod opn_to_opll;
pub mod opn_to_opm;
pub mod sn76489_to_ay8910;
pub mod sn76489_to_opn;
pub mod ssg;
pub mod ym2413_to_opl;
pub mod ym2413_to_ym2608;

pub use ay8910_to_opl::Ay8910ToOplConverter;
pub use ay8910_to_opm::Ay8910ToOpmConverter;
pub use opl_retarget::OplRetargetConverter;
pub use opl_to_opll::OplToOpllConverter;
pub use opn_to_opl::Ym2203ToOplConverter;
pub use opn_to_opll::OpnToOpllConverter;
pub use opn_to_opm::OpnToOpmConverter;
pub use sn76489_to_ay8910::Sn76489ToAy8910Converter;
pub use sn76489_to_opn::Sn76489ToOpnConverter;
pub use ssg::{Ay8910ToSsgConverter, SsgToAy8910Converter};
pub use ym2413_to_opl::Ym2413ToOplConverter;
pub use ym2413_to_ym2608::Ym2413ToYm2608Converter;

use crate::chips::{ChipDescriptor, ChipKind};
use crate::converter::buffer::WriteBuffer;
use crate::vgm::{Command, WriteRegister};

/// AY volume (0-15) as OPL/OPN total level
pub const PSG_VOLUME_TO_TL: [u8; 16] = [63, 62, 56, 52, 46, 42, 36, 32, 28, 24, 20, 16, 12, 8, 4, 0];

/// Divider between a chip's master clock and its PSG clock
pub fn psg_clock_divider(kind: ChipKind) -> f64 {
    match kind {
        ChipKind::Ym2203 => 2.0,
        ChipKind::Ym2608 => 4.0,
        _ => 1.0,
    }
}

/// Destination descriptor of a chip converter
pub fn destination(from: &ChipDescriptor, to: ChipKind, ratio: f64) -> ChipDescriptor {
    ChipDescriptor::relative(to, from.index, ratio).resolve(from)
}

/// Deduplicating write buffer bound to one destination chip
#[derive(Debug, Clone)]
pub struct ChipWriter {
    kind: ChipKind,
    index: u8,
    buf: WriteBuffer,
}

impl ChipWriter {
    pub fn new(dest: &ChipDescriptor) -> Self {
        Self {
            kind: dest.kind,
            index: dest.index,
            buf: WriteBuffer::new(dest.kind.ports()),
        }
    }

    /// Optimized write on port 0
    pub fn write(&mut self, addr: u8, data: u8) {
        self.write_port(0, addr, data, true);
    }

    /// Unoptimized write on port 0
    pub fn force(&mut self, addr: u8, data: u8) {
        self.write_port(0, addr, data, false);
    }

    pub fn write_port(&mut self, port: u8, addr: u8, data: u8, optimize: bool) {
        let w = WriteRegister::new(self.kind, self.index, port, addr, data);
        self.buf.push(w, optimize);
    }

    /// Write a latched high/low register pair. The high register only takes
    /// effect with the following low write, so both go out when either changed.
    pub fn write_latched(&mut self, port: u8, hi_addr: u8, hi: u8, lo_addr: u8, lo: u8) {
        if self.committed(port, hi_addr) == Some(hi) && self.committed(port, lo_addr) == Some(lo) {
            return;
        }
        self.write_port(port, hi_addr, hi, false);
        self.write_port(port, lo_addr, lo, false);
    }

    pub fn push_command(&mut self, cmd: Command) {
        self.buf.push_command(cmd);
    }

    pub fn committed(&self, port: u8, addr: u8) -> Option<u8> {
        self.buf.committed(port, addr)
    }

    pub fn commit(&mut self) -> Vec<Command> {
        self.buf.commit()
    }
}
