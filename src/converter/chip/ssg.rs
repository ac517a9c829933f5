//! Moves PSG writes between a stand-alone AY-3-8910 and the SSG part of
//! the YM2203/YM2608. The register sets are identical; only the clocks
//! differ by the chip's PSG divider.

use super::{destination, psg_clock_divider};
use crate::chips::{ChipDescriptor, ChipKind, SubModule};
use crate::converter::{Converter, Diagnostics};
use crate::vgm::{Command, WriteRegister};

/// SSG part of an OPN chip to a stand-alone AY-3-8910. FM writes are
/// dropped unless the source is restricted to its SSG part.
pub struct SsgToAy8910Converter {
    from: ChipDescriptor,
    to: ChipDescriptor,
}

impl SsgToAy8910Converter {
    pub fn clock_ratio(from: ChipKind, _to: ChipKind) -> f64 {
        1.0 / psg_clock_divider(from)
    }

    pub fn new(from: ChipDescriptor) -> Self {
        let to = destination(&from, ChipKind::Ay8910, Self::clock_ratio(from.kind, ChipKind::Ay8910));
        Self { from, to }
    }
}

impl Converter for SsgToAy8910Converter {
    fn source(&self) -> &ChipDescriptor {
        &self.from
    }

    fn destination(&self) -> &ChipDescriptor {
        &self.to
    }

    fn convert(&mut self, cmd: &Command, _diag: &mut dyn Diagnostics) -> Vec<Command> {
        let Some(w) = cmd.write_for(self.from.kind, self.from.index) else {
            return vec![cmd.clone()];
        };
        if w.addr < 0x10 && w.port == 0 {
            if self.from.includes(SubModule::Ssg) {
                return vec![Command::write(ChipKind::Ay8910, self.to.index, 0, w.addr, w.data)];
            }
        } else if self.from.includes(SubModule::Fm) {
            return Vec::new();
        }
        vec![cmd.clone()]
    }
}

/// Stand-alone AY-3-8910 to the SSG part of a YM2203 or YM2608
pub struct Ay8910ToSsgConverter {
    from: ChipDescriptor,
    to: ChipDescriptor,
}

impl Ay8910ToSsgConverter {
    pub fn clock_ratio(_from: ChipKind, to: ChipKind) -> f64 {
        psg_clock_divider(to)
    }

    pub fn new(from: ChipDescriptor, to: ChipKind) -> Self {
        let to = destination(&from, to, Self::clock_ratio(from.kind, to));
        Self { from, to }
    }
}

impl Converter for Ay8910ToSsgConverter {
    fn source(&self) -> &ChipDescriptor {
        &self.from
    }

    fn destination(&self) -> &ChipDescriptor {
        &self.to
    }

    fn convert(&mut self, cmd: &Command, _diag: &mut dyn Diagnostics) -> Vec<Command> {
        match cmd.write_for(ChipKind::Ay8910, self.from.index) {
            Some(w) if w.addr < 0x10 => vec![Command::Write(WriteRegister {
                chip: self.to.kind,
                index: self.to.index,
                ..*w
            })],
            Some(w) => {
                log::debug!("dropping write to AY register {:#04x}", w.addr);
                Vec::new()
            }
            None => vec![cmd.clone()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::NullDiagnostics;

    #[test]
    fn test_ssg_to_ay_clock_and_routing() {
        let from = ChipDescriptor::new(ChipKind::Ym2608, 7987200.0);
        let mut conv = SsgToAy8910Converter::new(from);
        assert_eq!(conv.destination().clock, 1996800.0);

        let ssg = Command::write(ChipKind::Ym2608, 0, 0, 0x08, 0x0F);
        let out = conv.convert(&ssg, &mut NullDiagnostics);
        assert_eq!(out, vec![Command::write(ChipKind::Ay8910, 0, 0, 0x08, 0x0F)]);

        let fm = Command::write(ChipKind::Ym2608, 0, 1, 0xA0, 0x44);
        assert!(conv.convert(&fm, &mut NullDiagnostics).is_empty());
    }

    #[test]
    fn test_ssg_only_source_keeps_fm() {
        let from = ChipDescriptor::parse("ym2203.ssg", 4000000.0).unwrap();
        let mut conv = SsgToAy8910Converter::new(from);
        let fm = Command::write(ChipKind::Ym2203, 0, 0, 0x28, 0xF0);
        assert_eq!(conv.convert(&fm, &mut NullDiagnostics), vec![fm]);
    }

    #[test]
    fn test_ay_to_ssg() {
        let from = ChipDescriptor::new(ChipKind::Ay8910, 1789772.5).with_index(1);
        let mut conv = Ay8910ToSsgConverter::new(from, ChipKind::Ym2203);
        assert_eq!(conv.destination().clock, 3579545.0);
        let out = conv.convert(&Command::write(ChipKind::Ay8910, 1, 0, 0x07, 0x38), &mut NullDiagnostics);
        assert_eq!(out, vec![Command::write(ChipKind::Ym2203, 1, 0, 0x07, 0x38)]);
    }
}
