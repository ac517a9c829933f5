//! Re-targeting between OPL and OPL2 family members
//!
//! The register maps agree on everything the source can use, so writes are
//! re-addressed to the destination chip. Y8950 ADPCM and keyboard registers
//! have nowhere to go on other chips and are dropped.

use super::destination;
use crate::chips::{ChipDescriptor, ChipKind};
use crate::converter::{Converter, Diagnostics};
use crate::vgm::{Command, WriteRegister};

pub fn clock_ratio(_from: ChipKind, to: ChipKind) -> f64 {
    match to {
        ChipKind::Ymf262 => 4.0,
        _ => 1.0,
    }
}

fn is_y8950_only(addr: u8) -> bool {
    matches!(addr, 0x07 | 0x09..=0x12)
}

pub struct OplRetargetConverter {
    from: ChipDescriptor,
    to: ChipDescriptor,
}

impl OplRetargetConverter {
    pub fn new(from: ChipDescriptor, to: ChipKind) -> Self {
        let to = destination(&from, to, clock_ratio(from.kind, to));
        Self { from, to }
    }
}

impl Converter for OplRetargetConverter {
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
        if self.from.kind == ChipKind::Y8950 && self.to.kind != ChipKind::Y8950 && is_y8950_only(w.addr) {
            log::debug!("dropping Y8950 register {:#04x}", w.addr);
            return Vec::new();
        }
        vec![Command::Write(WriteRegister::new(
            self.to.kind,
            self.to.index,
            0,
            w.addr,
            w.data,
        ))]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::NullDiagnostics;

    #[test]
    fn test_ym3526_to_ymf262() {
        let from = ChipDescriptor::new(ChipKind::Ym3526, 3579545.0);
        let mut conv = OplRetargetConverter::new(from, ChipKind::Ymf262);
        assert_eq!(conv.destination().clock, 14318180.0);
        let out = conv.convert(&Command::write(ChipKind::Ym3526, 0, 0, 0xA0, 0x44), &mut NullDiagnostics);
        assert_eq!(out, vec![Command::write(ChipKind::Ymf262, 0, 0, 0xA0, 0x44)]);
    }

    #[test]
    fn test_y8950_adpcm_dropped() {
        let from = ChipDescriptor::new(ChipKind::Y8950, 3579545.0);
        let mut conv = OplRetargetConverter::new(from, ChipKind::Ym3812);
        let adpcm = Command::write(ChipKind::Y8950, 0, 0, 0x0F, 0x80);
        assert!(conv.convert(&adpcm, &mut NullDiagnostics).is_empty());
        let other = Command::write(ChipKind::Ym3526, 0, 0, 0x20, 0x01);
        assert_eq!(conv.convert(&other, &mut NullDiagnostics), vec![other]);
    }
}
