//! OPN family to YM2151
//!
//! Both chips share the 4-operator architecture and register order
//! (S1, S3, S2, S4), so operator registers move with an address remap.
//! Pitch goes through the frequency domain into key code and key fraction.
//! The YM2203 SSG plays on OPM channels 5-7.

use super::ay8910_to_opm::Ay8910ToOpmConverter;
use super::{destination, ChipWriter};
use crate::chips::{ChipDescriptor, ChipKind, SubModule};
use crate::converter::buffer::RegisterShadow;
use crate::converter::freq::{freq_to_opm_note, opn_freq, opn_prescaler};
use crate::converter::options::Options;
use crate::converter::{Converter, Diagnostics};
use crate::vgm::{Command, WriteRegister};

pub use super::ay8910_to_opm::OPTIONS;

/// OPN LFO rate (0x22 bits 0-2) as OPM LFRQ
const LFO_FREQ: [u8; 8] = [0xC2, 0xC9, 0xCB, 0xCD, 0xCF, 0xD6, 0xFB, 0xFF];

pub fn clock_ratio(from: ChipKind, _to: ChipKind) -> f64 {
    match from {
        ChipKind::Ym2203 => 1.0,
        _ => 0.5,
    }
}

pub struct OpnToOpmConverter {
    from: ChipDescriptor,
    to: ChipDescriptor,
    out: ChipWriter,
    regs: RegisterShadow,
    ssg: Option<Ay8910ToOpmConverter>,
}

impl OpnToOpmConverter {
    pub fn new(from: ChipDescriptor, opts: &Options) -> Self {
        let to = destination(&from, ChipKind::Ym2151, clock_ratio(from.kind, ChipKind::Ym2151));
        let ssg = (from.kind == ChipKind::Ym2203 && from.includes(SubModule::Ssg))
            .then(|| Ay8910ToOpmConverter::with_destination(from, to, opts));
        Self {
            from,
            to,
            out: ChipWriter::new(&to),
            regs: RegisterShadow::new(from.kind.ports()),
            ssg,
        }
    }

    /// OPM channel of OPN channel `nch` on `port`
    fn channel(port: u8, nch: u8) -> u8 {
        port * 4 + nch
    }

    fn update_pitch(&mut self, port: u8, nch: u8) {
        let hi = self.regs.value(port, 0xA4 + nch);
        let fnum = (((hi & 7) as u16) << 8) | self.regs.value(port, 0xA0 + nch) as u16;
        let freq = opn_freq((hi >> 3) & 7, fnum, self.from.clock, opn_prescaler(self.from.kind));
        let note = freq_to_opm_note(freq, self.to.clock);
        let ch = Self::channel(port, nch);
        self.out.write(0x28 + ch, note.kc);
        self.out.write(0x30 + ch, note.kf);
    }

    fn update_connection(&mut self, port: u8, nch: u8) {
        let rl = if self.from.kind == ChipKind::Ym2203 {
            3
        } else {
            // OPN has L in bit 7, OPM has R in bit 7
            let lr = self.regs.get(port, 0xB4 + nch).unwrap_or(0xC0);
            ((lr >> 7) & 1) | (((lr >> 6) & 1) << 1)
        };
        let fb_con = self.regs.value(port, 0xB0 + nch) & 0x3F;
        self.out.write(0x20 + Self::channel(port, nch), (rl << 6) | fb_con);
    }

    fn convert_fm(&mut self, w: &WriteRegister) {
        self.regs.set(w.port, w.addr, w.data);
        let nch = w.addr & 3;
        match w.addr {
            0x22 if w.port == 0 && self.from.kind != ChipKind::Ym2203 => {
                self.out.write(0x18, LFO_FREQ[(w.data & 7) as usize]);
            }
            0x28 if w.port == 0 => {
                let nch = w.data & 3;
                if nch == 3 {
                    return;
                }
                let port = (w.data >> 2) & 1;
                self.out.force(0x08, ((w.data >> 4) << 3) | Self::channel(port, nch));
            }
            0x30..=0x8F if nch != 3 => {
                let slot = (w.addr >> 2) & 3;
                let base = 0x40 + ((w.addr & 0xF0) - 0x30) * 2;
                self.out.write(base + slot * 8 + Self::channel(w.port, nch), w.data);
            }
            0xA0..=0xA2 => self.update_pitch(w.port, nch),
            0xB0..=0xB2 => self.update_connection(w.port, nch),
            0xB4..=0xB6 => {
                let pms = w.data & 7;
                let ams = (w.data >> 4) & 3;
                self.out.write(0x38 + Self::channel(w.port, nch), (pms << 4) | ams);
                self.update_connection(w.port, nch);
            }
            _ => log::debug!("dropping OPN register {}:{:#04x}", w.port, w.addr),
        }
    }
}

impl Converter for OpnToOpmConverter {
    fn source(&self) -> &ChipDescriptor {
        &self.from
    }

    fn destination(&self) -> &ChipDescriptor {
        &self.to
    }

    fn initial_commands(&mut self) -> Vec<Command> {
        self.out.force(0x18, LFO_FREQ[0]);
        let mut init = self.out.commit();
        if let Some(ssg) = self.ssg.as_mut() {
            init.extend(ssg.initial_commands());
        }
        init
    }

    fn convert(&mut self, cmd: &Command, _diag: &mut dyn Diagnostics) -> Vec<Command> {
        let Some(w) = cmd.write_for(self.from.kind, self.from.index) else {
            return vec![cmd.clone()];
        };
        if w.port == 0 && w.addr < 0x10 && self.from.kind != ChipKind::Ym2612 {
            return match self.ssg.as_mut() {
                Some(ssg) => ssg.convert_write(w),
                None if self.from.includes(SubModule::Ssg) => {
                    log::debug!("dropping SSG register {:#04x}", w.addr);
                    Vec::new()
                }
                None => vec![cmd.clone()],
            };
        }
        if !self.from.includes(SubModule::Fm) {
            return vec![cmd.clone()];
        }
        self.convert_fm(w);
        self.out.commit()
    }
}
