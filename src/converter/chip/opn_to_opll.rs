//! OPN family to YM2413
//!
//! FM channels 1-6 play OPLL ROM programs picked per voice. Each distinct
//! voice (by hash of its defining registers) is mapped once, at key-on,
//! through the voice table or the nearest-voice estimate, and reported to
//! the diagnostics sink.
//!
//! For the YM2612 the DAC stream is emulated on OPLL channels 7-9, either
//! by summing three fixed-phase carriers at chosen attenuations or through
//! the OPLL test-mode DAC path.

use std::collections::HashSet;

use super::{destination, ChipWriter};
use crate::chips::{ChipDescriptor, ChipKind, SubModule};
use crate::converter::buffer::RegisterShadow;
use crate::converter::options::{OptionKind, OptionSpec, Options};
use crate::converter::voice::convert::opn_to_opl;
use crate::converter::voice::opn::raw_voice;
use crate::converter::voice::{estimate_opll_voice, voice_hash, OpnVoice, VoiceMapping, VoiceTable};
use crate::converter::{Converter, Diagnostics, VoiceReport};
use crate::vgm::commands::DATA_TYPE_YM2612_PCM;
use crate::vgm::delay::wait_commands;
use crate::vgm::{Command, WriteRegister};

const AUTO_VOICE_MAP: OptionSpec = OptionSpec {
    key: "autoVoiceMap",
    kind: OptionKind::Bool,
    help: "Estimate ROM programs for voices missing from the voice table",
};

pub const OPTIONS: &[OptionSpec] = &[AUTO_VOICE_MAP];

pub const YM2612_OPTIONS: &[OptionSpec] = &[
    OptionSpec {
        key: "decimation",
        kind: OptionKind::Int { min: 0, max: 64 },
        help: "Emit DAC writes for every Nth PCM sample only (0 or 1: every sample)",
    },
    OptionSpec {
        key: "useTestMode",
        kind: OptionKind::Bool,
        help: "Play PCM through the OPLL test-mode DAC; FM is muted",
    },
    AUTO_VOICE_MAP,
];

/// User voices selectable with program 0 or 16 and up in the voice table
const USER_VOICES: [(u8, [u8; 8]); 11] = [
    (0, [0x01, 0x01, 0x1C, 0x07, 0xF0, 0xD7, 0x00, 0x11]),
    (16, [0x22, 0x21, 0x04, 0x07, 0xDB, 0xF6, 0xAB, 0xF6]),
    (17, [0x2F, 0x2F, 0x00, 0x07, 0xF0, 0xC5, 0x00, 0xF5]),
    (18, [0x2F, 0x2F, 0x00, 0x07, 0xF0, 0xF7, 0x00, 0xF7]),
    (19, [0x2F, 0x2F, 0x0D, 0x00, 0xF0, 0xFC, 0x00, 0x25]),
    (20, [0x2F, 0x20, 0x04, 0x07, 0xF0, 0xF7, 0x00, 0xF7]),
    (21, [0x0F, 0x07, 0x00, 0x05, 0xFE, 0xFD, 0x00, 0x3A]),
    (22, [0x0F, 0x02, 0x00, 0x07, 0xF0, 0xFC, 0x00, 0x37]),
    (23, [0x02, 0x10, 0x00, 0x00, 0xFC, 0xC7, 0x80, 0x25]),
    (24, [0x0F, 0x10, 0x0F, 0x00, 0xFC, 0x79, 0xFF, 0x47]),
    (25, [0x02, 0x01, 0x12, 0x00, 0xFE, 0xB6, 0xF0, 0x25]),
];

fn user_voice(program: u8) -> &'static [u8; 8] {
    let entry = USER_VOICES.iter().find(|(p, _)| *p == program).unwrap_or(&USER_VOICES[0]);
    &entry.1
}

/// First OPLL channel used for the DAC
const PCM_CHANNEL: u8 = 6;

/// Phase generator rate while the DAC carriers are being positioned
const PCM_SETUP_FNUM: u8 = 32;

pub fn clock_ratio(from: ChipKind, _to: ChipKind) -> f64 {
    match from {
        ChipKind::Ym2203 => 1.0,
        _ => 0.5,
    }
}

/// Attenuations (0-15, 3 dB steps) of three unit carriers whose sum best
/// approximates each DAC level `idx / 768 * 3`, for idx in steps of 8.
pub fn dac_table() -> Vec<[u8; 3]> {
    let amp = |a: u8| 10f64.powf(-3.0 * a as f64 / 20.0);
    (0..=768)
        .step_by(8)
        .map(|idx| {
            let target = idx as f64 / 768.0 * 3.0;
            let mut best = ([15u8; 3], f64::INFINITY);
            for a0 in 0..16u8 {
                for a1 in a0..16 {
                    for a2 in a1..16 {
                        let err = (amp(a0) + amp(a1) + amp(a2) - target).abs();
                        if err < best.1 {
                            best = ([a0, a1, a2], err);
                        }
                    }
                }
            }
            best.0
        })
        .collect()
}

#[derive(Debug)]
struct Dac {
    pcm: Vec<u8>,
    cursor: usize,
    div: u32,
    decimation: u32,
    test_mode: bool,
    table: Vec<[u8; 3]>,
}

#[derive(Debug, Clone)]
struct ChannelVoice {
    hash: String,
    mapping: VoiceMapping,
}

pub struct OpnToOpllConverter {
    from: ChipDescriptor,
    to: ChipDescriptor,
    out: ChipWriter,
    regs: RegisterShadow,
    table: VoiceTable,
    voices: [Option<ChannelVoice>; 6],
    seen: HashSet<String>,
    key_on: [bool; 6],
    /// Block in bits 9-11, 9-bit F-number below
    blk_fnum: [u16; 6],
    dac: Option<Dac>,
}

impl OpnToOpllConverter {
    pub fn new(from: ChipDescriptor, opts: &Options, voices: &VoiceTable) -> Self {
        let to = destination(&from, ChipKind::Ym2413, clock_ratio(from.kind, ChipKind::Ym2413));
        let mut table = voices.clone();
        table.auto_estimate = opts.bool("autoVoiceMap", table.auto_estimate);
        let dac = (from.kind == ChipKind::Ym2612).then(|| {
            let test_mode = opts.bool("useTestMode", false);
            Dac {
                pcm: Vec::new(),
                cursor: 0,
                div: 0,
                decimation: opts.int("decimation", 0) as u32,
                test_mode,
                table: if test_mode { Vec::new() } else { dac_table() },
            }
        });
        Self {
            from,
            to,
            out: ChipWriter::new(&to),
            regs: RegisterShadow::new(from.kind.ports()),
            table,
            voices: std::array::from_fn(|_| None),
            seen: HashSet::new(),
            key_on: [false; 6],
            blk_fnum: [0; 6],
            dac,
        }
    }

    fn test_mode(&self) -> bool {
        self.dac.as_ref().is_some_and(|dac| dac.test_mode)
    }

    fn port_channel(ch: usize) -> (u8, u8) {
        ((ch / 3) as u8, (ch % 3) as u8)
    }

    fn mapping(&self, ch: usize) -> VoiceMapping {
        self.voices[ch].as_ref().map_or(VoiceMapping::FALLBACK, |v| v.mapping)
    }

    fn identify_voice(&mut self, ch: usize, diag: &mut dyn Diagnostics) {
        let (port, nch) = Self::port_channel(ch);
        let raw = raw_voice(&self.regs, port, nch);
        let hash = voice_hash(&raw);
        if self.voices[ch].as_ref().is_some_and(|v| v.hash == hash) {
            return;
        }
        let mapping = match self.table.get(&hash) {
            Some(mapping) => mapping,
            None => {
                let estimated = if self.table.auto_estimate {
                    let [opl, _] = opn_to_opl(&OpnVoice::from_raw(&raw), true);
                    estimate_opll_voice(&opl)
                } else {
                    None
                };
                let mapping = estimated.unwrap_or(VoiceMapping::FALLBACK);
                if self.seen.insert(hash.clone()) {
                    diag.voice_estimated(&VoiceReport {
                        chip: self.from.kind,
                        channel: ch as u8,
                        hash: hash.clone(),
                        mapping,
                    });
                }
                mapping
            }
        };
        self.voices[ch] = Some(ChannelVoice { hash, mapping });
    }

    fn update_volume(&mut self, ch: usize, diag: &mut dyn Diagnostics) {
        if self.voices[ch].is_none() {
            self.identify_voice(ch, diag);
        }
        let (port, nch) = Self::port_channel(ch);
        let amps: [u32; 4] = [0x40, 0x44, 0x48, 0x4C].map(|a| (self.regs.value(port, a + nch) & 0x7F) as u32);
        // register order S1, S3, S2, S4; carriers depend on the algorithm
        let vol = match self.regs.value(port, 0xB0 + nch) & 7 {
            4 => (amps[2] + amps[3]) / 2,
            5 | 6 => (amps[1] + amps[2] + amps[3]) / 3,
            7 => amps.iter().sum::<u32>() / 4,
            _ => amps[3],
        };
        let mapping = self.mapping(ch);
        let vv = ((vol >> 3) as i32 + mapping.volume_offset as i32).clamp(0, 15) as u8;
        let ch = ch as u8;
        if (1..16).contains(&mapping.program) {
            self.out.write(0x30 + ch, (mapping.program << 4) | vv);
        } else {
            for (i, &b) in user_voice(mapping.program).iter().enumerate() {
                self.out.write(i as u8, b);
            }
            self.out.write(0x30 + ch, vv);
        }
    }

    fn write_key_block_fnum(&mut self, ch: usize) {
        let blk = (self.blk_fnum[ch] >> 9) as i32;
        let fnum = self.blk_fnum[ch] & 0x1FF;
        let blk = (blk + self.mapping(ch).octave_offset as i32).clamp(0, 7) as u8;
        let key = u8::from(self.key_on[ch]);
        let ch = ch as u8;
        self.out.write(0x20 + ch, (key << 4) | (blk << 1) | (fnum >> 8) as u8);
        self.out.write(0x10 + ch, (fnum & 0xFF) as u8);
    }

    fn convert_fm(&mut self, w: &WriteRegister, diag: &mut dyn Diagnostics) {
        self.regs.set(w.port, w.addr, w.data);
        let nch = w.addr & 3;
        match w.addr {
            0x28 if w.port == 0 => {
                let nch = w.data & 3;
                if nch == 3 {
                    return;
                }
                let ch = (nch + if w.data & 4 != 0 { 3 } else { 0 }) as usize;
                if ch >= self.key_on.len() {
                    return;
                }
                let key = w.data >> 4 != 0;
                if key != self.key_on[ch] {
                    if key {
                        self.identify_voice(ch, diag);
                        self.update_volume(ch, diag);
                    }
                    self.key_on[ch] = key;
                }
                self.write_key_block_fnum(ch);
            }
            0x40..=0x4F if nch != 3 => self.update_volume((w.port * 3 + nch) as usize, diag),
            0xA0..=0xA2 => {
                let ch = (w.port * 3 + nch) as usize;
                let hi = self.regs.value(w.port, 0xA4 + nch);
                let fnum = ((((hi & 7) as u16) << 8) | w.data as u16) >> 2;
                self.blk_fnum[ch] = (((hi >> 3) & 7) as u16) << 9 | fnum;
                self.write_key_block_fnum(ch);
            }
            _ => {}
        }
    }

    fn convert_pcm_write(&mut self, wait: u8) -> Vec<Command> {
        let Some(dac) = self.dac.as_mut() else {
            return Vec::new();
        };
        let v = dac.pcm.get(dac.cursor).copied().unwrap_or(0);
        dac.cursor += 1;
        let emit = dac.decimation <= 1 || dac.div % dac.decimation == 0;
        dac.div = dac.div.wrapping_add(1);
        if emit {
            if dac.test_mode {
                let vv = 47 + (208.0 * v as f64 / 255.0).round() as u8;
                for i in 0..3 {
                    self.out.force(0x10 + PCM_CHANNEL + i, vv);
                }
            } else {
                let idx = (v as usize * 4).min(768) & 0x3F8;
                let vs = dac.table[idx / 8];
                for i in 0..3 {
                    self.out.force(0x38 - i as u8, 0x80 | vs[2 - i]);
                }
            }
        }
        if wait >= 1 {
            self.out.push_command(Command::WaitNibble { count: wait });
        }
        self.out.commit()
    }

    fn ym2612_initial_commands(&mut self, test_mode: bool) {
        // nine melodic channels
        self.out.force(0x0E, 0x00);
        if test_mode {
            self.out.force(0x0F, 0x04);
            // saw-like user voice
            for (addr, data) in [(1, 0x2C), (0, 0x2C), (2, 0x28), (3, 0x07), (4, 0xF0), (5, 0xF0), (6, 0x0F), (7, 0x0F)] {
                self.out.force(addr, data);
            }
            for i in 0..3 {
                self.out.force(0x30 + PCM_CHANNEL + i, 0x00);
            }
            for i in 0..3 {
                self.out.force(0x20 + PCM_CHANNEL + i, 0x1E);
            }
            return;
        }
        for i in 0..3 {
            self.out.force(0x20 + PCM_CHANNEL + i, 0x00);
        }
        // violin: modulator attack rate 15
        for i in 0..3 {
            self.out.force(0x30 + PCM_CHANNEL + i, (1 << 4) | 15);
        }
        for i in 0..3 {
            self.out.force(0x10 + PCM_CHANNEL + i, PCM_SETUP_FNUM);
        }
        for i in 0..3 {
            self.out.force(0x20 + PCM_CHANNEL + i, 0x10);
        }
        // run the phase generator for a quarter cycle, then freeze it
        let freq = PCM_SETUP_FNUM as f64 * self.to.clock / 72.0 / (1 << 19) as f64;
        for wait in wait_commands((44100.0 / freq / 4.0).round() as u64) {
            self.out.push_command(wait);
        }
        for i in 0..3 {
            self.out.force(0x10 + PCM_CHANNEL + i, 0x00);
        }
    }
}

impl Converter for OpnToOpllConverter {
    fn source(&self) -> &ChipDescriptor {
        &self.from
    }

    fn destination(&self) -> &ChipDescriptor {
        &self.to
    }

    fn initial_commands(&mut self) -> Vec<Command> {
        match self.dac.as_ref().map(|dac| dac.test_mode) {
            Some(test_mode) => self.ym2612_initial_commands(test_mode),
            // six FM channels and rhythm
            None => self.out.force(0x0E, 0x20),
        }
        self.out.commit()
    }

    fn convert(&mut self, cmd: &Command, diag: &mut dyn Diagnostics) -> Vec<Command> {
        let dac_source = self.dac.is_some() && self.from.includes(SubModule::Dac);
        match cmd {
            Command::Write(w) if w.chip == self.from.kind && w.index == self.from.index => {
                if w.port == 0 && w.addr < 0x10 && self.from.includes(SubModule::Ssg) {
                    log::debug!("dropping SSG register {:#04x}", w.addr);
                    return Vec::new();
                }
                if !self.from.includes(SubModule::Fm) {
                    return vec![cmd.clone()];
                }
                if self.from.sub_module == Some(SubModule::Fm) && w.port == 0 && w.addr == 0x2B {
                    return vec![cmd.clone()];
                }
                if self.test_mode() {
                    return Vec::new();
                }
                self.convert_fm(w, diag);
                self.out.commit()
            }
            Command::DataBlock { data_type, data, .. } if dac_source && *data_type == DATA_TYPE_YM2612_PCM => {
                if let Some(dac) = self.dac.as_mut() {
                    dac.pcm.extend_from_slice(data);
                }
                Vec::new()
            }
            Command::PcmWrite { wait } if dac_source => self.convert_pcm_write(*wait),
            Command::SeekPcm { offset } if dac_source => {
                if let Some(dac) = self.dac.as_mut() {
                    dac.cursor = *offset as usize;
                }
                Vec::new()
            }
            _ => vec![cmd.clone()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::chip::testing::writes0;
    use crate::converter::NullDiagnostics;

    fn fm(kind: ChipKind, port: u8, addr: u8, data: u8) -> Command {
        Command::write(kind, 0, port, addr, data)
    }

    fn no_estimate() -> VoiceTable {
        VoiceTable {
            auto_estimate: false,
            ..VoiceTable::new()
        }
    }

    #[test]
    fn test_key_on_programs_channel() {
        let from = ChipDescriptor::new(ChipKind::Ym2203, 3579545.0);
        let mut conv = OpnToOpllConverter::new(from, &Options::new(), &no_estimate());
        assert_eq!(conv.destination().clock, 3579545.0);
        let init = conv.initial_commands();
        assert_eq!(init, vec![Command::write(ChipKind::Ym2413, 0, 0, 0x0E, 0x20)]);

        let mut reports: Vec<VoiceReport> = Vec::new();
        let cmds = [
            fm(ChipKind::Ym2203, 0, 0x4C, 0x20),
            fm(ChipKind::Ym2203, 0, 0xA4, 0x24),
            fm(ChipKind::Ym2203, 0, 0xA0, 0x88),
            fm(ChipKind::Ym2203, 0, 0x28, 0xF0),
        ];
        let out: Vec<(u8, u8)> = cmds
            .iter()
            .flat_map(|c| conv.convert(c, &mut reports))
            .filter_map(|c| match c {
                Command::Write(w) => Some((w.addr, w.data)),
                _ => None,
            })
            .collect();
        assert_eq!(out, vec![(0x30, 0x14), (0x20, 0x09), (0x10, 0x22), (0x20, 0x19)]);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].channel, 0);
        assert_eq!(reports[0].mapping, VoiceMapping::FALLBACK);
        assert_eq!(reports[0].hash.len(), 60);
    }

    #[test]
    fn test_voice_table_override() {
        let hash = format!("{}20{}", "00".repeat(7), "00".repeat(22));
        let mut table = no_estimate();
        table.voices.insert(
            hash,
            VoiceMapping {
                program: 5,
                volume_offset: 2,
                octave_offset: 1,
            },
        );
        let from = ChipDescriptor::new(ChipKind::Ym2203, 3579545.0);
        let mut conv = OpnToOpllConverter::new(from, &Options::new(), &table);
        let mut reports: Vec<VoiceReport> = Vec::new();
        let mut out = Vec::new();
        for c in [
            fm(ChipKind::Ym2203, 0, 0x4C, 0x20),
            fm(ChipKind::Ym2203, 0, 0xA4, 0x24),
            fm(ChipKind::Ym2203, 0, 0xA0, 0x88),
        ] {
            out.extend(conv.convert(&c, &mut reports));
        }
        assert!(reports.is_empty());
        assert_eq!(out[0], Command::write(ChipKind::Ym2413, 0, 0, 0x30, 0x56));
        assert_eq!(out[1], Command::write(ChipKind::Ym2413, 0, 0, 0x20, 0x0B));
    }

    #[test]
    fn test_user_voice_program() {
        let hash = format!("{}20{}", "00".repeat(7), "00".repeat(22));
        let mut table = no_estimate();
        table.voices.insert(
            hash,
            VoiceMapping {
                program: 0,
                volume_offset: 0,
                octave_offset: 0,
            },
        );
        let from = ChipDescriptor::new(ChipKind::Ym2203, 3579545.0);
        let mut conv = OpnToOpllConverter::new(from, &Options::new(), &table);
        let out = writes0(&mut conv, &[fm(ChipKind::Ym2203, 0, 0x4C, 0x20)]);
        assert_eq!(out.len(), 9);
        assert_eq!(out[0], (0x00, 0x01));
        assert_eq!(out[8], (0x30, 0x04));
    }

    #[test]
    fn test_second_port_uses_own_channel() {
        let from = ChipDescriptor::new(ChipKind::Ym2608, 7987200.0);
        let mut conv = OpnToOpllConverter::new(from, &Options::new(), &no_estimate());
        assert_eq!(conv.destination().clock, 3993600.0);
        let out = writes0(&mut conv, &[fm(ChipKind::Ym2608, 1, 0x4D, 0x40)]);
        assert_eq!(out, vec![(0x34, 0x18)]);
        // SSG is not converted
        assert!(writes0(&mut conv, &[fm(ChipKind::Ym2608, 0, 0x08, 0x0F)]).is_empty());
    }

    #[test]
    fn test_auto_voice_map_option_overrides_table() {
        let opts = Options::validate(&[("autoVoiceMap".to_string(), "off".to_string())], OPTIONS).unwrap();
        let from = ChipDescriptor::new(ChipKind::Ym2203, 3579545.0);
        let conv = OpnToOpllConverter::new(from, &opts, &VoiceTable::new());
        assert!(!conv.table.auto_estimate);
    }

    #[test]
    fn test_dac_table_endpoints() {
        let table = dac_table();
        assert_eq!(table.len(), 97);
        assert_eq!(table[0], [15, 15, 15]);
        assert_eq!(table[96], [0, 0, 0]);
        assert!(table.iter().all(|t| t[0] <= t[1] && t[1] <= t[2]));
    }

    #[test]
    fn test_decimation_emits_every_nth_sample() {
        let opts = Options::validate(&[("decimation".to_string(), "4".to_string())], YM2612_OPTIONS).unwrap();
        let from = ChipDescriptor::new(ChipKind::Ym2612, 7670454.0);
        let mut conv = OpnToOpllConverter::new(from, &opts, &VoiceTable::new());
        conv.initial_commands();

        let block = Command::DataBlock {
            data_type: DATA_TYPE_YM2612_PCM,
            size: 8,
            data: vec![0x80; 8],
        };
        assert!(conv.convert(&block, &mut NullDiagnostics).is_empty());

        let mut emitted = 0;
        let mut waited = 0;
        for _ in 0..8 {
            let out = conv.convert(&Command::PcmWrite { wait: 1 }, &mut NullDiagnostics);
            if out.iter().any(|c| matches!(c, Command::Write(_))) {
                emitted += 1;
            }
            waited += out
                .iter()
                .filter(|c| matches!(c, Command::WaitNibble { count: 1 }))
                .count();
        }
        assert_eq!(emitted, 2);
        assert_eq!(waited, 8);
    }

    #[test]
    fn test_test_mode_dac() {
        let opts = Options::validate(&[("useTestMode".to_string(), "true".to_string())], YM2612_OPTIONS).unwrap();
        let from = ChipDescriptor::new(ChipKind::Ym2612, 7670454.0);
        let mut conv = OpnToOpllConverter::new(from, &opts, &VoiceTable::new());
        let init = conv.initial_commands();
        assert!(init.contains(&Command::write(ChipKind::Ym2413, 0, 0, 0x0F, 0x04)));

        let block = Command::DataBlock {
            data_type: DATA_TYPE_YM2612_PCM,
            size: 2,
            data: vec![0x00, 0xFF],
        };
        conv.convert(&block, &mut NullDiagnostics);
        let out = writes0(&mut conv, &[Command::PcmWrite { wait: 0 }, Command::PcmWrite { wait: 0 }]);
        assert_eq!(&out[..3], &[(0x16, 47), (0x17, 47), (0x18, 47)]);
        assert_eq!(&out[3..], &[(0x16, 255), (0x17, 255), (0x18, 255)]);

        // FM is muted and the seek rewinds the cursor
        assert!(writes0(&mut conv, &[fm(ChipKind::Ym2612, 0, 0x4C, 0x00)]).is_empty());
        conv.convert(&Command::SeekPcm { offset: 0 }, &mut NullDiagnostics);
        let out = writes0(&mut conv, &[Command::PcmWrite { wait: 0 }]);
        assert_eq!(out[0], (0x16, 47));
    }

    #[test]
    fn test_fm_only_source_passes_dac() {
        let from = ChipDescriptor::parse("ym2612.fm", 7670454.0).unwrap();
        let mut conv = OpnToOpllConverter::new(from, &Options::new(), &VoiceTable::new());
        let dac_enable = fm(ChipKind::Ym2612, 0, 0x2B, 0x80);
        assert_eq!(conv.convert(&dac_enable, &mut NullDiagnostics), vec![dac_enable]);
        let pcm = Command::PcmWrite { wait: 2 };
        assert_eq!(conv.convert(&pcm, &mut NullDiagnostics), vec![pcm]);
    }
}
