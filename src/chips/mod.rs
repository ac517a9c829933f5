//! Sound chip identities and descriptors

use crate::error::{Error, Result};
use crate::vgm::header::offset;
use serde::Serialize;
use std::fmt;

/// Sound chips known to the converter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChipKind {
    Sn76489,
    Ym2413,
    Ym2612,
    Ym2151,
    Ym2203,
    Ym2608,
    Ym3812,
    Ym3526,
    Y8950,
    Ymf262,
    Ay8910,
}

impl ChipKind {
    pub const ALL: [ChipKind; 11] = [
        ChipKind::Sn76489,
        ChipKind::Ym2413,
        ChipKind::Ym2612,
        ChipKind::Ym2151,
        ChipKind::Ym2203,
        ChipKind::Ym2608,
        ChipKind::Ym3812,
        ChipKind::Ym3526,
        ChipKind::Y8950,
        ChipKind::Ymf262,
        ChipKind::Ay8910,
    ];

    /// Lowercase chip name as used on the command line
    pub fn name(self) -> &'static str {
        match self {
            ChipKind::Sn76489 => "sn76489",
            ChipKind::Ym2413 => "ym2413",
            ChipKind::Ym2612 => "ym2612",
            ChipKind::Ym2151 => "ym2151",
            ChipKind::Ym2203 => "ym2203",
            ChipKind::Ym2608 => "ym2608",
            ChipKind::Ym3812 => "ym3812",
            ChipKind::Ym3526 => "ym3526",
            ChipKind::Y8950 => "y8950",
            ChipKind::Ymf262 => "ymf262",
            ChipKind::Ay8910 => "ay8910",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        let lower = name.to_ascii_lowercase();
        ChipKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == lower)
            .ok_or_else(|| Error::UnknownChip(name.to_string()))
    }

    /// Clock used when the caller does not ask for one
    pub fn default_clock(self) -> f64 {
        match self {
            ChipKind::Sn76489 => 3579545.0,
            ChipKind::Ym2413 => 3579545.0,
            ChipKind::Ym2612 => 7670454.0,
            ChipKind::Ym2151 => 4000000.0,
            ChipKind::Ym2203 => 4000000.0,
            ChipKind::Ym2608 => 7987200.0,
            ChipKind::Ym3812 | ChipKind::Ym3526 | ChipKind::Y8950 => 3579545.0,
            ChipKind::Ymf262 => 14318180.0,
            ChipKind::Ay8910 => 3579545.0 / 2.0,
        }
    }

    /// Number of register ports the chip exposes
    pub fn ports(self) -> usize {
        match self {
            ChipKind::Ym2612 | ChipKind::Ym2608 | ChipKind::Ymf262 => 2,
            _ => 1,
        }
    }

    /// Whether the chip belongs to the OPL family
    pub fn is_opl(self) -> bool {
        matches!(
            self,
            ChipKind::Ym3812 | ChipKind::Ym3526 | ChipKind::Y8950 | ChipKind::Ymf262
        )
    }

    /// Whether the chip belongs to the OPN family
    pub fn is_opn(self) -> bool {
        matches!(self, ChipKind::Ym2203 | ChipKind::Ym2608 | ChipKind::Ym2612)
    }

    /// VGM opcode for a register write on the given device index and port
    pub fn opcode(self, index: u8, port: u8) -> u8 {
        let port = port.min(self.ports() as u8 - 1);
        match self {
            ChipKind::Sn76489 => {
                if index == 0 {
                    0x50
                } else {
                    0x30
                }
            }
            ChipKind::Ay8910 => 0xA0,
            _ => {
                let base = match self {
                    ChipKind::Ym2413 => 0x51,
                    ChipKind::Ym2612 => 0x52,
                    ChipKind::Ym2151 => 0x54,
                    ChipKind::Ym2203 => 0x55,
                    ChipKind::Ym2608 => 0x56,
                    ChipKind::Ym3812 => 0x5A,
                    ChipKind::Ym3526 => 0x5B,
                    ChipKind::Y8950 => 0x5C,
                    _ => 0x5E,
                };
                base + port + if index == 0 { 0 } else { 0x50 }
            }
        }
    }

    /// Decode a two-operand register write opcode into (chip, index, port)
    pub fn from_opcode(op: u8) -> Option<(ChipKind, u8, u8)> {
        let (base, index) = match op {
            0x51..=0x5F => (op, 0),
            0xA1..=0xAF => (op - 0x50, 1),
            _ => return None,
        };
        let (kind, port) = match base {
            0x51 => (ChipKind::Ym2413, 0),
            0x52 => (ChipKind::Ym2612, 0),
            0x53 => (ChipKind::Ym2612, 1),
            0x54 => (ChipKind::Ym2151, 0),
            0x55 => (ChipKind::Ym2203, 0),
            0x56 => (ChipKind::Ym2608, 0),
            0x57 => (ChipKind::Ym2608, 1),
            0x5A => (ChipKind::Ym3812, 0),
            0x5B => (ChipKind::Ym3526, 0),
            0x5C => (ChipKind::Y8950, 0),
            0x5E => (ChipKind::Ymf262, 0),
            0x5F => (ChipKind::Ymf262, 1),
            _ => return None,
        };
        Some((kind, index, port))
    }

    /// Byte offset of this chip's clock field in the VGM header
    pub fn header_clock_offset(self) -> usize {
        match self {
            ChipKind::Sn76489 => offset::SN76489_CLOCK,
            ChipKind::Ym2413 => offset::YM2413_CLOCK,
            ChipKind::Ym2612 => offset::YM2612_CLOCK,
            ChipKind::Ym2151 => offset::YM2151_CLOCK,
            ChipKind::Ym2203 => offset::YM2203_CLOCK,
            ChipKind::Ym2608 => offset::YM2608_CLOCK,
            ChipKind::Ym3812 => offset::YM3812_CLOCK,
            ChipKind::Ym3526 => offset::YM3526_CLOCK,
            ChipKind::Y8950 => offset::Y8950_CLOCK,
            ChipKind::Ymf262 => offset::YMF262_CLOCK,
            ChipKind::Ay8910 => offset::AY8910_CLOCK,
        }
    }
}

impl fmt::Display for ChipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Functional slice of a combined chip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubModule {
    Fm,
    Ssg,
    Adpcm,
    Dac,
}

impl SubModule {
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "fm" => Ok(SubModule::Fm),
            "ssg" => Ok(SubModule::Ssg),
            "adpcm" => Ok(SubModule::Adpcm),
            "dac" => Ok(SubModule::Dac),
            _ => Err(Error::UnknownChip(name.to_string())),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SubModule::Fm => "fm",
            SubModule::Ssg => "ssg",
            SubModule::Adpcm => "adpcm",
            SubModule::Dac => "dac",
        }
    }
}

/// Identity of one chip taking part in a conversion stage.
///
/// When `relative_clock` is set, `clock` is a multiplier applied to the
/// source clock instead of an absolute frequency in Hz.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChipDescriptor {
    pub kind: ChipKind,
    pub sub_module: Option<SubModule>,
    pub index: u8,
    pub clock: f64,
    pub relative_clock: bool,
}

impl ChipDescriptor {
    pub fn new(kind: ChipKind, clock: f64) -> Self {
        Self {
            kind,
            sub_module: None,
            index: 0,
            clock,
            relative_clock: false,
        }
    }

    /// Destination whose clock is `ratio` times the source clock
    pub fn relative(kind: ChipKind, index: u8, ratio: f64) -> Self {
        Self {
            kind,
            sub_module: None,
            index,
            clock: ratio,
            relative_clock: true,
        }
    }

    /// Parse `chip[.sub]`, e.g. `ym2203.fm`
    pub fn parse(spec: &str, clock: f64) -> Result<Self> {
        let (name, sub) = match spec.split_once('.') {
            Some((name, sub)) => (name, Some(SubModule::from_name(sub)?)),
            None => (spec, None),
        };
        Ok(Self {
            sub_module: sub,
            ..Self::new(ChipKind::from_name(name)?, clock)
        })
    }

    pub fn with_clock(&self, clock: f64) -> Self {
        Self {
            clock,
            relative_clock: false,
            ..*self
        }
    }

    pub fn with_index(&self, index: u8) -> Self {
        Self { index, ..*self }
    }

    pub fn with_sub_module(&self, sub_module: Option<SubModule>) -> Self {
        Self {
            sub_module,
            ..*self
        }
    }

    /// Absolute descriptor this destination denotes for the given source
    pub fn resolve(&self, source: &ChipDescriptor) -> ChipDescriptor {
        let clock = if self.relative_clock {
            source.clock * self.clock
        } else {
            self.clock
        };
        ChipDescriptor {
            kind: self.kind,
            sub_module: None,
            index: self.index,
            clock,
            relative_clock: false,
        }
    }

    /// Whether a sub-module restriction admits the given part
    pub fn includes(&self, part: SubModule) -> bool {
        self.sub_module.is_none() || self.sub_module == Some(part)
    }
}

impl fmt::Display for ChipDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(sub) = self.sub_module {
            write!(f, ".{}", sub.name())?;
        }
        if self.index != 0 {
            write!(f, "#{}", self.index)?;
        }
        write!(f, "({})", self.clock)
    }
}
