//! VGM header layout and access

use crate::chips::ChipKind;
use crate::error::{Error, Result};

/// VGM version written by the converter
pub const VGM_VERSION: u32 = 0x171;

/// Minimum header size written, in bytes
pub const VGM_HEADER_SIZE: usize = 0x100;

/// Dual chip flag in a clock field
pub const DUAL_CHIP_BIT: u32 = 0x4000_0000;

/// VGM header offsets (in bytes)
pub mod offset {
    /// "Vgm " identifier
    pub const IDENT: usize = 0x00;
    /// End of file offset (relative to 0x04)
    pub const EOF_OFFSET: usize = 0x04;
    /// Version number
    pub const VERSION: usize = 0x08;
    /// SN76489 clock
    pub const SN76489_CLOCK: usize = 0x0C;
    /// YM2413 clock
    pub const YM2413_CLOCK: usize = 0x10;
    /// GD3 offset (relative to 0x14)
    pub const GD3_OFFSET: usize = 0x14;
    /// Total samples
    pub const TOTAL_SAMPLES: usize = 0x18;
    /// Loop offset (relative to 0x1C)
    pub const LOOP_OFFSET: usize = 0x1C;
    /// Loop samples
    pub const LOOP_SAMPLES: usize = 0x20;
    /// YM2612 clock
    pub const YM2612_CLOCK: usize = 0x2C;
    /// YM2151 clock
    pub const YM2151_CLOCK: usize = 0x30;
    /// VGM data offset (relative to 0x34)
    pub const DATA_OFFSET: usize = 0x34;
    /// YM2203 clock
    pub const YM2203_CLOCK: usize = 0x44;
    /// YM2608 clock
    pub const YM2608_CLOCK: usize = 0x48;
    /// YM3812 clock
    pub const YM3812_CLOCK: usize = 0x50;
    /// YM3526 clock
    pub const YM3526_CLOCK: usize = 0x54;
    /// Y8950 clock
    pub const Y8950_CLOCK: usize = 0x58;
    /// YMF262 clock
    pub const YMF262_CLOCK: usize = 0x5C;
    /// AY8910 clock
    pub const AY8910_CLOCK: usize = 0x74;
    /// AY8910 chip type
    pub const AY8910_TYPE: usize = 0x78;
    /// Volume modifier
    pub const VOLUME_MODIFIER: usize = 0x7C;
}

/// Clock entry of one chip in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChipClock {
    pub clock: u32,
    pub dual: bool,
}

/// Raw VGM header bytes, from the magic up to the start of command data
#[derive(Debug, Clone)]
pub struct VgmHeader {
    data: Vec<u8>,
}

impl VgmHeader {
    pub fn new() -> Self {
        let mut header = Self {
            data: vec![0; VGM_HEADER_SIZE],
        };
        header.data[offset::IDENT..offset::IDENT + 4].copy_from_slice(b"Vgm ");
        header.write_u32(offset::VERSION, VGM_VERSION);
        header.write_u32(offset::DATA_OFFSET, (VGM_HEADER_SIZE - 0x34) as u32);
        header
    }

    /// Take the header out of a complete VGM file image
    pub fn from_bytes(file: &[u8]) -> Result<Self> {
        if file.len() < 0x40 {
            return Err(Error::VgmParse("File too small for VGM header".into()));
        }
        if &file[0..4] != b"Vgm " {
            return Err(Error::VgmParse("Invalid VGM magic".into()));
        }
        let mut header = Self {
            data: file[..0x40].to_vec(),
        };
        let start = header.data_start();
        if start > file.len() {
            return Err(Error::VgmParse("Data offset beyond end of file".into()));
        }
        header.data = file[..start.max(0x40)].to_vec();
        Ok(header)
    }

    pub fn read_u32(&self, offset: usize) -> u32 {
        match self.data.get(offset..offset + 4) {
            Some(b) => u32::from_le_bytes([b[0], b[1], b[2], b[3]]),
            None => 0,
        }
    }

    pub fn write_u8(&mut self, offset: usize, value: u8) {
        if offset < self.data.len() {
            self.data[offset] = value;
        }
    }

    pub fn write_u32(&mut self, offset: usize, value: u32) {
        if offset + 4 <= self.data.len() {
            self.data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        }
    }

    pub fn version(&self) -> u32 {
        self.read_u32(offset::VERSION)
    }

    /// Absolute file position of the first command
    pub fn data_start(&self) -> usize {
        let rel = self.read_u32(offset::DATA_OFFSET) as usize;
        if self.version() < 0x150 || rel == 0 {
            0x40
        } else {
            offset::DATA_OFFSET + rel
        }
    }

    /// Absolute file position of the loop point, if any
    pub fn loop_position(&self) -> Option<usize> {
        match self.read_u32(offset::LOOP_OFFSET) {
            0 => None,
            rel => Some(offset::LOOP_OFFSET + rel as usize),
        }
    }

    /// Absolute file position of the GD3 tag, if any
    pub fn gd3_position(&self) -> Option<usize> {
        match self.read_u32(offset::GD3_OFFSET) {
            0 => None,
            rel => Some(offset::GD3_OFFSET + rel as usize),
        }
    }

    /// Absolute file position one past the last byte
    pub fn eof_position(&self) -> usize {
        offset::EOF_OFFSET + self.read_u32(offset::EOF_OFFSET) as usize
    }

    pub fn chip_clock(&self, kind: ChipKind) -> Option<ChipClock> {
        let pos = kind.header_clock_offset();
        if pos + 4 > self.data.len() {
            return None;
        }
        match self.read_u32(pos) {
            0 => None,
            raw => Some(ChipClock {
                clock: raw & 0x3FFF_FFFF,
                dual: raw & DUAL_CHIP_BIT != 0,
            }),
        }
    }

    /// Set or clear (`None`) a chip clock, growing the header if needed
    pub fn set_chip_clock(&mut self, kind: ChipKind, clock: Option<ChipClock>) {
        let pos = kind.header_clock_offset();
        let raw = match clock {
            Some(c) => (c.clock & 0x3FFF_FFFF) | if c.dual { DUAL_CHIP_BIT } else { 0 },
            None => 0,
        };
        if pos + 4 > self.data.len() {
            if raw == 0 {
                return;
            }
            self.ensure_size(VGM_HEADER_SIZE);
        }
        self.write_u32(pos, raw);
    }

    /// Grow the header to at least `size` bytes, moving the data offset along
    pub fn ensure_size(&mut self, size: usize) {
        if self.data.len() < size {
            self.data.resize(size, 0);
        }
        let len = self.data.len();
        self.write_u32(offset::DATA_OFFSET, (len - offset::DATA_OFFSET) as u32);
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl Default for VgmHeader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_header_layout() {
        let header = VgmHeader::new();
        assert_eq!(&header.as_bytes()[0..4], b"Vgm ");
        assert_eq!(header.version(), VGM_VERSION);
        assert_eq!(header.data_start(), VGM_HEADER_SIZE);
    }

    #[test]
    fn test_chip_clock_grows_short_header() {
        let mut file = vec![0u8; 0x40];
        file[0..4].copy_from_slice(b"Vgm ");
        file[0x08..0x0C].copy_from_slice(&0x150u32.to_le_bytes());
        file[0x34..0x38].copy_from_slice(&0x0Cu32.to_le_bytes());
        let mut header = VgmHeader::from_bytes(&file).unwrap();
        assert_eq!(header.len(), 0x40);
        assert_eq!(header.chip_clock(ChipKind::Ay8910), None);

        header.set_chip_clock(
            ChipKind::Ay8910,
            Some(ChipClock {
                clock: 1789773,
                dual: true,
            }),
        );
        assert_eq!(header.len(), VGM_HEADER_SIZE);
        assert_eq!(header.data_start(), VGM_HEADER_SIZE);
        assert_eq!(
            header.chip_clock(ChipKind::Ay8910),
            Some(ChipClock {
                clock: 1789773,
                dual: true
            })
        );
    }
}
