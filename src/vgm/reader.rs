//! VGM file reader and parser

use super::commands::{command_size, opcode, Command, WriteRegister};
use super::header::VgmHeader;
use crate::chips::ChipKind;
use crate::error::{Error, Result};

/// A parsed VGM file
#[derive(Debug, Clone)]
pub struct VgmFile {
    pub header: VgmHeader,
    pub commands: Vec<Command>,
    /// Index into `commands` of the command at the loop offset
    pub loop_index: Option<usize>,
    /// Raw GD3 block, including its "Gd3 " magic
    pub gd3: Option<Vec<u8>>,
}

impl VgmFile {
    /// Parse a complete (uncompressed) VGM image
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = VgmReader::new(data);
        let header = reader.parse_header()?;
        let (commands, loop_index) = reader.parse_commands(&header)?;
        let gd3 = reader.gd3_block(&header).map(|b| b.to_vec());
        Ok(Self {
            header,
            commands,
            loop_index,
            gd3,
        })
    }
}

/// VGM file reader
pub struct VgmReader<'a> {
    data: &'a [u8],
    pos: usize,
    end: usize,
}

impl<'a> VgmReader<'a> {
    /// Create a new reader from raw VGM data
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            end: data.len(),
        }
    }

    /// Check if we've reached the end of data
    pub fn is_eof(&self) -> bool {
        self.pos >= self.end
    }

    /// Get current position
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Seek to a position
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Read a single byte
    pub fn read_u8(&mut self) -> Result<u8> {
        if self.pos >= self.end {
            return Err(Error::VgmParse("Unexpected end of data".into()));
        }
        let b = self.data[self.pos];
        self.pos += 1;
        Ok(b)
    }

    /// Read a 16-bit little-endian value
    pub fn read_u16_le(&mut self) -> Result<u16> {
        let lo = self.read_u8()? as u16;
        let hi = self.read_u8()? as u16;
        Ok(lo | (hi << 8))
    }

    /// Read a 32-bit little-endian value
    pub fn read_u32_le(&mut self) -> Result<u32> {
        let lo = self.read_u16_le()? as u32;
        let hi = self.read_u16_le()? as u32;
        Ok(lo | (hi << 16))
    }

    /// Read bytes into a buffer
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        if self.pos + len > self.end {
            return Err(Error::VgmParse("Unexpected end of data".into()));
        }
        let bytes = self.data[self.pos..self.pos + len].to_vec();
        self.pos += len;
        Ok(bytes)
    }

    /// Validate VGM magic and take the header
    pub fn parse_header(&mut self) -> Result<VgmHeader> {
        let header = VgmHeader::from_bytes(self.data)?;
        let eof = header.eof_position();
        self.end = if eof > header.data_start() && eof <= self.data.len() {
            eof
        } else {
            self.data.len()
        };
        if let Some(gd3) = header.gd3_position() {
            if gd3 > header.data_start() && gd3 < self.end {
                self.end = gd3;
            }
        }
        Ok(header)
    }

    /// Raw GD3 block, if the header points at a valid one
    pub fn gd3_block(&self, header: &VgmHeader) -> Option<&'a [u8]> {
        let start = header.gd3_position()?;
        let head = self.data.get(start..start + 12)?;
        if &head[0..4] != b"Gd3 " {
            return None;
        }
        let len = u32::from_le_bytes([head[8], head[9], head[10], head[11]]) as usize;
        self.data.get(start..start + 12 + len)
    }

    /// Parse all commands from the data section.
    ///
    /// Returns the commands and the index of the command sitting at the
    /// header's loop offset.
    pub fn parse_commands(&mut self, header: &VgmHeader) -> Result<(Vec<Command>, Option<usize>)> {
        self.seek(header.data_start());
        let loop_pos = header.loop_position();

        let mut commands = Vec::new();
        let mut loop_index = None;

        while !self.is_eof() {
            if Some(self.pos) == loop_pos {
                loop_index = Some(commands.len());
            }
            let cmd = self.parse_command()?;
            let is_end = cmd.is_end();
            commands.push(cmd);
            if is_end {
                break;
            }
        }

        if loop_pos.is_some() && loop_index.is_none() {
            log::warn!("loop offset does not point at a command boundary; loop dropped");
        }

        Ok((commands, loop_index))
    }

    /// Parse a single VGM command
    fn parse_command(&mut self) -> Result<Command> {
        let op = self.read_u8()?;

        let cmd = match op {
            opcode::SN76489 | opcode::SN76489_2ND => {
                let data = self.read_u8()?;
                let index = if op == opcode::SN76489 { 0 } else { 1 };
                Command::write(ChipKind::Sn76489, index, 0, 0, data)
            }
            opcode::AY8910 => {
                let addr = self.read_u8()?;
                let data = self.read_u8()?;
                Command::write(ChipKind::Ay8910, addr >> 7, 0, addr & 0x7F, data)
            }
            opcode::WAIT_NNNN => Command::Wait {
                samples: self.read_u16_le()?,
            },
            opcode::WAIT_60TH => Command::Wait735,
            opcode::WAIT_50TH => Command::Wait882,
            opcode::END => Command::End,
            opcode::DATA_BLOCK => {
                // 0x67 0x66 tt ss ss ss ss (data)
                let compat = self.read_u8()?;
                if compat != opcode::END {
                    return Err(Error::VgmParse(format!(
                        "Malformed data block at 0x{:X}",
                        self.pos - 2
                    )));
                }
                let data_type = self.read_u8()?;
                let size = self.read_u32_le()?;
                let data = self.read_bytes((size & 0x7FFF_FFFF) as usize)?;
                Command::DataBlock {
                    data_type,
                    size,
                    data,
                }
            }
            0x70..=0x7F => Command::WaitNibble {
                count: op - opcode::WAIT_NIBBLE + 1,
            },
            0x80..=0x8F => Command::PcmWrite {
                wait: op - opcode::YM2612_PCM,
            },
            opcode::SEEK_PCM => Command::SeekPcm {
                offset: self.read_u32_le()?,
            },
            _ => match ChipKind::from_opcode(op) {
                Some((chip, index, port)) => {
                    let addr = self.read_u8()?;
                    let data = self.read_u8()?;
                    Command::Write(WriteRegister::new(chip, index, port, addr, data))
                }
                None => {
                    let bytes = self.read_bytes(command_size(op))?;
                    Command::Raw { opcode: op, bytes }
                }
            },
        };

        Ok(cmd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vgm::commands::encode_all;
    use crate::vgm::header::offset;

    fn build_vgm(body: &[u8], loop_at: Option<usize>) -> Vec<u8> {
        let mut header = VgmHeader::new();
        let start = header.data_start();
        if let Some(rel) = loop_at {
            header.write_u32(offset::LOOP_OFFSET, (start + rel - offset::LOOP_OFFSET) as u32);
        }
        header.write_u32(offset::EOF_OFFSET, (start + body.len() - offset::EOF_OFFSET) as u32);
        let mut file = header.as_bytes().to_vec();
        file.extend_from_slice(body);
        file
    }

    #[test]
    fn test_parse_mixed_stream() {
        let body = [
            0x50, 0x8F, // sn76489
            0xA0, 0x88, 0x0F, // second ay8910, reg 8
            0x53, 0xB4, 0xC0, // ym2612 port 1
            0x62, 0x74, // waits
            0x4F, 0xFF, // gg stereo, kept raw
            0x66,
        ];
        let file = VgmFile::parse(&build_vgm(&body, None)).unwrap();
        assert_eq!(
            file.commands,
            vec![
                Command::write(ChipKind::Sn76489, 0, 0, 0, 0x8F),
                Command::write(ChipKind::Ay8910, 1, 0, 0x08, 0x0F),
                Command::write(ChipKind::Ym2612, 0, 1, 0xB4, 0xC0),
                Command::Wait735,
                Command::WaitNibble { count: 5 },
                Command::Raw {
                    opcode: 0x4F,
                    bytes: vec![0xFF]
                },
                Command::End,
            ]
        );
        assert_eq!(encode_all(&file.commands), body.to_vec());
    }

    #[test]
    fn test_loop_index() {
        let body = [0x51, 0x30, 0x10, 0x62, 0x51, 0x30, 0x20, 0x63, 0x66];
        let file = VgmFile::parse(&build_vgm(&body, Some(4))).unwrap();
        assert_eq!(file.loop_index, Some(2));
    }

    #[test]
    fn test_data_block_payload() {
        let body = [0x67, 0x66, 0x00, 0x03, 0x00, 0x00, 0x00, 0x10, 0x20, 0x30, 0x66];
        let file = VgmFile::parse(&build_vgm(&body, None)).unwrap();
        assert_eq!(
            file.commands[0],
            Command::DataBlock {
                data_type: 0,
                size: 3,
                data: vec![0x10, 0x20, 0x30]
            }
        );
    }

    #[test]
    fn test_rejects_bad_magic() {
        let mut file = build_vgm(&[0x66], None);
        file[0] = b'X';
        assert!(VgmFile::parse(&file).is_err());
    }
}
