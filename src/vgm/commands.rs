//! VGM command model and byte encoding

use crate::chips::ChipKind;

/// VGM command opcodes
pub mod opcode {
    pub const SN76489: u8 = 0x50;
    pub const SN76489_2ND: u8 = 0x30;
    pub const WAIT_NNNN: u8 = 0x61;
    pub const WAIT_60TH: u8 = 0x62;
    pub const WAIT_50TH: u8 = 0x63;
    pub const END: u8 = 0x66;
    pub const DATA_BLOCK: u8 = 0x67;
    pub const WAIT_NIBBLE: u8 = 0x70;
    pub const YM2612_PCM: u8 = 0x80;
    pub const AY8910: u8 = 0xA0;
    pub const SEEK_PCM: u8 = 0xE0;
}

/// Data block type carrying YM2612 PCM samples
pub const DATA_TYPE_YM2612_PCM: u8 = 0x00;

/// A single register write on one chip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteRegister {
    pub chip: ChipKind,
    pub index: u8,
    pub port: u8,
    pub addr: u8,
    pub data: u8,
}

impl WriteRegister {
    pub fn new(chip: ChipKind, index: u8, port: u8, addr: u8, data: u8) -> Self {
        Self {
            chip,
            index,
            port,
            addr,
            data,
        }
    }

    /// Same write with a different data byte
    pub fn with_data(&self, data: u8) -> Self {
        Self { data, ..*self }
    }

    fn encode(&self, out: &mut Vec<u8>) {
        match self.chip {
            ChipKind::Sn76489 => {
                let op = if self.index == 0 {
                    opcode::SN76489
                } else {
                    opcode::SN76489_2ND
                };
                out.extend_from_slice(&[op, self.data]);
            }
            ChipKind::Ay8910 => {
                let addr = (self.addr & 0x7F) | (self.index << 7);
                out.extend_from_slice(&[opcode::AY8910, addr, self.data]);
            }
            chip => {
                out.extend_from_slice(&[chip.opcode(self.index, self.port), self.addr, self.data]);
            }
        }
    }
}

/// A VGM stream event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Chip register write
    Write(WriteRegister),
    /// Wait n samples (0x61)
    Wait { samples: u16 },
    /// Wait 735 samples (0x62)
    Wait735,
    /// Wait 882 samples (0x63)
    Wait882,
    /// Wait 1-16 samples (0x7n)
    WaitNibble { count: u8 },
    /// Write the next PCM byte to the YM2612 DAC, then wait 0-15 samples (0x8n)
    PcmWrite { wait: u8 },
    /// Data block (0x67)
    DataBlock {
        data_type: u8,
        size: u32,
        data: Vec<u8>,
    },
    /// Seek the PCM data bank cursor (0xE0)
    SeekPcm { offset: u32 },
    /// End of sound data
    End,
    /// Any other command, kept verbatim
    Raw { opcode: u8, bytes: Vec<u8> },
}

impl Command {
    pub fn write(chip: ChipKind, index: u8, port: u8, addr: u8, data: u8) -> Self {
        Command::Write(WriteRegister::new(chip, index, port, addr, data))
    }

    /// Number of samples this command waits
    pub fn samples(&self) -> u32 {
        match self {
            Command::Wait { samples } => *samples as u32,
            Command::Wait735 => 735,
            Command::Wait882 => 882,
            Command::WaitNibble { count } => *count as u32,
            Command::PcmWrite { wait } => *wait as u32,
            _ => 0,
        }
    }

    pub fn is_end(&self) -> bool {
        matches!(self, Command::End)
    }

    /// Register write for the given chip and device index, if this is one
    pub fn write_for(&self, chip: ChipKind, index: u8) -> Option<&WriteRegister> {
        match self {
            Command::Write(w) if w.chip == chip && w.index == index => Some(w),
            _ => None,
        }
    }

    /// Append the VGM byte encoding of this command
    pub fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Command::Write(w) => w.encode(out),
            Command::Wait { samples } => {
                out.push(opcode::WAIT_NNNN);
                out.extend_from_slice(&samples.to_le_bytes());
            }
            Command::Wait735 => out.push(opcode::WAIT_60TH),
            Command::Wait882 => out.push(opcode::WAIT_50TH),
            Command::WaitNibble { count } => {
                out.push(opcode::WAIT_NIBBLE + (*count).clamp(1, 16) - 1);
            }
            Command::PcmWrite { wait } => out.push(opcode::YM2612_PCM + (wait & 0x0F)),
            Command::DataBlock {
                data_type,
                size,
                data,
            } => {
                out.extend_from_slice(&[opcode::DATA_BLOCK, opcode::END, *data_type]);
                out.extend_from_slice(&size.to_le_bytes());
                out.extend_from_slice(data);
            }
            Command::SeekPcm { offset } => {
                out.push(opcode::SEEK_PCM);
                out.extend_from_slice(&offset.to_le_bytes());
            }
            Command::End => out.push(opcode::END),
            Command::Raw { opcode, bytes } => {
                out.push(*opcode);
                out.extend_from_slice(bytes);
            }
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode(&mut out);
        out
    }
}

impl From<WriteRegister> for Command {
    fn from(write: WriteRegister) -> Self {
        Command::Write(write)
    }
}

/// Get the number of bytes to read after the opcode for a fixed-size command
pub fn command_size(opcode: u8) -> usize {
    match opcode {
        0x30..=0x3F | 0x4F | 0x50 => 1,
        0x40..=0x4E => 2,
        0x51..=0x5F | 0xA0..=0xBF => 2,
        0x61 => 2,
        0x62 | 0x63 | 0x66 => 0,
        0x64 => 3,
        0x68 => 11,
        0x70..=0x8F => 0,
        0x90 | 0x91 | 0x95 => 4,
        0x92 => 5,
        0x93 => 10,
        0x94 => 1,
        0xC0..=0xDF => 3,
        0xE0..=0xFF => 4,
        _ => 0,
    }
}

/// Encode a whole command sequence
pub fn encode_all(commands: &[Command]) -> Vec<u8> {
    let mut out = Vec::new();
    for cmd in commands {
        cmd.encode(&mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_writes() {
        let psg = Command::write(ChipKind::Sn76489, 1, 0, 0, 0x9F);
        assert_eq!(psg.to_bytes(), vec![0x30, 0x9F]);

        let ay = Command::write(ChipKind::Ay8910, 1, 0, 0x07, 0x38);
        assert_eq!(ay.to_bytes(), vec![0xA0, 0x87, 0x38]);

        let opn2 = Command::write(ChipKind::Ym2612, 0, 1, 0xA0, 0x12);
        assert_eq!(opn2.to_bytes(), vec![0x53, 0xA0, 0x12]);

        let opl3 = Command::write(ChipKind::Ymf262, 1, 1, 0x05, 0x01);
        assert_eq!(opl3.to_bytes(), vec![0xAF, 0x05, 0x01]);
    }

    #[test]
    fn test_wait_samples() {
        assert_eq!(Command::Wait735.samples(), 735);
        assert_eq!(Command::WaitNibble { count: 16 }.to_bytes(), vec![0x7F]);
        assert_eq!(Command::PcmWrite { wait: 3 }.to_bytes(), vec![0x83]);
        assert_eq!(Command::PcmWrite { wait: 3 }.samples(), 3);
    }
}
