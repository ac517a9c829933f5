//! VGM file writer

use super::commands::Command;
use super::header::{offset, ChipClock, VgmHeader, VGM_HEADER_SIZE, VGM_VERSION};
use crate::chips::ChipKind;

/// Builds a VGM image in memory from a header template and a command stream
pub struct VgmWriter {
    header: VgmHeader,
    data: Vec<u8>,
    /// Offset into `data` where the loop starts
    loop_offset: Option<usize>,
    total_samples: u64,
    loop_start_samples: u64,
    ended: bool,
}

impl VgmWriter {
    /// Create a writer starting from an existing header
    pub fn new(template: VgmHeader) -> Self {
        let mut header = template;
        header.write_u32(offset::VERSION, VGM_VERSION);
        header.ensure_size(VGM_HEADER_SIZE);
        header.write_u32(offset::GD3_OFFSET, 0);
        header.write_u32(offset::LOOP_OFFSET, 0);
        Self {
            header,
            data: Vec::new(),
            loop_offset: None,
            total_samples: 0,
            loop_start_samples: 0,
            ended: false,
        }
    }

    /// Set a chip clock in the header
    pub fn set_chip_clock(&mut self, kind: ChipKind, clock: f64, dual: bool) {
        self.header.set_chip_clock(
            kind,
            Some(ChipClock {
                clock: clock.round() as u32,
                dual,
            }),
        );
    }

    /// Remove a chip from the header
    pub fn clear_chip_clock(&mut self, kind: ChipKind) {
        self.header.set_chip_clock(kind, None);
    }

    /// Set volume modifier
    pub fn set_volume_modifier(&mut self, vol: i8) {
        self.header.write_u8(offset::VOLUME_MODIFIER, vol as u8);
    }

    /// Mark current position as loop start
    pub fn mark_loop_start(&mut self) {
        self.loop_offset = Some(self.data.len());
        self.loop_start_samples = self.total_samples;
    }

    /// Append one command
    pub fn write_command(&mut self, cmd: &Command) {
        if self.ended {
            return;
        }
        cmd.encode(&mut self.data);
        self.total_samples += cmd.samples() as u64;
        self.ended = cmd.is_end();
    }

    /// Terminate the stream, append the GD3 block and return the file image
    pub fn finish(mut self, gd3: Option<&[u8]>) -> Vec<u8> {
        if !self.ended {
            self.write_command(&Command::End);
        }

        let header_len = self.header.len();
        let gd3_pos = header_len + self.data.len();
        if let Some(gd3) = gd3 {
            self.data.extend_from_slice(gd3);
            // GD3 offset is relative to 0x14
            self.header
                .write_u32(offset::GD3_OFFSET, (gd3_pos - offset::GD3_OFFSET) as u32);
        }

        // Record end of file offset (relative to 0x04)
        let eof = header_len + self.data.len();
        self.header
            .write_u32(offset::EOF_OFFSET, (eof - offset::EOF_OFFSET) as u32);

        self.header
            .write_u32(offset::TOTAL_SAMPLES, self.total_samples as u32);
        match self.loop_offset {
            Some(pos) => {
                // Loop offset is relative to 0x1C
                self.header.write_u32(
                    offset::LOOP_OFFSET,
                    (header_len + pos - offset::LOOP_OFFSET) as u32,
                );
                self.header.write_u32(
                    offset::LOOP_SAMPLES,
                    (self.total_samples - self.loop_start_samples) as u32,
                );
            }
            None => self.header.write_u32(offset::LOOP_SAMPLES, 0),
        }

        let mut file = self.header.as_bytes().to_vec();
        file.extend_from_slice(&self.data);
        file
    }
}
