//! Conversion engine
//!
//! A [`Converter`] maps commands recorded against one chip onto another chip
//! or clock. The registry selects converters by chip kind and the pipeline
//! chains them.

pub mod buffer;
pub mod chip;
pub mod clock;
pub mod freq;
pub mod options;
pub mod registry;
pub mod voice;

use crate::chips::{ChipDescriptor, ChipKind};
use crate::vgm::Command;
use serde::Serialize;

pub use buffer::{RegisterShadow, WriteBuffer};
pub use options::{OptionKind, OptionSpec, Options};
pub use voice::{VoiceMapping, VoiceTable};

/// One conversion stage
pub trait Converter: Send {
    /// Chip whose commands this stage consumes
    fn source(&self) -> &ChipDescriptor;

    /// Chip this stage produces commands for
    fn destination(&self) -> &ChipDescriptor;

    /// Setup commands emitted once before the first converted command
    fn initial_commands(&mut self) -> Vec<Command> {
        Vec::new()
    }

    /// Convert one command; commands for other chips pass through unchanged
    fn convert(&mut self, cmd: &Command, diag: &mut dyn Diagnostics) -> Vec<Command>;
}

/// A newly estimated voice mapping
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceReport {
    pub chip: ChipKind,
    pub channel: u8,
    pub hash: String,
    #[serde(flatten)]
    pub mapping: VoiceMapping,
}

/// Receiver of conversion side-channel reports
pub trait Diagnostics {
    fn voice_estimated(&mut self, report: &VoiceReport);
}

impl Diagnostics for Vec<VoiceReport> {
    fn voice_estimated(&mut self, report: &VoiceReport) {
        self.push(report.clone());
    }
}

/// Discards all reports
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDiagnostics;

impl Diagnostics for NullDiagnostics {
    fn voice_estimated(&mut self, _report: &VoiceReport) {}
}

/// Forwards reports to the `log` facade at info level
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn voice_estimated(&mut self, report: &VoiceReport) {
        log::info!(
            "{} ch{}: voice {} => program {} (volume {:+}, octave {:+})",
            report.chip,
            report.channel,
            report.hash,
            report.mapping.program,
            report.mapping.volume_offset,
            report.mapping.octave_offset
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_report_json() {
        let report = VoiceReport {
            chip: ChipKind::Ym2612,
            channel: 2,
            hash: "00ff".into(),
            mapping: VoiceMapping {
                program: 5,
                volume_offset: 1,
                octave_offset: -1,
            },
        };
        let json = serde_json::to_string(&report).unwrap();
        assert_eq!(
            json,
            r#"{"chip":"ym2612","channel":2,"hash":"00ff","program":5,"volumeOffset":1,"octaveOffset":-1}"#
        );

        let mut sink: Vec<VoiceReport> = Vec::new();
        sink.voice_estimated(&report);
        assert_eq!(sink, vec![report]);
    }
}
