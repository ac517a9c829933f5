//! VGM chip-to-chip and clock converter
//!
//! Re-encodes the register writes of a VGM stream recorded for one sound chip
//! so the stream plays on another chip, or on the same chip at another clock.
//!
//! ```no_run
//! use vgm_conv::{convert_vgm, ChipDescriptor, ChipKind, ConversionRequest, LogDiagnostics, VoiceTable};
//!
//! let input = std::fs::read("song.vgm")?;
//! let request = ConversionRequest::new(ChipDescriptor::new(ChipKind::Ym2612, 0.0), ChipKind::Ym2413)
//!     .with_option("decimation", "4");
//! let output = convert_vgm(&input, &request, &VoiceTable::new(), &mut LogDiagnostics)?;
//! std::fs::write("song-opll.vgm", output.data)?;
//! # Ok::<(), vgm_conv::Error>(())
//! ```

pub mod chips;
pub mod converter;
pub mod error;
pub mod pipeline;
pub mod vgm;

pub use chips::{ChipDescriptor, ChipKind, SubModule};
pub use converter::{Converter, Diagnostics, LogDiagnostics, NullDiagnostics, VoiceReport, VoiceTable};
pub use error::{Error, Result};
pub use pipeline::{convert_vgm, Conversion, ConversionRequest, Pipeline, Plan};
