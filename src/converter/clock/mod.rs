//! Clock converters
//!
//! Each keeps the chip and rewrites only the pitch-bearing registers so a
//! stream recorded at one clock sounds the same at another. A ratio of
//! exactly 1 leaves every command untouched.

pub mod ay8910;
pub mod opl;
pub mod opll;
pub mod opm;
pub mod opn;
pub mod sn76489;

pub use ay8910::Ay8910ClockConverter;
pub use opl::OplClockConverter;
pub use opll::OpllClockConverter;
pub use opm::OpmClockConverter;
pub use opn::OpnClockConverter;
pub use sn76489::Sn76489ClockConverter;

use crate::chips::ChipDescriptor;

/// Source and destination of a clock stage
#[derive(Debug, Clone, Copy)]
pub struct ClockStage {
    pub from: ChipDescriptor,
    pub to: ChipDescriptor,
    /// Destination clock / source clock
    pub ratio: f64,
}

impl ClockStage {
    pub fn new(from: ChipDescriptor, to_clock: f64) -> Self {
        let ratio = if from.clock > 0.0 {
            to_clock / from.clock
        } else {
            1.0
        };
        Self {
            from,
            to: from.with_clock(to_clock),
            ratio,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.ratio == 1.0
    }

    /// Scale a period-type divider: periods grow with the clock
    pub fn scale_period(&self, period: u32, max: u32) -> u32 {
        let scaled = (period as f64 * self.ratio).round() as u32;
        if scaled > max {
            log::debug!("{}: period {} saturated at {:#x}", self.from.kind.name(), scaled, max);
        }
        scaled.min(max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chips::ChipKind;

    #[test]
    fn test_stage_ratio() {
        let from = ChipDescriptor::new(ChipKind::Ay8910, 1789772.5);
        let stage = ClockStage::new(from, 3579545.0);
        assert_eq!(stage.ratio, 2.0);
        assert_eq!(stage.to.clock, 3579545.0);
        assert_eq!(stage.scale_period(0x900, 0xFFF), 0xFFF);
        assert!(ClockStage::new(from, 1789772.5).is_identity());
    }
}
