//! Frequency, block/F-number and key code helpers

use crate::chips::ChipKind;

/// NTSC colorburst clock, the reference clock of OPM key codes
pub const OPM_REFERENCE_CLOCK: f64 = 3579545.0;

/// OPM key-code note values for the 12 semitones starting at C#
pub const OPM_NOTE_CODES: [u8; 12] = [0, 1, 2, 4, 5, 6, 8, 9, 10, 12, 13, 14];

/// C#4 at the reference clock
const OPM_C_SHARP_4: f64 = 277.182_630_976_872;

/// Semitone index of each OPM note code (codes 3, 7, 11 and 15 alias the next note)
pub const OPM_CODE_TO_INDEX: [u8; 16] = [0, 1, 2, 3, 3, 4, 5, 6, 6, 7, 8, 9, 9, 10, 11, 12];

/// Rescale a block/F-number pair for a clock ratio.
///
/// The F-number is divided by `ratio` and rounded; while it exceeds
/// `max_fnum` it is halved and the block raised. A block past 7 saturates
/// at the highest representable frequency.
pub fn rescale_block_fnum(blk: u8, fnum: u16, ratio: f64, max_fnum: u16) -> (u8, u16) {
    normalize_block_fnum(blk, (fnum as f64 / ratio).round() as u64, max_fnum)
}

fn normalize_block_fnum(blk: u8, mut fnum: u64, max_fnum: u16) -> (u8, u16) {
    let mut blk = blk as u32;
    while fnum > max_fnum as u64 {
        fnum >>= 1;
        blk += 1;
    }
    if blk > 7 {
        (7, max_fnum)
    } else {
        (blk as u8, fnum as u16)
    }
}

/// Block/F-number pair producing `freq` Hz on an FM chip whose pitch is
/// `fnum * clock / (prescaler * 2^(shift - blk))`.
///
/// Starts from `start_blk` and raises the block until the F-number fits.
pub fn freq_to_block_fnum(
    freq: f64,
    clock: f64,
    prescaler: f64,
    shift: i32,
    start_blk: u8,
    max_fnum: u16,
) -> (u8, u16) {
    if !(freq.is_finite() && freq > 0.0) {
        return (start_blk, 0);
    }
    let fnum = freq * prescaler * 2f64.powi(shift - start_blk as i32) / clock;
    normalize_block_fnum(start_blk, fnum.round() as u64, max_fnum)
}

/// Frequency in Hz of an OPN block/F-number pair (prescaler 72 for YM2203,
/// 144 for YM2608 and YM2612)
pub fn opn_freq(blk: u8, fnum: u16, clock: f64, prescaler: f64) -> f64 {
    fnum as f64 * clock / (prescaler * 2f64.powi(21 - blk as i32))
}

/// OPN prescaler of a chip
pub fn opn_prescaler(kind: ChipKind) -> f64 {
    match kind {
        ChipKind::Ym2203 => 72.0,
        _ => 144.0,
    }
}

/// OPL prescaler of a chip: 72, or 288 for the YMF262 and its 4x clock
pub fn opl_prescaler(kind: ChipKind) -> f64 {
    match kind {
        ChipKind::Ymf262 => 288.0,
        _ => 72.0,
    }
}

/// PSG tone frequency of period `tp` on a PSG clocked at `clock`
pub fn psg_freq(tp: u32, clock: f64) -> f64 {
    clock / (16.0 * tp.max(1) as f64)
}

/// An OPM key code and key fraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpmNote {
    /// Octave in bits 6-4, note code in bits 3-0
    pub kc: u8,
    /// Key fraction in bits 7-2
    pub kf: u8,
}

impl OpmNote {
    const MAX_KEY: i32 = 8 * 12 * 256 - 1;

    /// Build from a position measured in 1/256 semitones above C#0
    pub fn from_key(key: i32) -> Self {
        let key = key.clamp(0, Self::MAX_KEY);
        let semitone = key >> 8;
        let oct = (semitone / 12) as u8;
        Self {
            kc: (oct << 4) | OPM_NOTE_CODES[(semitone % 12) as usize],
            kf: (key & 0xFC) as u8,
        }
    }

    /// Position in 1/256 semitones above C#0
    pub fn key(&self) -> i32 {
        let oct = ((self.kc >> 4) & 7) as i32;
        let index = OPM_CODE_TO_INDEX[(self.kc & 15) as usize] as i32;
        (oct * 12 + index) * 256 + (self.kf & 0xFC) as i32
    }

    /// Shift by `diff` 1/256 semitones, saturating at both ends
    pub fn shifted(&self, diff: i32) -> Self {
        Self::from_key(self.key() + diff)
    }
}

/// Nearest OPM note for `freq` Hz on a YM2151 clocked at `clock`
pub fn freq_to_opm_note(freq: f64, clock: f64) -> OpmNote {
    if !(freq.is_finite() && freq > 0.0) {
        return OpmNote::from_key(0);
    }
    let reference = freq * OPM_REFERENCE_CLOCK / clock;
    let semitones = 48.0 + 12.0 * (reference / OPM_C_SHARP_4).log2();
    OpmNote::from_key((semitones * 256.0).round() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rescale_identity() {
        assert_eq!(rescale_block_fnum(4, 0x26A, 1.0, 0x7FF), (4, 0x26A));
    }

    #[test]
    fn test_rescale_block_never_drops_when_clock_rises() {
        for fnum in [1u16, 0x100, 0x3FF, 0x7FF] {
            for blk in 0..8u8 {
                for ratio in [1.01, 1.5, 2.0, 4.0] {
                    let (b, _) = rescale_block_fnum(blk, fnum, ratio, 0x7FF);
                    assert!(b >= blk, "blk {} fnum {} ratio {}", blk, fnum, ratio);
                }
            }
        }
    }

    #[test]
    fn test_rescale_lower_clock_carries_into_block() {
        // 0x600 / 0.5 = 0xC00 overflows 11 bits: halve and raise the block
        assert_eq!(rescale_block_fnum(3, 0x600, 0.5, 0x7FF), (4, 0x600));
    }

    #[test]
    fn test_rescale_saturates_at_top_block() {
        assert_eq!(rescale_block_fnum(7, 0x600, 0.5, 0x7FF), (7, 0x7FF));
        assert_eq!(rescale_block_fnum(7, 0x3FF, 0.25, 0x3FF), (7, 0x3FF));
    }

    #[test]
    fn test_opn_freq_a4() {
        let f = opn_freq(4, 1084, 7670454.0, 144.0);
        assert!((f - 440.0).abs() < 1.0, "{}", f);
    }

    #[test]
    fn test_freq_to_block_fnum_round_trip() {
        let (blk, fnum) = freq_to_block_fnum(440.0, 7670454.0, 144.0, 21, 0, 0x7FF);
        let f = opn_freq(blk, fnum, 7670454.0, 144.0);
        assert!((f - 440.0).abs() < 0.5, "{} {} {}", blk, fnum, f);
    }

    #[test]
    fn test_opm_note_a4() {
        let note = freq_to_opm_note(440.0, OPM_REFERENCE_CLOCK);
        assert_eq!(note.kc, 0x4A);
    }

    #[test]
    fn test_opm_key_wraps_octaves_and_saturates() {
        let note = OpmNote { kc: 0x4E, kf: 0 };
        assert_eq!(note.shifted(256).kc, 0x50);
        assert_eq!(OpmNote { kc: 0x00, kf: 0 }.shifted(-512), OpmNote { kc: 0, kf: 0 });
        let top = OpmNote { kc: 0x7E, kf: 0xFC }.shifted(4096);
        assert_eq!(top, OpmNote { kc: 0x7E, kf: 0xFC });
    }
}
