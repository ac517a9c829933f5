//! Nearest ROM voice search
//!
//! A 2-operator voice is compared with each melodic OPLL ROM patch using a
//! weighted distance over the operator frequency ratio, feedback, envelope
//! rates and levels. Patches whose carrier envelope shape (sustained vs.
//! percussive) differs from the source are never chosen.

use super::opl::{OplSlot, OplVoice};
use super::opll::{OpllSlot, OpllVoice};
use super::table::VoiceMapping;

/// Frequency multiplier of each ML value
pub const MULTIPLIERS: [f64; 16] = [
    0.5, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 10.0, 12.0, 12.0, 15.0, 15.0,
];

const RATIO_WEIGHT: f64 = 4.0;
const FEEDBACK_WEIGHT: f64 = 1.0;
const RATE_WEIGHT: f64 = 0.5;
const LEVEL_WEIGHT: f64 = 0.125;

/// Envelope parameters shared by OPL and OPLL operators
#[derive(Debug, Clone, Copy)]
struct Envelope {
    ml: u8,
    tl: u8,
    ar: u8,
    dr: u8,
    sl: u8,
    eg: u8,
    rr: u8,
}

impl From<&OplSlot> for Envelope {
    fn from(s: &OplSlot) -> Self {
        Self {
            ml: s.ml,
            tl: s.tl,
            ar: s.ar,
            dr: s.dr,
            sl: s.sl,
            eg: s.eg,
            rr: s.rr,
        }
    }
}

impl From<&OpllSlot> for Envelope {
    fn from(s: &OpllSlot) -> Self {
        Self {
            ml: s.ml,
            tl: s.tl,
            ar: s.ar,
            dr: s.dr,
            sl: s.sl,
            eg: s.eg,
            rr: s.rr,
        }
    }
}

impl Envelope {
    /// Holds its level while keyed instead of decaying to silence
    fn sustains(&self) -> bool {
        self.eg == 1 || self.rr == 0
    }

    fn multiplier(&self) -> f64 {
        MULTIPLIERS[(self.ml & 15) as usize]
    }
}

fn ratio(m: &Envelope, c: &Envelope) -> f64 {
    (c.multiplier() / m.multiplier()).log2()
}

fn diff(a: u8, b: u8) -> f64 {
    (a as f64 - b as f64).abs()
}

fn distance(src: &OplVoice, rom: &OpllVoice) -> Option<f64> {
    let (sm, sc) = (Envelope::from(&src.slots[0]), Envelope::from(&src.slots[1]));
    let (rm, rc) = (Envelope::from(&rom.slots[0]), Envelope::from(&rom.slots[1]));
    if sc.sustains() != rc.sustains() {
        return None;
    }

    let ratio_term = (ratio(&sm, &sc) - ratio(&rm, &rc)).abs();
    let fb_term = diff(src.fb, rom.fb);
    let rate_term = diff(sm.ar, rm.ar) + diff(sm.dr, rm.dr) + diff(sc.ar, rc.ar) + diff(sc.dr, rc.dr);
    let level_term = (sm.tl as f64 + 4.0 * sm.sl as f64 - rm.tl as f64 - 4.0 * rm.sl as f64).abs()
        + 4.0 * diff(sc.sl, rc.sl);

    Some(
        RATIO_WEIGHT * ratio_term
            + FEEDBACK_WEIGHT * fb_term
            + RATE_WEIGHT * rate_term
            + LEVEL_WEIGHT * level_term,
    )
}

/// First candidate with the smallest distance; `None` distances are excluded
fn nearest(candidates: impl Iterator<Item = (usize, Option<f64>)>) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (program, d) in candidates {
        if let Some(d) = d {
            if best.map_or(true, |(_, bd)| d < bd) {
                best = Some((program, d));
            }
        }
    }
    best.map(|(program, _)| program)
}

/// Closest melodic ROM program (1-15) for a 2-operator voice.
///
/// Ties resolve to the lowest program number. The octave offset compensates
/// for a carrier multiplier that differs by whole octaves.
pub fn estimate_opll_voice(src: &OplVoice) -> Option<VoiceMapping> {
    let program = nearest((1..=15).map(|p| (p, distance(src, &OpllVoice::rom(p)))))?;
    let rom = OpllVoice::rom(program);
    let shift = (Envelope::from(&src.slots[1]).multiplier()
        / Envelope::from(&rom.slots[1]).multiplier())
    .log2()
    .round()
    .clamp(-2.0, 2.0);
    Some(VoiceMapping {
        program: program as u8,
        volume_offset: 0,
        octave_offset: shift as i8,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn as_opl(voice: &OpllVoice) -> OplVoice {
        let slot = |s: &OpllSlot| OplSlot {
            am: s.am,
            pm: s.pm,
            eg: s.eg,
            kr: s.kr,
            ml: s.ml,
            kl: s.kl,
            tl: s.tl,
            ar: s.ar,
            dr: s.dr,
            sl: s.sl,
            rr: s.rr,
            ws: s.wf,
        };
        OplVoice {
            fb: voice.fb,
            con: 0,
            slots: [slot(&voice.slots[0]), slot(&voice.slots[1])],
        }
    }

    #[test]
    fn test_rom_voice_matches_itself() {
        for program in [1usize, 3, 7, 11] {
            let mapping = estimate_opll_voice(&as_opl(&OpllVoice::rom(program))).unwrap();
            assert_eq!(mapping.program as usize, program);
            assert_eq!(mapping.octave_offset, 0);
        }
    }

    #[test]
    fn test_envelope_shape_gate() {
        // piano carrier decays, violin carrier sustains
        let piano = as_opl(&OpllVoice::rom(3));
        assert!(distance(&piano, &OpllVoice::rom(1)).is_none());
        let mapping = estimate_opll_voice(&piano).unwrap();
        let rom = OpllVoice::rom(mapping.program as usize);
        assert!(!Envelope::from(&rom.slots[1]).sustains());
    }

    #[test]
    fn test_first_minimum_wins() {
        let candidates = vec![(1, Some(3.0)), (2, None), (3, Some(1.5)), (4, Some(1.5))];
        assert_eq!(nearest(candidates.into_iter()), Some(3));
        assert_eq!(nearest(vec![(1, None)].into_iter()), None);
    }

    #[test]
    fn test_octave_offset_from_carrier_multiplier() {
        let mut src = as_opl(&OpllVoice::rom(1));
        src.slots[0].ml = 2;
        src.slots[1].ml = 4;
        let mapping = estimate_opll_voice(&src).unwrap();
        let rom = OpllVoice::rom(mapping.program as usize);
        let expected = (MULTIPLIERS[4] / MULTIPLIERS[rom.slots[1].ml as usize])
            .log2()
            .round()
            .clamp(-2.0, 2.0) as i8;
        assert_eq!(mapping.octave_offset, expected);
    }
}
