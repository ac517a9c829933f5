//! Translation of voices between operator architectures

use super::opl::{OplSlot, OplVoice};
use super::opll::{OpllSlot, OpllVoice};
use super::opn::{OpnSlot, OpnVoice};

fn opll_rate_to_opn(rate: u8) -> u8 {
    match rate {
        0 => 0,
        15 => 31,
        r => ((r as f64 + 1.5) * 2.0).round().min(31.0) as u8,
    }
}

/// OPLL operator as an OPN operator
pub fn opll_slot_to_opn(slot: &OpllSlot, carrier: bool) -> OpnSlot {
    let half_sine = if slot.wf != 0 {
        if carrier {
            8
        } else {
            5
        }
    } else {
        0
    };
    OpnSlot {
        dt: 0,
        ml: slot.ml,
        tl: (slot.tl + half_sine).min(127),
        ks: slot.kr * 2,
        ar: opll_rate_to_opn(slot.ar),
        am: slot.am,
        dr: opll_rate_to_opn(slot.dr),
        sr: opll_rate_to_opn(if slot.eg != 0 { 0 } else { slot.rr }),
        sl: slot.sl,
        rr: if slot.eg != 0 {
            (slot.rr + 1).min(15)
        } else if carrier {
            8
        } else {
            0
        },
        ssg: 0,
    }
}

/// OPLL voice as a 2-operator OPN voice (algorithm 2, S1 into S4).
///
/// The unused operators S2 and S3 are left silent-default.
pub fn opll_to_opn(voice: &OpllVoice) -> OpnVoice {
    let [m, c] = &voice.slots;
    OpnVoice {
        fb: if m.wf != 0 { (voice.fb + 6).min(7) } else { voice.fb },
        con: 2,
        ams: 4,
        pms: if m.pm != 0 || c.pm != 0 { 2 } else { 0 },
        slots: [
            opll_slot_to_opn(m, false),
            OpnSlot::default(),
            OpnSlot::default(),
            opll_slot_to_opn(c, true),
        ],
    }
}

fn opn_rate_to_opl(rate: u8) -> u8 {
    match rate {
        31 => 15,
        0 => 0,
        r => ((r as u32 * 28) >> 6).clamp(1, 15) as u8,
    }
}

/// OPN operator as an OPL operator.
///
/// With `key` set the result models a held note: the envelope does not
/// sustain and the OPN sustain rate drives the OPL release phase.
pub fn opn_slot_to_opl(slot: &OpnSlot, key: bool) -> OplSlot {
    OplSlot {
        am: slot.am,
        pm: 0,
        eg: if key { 0 } else { 1 },
        kr: slot.ks >> 1,
        ml: slot.ml,
        kl: 0,
        tl: slot.tl.min(63),
        ar: opn_rate_to_opl(slot.ar),
        dr: opn_rate_to_opl(slot.dr),
        sl: slot.sl,
        rr: if key {
            opn_rate_to_opl(slot.sr)
        } else if slot.rr == 0 {
            1
        } else {
            slot.rr
        },
        ws: 0,
    }
}

/// OPN voice as a pair of OPL voices, one per OPN operator pair
pub fn opn_to_opl(voice: &OpnVoice, key: bool) -> [OplVoice; 2] {
    let ss = voice.slots.map(|s| opn_slot_to_opl(&s, key));
    // Chained modulator folded into the carrier
    let folded = |via: &OplSlot| OplSlot {
        ml: via.ml,
        tl: (via.tl.saturating_sub(2) + ss[3].tl).min(63),
        ..ss[3]
    };
    let pair = |fb: u8, con: u8, m: OplSlot, c: OplSlot| OplVoice {
        fb,
        con,
        slots: [m, c],
    };
    match voice.con & 7 {
        0 | 3 => [
            pair(voice.fb, 0, ss[0], folded(&ss[1])),
            pair(0, 0, ss[2], ss[3]),
        ],
        1 => [
            pair(voice.fb, 0, ss[0], folded(&ss[2])),
            pair(0, 0, ss[2], ss[3]),
        ],
        2 => [pair(voice.fb, 0, ss[0], ss[3]), pair(0, 0, ss[2], ss[3])],
        4 => [pair(voice.fb, 0, ss[0], ss[1]), pair(0, 0, ss[2], ss[3])],
        5 => [
            pair(voice.fb, 0, ss[0], ss[1]),
            pair(voice.fb, 0, ss[0], ss[3]),
        ],
        6 => [pair(voice.fb, 0, ss[0], ss[1]), pair(0, 1, ss[2], ss[3])],
        _ => [pair(voice.fb, 1, ss[0], ss[1]), pair(0, 1, ss[2], ss[3])],
    }
}

/// OPL voice as an OPLL user voice. OPL has no carrier level in the patch,
/// and only waveforms 0 and 1 survive.
pub fn opl_to_opll(voice: &OplVoice) -> OpllVoice {
    let slot = |s: &OplSlot, carrier: bool| OpllSlot {
        am: s.am,
        pm: s.pm,
        eg: s.eg,
        kr: s.kr,
        ml: s.ml,
        kl: s.kl,
        tl: if carrier { 0 } else { s.tl },
        ar: s.ar,
        dr: s.dr,
        sl: s.sl,
        rr: s.rr,
        wf: u8::from(s.ws == 1),
    };
    OpllVoice {
        fb: voice.fb,
        slots: [slot(&voice.slots[0], false), slot(&voice.slots[1], true)],
    }
}
