//! 2-operator OPL voices

/// One OPL operator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OplSlot {
    pub am: u8,
    pub pm: u8,
    pub eg: u8,
    pub kr: u8,
    pub ml: u8,
    pub kl: u8,
    pub tl: u8,
    pub ar: u8,
    pub dr: u8,
    pub sl: u8,
    pub rr: u8,
    pub ws: u8,
}

impl OplSlot {
    /// Value of the 0x20 group register
    pub fn flags_mul(&self) -> u8 {
        (self.am << 7) | (self.pm << 6) | (self.eg << 5) | (self.kr << 4) | self.ml
    }

    /// Value of the 0x40 group register
    pub fn ksl_tl(&self) -> u8 {
        (self.kl << 6) | self.tl
    }

    /// Value of the 0x60 group register
    pub fn ar_dr(&self) -> u8 {
        (self.ar << 4) | self.dr
    }

    /// Value of the 0x80 group register
    pub fn sl_rr(&self) -> u8 {
        (self.sl << 4) | self.rr
    }
}

/// An OPL voice: modulator then carrier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OplVoice {
    pub fb: u8,
    pub con: u8,
    pub slots: [OplSlot; 2],
}

/// Operator offset of the modulator of OPL channel `ch` (0-8); the carrier is 3 above
pub fn modulator_offset(ch: u8) -> u8 {
    8 * (ch / 3) + ch % 3
}

impl OplVoice {
    /// 11-byte image in register-group order
    pub fn to_bytes(&self) -> [u8; 11] {
        let [m, c] = &self.slots;
        [
            m.flags_mul(),
            c.flags_mul(),
            m.ksl_tl(),
            c.ksl_tl(),
            m.ar_dr(),
            c.ar_dr(),
            m.sl_rr(),
            c.sl_rr(),
            m.ws,
            c.ws,
            (self.fb << 1) | self.con,
        ]
    }

    pub fn from_bytes(d: &[u8; 11]) -> Self {
        let slot = |i: usize| OplSlot {
            am: (d[i] >> 7) & 1,
            pm: (d[i] >> 6) & 1,
            eg: (d[i] >> 5) & 1,
            kr: (d[i] >> 4) & 1,
            ml: d[i] & 0x0F,
            kl: (d[2 + i] >> 6) & 3,
            tl: d[2 + i] & 0x3F,
            ar: (d[4 + i] >> 4) & 0x0F,
            dr: d[4 + i] & 0x0F,
            sl: (d[6 + i] >> 4) & 0x0F,
            rr: d[6 + i] & 0x0F,
            ws: d[8 + i] & 3,
        };
        Self {
            fb: (d[10] >> 1) & 7,
            con: d[10] & 1,
            slots: [slot(0), slot(1)],
        }
    }

    /// Register writes that program this voice on channel `ch` (0-8)
    pub fn registers(&self, ch: u8) -> Vec<(u8, u8)> {
        let m = modulator_offset(ch);
        let c = m + 3;
        let [ms, cs] = &self.slots;
        vec![
            (0x20 + m, ms.flags_mul()),
            (0x20 + c, cs.flags_mul()),
            (0x40 + m, ms.ksl_tl()),
            (0x40 + c, cs.ksl_tl()),
            (0x60 + m, ms.ar_dr()),
            (0x60 + c, cs.ar_dr()),
            (0x80 + m, ms.sl_rr()),
            (0x80 + c, cs.sl_rr()),
            (0xE0 + m, ms.ws),
            (0xE0 + c, cs.ws),
            (0xC0 + ch, (self.fb << 1) | self.con),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_round_trip_keeps_feedback() {
        let mut voice = OplVoice {
            fb: 5,
            con: 1,
            ..Default::default()
        };
        voice.slots[0].ml = 3;
        voice.slots[0].eg = 1;
        voice.slots[1].tl = 0x2A;
        voice.slots[1].rr = 7;
        voice.slots[1].ws = 2;
        assert_eq!(OplVoice::from_bytes(&voice.to_bytes()), voice);
    }

    #[test]
    fn test_modulator_offsets() {
        let offsets: Vec<u8> = (0..9).map(modulator_offset).collect();
        assert_eq!(offsets, vec![0, 1, 2, 8, 9, 10, 16, 17, 18]);
    }
}
