//! YM2413 (OPLL) voices and the built-in ROM patch set

/// One OPLL operator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpllSlot {
    pub am: u8,
    pub pm: u8,
    pub eg: u8,
    pub kr: u8,
    pub ml: u8,
    pub kl: u8,
    /// Modulator only; the carrier level comes from the channel volume
    pub tl: u8,
    pub ar: u8,
    pub dr: u8,
    pub sl: u8,
    pub rr: u8,
    /// Half-sine waveform select
    pub wf: u8,
}

/// An OPLL voice: modulator then carrier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpllVoice {
    pub fb: u8,
    pub slots: [OpllSlot; 2],
}

/// Program number of the user voice
pub const USER_VOICE: u8 = 0;
/// Bass drum, snare/hi-hat and tom/cymbal rhythm voices
pub const RHYTHM_BD: usize = 16;
pub const RHYTHM_HH_SD: usize = 17;
pub const RHYTHM_TOM_CYM: usize = 18;

/// Patch ROM: user voice placeholder, 15 melodic voices, 3 rhythm voices
pub const OPLL_ROM: [[u8; 8]; 19] = [
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
    [0x71, 0x61, 0x1E, 0x17, 0xD0, 0x78, 0x00, 0x17], // violin
    [0x13, 0x41, 0x1A, 0x0D, 0xD8, 0xF7, 0x23, 0x13], // guitar
    [0x13, 0x01, 0x99, 0x00, 0xF2, 0xC4, 0x21, 0x23], // piano
    [0x11, 0x61, 0x0E, 0x07, 0x8D, 0x64, 0x70, 0x27], // flute
    [0x32, 0x21, 0x1E, 0x06, 0xE1, 0x76, 0x01, 0x28], // clarinet
    [0x31, 0x22, 0x16, 0x05, 0xE0, 0x71, 0x00, 0x18], // oboe
    [0x21, 0x61, 0x1D, 0x07, 0x82, 0x81, 0x11, 0x07], // trumpet
    [0x33, 0x21, 0x2D, 0x13, 0xB0, 0x70, 0x00, 0x07], // organ
    [0x61, 0x61, 0x1B, 0x06, 0x64, 0x65, 0x10, 0x17], // horn
    [0x41, 0x61, 0x0B, 0x18, 0x85, 0xF0, 0x81, 0x07], // synthesizer
    [0x33, 0x01, 0x83, 0x11, 0xEA, 0xEF, 0x10, 0x04], // harpsichord
    [0x17, 0xC1, 0x24, 0x07, 0xF8, 0xF8, 0x22, 0x12], // vibraphone
    [0x61, 0x50, 0x0C, 0x05, 0xD2, 0xF5, 0x40, 0x42], // synth bass
    [0x01, 0x01, 0x55, 0x03, 0xE9, 0x90, 0x03, 0x02], // acoustic bass
    [0x41, 0x41, 0x89, 0x03, 0xF1, 0xE4, 0xC0, 0x13], // electric guitar
    [0x01, 0x01, 0x18, 0x0F, 0xDF, 0xF8, 0x6A, 0x6D], // bass drum
    [0x01, 0x01, 0x00, 0x00, 0xC8, 0xD8, 0xA7, 0x68], // hi-hat / snare
    [0x05, 0x01, 0x00, 0x00, 0xF8, 0xAA, 0x59, 0x55], // tom / cymbal
];

impl OpllVoice {
    /// Decode the 8-byte register image (registers 0x00-0x07)
    pub fn from_bytes(d: &[u8]) -> Self {
        let byte = |i: usize| d.get(i).copied().unwrap_or(0);
        let slot = |i: usize, tl: u8, wf: u8| OpllSlot {
            am: (byte(i) >> 7) & 1,
            pm: (byte(i) >> 6) & 1,
            eg: (byte(i) >> 5) & 1,
            kr: (byte(i) >> 4) & 1,
            ml: byte(i) & 0x0F,
            kl: (byte(2 + i) >> 6) & 3,
            tl,
            ar: (byte(4 + i) >> 4) & 0x0F,
            dr: byte(4 + i) & 0x0F,
            sl: (byte(6 + i) >> 4) & 0x0F,
            rr: byte(6 + i) & 0x0F,
            wf,
        };
        Self {
            fb: byte(3) & 7,
            slots: [
                slot(0, byte(2) & 0x3F, (byte(3) >> 3) & 1),
                slot(1, 0, (byte(3) >> 4) & 1),
            ],
        }
    }

    /// Built-in voice by program number (0-18)
    pub fn rom(program: usize) -> Self {
        Self::from_bytes(&OPLL_ROM[program.min(OPLL_ROM.len() - 1)])
    }

    pub fn to_bytes(&self) -> [u8; 8] {
        let [m, c] = &self.slots;
        let flags = |s: &OpllSlot| (s.am << 7) | (s.pm << 6) | (s.eg << 5) | (s.kr << 4) | s.ml;
        [
            flags(m),
            flags(c),
            (m.kl << 6) | (m.tl & 0x3F),
            (c.kl << 6) | (c.wf << 4) | (m.wf << 3) | (self.fb & 7),
            (m.ar << 4) | m.dr,
            (c.ar << 4) | c.dr,
            (m.sl << 4) | m.rr,
            (c.sl << 4) | c.rr,
        ]
    }
}
