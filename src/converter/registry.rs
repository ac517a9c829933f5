//! Lookup tables of the available converters
//!
//! Chip converters are found by (source kind, destination kind); clock
//! converters by chip kind. Each chip entry also declares the clock ratio of
//! its destination and the option keys it accepts, so a request can be
//! planned and validated before anything is built.

use super::chip::{
    ay8910_to_opl, ay8910_to_opm, opl_retarget, opl_to_opll, opn_to_opl, opn_to_opll, opn_to_opm,
    sn76489_to_ay8910, sn76489_to_opn, ym2413_to_opl, ym2413_to_ym2608,
};
use super::chip::{
    Ay8910ToOplConverter, Ay8910ToOpmConverter, Ay8910ToSsgConverter, OplRetargetConverter, OplToOpllConverter,
    OpnToOpllConverter, OpnToOpmConverter, Sn76489ToAy8910Converter, Sn76489ToOpnConverter,
    SsgToAy8910Converter, Ym2203ToOplConverter, Ym2413ToOplConverter, Ym2413ToYm2608Converter,
};
use super::clock::{
    Ay8910ClockConverter, OplClockConverter, OpllClockConverter, OpmClockConverter, OpnClockConverter,
    Sn76489ClockConverter,
};
use super::{Converter, OptionSpec, Options, VoiceTable};
use crate::chips::{ChipDescriptor, ChipKind};

use ChipKind::*;

const OPL: &[ChipKind] = &[Ym3812, Ym3526, Y8950, Ymf262];

pub type BuildChipConverter = fn(ChipDescriptor, ChipKind, &Options, &VoiceTable) -> Box<dyn Converter>;
pub type BuildClockConverter = fn(ChipDescriptor, f64) -> Box<dyn Converter>;

/// A chip-to-chip converter and the pairs it serves
pub struct ChipConverterEntry {
    pub from: &'static [ChipKind],
    pub to: &'static [ChipKind],
    /// Destination clock / source clock
    pub clock_ratio: fn(ChipKind, ChipKind) -> f64,
    pub options: &'static [OptionSpec],
    pub build: BuildChipConverter,
}

impl ChipConverterEntry {
    pub fn supports(&self, from: ChipKind, to: ChipKind) -> bool {
        self.from.contains(&from) && self.to.contains(&to)
    }
}

pub static CHIP_CONVERTERS: &[ChipConverterEntry] = &[
    ChipConverterEntry {
        from: &[Sn76489],
        to: &[Ay8910],
        clock_ratio: sn76489_to_ay8910::clock_ratio,
        options: sn76489_to_ay8910::OPTIONS,
        build: |from, _, opts, _| Box::new(Sn76489ToAy8910Converter::new(from, opts)),
    },
    ChipConverterEntry {
        from: &[Sn76489],
        to: &[Ym2203, Ym2608, Ym2612],
        clock_ratio: sn76489_to_opn::clock_ratio,
        options: &[],
        build: |from, to, _, _| Box::new(Sn76489ToOpnConverter::new(from, to)),
    },
    ChipConverterEntry {
        from: &[Ym2203, Ym2608],
        to: &[Ay8910],
        clock_ratio: SsgToAy8910Converter::clock_ratio,
        options: &[],
        build: |from, _, _, _| Box::new(SsgToAy8910Converter::new(from)),
    },
    ChipConverterEntry {
        from: &[Ay8910],
        to: &[Ym2203, Ym2608],
        clock_ratio: Ay8910ToSsgConverter::clock_ratio,
        options: &[],
        build: |from, to, _, _| Box::new(Ay8910ToSsgConverter::new(from, to)),
    },
    ChipConverterEntry {
        from: &[Ay8910],
        to: OPL,
        clock_ratio: ay8910_to_opl::clock_ratio,
        options: &[],
        build: |from, to, _, _| Box::new(Ay8910ToOplConverter::new(from, to)),
    },
    ChipConverterEntry {
        from: &[Ay8910],
        to: &[Ym2151],
        clock_ratio: ay8910_to_opm::clock_ratio,
        options: ay8910_to_opm::OPTIONS,
        build: |from, _, opts, _| Box::new(Ay8910ToOpmConverter::new(from, opts)),
    },
    ChipConverterEntry {
        from: &[Ym2612],
        to: &[Ym2413],
        clock_ratio: opn_to_opll::clock_ratio,
        options: opn_to_opll::YM2612_OPTIONS,
        build: |from, _, opts, table| Box::new(OpnToOpllConverter::new(from, opts, table)),
    },
    ChipConverterEntry {
        from: &[Ym2203, Ym2608],
        to: &[Ym2413],
        clock_ratio: opn_to_opll::clock_ratio,
        options: opn_to_opll::OPTIONS,
        build: |from, _, opts, table| Box::new(OpnToOpllConverter::new(from, opts, table)),
    },
    ChipConverterEntry {
        from: &[Ym2203],
        to: OPL,
        clock_ratio: opn_to_opl::clock_ratio,
        options: &[],
        build: |from, to, _, _| Box::new(Ym2203ToOplConverter::new(from, to)),
    },
    ChipConverterEntry {
        from: &[Ym2203, Ym2608, Ym2612],
        to: &[Ym2151],
        clock_ratio: opn_to_opm::clock_ratio,
        options: opn_to_opm::OPTIONS,
        build: |from, _, opts, _| Box::new(OpnToOpmConverter::new(from, opts)),
    },
    ChipConverterEntry {
        from: &[Ym2413],
        to: &[Ym2608],
        clock_ratio: ym2413_to_ym2608::clock_ratio,
        options: &[],
        build: |from, _, _, _| Box::new(Ym2413ToYm2608Converter::new(from)),
    },
    ChipConverterEntry {
        from: &[Ym2413],
        to: OPL,
        clock_ratio: ym2413_to_opl::clock_ratio,
        options: &[],
        build: |from, to, _, _| Box::new(Ym2413ToOplConverter::new(from, to)),
    },
    ChipConverterEntry {
        from: &[Ym3812, Ym3526, Y8950],
        to: &[Ym2413],
        clock_ratio: opl_to_opll::clock_ratio,
        options: opl_to_opll::OPTIONS,
        build: |from, _, opts, table| Box::new(OplToOpllConverter::new(from, opts, table)),
    },
    ChipConverterEntry {
        from: &[Ym3526, Y8950],
        to: &[Ym3812, Ymf262],
        clock_ratio: opl_retarget::clock_ratio,
        options: &[],
        build: |from, to, _, _| Box::new(OplRetargetConverter::new(from, to)),
    },
    ChipConverterEntry {
        from: &[Ym3812],
        to: &[Ym3526, Y8950, Ymf262],
        clock_ratio: opl_retarget::clock_ratio,
        options: &[],
        build: |from, to, _, _| Box::new(OplRetargetConverter::new(from, to)),
    },
];

pub static CLOCK_CONVERTERS: &[(&[ChipKind], BuildClockConverter)] = &[
    (&[Sn76489], |from, clock| Box::new(Sn76489ClockConverter::new(from, clock))),
    (&[Ay8910], |from, clock| Box::new(Ay8910ClockConverter::new(from, clock))),
    (&[Ym2203, Ym2608, Ym2612], |from, clock| Box::new(OpnClockConverter::new(from, clock))),
    (OPL, |from, clock| Box::new(OplClockConverter::new(from, clock))),
    (&[Ym2413], |from, clock| Box::new(OpllClockConverter::new(from, clock))),
    (&[Ym2151], |from, clock| Box::new(OpmClockConverter::new(from, clock))),
];

pub fn find_chip_converter(from: ChipKind, to: ChipKind) -> Option<&'static ChipConverterEntry> {
    CHIP_CONVERTERS.iter().find(|e| e.supports(from, to))
}

pub fn find_clock_converter(kind: ChipKind) -> Option<BuildClockConverter> {
    CLOCK_CONVERTERS
        .iter()
        .find(|(kinds, _)| kinds.contains(&kind))
        .map(|(_, build)| *build)
}

/// Every supported (source, destination) pair, in table order
pub fn chip_pairs() -> Vec<(ChipKind, ChipKind)> {
    CHIP_CONVERTERS
        .iter()
        .flat_map(|e| e.from.iter().flat_map(move |&f| e.to.iter().map(move |&t| (f, t))))
        .collect()
}

/// Chips with a clock converter
pub fn clock_chips() -> Vec<ChipKind> {
    CLOCK_CONVERTERS.iter().flat_map(|(kinds, _)| kinds.iter().copied()).collect()
}
