//! Conversion planning and execution
//!
//! A request names a source chip and a destination chip (and optionally a
//! destination clock). Planning picks the chip converter for the pair and,
//! when the requested clock differs from the one the chip converter
//! naturally produces, puts a clock converter for the source chip in front
//! of it. The stages then run as one [`Pipeline`] over the command stream.

use crate::chips::{ChipDescriptor, ChipKind};
use crate::converter::registry::{find_chip_converter, find_clock_converter, BuildClockConverter, ChipConverterEntry};
use crate::converter::{Converter, Diagnostics, OptionSpec, Options, VoiceTable};
use crate::error::{Error, Result};
use crate::vgm::{Command, VgmFile, VgmWriter};

/// Clocks closer than this are the same clock
const CLOCK_TOLERANCE: f64 = 1.0;

/// What to convert, as given by the caller
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionRequest {
    /// Source chip; a clock of 0 means the clock stored in the input
    pub from: ChipDescriptor,
    pub to: ChipKind,
    /// Destination clock; the chip's typical clock when absent
    pub to_clock: Option<f64>,
    /// Raw `key=value` converter options
    pub options: Vec<(String, String)>,
    pub strip_gd3: bool,
}

impl ConversionRequest {
    pub fn new(from: ChipDescriptor, to: ChipKind) -> Self {
        Self {
            from,
            to,
            to_clock: None,
            options: Vec::new(),
            strip_gd3: false,
        }
    }

    pub fn with_clock(mut self, clock: f64) -> Self {
        self.to_clock = Some(clock);
        self
    }

    pub fn with_option(mut self, key: &str, value: &str) -> Self {
        self.options.push((key.to_string(), value.to_string()));
        self
    }
}

#[derive(Clone, Copy)]
enum Stage {
    Clock {
        from: ChipDescriptor,
        to_clock: f64,
        build: BuildClockConverter,
    },
    Chip {
        from: ChipDescriptor,
        to: ChipKind,
        entry: &'static ChipConverterEntry,
    },
}

/// Selected stages of a conversion, not yet built
pub struct Plan {
    stages: Vec<Stage>,
    pub source: ChipDescriptor,
    pub destination: ChipDescriptor,
}

fn clock_stage(from: ChipDescriptor, to_clock: f64) -> Result<Stage> {
    let build = find_clock_converter(from.kind).ok_or_else(|| Error::UnsupportedClock(from.kind.name().into()))?;
    Ok(Stage::Clock { from, to_clock, build })
}

impl Plan {
    pub fn new(from: ChipDescriptor, to: ChipKind, to_clock: Option<f64>) -> Result<Self> {
        let to_clock = to_clock.filter(|&c| c > 0.0);

        if from.kind == to {
            let plan = match to_clock.filter(|&c| (c - from.clock).abs() >= CLOCK_TOLERANCE) {
                Some(clock) => Self {
                    stages: vec![clock_stage(from, clock)?],
                    source: from,
                    destination: from.with_sub_module(None).with_clock(clock),
                },
                None => Self {
                    stages: Vec::new(),
                    source: from,
                    destination: from.with_sub_module(None),
                },
            };
            return Ok(plan);
        }

        let entry = find_chip_converter(from.kind, to).ok_or_else(|| Error::UnsupportedPair {
            from: from.kind.name().into(),
            to: to.name().into(),
        })?;
        let ratio = (entry.clock_ratio)(from.kind, to);
        let natural = from.clock * ratio;
        let target = to_clock.unwrap_or_else(|| to.default_clock());

        let mut stages = Vec::new();
        let mut chip_from = from;
        if (target - natural).abs() >= CLOCK_TOLERANCE && ratio > 0.0 {
            let clock = target / ratio;
            stages.push(clock_stage(from, clock)?);
            chip_from = from.with_clock(clock);
        }
        stages.push(Stage::Chip {
            from: chip_from,
            to,
            entry,
        });
        Ok(Self {
            stages,
            source: from,
            destination: ChipDescriptor::new(to, chip_from.clock * ratio).with_index(from.index),
        })
    }

    /// Nothing to convert
    pub fn is_identity(&self) -> bool {
        self.stages.is_empty()
    }

    /// Option keys accepted by the planned stages
    pub fn option_specs(&self) -> Vec<OptionSpec> {
        let mut specs: Vec<OptionSpec> = Vec::new();
        for stage in &self.stages {
            if let Stage::Chip { entry, .. } = stage {
                for spec in entry.options {
                    if !specs.iter().any(|s| s.key == spec.key) {
                        specs.push(*spec);
                    }
                }
            }
        }
        specs
    }

    pub fn validate_options(&self, raw: &[(String, String)]) -> Result<Options> {
        Options::validate(raw, &self.option_specs())
    }

    pub fn build(&self, opts: &Options, table: &VoiceTable) -> Pipeline {
        let stages = self
            .stages
            .iter()
            .map(|stage| {
                let conv = match *stage {
                    Stage::Clock { from, to_clock, build } => build(from, to_clock),
                    Stage::Chip { from, to, entry } => (entry.build)(from, to, opts, table),
                };
                log::debug!("stage {} => {}", conv.source(), conv.destination());
                conv
            })
            .collect();
        Pipeline::new(stages)
    }
}

/// Converters applied in order to every command
pub struct Pipeline {
    stages: Vec<Box<dyn Converter>>,
}

impl Pipeline {
    pub fn new(stages: Vec<Box<dyn Converter>>) -> Self {
        Self { stages }
    }

    /// Run `cmd` through the stages from `start` on
    fn feed(&mut self, start: usize, cmd: &Command, diag: &mut dyn Diagnostics, out: &mut Vec<Command>) {
        let mut batch = vec![cmd.clone()];
        for stage in &mut self.stages[start..] {
            let mut next = Vec::with_capacity(batch.len());
            for c in &batch {
                next.extend(stage.convert(c, diag));
            }
            batch = next;
        }
        out.extend(batch);
    }

    /// Convert a command stream.
    ///
    /// Each stage's setup commands go through the stages after it, the last
    /// stage's first. Returns the output and the output index of the command
    /// stream's loop point.
    pub fn run(
        &mut self,
        commands: &[Command],
        loop_index: Option<usize>,
        diag: &mut dyn Diagnostics,
    ) -> (Vec<Command>, Option<usize>) {
        let mut out = Vec::with_capacity(commands.len());
        for k in (0..self.stages.len()).rev() {
            for cmd in self.stages[k].initial_commands() {
                self.feed(k + 1, &cmd, diag, &mut out);
            }
        }

        let mut out_loop = None;
        for (i, cmd) in commands.iter().enumerate() {
            if Some(i) == loop_index {
                out_loop = Some(out.len());
            }
            self.feed(0, cmd, diag, &mut out);
            if cmd.is_end() {
                break;
            }
        }
        (out, out_loop)
    }
}

/// Result of [`convert_vgm`]
#[derive(Debug, Clone)]
pub struct Conversion {
    /// Complete output VGM image
    pub data: Vec<u8>,
    pub destination: ChipDescriptor,
}

/// Convert an uncompressed VGM image
pub fn convert_vgm(
    input: &[u8],
    request: &ConversionRequest,
    table: &VoiceTable,
    diag: &mut dyn Diagnostics,
) -> Result<Conversion> {
    let file = VgmFile::parse(input)?;
    let source_clock = file.header.chip_clock(request.from.kind);
    let from = if request.from.clock > 0.0 {
        request.from
    } else {
        match source_clock {
            Some(c) => request.from.with_clock(c.clock as f64),
            None => return Err(Error::MissingChip(request.from.kind.name().into())),
        }
    };

    let plan = Plan::new(from, request.to, request.to_clock)?;
    let opts = plan.validate_options(&request.options)?;
    let mut pipeline = plan.build(&opts, table);
    let (commands, loop_index) = pipeline.run(&file.commands, file.loop_index, diag);
    let destination = plan.destination;
    log::info!("{} => {}", from, destination);

    let mut writer = VgmWriter::new(file.header.clone());
    if from.sub_module.is_none() && from.kind != destination.kind {
        writer.clear_chip_clock(from.kind);
    }
    let dual = source_clock.is_some_and(|c| c.dual)
        || file.header.chip_clock(destination.kind).is_some_and(|c| c.dual);
    writer.set_chip_clock(destination.kind, destination.clock, dual);
    writer.set_volume_modifier(0);
    for (i, cmd) in commands.iter().enumerate() {
        if Some(i) == loop_index {
            writer.mark_loop_start();
        }
        writer.write_command(cmd);
    }
    let gd3 = if request.strip_gd3 { None } else { file.gd3.as_deref() };
    Ok(Conversion {
        data: writer.finish(gd3),
        destination,
    })
}
