use clap::Parser;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::BTreeMap;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use vgm_conv::converter::options::parse_define;
use vgm_conv::converter::registry::{chip_pairs, clock_chips, find_chip_converter};
use vgm_conv::converter::{OptionKind, VoiceMapping};
use vgm_conv::{convert_vgm, ChipDescriptor, ChipKind, ConversionRequest, Diagnostics, VoiceReport, VoiceTable};

#[derive(Parser, Debug)]
#[command(name = "vgm-conv")]
#[command(version = "0.1.0")]
#[command(about = "Chip-type and clock converter for VGM", long_about = None)]
struct Args {
    /// Input VGM or VGZ file (reads from stdin if not specified)
    input: Option<PathBuf>,

    /// Source chip, optionally restricted to a part (e.g. ym2203.fm)
    #[arg(short, long, required_unless_present_any = ["to", "list"])]
    from: Option<String>,

    /// Destination chip
    #[arg(short, long)]
    to: Option<String>,

    /// Destination clock in Hz (the chip's typical clock if not specified)
    #[arg(short, long)]
    clock: Option<f64>,

    /// Converter option as name=value
    #[arg(short = 'D', long = "define", value_name = "NAME=VALUE")]
    defines: Vec<String>,

    /// Output file; *.vgz is compressed (writes to stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Voice mapping overrides (JSON)
    #[arg(long)]
    voice_table: Option<PathBuf>,

    /// Remove the GD3 tag from the output
    #[arg(long)]
    no_gd3: bool,

    /// List the available conversions and their options
    #[arg(short = 'L', long)]
    list: bool,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Prints each new voice mapping to stderr as an overrides file entry
struct VoiceReportPrinter;

impl Diagnostics for VoiceReportPrinter {
    fn voice_estimated(&mut self, report: &VoiceReport) {
        log::info!("{} ch{}: voice {}", report.chip, report.channel, report.hash);
        match report_line(report) {
            Ok(line) => eprintln!("{}", line),
            Err(e) => log::warn!("cannot print voice {}: {}", report.hash, e),
        }
    }
}

/// One overrides file entry, `{"<hash>": {mapping}}`
fn report_line(report: &VoiceReport) -> serde_json::Result<String> {
    let entry: BTreeMap<&str, VoiceMapping> = BTreeMap::from([(report.hash.as_str(), report.mapping)]);
    serde_json::to_string(&entry)
}

fn main() -> Result<(), vgm_conv::Error> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    env_logger::Builder::from_default_env().filter_level(level).init();

    if args.list {
        print_conversions();
        return Ok(());
    }

    // either chip alone means a clock conversion of that chip
    let (from_name, to_name) = match (&args.from, &args.to) {
        (Some(from), Some(to)) => (from.as_str(), to.as_str()),
        (Some(only), None) | (None, Some(only)) => (only.as_str(), only.split('.').next().unwrap_or(only)),
        (None, None) => return Err(vgm_conv::Error::UnknownChip(String::new())),
    };
    let from = ChipDescriptor::parse(from_name, 0.0)?;
    let to = ChipDescriptor::parse(to_name, 0.0)?.kind;

    let mut request = ConversionRequest::new(from, to);
    request.to_clock = args.clock;
    request.strip_gd3 = args.no_gd3;
    for define in &args.defines {
        request.options.push(parse_define(define)?);
    }

    let mut table = VoiceTable::new();
    if let Some(path) = &args.voice_table {
        table.merge(VoiceTable::load(path)?);
    }

    let input = read_input(args.input.as_deref())?;
    let converted = convert_vgm(&input, &request, &table, &mut VoiceReportPrinter)?;
    write_output(args.output.as_deref(), &converted.data)?;
    Ok(())
}

/// Read a VGM or VGZ image, decompressing if the gzip magic is present
fn read_input(path: Option<&Path>) -> io::Result<Vec<u8>> {
    let mut data = Vec::new();
    match path {
        Some(path) => std::fs::File::open(path)?.read_to_end(&mut data)?,
        None => io::stdin().lock().read_to_end(&mut data)?,
    };
    if data.len() >= 2 && data[0] == 0x1f && data[1] == 0x8b {
        let mut decompressed = Vec::new();
        GzDecoder::new(data.as_slice()).read_to_end(&mut decompressed)?;
        return Ok(decompressed);
    }
    Ok(data)
}

fn write_output(path: Option<&Path>, data: &[u8]) -> io::Result<()> {
    let Some(path) = path else {
        let mut stdout = io::stdout().lock();
        stdout.write_all(data)?;
        return stdout.flush();
    };
    let file = std::fs::File::create(path)?;
    let compress = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("vgz") || ext.eq_ignore_ascii_case("gz"));
    if compress {
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(data)?;
        encoder.finish()?;
    } else {
        let mut file = file;
        file.write_all(data)?;
    }
    Ok(())
}

fn print_conversions() {
    println!("CLOCK CONVERSION");
    let names: Vec<&str> = clock_chips().into_iter().map(ChipKind::name).collect();
    println!("  {}", names.join(", "));
    println!();
    println!("CHIP CONVERSION");
    let mut printed: Vec<ChipKind> = Vec::new();
    let pairs = chip_pairs();
    for (from, _) in &pairs {
        if printed.contains(from) {
            continue;
        }
        printed.push(*from);
        let targets: Vec<&str> = pairs.iter().filter(|(f, _)| f == from).map(|(_, t)| t.name()).collect();
        println!("  {:<8} => {}", from.name(), targets.join(", "));
        for to in pairs.iter().filter(|(f, _)| f == from).map(|(_, t)| *t) {
            let Some(entry) = find_chip_converter(*from, to) else {
                continue;
            };
            for spec in entry.options {
                let kind = match spec.kind {
                    OptionKind::Int { min, max } => format!("{}..={}", min, max),
                    OptionKind::Bool => "true|false".to_string(),
                    OptionKind::Choice(choices) => choices.join("|"),
                };
                println!("      -D {}=<{}> ({}): {}", spec.key, kind, to.name(), spec.help);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_line_is_override_entry() {
        let report = VoiceReport {
            chip: ChipKind::Ym2612,
            channel: 2,
            hash: "00ff".to_string(),
            mapping: VoiceMapping {
                program: 3,
                volume_offset: -1,
                octave_offset: 0,
            },
        };
        let line = report_line(&report).unwrap();
        assert_eq!(line, r#"{"00ff":{"program":3,"volumeOffset":-1,"octaveOffset":0}}"#);
        let table = VoiceTable::from_json(&format!(r#"{{"voices":{}}}"#, line)).unwrap();
        assert_eq!(table.get("00ff"), Some(report.mapping));
    }
}
