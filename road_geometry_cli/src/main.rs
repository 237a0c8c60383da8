use std::{
    fs,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::{Parser, Subcommand, ValueEnum};
use road_geometry::{
    geometry::Point,
    record,
    ref_line,
    verboser::{Message, Verboser},
    Arc, ByteOrder, CodecConfig, Curve, Header, Line, Record, ReferenceLine, SamplingConfig,
    Spiral,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Byte order of the encoded file. Overrides the config file.
    #[arg(long, global = true)]
    byte_order: Option<ByteOrderArg>,

    /// JSON file with `codec` and `sampling` settings.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Report every decoded record on stderr.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the geometries of an encoded reference line.
    Inspect {
        file: PathBuf,
        /// Print the reference line as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Print `s,x,y` rows of the linear approximation.
    Sample {
        file: PathBuf,
        /// Arc length step, in meters.
        #[arg(long)]
        eps: Option<f64>,
        #[arg(long)]
        from: Option<f64>,
        #[arg(long)]
        to: Option<f64>,
    },
    /// Find the arc length closest to a point.
    Locate {
        file: PathBuf,
        #[arg(allow_negative_numbers = true)]
        x: f64,
        #[arg(allow_negative_numbers = true)]
        y: f64,
    },
    /// Write a sample reference line made of a line, a spiral, an arc and a line.
    Demo { file: PathBuf },
}

#[derive(Clone, Copy, Debug)]
enum ByteOrderArg {
    Little,
    Big,
}

impl ValueEnum for ByteOrderArg {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Little, Self::Big]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(match self {
            Self::Little => clap::builder::PossibleValue::new("little")
                .alias("Little")
                .alias("le"),
            Self::Big => clap::builder::PossibleValue::new("big")
                .alias("Big")
                .alias("be"),
        })
    }
}

impl From<ByteOrderArg> for ByteOrder {
    fn from(value: ByteOrderArg) -> Self {
        match value {
            ByteOrderArg::Little => ByteOrder::Little,
            ByteOrderArg::Big => ByteOrder::Big,
        }
    }
}

#[derive(Debug, Error)]
enum CliError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Output(#[from] io::Error),
    #[error("invalid config: {0}")]
    Config(#[from] serde_json::Error),
    #[error("invalid reference line: {0}")]
    ReferenceLine(#[from] ref_line::Error),
    #[error("invalid geometry: {0}")]
    Record(#[from] record::Error),
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct Config {
    codec: CodecConfig,
    sampling: SamplingConfig,
}

impl Config {
    fn load(args: &Args) -> Result<Self, CliError> {
        let mut config = match &args.config {
            Some(path) => serde_json::from_slice(&read(path)?)?,
            None => Self::default(),
        };
        if let Some(byte_order) = args.byte_order {
            config.codec.byte_order = byte_order.into();
        }
        Ok(config)
    }
}

/// Writes codec progress to stderr when enabled.
struct Stderr {
    enabled: bool,
}

impl Verboser for Stderr {
    fn verbose(&mut self, message: Message) {
        if !self.enabled {
            return;
        }
        match message {
            Message::Decoded {
                index,
                offset,
                kind,
            } => eprintln!("decoded #{index} {kind} at byte {offset}"),
            Message::Encoded {
                index,
                offset,
                kind,
            } => eprintln!("encoded #{index} {kind} at byte {offset}"),
            Message::Sampled { index, samples } => {
                eprintln!("sampled #{index} into {samples} points")
            }
        }
    }
}

#[derive(Serialize)]
struct Inspection<'a> {
    length: f64,
    geometries: &'a [Record],
}

fn read(path: &Path) -> Result<Vec<u8>, CliError> {
    fs::read(path).map_err(|source| CliError::Io {
        path: path.to_owned(),
        source,
    })
}

fn load_line(path: &Path, config: &Config, verboser: &mut Stderr) -> Result<ReferenceLine, CliError> {
    let bytes = read(path)?;
    Ok(ReferenceLine::from_bytes(&bytes, &config.codec, verboser)?)
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), CliError> {
    let config = Config::load(args)?;
    let mut verboser = Stderr {
        enabled: args.verbose,
    };
    let mut out = BufWriter::new(io::stdout().lock());

    match &args.command {
        Command::Inspect { file, json } => {
            let line = load_line(file, &config, &mut verboser)?;
            if *json {
                let inspection = Inspection {
                    length: line.length(),
                    geometries: line.geometries(),
                };
                serde_json::to_writer_pretty(&mut out, &inspection)?;
                writeln!(out)?;
            } else {
                writeln!(out, "length {} with {} geometries", line.length(), line.len())?;
                for geometry in line.geometries() {
                    let header = geometry.header();
                    writeln!(
                        out,
                        "{:<10} s0={:<12.4} x0={:<12.4} y0={:<12.4} hdg0={:<9.5} length={:.4}",
                        geometry.kind().to_string(),
                        header.s0(),
                        header.x0(),
                        header.y0(),
                        header.hdg0(),
                        header.length()
                    )?;
                }
            }
        }
        Command::Sample { file, eps, from, to } => {
            let line = load_line(file, &config, &mut verboser)?;
            let eps = eps.unwrap_or(config.sampling.eps);
            let from = from.unwrap_or(0.0);
            let to = to.unwrap_or(line.length());
            writeln!(out, "s,x,y")?;
            for s in line.approximate_linear_with(eps, from, to, &mut verboser) {
                if let Some(p) = line.get_xy(s) {
                    writeln!(out, "{s},{},{}", p.x, p.y)?;
                }
            }
        }
        Command::Locate { file, x, y } => {
            let line = load_line(file, &config, &mut verboser)?;
            match line.match_point(Point::new(*x, *y), &config.sampling) {
                Some(s) => {
                    let p = line.get_xy(s).unwrap_or_default();
                    let distance = p.distance(&Point::new(*x, *y));
                    writeln!(out, "s={s} point={p} distance={distance}")?;
                }
                None => writeln!(out, "reference line has no geometries")?,
            }
        }
        Command::Demo { file } => {
            let line = demo_line()?;
            let bytes = line.to_bytes_with(&config.codec, &mut verboser)?;
            fs::write(file, bytes).map_err(|source| CliError::Io {
                path: file.clone(),
                source,
            })?;
            writeln!(out, "wrote {} geometries to {}", line.len(), file.display())?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Header continuing `curve` from its end point and heading.
fn continue_from(curve: &impl Curve, length: f64) -> Result<Header, record::Error> {
    let header = curve.header();
    let end = curve.get_xy(header.end());
    let grad = curve.get_grad(header.end());
    Header::new(header.end(), end.x, end.y, grad.y.atan2(grad.x), length)
}

fn demo_line() -> Result<ReferenceLine, record::Error> {
    let straight = Line::new(Header::new(0.0, 0.0, 0.0, 0.0, 20.0)?);
    let transition = Spiral::new(continue_from(&straight, 20.0)?, 0.0, 0.05)?;
    let bend = Arc::new(continue_from(&transition, 15.0)?, 0.05)?;
    let exit = Line::new(continue_from(&bend, 30.0)?);
    let length = exit.header().end();
    Ok(ReferenceLine::from_geometries(
        length,
        [
            Record::from(straight),
            transition.into(),
            bend.into(),
            exit.into(),
        ],
    ))
}
