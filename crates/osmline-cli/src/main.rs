//! Converts line-oriented OSM XML into a file of columnar record batches.

mod config;
mod validating;

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, error::ErrorKind};
use osmline::{BatchWriter, IngestStats, ingest};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{IngestConfig, OnError};
use crate::validating::Validating;

#[derive(Debug, Parser)]
#[command(
    name = "osmline",
    version,
    disable_help_subcommand = true,
    about = "Convert line-oriented OSM XML into columnar record batches"
)]
struct Cli {
    #[arg(value_name = "INPUT", help = "OSM XML file, one element per line, or - for stdin")]
    input: PathBuf,
    #[arg(short, long, value_name = "PATH", help = "Destination frame file")]
    output: PathBuf,
    #[arg(long, value_name = "PATH", help = "TOML file with ingest settings")]
    config: Option<PathBuf>,
    #[arg(long = "on-error", value_enum, help = "Abort on the first bad line or skip it")]
    on_error: Option<OnError>,
    #[arg(
        long = "rows-per-batch",
        value_name = "N",
        value_parser = parse_positive_usize,
        help = "Rows buffered per frame"
    )]
    rows_per_batch: Option<usize>,
    #[arg(
        long = "compression-level",
        value_name = "LEVEL",
        allow_negative_numbers = true,
        help = "zstd compression level"
    )]
    compression_level: Option<i32>,
    #[arg(
        long,
        conflicts_with = "compression_level",
        help = "Write uncompressed frames even if the config sets a level"
    )]
    uncompressed: bool,
    #[arg(long, help = "Drop records that fail semantic validation")]
    validate: bool,
    #[arg(short, long, help = "Log at debug level unless RUST_LOG is set")]
    verbose: bool,
}

impl Cli {
    /// Loads the config file, if any, and applies command-line overrides.
    fn resolve_config(&self) -> Result<IngestConfig, config::ConfigError> {
        let mut config = match &self.config {
            Some(path) => IngestConfig::load_from_path(path)?,
            None => IngestConfig::default(),
        };
        if let Some(on_error) = self.on_error {
            config.on_error = on_error;
        }
        if let Some(rows) = self.rows_per_batch {
            config.rows_per_batch = rows;
        }
        if let Some(level) = self.compression_level {
            config.compression_level = Some(level);
        }
        if self.uncompressed {
            config.compression_level = None;
        }
        config.validate |= self.validate;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let Some(cli) = parse_cli::<Cli, _>(std::env::args_os())? else {
        return Ok(());
    };
    init_tracing(cli.verbose);

    let config = cli.resolve_config()?;
    info!(
        input = %cli.input.display(),
        output = %cli.output.display(),
        ?config,
        "starting ingest"
    );

    let reader = open_input(&cli.input)?;
    let out = File::create(&cli.output)
        .with_context(|| format!("Failed to create {}", cli.output.display()))?;
    let mut writer = BatchWriter::new(BufWriter::new(out), config.batch_options());

    let (stats, rejected) = if config.validate {
        let mut sink = Validating::new(&mut writer);
        let stats = ingest(reader, &mut sink, config.policy())?;
        (stats, sink.rejected())
    } else {
        (ingest(reader, &mut writer, config.policy())?, 0)
    };

    print_summary(&cli.output, &stats, rejected, writer.frames_written());
    Ok(())
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn open_input(path: &Path) -> anyhow::Result<Box<dyn BufRead>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

fn print_summary(output: &Path, stats: &IngestStats, rejected: usize, frames: usize) {
    println!("Lines read:     {}", stats.lines);
    println!("Nodes:          {}", stats.nodes);
    println!("Ways:           {}", stats.ways);
    println!("Relations:      {}", stats.relations);
    if stats.skipped > 0 {
        println!("Lines skipped:  {}", stats.skipped);
    }
    if stats.discarded > 0 {
        println!("Discarded:      {}", stats.discarded);
    }
    if rejected > 0 {
        println!("Invalid:        {}", rejected);
    }
    println!("Wrote {} frame(s) to {}", frames, output.display());
}

fn parse_cli<T, I>(args: I) -> anyhow::Result<Option<T>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}

fn parse_positive_usize(raw: &str) -> Result<usize, String> {
    let parsed = raw
        .parse::<usize>()
        .map_err(|_| format!("Could not parse '{}' as a positive integer", raw))?;
    if parsed == 0 {
        return Err("--rows-per-batch must be greater than zero".to_string());
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cli(args: &[&str]) -> Cli {
        parse_cli::<Cli, _>(std::iter::once("osmline").chain(args.iter().copied()))
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let cli = cli(&["in.osm", "-o", "out.osmb"]);
        let config = cli.resolve_config().unwrap();
        assert_eq!(config, IngestConfig::default());
    }

    #[test]
    fn test_flags_override_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("osmline.toml");
        std::fs::write(&path, "on_error = \"skip\"\nrows_per_batch = 10\ncompression_level = 5\n")
            .unwrap();
        let path = path.to_str().unwrap();

        let config = cli(&["in.osm", "-o", "o", "--config", path, "--rows-per-batch", "3"])
            .resolve_config()
            .unwrap();
        assert_eq!(config.on_error, OnError::Skip);
        assert_eq!(config.rows_per_batch, 3);
        assert_eq!(config.compression_level, Some(5));

        let config = cli(&["in.osm", "-o", "o", "--config", path, "--uncompressed", "--on-error", "abort"])
            .resolve_config()
            .unwrap();
        assert_eq!(config.compression_level, None);
        assert_eq!(config.on_error, OnError::Abort);
    }

    #[test]
    fn test_rejects_zero_rows() {
        let err = parse_cli::<Cli, _>(["osmline", "in", "-o", "o", "--rows-per-batch", "0"]).unwrap_err();
        assert!(err.to_string().contains("greater than zero"));
    }

    #[test]
    fn test_help_is_not_an_error() {
        assert!(parse_cli::<Cli, _>(["osmline", "--help"]).unwrap().is_none());
    }

    #[test]
    fn test_converts_file() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.osm");
        std::fs::write(
            &input,
            "<osm>\n<node id=\"1\" lat=\"1\" lon=\"1\"/>\n<node id=\"2\" lat=\"95\" lon=\"1\"/>\n</osm>\n",
        )
        .unwrap();

        let config = IngestConfig {
            validate: true,
            ..IngestConfig::default()
        };
        let mut writer = BatchWriter::new(Vec::new(), config.batch_options());
        let mut sink = Validating::new(&mut writer);
        let stats = ingest(open_input(&input).unwrap(), &mut sink, config.policy()).unwrap();
        assert_eq!(stats.nodes, 2);
        assert_eq!(sink.rejected(), 1);

        let batches = osmline::read_frames(&writer.into_inner()).unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].nodes.len(), 1);
    }
}
