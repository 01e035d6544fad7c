use crate::observability::install_observability;
use crate::padder::{Padder, Padding};
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod extractor;
mod observability;
pub mod padder;

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the SHA1 and SHA-256 fingerprints found in a signing report
    Keys(KeysArgs),
    /// Shrink an image and center it on a transparent canvas of the same size
    Pad(PadArgs),
}

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Parser, Debug)]
struct KeysArgs {
    /// Report to scan, `-` reads standard input
    #[clap(long, default_value = "signing_report.txt")]
    report: PathBuf,
    /// Maximum number of tokens per output line
    #[clap(long, default_value_t = 8, value_parser = clap::value_parser!(u16).range(1..))]
    group_size: u16,
}

#[derive(Parser, Debug)]
struct PadArgs {
    #[clap(long, default_value = "assets/icon/icon.png")]
    input: PathBuf,
    #[clap(long, default_value = "assets/icon/icon_padded.png")]
    output: PathBuf,
    /// Fraction of the content size turned into transparent margin, in [0, 1)
    #[clap(long, default_value = "0.3")]
    padding: Padding,
}

fn main() -> Result<()> {
    install_observability()?;
    let cli = Cli::parse();

    match cli.command {
        Command::Keys(args) => extractor::run(&args.report, usize::from(args.group_size))?,
        Command::Pad(args) => pad(args),
    }

    Ok(())
}

fn pad(args: PadArgs) {
    tracing::debug!("Starting padder with args: {:?}", args);

    // Image failures are logged by the padder and never abort the process.
    Padder::new(args.padding).run(&args.input, &args.output);
}
