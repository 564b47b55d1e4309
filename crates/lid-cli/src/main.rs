mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "lid", version, about = "Language identification with tiered fastText models")]
struct Cli {
    /// Print verbose diagnostics to stderr
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Detect the language(s) of a text fragment
    Detect(commands::detect::DetectArgs),
    /// Split mixed-language text into per-language cells
    Segment(commands::segment::SegmentArgs),
    /// Inspect and manage the model artifacts
    Model(commands::model::ModelArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.verbose {
        lid_core::set_verbose(true);
    }

    match cli.command {
        Command::Detect(args) => commands::detect::run(args),
        Command::Segment(args) => commands::segment::run(args),
        Command::Model(args) => commands::model::run(args),
    }
}
