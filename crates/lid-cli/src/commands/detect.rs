//! `lid detect` - single-fragment language detection.

use anyhow::{Context, Result};
use clap::Args;
use lid_core::{DetectOptions, ModelSelector};

#[derive(Args)]
pub struct DetectArgs {
    /// Text to classify
    pub text: String,

    /// Model tier: auto, lite, or full
    #[arg(long, default_value = "auto")]
    pub model: ModelSelector,

    /// Number of top languages to return
    #[arg(short, default_value_t = 1)]
    pub k: usize,

    /// Minimum confidence threshold
    #[arg(long, default_value_t = 0.0)]
    pub threshold: f32,
}

pub fn run(args: DetectArgs) -> Result<()> {
    let options = DetectOptions {
        model: Some(args.model),
        k: args.k,
        threshold: args.threshold,
    };
    let results =
        lid_core::detect_with(&args.text, &options).context("Language detection failed")?;

    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}
