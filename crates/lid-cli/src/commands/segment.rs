//! `lid segment` - mixed-language segmentation.

use anyhow::{Context, Result};
use clap::Args;
use lid_core::{ModelSelector, SegmentOptions};

#[derive(Args)]
pub struct SegmentArgs {
    /// Text to segment
    pub text: String,

    /// Maximum characters fed to one detection call
    #[arg(long, default_value_t = 150)]
    pub cell_limit: usize,

    /// Keep adjacent same-language chunks as separate cells
    #[arg(long)]
    pub no_merge: bool,

    /// Keep chunks that produced no detection result
    #[arg(long)]
    pub keep_empty: bool,

    /// Model tier used for the per-chunk detection calls
    #[arg(long, default_value = "lite")]
    pub model: ModelSelector,
}

pub fn run(args: SegmentArgs) -> Result<()> {
    let options = SegmentOptions {
        cell_limit: args.cell_limit,
        merge_same: !args.no_merge,
        filter_empty: !args.keep_empty,
        model: args.model,
    };
    let cells = lid_core::segment(&args.text, &options).context("Segmentation failed")?;

    println!("{}", serde_json::to_string_pretty(&cells)?);
    Ok(())
}
