//! `lid model` - artifact inspection and prefetching.

use std::io::Write;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use lid_core::DownloadOptions;
use lid_core::model::{self, ModelTier, download};

#[derive(Args)]
pub struct ModelArgs {
    #[command(subcommand)]
    pub command: ModelCommand,
}

#[derive(Subcommand)]
pub enum ModelCommand {
    /// List known model artifacts and whether they are installed
    Status,
    /// Download the full model into the cache directory if missing
    Ensure {
        /// HTTP/HTTPS proxy for the download
        #[arg(long)]
        proxy: Option<String>,
    },
    /// Print the resolved path of a model artifact
    Path {
        /// Tier to resolve: lite or full
        #[arg(default_value = "full")]
        tier: String,
    },
}

pub fn run(args: ModelArgs) -> Result<()> {
    match args.command {
        ModelCommand::Status => status(),
        ModelCommand::Ensure { proxy } => ensure(proxy.as_deref()),
        ModelCommand::Path { tier } => path(&tier),
    }
}

fn artifact_path(tier: ModelTier) -> std::path::PathBuf {
    match tier {
        ModelTier::Lite => model::lite_model_path(),
        ModelTier::Full => model::full_model_path(&model::default_cache_dir()),
    }
}

fn status() -> Result<()> {
    eprintln!("Known model artifacts:");
    eprintln!();
    for info in model::MODELS {
        let path = artifact_path(info.tier);
        let installed = if model::model_exists(&path) {
            "[installed]"
        } else {
            ""
        };
        eprintln!("  {:4} {} - {} {}", info.tier.as_str(), info.name, info.description, installed);
    }
    eprintln!();
    eprintln!("Cache directory: {}", model::default_cache_dir().display());
    Ok(())
}

fn ensure(proxy: Option<&str>) -> Result<()> {
    let cache_dir = model::default_cache_dir();
    download::ensure_cache_dir(&cache_dir, true).context("Failed to prepare cache directory")?;

    let dest = model::full_model_path(&cache_dir);
    if model::model_exists(&dest) {
        eprintln!("Full model already present at {}", dest.display());
        return Ok(());
    }

    eprintln!("Downloading full model...");
    eprintln!("URL: {}", model::FULL_MODEL_URL);
    eprintln!("Destination: {}", dest.display());
    eprintln!();

    download::fetch_with_progress(
        model::FULL_MODEL_URL,
        &dest,
        proxy,
        &DownloadOptions::default(),
        |downloaded, total| {
            let percent = if total > 0 { downloaded * 100 / total } else { 0 };
            eprint!(
                "\rDownloading: {}% ({:.1} MB / {:.1} MB)  ",
                percent,
                downloaded as f64 / 1_000_000.0,
                total as f64 / 1_000_000.0
            );
            std::io::stderr().flush().ok();
        },
    )
    .context("Model download failed")?;
    eprintln!();

    match model::verify::verify(&dest, model::FULL_MODEL_MD5) {
        Ok(true) => eprintln!("Checksum OK"),
        Ok(false) => eprintln!("Warning: checksum mismatch; the model may be corrupt"),
        Err(e) => eprintln!("Warning: could not verify download: {}", e),
    }

    eprintln!("Full model ready at {}", dest.display());
    Ok(())
}

fn path(tier: &str) -> Result<()> {
    let tier = match tier.to_lowercase().as_str() {
        "lite" => ModelTier::Lite,
        "full" => ModelTier::Full,
        other => anyhow::bail!("unknown tier `{}` (expected lite or full)", other),
    };
    println!("{}", artifact_path(tier).display());
    Ok(())
}
