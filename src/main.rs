use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use jittermark::config::HarnessConfig;
use jittermark::{run_jittermark, LogCollector};

#[derive(Debug, Parser)]
#[command(name = "jittermark", about = "Measure scheduling jitter of a real-time audio render loop")]
struct Cli {
    /// Harness config file (TOML). Defaults to <config_dir>/jittermark/config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run length in seconds
    #[arg(short, long)]
    duration: Option<f64>,

    /// Number of synthesizer voices
    #[arg(short = 'n', long)]
    voices: Option<u32>,

    /// Lock memory and request SCHED_FIFO for the callback thread
    #[arg(long)]
    realtime: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Also write the result to this file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => HarnessConfig::load_from(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => HarnessConfig::load_default().context("loading default config")?,
    };
    if let Some(duration) = cli.duration {
        config.duration_secs = duration;
    }
    if let Some(voices) = cli.voices {
        config.num_voices = voices;
    }
    if cli.realtime {
        config.realtime = true;
    }
    config.validate().context("invalid configuration")?;

    let logger = LogCollector::install(config.log_level_filter(), config.log_file.as_deref())
        .context("starting log writer")?;
    log::info!("JitterMark {} starting", jittermark::VERSION);

    let result = run_jittermark(config).map_err(|e| anyhow::anyhow!(e.user_message()))?;

    let rendered = if cli.json {
        serde_json::to_string_pretty(&result).context("serializing result")?
    } else {
        result.result_message.clone()
    };
    logger.wait_for_empty();
    println!("{}", rendered);

    if let Some(path) = &cli.output {
        std::fs::write(path, &rendered).with_context(|| format!("writing {}", path.display()))?;
        log::info!("Result written to {}", path.display());
    }
    logger.wait_for_empty();
    Ok(())
}
