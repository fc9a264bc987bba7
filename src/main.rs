use anyhow::{ensure, Context, Result};
use clap::Parser;
use rayon::ThreadPoolBuilder;
use tracing::info;

use seg_frac_rs::{BatchRunner, Config, ModelRegistry, Normalizer, Segmenter};

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::parse();
    config.validate().context("invalid configuration")?;

    ensure!(config.model_path.exists(), "Model path does not exist");
    ensure!(config.image_dir.exists(), "Image directory does not exist");

    ThreadPoolBuilder::new()
        .num_threads(config.num_threads)
        .build_global()?;

    let registry = ModelRegistry::with_builtins();
    let model = registry
        .build(&config.arch, &config)
        .context("model construction failed")?;

    let segmenter = Segmenter::new(
        model,
        Normalizer::imagenet(),
        config.window_spec(),
        config.scales.clone(),
        config.base_size,
        config.flip(),
    )?;

    let runner = BatchRunner::new(segmenter, config.image_dir.clone());
    let summary = runner.run(&config.manifest_file, &config.output_file)?;

    info!(
        "done: {} rows, {} succeeded, {} failed",
        summary.total, summary.succeeded, summary.failed
    );
    Ok(())
}
