//! Command-line harness for the framing_vision engine.

mod cli;
mod heatmap;

use anyhow::{Context, Result, bail};
use clap::Parser;
use cli::{AnalyzeArgs, Cli, Commands, ReplayArgs};
use framing_vision::parallel_pipeline::update_stream;
use framing_vision::{
    AnalysisResult, CompositionPipeline, FrameAdmission, SourceImage, StreamUpdate,
    StreamingAnalyzer,
};
use futures::StreamExt;
use heatmap::{HeatmapOracle, LuminanceOracle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Commands::Analyze(args) => run_analyze(args).await,
        Commands::Replay(args) => run_replay(args).await,
    }
}

/// Human-readable logs by default, JSON when `LOG_FORMAT=json`.
fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("framing_vision=info,framing_tester=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    }
}

async fn run_analyze(args: AnalyzeArgs) -> Result<()> {
    let config = args.engine.resolve()?;
    let photo = image::open(&args.image)
        .with_context(|| format!("failed to open photo {}", args.image.display()))?
        .to_rgb8();
    let oracle = Arc::new(HeatmapOracle::open(&args.saliency)?);
    let pipeline = CompositionPipeline::new(config, oracle)?;
    let source = SourceImage::new(photo).with_orientation(args.orientation());

    // The mask dump needs the synchronous entry point; plain analysis goes
    // through the single-shot analyzer like any other caller would.
    let result = match &args.mask_out {
        Some(mask_path) => {
            let analysis = tokio::task::spawn_blocking(move || pipeline.analyze_frame_with_mask(&source))
                .await
                .context("analysis worker panicked")??;
            analysis
                .mask
                .save(mask_path)
                .with_context(|| format!("failed to write mask {}", mask_path.display()))?;
            info!(path = %mask_path.display(), "mask written");
            analysis.result
        }
        None => {
            framing_vision::SingleShotAnalyzer::new(pipeline)
                .analyze(source)
                .await?
        }
    };

    let display = args.display.map(|size| result.mapped_to(size)).transpose()?;

    if args.json {
        let output = serde_json::json!({
            "image": result,
            "display": display,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_result("image", &result);
        if let Some(display) = &display {
            print_result("display", display);
        }
    }
    Ok(())
}

fn print_result(space: &str, result: &AnalysisResult) {
    println!(
        "[{space}] {}x{} (processed at {}x{})",
        result.image_size.width,
        result.image_size.height,
        result.processing_size.width,
        result.processing_size.height
    );
    if !result.is_subject_detected() {
        println!("  no subject detected");
        return;
    }
    for region in &result.regions {
        let b = &region.bounding_box;
        println!(
            "  region {}: box ({:.1}, {:.1}, {:.1}x{:.1}) centroid ({:.1}, {:.1}) pixels {}",
            region.id, b.x, b.y, b.width, b.height, region.centroid.x, region.centroid.y, region.pixel_count
        );
    }
    if let Some(score) = &result.score {
        println!(
            "  score {:.1} (thirds {:.1}, center {:.1}, best: {})",
            score.overall_score, score.rule_of_thirds_score, score.center_score, score.best_rule
        );
        for recommendation in &score.recommendations {
            println!("    - {recommendation}");
        }
    }
    for advice in &result.advice {
        match advice.target_point {
            Some(target) => println!(
                "  advice: {} (to {:.1}, {:.1}; intensity {:.2})",
                advice.message, target.x, target.y, advice.intensity
            ),
            None => println!("  advice: {} (intensity {:.2})", advice.message, advice.intensity),
        }
    }
}

async fn run_replay(args: ReplayArgs) -> Result<()> {
    if !(args.fps.is_finite() && args.fps > 0.0) {
        bail!("--fps must be a positive number, got {}", args.fps);
    }
    let frames = list_frames(&args.frames)?;
    if frames.is_empty() {
        bail!("no image frames found in {}", args.frames.display());
    }

    let config = args.engine.resolve()?;
    let pipeline = CompositionPipeline::new(config, Arc::new(LuminanceOracle))?;
    let (analyzer, receiver) = StreamingAnalyzer::new(pipeline)?;
    info!(
        frames = frames.len(),
        fps = args.fps,
        min_interval_ms = analyzer.min_interval().as_millis() as u64,
        "replaying"
    );

    let json = args.json;
    let printer = tokio::spawn(async move {
        let mut updates = Box::pin(update_stream(receiver));
        let mut printed = 0usize;
        while let Some(update) = updates.next().await {
            print_update(&update, json);
            printed += 1;
        }
        printed
    });

    let mut ticker = tokio::time::interval(Duration::from_secs_f64(1.0 / args.fps));
    let (mut accepted, mut dropped) = (0usize, 0usize);
    for path in &frames {
        ticker.tick().await;
        let frame = match image::open(path) {
            Ok(image) => image.to_rgb8(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable frame");
                continue;
            }
        };
        match analyzer.submit(SourceImage::new(frame)) {
            FrameAdmission::Accepted(id) => {
                debug!(frame_id = id, path = %path.display(), "frame accepted");
                accepted += 1;
            }
            admission => {
                debug!(frame_id = admission.frame_id(), ?admission, "frame dropped");
                dropped += 1;
            }
        }
    }

    // Dropping the analyzer closes the update channel once in-flight work finishes.
    drop(analyzer);
    let printed = printer.await.context("update printer panicked")?;
    info!(accepted, dropped, updates = printed, "replay finished");
    Ok(())
}

fn print_update(update: &StreamUpdate, json: bool) {
    if json {
        let line = serde_json::json!({
            "frame_id": update.frame_id,
            "regions": update.regions,
            "score": update.score,
            "advice": update.advice,
        });
        println!("{line}");
        return;
    }
    match update.advice.first() {
        Some(advice) => println!(
            "frame {}: {} region(s), {}",
            update.frame_id,
            update.regions.len(),
            advice.message
        ),
        None => println!("frame {}: no subject", update.frame_id),
    }
}

fn list_frames(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut frames = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))? {
        let path = entry?.path();
        let is_image = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg" | "bmp"))
            .unwrap_or(false);
        if is_image {
            frames.push(path);
        }
    }
    frames.sort();
    Ok(frames)
}
