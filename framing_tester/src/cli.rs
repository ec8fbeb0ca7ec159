//! Command-line arguments.

use clap::{Args, Parser, Subcommand, ValueEnum};
use framing_vision::{AdviceTarget, AnalysisConfig, Orientation, Size, SubjectPolicy};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "framing_tester", version, about = "Run framing_vision over photos and saliency heatmaps")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Analyze one photo against a precomputed saliency heatmap
    Analyze(AnalyzeArgs),
    /// Feed a directory of frames through the streaming analyzer
    Replay(ReplayArgs),
}

/// Engine settings shared by every subcommand. Flags override the config file.
#[derive(Debug, Args)]
pub struct EngineArgs {
    /// TOML config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Saliency threshold in [0, 1]
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Longest side of the processing image
    #[arg(long)]
    pub max_dimension: Option<u32>,

    /// Placement to advise toward
    #[arg(long, value_enum)]
    pub target: Option<TargetArg>,

    /// How the main subject is chosen among several regions
    #[arg(long, value_enum)]
    pub subject: Option<SubjectArg>,
}

impl EngineArgs {
    pub fn resolve(&self) -> framing_vision::Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::load(path)?,
            None => AnalysisConfig::default(),
        };
        if let Some(threshold) = self.threshold {
            config.binarize_threshold = threshold;
        }
        if let Some(max_dimension) = self.max_dimension {
            config.processing_max_dimension = max_dimension;
        }
        if let Some(target) = self.target {
            config.advice_target = target.into();
        }
        if let Some(subject) = self.subject {
            config.subject_policy = subject.into();
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TargetArg {
    Best,
    Thirds,
    Center,
}

impl From<TargetArg> for AdviceTarget {
    fn from(arg: TargetArg) -> Self {
        match arg {
            TargetArg::Best => AdviceTarget::Best,
            TargetArg::Thirds => AdviceTarget::RuleOfThirds,
            TargetArg::Center => AdviceTarget::Center,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SubjectArg {
    First,
    Largest,
}

impl From<SubjectArg> for SubjectPolicy {
    fn from(arg: SubjectArg) -> Self {
        match arg {
            SubjectArg::First => SubjectPolicy::ScanOrder,
            SubjectArg::Largest => SubjectPolicy::LargestArea,
        }
    }
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Photo to analyze
    pub image: PathBuf,

    /// Saliency heatmap for the photo (grayscale, or RGBA read from alpha)
    #[arg(long)]
    pub saliency: PathBuf,

    /// EXIF orientation tag of the photo (1-8)
    #[arg(long, default_value_t = 1, value_parser = parse_orientation)]
    pub orientation: u16,

    /// Also report coordinates in a display space, e.g. 1080x1920
    #[arg(long, value_parser = parse_size)]
    pub display: Option<Size>,

    /// Write the binary mask to this image file
    #[arg(long)]
    pub mask_out: Option<PathBuf>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub engine: EngineArgs,
}

impl AnalyzeArgs {
    pub fn orientation(&self) -> Orientation {
        Orientation::from_exif(self.orientation).unwrap_or_default()
    }
}

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// Directory of frames, replayed in file-name order
    pub frames: PathBuf,

    /// Rate at which frames are offered to the analyzer
    #[arg(long, default_value_t = 30.0)]
    pub fps: f64,

    /// Print updates as JSON lines
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub engine: EngineArgs,
}

fn parse_orientation(raw: &str) -> Result<u16, String> {
    let tag: u16 = raw.parse().map_err(|e| format!("{e}"))?;
    Orientation::from_exif(tag)
        .map(|_| tag)
        .ok_or_else(|| format!("orientation must be between 1 and 8, got {tag}"))
}

fn parse_size(raw: &str) -> Result<Size, String> {
    let (width, height) = raw
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {raw:?}"))?;
    let width: f64 = width.trim().parse().map_err(|e| format!("bad width: {e}"))?;
    let height: f64 = height.trim().parse().map_err(|e| format!("bad height: {e}"))?;
    let size = Size::new(width, height);
    if size.is_empty() {
        return Err(format!("display size must be positive, got {raw:?}"));
    }
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_parse_from_width_by_height() {
        assert_eq!(parse_size("1080x1920").unwrap(), Size::new(1080.0, 1920.0));
        assert!(parse_size("1080").is_err());
        assert!(parse_size("0x10").is_err());
    }

    #[test]
    fn orientation_tags_are_range_checked() {
        assert_eq!(parse_orientation("6").unwrap(), 6);
        assert!(parse_orientation("9").is_err());
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from([
            "framing_tester",
            "analyze",
            "photo.jpg",
            "--saliency",
            "heat.png",
            "--threshold",
            "0.2",
            "--target",
            "center",
        ]);
        let Commands::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        let config = args.engine.resolve().unwrap();
        assert_eq!(config.binarize_threshold, 0.2);
        assert_eq!(config.advice_target, AdviceTarget::Center);
        assert_eq!(config.processing_max_dimension, 800);
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let cli = Cli::parse_from(["framing_tester", "replay", "frames", "--threshold", "3"]);
        let Commands::Replay(args) = cli.command else {
            panic!("expected replay");
        };
        assert!(args.engine.resolve().is_err());
    }
}
