// THEORY:
// This file is the main entry point for the `framing_vision` library crate.
// It defines the public API exposed to applications that want reframing
// guidance for a photo or a live camera feed.
//
// The primary interface is the `CompositionPipeline` (one photo in, one
// `AnalysisResult` out) and its async front ends in `parallel_pipeline`. The
// leaf algorithms live in `core_modules` and are public so callers can run a
// single stage on its own, for instance scoring a point they already know.
// The saliency model is not part of this crate: callers plug one in through
// the `SaliencyOracle` trait.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod oracle;
pub mod parallel_pipeline;
pub mod pipeline;

pub use config::AnalysisConfig;
pub use core_modules::advice::{Advice, AdviceKind, AdviceTarget, Direction, IntensityNormalization};
pub use core_modules::composition::{CompositionRule, CompositionScore, Recommendation, SubjectPolicy};
pub use core_modules::mask::{BinaryMask, Orientation, SaliencyMap};
pub use core_modules::region::{Point, Rect, Region, Size};
pub use error::{AnalysisError, OracleError, Result};
pub use oracle::{SaliencyOracle, SourceImage};
pub use parallel_pipeline::{FrameAdmission, SingleShotAnalyzer, StreamUpdate, StreamingAnalyzer};
pub use pipeline::{AnalysisResult, CompositionPipeline, FrameAnalysis};
