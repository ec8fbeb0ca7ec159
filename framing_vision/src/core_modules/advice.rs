// THEORY:
// The `advice` module turns a score into something a photographer can act on:
// "move the subject this way, this much". It is the last layer of the engine.
//
// Key architectural principles:
// 1.  **Tagged Targets**: The caller names a target as a variant of
//     `AdviceTarget`. `Best` is resolved per call by scoring the subject against
//     both rules and taking the winner (ties go to the rule of thirds); after
//     resolution every code path works with a concrete `CompositionRule`.
// 2.  **Exact Compass Buckets**: The move direction is `atan2(dy, dx)` in
//     degrees, cut into eight 45-degree sectors centered on the compass points.
//     Sector boundaries are lower-inclusive, so every angle, including the exact
//     boundaries, lands in exactly one bucket. Pixel y grows downward, so a
//     positive angle points "down".
// 3.  **Intensity**: How urgent the move is, in [0, 1]. By default it is the raw
//     pixel distance over a fixed 100 px reference, which makes it depend on
//     image resolution. `IntensityNormalization::HalfDiagonal` makes it relative
//     to the frame instead.
// 4.  **Deterministic Text**: Messages are fixed templates over the target name
//     and direction.

use crate::core_modules::composition::{CompositionRule, SubjectPolicy, composition_scorer};
use crate::core_modules::coordinate_mapper::{ScaleFactors, Scalable};
use crate::core_modules::region::{Point, Region, Size};
use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Intensity given to the multi-subject advisory.
pub const MULTI_SUBJECT_INTENSITY: f64 = 0.8;

/// The placement a caller asks advice toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdviceTarget {
    RuleOfThirds,
    Center,
    /// Whichever of the two rules the subject already scores better on.
    #[default]
    Best,
}

impl AdviceTarget {
    /// Resolves `Best` for a subject at `current`; the other variants map directly.
    pub fn resolve(self, current: Point, size: Size) -> CompositionRule {
        match self {
            Self::RuleOfThirds => CompositionRule::RuleOfThirds,
            Self::Center => CompositionRule::Center,
            Self::Best => composition_scorer::best_rule(
                composition_scorer::evaluate_rule_of_thirds(current, size),
                composition_scorer::evaluate_center_composition(current, size),
            ),
        }
    }
}

/// One of the eight compass directions, in image space (y grows downward).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    UpLeft,
    UpRight,
    DownLeft,
    DownRight,
}

impl Direction {
    /// Buckets an angle in degrees, as returned by `atan2(dy, dx)`.
    ///
    /// [-22.5, 22.5) is right, [22.5, 67.5) down-right, and so on around the
    /// circle; everything at or beyond ±157.5 is left.
    pub fn from_degrees(degrees: f64) -> Self {
        if (-22.5..22.5).contains(&degrees) {
            Self::Right
        } else if (22.5..67.5).contains(&degrees) {
            Self::DownRight
        } else if (67.5..112.5).contains(&degrees) {
            Self::Down
        } else if (112.5..157.5).contains(&degrees) {
            Self::DownLeft
        } else if degrees >= 157.5 || degrees < -157.5 {
            Self::Left
        } else if (-157.5..-112.5).contains(&degrees) {
            Self::UpLeft
        } else if (-112.5..-67.5).contains(&degrees) {
            Self::Up
        } else {
            Self::UpRight
        }
    }

    /// Direction of travel from `from` to `to`.
    pub fn between(from: Point, to: Point) -> Self {
        Self::from_degrees((to.y - from.y).atan2(to.x - from.x).to_degrees())
    }

    pub fn phrase(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
            Self::UpLeft => "up and to the left",
            Self::UpRight => "up and to the right",
            Self::DownLeft => "down and to the left",
            Self::DownRight => "down and to the right",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.phrase())
    }
}

/// How distance to the target is turned into an intensity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum IntensityNormalization {
    /// `min(1, distance / reference)` with `distance` in raw pixels.
    FixedPixels { reference: f64 },
    /// `min(1, distance / half_diagonal)`, independent of resolution.
    HalfDiagonal,
}

impl Default for IntensityNormalization {
    fn default() -> Self {
        Self::FixedPixels { reference: 100.0 }
    }
}

impl IntensityNormalization {
    pub fn intensity(&self, distance: f64, size: Size) -> f64 {
        let reference = match self {
            Self::FixedPixels { reference } => *reference,
            Self::HalfDiagonal => size.half_diagonal(),
        };
        if reference <= 0.0 {
            return 1.0;
        }
        (distance / reference).min(1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdviceKind {
    MoveToRuleOfThirds,
    MoveToCenter,
    ReduceSubjects,
}

/// A single piece of reframing guidance, in image pixel coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advice {
    pub kind: AdviceKind,
    pub message: String,
    /// Where the subject should end up. `None` for advisories without a target.
    pub target_point: Option<Point>,
    pub current_point: Point,
    pub direction: Option<Direction>,
    /// Urgency in [0, 1].
    pub intensity: f64,
}

/// Moves the points into another space. Direction and intensity describe the
/// photo and are carried unchanged.
impl Scalable for Advice {
    fn scaled_by(&self, factors: ScaleFactors) -> Self {
        Advice {
            target_point: self.target_point.map(|p| p.scaled_by(factors)),
            current_point: self.current_point.scaled_by(factors),
            ..self.clone()
        }
    }
}

fn target_name(rule: CompositionRule) -> &'static str {
    match rule {
        CompositionRule::RuleOfThirds => "rule-of-thirds point",
        CompositionRule::Center => "center",
    }
}

/// Produces move-to-target advice for a subject position.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdviceGenerator {
    normalization: IntensityNormalization,
}

impl AdviceGenerator {
    pub fn new(normalization: IntensityNormalization) -> Self {
        Self { normalization }
    }

    /// The point a subject at `current` should move to under `rule`.
    pub fn target_point(rule: CompositionRule, current: Point, size: Size) -> Point {
        match rule {
            CompositionRule::Center => size.center(),
            CompositionRule::RuleOfThirds => {
                let points = composition_scorer::rule_of_thirds_points(size);
                // First point wins a distance tie.
                points.into_iter().fold(points[0], |nearest, candidate| {
                    if current.distance_to(&candidate) < current.distance_to(&nearest) {
                        candidate
                    } else {
                        nearest
                    }
                })
            }
        }
    }

    /// Advice for moving a subject at `current` toward `target`.
    pub fn advise(&self, current: Point, target: AdviceTarget, size: Size) -> Advice {
        let rule = target.resolve(current, size);
        let target_point = Self::target_point(rule, current, size);
        let direction = Direction::between(current, target_point);
        let distance = current.distance_to(&target_point);

        Advice {
            kind: match rule {
                CompositionRule::RuleOfThirds => AdviceKind::MoveToRuleOfThirds,
                CompositionRule::Center => AdviceKind::MoveToCenter,
            },
            message: format!("Move the subject {} toward the {}", direction.phrase(), target_name(rule)),
            target_point: Some(target_point),
            current_point: current,
            direction: Some(direction),
            intensity: self.normalization.intensity(distance, size),
        }
    }

    /// Full advice list for a frame: the principal advice for the subject chosen
    /// by `policy`, plus a consolidation advisory when several subjects compete.
    /// Empty when no region was found; a frame without extent is an error.
    pub fn advise_subjects(
        &self,
        regions: &[Region],
        policy: SubjectPolicy,
        target: AdviceTarget,
        size: Size,
    ) -> Result<Vec<Advice>> {
        let Some(subject) = policy.select(regions) else {
            return Ok(Vec::new());
        };
        if size.is_empty() {
            return Err(AnalysisError::EmptyFrame {
                width: size.width,
                height: size.height,
            });
        }
        let mut advice = vec![self.advise(subject.centroid, target, size)];
        if regions.len() > 1 {
            advice.push(Advice {
                kind: AdviceKind::ReduceSubjects,
                message: "Focus the shot on a single subject".to_string(),
                target_point: None,
                current_point: subject.centroid,
                direction: None,
                intensity: MULTI_SUBJECT_INTENSITY,
            });
        }
        Ok(advice)
    }
}
