// THEORY:
// The `composition` module is the judgement layer. Given where the main
// subject's center of mass sits in the frame, it measures how close that point
// is to the placements two classic rules ask for:
//
// - **Rule of thirds**: the four intersections of the lines dividing the frame
//   into thirds on each axis. Only the nearest intersection counts.
// - **Center composition**: the geometric center of the frame.
//
// Both use the same falloff. Distance is normalized by the half-diagonal (the
// farthest any point can be from the center), mapped to `100 - 100 * d / half`
// and floored at zero, so a subject sitting exactly on a target scores 100.
//
// Recommendations are produced by fixed threshold rules, not learned. The list
// is capped at three before the multi-subject note is appended, so it can hold
// four entries when more than one subject was found.

use crate::core_modules::region::{Point, Region, Size};
use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

const MAX_RECOMMENDATIONS: usize = 3;
const EDGE_BAND: f64 = 0.3;
const WEAK_SCORE: f64 = 50.0;
const POOR_SCORE: f64 = 30.0;

/// A named placement rule the scorer evaluates against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositionRule {
    RuleOfThirds,
    Center,
}

impl CompositionRule {
    pub fn label(self) -> &'static str {
        match self {
            Self::RuleOfThirds => "rule of thirds",
            Self::Center => "center composition",
        }
    }
}

impl fmt::Display for CompositionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which retained region is treated as the photo's subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectPolicy {
    /// The first region in raster-scan discovery order.
    #[default]
    ScanOrder,
    /// The region with the most pixels; the earliest one wins a tie.
    LargestArea,
}

impl SubjectPolicy {
    pub fn select<'a>(&self, regions: &'a [Region]) -> Option<&'a Region> {
        match self {
            Self::ScanOrder => regions.first(),
            Self::LargestArea => regions.iter().reduce(|best, candidate| {
                if candidate.pixel_count > best.pixel_count {
                    candidate
                } else {
                    best
                }
            }),
        }
    }
}

/// A templated suggestion attached to a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    ShiftRight,
    ShiftLeft,
    /// Toward larger pixel y.
    ShiftDown,
    /// Toward smaller pixel y.
    ShiftUp,
    AimForThirdOrCenter,
    MajorRecomposition,
    ConsolidateSubjects,
}

impl Recommendation {
    pub fn message(self) -> &'static str {
        match self {
            Self::ShiftRight => "Try placing the subject a little further to the right",
            Self::ShiftLeft => "Try placing the subject a little further to the left",
            Self::ShiftDown => "Try placing the subject a little lower in the frame",
            Self::ShiftUp => "Try placing the subject a little higher in the frame",
            Self::AimForThirdOrCenter => {
                "Consider placing the subject near a rule-of-thirds point or the center"
            }
            Self::MajorRecomposition => "A substantially different composition is recommended",
            Self::ConsolidateSubjects => "Narrowing the shot down to one subject will improve the composition",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Placement scores for the main subject of one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionScore {
    /// Score in [0, 100] against the nearest rule-of-thirds intersection.
    pub rule_of_thirds_score: f64,
    /// Score in [0, 100] against the frame center.
    pub center_score: f64,
    /// The rule with the higher score; ties go to the rule of thirds.
    pub best_rule: CompositionRule,
    /// `max(rule_of_thirds_score, center_score)`.
    pub overall_score: f64,
    pub recommendations: Vec<Recommendation>,
}

pub mod composition_scorer {
    use super::*;

    /// The four rule-of-thirds intersections, row by row.
    pub fn rule_of_thirds_points(size: Size) -> [Point; 4] {
        let (x1, x2) = (size.width / 3.0, size.width * 2.0 / 3.0);
        let (y1, y2) = (size.height / 3.0, size.height * 2.0 / 3.0);
        [
            Point::new(x1, y1),
            Point::new(x2, y1),
            Point::new(x1, y2),
            Point::new(x2, y2),
        ]
    }

    /// Distance-based score in [0, 100] of `point` against a single `target`.
    pub fn score_against(point: Point, target: Point, size: Size) -> f64 {
        let normalized = point.distance_to(&target) / size.half_diagonal();
        (100.0 - normalized * 100.0).max(0.0)
    }

    pub fn evaluate_rule_of_thirds(centroid: Point, size: Size) -> f64 {
        rule_of_thirds_points(size)
            .into_iter()
            .map(|target| score_against(centroid, target, size))
            .fold(0.0, f64::max)
    }

    pub fn evaluate_center_composition(centroid: Point, size: Size) -> f64 {
        score_against(centroid, size.center(), size)
    }

    /// Picks the rule a subject is closest to satisfying. Center only wins outright.
    pub fn best_rule(rule_of_thirds_score: f64, center_score: f64) -> CompositionRule {
        if center_score > rule_of_thirds_score {
            CompositionRule::Center
        } else {
            CompositionRule::RuleOfThirds
        }
    }

    /// Scores a single subject centroid within a frame of `size`.
    pub fn score(centroid: Point, size: Size) -> Result<CompositionScore> {
        if size.is_empty() {
            return Err(AnalysisError::EmptyFrame {
                width: size.width,
                height: size.height,
            });
        }
        let rule_of_thirds_score = evaluate_rule_of_thirds(centroid, size);
        let center_score = evaluate_center_composition(centroid, size);
        Ok(CompositionScore {
            rule_of_thirds_score,
            center_score,
            best_rule: best_rule(rule_of_thirds_score, center_score),
            overall_score: rule_of_thirds_score.max(center_score),
            recommendations: recommendations(centroid, size, rule_of_thirds_score, center_score),
        })
    }

    /// Scores the subject chosen by `policy` and notes when several subjects compete.
    /// Returns `Ok(None)` when there is no region to score.
    pub fn score_subjects(
        regions: &[Region],
        size: Size,
        policy: SubjectPolicy,
    ) -> Result<Option<CompositionScore>> {
        let Some(subject) = policy.select(regions) else {
            return Ok(None);
        };
        let mut score = score(subject.centroid, size)?;
        if regions.len() > 1 {
            score.recommendations.push(Recommendation::ConsolidateSubjects);
        }
        Ok(Some(score))
    }

    fn recommendations(
        centroid: Point,
        size: Size,
        rule_of_thirds_score: f64,
        center_score: f64,
    ) -> Vec<Recommendation> {
        let mut out = Vec::with_capacity(MAX_RECOMMENDATIONS + 1);

        if centroid.x < size.width * EDGE_BAND {
            out.push(Recommendation::ShiftRight);
        } else if centroid.x > size.width * (1.0 - EDGE_BAND) {
            out.push(Recommendation::ShiftLeft);
        }

        if centroid.y < size.height * EDGE_BAND {
            out.push(Recommendation::ShiftDown);
        } else if centroid.y > size.height * (1.0 - EDGE_BAND) {
            out.push(Recommendation::ShiftUp);
        }

        if rule_of_thirds_score < WEAK_SCORE && center_score < WEAK_SCORE {
            out.push(Recommendation::AimForThirdOrCenter);
        }

        if rule_of_thirds_score.max(center_score) < POOR_SCORE {
            out.push(Recommendation::MajorRecomposition);
        }

        out.truncate(MAX_RECOMMENDATIONS);
        out
    }
}
