use std::fmt;

use crate::shared::bounding_box::BoundingBox;

/// Expression class labels, in the order the expression net emits scores.
pub const EXPRESSION_LABELS: &[&str] = &[
    "neutral",
    "happy",
    "sad",
    "angry",
    "fearful",
    "disgusted",
    "surprised",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => write!(f, "male"),
            Gender::Female => write!(f, "female"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LandmarkPoint {
    pub x: f32,
    pub y: f32,
}

/// Per-face expression probabilities in a fixed encounter order.
///
/// Entry order is the model's output order. `dominant` keeps the first
/// entry on exact probability ties, so the winner is deterministic for a
/// given score sequence (the tie rule itself is a policy choice, not a
/// model guarantee).
#[derive(Clone, Debug, PartialEq, Default)]
pub struct ExpressionScores {
    entries: Vec<(String, f32)>,
}

impl ExpressionScores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, f32)>,
        S: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(label, p)| (label.into(), p))
                .collect(),
        }
    }

    pub fn push(&mut self, label: impl Into<String>, probability: f32) {
        self.entries.push((label.into(), probability));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.entries.iter().map(|(label, p)| (label.as_str(), *p))
    }

    /// Highest-probability entry; first encountered wins on exact ties.
    pub fn dominant(&self) -> Option<(&str, f32)> {
        let mut best: Option<(&str, f32)> = None;
        for (label, p) in self.iter() {
            match best {
                Some((_, best_p)) if p <= best_p => {}
                _ => best = Some((label, p)),
            }
        }
        best
    }
}

/// One detected face, produced fresh per pass and immutable afterwards.
///
/// Every field is optional: a facet the pass did not run, or a head the
/// model could not answer for, stays `None` and surfaces as `N/A`
/// downstream rather than a silent zero.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct FaceRecord {
    pub confidence: Option<f32>,
    pub bounding_box: Option<BoundingBox>,
    pub landmarks: Option<Vec<LandmarkPoint>>,
    pub expressions: Option<ExpressionScores>,
    pub age: Option<f32>,
    pub gender: Option<Gender>,
}
