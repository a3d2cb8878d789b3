use thiserror::Error;

use crate::shared::constants::DEFAULT_MIN_CONFIDENCE;

#[derive(Error, Debug, PartialEq)]
pub enum OptionsError {
    #[error("minimum confidence must be within [0.0, 1.0], got {0}")]
    ConfidenceOutOfRange(f32),
}

/// Which analysis facets a pass should run, plus the detector score
/// threshold.
///
/// Built once per user control change and passed by reference into each
/// pass; never mutated in place. The aggregated table's column set is a
/// pure function of this value.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionOptions {
    detect_face: bool,
    detect_landmarks: bool,
    detect_expressions: bool,
    detect_age_gender: bool,
    min_confidence: f32,
}

impl DetectionOptions {
    /// Face presence and landmarks on, everything else off.
    pub fn new() -> Self {
        Self {
            detect_face: true,
            detect_landmarks: true,
            detect_expressions: false,
            detect_age_gender: false,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }

    pub fn with_face(mut self, enabled: bool) -> Self {
        self.detect_face = enabled;
        self
    }

    pub fn with_landmarks(mut self, enabled: bool) -> Self {
        self.detect_landmarks = enabled;
        self
    }

    pub fn with_expressions(mut self, enabled: bool) -> Self {
        self.detect_expressions = enabled;
        self
    }

    pub fn with_age_gender(mut self, enabled: bool) -> Self {
        self.detect_age_gender = enabled;
        self
    }

    pub fn with_min_confidence(mut self, value: f32) -> Result<Self, OptionsError> {
        if !(0.0..=1.0).contains(&value) || value.is_nan() {
            return Err(OptionsError::ConfidenceOutOfRange(value));
        }
        self.min_confidence = value;
        Ok(self)
    }

    pub fn detect_face(&self) -> bool {
        self.detect_face
    }

    pub fn detect_landmarks(&self) -> bool {
        self.detect_landmarks
    }

    pub fn detect_expressions(&self) -> bool {
        self.detect_expressions
    }

    pub fn detect_age_gender(&self) -> bool {
        self.detect_age_gender
    }

    /// Score threshold passed verbatim to the detector.
    pub fn min_confidence(&self) -> f32 {
        self.min_confidence
    }

    /// True when any facet beyond plain box detection is requested.
    ///
    /// The analyzer runs its per-face heads only in that case, matching the
    /// detector-only fast path for plain presence checks.
    pub fn wants_face_heads(&self) -> bool {
        self.detect_landmarks || self.detect_expressions || self.detect_age_gender
    }
}

impl Default for DetectionOptions {
    fn default() -> Self {
        Self::new()
    }
}
