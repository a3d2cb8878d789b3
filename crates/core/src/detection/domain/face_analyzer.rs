use crate::analysis::detection_options::DetectionOptions;
use crate::analysis::face_record::FaceRecord;
use crate::shared::frame::Frame;

/// Domain interface for one inference pass over a frame.
///
/// Implementations run only the facets the options request and return
/// records already filtered by `options.min_confidence()`. May be stateful
/// (session caches, warm-up), hence `&mut self`.
pub trait FaceAnalyzer: Send {
    fn analyze(
        &mut self,
        frame: &Frame,
        options: &DetectionOptions,
    ) -> Result<Vec<FaceRecord>, Box<dyn std::error::Error>>;
}
