use crate::analysis::aggregator::summarize;
use crate::analysis::detection_options::DetectionOptions;
use crate::detection::domain::face_analyzer::FaceAnalyzer;
use crate::pipeline::pass_sink::PassOutput;
use crate::video::domain::frame_source::FrameSource;

/// Single-image pass: read → analyze → aggregate.
///
/// Rendering is left to the caller; the returned [`PassOutput`] carries the
/// unmodified frame so an overlay can be painted onto a copy.
pub struct AnalyzeImageUseCase {
    source: Box<dyn FrameSource>,
    analyzer: Box<dyn FaceAnalyzer>,
}

impl AnalyzeImageUseCase {
    pub fn new(source: Box<dyn FrameSource>, analyzer: Box<dyn FaceAnalyzer>) -> Self {
        Self { source, analyzer }
    }

    pub fn execute(
        &mut self,
        options: &DetectionOptions,
    ) -> Result<PassOutput, Box<dyn std::error::Error>> {
        let _info = self.source.open()?;
        let frame = self
            .source
            .frames()
            .next()
            .ok_or("no frames in source")??;
        self.source.close();

        let records = self.analyzer.analyze(&frame, options)?;
        let rows = summarize(&records, options);

        Ok(PassOutput {
            frame,
            records,
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::face_record::FaceRecord;
    use crate::shared::frame::Frame;
    use crate::shared::source_info::SourceInfo;
    use std::sync::{Arc, Mutex};

    // --- Stubs ---

    struct StubSource {
        frame: Option<Frame>,
    }

    impl StubSource {
        fn new(frame: Frame) -> Self {
            Self { frame: Some(frame) }
        }
    }

    impl FrameSource for StubSource {
        fn open(&mut self) -> Result<SourceInfo, Box<dyn std::error::Error>> {
            let frame = self.frame.as_ref().ok_or("no frame")?;
            Ok(SourceInfo {
                width: frame.width(),
                height: frame.height(),
                fps: 0.0,
                live: false,
                description: "stub".to_string(),
            })
        }

        fn frames(
            &mut self,
        ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
            Box::new(self.frame.take().into_iter().map(Ok))
        }

        fn close(&mut self) {
            self.frame = None;
        }
    }

    struct StubAnalyzer {
        records: Vec<FaceRecord>,
        seen_thresholds: Arc<Mutex<Vec<f32>>>,
    }

    impl StubAnalyzer {
        fn new(records: Vec<FaceRecord>) -> Self {
            Self {
                records,
                seen_thresholds: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl FaceAnalyzer for StubAnalyzer {
        fn analyze(
            &mut self,
            _frame: &Frame,
            options: &DetectionOptions,
        ) -> Result<Vec<FaceRecord>, Box<dyn std::error::Error>> {
            self.seen_thresholds
                .lock()
                .unwrap()
                .push(options.min_confidence());
            Ok(self.records.clone())
        }
    }

    fn make_frame(w: u32, h: u32) -> Frame {
        Frame::new(vec![128; (w * h * 3) as usize], w, h, 0)
    }

    fn face(confidence: f32) -> FaceRecord {
        FaceRecord {
            confidence: Some(confidence),
            ..FaceRecord::default()
        }
    }

    // --- Tests ---

    #[test]
    fn test_pass_yields_one_row_per_record() {
        let mut uc = AnalyzeImageUseCase::new(
            Box::new(StubSource::new(make_frame(100, 100))),
            Box::new(StubAnalyzer::new(vec![face(0.9), face(0.8)])),
        );
        let output = uc.execute(&DetectionOptions::new()).unwrap();
        assert_eq!(output.records.len(), 2);
        assert_eq!(output.rows.len(), 2);
        assert_eq!(output.rows[0].index, 1);
        assert_eq!(output.rows[1].index, 2);
    }

    #[test]
    fn test_min_confidence_reaches_analyzer_verbatim() {
        let analyzer = StubAnalyzer::new(vec![]);
        let seen = analyzer.seen_thresholds.clone();
        let mut uc = AnalyzeImageUseCase::new(
            Box::new(StubSource::new(make_frame(10, 10))),
            Box::new(analyzer),
        );

        let options = DetectionOptions::new().with_min_confidence(0.73).unwrap();
        uc.execute(&options).unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![0.73]);
    }

    #[test]
    fn test_no_faces_yields_empty_rows_not_error() {
        let mut uc = AnalyzeImageUseCase::new(
            Box::new(StubSource::new(make_frame(10, 10))),
            Box::new(StubAnalyzer::new(vec![])),
        );
        let output = uc.execute(&DetectionOptions::new()).unwrap();
        assert!(output.records.is_empty());
        assert!(output.rows.is_empty());
    }

    #[test]
    fn test_output_frame_keeps_source_dimensions() {
        let mut uc = AnalyzeImageUseCase::new(
            Box::new(StubSource::new(make_frame(200, 150))),
            Box::new(StubAnalyzer::new(vec![])),
        );
        let output = uc.execute(&DetectionOptions::new()).unwrap();
        assert_eq!(output.frame.width(), 200);
        assert_eq!(output.frame.height(), 150);
    }
}
