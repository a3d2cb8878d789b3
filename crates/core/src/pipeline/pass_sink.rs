use crate::analysis::aggregator::ResultRow;
use crate::analysis::detection_options::DetectionOptions;
use crate::analysis::face_record::FaceRecord;
use crate::shared::frame::Frame;

/// Everything one detection pass produced: the frame it ran on, the raw
/// records, and the aggregated table rows.
#[derive(Clone, Debug)]
pub struct PassOutput {
    pub frame: Frame,
    pub records: Vec<FaceRecord>,
    pub rows: Vec<ResultRow>,
}

/// Downstream consumer of pass results (terminal table, overlay writer,
/// a GUI). Strictly a consumer: passes never read back from it.
pub trait PassSink: Send {
    /// Called once per applied pass, in pass order. Stale passes are
    /// filtered out before this point.
    fn apply(
        &mut self,
        output: &PassOutput,
        options: &DetectionOptions,
    ) -> Result<(), Box<dyn std::error::Error>>;

    /// Called when a live session stops: the sink must drop any displayed
    /// overlay/table state.
    fn clear(&mut self);
}
