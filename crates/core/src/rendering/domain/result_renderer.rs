use crate::analysis::aggregator::ResultRow;
use crate::analysis::detection_options::DetectionOptions;

/// Presents aggregated rows to the user. Swappable: the data-to-rows
/// transform lives in `analysis::aggregator`, independent of any markup or
/// terminal concern here.
pub trait ResultRenderer: Send {
    /// Renders one pass's table. An empty `rows` slice must produce an
    /// explicit "no faces" indication, not an empty table shell.
    fn render(
        &mut self,
        rows: &[ResultRow],
        options: &DetectionOptions,
    ) -> Result<(), Box<dyn std::error::Error>>;

    /// Drops any displayed results (called when a live session stops).
    fn clear(&mut self);
}
