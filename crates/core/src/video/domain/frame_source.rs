use crate::shared::frame::Frame;
use crate::shared::source_info::SourceInfo;

/// Produces frames from an input: a single image file or a live camera.
///
/// Implementations own the I/O details (decoding, device negotiation) and
/// hand the pipeline RGB [`Frame`]s at the source's natural dimensions.
pub trait FrameSource: Send {
    /// Acquires the source and returns its properties. For cameras this is
    /// where permission/access failures surface.
    fn open(&mut self) -> Result<SourceInfo, Box<dyn std::error::Error>>;

    /// Iterator over frames in capture order. Single-image sources yield
    /// exactly one frame.
    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_>;

    /// Releases the device/file handles.
    fn close(&mut self);
}
