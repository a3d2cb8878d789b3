use std::path::PathBuf;

use crate::shared::frame::Frame;
use crate::shared::source_info::SourceInfo;
use crate::video::domain::frame_source::FrameSource;

/// Adapts a single image file to the [`FrameSource`] interface.
///
/// The image is a one-frame source with `fps=0`, letting the pipeline treat
/// images and cameras uniformly. Decoding uses the `image` crate and
/// converts to RGB8 regardless of the file's pixel format.
pub struct ImageFileSource {
    path: PathBuf,
    frame: Option<Frame>,
}

impl ImageFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            frame: None,
        }
    }
}

impl FrameSource for ImageFileSource {
    fn open(&mut self) -> Result<SourceInfo, Box<dyn std::error::Error>> {
        let img = image::open(&self.path)
            .map_err(|e| format!("cannot decode image {}: {e}", self.path.display()))?
            .to_rgb8();
        let (width, height) = img.dimensions();
        self.frame = Some(Frame::new(img.into_raw(), width, height, 0));

        Ok(SourceInfo {
            width,
            height,
            fps: 0.0,
            live: false,
            description: self.path.display().to_string(),
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
