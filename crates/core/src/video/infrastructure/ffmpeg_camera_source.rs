use crate::shared::constants::{
    DEFAULT_CAPTURE_FPS, DEFAULT_CAPTURE_HEIGHT, DEFAULT_CAPTURE_WIDTH,
};
use crate::shared::frame::Frame;
use crate::shared::source_info::SourceInfo;
use crate::video::domain::frame_source::FrameSource;

/// Requested capture format. The driver may negotiate something close
/// rather than exact; [`SourceInfo`] reports what was actually granted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CaptureConstraints {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            width: DEFAULT_CAPTURE_WIDTH,
            height: DEFAULT_CAPTURE_HEIGHT,
            fps: DEFAULT_CAPTURE_FPS,
        }
    }
}

/// Live camera capture via ffmpeg-next (libavdevice + libavcodec).
///
/// Opens a capture device (e.g. `/dev/video0`) with the requested video
/// constraints, no audio, and converts each frame to RGB24.
pub struct FfmpegCameraSource {
    device: String,
    constraints: CaptureConstraints,
    input_ctx: Option<ffmpeg_next::format::context::Input>,
    video_stream_index: usize,
}

// Safety: FfmpegCameraSource is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegCameraSource {}

impl FfmpegCameraSource {
    pub fn new(device: impl Into<String>, constraints: CaptureConstraints) -> Self {
        Self {
            device: device.into(),
            constraints,
            input_ctx: None,
            video_stream_index: 0,
        }
    }
}

impl FrameSource for FfmpegCameraSource {
    fn open(&mut self) -> Result<SourceInfo, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let mut options = ffmpeg_next::Dictionary::new();
        options.set(
            "video_size",
            &format!("{}x{}", self.constraints.width, self.constraints.height),
        );
        options.set("framerate", &self.constraints.fps.to_string());

        let ictx = ffmpeg_next::format::input_with_dictionary(&self.device, options).map_err(
            |e| -> Box<dyn std::error::Error> {
                format!(
                    "could not access camera {}: {e}\n\
                     Check that the device exists and that you have permission to use it.",
                    self.device
                )
                .into()
            },
        )?;

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("camera produced no video stream")?;

        let video_stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let rate = stream.rate();
        let fps = if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            self.constraints.fps as f64
        };

        let info = SourceInfo {
            width: decoder.width(),
            height: decoder.height(),
            fps,
            live: true,
            description: self.device.clone(),
        };

        self.video_stream_index = video_stream_index;
        self.input_ctx = Some(ictx);

        Ok(info)
    }

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
        let Some(ictx) = self.input_ctx.as_mut() else {
            return Box::new(std::iter::once(Err("camera source: not opened".into())));
        };

        let setup = (|| -> Result<_, ffmpeg_next::Error> {
            let stream = ictx
                .streams()
                .best(ffmpeg_next::media::Type::Video)
                .ok_or(ffmpeg_next::Error::StreamNotFound)?;
            let codec_ctx =
                ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
            let decoder = codec_ctx.decoder().video()?;
            let scaler = ffmpeg_next::software::scaling::Context::get(
                decoder.format(),
                decoder.width(),
                decoder.height(),
                ffmpeg_next::format::Pixel::RGB24,
                decoder.width(),
                decoder.height(),
                ffmpeg_next::software::scaling::Flags::BILINEAR,
            )?;
            Ok((decoder, scaler))
        })();

        let (decoder, scaler) = match setup {
            Ok(pair) => pair,
            Err(e) => return Box::new(std::iter::once(Err(e.into()))),
        };

        let width = decoder.width();
        let height = decoder.height();

        Box::new(CameraFrameIter {
            ictx,
            decoder,
            scaler,
            width,
            height,
            video_stream_index: self.video_stream_index,
            frame_index: 0,
        })
    }

    fn close(&mut self) {
        self.input_ctx = None;
    }
}

/// Pulls packets from the device and decodes one RGB frame per `next`.
struct CameraFrameIter<'a> {
    ictx: &'a mut ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    width: u32,
    height: u32,
    video_stream_index: usize,
    frame_index: usize,
}

impl CameraFrameIter<'_> {
    fn try_receive(&mut self) -> Option<Result<Frame, Box<dyn std::error::Error>>> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_ok() {
            let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
            if let Err(e) = self.scaler.run(&decoded, &mut rgb_frame) {
                return Some(Err(Box::new(e)));
            }
            let pixels = extract_rgb_pixels(&rgb_frame, self.width, self.height);
            let frame = Frame::new(pixels, self.width, self.height, self.frame_index);
            self.frame_index += 1;
            Some(Ok(frame))
        } else {
            None
        }
    }
}

impl Iterator for CameraFrameIter<'_> {
    type Item = Result<Frame, Box<dyn std::error::Error>>;

    fn next(&mut self) -> Option<Self::Item> {
        // A frame may already be buffered from the previous packet batch
        if let Some(frame) = self.try_receive() {
            return Some(frame);
        }

        loop {
            let Some((stream, packet)) = self.ictx.packets().next() else {
                return None;
            };
            if stream.index() != self.video_stream_index {
                continue;
            }
            if let Err(e) = self.decoder.send_packet(&packet) {
                return Some(Err(Box::new(e)));
            }
            if let Some(frame) = self.try_receive() {
                return Some(frame);
            }
        }
    }
}

/// Copies pixel rows out of an ffmpeg frame, dropping stride padding.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_constraints() {
        let c = CaptureConstraints::default();
        assert_eq!(c.width, 1280);
        assert_eq!(c.height, 720);
        assert_eq!(c.fps, 30);
    }

    #[test]
    fn test_frames_before_open_yields_error() {
        let mut source = FfmpegCameraSource::new("/dev/video0", CaptureConstraints::default());
        let mut frames = source.frames();
        assert!(frames.next().unwrap().is_err());
    }

    #[test]
    fn test_open_nonexistent_device_fails_with_remediation() {
        let mut source =
            FfmpegCameraSource::new("/dev/nonexistent-camera", CaptureConstraints::default());
        let err = source.open().unwrap_err().to_string();
        assert!(err.contains("could not access camera"));
        assert!(err.contains("permission"));
    }
}
