use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::analysis::aggregator::summarize;
use crate::analysis::detection_options::DetectionOptions;
use crate::analysis::face_record::FaceRecord;
use crate::detection::domain::face_analyzer::FaceAnalyzer;
use crate::pipeline::pass_sequencer::{PassId, PassSequencer};
use crate::pipeline::pass_sink::{PassOutput, PassSink};
use crate::shared::constants::DEFAULT_POLL_INTERVAL_MS;
use crate::shared::frame::Frame;
use crate::video::domain::frame_source::FrameSource;

const FRAME_CHANNEL_CAPACITY: usize = 1;
const RESULT_CHANNEL_CAPACITY: usize = 2;

type TaggedFrame = (PassId, Frame);
type TaggedResult = (PassId, Frame, Vec<FaceRecord>);

/// Cadence and termination for a live session.
///
/// `cancelled` is the stop button: setting it prevents any further pass
/// from being dispatched. `duration`/`max_passes` are optional bounds for
/// unattended runs.
#[derive(Clone)]
pub struct LiveAnalysisConfig {
    pub interval: Duration,
    pub duration: Option<Duration>,
    pub max_passes: Option<u64>,
    pub cancelled: Arc<AtomicBool>,
}

impl LiveAnalysisConfig {
    pub fn new() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            duration: None,
            max_passes: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Default for LiveAnalysisConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Polls a live source on a fixed interval and feeds each applied pass to
/// the sink.
///
/// Layout: `capture tick → analyze → main [guard/aggregate/apply]`, with
/// capture and analysis on their own threads so a slow model never blocks
/// the tick clock. Every dispatched frame is tagged with a pass id; the
/// main loop applies results newest-first and discards anything a newer
/// completed pass has superseded, so a slow pass can never overwrite
/// fresher output. A per-frame analysis failure is logged and that tick is
/// skipped; the session keeps polling.
pub struct LiveAnalysisUseCase {
    source: Box<dyn FrameSource>,
    analyzer: Box<dyn FaceAnalyzer>,
}

impl LiveAnalysisUseCase {
    pub fn new(source: Box<dyn FrameSource>, analyzer: Box<dyn FaceAnalyzer>) -> Self {
        Self { source, analyzer }
    }

    /// Runs until cancelled, the configured bound is reached, or the source
    /// ends. On return the sink has been cleared and no further pass can
    /// run.
    pub fn execute(
        mut self,
        options: &DetectionOptions,
        config: &LiveAnalysisConfig,
        sink: &mut dyn PassSink,
    ) -> Result<(), Box<dyn std::error::Error>> {
        // Open before spawning so camera-access failures surface
        // synchronously as session-terminal errors.
        let info = self.source.open()?;
        log::info!(
            "live analysis started: {} ({}x{} @ {:.0} fps), tick {:?}",
            info.description,
            info.width,
            info.height,
            info.fps,
            config.interval
        );

        let sequencer = Arc::new(PassSequencer::new());
        let (frame_tx, frame_rx) = crossbeam_channel::bounded::<TaggedFrame>(FRAME_CHANNEL_CAPACITY);
        let (result_tx, result_rx) =
            crossbeam_channel::bounded::<TaggedResult>(RESULT_CHANNEL_CAPACITY);

        let capture_handle = spawn_capture(
            self.source,
            frame_tx,
            sequencer.clone(),
            config.clone(),
        );
        let analyzer_handle = spawn_analyzer(self.analyzer, frame_rx, result_tx, options.clone());

        let mut last_applied: Option<PassId> = None;
        while let Ok(first) = result_rx.recv() {
            // Skip ahead to the freshest completed pass before applying.
            let mut latest = first;
            while let Ok(newer) = result_rx.try_recv() {
                log::debug!("discarding stale pass result");
                latest = newer;
            }

            let (pass, frame, records) = latest;
            if last_applied.is_some_and(|applied| pass <= applied) {
                log::debug!("discarding out-of-order pass result");
                continue;
            }
            if !sequencer.is_current(pass) {
                log::debug!("applying freshest completed pass; a newer pass is in flight");
            }

            let rows = summarize(&records, options);
            let output = PassOutput {
                frame,
                records,
                rows,
            };
            if let Err(e) = sink.apply(&output, options) {
                log::warn!("sink failed to apply pass: {e}");
            }
            last_applied = Some(pass);
        }

        let _ = capture_handle.join();
        let _ = analyzer_handle.join();

        // Stop is sticky: overlay/table state resets with the session.
        sink.clear();
        log::info!("live analysis stopped");
        Ok(())
    }
}

fn spawn_capture(
    mut source: Box<dyn FrameSource>,
    frame_tx: Sender<TaggedFrame>,
    sequencer: Arc<PassSequencer>,
    config: LiveAnalysisConfig,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let deadline = config.duration.map(|d| Instant::now() + d);
        let mut begun: u64 = 0;
        {
            let mut frames = source.frames();
            loop {
                // Checked immediately before each dispatch: once the stop
                // flag is set, no further pass can start.
                if config.cancelled.load(Ordering::Relaxed) {
                    break;
                }
                if deadline.is_some_and(|d| Instant::now() >= d) {
                    break;
                }
                if config.max_passes.is_some_and(|m| begun >= m) {
                    break;
                }

                let pass = sequencer.begin();
                begun += 1;
                match frames.next() {
                    Some(Ok(frame)) => match frame_tx.try_send((pass, frame)) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => {
                            log::debug!("analyzer busy, dropping tick");
                        }
                        Err(TrySendError::Disconnected(_)) => break,
                    },
                    Some(Err(e)) => log::warn!("frame capture failed, skipping tick: {e}"),
                    None => break,
                }

                thread::sleep(config.interval);
            }
        }
        source.close();
    })
}

fn spawn_analyzer(
    mut analyzer: Box<dyn FaceAnalyzer>,
    frame_rx: Receiver<TaggedFrame>,
    result_tx: Sender<TaggedResult>,
    options: DetectionOptions,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        for (pass, frame) in frame_rx.iter() {
            match analyzer.analyze(&frame, &options) {
                Ok(records) => {
                    if result_tx.send((pass, frame, records)).is_err() {
                        break;
                    }
                }
                Err(e) => log::warn!("detection failed, skipping frame: {e}"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::source_info::SourceInfo;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    // --- Stubs ---

    /// Endless synthetic frames with increasing indices.
    struct TickingSource {
        next_index: usize,
        open: bool,
    }

    impl TickingSource {
        fn new() -> Self {
            Self {
                next_index: 0,
                open: false,
            }
        }
    }

    impl FrameSource for TickingSource {
        fn open(&mut self) -> Result<SourceInfo, Box<dyn std::error::Error>> {
            self.open = true;
            Ok(SourceInfo {
                width: 8,
                height: 8,
                fps: 30.0,
                live: true,
                description: "ticking stub".to_string(),
            })
        }

        fn frames(
            &mut self,
        ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
            let index = &mut self.next_index;
            Box::new(std::iter::from_fn(move || {
                let frame = Frame::new(vec![0u8; 8 * 8 * 3], 8, 8, *index);
                *index += 1;
                Some(Ok(frame))
            }))
        }

        fn close(&mut self) {
            self.open = false;
        }
    }

    struct CountingAnalyzer {
        calls: Arc<AtomicUsize>,
        delay: Duration,
    }

    impl FaceAnalyzer for CountingAnalyzer {
        fn analyze(
            &mut self,
            _frame: &Frame,
            _options: &DetectionOptions,
        ) -> Result<Vec<FaceRecord>, Box<dyn std::error::Error>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                thread::sleep(self.delay);
            }
            Ok(vec![FaceRecord {
                confidence: Some(0.9),
                ..FaceRecord::default()
            }])
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        applied_frame_indices: Arc<Mutex<Vec<usize>>>,
        cleared: Arc<AtomicUsize>,
        cancel_after_first: Option<Arc<AtomicBool>>,
    }

    impl PassSink for RecordingSink {
        fn apply(
            &mut self,
            output: &PassOutput,
            _options: &DetectionOptions,
        ) -> Result<(), Box<dyn std::error::Error>> {
            self.applied_frame_indices
                .lock()
                .unwrap()
                .push(output.frame.index());
            if let Some(flag) = &self.cancel_after_first {
                flag.store(true, Ordering::SeqCst);
            }
            Ok(())
        }

        fn clear(&mut self) {
            self.cleared.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn fast_config(max_passes: u64) -> LiveAnalysisConfig {
        LiveAnalysisConfig {
            interval: Duration::from_millis(1),
            duration: None,
            max_passes: Some(max_passes),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    // --- Tests ---

    #[test]
    fn test_stop_before_start_runs_no_pass() {
        let calls = Arc::new(AtomicUsize::new(0));
        let uc = LiveAnalysisUseCase::new(
            Box::new(TickingSource::new()),
            Box::new(CountingAnalyzer {
                calls: calls.clone(),
                delay: Duration::ZERO,
            }),
        );

        let config = fast_config(100);
        config.cancelled.store(true, Ordering::SeqCst);

        let mut sink = RecordingSink::default();
        let applied = sink.applied_frame_indices.clone();
        let cleared = sink.cleared.clone();

        uc.execute(&DetectionOptions::new(), &config, &mut sink)
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(applied.lock().unwrap().is_empty());
        assert_eq!(cleared.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_no_detection_after_stop() {
        let calls = Arc::new(AtomicUsize::new(0));
        let uc = LiveAnalysisUseCase::new(
            Box::new(TickingSource::new()),
            Box::new(CountingAnalyzer {
                calls: calls.clone(),
                delay: Duration::ZERO,
            }),
        );

        let config = fast_config(10_000);
        let mut sink = RecordingSink {
            cancel_after_first: Some(config.cancelled.clone()),
            ..RecordingSink::default()
        };

        uc.execute(&DetectionOptions::new(), &config, &mut sink)
            .unwrap();

        // execute joins its workers, so the count is final here; if a pass
        // were still scheduled it would land during this window.
        let at_stop = calls.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(calls.load(Ordering::SeqCst), at_stop);
    }

    #[test]
    fn test_bounded_run_applies_passes_in_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let uc = LiveAnalysisUseCase::new(
            Box::new(TickingSource::new()),
            Box::new(CountingAnalyzer {
                calls: calls.clone(),
                delay: Duration::ZERO,
            }),
        );

        let mut sink = RecordingSink::default();
        let applied = sink.applied_frame_indices.clone();
        let cleared = sink.cleared.clone();

        uc.execute(&DetectionOptions::new(), &fast_config(5), &mut sink)
            .unwrap();

        let applied = applied.lock().unwrap();
        assert!(!applied.is_empty());
        assert!(applied.len() <= 5);
        assert!(applied.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(cleared.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_slow_analyzer_still_makes_progress() {
        // Analysis slower than the tick interval: ticks are dropped, but
        // fresh results keep being applied rather than all discarded.
        let calls = Arc::new(AtomicUsize::new(0));
        let uc = LiveAnalysisUseCase::new(
            Box::new(TickingSource::new()),
            Box::new(CountingAnalyzer {
                calls: calls.clone(),
                delay: Duration::from_millis(5),
            }),
        );

        let mut sink = RecordingSink::default();
        let applied = sink.applied_frame_indices.clone();

        uc.execute(&DetectionOptions::new(), &fast_config(20), &mut sink)
            .unwrap();

        assert!(!applied.lock().unwrap().is_empty());
    }
}
