//! ONNX Runtime face analyzer.
//!
//! A BlazeFace-style box detector plus optional per-face heads (68-point
//! landmarks, 7-class expressions, age/gender). Heads run only for the
//! facets a pass requests; a requested facet whose model was not loaded
//! simply leaves the record field absent.

use std::path::{Path, PathBuf};

use crate::analysis::detection_options::DetectionOptions;
use crate::analysis::face_record::{
    ExpressionScores, FaceRecord, Gender, LandmarkPoint, EXPRESSION_LABELS,
};
use crate::detection::domain::face_analyzer::FaceAnalyzer;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// Detector model input resolution.
const DETECTOR_INPUT_SIZE: u32 = 128;

/// Per-face head input resolution (landmarks, expressions, age/gender).
const HEAD_INPUT_SIZE: u32 = 64;

/// Number of detector anchors (short-range model).
const NUM_ANCHORS: usize = 896;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f32 = 0.3;

/// Margin around the detector box before cropping for the heads.
const CROP_MARGIN: f32 = 0.2;

/// Number of landmark points the landmark net predicts.
const LANDMARK_COUNT: usize = 68;

/// Resolved model file locations. Only the detector is mandatory; heads are
/// loaded per the facets the caller intends to use.
#[derive(Clone, Debug, Default)]
pub struct ModelPaths {
    pub detector: PathBuf,
    pub landmarks: Option<PathBuf>,
    pub expressions: Option<PathBuf>,
    pub age_gender: Option<PathBuf>,
}

pub struct OnnxFaceAnalyzer {
    detector: ort::session::Session,
    landmark_net: Option<ort::session::Session>,
    expression_net: Option<ort::session::Session>,
    age_gender_net: Option<ort::session::Session>,
    anchors: Vec<[f32; 2]>,
}

impl OnnxFaceAnalyzer {
    pub fn new(paths: &ModelPaths) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            detector: load_session(&paths.detector)?,
            landmark_net: paths.landmarks.as_deref().map(load_session).transpose()?,
            expression_net: paths.expressions.as_deref().map(load_session).transpose()?,
            age_gender_net: paths.age_gender.as_deref().map(load_session).transpose()?,
            anchors: generate_anchors(),
        })
    }

    /// Detector pass: anchor decode, score threshold, NMS.
    fn detect_boxes(
        &mut self,
        frame: &Frame,
        min_confidence: f32,
    ) -> Result<Vec<(BoundingBox, f32)>, Box<dyn std::error::Error>> {
        let fw = frame.width() as f32;
        let fh = frame.height() as f32;

        let tensor = frame_to_tensor(frame, DETECTOR_INPUT_SIZE);
        let input_value = ort::value::Tensor::from_array(tensor)?;
        let outputs = self.detector.run(ort::inputs![input_value])?;

        // Two output tensors: regressors [1, 896, 16] and scores [1, 896, 1]
        if outputs.len() < 2 {
            return Err(format!(
                "detector model expected 2 outputs, got {}",
                outputs.len()
            )
            .into());
        }
        let regressors = outputs[0].try_extract_array::<f32>()?;
        let scores = outputs[1].try_extract_array::<f32>()?;
        let reg_data = regressors.as_slice().ok_or("cannot get regressor slice")?;
        let score_data = scores.as_slice().ok_or("cannot get score slice")?;

        let mut raw: Vec<(BoundingBox, f32)> = Vec::new();
        let num_anchors = self.anchors.len().min(NUM_ANCHORS);

        for (i, &raw_score) in score_data.iter().enumerate().take(num_anchors) {
            let score = sigmoid(raw_score);
            if score < min_confidence {
                continue;
            }

            let anchor = &self.anchors[i];
            let reg_offset = i * 16;
            if reg_offset + 4 > reg_data.len() {
                break;
            }

            // Box center + size relative to anchor, in detector input units
            let cx = anchor[0] + reg_data[reg_offset] / DETECTOR_INPUT_SIZE as f32;
            let cy = anchor[1] + reg_data[reg_offset + 1] / DETECTOR_INPUT_SIZE as f32;
            let w = reg_data[reg_offset + 2] / DETECTOR_INPUT_SIZE as f32;
            let h = reg_data[reg_offset + 3] / DETECTOR_INPUT_SIZE as f32;

            let unit = BoundingBox::new(cx - w / 2.0, cy - h / 2.0, w, h);
            let in_frame = unit.scaled(fw, fh).clamped(frame.width(), frame.height());
            if in_frame.area() > 0.0 {
                raw.push((in_frame, score));
            }
        }

        Ok(nms(raw, NMS_IOU_THRESH))
    }

    fn run_landmarks(
        &mut self,
        frame: &Frame,
        crop: &BoundingBox,
    ) -> Result<Option<Vec<LandmarkPoint>>, Box<dyn std::error::Error>> {
        let Some(net) = self.landmark_net.as_mut() else {
            return Ok(None);
        };
        let Some(tensor) = crop_to_tensor(frame, crop, HEAD_INPUT_SIZE) else {
            return Ok(None);
        };
        let input_value = ort::value::Tensor::from_array(tensor)?;
        let outputs = net.run(ort::inputs![input_value])?;
        let coords = outputs[0].try_extract_array::<f32>()?;
        let data = coords.as_slice().ok_or("cannot get landmark slice")?;
        Ok(Some(decode_landmarks(data, crop)))
    }

    fn run_expressions(
        &mut self,
        frame: &Frame,
        crop: &BoundingBox,
    ) -> Result<Option<ExpressionScores>, Box<dyn std::error::Error>> {
        let Some(net) = self.expression_net.as_mut() else {
            return Ok(None);
        };
        let Some(tensor) = crop_to_tensor(frame, crop, HEAD_INPUT_SIZE) else {
            return Ok(None);
        };
        let input_value = ort::value::Tensor::from_array(tensor)?;
        let outputs = net.run(ort::inputs![input_value])?;
        let logits = outputs[0].try_extract_array::<f32>()?;
        let data = logits.as_slice().ok_or("cannot get expression slice")?;
        if data.len() < EXPRESSION_LABELS.len() {
            return Err(format!(
                "expression head returned {} scores, expected {}",
                data.len(),
                EXPRESSION_LABELS.len()
            )
            .into());
        }
        let probs = softmax(&data[..EXPRESSION_LABELS.len()]);
        Ok(Some(ExpressionScores::from_entries(
            EXPRESSION_LABELS.iter().copied().zip(probs),
        )))
    }

    fn run_age_gender(
        &mut self,
        frame: &Frame,
        crop: &BoundingBox,
    ) -> Result<Option<(f32, Gender)>, Box<dyn std::error::Error>> {
        let Some(net) = self.age_gender_net.as_mut() else {
            return Ok(None);
        };
        let Some(tensor) = crop_to_tensor(frame, crop, HEAD_INPUT_SIZE) else {
            return Ok(None);
        };
        let input_value = ort::value::Tensor::from_array(tensor)?;
        let outputs = net.run(ort::inputs![input_value])?;

        if outputs.len() < 2 {
            return Err(format!(
                "age/gender model expected 2 outputs, got {}",
                outputs.len()
            )
            .into());
        }

        // The two heads are distinguished by width: age is a single
        // regression scalar (years), gender is a 2-class score pair.
        let mut age: Option<f32> = None;
        let mut gender: Option<Gender> = None;
        for i in 0..2 {
            let values = outputs[i].try_extract_array::<f32>()?;
            let Some(data) = values.as_slice() else {
                continue;
            };
            match data.len() {
                1 => age = Some(data[0]),
                2 => gender = Some(pick_gender(data[0], data[1])),
                _ => {}
            }
        }
        match (age, gender) {
            (Some(a), Some(g)) => Ok(Some((a, g))),
            _ => Err("age/gender model did not produce both heads".into()),
        }
    }
}

impl FaceAnalyzer for OnnxFaceAnalyzer {
    fn analyze(
        &mut self,
        frame: &Frame,
        options: &DetectionOptions,
    ) -> Result<Vec<FaceRecord>, Box<dyn std::error::Error>> {
        let boxes = self.detect_boxes(frame, options.min_confidence())?;

        let mut records = Vec::with_capacity(boxes.len());
        for (bounding_box, score) in boxes {
            let mut record = FaceRecord {
                confidence: Some(score),
                bounding_box: Some(bounding_box),
                ..FaceRecord::default()
            };

            if options.wants_face_heads() {
                let crop = bounding_box
                    .padded(CROP_MARGIN)
                    .clamped(frame.width(), frame.height());

                if options.detect_landmarks() {
                    record.landmarks = self.run_landmarks(frame, &crop)?;
                }
                if options.detect_expressions() {
                    record.expressions = self.run_expressions(frame, &crop)?;
                }
                if options.detect_age_gender() {
                    if let Some((age, gender)) = self.run_age_gender(frame, &crop)? {
                        record.age = Some(age);
                        record.gender = Some(gender);
                    }
                }
            }

            records.push(record);
        }

        Ok(records)
    }
}

fn load_session(path: &Path) -> Result<ort::session::Session, Box<dyn std::error::Error>> {
    Ok(ort::session::Session::builder()?.commit_from_file(path)?)
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Resize the whole frame to `size × size`, normalized [0,1] NCHW float32.
fn frame_to_tensor(frame: &Frame, size: u32) -> ndarray::Array4<f32> {
    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;
    let s = size as usize;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, s, s));
    for y in 0..s {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / s as f64) as usize).min(src_h - 1);
        for x in 0..s {
            let src_x = (((x as f64 + 0.5) * src_w as f64 / s as f64) as usize).min(src_w - 1);
            for c in 0..3 {
                tensor[[0, c, y, x]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }
    tensor
}

/// Sample the crop region into a `size × size` [0,1] NCHW tensor.
///
/// Returns `None` when the crop has no area inside the frame.
fn crop_to_tensor(frame: &Frame, crop: &BoundingBox, size: u32) -> Option<ndarray::Array4<f32>> {
    let clamped = crop.clamped(frame.width(), frame.height());
    if clamped.area() <= 0.0 {
        return None;
    }

    let src = frame.as_ndarray();
    let max_x = frame.width() as usize - 1;
    let max_y = frame.height() as usize - 1;
    let s = size as usize;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, s, s));
    for y in 0..s {
        let fy = clamped.y + (y as f32 + 0.5) * clamped.height / s as f32;
        let src_y = (fy as usize).min(max_y);
        for x in 0..s {
            let fx = clamped.x + (x as f32 + 0.5) * clamped.width / s as f32;
            let src_x = (fx as usize).min(max_x);
            for c in 0..3 {
                tensor[[0, c, y, x]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }
    Some(tensor)
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Interleaved normalized crop coordinates → frame-space landmark points.
fn decode_landmarks(data: &[f32], crop: &BoundingBox) -> Vec<LandmarkPoint> {
    let count = (data.len() / 2).min(LANDMARK_COUNT);
    (0..count)
        .map(|i| LandmarkPoint {
            x: crop.x + data[2 * i] * crop.width,
            y: crop.y + data[2 * i + 1] * crop.height,
        })
        .collect()
}

/// Gender head ordering: index 0 = male, index 1 = female.
fn pick_gender(male_score: f32, female_score: f32) -> Gender {
    if female_score > male_score {
        Gender::Female
    } else {
        Gender::Male
    }
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

// ---------------------------------------------------------------------------
// Anchor generation (short-range detector)
// ---------------------------------------------------------------------------

/// Two feature map scales: 16×16 with 2 anchors per cell, 8×8 with 6.
fn generate_anchors() -> Vec<[f32; 2]> {
    let strides = [(8, 2), (16, 6)]; // (stride, anchors_per_cell)
    let mut anchors = Vec::with_capacity(NUM_ANCHORS);

    for &(stride, num) in &strides {
        let grid_size = DETECTOR_INPUT_SIZE as usize / stride;
        for y in 0..grid_size {
            for x in 0..grid_size {
                let cx = (x as f32 + 0.5) / grid_size as f32;
                let cy = (y as f32 + 0.5) / grid_size as f32;
                for _ in 0..num {
                    anchors.push([cx, cy]);
                }
            }
        }
    }

    anchors
}

// ---------------------------------------------------------------------------
// NMS
// ---------------------------------------------------------------------------

fn nms(mut dets: Vec<(BoundingBox, f32)>, iou_thresh: f32) -> Vec<(BoundingBox, f32)> {
    dets.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut keep: Vec<(BoundingBox, f32)> = Vec::new();
    for (bbox, score) in dets {
        let dominated = keep.iter().any(|(kept, _)| kept.iou(&bbox) > iou_thresh);
        if !dominated {
            keep.push((bbox, score));
        }
    }
    keep
}
