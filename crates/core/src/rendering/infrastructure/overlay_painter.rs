//! Paints detection results onto a frame: bounding boxes, landmark dots,
//! and text labels positioned like the canvas overlay this replaces
//! (expression under the box, age/gender above it).

use crate::analysis::detection_options::DetectionOptions;
use crate::analysis::face_record::FaceRecord;
use crate::rendering::infrastructure::label_font;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

const BOX_COLOR: [u8; 3] = [66, 133, 244];
const LANDMARK_COLOR: [u8; 3] = [234, 67, 53];
const LABEL_COLOR: [u8; 3] = [255, 255, 255];
const LABEL_BACKGROUND: [u8; 3] = [32, 32, 32];

const BORDER_THICKNESS: u32 = 2;
const LANDMARK_RADIUS: i32 = 1;
const LABEL_SCALE: u32 = 2;
const LABEL_PADDING: i32 = 2;
const LABEL_GAP: i32 = 4;

pub struct OverlayPainter;

impl OverlayPainter {
    pub fn new() -> Self {
        Self
    }

    /// Draws every facet the options request for which a record has data.
    /// Geometry extending past the frame edge is clipped, never an error.
    pub fn paint(&self, frame: &mut Frame, records: &[FaceRecord], options: &DetectionOptions) {
        for record in records {
            let Some(bbox) = record.bounding_box else {
                continue;
            };

            if options.detect_face() {
                draw_box_border(frame, &bbox);
            }

            if options.detect_landmarks() {
                if let Some(points) = &record.landmarks {
                    for p in points {
                        draw_dot(frame, p.x as i32, p.y as i32);
                    }
                }
            }

            if options.detect_expressions() {
                if let Some((label, p)) = record
                    .expressions
                    .as_ref()
                    .and_then(|scores| scores.dominant())
                {
                    let text = format!("{} ({}%)", label, (p * 100.0).round() as i64);
                    draw_label(
                        frame,
                        bbox.x as i32,
                        bbox.bottom() as i32 + LABEL_GAP,
                        &text,
                    );
                }
            }

            if options.detect_age_gender() {
                if let (Some(age), Some(gender)) = (record.age, record.gender) {
                    let text = format!("{} years / {}", age.round() as i64, gender);
                    let height = label_font::text_height(LABEL_SCALE) as i32 + 2 * LABEL_PADDING;
                    draw_label(frame, bbox.x as i32, bbox.y as i32 - height - LABEL_GAP, &text);
                }
            }
        }
    }
}

impl Default for OverlayPainter {
    fn default() -> Self {
        Self::new()
    }
}

fn draw_box_border(frame: &mut Frame, bbox: &BoundingBox) {
    let x0 = bbox.x as i32;
    let y0 = bbox.y as i32;
    let x1 = bbox.right() as i32;
    let y1 = bbox.bottom() as i32;

    for t in 0..BORDER_THICKNESS as i32 {
        draw_hline(frame, x0, x1, y0 + t);
        draw_hline(frame, x0, x1, y1 - t);
        draw_vline(frame, y0, y1, x0 + t);
        draw_vline(frame, y0, y1, x1 - t);
    }
}

fn draw_hline(frame: &mut Frame, x0: i32, x1: i32, y: i32) {
    if y < 0 {
        return;
    }
    for x in x0.max(0)..=x1.max(0) {
        frame.put_pixel(x as u32, y as u32, BOX_COLOR);
    }
}

fn draw_vline(frame: &mut Frame, y0: i32, y1: i32, x: i32) {
    if x < 0 {
        return;
    }
    for y in y0.max(0)..=y1.max(0) {
        frame.put_pixel(x as u32, y as u32, BOX_COLOR);
    }
}

fn draw_dot(frame: &mut Frame, cx: i32, cy: i32) {
    for dy in -LANDMARK_RADIUS..=LANDMARK_RADIUS {
        for dx in -LANDMARK_RADIUS..=LANDMARK_RADIUS {
            let (x, y) = (cx + dx, cy + dy);
            if x >= 0 && y >= 0 {
                frame.put_pixel(x as u32, y as u32, LANDMARK_COLOR);
            }
        }
    }
}

/// Filled background box with text on top, like a canvas text field.
fn draw_label(frame: &mut Frame, x: i32, y: i32, text: &str) {
    let w = label_font::text_width(text, LABEL_SCALE) as i32 + 2 * LABEL_PADDING;
    let h = label_font::text_height(LABEL_SCALE) as i32 + 2 * LABEL_PADDING;

    for py in y..y + h {
        for px in x..x + w {
            if px >= 0 && py >= 0 {
                frame.put_pixel(px as u32, py as u32, LABEL_BACKGROUND);
            }
        }
    }
    label_font::draw_text(
        frame,
        x + LABEL_PADDING,
        y + LABEL_PADDING,
        text,
        LABEL_COLOR,
        LABEL_SCALE,
    );
}
