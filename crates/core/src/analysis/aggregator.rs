//! Turns raw per-face records into render-ready table rows.
//!
//! This is the only place the facet configuration and the detection output
//! meet: the column set is decided here, once, from the options, and every
//! row of one pass carries exactly that set. Rendering (terminal table,
//! overlay labels) consumes the rows without re-deriving anything.

use std::fmt;

use crate::analysis::detection_options::DetectionOptions;
use crate::analysis::face_record::FaceRecord;

/// One table cell: either a formatted value or an explicit unavailable
/// marker. A requested facet that a record cannot answer must show `N/A`,
/// never zero or an empty string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Cell {
    Value(String),
    Unavailable,
}

impl Cell {
    pub fn text(&self) -> &str {
        match self {
            Cell::Value(s) => s,
            Cell::Unavailable => "N/A",
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// Presentation-ready tuple for one detected face.
///
/// `None` means the column is not part of this table at all;
/// `Some(Cell::Unavailable)` means the column exists but this record has no
/// value for it.
#[derive(Clone, Debug, PartialEq)]
pub struct ResultRow {
    /// 1-based face number.
    pub index: usize,
    pub confidence: Option<Cell>,
    pub gender: Option<Cell>,
    pub age: Option<Cell>,
    pub dominant_expression: Option<Cell>,
}

impl ResultRow {
    /// Cells in table order, index included, absent columns skipped.
    pub fn cells(&self) -> Vec<String> {
        let mut out = vec![self.index.to_string()];
        for cell in [
            &self.confidence,
            &self.gender,
            &self.age,
            &self.dominant_expression,
        ]
        .into_iter()
        .flatten()
        {
            out.push(cell.text().to_string());
        }
        out
    }
}

/// Header labels for the column set the options select, in table order.
pub fn column_headers(options: &DetectionOptions) -> Vec<&'static str> {
    let mut headers = vec!["Face #"];
    if options.detect_face() {
        headers.push("Confidence");
    }
    if options.detect_age_gender() {
        headers.push("Gender");
        headers.push("Age");
    }
    if options.detect_expressions() {
        headers.push("Dominant Expression");
    }
    headers
}

/// Pure transform from one pass's records to its table rows.
///
/// Invariant: every returned row has the same column set, determined solely
/// by `options`. An empty `records` slice yields an empty vector; showing
/// the explicit "no faces" state is the renderer's job.
pub fn summarize(records: &[FaceRecord], options: &DetectionOptions) -> Vec<ResultRow> {
    records
        .iter()
        .enumerate()
        .map(|(i, record)| ResultRow {
            index: i + 1,
            confidence: options
                .detect_face()
                .then(|| cell(record.confidence.map(format_confidence))),
            gender: options
                .detect_age_gender()
                .then(|| cell(record.gender.map(|g| g.to_string()))),
            age: options
                .detect_age_gender()
                .then(|| cell(record.age.map(format_age))),
            dominant_expression: options.detect_expressions().then(|| {
                cell(record
                    .expressions
                    .as_ref()
                    .and_then(|scores| scores.dominant())
                    .map(|(label, p)| format_dominant(label, p)))
            }),
        })
        .collect()
}

fn cell(value: Option<String>) -> Cell {
    match value {
        Some(v) => Cell::Value(v),
        None => Cell::Unavailable,
    }
}

/// `0.9753` → `97.53%`
fn format_confidence(score: f32) -> String {
    format!("{:.2}%", score * 100.0)
}

/// Nearest whole year.
fn format_age(age: f32) -> String {
    format!("{}", age.round() as i64)
}

/// `("sad", 0.7)` → `sad (70%)`
fn format_dominant(label: &str, probability: f32) -> String {
    format!("{} ({}%)", label, (probability * 100.0).round() as i64)
}
