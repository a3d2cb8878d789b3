//! Renders result rows as an aligned plain-text table.

use std::io::Write;

use crate::analysis::aggregator::{column_headers, ResultRow};
use crate::analysis::detection_options::DetectionOptions;
use crate::rendering::domain::result_renderer::ResultRenderer;

const COLUMN_GAP: usize = 2;
const EMPTY_MESSAGE: &str = "No faces detected.";

/// Writes one table per pass to any `Write` sink (stdout in the CLI,
/// `Vec<u8>` in tests).
pub struct TextTableRenderer<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> TextTableRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> ResultRenderer for TextTableRenderer<W> {
    fn render(
        &mut self,
        rows: &[ResultRow],
        options: &DetectionOptions,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if rows.is_empty() {
            writeln!(self.out, "{EMPTY_MESSAGE}")?;
            return Ok(());
        }

        let headers = column_headers(options);
        let cells: Vec<Vec<String>> = rows.iter().map(|r| r.cells()).collect();

        let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
        for row in &cells {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.len());
            }
        }

        write_row(&mut self.out, headers.iter().map(|h| *h), &widths)?;
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        write_row(&mut self.out, rule.iter().map(String::as_str), &widths)?;
        for row in &cells {
            write_row(&mut self.out, row.iter().map(String::as_str), &widths)?;
        }
        self.out.flush()?;
        Ok(())
    }

    fn clear(&mut self) {
        // Nothing retained between passes on a plain stream.
    }
}

fn write_row<'a, W: Write>(
    out: &mut W,
    cells: impl Iterator<Item = &'a str>,
    widths: &[usize],
) -> std::io::Result<()> {
    let mut line = String::new();
    for (i, cell) in cells.enumerate() {
        if i > 0 {
            line.push_str(&" ".repeat(COLUMN_GAP));
        }
        line.push_str(cell);
        line.push_str(&" ".repeat(widths[i].saturating_sub(cell.len())));
    }
    writeln!(out, "{}", line.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::aggregator::summarize;
    use crate::analysis::face_record::{ExpressionScores, FaceRecord, Gender};

    fn render_to_string(rows: &[ResultRow], options: &DetectionOptions) -> String {
        let mut renderer = TextTableRenderer::new(Vec::new());
        renderer.render(rows, options).unwrap();
        String::from_utf8(renderer.into_inner()).unwrap()
    }

    #[test]
    fn test_empty_rows_print_no_faces_message() {
        let out = render_to_string(&[], &DetectionOptions::new());
        assert_eq!(out, "No faces detected.\n");
        assert!(!out.contains("Face #"));
    }

    #[test]
    fn test_headers_follow_selected_facets() {
        let options = DetectionOptions::new()
            .with_landmarks(false)
            .with_expressions(true)
            .with_age_gender(false);
        let record = FaceRecord {
            confidence: Some(0.73),
            expressions: Some(ExpressionScores::from_entries([("sad", 0.7)])),
            ..FaceRecord::default()
        };
        let rows = summarize(&[record], &options);
        let out = render_to_string(&rows, &options);
        let header_line = out.lines().next().unwrap();
        assert!(header_line.contains("Face #"));
        assert!(header_line.contains("Confidence"));
        assert!(header_line.contains("Dominant Expression"));
        assert!(!header_line.contains("Age"));
        assert!(out.contains("73.00%"));
        assert!(out.contains("sad (70%)"));
    }

    #[test]
    fn test_unavailable_fields_show_marker() {
        let options = DetectionOptions::new()
            .with_landmarks(false)
            .with_expressions(false)
            .with_age_gender(true);
        let record = FaceRecord {
            confidence: Some(0.9),
            ..FaceRecord::default()
        };
        let rows = summarize(&[record], &options);
        let out = render_to_string(&rows, &options);
        assert!(out.contains("N/A"));
    }

    #[test]
    fn test_columns_align_across_rows() {
        let options = DetectionOptions::new()
            .with_landmarks(false)
            .with_expressions(false)
            .with_age_gender(true);
        let long = FaceRecord {
            confidence: Some(0.99999),
            age: Some(100.0),
            gender: Some(Gender::Female),
            ..FaceRecord::default()
        };
        let short = FaceRecord {
            confidence: Some(0.5),
            ..FaceRecord::default()
        };
        let rows = summarize(&[long, short], &options);
        let out = render_to_string(&rows, &options);
        let lines: Vec<&str> = out.lines().collect();
        // header, rule, two data rows
        assert_eq!(lines.len(), 4);
        let gender_col = lines[0].find("Gender").unwrap();
        assert_eq!(&lines[2][gender_col..gender_col + 6], "female");
        assert_eq!(&lines[3][gender_col..gender_col + 3], "N/A");
    }

    #[test]
    fn test_face_numbers_are_one_based() {
        let options = DetectionOptions::new()
            .with_landmarks(false)
            .with_expressions(false)
            .with_age_gender(false);
        let rows = summarize(&[FaceRecord::default(), FaceRecord::default()], &options);
        let out = render_to_string(&rows, &options);
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[2].starts_with('1'));
        assert!(lines[3].starts_with('2'));
    }
}
