/// Axis-aligned face bounding box in frame coordinates.
///
/// Detector output is float-valued; quantization to pixels happens only
/// when painting.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Clamps the box to `[0, frame_w] x [0, frame_h]`.
    pub fn clamped(&self, frame_w: u32, frame_h: u32) -> Self {
        let x = self.x.clamp(0.0, frame_w as f32);
        let y = self.y.clamp(0.0, frame_h as f32);
        let right = self.right().clamp(0.0, frame_w as f32);
        let bottom = self.bottom().clamp(0.0, frame_h as f32);
        Self {
            x,
            y,
            width: (right - x).max(0.0),
            height: (bottom - y).max(0.0),
        }
    }

    /// Box grown by `margin` (fraction of its size) on every side.
    ///
    /// Gives the per-face heads context beyond the tight detector box.
    pub fn padded(&self, margin: f32) -> Self {
        let dx = self.width * margin;
        let dy = self.height * margin;
        Self {
            x: self.x - dx,
            y: self.y - dy,
            width: self.width + 2.0 * dx,
            height: self.height + 2.0 * dy,
        }
    }

    /// Rescales from one coordinate space to another, e.g. detector input
    /// size back to the source frame's natural dimensions.
    pub fn scaled(&self, sx: f32, sy: f32) -> Self {
        Self {
            x: self.x * sx,
            y: self.y * sy,
            width: self.width * sx,
            height: self.height * sy,
        }
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let ix = self.x.max(other.x);
        let iy = self.y.max(other.y);
        let iw = (self.right().min(other.right()) - ix).max(0.0);
        let ih = (self.bottom().min(other.bottom()) - iy).max(0.0);
        let inter = iw * ih;
        if inter == 0.0 {
            return 0.0;
        }
        inter / (self.area() + other.area() - inter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_iou_identical() {
        let b = BoundingBox::new(10.0, 10.0, 100.0, 100.0);
        assert_relative_eq!(b.iou(&b), 1.0);
    }

    #[test]
    fn test_iou_disjoint() {
        let a = BoundingBox::new(0.0, 0.0, 50.0, 50.0);
        let b = BoundingBox::new(100.0, 100.0, 50.0, 50.0);
        assert_relative_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou_half_overlap() {
        // intersection 50x100 = 5000, union 15000
        let a = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        let b = BoundingBox::new(50.0, 0.0, 100.0, 100.0);
        assert_relative_eq!(a.iou(&b), 5000.0 / 15000.0);
    }

    #[test]
    fn test_clamped_inside_is_unchanged() {
        let b = BoundingBox::new(10.0, 20.0, 30.0, 40.0);
        assert_eq!(b.clamped(100, 100), b);
    }

    #[test]
    fn test_clamped_at_edges() {
        let b = BoundingBox::new(-10.0, -5.0, 50.0, 50.0);
        let c = b.clamped(100, 100);
        assert_relative_eq!(c.x, 0.0);
        assert_relative_eq!(c.y, 0.0);
        assert_relative_eq!(c.width, 40.0);
        assert_relative_eq!(c.height, 45.0);
    }

    #[test]
    fn test_clamped_fully_outside_is_empty() {
        let b = BoundingBox::new(200.0, 200.0, 50.0, 50.0);
        let c = b.clamped(100, 100);
        assert_relative_eq!(c.area(), 0.0);
    }

    #[test]
    fn test_padded_grows_symmetrically() {
        let b = BoundingBox::new(100.0, 100.0, 100.0, 50.0);
        let p = b.padded(0.1);
        assert_relative_eq!(p.x, 90.0);
        assert_relative_eq!(p.y, 95.0);
        assert_relative_eq!(p.width, 120.0);
        assert_relative_eq!(p.height, 60.0);
    }

    #[test]
    fn test_scaled_maps_both_axes() {
        let b = BoundingBox::new(10.0, 20.0, 30.0, 40.0);
        let s = b.scaled(2.0, 0.5);
        assert_relative_eq!(s.x, 20.0);
        assert_relative_eq!(s.y, 10.0);
        assert_relative_eq!(s.width, 60.0);
        assert_relative_eq!(s.height, 20.0);
    }

    #[rstest]
    #[case::zero_width(BoundingBox::new(0.0, 0.0, 0.0, 100.0))]
    #[case::zero_height(BoundingBox::new(0.0, 0.0, 100.0, 0.0))]
    fn test_iou_degenerate(#[case] a: BoundingBox) {
        let b = BoundingBox::new(0.0, 0.0, 50.0, 50.0);
        assert_relative_eq!(a.iou(&b), 0.0);
    }
}
