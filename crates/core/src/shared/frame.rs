use ndarray::ArrayView3;

/// A single captured frame: contiguous RGB24 bytes in row-major order.
///
/// Sources convert to RGB at the I/O boundary; everything downstream
/// (detection, overlay painting) works on this one format.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * 3,
            "data length must equal width * height * 3"
        );
        Self {
            data,
            width,
            height,
            index,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Capture-order index of this frame within its source.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Pixel at `(x, y)`, or `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let at = ((y * self.width + x) * 3) as usize;
        Some([self.data[at], self.data[at + 1], self.data[at + 2]])
    }

    /// Sets the pixel at `(x, y)`; out-of-bounds writes are ignored so
    /// overlay geometry can extend past the frame edge.
    pub fn put_pixel(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let at = ((y * self.width + x) * 3) as usize;
        self.data[at..at + 3].copy_from_slice(&rgb);
    }

    /// View as `(height, width, 3)` for tensor preprocessing.
    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape((self.height as usize, self.width as usize, 3), &self.data)
            .expect("Frame data length must match dimensions")
    }
}
