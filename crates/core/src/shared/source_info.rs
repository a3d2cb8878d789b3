#[derive(Clone, Debug, PartialEq)]
pub struct SourceInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// `false` for single-image sources, `true` for cameras.
    pub live: bool,
    pub description: String,
}
