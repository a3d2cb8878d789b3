pub mod label_font;
pub mod overlay_painter;
pub mod text_table_renderer;
