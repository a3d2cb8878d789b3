pub mod result_renderer;
