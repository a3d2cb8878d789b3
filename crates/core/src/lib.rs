pub mod analysis;
pub mod detection;
pub mod pipeline;
pub mod rendering;
pub mod shared;
pub mod video;
