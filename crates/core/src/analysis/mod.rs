pub mod aggregator;
pub mod detection_options;
pub mod face_record;
