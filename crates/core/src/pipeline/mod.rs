pub mod analyze_image_use_case;
pub mod live_analysis_use_case;
pub mod pass_sequencer;
pub mod pass_sink;
