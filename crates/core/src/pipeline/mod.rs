pub mod annotate_video_use_case;
pub mod output_naming;
pub mod pipeline_config;
pub mod pipeline_error;
pub mod pipeline_logger;
