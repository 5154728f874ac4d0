pub mod error;
pub mod format;
pub mod frame_source;
pub mod navigator;
