//! Type definitions for the traffic sign service

pub mod class_info;
pub mod prediction;

pub use class_info::{ClassRecord, ClassRegistry};
pub use prediction::Prediction;
