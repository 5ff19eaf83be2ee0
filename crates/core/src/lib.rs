pub mod annotation;
pub mod camera;
pub mod detection;
pub mod pipeline;
pub mod shared;
