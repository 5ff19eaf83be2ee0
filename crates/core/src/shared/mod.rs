pub mod constants;
pub mod display_frame;
pub mod frame;
pub mod region;
