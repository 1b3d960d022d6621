pub mod status;
pub mod views;

pub use status::*;
