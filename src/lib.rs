pub mod annotation;
pub mod color;
pub mod error;
pub mod genome;
pub mod neighborhood;
pub mod render;

pub use color::compute_colored_windows;
