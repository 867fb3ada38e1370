mod config;
mod image;
mod report;
mod repository;
mod tags;

pub use config::*;
pub use image::*;
pub use report::*;
pub use repository::*;
pub use tags::*;
