//! Route handler modules

pub mod media;
pub mod system;

pub use media::{audio, download, playlist, process, video};
pub use system::{health_check, index, openapi_spec};
