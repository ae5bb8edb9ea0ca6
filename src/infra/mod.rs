mod api;
mod clipboard;
mod config;
mod logging;

pub use api::*;
pub use clipboard::*;
pub use config::*;
pub use logging::*;
